use super::Address;
use crate::errors::BridgeError;
use crate::model::DeploymentInfo;
use std::path::Path;

/// Parsed contract addresses from a deployment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContracts {
    pub token: Address,
    pub pod: Address,
    pub ai_integration: Address,
}

impl DeployedContracts {
    pub fn from_info(info: &DeploymentInfo) -> anyhow::Result<Self> {
        let parse = |name: &str, raw: &str| -> anyhow::Result<Address> {
            raw.parse().map_err(|e| {
                BridgeError::config_parse(
                    None,
                    format!("config error: contracts.{}: {}", name, e),
                )
                .into()
            })
        };
        Ok(Self {
            token: parse("SyntheverseToken", &info.contracts.syntheverse_token)?,
            pod: parse("ProofOfDiscovery", &info.contracts.proof_of_discovery)?,
            ai_integration: parse("AIIntegration", &info.contracts.ai_integration)?,
        })
    }
}

pub fn load_deployment(path: impl AsRef<Path>) -> anyhow::Result<DeploymentInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(BridgeError::deployment_not_found(path.display().to_string()).into());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| {
        BridgeError::config_parse(
            Some(path.display().to_string()),
            format!("config error: failed to read deployment file: {}", e),
        )
    })?;
    let info: DeploymentInfo = serde_json::from_str(&raw).map_err(|e| {
        BridgeError::config_parse(
            Some(path.display().to_string()),
            format!("config error: invalid deployment file: {}", e),
        )
    })?;
    tracing::debug!(
        path = %path.display(),
        network = info.network.as_deref().unwrap_or("unknown"),
        "loaded deployment"
    );
    Ok(info)
}
