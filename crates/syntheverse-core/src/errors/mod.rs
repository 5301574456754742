//! Failure classification shared by the bridge and the CLI.
//!
//! Typed errors are attached to `anyhow` chains as [`BridgeError`]; anything
//! else is classified from its message text so that every failure still maps
//! onto a stable [`BridgeErrorKind`] (and from there onto an exit code).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    MissingConfig,
    ConfigParse,
    MissingKey,
    DeploymentNotFound,
    ProviderRateLimit,
    ProviderTimeout,
    ProviderServer,
    Network,
    Reverted,
    Other,
}

impl BridgeErrorKind {
    /// Failures of the node, the LLM provider or the network rather than of
    /// local setup.
    pub fn is_infra(self) -> bool {
        matches!(
            self,
            BridgeErrorKind::ProviderRateLimit
                | BridgeErrorKind::ProviderTimeout
                | BridgeErrorKind::ProviderServer
                | BridgeErrorKind::Network
                | BridgeErrorKind::Reverted
        )
    }
}

/// Message fragments (lower-case) checked in order by
/// [`BridgeError::classify_message`]; the first matching row wins.
const MESSAGE_RULES: &[(BridgeErrorKind, &[&str])] = &[
    (
        BridgeErrorKind::DeploymentNotFound,
        &["deployment file not found"],
    ),
    (BridgeErrorKind::MissingConfig, &["config file not found"]),
    (
        BridgeErrorKind::MissingKey,
        &[
            "private_key not set",
            "openai_api_key not set",
            "private key required",
        ],
    ),
    (
        BridgeErrorKind::ConfigParse,
        &["config error", "failed to parse yaml", "unknown field"],
    ),
    (BridgeErrorKind::Reverted, &["reverted"]),
    (BridgeErrorKind::ProviderRateLimit, &["rate limit", "429"]),
    (BridgeErrorKind::ProviderTimeout, &["timeout", "timed out"]),
    (
        BridgeErrorKind::ProviderServer,
        &["500", "502", "503", "504", "provider error"],
    ),
    (
        BridgeErrorKind::Network,
        &["network", "connection", "dns", "error sending request"],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub message: String,
    pub path: Option<String>,
    pub status: Option<u16>,
    pub provider: Option<String>,
    pub detail: Option<String>,
    /// Set when `kind` came from [`BridgeError::classify_message`].
    pub legacy_classified: bool,
}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            status: None,
            provider: None,
            detail: None,
            legacy_classified: false,
        }
    }

    /// Message and detail are the same text.
    fn described(kind: BridgeErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::new(kind, detail.clone()).with_detail(detail)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn missing_config(path: impl Into<String>, hint: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            BridgeErrorKind::MissingConfig,
            format!("Config file not found: {}", path),
        )
        .with_path(path)
        .with_detail(hint)
    }

    pub fn config_parse(path: Option<String>, detail: impl Into<String>) -> Self {
        let err = Self::described(BridgeErrorKind::ConfigParse, detail);
        match path {
            Some(path) => err.with_path(path),
            None => err,
        }
    }

    /// `var` names the environment variable, `purpose` the operation that needed it.
    pub fn missing_key(var: &str, purpose: &str) -> Self {
        Self::new(
            BridgeErrorKind::MissingKey,
            format!("{} not set: required for {}", var, purpose),
        )
    }

    pub fn deployment_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            BridgeErrorKind::DeploymentNotFound,
            format!("Deployment file not found: {}", path),
        )
        .with_path(path)
        .with_detail("deploy the contracts first (npm run deploy:local)")
    }

    pub fn network(provider: &str, detail: impl Into<String>) -> Self {
        Self::described(BridgeErrorKind::Network, detail).with_provider(provider)
    }

    pub fn other(detail: impl Into<String>) -> Self {
        Self::described(BridgeErrorKind::Other, detail)
    }

    pub fn classify_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = MESSAGE_RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
            .map(|(kind, _)| *kind)
            .unwrap_or(BridgeErrorKind::Other);
        let mut err = Self::new(kind, message);
        err.legacy_classified = true;
        err
    }

    /// The typed error anywhere in the chain, or a message-based classification.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<BridgeError>())
            .cloned()
            .unwrap_or_else(|| Self::classify_message(format!("{:#}", err)))
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        match &self.detail {
            Some(detail) if detail != &self.message => write!(f, " ({})", detail),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for BridgeError {}
