use crate::cli::args::{DoctorArgs, OutputFormat};
use crate::cli::helpers::load_settings;
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use serde::Serialize;
use std::path::Path;
use syntheverse_core::chain::deployment::{load_deployment, DeployedContracts};
use syntheverse_core::chain::{EthClient, Wallet};
use syntheverse_core::config::{self, Settings};
use syntheverse_core::providers::network::{self, NetworkPolicy};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

pub async fn run(args: DoctorArgs, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let mut checks = Vec::new();
    let settings = match load_settings(config_path) {
        Ok(s) => {
            checks.push(Check::new("config", CheckStatus::Ok, "settings parsed"));
            Some(s)
        }
        Err(e) => {
            checks.push(Check::new("config", CheckStatus::Fail, format!("{:#}", e)));
            None
        }
    };
    if let Some(settings) = &settings {
        checks.extend(check_settings(settings).await);
    }

    let failed = checks.iter().any(|c| c.status == CheckStatus::Fail);
    if args.format == OutputFormat::Json {
        let out = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "ok": !failed,
            "checks": checks,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for c in &checks {
            let mark = match c.status {
                CheckStatus::Ok => "ok  ",
                CheckStatus::Warn => "warn",
                CheckStatus::Fail => "FAIL",
            };
            println!("[{}] {}: {}", mark, c.name, c.detail);
        }
        println!();
        if failed {
            println!("Some issues found. Please fix them before proceeding.");
        } else {
            println!("Setup looks good.");
        }
    }
    Ok(if failed { EXIT_FAILURE } else { EXIT_SUCCESS })
}

async fn check_settings(settings: &Settings) -> Vec<Check> {
    let mut checks = Vec::new();

    let deployment = &settings.chain.deployment_file;
    checks.push(
        match load_deployment(deployment).and_then(|info| DeployedContracts::from_info(&info)) {
            Ok(c) => Check::new(
                "deployment",
                CheckStatus::Ok,
                format!("{} (ProofOfDiscovery {})", deployment, c.pod),
            ),
            Err(e) if !Path::new(deployment).exists() => Check::new(
                "deployment",
                CheckStatus::Warn,
                format!("{:#}", e),
            ),
            Err(e) => Check::new("deployment", CheckStatus::Fail, format!("{:#}", e)),
        },
    );

    let papers = Path::new(&settings.rag.papers_dir);
    checks.push(if papers.is_dir() {
        Check::new("papers_dir", CheckStatus::Ok, settings.rag.papers_dir.clone())
    } else {
        Check::new(
            "papers_dir",
            CheckStatus::Warn,
            format!("{} (missing)", settings.rag.papers_dir),
        )
    });

    checks.push(match config::openai_api_key() {
        Some(_) => Check::new("OPENAI_API_KEY", CheckStatus::Ok, "set"),
        None => Check::new(
            "OPENAI_API_KEY",
            CheckStatus::Warn,
            "not set; evaluations use the heuristic evaluator",
        ),
    });

    checks.push(match config::private_key() {
        Some(key) => match Wallet::from_hex(&key) {
            Ok(w) => Check::new("PRIVATE_KEY", CheckStatus::Ok, format!("account {}", w.address())),
            Err(e) => Check::new("PRIVATE_KEY", CheckStatus::Fail, e.to_string()),
        },
        None => Check::new(
            "PRIVATE_KEY",
            CheckStatus::Warn,
            "not set; read-only commands only",
        ),
    });

    checks.push(match network::effective_policy() {
        NetworkPolicy::Allow => Check::new("network_policy", CheckStatus::Ok, "allow"),
        NetworkPolicy::LocalOnly => Check::new(
            "network_policy",
            CheckStatus::Warn,
            "local: hosted LLM and embedding APIs are blocked",
        ),
        NetworkPolicy::Deny(reason) => Check::new("network_policy", CheckStatus::Warn, reason),
    });

    let eth = EthClient::http(&settings.chain.rpc_url);
    checks.push(match eth.chain_id().await {
        Ok(id) => Check::new(
            "rpc",
            CheckStatus::Ok,
            format!("{} (chain id {})", settings.chain.rpc_url, id),
        ),
        Err(e) => Check::new(
            "rpc",
            CheckStatus::Fail,
            format!("{}: {}", settings.chain.rpc_url, e),
        ),
    });

    checks
}
