//! Outbound network policy for every HTTP client in the crate.
//!
//! `SYNTHEVERSE_NETWORK_POLICY=deny` blocks everything; `local` only lets
//! loopback targets through, which keeps a local dev node reachable while
//! the hosted LLM and embedding APIs stay off.

use std::sync::{Mutex, OnceLock};

pub const POLICY_ENV: &str = "SYNTHEVERSE_NETWORK_POLICY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkPolicy {
    Allow,
    LocalOnly,
    Deny(String),
}

impl NetworkPolicy {
    fn from_env() -> Option<Self> {
        let raw = std::env::var(POLICY_ENV).ok()?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "deny" => Some(NetworkPolicy::Deny(format!("{}=deny", POLICY_ENV))),
            "local" => Some(NetworkPolicy::LocalOnly),
            _ => None,
        }
    }

    /// `None` when `target` may be contacted, otherwise the reason it may not.
    fn refusal(&self, target: &str) -> Option<String> {
        match self {
            NetworkPolicy::Allow => None,
            NetworkPolicy::Deny(reason) => Some(reason.clone()),
            NetworkPolicy::LocalOnly if is_loopback(target) => None,
            NetworkPolicy::LocalOnly => Some(format!("{}=local allows loopback only", POLICY_ENV)),
        }
    }
}

fn is_loopback(target: &str) -> bool {
    let Ok(url) = url::Url::parse(target) else {
        return false;
    };
    match url.host() {
        Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn scoped() -> &'static Mutex<NetworkPolicy> {
    static SCOPED: OnceLock<Mutex<NetworkPolicy>> = OnceLock::new();
    SCOPED.get_or_init(|| Mutex::new(NetworkPolicy::Allow))
}

fn swap_scoped(policy: NetworkPolicy) -> NetworkPolicy {
    let mut slot = scoped().lock().unwrap_or_else(|p| p.into_inner());
    std::mem::replace(&mut *slot, policy)
}

/// Overrides the process-wide policy until dropped.
pub struct NetworkPolicyGuard {
    previous: NetworkPolicy,
}

impl NetworkPolicyGuard {
    pub fn set(policy: NetworkPolicy) -> Self {
        Self {
            previous: swap_scoped(policy),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self::set(NetworkPolicy::Deny(reason.into()))
    }
}

impl Drop for NetworkPolicyGuard {
    fn drop(&mut self) {
        swap_scoped(self.previous.clone());
    }
}

/// The env var wins over any scoped policy.
pub fn effective_policy() -> NetworkPolicy {
    NetworkPolicy::from_env()
        .unwrap_or_else(|| scoped().lock().unwrap_or_else(|p| p.into_inner()).clone())
}

pub fn check_outbound(target: &str) -> anyhow::Result<()> {
    match effective_policy().refusal(target) {
        None => Ok(()),
        Some(reason) => anyhow::bail!(
            "config error: outbound network blocked by policy (target={}): {}",
            target,
            reason
        ),
    }
}
