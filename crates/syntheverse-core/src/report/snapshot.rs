use super::{epoch_name, iso_timestamp, RULE};
use crate::bridge::SyntheverseBridge;
use crate::chain::format_h256;
use crate::errors::BridgeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SAMPLE_SIZE: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotContracts {
    pub pod: String,
    pub token: String,
}

/// Chain state saved to check that a node restart kept its data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceSnapshot {
    pub timestamp: String,
    pub discovery_count: String,
    pub total_density: String,
    pub token_density: String,
    pub current_epoch: u64,
    pub epoch_name: String,
    pub sample_discovery_ids: Vec<String>,
    pub contract_addresses: SnapshotContracts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotComparison {
    pub changes: Vec<FieldChange>,
    /// Sample ids from the earlier snapshot no longer returned by the chain.
    pub missing_ids: Vec<String>,
}

impl SnapshotComparison {
    /// True when earlier discoveries vanished or the contracts moved.
    pub fn state_lost(&self) -> bool {
        !self.missing_ids.is_empty()
            || self
                .changes
                .iter()
                .any(|c| c.field.starts_with("contractAddresses"))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.changes.is_empty() && self.missing_ids.is_empty() {
            out.push_str("State unchanged since the earlier snapshot.\n");
            return out;
        }
        for c in &self.changes {
            out.push_str(&format!("  {}: {} -> {}\n", c.field, c.before, c.after));
        }
        for id in &self.missing_ids {
            out.push_str(&format!("  missing discovery: {}\n", id));
        }
        if self.state_lost() {
            out.push_str("State was NOT persisted.\n");
        } else {
            out.push_str("State persisted (counters moved forward).\n");
        }
        out
    }
}

impl PersistenceSnapshot {
    pub async fn collect(bridge: &SyntheverseBridge) -> anyhow::Result<Self> {
        let pod = bridge.pod()?;
        let token = bridge.token()?;
        let count = pod.discovery_count().await.map_err(BridgeError::from)?;
        let total_density = pod
            .total_coherence_density()
            .await
            .map_err(BridgeError::from)?;
        let current_epoch = token.current_epoch().await.map_err(BridgeError::from)?;
        let token_density = token
            .coherence_density()
            .await
            .map_err(BridgeError::from)?;
        let sample = count.min(SAMPLE_SIZE);
        let ids = if sample == 0 {
            Vec::new()
        } else {
            pod.discovery_ids(0, sample)
                .await
                .map_err(BridgeError::from)?
        };
        Ok(Self {
            timestamp: iso_timestamp(chrono::Utc::now()),
            discovery_count: count.to_string(),
            total_density: total_density.to_string(),
            token_density: token_density.to_string(),
            current_epoch,
            epoch_name: epoch_name(current_epoch),
            sample_discovery_ids: ids.iter().map(format_h256).collect(),
            contract_addresses: SnapshotContracts {
                pod: pod.address().to_string(),
                token: token.address().to_string(),
            },
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config_parse(
                Some(path.display().to_string()),
                format!("config error: failed to read snapshot: {}", e),
            )
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            BridgeError::config_parse(
                Some(path.display().to_string()),
                format!("config error: invalid snapshot: {}", e),
            )
            .into()
        })
    }

    pub fn compare(&self, earlier: &PersistenceSnapshot) -> SnapshotComparison {
        let mut changes = Vec::new();
        let mut diff = |field: &'static str, before: &str, after: &str| {
            if !before.eq_ignore_ascii_case(after) {
                changes.push(FieldChange {
                    field,
                    before: before.to_string(),
                    after: after.to_string(),
                });
            }
        };
        diff("discoveryCount", &earlier.discovery_count, &self.discovery_count);
        diff("totalDensity", &earlier.total_density, &self.total_density);
        diff("tokenDensity", &earlier.token_density, &self.token_density);
        diff("epochName", &earlier.epoch_name, &self.epoch_name);
        diff(
            "contractAddresses.pod",
            &earlier.contract_addresses.pod,
            &self.contract_addresses.pod,
        );
        diff(
            "contractAddresses.token",
            &earlier.contract_addresses.token,
            &self.contract_addresses.token,
        );
        let missing_ids = earlier
            .sample_discovery_ids
            .iter()
            .filter(|id| {
                !self
                    .sample_discovery_ids
                    .iter()
                    .any(|now| now.eq_ignore_ascii_case(id))
            })
            .cloned()
            .collect();
        SnapshotComparison {
            changes,
            missing_ids,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\nPERSISTENCE CHECK\n{}\n\n", RULE, RULE));
        out.push_str("Current Blockchain State:\n");
        out.push_str(&format!("  Total Discoveries: {}\n", self.discovery_count));
        out.push_str(&format!("  Total Coherence Density: {}\n", self.total_density));
        out.push_str(&format!("  Token Coherence Density: {}\n", self.token_density));
        out.push_str(&format!("  Current Epoch: {}\n\n", self.epoch_name));
        out.push_str(&format!("Sample Discovery IDs (first {}):\n", SAMPLE_SIZE));
        for (i, id) in self.sample_discovery_ids.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, id));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(count: &str, ids: &[&str], pod: &str) -> PersistenceSnapshot {
        PersistenceSnapshot {
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            discovery_count: count.into(),
            total_density: "100".into(),
            token_density: "100".into(),
            current_epoch: 0,
            epoch_name: "Founders".into(),
            sample_discovery_ids: ids.iter().map(|s| s.to_string()).collect(),
            contract_addresses: SnapshotContracts {
                pod: pod.into(),
                token: "0x01".into(),
            },
        }
    }

    #[test]
    fn identical_state_has_no_changes() {
        let a = snapshot("2", &["0xaa", "0xbb"], "0x02");
        let b = snapshot("2", &["0xAA", "0xbb"], "0x02");
        let cmp = b.compare(&a);
        assert_eq!(cmp, SnapshotComparison::default());
        assert!(!cmp.state_lost());
        assert!(cmp.render().contains("unchanged"));
    }

    #[test]
    fn growth_is_not_loss() {
        let before = snapshot("2", &["0xaa", "0xbb"], "0x02");
        let after = snapshot("3", &["0xaa", "0xbb", "0xcc"], "0x02");
        let cmp = after.compare(&before);
        assert_eq!(cmp.changes.len(), 1);
        assert_eq!(cmp.changes[0].field, "discoveryCount");
        assert!(!cmp.state_lost());
    }

    #[test]
    fn reset_chain_is_detected() {
        let before = snapshot("2", &["0xaa", "0xbb"], "0x02");
        let after = snapshot("0", &[], "0x09");
        let cmp = after.compare(&before);
        assert_eq!(cmp.missing_ids, vec!["0xaa", "0xbb"]);
        assert!(cmp.state_lost());
        assert!(cmp.render().contains("NOT persisted"));
    }

    #[test]
    fn render_lists_state_and_numbered_ids() {
        let text = snapshot("2", &["0xaa", "0xbb"], "0x02").render();
        assert!(text.contains("PERSISTENCE CHECK\n"));
        assert!(text.contains("  Total Discoveries: 2\n"));
        assert!(text.contains("  Current Epoch: Founders\n\n"));
        assert!(text.ends_with("  1. 0xaa\n  2. 0xbb\n"));
    }

    #[test]
    fn json_keys_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("persistence_snapshot.json");
        let s = snapshot("1", &["0xaa"], "0x02");
        super::super::write_json(&s, &path).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["discoveryCount"], "1");
        assert_eq!(v["currentEpoch"], 0);
        assert_eq!(v["contractAddresses"]["pod"], "0x02");
        assert_eq!(PersistenceSnapshot::load(&path).unwrap(), s);
    }
}
