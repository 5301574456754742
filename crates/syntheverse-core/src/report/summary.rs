use super::{epoch_name, format_ether, iso_timestamp, unix_to_iso, RULE};
use crate::bridge::SyntheverseBridge;
use crate::chain::{format_h256, Address};
use crate::errors::BridgeError;
use crate::model::Discovery;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRow {
    pub index: usize,
    pub discovery_id: String,
    pub discoverer: String,
    pub content_hash: String,
    pub validated: bool,
    pub redundant: bool,
    pub coherence_score: u32,
    pub density_score: u32,
    pub novelty_score: u32,
    pub pod_score: u64,
    pub qualified_epoch: String,
    /// Discoverer's token balance, in whole tokens.
    pub token_reward: String,
    pub timestamp: String,
}

impl DiscoveryRow {
    pub fn new(
        index: usize,
        discovery_id: String,
        d: &Discovery,
        qualified_epoch: u64,
        balance: u128,
    ) -> Self {
        Self {
            index,
            discovery_id,
            discoverer: d.discoverer.clone(),
            content_hash: d.content_hash.clone(),
            validated: d.validated,
            redundant: d.redundant,
            coherence_score: d.coherence_score,
            density_score: d.density_score,
            novelty_score: d.novelty_score,
            pod_score: d.scores().pod_score(),
            qualified_epoch: epoch_name(qualified_epoch),
            token_reward: format_ether(balance),
            timestamp: unix_to_iso(d.timestamp),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub validated: usize,
    pub redundant: usize,
    pub avg_coherence: f64,
    pub avg_density: f64,
    pub avg_novelty: f64,
    #[serde(rename = "avgPoD")]
    pub avg_pod: f64,
    /// Epoch name to count, in first-seen order.
    pub epoch_distribution: Map<String, Value>,
    pub total_coherence_density: String,
    pub current_epoch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySummary {
    pub timestamp: String,
    pub total_discoveries: usize,
    pub statistics: SummaryStatistics,
    pub discoveries: Vec<DiscoveryRow>,
}

fn average(rows: &[DiscoveryRow], f: impl Fn(&DiscoveryRow) -> f64) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(f).sum::<f64>() / rows.len() as f64
}

impl DiscoverySummary {
    pub fn from_rows(
        discoveries: Vec<DiscoveryRow>,
        total_coherence_density: u128,
        current_epoch: u64,
    ) -> Self {
        let mut epoch_distribution = Map::new();
        for row in &discoveries {
            let n = epoch_distribution
                .get(&row.qualified_epoch)
                .and_then(Value::as_u64)
                .unwrap_or(0);
            epoch_distribution.insert(row.qualified_epoch.clone(), Value::from(n + 1));
        }
        let statistics = SummaryStatistics {
            validated: discoveries.iter().filter(|d| d.validated).count(),
            redundant: discoveries.iter().filter(|d| d.redundant).count(),
            avg_coherence: average(&discoveries, |d| f64::from(d.coherence_score)),
            avg_density: average(&discoveries, |d| f64::from(d.density_score)),
            avg_novelty: average(&discoveries, |d| f64::from(d.novelty_score)),
            avg_pod: average(&discoveries, |d| d.pod_score as f64),
            epoch_distribution,
            total_coherence_density: total_coherence_density.to_string(),
            current_epoch: epoch_name(current_epoch),
        };
        Self {
            timestamp: iso_timestamp(chrono::Utc::now()),
            total_discoveries: discoveries.len(),
            statistics,
            discoveries,
        }
    }

    /// Reads every discovery with its qualified epoch and discoverer balance.
    pub async fn collect(bridge: &SyntheverseBridge) -> anyhow::Result<Self> {
        let pod = bridge.pod()?;
        let token = bridge.token()?;
        let count = pod.discovery_count().await.map_err(BridgeError::from)?;
        let ids = if count == 0 {
            Vec::new()
        } else {
            pod.discovery_ids(0, count).await.map_err(BridgeError::from)?
        };
        tracing::info!(count, "collecting discovery summary");

        let mut rows = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let d = pod.discovery(*id).await.map_err(BridgeError::from)?;
            let epoch = pod
                .qualified_epoch(d.density_score)
                .await
                .map_err(BridgeError::from)?;
            let discoverer: Address = d.discoverer.parse().map_err(BridgeError::from)?;
            let balance = token
                .balance_of(&discoverer)
                .await
                .map_err(BridgeError::from)?;
            rows.push(DiscoveryRow::new(i + 1, format_h256(id), &d, epoch, balance));
        }
        let total = pod
            .total_coherence_density()
            .await
            .map_err(BridgeError::from)?;
        let current = token.current_epoch().await.map_err(BridgeError::from)?;
        Ok(Self::from_rows(rows, total, current))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("\nTotal Discoveries: {}\n\n", self.total_discoveries));
        out.push_str(&format!("{}\nDISCOVERY SUMMARY REPORT\n{}\n\n", RULE, RULE));
        for d in &self.discoveries {
            out.push_str(&format!("Discovery #{}\n", d.index));
            out.push_str(&format!("  ID: {}\n", d.discovery_id));
            out.push_str(&format!("  Discoverer: {}\n", d.discoverer));
            out.push_str(&format!("  Content Hash: {}\n", d.content_hash));
            out.push_str(&format!("  Validated: {}\n", d.validated));
            out.push_str(&format!("  Redundant: {}\n", d.redundant));
            out.push_str("  Scores:\n");
            out.push_str(&format!("    Coherence: {}\n", d.coherence_score));
            out.push_str(&format!("    Density: {}\n", d.density_score));
            out.push_str(&format!("    Novelty: {}\n", d.novelty_score));
            out.push_str(&format!("  PoD Score: {}\n", d.pod_score));
            out.push_str(&format!("  Qualified Epoch: {}\n", d.qualified_epoch));
            out.push_str(&format!("  Token Reward: {} SYNTH\n", d.token_reward));
            out.push_str(&format!("  Timestamp: {}\n\n", d.timestamp));
        }
        let s = &self.statistics;
        out.push_str(&format!("{}\nSUMMARY STATISTICS\n{}\n", RULE, RULE));
        out.push_str(&format!("Total Discoveries: {}\n", self.total_discoveries));
        out.push_str(&format!("Validated: {}\n", s.validated));
        out.push_str(&format!("Redundant: {}\n", s.redundant));
        out.push_str("Average Scores:\n");
        out.push_str(&format!("  Coherence: {:.2}\n", s.avg_coherence));
        out.push_str(&format!("  Density: {:.2}\n", s.avg_density));
        out.push_str(&format!("  Novelty: {:.2}\n", s.avg_novelty));
        out.push_str(&format!("  PoD Score: {:.2}\n", s.avg_pod));
        out.push_str("Epoch Distribution:\n");
        for (epoch, n) in &s.epoch_distribution {
            out.push_str(&format!("  {}: {}\n", epoch, n));
        }
        out.push_str(&format!("Total Coherence Density: {}\n", s.total_coherence_density));
        out.push_str(&format!("Current Epoch: {}\n\n{}\n", s.current_epoch, RULE));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::contracts::fixtures::{address_word, bytes32_array, discovery_words, hex_words, word_u};
    use crate::chain::deployment::DeployedContracts;
    use crate::chain::rpc::scripted::ScriptedTransport;
    use crate::chain::EthClient;
    use serde_json::json;
    use std::sync::Arc;

    fn discovery(c: u32, d: u32, n: u32, validated: bool) -> Discovery {
        Discovery {
            discoverer: "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f".into(),
            content_hash: format_h256(&[0x11; 32]),
            fractal_hash: format_h256(&[0x22; 32]),
            coherence_score: c,
            density_score: d,
            novelty_score: n,
            validated,
            redundant: false,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn empty_summary_has_zero_averages() {
        let s = DiscoverySummary::from_rows(vec![], 0, 0);
        assert_eq!(s.total_discoveries, 0);
        assert_eq!(s.statistics.avg_pod, 0.0);
        assert_eq!(s.statistics.current_epoch, "Founders");
        assert!(s.render().contains("Total Discoveries: 0"));
    }

    #[test]
    fn statistics_and_json_keys() {
        let rows = vec![
            DiscoveryRow::new(1, format_h256(&[1; 32]), &discovery(9200, 8500, 9500, true), 0, 1_500_000_000_000_000_000),
            DiscoveryRow::new(2, format_h256(&[2; 32]), &discovery(8800, 9200, 9000, false), 0, 0),
            DiscoveryRow::new(3, format_h256(&[3; 32]), &discovery(7000, 6000, 7000, true), 1, 0),
        ];
        let s = DiscoverySummary::from_rows(rows, 23_700, 0);
        assert_eq!(s.statistics.validated, 2);
        assert!((s.statistics.avg_coherence - 25_000.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.statistics.epoch_distribution["Founders"], 2);
        assert_eq!(s.statistics.epoch_distribution["Pioneer"], 1);
        assert_eq!(s.discoveries[0].pod_score, 7429);
        assert_eq!(s.discoveries[0].token_reward, "1.5");

        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["totalDiscoveries"], 3);
        assert_eq!(v["statistics"]["totalCoherenceDensity"], "23700");
        assert!(v["statistics"].get("avgPoD").is_some());
        assert_eq!(v["discoveries"][0]["qualifiedEpoch"], "Founders");
        assert_eq!(v["discoveries"][0]["timestamp"], "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn render_lists_each_discovery_then_statistics() {
        let rows = vec![DiscoveryRow::new(
            1,
            format_h256(&[1; 32]),
            &discovery(9200, 8500, 9500, true),
            0,
            1_500_000_000_000_000_000,
        )];
        let text = DiscoverySummary::from_rows(rows, 8500, 0).render();
        let first = text.find("Discovery #1\n").unwrap();
        let stats = text.find("SUMMARY STATISTICS\n").unwrap();
        assert!(first < stats);
        assert!(text.contains("  Token Reward: 1.5 SYNTH\n"));
        assert!(text.contains("  PoD Score: 7429.00\n"));
        assert!(text.contains("  Founders: 1\n"));
        assert!(text.contains("Current Epoch: Founders\n\n"));
    }

    #[tokio::test]
    async fn collect_reads_every_discovery() {
        let t = Arc::new(ScriptedTransport::default());
        let d = discovery(9200, 8500, 9500, true);
        let discoverer: Address = d.discoverer.parse().unwrap();
        t.reply("eth_call", json!(hex_words(&[word_u(1)])))
            .reply("eth_call", json!(bytes32_array(&[[7; 32]])))
            .reply("eth_call", json!(discovery_words(&d)))
            .reply("eth_call", json!(hex_words(&[word_u(0)])))
            .reply("eth_call", json!(hex_words(&[word_u(2_000_000_000_000_000_000)])))
            .reply("eth_call", json!(hex_words(&[word_u(8500)])))
            .reply("eth_call", json!(hex_words(&[word_u(0)])));
        let mut bridge =
            SyntheverseBridge::with_client(EthClient::new(t.clone()), None, None).unwrap();
        bridge.set_contracts(DeployedContracts {
            token: Address([0x01; 20]),
            pod: Address([0x02; 20]),
            ai_integration: Address([0x03; 20]),
        });
        let s = DiscoverySummary::collect(&bridge).await.unwrap();
        assert_eq!(s.total_discoveries, 1);
        assert_eq!(s.discoveries[0].discovery_id, format_h256(&[7; 32]));
        assert_eq!(s.discoveries[0].token_reward, "2.0");
        assert_eq!(s.statistics.total_coherence_density, "8500");

        // balanceOf is sent to the token contract with the discoverer address
        let calls = t.calls_to("eth_call");
        assert_eq!(calls[4][0]["to"], "0x0101010101010101010101010101010101010101");
        assert!(calls[4][0]["data"]
            .as_str()
            .unwrap()
            .ends_with(&hex::encode(address_word(&discoverer))));
    }
}
