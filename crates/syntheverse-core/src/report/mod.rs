//! Status reports read back from the chain, plus the pipeline run log.

pub mod balance;
pub mod format;
pub mod run_logger;
pub mod snapshot;
pub mod summary;

use serde::Serialize;
use std::path::Path;

pub use balance::BalanceReport;
pub use format::{format_ether, format_gwei, format_units};
pub use run_logger::{ReportFiles, RunLogger};
pub use snapshot::{PersistenceSnapshot, SnapshotComparison};
pub use summary::DiscoverySummary;

pub const RULE: &str =
    "================================================================================";

/// Pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(value: &T, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// `2024-01-02T03:04:05.678Z`, the same shape JavaScript's `toISOString` gives.
pub fn iso_timestamp(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn unix_to_iso(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(iso_timestamp)
        .unwrap_or_else(|| secs.to_string())
}

pub(crate) fn epoch_name(index: u64) -> String {
    crate::model::Epoch::from_index(index)
        .map(|e| e.name().to_string())
        .unwrap_or_else(|| format!("Unknown({})", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamps_render_like_js() {
        assert_eq!(unix_to_iso(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(unix_to_iso(1_700_000_000), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/dir/out.json");
        write_json(&serde_json::json!({"a": 1}), &out).unwrap();
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(back["a"], 1);
    }

    #[test]
    fn unknown_epoch_index_is_labelled() {
        assert_eq!(epoch_name(2), "Public");
        assert_eq!(epoch_name(9), "Unknown(9)");
    }
}
