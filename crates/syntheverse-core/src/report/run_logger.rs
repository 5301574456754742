//! Collects what a multi-paper pipeline run did and writes it as a text and
//! a JSON report.

use super::{iso_timestamp, write_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxEntry {
    pub timestamp: String,
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEntry {
    pub timestamp: String,
    pub error: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub text: PathBuf,
    pub json: PathBuf,
    pub has_errors: bool,
}

#[derive(Debug)]
pub struct RunLogger {
    start: DateTime<Utc>,
    logs: Vec<LogEntry>,
    transactions: Vec<TxEntry>,
    errors: Vec<ErrorEntry>,
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLogger {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            logs: Vec::new(),
            transactions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn log(&mut self, message: impl Into<String>, data: Option<Value>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.logs.push(LogEntry {
            timestamp: iso_timestamp(Utc::now()),
            message,
            data,
        });
    }

    pub fn log_transaction(&mut self, hash: &str, kind: &str, details: Option<Value>) {
        self.transactions.push(TxEntry {
            timestamp: iso_timestamp(Utc::now()),
            hash: hash.to_string(),
            kind: kind.to_string(),
            details: details.clone(),
        });
        self.log(
            format!("Transaction: {}", kind),
            Some(json!({ "hash": hash, "details": details })),
        );
    }

    pub fn log_error(&mut self, error: &anyhow::Error, context: &str) {
        let message = format!("{:#}", error);
        tracing::error!(context, "{}", message);
        self.errors.push(ErrorEntry {
            timestamp: iso_timestamp(Utc::now()),
            error: message.clone(),
            context: context.to_string(),
        });
        self.logs.push(LogEntry {
            timestamp: iso_timestamp(Utc::now()),
            message: format!("ERROR: {}", message),
            data: Some(json!({ "context": context })),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn transactions(&self) -> &[TxEntry] {
        &self.transactions
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    fn status(&self) -> &'static str {
        if self.has_errors() {
            "FAILED"
        } else {
            "SUCCESS"
        }
    }

    fn duration_secs(&self, end: DateTime<Utc>) -> f64 {
        (end - self.start).num_milliseconds() as f64 / 1000.0
    }

    pub fn render_text(&self, end: DateTime<Utc>) -> String {
        let mut out = String::new();
        out.push_str("Syntheverse Blockchain Test Report\n");
        out.push_str("==================================\n\n");
        out.push_str("Test Execution Summary\n----------------------\n");
        out.push_str(&format!("Start Time: {}\n", iso_timestamp(self.start)));
        out.push_str(&format!("End Time: {}\n", iso_timestamp(end)));
        out.push_str(&format!("Duration: {:.2} seconds\n\n", self.duration_secs(end)));
        out.push_str(&format!("Test Status: {}\n", self.status()));
        out.push_str(&format!("Total Errors: {}\n", self.errors.len()));
        out.push_str(&format!("Total Transactions: {}\n", self.transactions.len()));
        out.push_str(&format!("Total Log Entries: {}\n\n", self.logs.len()));

        if !self.errors.is_empty() {
            out.push_str("Errors\n------\n");
            for (i, e) in self.errors.iter().enumerate() {
                out.push_str(&format!("{}. [{}] {}\n", i + 1, e.timestamp, e.context));
                out.push_str(&format!("   Error: {}\n\n", e.error));
            }
        }

        if !self.transactions.is_empty() {
            out.push_str("Transactions\n------------\n");
            for (i, tx) in self.transactions.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, tx.kind));
                out.push_str(&format!("   Hash: {}\n", tx.hash));
                out.push_str(&format!("   Timestamp: {}\n", tx.timestamp));
                if let Some(details) = &tx.details {
                    out.push_str(&format!("   Details: {}\n", indented_json(details)));
                }
                out.push('\n');
            }
        }

        out.push_str("Execution Logs\n--------------\n");
        for log in &self.logs {
            out.push_str(&format!("[{}] {}\n", log.timestamp, log.message));
            if let Some(data) = &log.data {
                out.push_str(&format!("   {}\n", indented_json(data)));
            }
        }
        out
    }

    pub fn json_report(&self, end: DateTime<Utc>) -> Value {
        json!({
            "metadata": {
                "startTime": iso_timestamp(self.start),
                "endTime": iso_timestamp(end),
                "duration": self.duration_secs(end),
                "status": self.status(),
            },
            "summary": {
                "totalErrors": self.errors.len(),
                "totalTransactions": self.transactions.len(),
                "totalLogs": self.logs.len(),
            },
            "errors": self.errors,
            "transactions": self.transactions,
            "logs": self.logs,
        })
    }

    /// Writes `test_report_<timestamp>.txt` and `.json` into `dir`.
    pub fn save_reports(&mut self, dir: &Path) -> anyhow::Result<ReportFiles> {
        std::fs::create_dir_all(dir)?;
        let end = Utc::now();
        let stamp = iso_timestamp(self.start).replace([':', '.'], "-");
        let text = dir.join(format!("test_report_{}.txt", stamp));
        let json = dir.join(format!("test_report_{}.json", stamp));
        std::fs::write(&text, self.render_text(end))?;
        write_json(&self.json_report(end), &json)?;
        self.log(format!("Report saved to: {}", text.display()), None);
        self.log(format!("JSON report saved to: {}", json.display()), None);
        Ok(ReportFiles {
            text,
            json,
            has_errors: self.has_errors(),
        })
    }
}

fn indented_json(v: &Value) -> String {
    serde_json::to_string_pretty(v)
        .unwrap_or_default()
        .replace('\n', "\n   ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_is_success() {
        let mut log = RunLogger::new();
        log.log("Loading papers", None);
        log.log_transaction("0xabc", "Submit Discovery", Some(json!({"paper": "a.md"})));
        assert!(!log.has_errors());
        let report = log.json_report(Utc::now());
        assert_eq!(report["metadata"]["status"], "SUCCESS");
        assert_eq!(report["summary"]["totalTransactions"], 1);
        // the transaction also lands in the log
        assert_eq!(report["summary"]["totalLogs"], 2);
        assert_eq!(report["transactions"][0]["type"], "Submit Discovery");
    }

    #[test]
    fn errors_mark_run_failed() {
        let mut log = RunLogger::new();
        log.log_error(&anyhow::anyhow!("execution reverted"), "Submitting b.md");
        assert!(log.has_errors());
        let text = log.render_text(Utc::now());
        assert!(text.contains("Test Status: FAILED"));
        assert!(text.contains("1. ["));
        assert!(text.contains("Submitting b.md"));
        assert!(text.contains("Error: execution reverted"));
    }

    #[test]
    fn save_reports_writes_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = RunLogger::new();
        log.log("hello", Some(json!({"k": 1})));
        let files = log.save_reports(&tmp.path().join("test_outputs")).unwrap();
        assert!(files.text.exists());
        assert!(files.json.exists());
        assert!(!files.has_errors);
        let name = files.text.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("test_report_"));
        assert!(!name.contains(':'));
        let v: Value =
            serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(v["logs"][0]["data"]["k"], 1);
    }
}
