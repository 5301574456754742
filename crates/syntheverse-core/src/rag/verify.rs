use crate::model::PaperSummary;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Verification {
    pub expected: BTreeSet<String>,
    pub loaded: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
    pub total_chunks: usize,
}

impl Verification {
    /// Extra papers in the store are reported but do not fail verification.
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compares paper file names on disk with those recorded in `summary`.
pub fn verify(papers_dir: &Path, summary: &PaperSummary) -> Verification {
    let expected: BTreeSet<String> = super::loader::discover_papers(papers_dir)
        .iter()
        .map(|p| super::loader::paper_filename(p))
        .collect();
    let loaded: BTreeSet<String> = summary.papers.iter().map(|p| p.filename.clone()).collect();
    Verification {
        missing: expected.difference(&loaded).cloned().collect(),
        extra: loaded.difference(&expected).cloned().collect(),
        expected,
        loaded,
        total_chunks: summary.total_chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaperEntry;

    #[test]
    fn missing_fails_extra_does_not() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.md"), "x").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "x").unwrap();
        let summary = PaperSummary {
            total_papers: 2,
            total_chunks: 3,
            papers: vec![
                PaperEntry {
                    paper_id: "a".into(),
                    filename: "a.md".into(),
                    chunks: 2,
                },
                PaperEntry {
                    paper_id: "old".into(),
                    filename: "old.md".into(),
                    chunks: 1,
                },
            ],
        };
        let v = verify(tmp.path(), &summary);
        assert!(!v.is_ok());
        assert_eq!(v.missing.iter().collect::<Vec<_>>(), vec!["b.txt"]);
        assert_eq!(v.extra.iter().collect::<Vec<_>>(), vec!["old.md"]);

        std::fs::remove_file(tmp.path().join("b.txt")).unwrap();
        assert!(verify(tmp.path(), &summary).is_ok());
    }
}
