use std::path::{Path, PathBuf};

pub const PAPER_EXTENSIONS: [&str; 3] = ["md", "txt", "pdf"];

fn lower_ext(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Paper files directly inside `dir`, sorted by file name. A missing or
/// unreadable directory yields an empty list.
pub fn discover_papers(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot list papers dir");
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| lower_ext(p).is_some_and(|ext| PAPER_EXTENSIONS.contains(&ext.as_str())))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

pub fn paper_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn paper_filename(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Text of a `.md`/`.txt` paper. Anything else, or a read failure, is logged and skipped.
pub fn load_paper(path: &Path) -> Option<String> {
    match lower_ext(path).as_deref() {
        Some("md") | Some("txt") => match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "error loading paper");
                None
            }
        },
        Some("pdf") => {
            tracing::warn!(
                file = %path.display(),
                "PDF text extraction is not available; convert the paper to .md or .txt"
            );
            None
        }
        other => {
            tracing::warn!(file = %path.display(), ext = ?other, "unsupported file type");
            None
        }
    }
}
