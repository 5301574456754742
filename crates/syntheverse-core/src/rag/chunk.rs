/// Word-window chunking. Texts of at most `chunk_size` words come back
/// unchanged; longer texts are re-joined with single spaces.
///
/// `chunk_overlap` must be smaller than `chunk_size` (enforced by
/// [`crate::config::Settings::validate`]); otherwise the window never advances.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= chunk_size {
        return vec![text.to_string()];
    }
    debug_assert!(chunk_overlap < chunk_size);
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }
    chunks
}
