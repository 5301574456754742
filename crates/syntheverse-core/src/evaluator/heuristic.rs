use super::DiscoveryEvaluator;
use crate::model::{Evaluation, EvaluationSource, FractalEmbedding, Scores, SCORE_MAX};
use async_trait::async_trait;
use std::collections::HashSet;

pub const COHERENCE_KEYWORDS: [&str; 5] =
    ["fractal", "hydrogen", "holographic", "coherence", "structure"];

/// Offline scorer used when no LLM is configured. Deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEvaluator;

impl HeuristicEvaluator {
    pub fn score(content: &str) -> Evaluation {
        let length = content.chars().count() as u64;
        let lower = content.to_lowercase();
        let max = SCORE_MAX as u64;

        let hits = COHERENCE_KEYWORDS
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count() as u64;
        let coherence = (5000 + 100 * hits).min(max);
        let density = (length / 10 + 5000).min(max);
        let unique_terms = lower.split_whitespace().collect::<HashSet<_>>().len() as u64;
        let novelty = (unique_terms * 10 + 5000).min(max);

        Evaluation::new(
            Scores::new(coherence as u32, density as u32, novelty as u32),
            format!(
                "Mock evaluation: length={}, keywords={}",
                length,
                COHERENCE_KEYWORDS.len()
            ),
            EvaluationSource::Heuristic,
        )
    }
}

#[async_trait]
impl DiscoveryEvaluator for HeuristicEvaluator {
    async fn evaluate(
        &self,
        content: &str,
        _fractal_embedding: Option<&FractalEmbedding>,
        _context: Option<&str>,
    ) -> Evaluation {
        Self::score(content)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_follow_length_keywords_and_terms() {
        let content = "Hydrogen fractal structure of the fractal field";
        let e = HeuristicEvaluator::score(content);
        // hydrogen, fractal, structure
        assert_eq!(e.scores.coherence, 5300);
        // 47 chars
        assert_eq!(e.scores.density, 5004);
        // hydrogen fractal structure of the field
        assert_eq!(e.scores.novelty, 5060);
        assert_eq!(e.analysis, "Mock evaluation: length=47, keywords=5");
        assert_eq!(e.source, EvaluationSource::Heuristic);
    }

    #[test]
    fn scores_are_capped() {
        let content: String = (0..2000).map(|i| format!("t{} ", i)).collect();
        let e = HeuristicEvaluator::score(&content);
        assert_eq!(e.scores.density, 10_000);
        assert_eq!(e.scores.novelty, 10_000);
        assert_eq!(e.scores.coherence, 5000);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let e = HeuristicEvaluator::score("ΛΛΛΛΛΛΛΛΛΛ");
        assert_eq!(e.scores.density, 5001);
    }
}
