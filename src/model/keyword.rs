//! Keyword-driven zero-shot scorer.
//!
//! Each label owns a keyword set; a label's score grows with the number of
//! distinct keywords found in the text and saturates at
//! [`KeywordModel::SATURATION`] hits.
use super::{LabelScore, ModelError, ZeroShotModel};
use regex::Regex;
use std::collections::HashMap;

/// Labels used when no candidate list is configured.
pub const DEFAULT_LABELS: &[&str] = &[
    "AI",
    "Startups",
    "Funding",
    "Technology",
    "Research",
    "Business",
    "Patent",
];

#[derive(Debug, Clone)]
pub struct KeywordModel {
    /// Lowercased label -> one compiled matcher per keyword.
    matchers: HashMap<String, Vec<Regex>>,
}

impl KeywordModel {
    pub const SATURATION: f32 = 3.0;

    /// Build from label -> keyword lists. Keywords match whole words,
    /// case-insensitively.
    pub fn new<L, K>(keywords: impl IntoIterator<Item = (L, Vec<K>)>) -> Result<Self, ModelError>
    where
        L: AsRef<str>,
        K: AsRef<str>,
    {
        let mut matchers = HashMap::new();
        for (label, words) in keywords {
            let compiled = words
                .iter()
                .map(|word| {
                    let pattern = format!(r"(?i)\b{}\b", regex::escape(word.as_ref()));
                    Regex::new(&pattern).map_err(|e| ModelError::Initialization {
                        model: "keyword".to_string(),
                        reason: format!("invalid keyword '{}': {e}", word.as_ref()),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            matchers.insert(label.as_ref().to_lowercase(), compiled);
        }
        Ok(Self { matchers })
    }

    /// Keyword table for the default tech-news labels.
    pub fn with_default_keywords() -> Result<Self, ModelError> {
        Self::new([
            (
                "ai",
                vec![
                    "ai",
                    "artificial intelligence",
                    "machine learning",
                    "deep learning",
                    "neural network",
                    "llm",
                    "language model",
                    "gpt",
                    "chatgpt",
                    "openai",
                    "anthropic",
                    "transformer",
                    "computer vision",
                    "generative",
                ],
            ),
            (
                "startups",
                vec![
                    "startup",
                    "startups",
                    "founder",
                    "founders",
                    "co-founder",
                    "incubator",
                    "accelerator",
                    "y combinator",
                    "launch",
                    "stealth",
                    "unicorn",
                ],
            ),
            (
                "funding",
                vec![
                    "funding",
                    "raised",
                    "raises",
                    "seed round",
                    "series a",
                    "series b",
                    "series c",
                    "venture capital",
                    "investors",
                    "valuation",
                    "investment",
                    "ipo",
                ],
            ),
            (
                "technology",
                vec![
                    "technology",
                    "software",
                    "hardware",
                    "cloud",
                    "open source",
                    "developer",
                    "developers",
                    "programming",
                    "chip",
                    "semiconductor",
                    "api",
                    "platform",
                    "rust",
                ],
            ),
            (
                "research",
                vec![
                    "research",
                    "researchers",
                    "study",
                    "paper",
                    "arxiv",
                    "university",
                    "laboratory",
                    "experiment",
                    "benchmark",
                    "peer-reviewed",
                    "scientists",
                ],
            ),
            (
                "business",
                vec![
                    "business",
                    "revenue",
                    "profit",
                    "market",
                    "acquisition",
                    "acquires",
                    "merger",
                    "earnings",
                    "ceo",
                    "enterprise",
                    "customers",
                    "shares",
                ],
            ),
            (
                "patent",
                vec![
                    "patent",
                    "patents",
                    "patented",
                    "intellectual property",
                    "uspto",
                    "trademark",
                    "infringement",
                    "licensing",
                ],
            ),
        ])
    }

    fn hits(&self, label: &str, text: &str) -> usize {
        self.matchers
            .get(&label.to_lowercase())
            .map_or(0, |matchers| {
                matchers.iter().filter(|re| re.is_match(text)).count()
            })
    }
}

impl ZeroShotModel for KeywordModel {
    fn score(&mut self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, ModelError> {
        if labels.is_empty() {
            return Err(ModelError::InvalidInput(
                "no candidate labels given".to_string(),
            ));
        }

        let mut scores: Vec<LabelScore> = labels
            .iter()
            .map(|label| LabelScore {
                label: label.clone(),
                score: (self.hits(label, text) as f32 / Self::SATURATION).min(1.0),
            })
            .collect();

        // Highest confidence first, as zero-shot pipelines report them
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn scores_saturate_and_sort_descending() {
        let mut model = KeywordModel::with_default_keywords().unwrap();
        let text = "The startup raised a seed round from venture capital investors \
                    to build machine learning tools.";
        let scores = model
            .score(text, &labels(&["AI", "Funding", "Patent"]))
            .unwrap();

        assert_eq!(scores[0].label, "Funding");
        assert!((scores[0].score - 1.0).abs() < f32::EPSILON);
        let ai = scores.iter().find(|s| s.label == "AI").unwrap();
        assert!((ai.score - 1.0 / 3.0).abs() < 1e-6);
        let patent = scores.iter().find(|s| s.label == "Patent").unwrap();
        assert!(patent.score.abs() < f32::EPSILON);
    }

    #[test]
    fn matches_whole_words_only() {
        let mut model = KeywordModel::new([("ai", vec!["ai"])]).unwrap();
        let scores = model
            .score("A fair and maintained email chain", &labels(&["AI"]))
            .unwrap();
        assert!(scores[0].score.abs() < f32::EPSILON);

        let scores = model.score("New AI model", &labels(&["AI"])).unwrap();
        assert!(scores[0].score > 0.0);
    }

    #[test]
    fn unknown_labels_score_zero() {
        let mut model = KeywordModel::with_default_keywords().unwrap();
        let scores = model.score("anything", &labels(&["Gardening"])).unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores[0].score.abs() < f32::EPSILON);
    }

    #[test]
    fn empty_label_list_is_rejected() {
        let mut model = KeywordModel::with_default_keywords().unwrap();
        assert!(matches!(
            model.score("text", &[]),
            Err(ModelError::InvalidInput(_))
        ));
    }
}
