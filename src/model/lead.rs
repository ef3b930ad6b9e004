use super::{ModelError, SummaryModel};
use unicode_segmentation::UnicodeSegmentation;

/// Extractive summarizer: keeps leading sentences up to a word budget.
///
/// Sentences follow UAX#29 boundaries. The sentence that crosses the budget is
/// cut at the last word that fits.
#[derive(Debug, Clone, Default)]
pub struct LeadModel;

impl LeadModel {
    pub fn new() -> Self {
        Self
    }
}

impl SummaryModel for LeadModel {
    fn summarize(&mut self, text: &str, max_words: usize) -> Result<String, ModelError> {
        if max_words == 0 {
            return Err(ModelError::InvalidInput(
                "max_words must be greater than 0".to_string(),
            ));
        }

        let mut summary: Vec<String> = Vec::new();
        let mut budget = max_words;

        for sentence in text.unicode_sentences() {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }

            let words: Vec<&str> = sentence.split_whitespace().collect();
            if words.len() <= budget {
                budget -= words.len();
                summary.push(words.join(" "));
            } else {
                summary.push(words[..budget].join(" "));
                budget = 0;
            }

            if budget == 0 {
                break;
            }
        }

        Ok(summary.join(" "))
    }
}
