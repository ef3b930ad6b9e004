//! Text models behind the filter and summarize stages.
//!
//! Models are not assumed to be safe for concurrent use: their methods take
//! `&mut self`, and the only way to share one between workers is a
//! [`SharedModel`], which serializes every call behind the model's own lock.

pub mod keyword;
pub mod lead;
pub mod shared;

use thiserror::Error;

pub use keyword::KeywordModel;
pub use lead::LeadModel;
pub use shared::SharedModel;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model '{model}' failed to initialize: {reason}")]
    Initialization { model: String, reason: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Confidence of one candidate label for a text.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Zero-shot style classifier: scores arbitrary candidate labels.
pub trait ZeroShotModel: Send {
    fn score(&mut self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, ModelError>;
}

/// Abstractive or extractive summarizer.
pub trait SummaryModel: Send {
    fn summarize(&mut self, text: &str, max_words: usize) -> Result<String, ModelError>;
}
