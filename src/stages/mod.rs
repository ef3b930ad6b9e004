//! Stage transformations applied by the worker pools.
//!
//! A [`Transform`] maps one item to `Some(item)` (forward downstream),
//! `None` (drop) or an error (logged by the pool, item dropped).

pub mod filter;
pub mod summarize;

use crate::domain::{CategorySet, WorkItem};
use crate::model::ModelError;
use thiserror::Error;

pub use filter::{Classifier, FilterTransform};
pub use summarize::{SummarizeTransform, Summarizer};

/// Item-level failure inside a stage. Never fatal to the run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} failed for item '{item_id}': {source}")]
pub struct StageError {
    pub stage: &'static str,
    pub item_id: String,
    #[source]
    pub source: ModelError,
}

/// A stage transformation run concurrently by every worker of a pool.
pub trait Transform: Send + Sync {
    fn stage(&self) -> &'static str;

    fn apply(&self, item: WorkItem) -> Result<Option<WorkItem>, StageError>;
}

/// Filter collaborator: the labels that pass thresholding for an item.
pub trait Classify: Send + Sync {
    fn classify(&self, item: &WorkItem) -> Result<CategorySet, ModelError>;
}

/// Summarize collaborator.
pub trait Summarize: Send + Sync {
    fn summarize(&self, item: &WorkItem) -> Result<String, ModelError>;
}
