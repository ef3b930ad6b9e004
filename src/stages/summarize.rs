use super::{StageError, Summarize, Transform};
use crate::domain::WorkItem;
use crate::model::{ModelError, SharedModel, SummaryModel};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Summary collaborator over a shared model with a fixed word budget.
pub struct Summarizer<M> {
    model: Arc<SharedModel<M>>,
    max_words: usize,
}

impl<M: SummaryModel> Summarizer<M> {
    pub fn new(model: Arc<SharedModel<M>>, max_words: usize) -> Self {
        Self { model, max_words }
    }
}

impl<M: SummaryModel> Summarize for Summarizer<M> {
    fn summarize(&self, item: &WorkItem) -> Result<String, ModelError> {
        if !item.has_text() {
            return Ok(String::new());
        }
        self.model
            .with(|model| model.summarize(&item.text, self.max_words))
    }
}

/// Attaches a summary to every item. Never drops: a failed summary becomes
/// an empty one and the item moves on.
pub struct SummarizeTransform {
    summarizer: Arc<dyn Summarize>,
    fallbacks: AtomicU64,
}

impl SummarizeTransform {
    pub const STAGE: &'static str = "summarize";

    pub fn new(summarizer: Arc<dyn Summarize>) -> Self {
        Self {
            summarizer,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Items that were forwarded with an empty summary after a failure.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}

impl Transform for SummarizeTransform {
    fn stage(&self) -> &'static str {
        Self::STAGE
    }

    fn apply(&self, mut item: WorkItem) -> Result<Option<WorkItem>, StageError> {
        let summary = match self.summarizer.summarize(&item) {
            Ok(summary) => summary,
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    item_id = %item.id,
                    title = %item.title,
                    error = %e,
                    "summarization failed, forwarding with empty summary"
                );
                String::new()
            }
        };

        item.summary = Some(summary);
        Ok(Some(item))
    }
}
