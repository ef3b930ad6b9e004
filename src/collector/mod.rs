//! Acquisition: where work items come from.

pub mod feeds;
pub mod fetcher;

use crate::domain::WorkItem;
use thiserror::Error;

pub use feeds::FeedRegistry;
pub use fetcher::FeedFetcher;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Feed list error: {0}")]
    FeedList(#[from] std::io::Error),

    #[error("Feed list is not valid JSON: {0}")]
    FeedListFormat(#[from] serde_json::Error),

    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed at {url} could not be parsed: {source}")]
    Parse {
        url: String,
        #[source]
        source: feed_rs::parser::ParseFeedError,
    },
}

/// Acquisition collaborator, called once per run by the source stage.
///
/// Failures of individual sources are handled inside: they are logged and the
/// source contributes no items.
pub trait Acquire: Send + Sync {
    fn fetch(&self, limit: usize) -> Vec<WorkItem>;
}

/// Fixed item list, for embedding and replays.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    items: Vec<WorkItem>,
}

impl StaticSource {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }
}

impl Acquire for StaticSource {
    fn fetch(&self, limit: usize) -> Vec<WorkItem> {
        self.items.iter().take(limit).cloned().collect()
    }
}
