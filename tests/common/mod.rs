#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use pulse_pipeline::collector::StaticSource;
use pulse_pipeline::model::ModelError;
use pulse_pipeline::stages::{Classify, Summarize};
use pulse_pipeline::store::{Persist, StoreError};
use pulse_pipeline::{CategorySet, Collaborators, Pipeline, PipelineSettings, RunReport, WorkItem};
use std::sync::Arc;
use std::time::Duration;

pub const DEADLINE: Duration = Duration::from_secs(30);

pub fn article(n: usize, text: &str) -> WorkItem {
    let published = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(n as i64);
    WorkItem::new(
        format!("Article {n}"),
        format!("https://news.example/{n}"),
        "Test Feed",
        published,
        text,
    )
}

pub fn articles(count: usize, text: &str) -> Vec<WorkItem> {
    (0..count).map(|n| article(n, text)).collect()
}

/// Tags every item mentioning "ai" with `AI`; fails on "classify-error".
pub struct WordClassifier;

impl Classify for WordClassifier {
    fn classify(&self, item: &WorkItem) -> Result<CategorySet, ModelError> {
        if item.text.contains("classify-error") {
            return Err(ModelError::Inference("classifier exploded".to_string()));
        }
        let mut categories = CategorySet::new();
        if item.text.split_whitespace().any(|w| w.eq_ignore_ascii_case("ai")) {
            categories.insert("AI".to_string());
        }
        Ok(categories)
    }
}

/// First three words; errors on "summarize-error", panics on "summarize-panic".
pub struct FirstWords;

impl Summarize for FirstWords {
    fn summarize(&self, item: &WorkItem) -> Result<String, ModelError> {
        if item.text.contains("summarize-panic") {
            panic!("summarizer crashed on {}", item.id);
        }
        if item.text.contains("summarize-error") {
            return Err(ModelError::Inference("summarizer exploded".to_string()));
        }
        Ok(item.text.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
    }
}

/// Records every batch it is handed.
#[derive(Default)]
pub struct RecordingStore {
    batches: Mutex<Vec<Vec<WorkItem>>>,
    fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn batches(&self) -> Vec<Vec<WorkItem>> {
        self.batches.lock().clone()
    }
}

impl Persist for RecordingStore {
    fn persist(&self, batch: &[WorkItem]) -> Result<usize, StoreError> {
        self.batches.lock().push(batch.to_vec());
        if self.fail {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        Ok(batch.len())
    }
}

pub fn collaborators(items: Vec<WorkItem>, store: Arc<dyn Persist>) -> Collaborators {
    Collaborators {
        acquire: Arc::new(StaticSource::new(items)),
        classify: Arc::new(WordClassifier),
        summarize: Arc::new(FirstWords),
        persist: store,
    }
}

pub fn settings(filter_workers: usize, summarize_workers: usize) -> PipelineSettings {
    PipelineSettings {
        fetch_limit: usize::MAX,
        filter_workers,
        summarize_workers,
    }
}

/// Run on a helper thread and fail the test if the run does not finish
/// within [`DEADLINE`].
pub fn run_with_deadline(pipeline: Arc<Pipeline>) -> RunReport {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let _ = tx.send(pipeline.run());
    });
    rx.recv_timeout(DEADLINE)
        .expect("pipeline did not terminate in time")
        .expect("pipeline run failed")
}
