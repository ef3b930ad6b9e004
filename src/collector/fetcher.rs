//! Feed acquisition over HTTP. RSS 2.0, Atom and JSON Feed documents are
//! all accepted.

use super::{Acquire, CollectorError, FeedRegistry};
use crate::domain::WorkItem;
use chrono::Utc;
use feed_rs::model::{Content, Entry, Text};
use rayon::prelude::*;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const NO_TITLE: &str = "No Title";
const UNKNOWN_SOURCE: &str = "Unknown Source";
const NO_CONTENT: &str = "No content";
const HTML_WRAP_WIDTH: usize = 100;

/// Fetches every registered feed in parallel and flattens the entries into
/// work items, at most `limit` per feed.
pub struct FeedFetcher {
    client: Client,
    feeds: Vec<String>,
}

impl FeedFetcher {
    pub fn new(feeds: Vec<String>, timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pulse-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CollectorError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client, feeds })
    }

    pub fn from_registry(registry: &FeedRegistry, timeout: Duration) -> Result<Self, CollectorError> {
        Self::new(registry.feeds().to_vec(), timeout)
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    fn fetch_feed(&self, url: &str, limit: usize) -> Result<Vec<WorkItem>, CollectorError> {
        let http_err = |source| CollectorError::Http {
            url: url.to_string(),
            source,
        };
        let body = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(http_err)?
            .bytes()
            .map_err(http_err)?;

        parse_feed(&body, limit).map_err(|source| CollectorError::Parse {
            url: url.to_string(),
            source,
        })
    }
}

/// Parse one feed document into at most `limit` work items.
pub fn parse_feed(body: &[u8], limit: usize) -> Result<Vec<WorkItem>, feed_rs::parser::ParseFeedError> {
    let feed = feed_rs::parser::parse(body)?;

    let source = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

    Ok(feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| to_work_item(entry, &source))
        .collect())
}

fn to_work_item(entry: Entry, source: &str) -> WorkItem {
    let raw_title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let id = WorkItem::derive_id(&raw_title, &link);

    let title = if raw_title.is_empty() {
        NO_TITLE.to_string()
    } else {
        raw_title
    };
    let published = entry.published.or(entry.updated).unwrap_or_else(Utc::now);
    let text = entry_text(entry.summary.as_ref(), entry.content.as_ref());

    let mut item = WorkItem::new(title, link, source, published, text);
    item.id = id;
    item
}

/// Feeds often declare plain text as HTML and the other way round, so the
/// body itself decides.
fn is_html(body: &str) -> bool {
    body.contains('<') && body.contains('>')
}

fn html_to_text(html: &str) -> Option<String> {
    match html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "html conversion failed");
            None
        }
    }
}

/// Plain content beats the summary, which beats converted HTML content.
fn entry_text(summary: Option<&Text>, content: Option<&Content>) -> String {
    let content = content
        .and_then(|c| c.body.as_deref())
        .filter(|body| !body.trim().is_empty());

    if let Some(body) = content {
        if !is_html(body) {
            return body.trim().to_string();
        }
    }

    if let Some(summary) = summary.filter(|s| !s.content.trim().is_empty()) {
        if !is_html(&summary.content) {
            return summary.content.trim().to_string();
        }
        if let Some(text) = html_to_text(&summary.content) {
            return text;
        }
    }

    content
        .and_then(html_to_text)
        .unwrap_or_else(|| NO_CONTENT.to_string())
}

impl Acquire for FeedFetcher {
    fn fetch(&self, limit: usize) -> Vec<WorkItem> {
        if self.feeds.is_empty() {
            warn!("no feeds registered");
            return Vec::new();
        }

        let items: Vec<WorkItem> = self
            .feeds
            .par_iter()
            .map(|url| match self.fetch_feed(url, limit) {
                Ok(items) => {
                    debug!(feed = %url, count = items.len(), "feed fetched");
                    items
                }
                Err(e) => {
                    warn!(feed = %url, error = %e, "failed to fetch feed");
                    Vec::new()
                }
            })
            .flatten()
            .collect();

        info!(
            feeds = self.feeds.len(),
            articles = items.len(),
            "acquisition finished"
        );
        items
    }
}
