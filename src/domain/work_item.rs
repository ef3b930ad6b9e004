use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category labels attached by the filter stage. Ordered so stored records
/// and logs are stable across runs.
pub type CategorySet = BTreeSet<String>;

/// One article flowing through the pipeline.
///
/// Owned by exactly one stage at a time: it moves through the channels by
/// value, so two stages can never mutate the same item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Content-derived identity (md5 of title + link).
    pub id: String,
    pub title: String,
    pub link: String,
    /// Origin label, usually the feed title.
    pub source: String,
    pub published: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub categories: CategorySet,
    /// `None` until the summarize stage has seen the item.
    #[serde(default)]
    pub summary: Option<String>,
}

impl WorkItem {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        source: impl Into<String>,
        published: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let link = link.into();
        Self {
            id: Self::derive_id(&title, &link),
            title,
            link,
            source: source.into(),
            published,
            text: text.into(),
            categories: CategorySet::new(),
            summary: None,
        }
    }

    /// Stable identity for an article: the same title and link always map to
    /// the same id, which is what makes persistence an upsert.
    #[must_use]
    pub fn derive_id(title: &str, link: &str) -> String {
        let mut base = String::with_capacity(title.len() + link.len());
        base.push_str(title);
        base.push_str(link);
        format!("{:x}", md5::compute(base.as_bytes()))
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, link: &str) -> WorkItem {
        WorkItem::new(title, link, "Feed", Utc::now(), "body")
    }

    #[test]
    fn id_is_derived_from_title_and_link() {
        let a = item("Rust 2024", "https://example.com/a");
        let b = item("Rust 2024", "https://example.com/a");
        let c = item("Rust 2024", "https://example.com/b");

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn new_item_starts_without_categories_or_summary() {
        let item = item("t", "l");
        assert!(item.categories.is_empty());
        assert!(item.summary.is_none());
    }

    #[test]
    fn blank_text_is_not_text() {
        let mut item = item("t", "l");
        item.text = "  \n\t".to_string();
        assert!(!item.has_text());
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let json = r#"{
            "id": "abc",
            "title": "t",
            "link": "l",
            "source": "s",
            "published": "2025-01-01T00:00:00Z",
            "text": "x"
        }"#;
        let item: WorkItem = serde_json::from_str(json).unwrap();
        assert!(item.categories.is_empty());
        assert_eq!(item.summary, None);
    }
}
