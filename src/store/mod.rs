//! Article persistence backed by an embedded sled database.

use crate::domain::WorkItem;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const ARTICLES_TREE: &str = "articles";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence collaborator, called once per run with the final batch.
///
/// Returns the number of records written. Writing an item whose id already
/// exists replaces the stored record.
pub trait Persist: Send + Sync {
    fn persist(&self, batch: &[WorkItem]) -> Result<usize, StoreError>;
}

/// Articles keyed by id, stored as JSON.
#[derive(Clone)]
pub struct ArticleStore {
    db: sled::Db,
    articles: sled::Tree,
}

impl ArticleStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = sled::open(path)?;
        info!(path = %path.display(), "article store opened");
        Self::from_db(db)
    }

    /// In-memory store removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let articles = db.open_tree(ARTICLES_TREE)?;
        Ok(Self { db, articles })
    }

    pub fn get(&self, id: &str) -> Result<Option<WorkItem>, StoreError> {
        match self.articles.get(id.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Most recently published articles first.
    pub fn recent(&self, limit: usize) -> Result<Vec<WorkItem>, StoreError> {
        let mut all = Vec::with_capacity(self.articles.len());
        for entry in self.articles.iter() {
            let (_, raw) = entry?;
            all.push(serde_json::from_slice::<WorkItem>(&raw)?);
        }
        all.sort_by(|a, b| b.published.cmp(&a.published));
        all.truncate(limit);
        Ok(all)
    }
}

impl Persist for ArticleStore {
    fn persist(&self, batch: &[WorkItem]) -> Result<usize, StoreError> {
        let mut written = 0;
        for item in batch {
            let value = serde_json::to_vec(item)?;
            if self.articles.insert(item.id.as_bytes(), value)?.is_some() {
                debug!(id = %item.id, "replaced existing article");
            }
            written += 1;
        }
        self.db.flush()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn article(title: &str, day: u32) -> WorkItem {
        let published = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        let mut item = WorkItem::new(
            title,
            format!("https://news.example/{title}"),
            "Feed",
            published,
            "body",
        );
        item.categories.insert("AI".to_string());
        item.summary = Some(format!("{title} summary"));
        item
    }

    #[test]
    fn persist_is_an_upsert() {
        let store = ArticleStore::temporary().unwrap();
        let mut first = article("one", 1);

        assert_eq!(store.persist(&[first.clone()]).unwrap(), 1);
        first.summary = Some("updated".to_string());
        assert_eq!(store.persist(&[first.clone()]).unwrap(), 1);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first.id).unwrap(), Some(first));
    }

    #[test]
    fn recent_sorts_newest_first() {
        let store = ArticleStore::temporary().unwrap();
        store
            .persist(&[article("old", 1), article("new", 20), article("mid", 10)])
            .unwrap();

        let titles: Vec<_> = store
            .recent(2)
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid"]);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("articles.db");
        let item = article("kept", 5);
        {
            let store = ArticleStore::open(&path).unwrap();
            store.persist(&[item.clone()]).unwrap();
        }
        let store = ArticleStore::open(&path).unwrap();
        assert_eq!(store.get(&item.id).unwrap(), Some(item));
    }

    #[test]
    fn missing_id_is_none() {
        let store = ArticleStore::temporary().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get("nope").unwrap(), None);
    }
}
