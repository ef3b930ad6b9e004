use super::CollectorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use url::Url;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FeedFile {
    #[serde(default)]
    feeds: Vec<String>,
}

/// The list of feed URLs, persisted as `{"feeds": [...]}`.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    path: PathBuf,
    feeds: Vec<String>,
}

impl FeedRegistry {
    /// Load the list, creating an empty file when none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CollectorError> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let registry = Self {
                path,
                feeds: Vec::new(),
            };
            registry.save()?;
            info!(path = %registry.path.display(), "created empty feed list");
            return Ok(registry);
        }

        let content = std::fs::read_to_string(&path)?;
        let file: FeedFile = serde_json::from_str(&content)?;
        Ok(Self {
            path,
            feeds: file.feeds,
        })
    }

    /// Like [`FeedRegistry::open`], but a broken file yields an empty list.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(registry) => registry,
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not load feed list");
                Self {
                    path,
                    feeds: Vec::new(),
                }
            }
        }
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a feed and save. Returns `false` if it was already registered.
    pub fn add_feed(&mut self, url: &str) -> Result<bool, CollectorError> {
        let url = Url::parse(url).map_err(|e| CollectorError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let url = url.to_string();

        if self.feeds.contains(&url) {
            info!(feed = %url, "feed already registered");
            return Ok(false);
        }
        self.feeds.push(url.clone());
        self.save()?;
        info!(feed = %url, "feed added");
        Ok(true)
    }

    /// Remove a feed and save. Returns `false` if it was not registered.
    pub fn remove_feed(&mut self, url: &str) -> Result<bool, CollectorError> {
        let normalized = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string());
        let before = self.feeds.len();
        self.feeds.retain(|feed| feed != &normalized && feed != url);
        if self.feeds.len() == before {
            return Ok(false);
        }
        self.save()?;
        info!(feed = %url, "feed removed");
        Ok(true)
    }

    fn save(&self) -> Result<(), CollectorError> {
        let file = FeedFile {
            feeds: self.feeds.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("feeds.json");

        let registry = FeedRegistry::open(&path).unwrap();
        assert!(registry.feeds().is_empty());
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"feeds\""));
    }

    #[test]
    fn add_feed_is_idempotent_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feeds.json");

        let mut registry = FeedRegistry::open(&path).unwrap();
        assert!(registry.add_feed("https://example.com/feed.json").unwrap());
        assert!(!registry.add_feed("https://example.com/feed.json").unwrap());

        let reloaded = FeedRegistry::open(&path).unwrap();
        assert_eq!(reloaded.feeds(), &["https://example.com/feed.json".to_string()]);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let dir = tempdir().unwrap();
        let mut registry = FeedRegistry::open(dir.path().join("feeds.json")).unwrap();
        assert!(matches!(
            registry.add_feed("not a url"),
            Err(CollectorError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn remove_feed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        let mut registry = FeedRegistry::open(&path).unwrap();
        registry.add_feed("https://a.example/feed").unwrap();
        registry.add_feed("https://b.example/feed").unwrap();

        assert!(registry.remove_feed("https://a.example/feed").unwrap());
        assert!(!registry.remove_feed("https://a.example/feed").unwrap());
        assert_eq!(
            FeedRegistry::open(&path).unwrap().feeds(),
            &["https://b.example/feed".to_string()]
        );
    }

    #[test]
    fn broken_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        std::fs::write(&path, "{not json").unwrap();

        let registry = FeedRegistry::load_or_empty(&path);
        assert!(registry.feeds().is_empty());
    }
}
