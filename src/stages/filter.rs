use super::{Classify, StageError, Transform};
use crate::domain::{CategorySet, WorkItem};
use crate::model::{ModelError, SharedModel, ZeroShotModel};
use std::sync::Arc;
use tracing::debug;

/// Thresholded zero-shot classification over a shared model.
pub struct Classifier<M> {
    model: Arc<SharedModel<M>>,
    labels: Vec<String>,
    threshold: f32,
}

impl<M: ZeroShotModel> Classifier<M> {
    pub fn new(model: Arc<SharedModel<M>>, labels: Vec<String>, threshold: f32) -> Self {
        Self {
            model,
            labels,
            threshold,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl<M: ZeroShotModel> Classify for Classifier<M> {
    fn classify(&self, item: &WorkItem) -> Result<CategorySet, ModelError> {
        let scores = self
            .model
            .with(|model| model.score(&item.text, &self.labels))?;

        Ok(scores
            .into_iter()
            .filter(|s| s.score >= self.threshold)
            .map(|s| s.label)
            .collect())
    }
}

/// Drops items without text or without any category above threshold;
/// forwards the rest with their categories attached.
pub struct FilterTransform {
    classifier: Arc<dyn Classify>,
}

impl FilterTransform {
    pub const STAGE: &'static str = "filter";

    pub fn new(classifier: Arc<dyn Classify>) -> Self {
        Self { classifier }
    }
}

impl Transform for FilterTransform {
    fn stage(&self) -> &'static str {
        Self::STAGE
    }

    fn apply(&self, mut item: WorkItem) -> Result<Option<WorkItem>, StageError> {
        if !item.has_text() {
            debug!(item_id = %item.id, "dropping item without text");
            return Ok(None);
        }

        let categories = self
            .classifier
            .classify(&item)
            .map_err(|source| StageError {
                stage: Self::STAGE,
                item_id: item.id.clone(),
                source,
            })?;

        if categories.is_empty() {
            debug!(item_id = %item.id, title = %item.title, "no category above threshold");
            return Ok(None);
        }

        item.categories = categories;
        Ok(Some(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeywordModel;
    use chrono::Utc;

    fn item(text: &str) -> WorkItem {
        WorkItem::new("title", "https://example.com", "Feed", Utc::now(), text)
    }

    fn keyword_filter(threshold: f32) -> FilterTransform {
        let model = Arc::new(SharedModel::ready(
            "keyword",
            KeywordModel::with_default_keywords().unwrap(),
        ));
        let labels = vec!["AI".to_string(), "Funding".to_string()];
        FilterTransform::new(Arc::new(Classifier::new(model, labels, threshold)))
    }

    struct Failing;

    impl Classify for Failing {
        fn classify(&self, _item: &WorkItem) -> Result<CategorySet, ModelError> {
            Err(ModelError::Inference("device lost".to_string()))
        }
    }

    #[test]
    fn forwards_items_with_categories_attached() {
        let filter = keyword_filter(0.5);
        let out = filter
            .apply(item(
                "Startup raised funding from investors for its deep learning and LLM tools",
            ))
            .unwrap()
            .expect("item should pass");

        assert!(out.categories.contains("Funding"));
        assert!(out.categories.contains("AI"));
    }

    #[test]
    fn drops_items_below_threshold() {
        let filter = keyword_filter(0.5);
        assert_eq!(filter.apply(item("A recipe for lemon cake")).unwrap(), None);
    }

    #[test]
    fn drops_items_without_text() {
        let filter = FilterTransform::new(Arc::new(Failing));
        assert_eq!(filter.apply(item("   ")).unwrap(), None);
    }

    #[test]
    fn classifier_failure_is_an_item_level_error() {
        let filter = FilterTransform::new(Arc::new(Failing));
        let err = filter.apply(item("some text")).unwrap_err();
        assert_eq!(err.stage, "filter");
        assert_eq!(err.source, ModelError::Inference("device lost".to_string()));
    }
}
