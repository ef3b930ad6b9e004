use super::ModelError;
use parking_lot::Mutex;
use tracing::{debug, info};

type Init<M> = Box<dyn Fn() -> Result<M, ModelError> + Send + Sync>;

/// A single model instance shared by every worker of a pool.
///
/// The model is built on first use and every call runs under one mutex that
/// belongs to this model alone, so calls never overlap however many workers
/// use it. A failed initialization is not cached; the next call retries.
pub struct SharedModel<M> {
    name: String,
    slot: Mutex<Option<M>>,
    init: Option<Init<M>>,
}

impl<M: Send> SharedModel<M> {
    /// Build the model lazily with `init` on first use.
    pub fn lazy<F>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Result<M, ModelError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            slot: Mutex::new(None),
            init: Some(Box::new(init)),
        }
    }

    /// Wrap an already built model.
    pub fn ready(name: impl Into<String>, model: M) -> Self {
        Self {
            name: name.into(),
            slot: Mutex::new(Some(model)),
            init: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Run `f` with exclusive access to the model.
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut M) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            let init = self.init.as_ref().ok_or_else(|| ModelError::Initialization {
                model: self.name.clone(),
                reason: "no initializer registered".to_string(),
            })?;
            info!(model = %self.name, "loading shared model");
            *slot = Some(init()?);
        }

        match slot.as_mut() {
            Some(model) => f(model),
            None => Err(ModelError::Initialization {
                model: self.name.clone(),
                reason: "model slot empty after initialization".to_string(),
            }),
        }
    }
}

impl<M> Drop for SharedModel<M> {
    fn drop(&mut self) {
        debug!(model = %self.name, "releasing shared model");
    }
}

impl<M> std::fmt::Debug for SharedModel<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedModel")
            .field("name", &self.name)
            .field("lazy", &self.init.is_some())
            .finish_non_exhaustive()
    }
}
