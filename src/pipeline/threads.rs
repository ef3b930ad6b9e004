use crate::domain::PipelineError;
use std::thread::{self, JoinHandle};
use tracing::{Span, error};

/// Named stage threads of one run, all entering the run's span.
pub struct StageThreads {
    span: Span,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl StageThreads {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            handles: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: &str, body: F) -> Result<(), PipelineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let span = self.span.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _entered = span.enter();
                body();
            })
            .map_err(|source| PipelineError::Startup {
                details: format!("failed to spawn stage thread '{name}'"),
                source,
            })?;
        self.handles.push((name.to_string(), handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Join every thread, in spawn order. All threads are joined even when
    /// some panicked; the first panic is reported.
    pub fn join_all(self) -> Result<(), PipelineError> {
        let mut first_panic = None;
        for (name, handle) in self.handles {
            if handle.join().is_err() {
                error!(stage = %name, "stage thread panicked");
                first_panic.get_or_insert(name);
            }
        }
        match first_panic {
            Some(stage) => Err(PipelineError::StagePanicked { stage }),
            None => Ok(()),
        }
    }
}
