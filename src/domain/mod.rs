//! Domain layer for pulse-pipeline.
//!
//! Contains the canonical types shared across all modules:
//! - `WorkItem`: The pipeline's core data type
//! - `CategorySet`: Labels assigned by the filter stage
//! - `PipelineError`: Top-level error type

pub mod error;
pub mod work_item;

pub use error::PipelineError;
pub use work_item::{CategorySet, WorkItem};
