#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Counters stay far below usize::MAX
    clippy::cast_precision_loss,      // Acceptable for scores/display
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. StoreError in store module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod channel;
pub mod collector;
pub mod domain;
pub mod model;
pub mod pipeline;
pub mod stages;
pub mod store;

// Re-export main types for easy access
pub use app::{App, Config};
pub use domain::{CategorySet, PipelineError, WorkItem};
pub use pipeline::{Collaborators, Pipeline, PipelineSettings, RunReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
