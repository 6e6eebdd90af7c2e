pub mod config;
pub mod logging;

pub mod aggregate;
pub mod error;
pub mod executor;
pub mod job;
pub mod manifest;
pub mod pipeline;
pub mod preflight;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod scheduler;
pub mod state;

pub use error::{FailureKind, PipelineError};
pub use job::{CanonicalImageJob, ImageResult};
pub use pipeline::{GenerateOptions, Pipeline, RunReport};
