//! Bounded retry with typed failure classification.
//!
//! A failure is classified once at the provider boundary. Auth and quota
//! failures are permanent and stop immediately; everything else is retried a
//! fixed number of times with a fixed delay.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::classify;
pub use error::RetryError;
pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
