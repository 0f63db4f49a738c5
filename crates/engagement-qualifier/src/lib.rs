//! Engagement request qualification: deterministic scoring, model-backed
//! approval decisions, operating-unit notification and natural-language
//! queries over stored requests.

pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;

pub use error::AppError;
