//! Confirmation-time analysis
//!
//! Cleans mined-transaction observations, buckets `gas_offered` into
//! quantile categories and fits a Poisson model of confirmation delay
//! against network congestion signals.

pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod formula;
pub mod glm;
pub mod provider;
pub mod quantile;
pub mod types;


pub use column::{Column, GasCategory};
pub use config::{FitConfig, ModelConfig};
pub use engine::{GasModelEngine, ModelRun};
pub use error::{AnalysisError, SourceError};
pub use provider::{InMemorySource, ObservationSource};
pub use types::*;
