//! Crime Rate Predictor Library
//!
//! An interactive form that estimates violent crimes per capita for a
//! community from a handful of attributes, using a pre-trained regression
//! artifact and its feature metadata.

pub mod config;
pub mod context;
pub mod feature_reconciler;
pub mod form;
pub mod metrics;
pub mod models;
pub mod session;
pub mod types;

pub use config::AppConfig;
pub use context::{PredictError, PredictionContext};
pub use feature_reconciler::{FeatureReconciler, FeatureSchema, FeatureVector, UserInputs};
pub use models::inference::InferenceEngine;
pub use session::FormSession;
pub use types::{metadata::FeatureMetadata, prediction::Prediction};
