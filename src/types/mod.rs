//! Type definitions for the prediction form

pub mod metadata;
pub mod prediction;

pub use metadata::FeatureMetadata;
pub use prediction::Prediction;
