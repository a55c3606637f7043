//! Inference boundary around the opaque regression model

use crate::feature_reconciler::FeatureVector;
use thiserror::Error;
use tracing::debug;

/// Classified failure returned from the inference boundary
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("feature vector has {actual} columns but the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model runtime failed: {0}")]
    Runtime(String),

    #[error("model returned no output values")]
    EmptyOutput,

    #[error("model returned a non-finite prediction ({0})")]
    NonFinite(f64),

    #[error("model session lock poisoned")]
    Poisoned,
}

impl InferenceError {
    /// Short stable label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::ShapeMismatch { .. } => "shape_mismatch",
            InferenceError::Runtime(_) => "runtime",
            InferenceError::EmptyOutput => "empty_output",
            InferenceError::NonFinite(_) => "non_finite",
            InferenceError::Poisoned => "poisoned",
        }
    }
}

/// A loaded model that maps one feature row to a scalar.
///
/// Implementations must be safe to share; the context holding them is built
/// once and read from every request.
pub trait Regressor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Predict the target for a single row
    fn predict(&self, row: &FeatureVector) -> Result<f64, InferenceError>;
}

/// Runs the model on reconciled rows and classifies failures
pub struct InferenceEngine {
    model: Box<dyn Regressor>,
    expected_width: usize,
}

impl InferenceEngine {
    /// Wrap a model that expects rows of `expected_width` columns
    pub fn new(model: Box<dyn Regressor>, expected_width: usize) -> Self {
        Self {
            model,
            expected_width,
        }
    }

    /// Name of the wrapped model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run inference on one row
    pub fn predict(&self, row: &FeatureVector) -> Result<f64, InferenceError> {
        if row.len() != self.expected_width {
            return Err(InferenceError::ShapeMismatch {
                expected: self.expected_width,
                actual: row.len(),
            });
        }

        let value = self.model.predict(row)?;
        if !value.is_finite() {
            return Err(InferenceError::NonFinite(value));
        }

        debug!(model = %self.model.name(), prediction = value, "Inference complete");
        Ok(value)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedRegressor;
    use super::*;
    use crate::feature_reconciler::FeatureSchema;
    use std::sync::Arc;

    fn row(width: usize) -> FeatureVector {
        let names = (0..width).map(|i| format!("f{i}")).collect();
        FeatureVector::zeroed(Arc::new(FeatureSchema::new(names).unwrap()))
    }

    #[test]
    fn test_successful_prediction() {
        let engine = InferenceEngine::new(Box::new(FixedRegressor::ok(0.2375)), 3);
        assert_eq!(engine.predict(&row(3)), Ok(0.2375));
        assert_eq!(engine.model_name(), "fixed");
    }

    #[test]
    fn test_width_is_checked_before_the_model_runs() {
        let engine = InferenceEngine::new(Box::new(FixedRegressor::ok(1.0)), 4);
        assert_eq!(
            engine.predict(&row(3)),
            Err(InferenceError::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_non_finite_output_is_classified() {
        let engine = InferenceEngine::new(Box::new(FixedRegressor::ok(f64::INFINITY)), 1);
        let err = engine.predict(&row(1)).unwrap_err();
        assert_eq!(err.kind(), "non_finite");
    }

    #[test]
    fn test_model_failure_passes_through() {
        let engine = InferenceEngine::new(
            Box::new(FixedRegressor::failing(InferenceError::Runtime(
                "graph exploded".to_string(),
            ))),
            2,
        );
        let err = engine.predict(&row(2)).unwrap_err();
        assert_eq!(err.kind(), "runtime");
        assert_eq!(err.to_string(), "model runtime failed: graph exploded");
    }
}
