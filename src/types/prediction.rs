//! Prediction result handed to the presentation layer

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// A single scalar prediction produced for one form submission
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Identifier used to correlate log lines for this request
    pub request_id: Uuid,

    /// Predicted value of the target column
    pub value: f64,

    /// Name of the predicted target column
    pub target: String,

    /// Supplied keys that had no matching model column
    pub dropped_features: Vec<String>,

    /// Time spent inside the model
    pub latency: Duration,

    /// When the prediction was produced
    pub timestamp: DateTime<Utc>,
}

impl Prediction {
    /// Create a new prediction for the given target
    pub fn new(request_id: Uuid, value: f64, target: impl Into<String>) -> Self {
        Self {
            request_id,
            value,
            target: target.into(),
            dropped_features: Vec::new(),
            latency: Duration::ZERO,
            timestamp: Utc::now(),
        }
    }

    /// Record the keys dropped during reconciliation
    pub fn with_dropped_features(mut self, dropped: Vec<String>) -> Self {
        self.dropped_features = dropped;
        self
    }

    /// Record the inference latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Value rounded to four decimal digits for display
    pub fn formatted_value(&self) -> String {
        format!("{:.4}", self.value)
    }
}
