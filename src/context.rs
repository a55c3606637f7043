//! Prediction context built once at startup and shared by every request

use crate::config::{AppConfig, UnknownFeaturePolicy};
use crate::feature_reconciler::{FeatureReconciler, ReconcileError, Reconciliation, UserInputs};
use crate::form::{validate_fields, FieldSpec};
use crate::models::inference::{InferenceEngine, InferenceError};
use crate::models::loader::{ArtifactLoader, Artifacts, LoadError};
use crate::types::metadata::FeatureMetadata;
use crate::types::prediction::Prediction;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Why a prediction request produced no value
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Rejected(#[from] ReconcileError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Short stable label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Rejected(_) => "unknown_features",
            PredictError::Inference(e) => e.kind(),
        }
    }
}

/// Read-only state needed to serve predictions: metadata, the reconciler, and
/// the inference engine. Never mutated after construction.
pub struct PredictionContext {
    metadata: FeatureMetadata,
    reconciler: FeatureReconciler,
    engine: InferenceEngine,
    fields: Vec<FieldSpec>,
    policy: UnknownFeaturePolicy,
}

impl PredictionContext {
    /// Load artifacts as configured and build the context
    pub fn load(config: &AppConfig) -> Result<Self, LoadError> {
        let loader = ArtifactLoader::with_threads(config.artifacts.onnx_threads);
        let artifacts = loader.load(&config.artifacts)?;

        Self::new(
            artifacts,
            config.form.fields.clone(),
            config.reconcile.unknown_features,
        )
    }

    /// Build the context from loaded artifacts.
    ///
    /// Every form field must pass [`FieldSpec::validate`] and appear once.
    /// Form fields missing from the model's feature list are a warning under
    /// the drop policy and an error under the reject policy.
    pub fn new(
        artifacts: Artifacts,
        fields: Vec<FieldSpec>,
        policy: UnknownFeaturePolicy,
    ) -> Result<Self, LoadError> {
        validate_fields(&fields)?;

        let Artifacts {
            metadata,
            schema,
            model,
        } = artifacts;

        let missing: Vec<String> = fields
            .iter()
            .filter(|f| !schema.contains(&f.name))
            .map(|f| f.name.clone())
            .collect();

        if !missing.is_empty() {
            match policy {
                UnknownFeaturePolicy::Reject => {
                    return Err(LoadError::FieldsNotInMetadata(missing));
                }
                UnknownFeaturePolicy::Drop => {
                    warn!(fields = ?missing, "Form fields are not model features and will be ignored");
                }
            }
        }

        let engine = InferenceEngine::new(model, schema.len());
        let reconciler = FeatureReconciler::new(schema);

        info!(
            model = %engine.model_name(),
            target = %metadata.target_name,
            features = reconciler.feature_count(),
            form_fields = fields.len(),
            policy = ?policy,
            "Prediction context ready"
        );

        Ok(Self {
            metadata,
            reconciler,
            engine,
            fields,
            policy,
        })
    }

    pub fn metadata(&self) -> &FeatureMetadata {
        &self.metadata
    }

    /// Fields the form should show
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Reconcile the inputs and run the model on the resulting row
    pub fn predict(&self, inputs: &UserInputs) -> Result<Prediction, PredictError> {
        let request_id = Uuid::new_v4();
        let Reconciliation { vector, dropped } = self.reconciler.reconcile(inputs);

        if !dropped.is_empty() {
            warn!(
                request_id = %request_id,
                dropped = ?dropped,
                "Supplied features have no model column"
            );
            if self.policy == UnknownFeaturePolicy::Reject {
                return Err(ReconcileError::UnknownFeatures(dropped).into());
            }
        }

        let start = Instant::now();
        match self.engine.predict(&vector) {
            Ok(value) => {
                let latency = start.elapsed();
                info!(
                    request_id = %request_id,
                    prediction = value,
                    latency_us = latency.as_micros() as u64,
                    "Prediction complete"
                );

                Ok(Prediction::new(request_id, value, &self.metadata.target_name)
                    .with_dropped_features(dropped)
                    .with_latency(latency))
            }
            Err(e) => {
                error!(
                    request_id = %request_id,
                    kind = e.kind(),
                    error = %e,
                    "Inference failed"
                );
                Err(e.into())
            }
        }
    }
}
