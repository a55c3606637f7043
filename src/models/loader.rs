//! Artifact loader for the model and its feature metadata

use crate::config::{ArtifactsConfig, ModelFormat};
use crate::feature_reconciler::{FeatureSchema, SchemaError};
use crate::form::FieldError;
use crate::models::inference::Regressor;
use crate::models::linear::{LinearArtifact, LinearModel};
use crate::models::onnx::OnnxRegressor;
use crate::types::metadata::FeatureMetadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Startup failures. Any of these stops the process before the form is shown.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed metadata in {}: {source}", path.display())]
    MalformedMetadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid feature list in {}: {source}", path.display())]
    InvalidMetadata { path: PathBuf, source: SchemaError },

    #[error("malformed linear model in {}: {source}", path.display())]
    MalformedModel {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("linear model {} has a coefficient for unknown feature '{feature}'", path.display())]
    UnknownCoefficient { path: PathBuf, feature: String },

    #[error("cannot infer model format from {}; set artifacts.format", .0.display())]
    UnknownFormat(PathBuf),

    #[error("failed to load ONNX model {}: {message}", path.display())]
    Onnx { path: PathBuf, message: String },

    #[error("form field(s) not in the model feature list: {}", .0.join(", "))]
    FieldsNotInMetadata(Vec<String>),

    #[error("invalid form field: {0}")]
    InvalidField(#[from] FieldError),
}

/// Everything read from disk at startup
pub struct Artifacts {
    pub metadata: FeatureMetadata,
    pub schema: Arc<FeatureSchema>,
    pub model: Box<dyn Regressor>,
}

/// Loader for the model artifact and its metadata sidecar
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a loader with the given number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load metadata and model as configured
    pub fn load(&self, config: &ArtifactsConfig) -> Result<Artifacts, LoadError> {
        let (metadata, schema) = self.load_metadata(&config.metadata_path)?;
        let model = self.load_model(&config.model_path, config.format, &schema)?;

        Ok(Artifacts {
            metadata,
            schema,
            model,
        })
    }

    /// Read the metadata document and derive the column schema from it
    pub fn load_metadata<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(FeatureMetadata, Arc<FeatureSchema>), LoadError> {
        let path = path.as_ref();
        let contents = read_artifact(path)?;

        let metadata: FeatureMetadata =
            serde_json::from_str(&contents).map_err(|source| LoadError::MalformedMetadata {
                path: path.to_path_buf(),
                source,
            })?;

        let schema = FeatureSchema::new(metadata.features.clone()).map_err(|source| {
            LoadError::InvalidMetadata {
                path: path.to_path_buf(),
                source,
            }
        })?;

        info!(
            path = %path.display(),
            target = %metadata.target_name,
            features = schema.len(),
            "Feature metadata loaded"
        );

        Ok((metadata, Arc::new(schema)))
    }

    /// Load the model in the given format, aligned to the schema where the
    /// format allows it
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        format: ModelFormat,
        schema: &FeatureSchema,
    ) -> Result<Box<dyn Regressor>, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let name = model_name(path);

        match format.resolve(path) {
            Some(ModelFormat::Onnx) => {
                let model = OnnxRegressor::load(path, &name, self.onnx_threads).map_err(|e| {
                    LoadError::Onnx {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Box::new(model))
            }
            Some(ModelFormat::Linear) => {
                let model = self.load_linear(path, &name, schema)?;
                Ok(Box::new(model))
            }
            Some(ModelFormat::Auto) | None => Err(LoadError::UnknownFormat(path.to_path_buf())),
        }
    }

    fn load_linear(
        &self,
        path: &Path,
        name: &str,
        schema: &FeatureSchema,
    ) -> Result<LinearModel, LoadError> {
        let contents = read_artifact(path)?;

        let artifact: LinearArtifact =
            serde_json::from_str(&contents).map_err(|source| LoadError::MalformedModel {
                path: path.to_path_buf(),
                source,
            })?;
        let coefficients = artifact.coefficients.len();

        let model = LinearModel::from_artifact(name, artifact, schema).map_err(|feature| {
            LoadError::UnknownCoefficient {
                path: path.to_path_buf(),
                feature,
            }
        })?;

        info!(
            model = %name,
            path = %path.display(),
            coefficients = coefficients,
            "Linear model loaded"
        );

        Ok(model)
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_artifact(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_reconciler::FeatureVector;
    use std::fs;

    const METADATA: &str = r#"{
        "target": "ViolentCrimesPerPop",
        "numeric_features": ["population", "racepctblack", "medIncome", "unrelatedFeature"]
    }"#;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "feature_meta.json", METADATA);

        let (metadata, schema) = ArtifactLoader::new().load_metadata(&path).unwrap();

        assert_eq!(metadata.target_name, "ViolentCrimesPerPop");
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.position("medIncome"), Some(2));
    }

    #[test]
    fn test_missing_metadata_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactLoader::new()
            .load_metadata(dir.path().join("feature_meta.json"))
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_malformed_metadata_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let truncated = write(dir.path(), "truncated.json", r#"{"target": "y", "numeric_"#);
        let duplicated = write(
            dir.path(),
            "duplicated.json",
            r#"{"target": "y", "numeric_features": ["a", "a"]}"#,
        );
        let empty = write(
            dir.path(),
            "empty.json",
            r#"{"target": "y", "numeric_features": []}"#,
        );
        let loader = ArtifactLoader::new();

        assert!(matches!(
            loader.load_metadata(&truncated),
            Err(LoadError::MalformedMetadata { .. })
        ));
        assert!(matches!(
            loader.load_metadata(&duplicated),
            Err(LoadError::InvalidMetadata {
                source: SchemaError::Duplicate(_),
                ..
            })
        ));
        assert!(matches!(
            loader.load_metadata(&empty),
            Err(LoadError::InvalidMetadata {
                source: SchemaError::Empty,
                ..
            })
        ));
    }

    #[test]
    fn test_load_linear_model() {
        let dir = tempfile::tempdir().unwrap();
        let meta = write(dir.path(), "feature_meta.json", METADATA);
        let model = write(
            dir.path(),
            "best_model.json",
            r#"{"intercept": 0.1, "coefficients": {"racepctblack": 0.5}}"#,
        );
        let config = ArtifactsConfig {
            model_path: model,
            metadata_path: meta,
            ..ArtifactsConfig::default()
        };

        let artifacts = ArtifactLoader::new().load(&config).unwrap();
        assert_eq!(artifacts.model.name(), "best_model");

        let mut row = FeatureVector::zeroed(Arc::clone(&artifacts.schema));
        row.set("racepctblack", 10.0);
        let prediction = artifacts.model.predict(&row).unwrap();
        assert!((prediction - 5.1).abs() < 1e-12);
    }

    #[test]
    fn test_linear_model_with_unknown_coefficient() {
        let dir = tempfile::tempdir().unwrap();
        let (_, schema) = ArtifactLoader::new()
            .load_metadata(write(dir.path(), "feature_meta.json", METADATA))
            .unwrap();
        let model = write(
            dir.path(),
            "model.json",
            r#"{"intercept": 0.0, "coefficients": {"typo": 1.0}}"#,
        );

        let err = ArtifactLoader::new()
            .load_model(&model, ModelFormat::Auto, &schema)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LoadError::UnknownCoefficient { ref feature, .. } if feature == "typo"
        ));
    }

    #[test]
    fn test_missing_or_unrecognized_model() {
        let dir = tempfile::tempdir().unwrap();
        let (_, schema) = ArtifactLoader::new()
            .load_metadata(write(dir.path(), "feature_meta.json", METADATA))
            .unwrap();
        let loader = ArtifactLoader::new();

        let missing = loader
            .load_model(dir.path().join("best_model.onnx"), ModelFormat::Auto, &schema)
            .err()
            .unwrap();
        assert!(matches!(missing, LoadError::NotFound(_)));

        let joblib = write(dir.path(), "best_model.joblib", "not a model");
        let unknown = loader
            .load_model(&joblib, ModelFormat::Auto, &schema)
            .err()
            .unwrap();
        assert!(matches!(unknown, LoadError::UnknownFormat(_)));
    }

    #[test]
    fn test_corrupt_onnx_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (_, schema) = ArtifactLoader::new()
            .load_metadata(write(dir.path(), "feature_meta.json", METADATA))
            .unwrap();
        let model = write(dir.path(), "best_model.onnx", "definitely not protobuf");

        let err = ArtifactLoader::new()
            .load_model(&model, ModelFormat::Auto, &schema)
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Onnx { .. }));
    }
}
