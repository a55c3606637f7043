//! Configuration management for the prediction form

use crate::form::FieldSpec;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Serialized model format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Pick the format from the model file extension
    #[default]
    Auto,
    /// ONNX regression graph executed with ONNX Runtime
    Onnx,
    /// JSON linear artifact (intercept plus per-feature coefficients)
    Linear,
}

impl ModelFormat {
    /// Resolve `Auto` against a model path. Returns `None` for unknown extensions.
    pub fn resolve(self, path: &Path) -> Option<ModelFormat> {
        match self {
            ModelFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("onnx") => Some(ModelFormat::Onnx),
                Some(ext) if ext.eq_ignore_ascii_case("json") => Some(ModelFormat::Linear),
                _ => None,
            },
            explicit => Some(explicit),
        }
    }
}

/// What to do with supplied keys that are not model columns
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFeaturePolicy {
    /// Drop them silently and log them
    #[default]
    Drop,
    /// Fail the prediction with a typed error
    Reject,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub reconcile: ReconcileConfig,
    pub form: FormConfig,
    pub logging: LoggingConfig,
}

/// Model and metadata locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Serialized model file
    pub model_path: PathBuf,
    /// Feature metadata document
    pub metadata_path: PathBuf,
    /// Model format, `auto` infers it from the extension
    pub format: ModelFormat,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/best_model.onnx"),
            metadata_path: PathBuf::from("models/feature_meta.json"),
            format: ModelFormat::Auto,
            onnx_threads: 1,
        }
    }
}

/// Reconciliation configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Handling of supplied keys missing from the model's feature list
    pub unknown_features: UnknownFeaturePolicy,
}

/// Form field configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Fields shown to the user, in display order
    pub fields: Vec<FieldSpec>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            fields: FieldSpec::community_defaults(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// A missing file is not an error: every section falls back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_optional("config/config.toml")
    }

    /// Load configuration from a file that must exist
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path.as_ref(), true)
    }

    /// Load configuration from a file, using defaults when it does not exist
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path.as_ref(), false)
    }

    fn build(path: &Path, required: bool) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(required))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(
            config.artifacts.metadata_path,
            PathBuf::from("models/feature_meta.json")
        );
        assert_eq!(config.artifacts.format, ModelFormat::Auto);
        assert_eq!(config.reconcile.unknown_features, UnknownFeaturePolicy::Drop);
        assert_eq!(config.form.fields.len(), 6);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_optional(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.artifacts.onnx_threads, 1);
        assert_eq!(config.form.fields.len(), 6);

        assert!(AppConfig::load_from_path(dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[artifacts]
model_path = "models/linear_model.json"
format = "linear"

[reconcile]
unknown_features = "reject"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();

        assert_eq!(
            config.artifacts.model_path,
            PathBuf::from("models/linear_model.json")
        );
        assert_eq!(config.artifacts.format, ModelFormat::Linear);
        assert_eq!(
            config.artifacts.metadata_path,
            PathBuf::from("models/feature_meta.json")
        );
        assert_eq!(config.reconcile.unknown_features, UnknownFeaturePolicy::Reject);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/config.toml");
        let config = AppConfig::load_from_path(path).unwrap();

        assert_eq!(config.form.fields, FieldSpec::community_defaults());
        assert_eq!(config.reconcile.unknown_features, UnknownFeaturePolicy::Drop);
    }

    #[test]
    fn test_format_resolution() {
        assert_eq!(
            ModelFormat::Auto.resolve(Path::new("models/best_model.onnx")),
            Some(ModelFormat::Onnx)
        );
        assert_eq!(
            ModelFormat::Auto.resolve(Path::new("models/linear.JSON")),
            Some(ModelFormat::Linear)
        );
        assert_eq!(ModelFormat::Auto.resolve(Path::new("models/best_model.joblib")), None);
        assert_eq!(
            ModelFormat::Onnx.resolve(Path::new("whatever.bin")),
            Some(ModelFormat::Onnx)
        );
    }
}
