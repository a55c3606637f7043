//! Feature metadata shipped alongside the model artifact

use serde::Deserialize;

/// Sidecar descriptor written at training time next to the serialized model.
///
/// The feature list defines the exact column order and identity the model
/// expects at inference time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureMetadata {
    /// Column the model was trained to predict
    #[serde(rename = "target")]
    pub target_name: String,

    /// Every numeric feature the model was trained on, in column order
    #[serde(rename = "numeric_features")]
    pub features: Vec<String>,
}

impl FeatureMetadata {
    /// Create metadata from a target name and an ordered feature list
    pub fn new(target_name: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            target_name: target_name.into(),
            features,
        }
    }

    /// Number of columns the model expects
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Whether a feature name is part of the model input
    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_deserialization() {
        let json = r#"{
            "target": "ViolentCrimesPerPop",
            "numeric_features": ["population", "racepctblack", "medIncome"],
            "categorical_features": []
        }"#;

        let meta: FeatureMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(meta.target_name, "ViolentCrimesPerPop");
        assert_eq!(meta.feature_count(), 3);
        assert!(meta.contains("medIncome"));
        assert!(!meta.contains("typo"));
    }

    #[test]
    fn test_metadata_requires_target() {
        let json = r#"{"numeric_features": ["population"]}"#;
        assert!(serde_json::from_str::<FeatureMetadata>(json).is_err());
    }
}
