//! JSON linear regression artifact

use crate::feature_reconciler::{FeatureSchema, FeatureVector};
use crate::models::inference::{InferenceError, Regressor};
use serde::Deserialize;
use std::collections::HashMap;

/// On-disk layout of a linear artifact
#[derive(Debug, Clone, Deserialize)]
pub struct LinearArtifact {
    pub intercept: f64,
    /// Coefficient per feature name; missing features weigh zero
    pub coefficients: HashMap<String, f64>,
}

/// Linear model with weights laid out in schema column order
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    intercept: f64,
    weights: Vec<f64>,
}

impl LinearModel {
    /// Align an artifact to a schema.
    ///
    /// Returns the offending name if the artifact carries a coefficient for a
    /// feature the schema does not have.
    pub fn from_artifact(
        name: &str,
        artifact: LinearArtifact,
        schema: &FeatureSchema,
    ) -> Result<Self, String> {
        let mut weights = vec![0.0; schema.len()];

        for (feature, coefficient) in artifact.coefficients {
            match schema.position(&feature) {
                Some(i) => weights[i] = coefficient,
                None => return Err(feature),
            }
        }

        Ok(Self {
            name: name.to_string(),
            intercept: artifact.intercept,
            weights,
        })
    }

    /// Weights in column order
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl Regressor for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, row: &FeatureVector) -> Result<f64, InferenceError> {
        if row.len() != self.weights.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.weights.len(),
                actual: row.len(),
            });
        }

        let dot: f64 = row
            .values()
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum();

        Ok(self.intercept + dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(
            FeatureSchema::new(vec![
                "population".to_string(),
                "medIncome".to_string(),
                "PctPopUnderPov".to_string(),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_linear_prediction() {
        let artifact: LinearArtifact = serde_json::from_str(
            r#"{"intercept": 0.25, "coefficients": {"population": 0.000001, "PctPopUnderPov": 0.01}}"#,
        )
        .unwrap();
        let model = LinearModel::from_artifact("linear", artifact, &schema()).unwrap();
        assert_eq!(model.weights(), &[0.000001, 0.0, 0.01]);

        let mut row = FeatureVector::zeroed(schema());
        row.set("population", 50000.0);
        row.set("medIncome", 35000.0);
        row.set("PctPopUnderPov", 12.0);

        let prediction = model.predict(&row).unwrap();
        assert!((prediction - (0.25 + 0.05 + 0.12)).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_coefficient_is_rejected() {
        let artifact = LinearArtifact {
            intercept: 0.0,
            coefficients: HashMap::from([("typo".to_string(), 1.0)]),
        };

        let err = LinearModel::from_artifact("linear", artifact, &schema()).unwrap_err();
        assert_eq!(err, "typo");
    }
}
