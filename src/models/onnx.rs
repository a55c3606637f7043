//! ONNX Runtime regressor

use crate::feature_reconciler::FeatureVector;
use crate::models::inference::{InferenceError, Regressor};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Element type of the graph's input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputPrecision {
    Float32,
    Float64,
}

impl InputPrecision {
    /// Double inputs get exact `f64` columns, anything else is fed as `f32`
    fn from_element_type(ty: Option<TensorElementType>) -> Self {
        match ty {
            Some(TensorElementType::Float64) => InputPrecision::Float64,
            _ => InputPrecision::Float32,
        }
    }

    fn encode(self, row: &FeatureVector) -> ort::Result<DynValue> {
        let shape = vec![1_i64, row.len() as i64];
        match self {
            InputPrecision::Float32 => Ok(Tensor::from_array((shape, row.to_f32()))?.into_dyn()),
            InputPrecision::Float64 => {
                Ok(Tensor::from_array((shape, row.values().to_vec()))?.into_dyn())
            }
        }
    }
}

/// Regression graph loaded into an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex
/// to keep the regressor shareable.
pub struct OnnxRegressor {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    input_precision: InputPrecision,
    output_name: String,
}

impl OnnxRegressor {
    /// Load an ONNX model from file
    pub fn load<P: AsRef<Path>>(path: P, name: &str, threads: usize) -> ort::Result<Self> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)?;

        let input = session.inputs.first();
        let input_name = input
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());
        let input_precision =
            InputPrecision::from_element_type(input.and_then(|i| i.input_type.tensor_type()));

        // skl2onnx names the regressor output "variable"
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == "variable" || o.name.contains("predict"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "variable".to_string());

        info!(
            model = %name,
            input = %input_name,
            precision = ?input_precision,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            input_precision,
            output_name,
        })
    }

    /// Pull the first value out of the regression output, accepting either
    /// float or double tensors.
    fn extract_value(&self, outputs: &SessionOutputs) -> Result<f64, InferenceError> {
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or(InferenceError::EmptyOutput)?;

        if let Ok((_shape, data)) = output.try_extract_tensor::<f32>() {
            return data
                .first()
                .map(|&v| v as f64)
                .ok_or(InferenceError::EmptyOutput);
        }

        let (_shape, data) = output
            .try_extract_tensor::<f64>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        data.first().copied().ok_or(InferenceError::EmptyOutput)
    }
}

impl Regressor for OnnxRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, row: &FeatureVector) -> Result<f64, InferenceError> {
        // Input tensor shape [1, num_features]
        let input_tensor = self
            .input_precision
            .encode(row)
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let mut session = self.session.lock().map_err(|_| InferenceError::Poisoned)?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        self.extract_value(&outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_precision_follows_graph() {
        assert_eq!(
            InputPrecision::from_element_type(Some(TensorElementType::Float64)),
            InputPrecision::Float64
        );
        assert_eq!(
            InputPrecision::from_element_type(Some(TensorElementType::Float32)),
            InputPrecision::Float32
        );
        assert_eq!(InputPrecision::from_element_type(None), InputPrecision::Float32);
    }
}
