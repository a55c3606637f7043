//! Model loading and inference components

pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;

pub use inference::{InferenceEngine, InferenceError, Regressor};
pub use linear::LinearModel;
pub use loader::{ArtifactLoader, LoadError};
pub use onnx::OnnxRegressor;
