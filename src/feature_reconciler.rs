//! Feature reconciliation for model inference.
//!
//! The form only asks the user for a handful of community attributes, while
//! the model was trained on the full numeric feature set. This module fills a
//! complete feature vector from that partial input: every column starts at
//! `0.0` and the supplied values overwrite their matching columns.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while deriving a schema from metadata
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("feature list is empty")]
    Empty,

    #[error("feature '{0}' appears more than once in the feature list")]
    Duplicate(String),
}

/// Errors raised when a strict caller rejects dropped keys
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("unknown feature(s) not used by the model: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),
}

/// Column layout of the model input, derived once from metadata.
///
/// Holds the ordered feature names and a lookup table from name to column
/// index used by the overwrite step.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from an ordered feature list.
    ///
    /// Fails on an empty list or a duplicate name, since either would make the
    /// column identity ambiguous.
    pub fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names, index })
    }

    /// Column index for a feature name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether the schema has a column with this name
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Ordered feature names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed schema
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A single model input row with one value per schema column
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// All-zero row for the given schema
    pub fn zeroed(schema: Arc<FeatureSchema>) -> Self {
        let values = vec![0.0; schema.len()];
        Self { schema, values }
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// Overwrite a named column. Returns false when the name is not a column.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.schema.position(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Values in column order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values in column order, narrowed for runtimes that take `f32` input
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a row built from a schema
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Values entered by the user for one prediction request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInputs {
    values: HashMap<String, f64>,
}

impl UserInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value for the same key
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for UserInputs {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut inputs = Self::new();
        for (name, value) in iter {
            inputs.insert(name, value);
        }
        inputs
    }
}

/// Outcome of reconciling one set of user inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Complete model input row
    pub vector: FeatureVector,
    /// Supplied keys with no matching column, sorted by name
    pub dropped: Vec<String>,
}

impl Reconciliation {
    /// Reject the reconciliation if any supplied key was dropped
    pub fn into_strict(self) -> Result<FeatureVector, ReconcileError> {
        if self.dropped.is_empty() {
            Ok(self.vector)
        } else {
            Err(ReconcileError::UnknownFeatures(self.dropped))
        }
    }
}

/// Fills complete feature vectors from partial user input.
pub struct FeatureReconciler {
    schema: Arc<FeatureSchema>,
}

impl FeatureReconciler {
    /// Create a reconciler for a schema
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    /// Build the model input row for a set of user inputs.
    ///
    /// Every column starts at `0.0`, then each supplied value is written to its
    /// column unchanged. Keys with no matching column are dropped and reported
    /// in [`Reconciliation::dropped`]; this step never fails.
    pub fn reconcile(&self, inputs: &UserInputs) -> Reconciliation {
        let mut vector = FeatureVector::zeroed(Arc::clone(&self.schema));
        let mut dropped = Vec::new();

        for (name, value) in inputs.iter() {
            if !vector.set(name, value) {
                dropped.push(name.to_string());
            }
        }
        dropped.sort();

        Reconciliation { vector, dropped }
    }

    /// Number of columns produced per row
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }
}
