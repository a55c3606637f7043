//! User-facing form fields and their bounds

use crate::feature_reconciler::UserInputs;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Lower bound shared by every community attribute
pub const DEFAULT_MIN: f64 = 0.0;
/// Upper bound shared by every community attribute
pub const DEFAULT_MAX: f64 = 1e12;
/// Increment applied by the step commands
pub const DEFAULT_STEP: f64 = 1.0;

fn default_min() -> f64 {
    DEFAULT_MIN
}

fn default_max() -> f64 {
    DEFAULT_MAX
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

/// A configured field the form cannot use
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldError {
    #[error("field '{name}' needs finite bounds and default, got min {min}, max {max}, default {default}")]
    NonFinite {
        name: String,
        min: f64,
        max: f64,
        default: f64,
    },

    #[error("field '{name}' has min {min} above max {max}")]
    InvertedBounds { name: String, min: f64, max: f64 },

    #[error("field '{name}' needs a finite step above zero, got {step}")]
    InvalidStep { name: String, step: f64 },

    #[error("field '{0}' is listed more than once")]
    Duplicate(String),
}

/// Check every field and reject repeated names
pub fn validate_fields(fields: &[FieldSpec]) -> Result<(), FieldError> {
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        field.validate()?;
        if !seen.insert(field.name.as_str()) {
            return Err(FieldError::Duplicate(field.name.clone()));
        }
    }
    Ok(())
}

/// One bounded numeric input shown to the user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSpec {
    /// Model feature the value is written to
    pub name: String,
    /// Label shown next to the input
    pub label: String,
    /// Initial value
    #[serde(default)]
    pub default: f64,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

impl FieldSpec {
    /// Field with the shared bounds and step
    pub fn new(name: &str, label: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            step: DEFAULT_STEP,
        }
    }

    /// The six community attributes the form asks for
    pub fn community_defaults() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("population", "Population", 50000.0),
            FieldSpec::new("racepctblack", "% Black Population", 10.0),
            FieldSpec::new("medIncome", "Median Income", 35000.0),
            FieldSpec::new("racePctHisp", "% Hispanic Population", 15.0),
            FieldSpec::new("racePctWhite", "% White Population", 60.0),
            FieldSpec::new("PctPopUnderPov", "% Under Poverty Line", 12.0),
        ]
    }

    /// Bounds and default must be finite with `min <= max`, and the step
    /// finite and positive
    pub fn validate(&self) -> Result<(), FieldError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.default.is_finite()) {
            return Err(FieldError::NonFinite {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
                default: self.default,
            });
        }
        if self.min > self.max {
            return Err(FieldError::InvertedBounds {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(FieldError::InvalidStep {
                name: self.name.clone(),
                step: self.step,
            });
        }
        Ok(())
    }

    /// Clamp a value into the field bounds. Never panics, even for a field
    /// that fails [`FieldSpec::validate`].
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// What happened when a raw entry was applied to a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryOutcome {
    /// Value accepted as entered
    Accepted(f64),
    /// Value was outside the bounds and got clamped
    Clamped { entered: f64, stored: f64 },
    /// Empty entry, previous value kept
    Unchanged(f64),
    /// Entry was not a finite number, previous value kept
    Invalid,
}

/// Ordered field definitions plus the values currently entered
#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<FieldSpec>,
    values: Vec<f64>,
}

impl FormState {
    /// Start a form with every field at its (clamped) default
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let values = fields.iter().map(|f| f.clamp(f.default)).collect();
        Self { fields, values }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Current value of the field at `index`
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// `(field, value)` pairs in display order
    pub fn entries(&self) -> impl Iterator<Item = (&FieldSpec, f64)> + '_ {
        self.fields.iter().zip(self.values.iter().copied())
    }

    /// Apply raw text typed for the field at `index`.
    ///
    /// A number is clamped into bounds, `+` and `-` step the current value,
    /// and an empty entry keeps it. Anything else is rejected.
    pub fn apply_entry(&mut self, index: usize, raw: &str) -> Option<EntryOutcome> {
        let field = self.fields.get(index)?;
        let current = self.values[index];
        let raw = raw.trim();

        let entered = match raw {
            "" => return Some(EntryOutcome::Unchanged(current)),
            "+" => current + field.step,
            "-" => current - field.step,
            _ => match raw.replace('_', "").parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => return Some(EntryOutcome::Invalid),
            },
        };

        let stored = field.clamp(entered);
        self.values[index] = stored;

        if stored == entered {
            Some(EntryOutcome::Accepted(stored))
        } else {
            Some(EntryOutcome::Clamped { entered, stored })
        }
    }

    /// Snapshot of the current values keyed by feature name
    pub fn to_user_inputs(&self) -> UserInputs {
        self.fields
            .iter()
            .map(|f| f.name.clone())
            .zip(self.values.iter().copied())
            .collect()
    }
}
