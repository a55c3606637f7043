//! Interactive terminal form.
//!
//! Each interaction runs synchronously against the shared context: editing a
//! field updates the form state, and predicting reconciles the current values,
//! runs the model, and renders the result or the classified failure.

use crate::context::{PredictError, PredictionContext};
use crate::form::{EntryOutcome, FormState};
use crate::metrics::SessionMetrics;
use crate::models::inference::InferenceError;
use std::io::{self, BufRead, Write};
use tracing::debug;

pub const TITLE: &str = "Crime Rate Prediction (Violent Crimes per Capita)";
pub const DESCRIPTION: &str = "Enter community details below to estimate violent crime rate.";
pub const RESULT_NOTE: &str = "This value represents violent crimes per capita (scaled).";
pub const CAPTION: &str = "Model trained on UCI Communities & Crime dataset.";

const RULE: &str = "---";

/// A parsed menu choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Edit the field at this zero-based index
    Edit(usize),
    Predict,
    Quit,
    Unknown,
}

impl Command {
    /// Parse a menu line for a form with `field_count` fields
    pub fn parse(line: &str, field_count: usize) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "p" | "predict" => Command::Predict,
            "q" | "quit" | "exit" => Command::Quit,
            other => match other.parse::<usize>() {
                Ok(n) if (1..=field_count).contains(&n) => Command::Edit(n - 1),
                _ => Command::Unknown,
            },
        }
    }
}

/// Extra guidance shown under a prediction error, by failure kind
pub fn failure_hint(err: &PredictError) -> &'static str {
    match err {
        PredictError::Rejected(_) => {
            "Check that the form fields match the model's feature list."
        }
        PredictError::Inference(InferenceError::ShapeMismatch { .. }) => {
            "The model artifact does not match its feature metadata."
        }
        PredictError::Inference(InferenceError::NonFinite(_)) => {
            "The inputs pushed the model outside its numeric range; try smaller values."
        }
        PredictError::Inference(InferenceError::EmptyOutput) => {
            "The model produced no output for this input."
        }
        PredictError::Inference(InferenceError::Runtime(_))
        | PredictError::Inference(InferenceError::Poisoned) => {
            "The model runtime failed; try again or restart the application."
        }
    }
}

/// One interactive form session over a line-oriented input and an output
pub struct FormSession<'a, R, W> {
    ctx: &'a PredictionContext,
    metrics: &'a SessionMetrics,
    form: FormState,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> FormSession<'a, R, W> {
    /// Start a session with every field at its default
    pub fn new(
        ctx: &'a PredictionContext,
        metrics: &'a SessionMetrics,
        input: R,
        output: W,
    ) -> Self {
        Self {
            ctx,
            metrics,
            form: FormState::new(ctx.fields().to_vec()),
            input,
            output,
        }
    }

    /// Run until the user quits or input ends
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "{TITLE}")?;
        writeln!(self.output, "{DESCRIPTION}")?;

        loop {
            self.render_form()?;
            write!(
                self.output,
                "Select a field [1-{}], 'p' to predict, 'q' to quit: ",
                self.form.len()
            )?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                writeln!(self.output)?;
                break;
            };

            match Command::parse(&line, self.form.len()) {
                Command::Edit(index) => self.edit_field(index)?,
                Command::Predict => self.predict()?,
                Command::Quit => break,
                Command::Unknown => {
                    writeln!(self.output, "Unrecognized choice '{}'.", line.trim())?;
                }
            }
        }

        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "{CAPTION}")?;
        self.output.flush()
    }

    fn render_form(&mut self) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "Community Inputs")?;
        for (i, (field, value)) in self.form.entries().enumerate() {
            writeln!(self.output, "  {}) {:<24} {}", i + 1, field.label, value)?;
        }
        Ok(())
    }

    fn edit_field(&mut self, index: usize) -> io::Result<()> {
        let Some(field) = self.form.fields().get(index).cloned() else {
            return Ok(());
        };
        let current = self.form.value(index).unwrap_or(field.default);

        write!(
            self.output,
            "{} [{}] (min {}, max {}, '+'/'-' to step by {}): ",
            field.label, current, field.min, field.max, field.step
        )?;
        self.output.flush()?;

        let raw = self.read_line()?.unwrap_or_default();
        match self.form.apply_entry(index, &raw) {
            Some(EntryOutcome::Accepted(value)) => {
                debug!(field = %field.name, value = value, "Field updated");
            }
            Some(EntryOutcome::Clamped { entered, stored }) => {
                debug!(field = %field.name, entered = entered, stored = stored, "Field clamped");
                writeln!(
                    self.output,
                    "{} must be between {} and {}; using {}.",
                    field.label, field.min, field.max, stored
                )?;
            }
            Some(EntryOutcome::Invalid) => {
                writeln!(
                    self.output,
                    "'{}' is not a number; {} stays at {}.",
                    raw.trim(),
                    field.label,
                    current
                )?;
            }
            Some(EntryOutcome::Unchanged(_)) | None => {}
        }
        Ok(())
    }

    fn predict(&mut self) -> io::Result<()> {
        let inputs = self.form.to_user_inputs();

        writeln!(self.output, "{RULE}")?;
        match self.ctx.predict(&inputs) {
            Ok(prediction) => {
                self.metrics
                    .record_prediction(prediction.latency, prediction.value);
                writeln!(
                    self.output,
                    "Predicted Violent Crime Rate: {}",
                    prediction.formatted_value()
                )?;
                writeln!(self.output, "{RESULT_NOTE}")?;
                if !prediction.dropped_features.is_empty() {
                    writeln!(
                        self.output,
                        "Ignored inputs the model does not use: {}",
                        prediction.dropped_features.join(", ")
                    )?;
                }
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                writeln!(self.output, "Prediction error: {e}")?;
                writeln!(self.output, "{}", failure_hint(&e))?;
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
