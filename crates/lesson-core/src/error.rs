use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LessonError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Parameter {key} has the wrong type (expected {expected})")]
    ParameterType { key: String, expected: &'static str },

    #[error("Missing calculation result: {0}")]
    MissingResult(String),

    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Series {series} contains a non-finite value at index {index}")]
    NonFinite { series: String, index: usize },

    #[error("Series {0} has a non-increasing time axis")]
    NonMonotonic(String),

    #[error("Lesson {module} failed: {source}")]
    Module {
        module: String,
        #[source]
        source: Box<LessonError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LessonError {
    /// Attach the id of the lesson module the error came from.
    pub fn in_module(self, module: &str) -> Self {
        match self {
            LessonError::Module { .. } => self,
            other => LessonError::Module {
                module: module.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Which constraint a rejected parameter value broke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    UnknownParameter,
    Required,
    TypeMismatch { expected: String },
    NotFinite,
    BelowMinimum { min: f64 },
    AboveMaximum { max: f64 },
    NotAnOption,
}

/// A single rejected parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterViolation {
    pub key: String,
    #[serde(flatten)]
    pub violation: ViolationKind,
    pub message: String,
}

impl ParameterViolation {
    pub fn new(key: &str, violation: ViolationKind) -> Self {
        let message = match &violation {
            ViolationKind::UnknownParameter => format!("{key} is not a declared parameter"),
            ViolationKind::Required => format!("{key} is required"),
            ViolationKind::TypeMismatch { expected } => format!("{key} must be {expected}"),
            ViolationKind::NotFinite => format!("{key} must be a finite number"),
            ViolationKind::BelowMinimum { min } => format!("{key} must be at least {min}"),
            ViolationKind::AboveMaximum { max } => format!("{key} must be at most {max}"),
            ViolationKind::NotAnOption => format!("{key} must be one of the listed options"),
        };
        Self {
            key: key.to_string(),
            violation,
            message,
        }
    }
}

impl fmt::Display for ParameterViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of validating a parameter update.
///
/// Rejections are reported as data so a caller can show per-field messages
/// and keep the session running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ParameterViolation>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<ParameterViolation>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn errors_for(&self, key: &str) -> impl Iterator<Item = &ParameterViolation> {
        let key = key.to_string();
        self.errors.iter().filter(move |e| e.key == key)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}
