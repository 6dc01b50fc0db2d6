use serde::{Deserialize, Serialize};

use crate::error::{ParameterViolation, ViolationKind};
use crate::types::ParamValue;

/// Tolerance used when matching a numeric value against select options.
const OPTION_TOLERANCE: f64 = 1e-9;

/// How a parameter is edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    Slider,
    Input,
    Select { options: Vec<SelectOption> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: ParamValue,
    pub label: String,
}

impl SelectOption {
    pub fn number(value: f64, label: &str) -> Self {
        Self {
            value: ParamValue::Number(value),
            label: label.to_string(),
        }
    }

    pub fn choice(value: &str, label: &str) -> Self {
        Self {
            value: ParamValue::Choice(value.to_string()),
            label: label.to_string(),
        }
    }

    fn matches(&self, value: &ParamValue) -> bool {
        match (&self.value, value) {
            (ParamValue::Number(a), ParamValue::Number(b)) => (a - b).abs() < OPTION_TOLERANCE,
            (ParamValue::Choice(a), ParamValue::Choice(b)) => a == b,
            _ => false,
        }
    }
}

/// Display format for a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ValueFormat {
    Fixed { decimals: usize },
    /// Value is already expressed in percent (e.g. 20 for 20%).
    Percent { decimals: usize },
    /// Value is a fraction displayed as a percent (e.g. 0.2 for 20%).
    Ratio { decimals: usize },
    Currency { decimals: usize },
    Integer,
    Years { decimals: usize },
    Multiple { decimals: usize },
}

impl Default for ValueFormat {
    fn default() -> Self {
        ValueFormat::Fixed { decimals: 2 }
    }
}

impl ValueFormat {
    pub fn format(&self, value: f64) -> String {
        match *self {
            ValueFormat::Fixed { decimals } => format!("{:.*}", decimals, value),
            ValueFormat::Percent { decimals } => format!("{:.*}%", decimals, value),
            ValueFormat::Ratio { decimals } => format!("{:.*}%", decimals, value * 100.0),
            ValueFormat::Currency { decimals } => format_currency(value, decimals),
            ValueFormat::Integer => format!("{:.0}", value),
            ValueFormat::Years { decimals } => format!("{:.*} yrs", decimals, value),
            ValueFormat::Multiple { decimals } => format!("{:.*}x", decimals, value),
        }
    }
}

fn format_currency(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w.to_string(), Some(f.to_string())),
        None => (raw.clone(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac {
        Some(f) => format!("{sign}${grouped}.{f}"),
        None => format!("{sign}${grouped}"),
    }
}

/// Bounds enforced when a value is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    #[default]
    Primary,
    Secondary,
    Advanced,
}

/// Declaration of one adjustable lesson input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ParameterKind,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: Option<String>,
    pub default_value: ParamValue,
    pub format: ValueFormat,
    pub validation: ValidationRule,
    pub category: Option<String>,
    pub importance: Importance,
}

impl Parameter {
    fn numeric(key: &str, label: &str, kind: ParameterKind, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            min,
            max,
            step,
            unit: None,
            default_value: ParamValue::Number(default),
            format: ValueFormat::default(),
            validation: ValidationRule {
                required: true,
                min: Some(min),
                max: Some(max),
            },
            category: None,
            importance: Importance::Primary,
        }
    }

    pub fn slider(key: &str, label: &str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self::numeric(key, label, ParameterKind::Slider, min, max, step, default)
    }

    pub fn input(key: &str, label: &str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self::numeric(key, label, ParameterKind::Input, min, max, step, default)
    }

    /// Select over a fixed option list. Numeric bounds are derived from
    /// numeric options; textual selects have no range.
    pub fn select(key: &str, label: &str, options: Vec<SelectOption>, default: ParamValue) -> Self {
        let numbers: Vec<f64> = options.iter().filter_map(|o| o.value.as_number()).collect();
        let (min, max) = if numbers.is_empty() {
            (0.0, 0.0)
        } else {
            (
                numbers.iter().copied().fold(f64::INFINITY, f64::min),
                numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Select { options },
            min,
            max,
            step: 0.0,
            unit: None,
            default_value: default,
            format: ValueFormat::default(),
            validation: ValidationRule {
                required: true,
                min: None,
                max: None,
            },
            category: None,
            importance: Importance::Primary,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_validation(mut self, validation: ValidationRule) -> Self {
        self.validation = validation;
        self
    }

    pub fn options(&self) -> Option<&[SelectOption]> {
        match &self.kind {
            ParameterKind::Select { options } => Some(options),
            _ => None,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self.kind, ParameterKind::Select { .. })
    }

    /// Effective lower/upper bound for numeric values.
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.validation.min.unwrap_or(self.min),
            self.validation.max.unwrap_or(self.max),
        )
    }

    /// Render a value for display. Select values render as their option label.
    pub fn display(&self, value: &ParamValue) -> String {
        if let Some(option) = self.options().and_then(|opts| opts.iter().find(|o| o.matches(value))) {
            return option.label.clone();
        }
        match value {
            ParamValue::Number(v) => {
                let text = self.format.format(*v);
                match &self.unit {
                    Some(unit) if !matches!(self.format, ValueFormat::Currency { .. }) => {
                        format!("{text} {unit}")
                    }
                    _ => text,
                }
            }
            ParamValue::Choice(s) => s.clone(),
        }
    }

    /// Structural problems with the declaration itself.
    pub fn check(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.key.trim().is_empty() {
            problems.push("parameter key is empty".to_string());
        }
        if self.label.trim().is_empty() {
            problems.push(format!("parameter {} has no label", self.key));
        }

        match &self.kind {
            ParameterKind::Select { options } => {
                if options.is_empty() {
                    problems.push(format!("parameter {} has no options", self.key));
                } else if !options.iter().any(|o| o.matches(&self.default_value)) {
                    problems.push(format!(
                        "parameter {} default is not one of its options",
                        self.key
                    ));
                }
            }
            ParameterKind::Slider | ParameterKind::Input => {
                let Some(default) = self.default_value.as_number() else {
                    problems.push(format!("parameter {} has a non-numeric default", self.key));
                    return problems;
                };
                if !(self.min.is_finite() && self.max.is_finite() && self.step.is_finite()) {
                    problems.push(format!("parameter {} has non-finite bounds", self.key));
                    return problems;
                }
                if self.min > self.max {
                    problems.push(format!(
                        "parameter {} has min {} above max {}",
                        self.key, self.min, self.max
                    ));
                }
                if default < self.min || default > self.max {
                    problems.push(format!(
                        "parameter {} default {} is outside [{}, {}]",
                        self.key, default, self.min, self.max
                    ));
                }
                if self.step <= 0.0 {
                    problems.push(format!("parameter {} step must be positive", self.key));
                } else if self.step > self.max - self.min {
                    problems.push(format!(
                        "parameter {} step {} exceeds its range",
                        self.key, self.step
                    ));
                }
            }
        }
        problems
    }

    /// Check a candidate value against type and bounds.
    pub fn validate_value(&self, value: &ParamValue) -> Result<(), ParameterViolation> {
        if let Some(options) = self.options() {
            if options.iter().any(|o| o.matches(value)) {
                return Ok(());
            }
            if let ParamValue::Number(v) = value {
                if !v.is_finite() {
                    return Err(ParameterViolation::new(&self.key, ViolationKind::NotFinite));
                }
            }
            return Err(ParameterViolation::new(&self.key, ViolationKind::NotAnOption));
        }

        let ParamValue::Number(v) = value else {
            return Err(ParameterViolation::new(
                &self.key,
                ViolationKind::TypeMismatch {
                    expected: "a number".to_string(),
                },
            ));
        };
        if !v.is_finite() {
            return Err(ParameterViolation::new(&self.key, ViolationKind::NotFinite));
        }
        let (min, max) = self.bounds();
        if *v < min {
            return Err(ParameterViolation::new(&self.key, ViolationKind::BelowMinimum { min }));
        }
        if *v > max {
            return Err(ParameterViolation::new(&self.key, ViolationKind::AboveMaximum { max }));
        }
        Ok(())
    }

    /// Pull a numeric value into range. Non-numeric and select values pass through.
    pub fn clamp(&self, value: ParamValue) -> ParamValue {
        match value {
            ParamValue::Number(v) if !self.is_select() && v.is_finite() => {
                let (min, max) = self.bounds();
                ParamValue::Number(v.clamp(min, max))
            }
            other => other,
        }
    }
}
