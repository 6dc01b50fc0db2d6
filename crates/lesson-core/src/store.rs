use std::sync::Arc;

use tracing::debug;

use crate::error::{ParameterViolation, ValidationReport, ViolationKind};
use crate::{LessonModule, ParamValue, Parameter, ParameterSet};

/// Current input values of one lesson session.
///
/// Every mutation is validated against the declared schema; a rejected update
/// leaves the store untouched.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    schema: Arc<[Parameter]>,
    defaults: ParameterSet,
    current: ParameterSet,
    revision: u64,
}

impl ParameterStore {
    /// Schema keys missing from `defaults` start at the schema's declared default.
    pub fn new(schema: impl Into<Arc<[Parameter]>>, defaults: &ParameterSet) -> Self {
        let schema: Arc<[Parameter]> = schema.into();
        let defaults: ParameterSet = schema
            .iter()
            .map(|p| {
                let value = defaults
                    .get(&p.key)
                    .cloned()
                    .unwrap_or_else(|| p.default_value.clone());
                (p.key.clone(), value)
            })
            .collect();
        Self {
            schema,
            current: defaults.clone(),
            defaults,
            revision: 0,
        }
    }

    pub fn for_module(module: &LessonModule) -> Self {
        Self::new(module.parameter_schema.clone(), &module.default_parameters)
    }

    pub fn get(&self) -> &ParameterSet {
        &self.current
    }

    pub fn defaults(&self) -> &ParameterSet {
        &self.defaults
    }

    pub fn schema(&self) -> &[Parameter] {
        &self.schema
    }

    /// Bumped on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.schema.iter().find(|p| p.key == key)
    }

    fn check(&self, key: &str, value: &ParamValue) -> Result<(), ParameterViolation> {
        match self.parameter(key) {
            Some(param) => param.validate_value(value),
            None => Err(ParameterViolation::new(key, ViolationKind::UnknownParameter)),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<ParameterSet, ValidationReport> {
        self.set_many([(key.to_string(), value.into())])
    }

    /// Like `set`, but numeric values are first clamped into the parameter's range.
    pub fn set_clamped(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<ParameterSet, ValidationReport> {
        let value = value.into();
        let value = match self.parameter(key) {
            Some(param) => param.clamp(value),
            None => value,
        };
        self.set_many([(key.to_string(), value)])
    }

    /// Apply several updates as one transition. Either all apply or none do.
    pub fn set_many<I>(&mut self, partial: I) -> Result<ParameterSet, ValidationReport>
    where
        I: IntoIterator<Item = (String, ParamValue)>,
    {
        let updates: Vec<(String, ParamValue)> = partial.into_iter().collect();
        let errors: Vec<ParameterViolation> = updates
            .iter()
            .filter_map(|(key, value)| self.check(key, value).err())
            .collect();

        if !errors.is_empty() {
            debug!(rejected = errors.len(), "parameter update rejected");
            return Err(ValidationReport::from_errors(errors));
        }

        for (key, value) in updates {
            self.current.insert(key, value);
        }
        self.revision += 1;
        debug!(revision = self.revision, "parameters updated");
        Ok(self.current.clone())
    }

    pub fn reset(&mut self) -> ParameterSet {
        self.current = self.defaults.clone();
        self.revision += 1;
        debug!(revision = self.revision, "parameters reset to defaults");
        self.current.clone()
    }

    /// Validate a complete parameter set against the schema.
    pub fn validate(&self, set: &ParameterSet) -> ValidationReport {
        let mut errors = Vec::new();
        for param in self.schema.iter() {
            match set.get(&param.key) {
                Some(value) => {
                    if let Err(e) = param.validate_value(value) {
                        errors.push(e);
                    }
                }
                None if param.validation.required => {
                    errors.push(ParameterViolation::new(&param.key, ViolationKind::Required));
                }
                None => {}
            }
        }
        for key in set.keys() {
            if self.parameter(key).is_none() {
                errors.push(ParameterViolation::new(key, ViolationKind::UnknownParameter));
            }
        }
        ValidationReport::from_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParamValue, SelectOption};

    fn store() -> ParameterStore {
        let schema = vec![
            Parameter::slider("spot", "Spot", 50.0, 150.0, 1.0, 100.0),
            Parameter::slider("vol", "Volatility", 0.05, 1.0, 0.01, 0.2),
            Parameter::select(
                "regime",
                "Regime",
                vec![
                    SelectOption::choice("trending", "Trending"),
                    SelectOption::choice("choppy", "Choppy"),
                ],
                ParamValue::Choice("trending".into()),
            ),
        ];
        ParameterStore::new(schema, &ParameterSet::new().with("spot", 120.0))
    }

    #[test]
    fn test_defaults_fill_from_schema() {
        let s = store();
        assert_eq!(s.get().number("spot"), Some(120.0));
        assert_eq!(s.get().number("vol"), Some(0.2));
        assert_eq!(s.get().choice("regime"), Some("trending"));
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn test_set_valid_value() {
        let mut s = store();
        let snapshot = s.set("spot", 110.0).unwrap();
        assert_eq!(snapshot.number("spot"), Some(110.0));
        assert_eq!(s.revision(), 1);
    }

    #[test]
    fn test_rejected_set_leaves_store_unchanged() {
        let mut s = store();
        let before = s.get().clone();
        let report = s.set("spot", 500.0).unwrap_err();
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].key, "spot");
        assert_eq!(report.errors[0].violation, ViolationKind::AboveMaximum { max: 150.0 });
        assert_eq!(s.get(), &before);
        assert_eq!(s.revision(), 0);

        let report = s.set("unknown", 1.0).unwrap_err();
        assert_eq!(report.errors[0].violation, ViolationKind::UnknownParameter);
    }

    #[test]
    fn test_set_many_is_all_or_nothing() {
        let mut s = store();
        let report = s
            .set_many([
                ("spot".to_string(), ParamValue::Number(90.0)),
                ("vol".to_string(), ParamValue::Number(-1.0)),
                ("regime".to_string(), ParamValue::Choice("sideways".into())),
            ])
            .unwrap_err();
        assert_eq!(report.errors.len(), 2);
        assert_eq!(s.get().number("spot"), Some(120.0));

        let snapshot = s
            .set_many([
                ("spot".to_string(), ParamValue::Number(90.0)),
                ("regime".to_string(), ParamValue::Choice("choppy".into())),
            ])
            .unwrap();
        assert_eq!(snapshot.number("spot"), Some(90.0));
        assert_eq!(snapshot.choice("regime"), Some("choppy"));
        assert_eq!(s.revision(), 1);
    }

    #[test]
    fn test_set_clamped_and_reset() {
        let mut s = store();
        let snapshot = s.set_clamped("vol", 3.0).unwrap();
        assert_eq!(snapshot.number("vol"), Some(1.0));

        let snapshot = s.reset();
        assert_eq!(snapshot.number("vol"), Some(0.2));
        assert_eq!(snapshot.number("spot"), Some(120.0));
        assert_eq!(s.revision(), 2);
    }

    #[test]
    fn test_unchanged_values_still_bump_revision() {
        let mut s = store();
        s.set("spot", 120.0).unwrap();
        assert_eq!(s.revision(), 1);
        s.reset();
        assert_eq!(s.revision(), 2);
        assert_eq!(s.get(), s.defaults());
    }

    #[test]
    fn test_validate_full_set() {
        let s = store();
        let report = s.validate(&ParameterSet::new().with("spot", 100.0).with("extra", 1.0));
        assert!(!report.is_valid);
        assert_eq!(report.errors_for("vol").count(), 1);
        assert_eq!(report.errors_for("extra").count(), 1);
        assert!(s.validate(s.get()).is_valid);
    }
}
