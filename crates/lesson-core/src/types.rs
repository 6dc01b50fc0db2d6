use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::LessonError;

/// A parameter value: numeric for sliders/inputs, textual for enum selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Choice(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Choice(_) => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ParamValue::Number(_) => None,
            ParamValue::Choice(s) => Some(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Choice(s.to_string())
    }
}

// Stored values are validated finite, so float equality is a total relation here.
impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ParamValue::Number(v) => {
                0u8.hash(state);
                // 0.0 == -0.0 must hash identically
                let normalized = if *v == 0.0 { 0.0f64 } else { *v };
                normalized.to_bits().hash(state);
            }
            ParamValue::Choice(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

/// Current values of a lesson's declared inputs, keyed by parameter key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(ParamValue::as_number)
    }

    pub fn choice(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(ParamValue::as_choice)
    }

    pub fn require_number(&self, key: &str) -> Result<f64, LessonError> {
        match self.0.get(key) {
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(ParamValue::Choice(_)) => Err(LessonError::ParameterType {
                key: key.to_string(),
                expected: "number",
            }),
            None => Err(LessonError::MissingParameter(key.to_string())),
        }
    }

    pub fn require_choice(&self, key: &str) -> Result<&str, LessonError> {
        match self.0.get(key) {
            Some(ParamValue::Choice(s)) => Ok(s),
            Some(ParamValue::Number(_)) => Err(LessonError::ParameterType {
                key: key.to_string(),
                expected: "choice",
            }),
            None => Err(LessonError::MissingParameter(key.to_string())),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, key: String, value: ParamValue) {
        self.0.insert(key, value);
    }
}

impl FromIterator<(String, ParamValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A derived output of a lesson calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Number(f64),
    Flag(bool),
    Text(String),
    Record(BTreeMap<String, f64>),
}

/// Results derived from exactly one parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculationResult(BTreeMap<String, ResultValue>);

impl CalculationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_number(&mut self, key: &str, value: f64) -> &mut Self {
        self.0.insert(key.to_string(), ResultValue::Number(value));
        self
    }

    pub fn set_flag(&mut self, key: &str, value: bool) -> &mut Self {
        self.0.insert(key.to_string(), ResultValue::Flag(value));
        self
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.to_string(), ResultValue::Text(value.into()));
        self
    }

    pub fn set_record(&mut self, key: &str, fields: &[(&str, f64)]) -> &mut Self {
        let record = fields.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self.0.insert(key.to_string(), ResultValue::Record(record));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(ResultValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(ResultValue::Flag(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(ResultValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn record(&self, key: &str) -> Option<&BTreeMap<String, f64>> {
        match self.0.get(key) {
            Some(ResultValue::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn require_number(&self, key: &str) -> Result<f64, LessonError> {
        self.number(key)
            .ok_or_else(|| LessonError::MissingResult(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One point of a generated series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub t: f64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl SeriesPoint {
    pub fn new(t: f64, value: f64) -> Self {
        Self {
            t,
            value,
            label: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: f64) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

/// A time-ordered sequence of points for one chart trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Reject NaN/infinite values and non-increasing time axes.
    pub fn check(&self) -> Result<(), LessonError> {
        for (i, p) in self.points.iter().enumerate() {
            let finite = p.t.is_finite() && p.value.is_finite() && p.fields.values().all(|v| v.is_finite());
            if !finite {
                return Err(LessonError::NonFinite {
                    series: self.name.clone(),
                    index: i,
                });
            }
        }
        if self.points.windows(2).any(|w| w[1].t <= w[0].t) {
            return Err(LessonError::NonMonotonic(self.name.clone()));
        }
        Ok(())
    }
}

/// Named series produced by a lesson generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartData(BTreeMap<String, Series>);

impl ChartData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: Series) {
        self.0.insert(series.name.clone(), series);
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn check(&self) -> Result<(), LessonError> {
        self.0.values().try_for_each(Series::check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(set: &ParameterSet) -> u64 {
        let mut h = DefaultHasher::new();
        set.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_structurally_equal_sets_hash_equal() {
        let a = ParameterSet::new().with("spot", 100.0).with("regime", "trending");
        let b = ParameterSet::new().with("regime", "trending").with("spot", 100.0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let zero = ParameterSet::new().with("x", 0.0);
        let neg_zero = ParameterSet::new().with("x", -0.0);
        assert_eq!(zero, neg_zero);
        assert_eq!(hash_of(&zero), hash_of(&neg_zero));
    }

    #[test]
    fn test_require_number_reports_type_and_missing() {
        let set = ParameterSet::new().with("regime", "choppy");
        assert!(matches!(
            set.require_number("regime"),
            Err(LessonError::ParameterType { .. })
        ));
        assert!(matches!(
            set.require_number("spot"),
            Err(LessonError::MissingParameter(_))
        ));
        assert_eq!(set.require_choice("regime").unwrap(), "choppy");
    }

    #[test]
    fn test_series_check_rejects_nan_and_unordered_time() {
        let mut s = Series::with_capacity("price", 3);
        s.push(SeriesPoint::new(0.0, 1.0));
        s.push(SeriesPoint::new(1.0, 2.0).with("vwap", f64::NAN));
        assert!(matches!(s.check(), Err(LessonError::NonFinite { index: 1, .. })));

        let mut s = Series::with_capacity("price", 2);
        s.push(SeriesPoint::new(1.0, 1.0));
        s.push(SeriesPoint::new(1.0, 2.0));
        assert!(matches!(s.check(), Err(LessonError::NonMonotonic(_))));
    }

    #[test]
    fn test_series_point_serializes_flat() {
        let p = SeriesPoint::new(2.0, 10.5).with("vwap", 10.0);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["t"], 2.0);
        assert_eq!(json["vwap"], 10.0);
        assert!(json.get("label").is_none());
    }
}
