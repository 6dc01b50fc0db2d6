use std::collections::BTreeMap;
use std::fmt;

use lesson_core::{LessonModule, Series, SessionSnapshot};
use serde::Serialize;

/// Shape of one generated series, without the points themselves.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub name: String,
    pub points: usize,
    pub first: Option<f64>,
    pub last: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SeriesSummary {
    fn of(series: &Series) -> Self {
        let values = series.values();
        Self {
            name: series.name.clone(),
            points: values.len(),
            first: values.first().copied(),
            last: values.last().copied(),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonReport {
    pub id: String,
    pub title: String,
    pub difficulty: String,
    pub is_valid: bool,
    pub values: BTreeMap<String, serde_json::Value>,
    pub series: Vec<SeriesSummary>,
}

impl LessonReport {
    pub fn new(module: &LessonModule, snapshot: &SessionSnapshot) -> Self {
        Self {
            id: module.id().to_string(),
            title: module.title().to_string(),
            difficulty: module.metadata.difficulty.name().to_string(),
            is_valid: snapshot.is_valid,
            values: snapshot.merged(),
            series: snapshot.chart_data.iter().map(SeriesSummary::of).collect(),
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for LessonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_valid { "ok" } else { "INVALID" };
        writeln!(f, "== {} [{}] ({}) {}", self.title, self.id, self.difficulty, status)?;
        for (key, value) in &self.values {
            match value {
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(v) => writeln!(f, "  {key:<32} {v:.6}")?,
                    None => writeln!(f, "  {key:<32} {n}")?,
                },
                other => writeln!(f, "  {key:<32} {other}")?,
            }
        }
        for s in &self.series {
            writeln!(
                f,
                "  series {:<24} n={:<5} first={} last={} min={} max={}",
                s.name,
                s.points,
                fmt_opt(s.first),
                fmt_opt(s.last),
                fmt_opt(s.min),
                fmt_opt(s.max)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::SeriesPoint;

    #[test]
    fn test_series_summary() {
        let mut series = Series::with_capacity("price", 3);
        for (t, v) in [(0.0, 2.0), (1.0, -1.0), (2.0, 5.0)] {
            series.push(SeriesPoint::new(t, v));
        }
        let summary = SeriesSummary::of(&series);
        assert_eq!(summary.points, 3);
        assert_eq!(summary.first, Some(2.0));
        assert_eq!(summary.last, Some(5.0));
        assert_eq!(summary.min, Some(-1.0));
        assert_eq!(summary.max, Some(5.0));
    }

    #[test]
    fn test_empty_series_summary() {
        let summary = SeriesSummary::of(&Series::with_capacity("empty", 0));
        assert_eq!(summary.points, 0);
        assert_eq!(summary.min, None);
        assert_eq!(fmt_opt(summary.first), "-");
    }
}
