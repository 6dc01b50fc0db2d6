use crate::{CalculationResult, ChartData, LessonError, ParameterSet};

/// Computation side of a lesson.
///
/// Implementations must be pure: the same inputs (and seed) always produce
/// the same outputs, and inputs are never modified.
pub trait LessonEngine: Send + Sync {
    /// Derive the lesson's results from one parameter snapshot.
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError>;

    /// Produce the lesson's chart series.
    fn generate(
        &self,
        params: &ParameterSet,
        result: &CalculationResult,
        seed: u64,
    ) -> Result<ChartData, LessonError>;

    /// Lesson-specific domain check over the derived results.
    fn is_valid(&self, _params: &ParameterSet, _result: &CalculationResult) -> bool {
        true
    }
}
