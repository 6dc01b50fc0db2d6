use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationReport;
use crate::{CalculationResult, ChartData, LessonError, LessonModule, ParamValue, ParameterSet, ParameterStore};

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seed handed to the lesson generator.
    pub seed: u64,
    /// How many past parameter snapshots keep their computed results.
    pub cache_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cache_capacity: 8,
        }
    }
}

/// Everything derived from one parameter snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub parameters: ParameterSet,
    pub result: CalculationResult,
    pub chart_data: ChartData,
    pub is_valid: bool,
}

impl SessionSnapshot {
    /// Parameters and results in one flat map. Results win on key collisions.
    pub fn merged(&self) -> BTreeMap<String, serde_json::Value> {
        let mut out: BTreeMap<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    ParamValue::Number(n) => serde_json::json!(n),
                    ParamValue::Choice(s) => serde_json::json!(s),
                };
                (k.to_string(), value)
            })
            .collect();
        for (k, v) in self.result.iter() {
            out.insert(k.to_string(), serde_json::to_value(v).unwrap_or(serde_json::Value::Null));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub computations: usize,
    pub cache_hits: usize,
}

/// Reactive binding between one lesson and its caller.
///
/// Results are computed lazily on first read after a parameter change and
/// memoized by the structural value of the parameter snapshot.
pub struct LessonSession {
    module: Arc<LessonModule>,
    store: ParameterStore,
    config: SessionConfig,
    current: Option<Arc<SessionSnapshot>>,
    memo: HashMap<ParameterSet, Arc<SessionSnapshot>>,
    memo_order: VecDeque<ParameterSet>,
    stats: SessionStats,
}

impl LessonSession {
    pub fn new(module: Arc<LessonModule>, config: SessionConfig) -> Self {
        let store = ParameterStore::for_module(&module);
        Self {
            module,
            store,
            config,
            current: None,
            memo: HashMap::new(),
            memo_order: VecDeque::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn module(&self) -> &LessonModule {
        &self.module
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn update_parameter(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<ParameterSet, ValidationReport> {
        let updated = self.store.set(key, value)?;
        self.invalidate();
        Ok(updated)
    }

    pub fn update_parameters<I>(&mut self, partial: I) -> Result<ParameterSet, ValidationReport>
    where
        I: IntoIterator<Item = (String, ParamValue)>,
    {
        let updated = self.store.set_many(partial)?;
        self.invalidate();
        Ok(updated)
    }

    pub fn reset_parameters(&mut self) -> ParameterSet {
        let updated = self.store.reset();
        self.invalidate();
        updated
    }

    /// Change the generator seed. Memoized results belong to the old seed.
    pub fn reseed(&mut self, seed: u64) {
        if seed != self.config.seed {
            self.config.seed = seed;
            self.memo.clear();
            self.memo_order.clear();
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.current = None;
    }

    /// Current results, recomputing if the parameters changed since the last read.
    pub fn snapshot(&mut self) -> Result<Arc<SessionSnapshot>, LessonError> {
        if let Some(current) = &self.current {
            return Ok(Arc::clone(current));
        }

        let params = self.store.get().clone();
        if let Some(cached) = self.memo.get(&params) {
            self.stats.cache_hits += 1;
            debug!(lesson = %self.module.id(), "reusing memoized results");
            let cached = Arc::clone(cached);
            self.current = Some(Arc::clone(&cached));
            return Ok(cached);
        }

        let snapshot = Arc::new(self.compute(params.clone())?);
        self.stats.computations += 1;
        self.remember(params, Arc::clone(&snapshot));
        self.current = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn compute(&self, parameters: ParameterSet) -> Result<SessionSnapshot, LessonError> {
        let id = self.module.id();
        debug!(lesson = %id, seed = self.config.seed, "recomputing lesson results");

        let engine = &self.module.engine;
        let result = engine.calculate(&parameters).map_err(|e| e.in_module(id))?;
        let chart_data = engine
            .generate(&parameters, &result, self.config.seed)
            .map_err(|e| e.in_module(id))?;
        chart_data.check().map_err(|e| e.in_module(id))?;
        let is_valid = engine.is_valid(&parameters, &result);

        Ok(SessionSnapshot {
            parameters,
            result,
            chart_data,
            is_valid,
        })
    }

    fn remember(&mut self, key: ParameterSet, snapshot: Arc<SessionSnapshot>) {
        if self.config.cache_capacity == 0 {
            return;
        }
        while self.memo_order.len() >= self.config.cache_capacity {
            match self.memo_order.pop_front() {
                Some(oldest) => {
                    self.memo.remove(&oldest);
                }
                None => break,
            }
        }
        self.memo_order.push_back(key.clone());
        self.memo.insert(key, snapshot);
    }

    /// Parameters merged with calculation results.
    pub fn parameters(&mut self) -> Result<BTreeMap<String, serde_json::Value>, LessonError> {
        Ok(self.snapshot()?.merged())
    }

    pub fn chart_data(&mut self) -> Result<ChartData, LessonError> {
        Ok(self.snapshot()?.chart_data.clone())
    }

    pub fn is_valid(&mut self) -> Result<bool, LessonError> {
        Ok(self.snapshot()?.is_valid)
    }
}
