use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lesson_core::{Difficulty, LessonModule};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::query::{QueryOptions, SearchField};
use crate::validation::{is_well_formed_id, validate_module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOptions {
    /// Reject modules whose declaration has errors.
    pub validate: bool,
    /// Replace an existing module with the same id.
    pub overwrite: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            validate: true,
            overwrite: false,
        }
    }
}

impl RegisterOptions {
    pub fn overwrite() -> Self {
        Self {
            overwrite: true,
            ..Self::default()
        }
    }

    pub fn unchecked() -> Self {
        Self {
            validate: false,
            ..Self::default()
        }
    }
}

/// Lightweight metadata cached at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub prerequisites: Vec<String>,
    pub estimated_minutes: u32,
    pub phase_count: usize,
    pub parameter_count: usize,
}

impl ModuleSummary {
    fn of(module: &LessonModule) -> Self {
        let meta = &module.metadata;
        Self {
            id: meta.id.clone(),
            title: meta.title.clone(),
            description: meta.description.clone(),
            category: meta.category.clone(),
            difficulty: meta.difficulty,
            topics: meta.topics.clone(),
            prerequisites: meta.prerequisites.clone(),
            estimated_minutes: meta.estimated_minutes,
            phase_count: module.phases.len(),
            parameter_count: module.parameter_schema.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub module: Arc<LessonModule>,
    pub summary: ModuleSummary,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidModule {
    pub id: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleWarnings {
    pub id: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub valid: Vec<String>,
    pub invalid: Vec<InvalidModule>,
    pub warnings: Vec<ModuleWarnings>,
}

impl ValidationSummary {
    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_modules: usize,
    pub by_difficulty: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub total_phases: usize,
    pub total_parameters: usize,
    pub average_phases: f64,
    pub average_parameters: f64,
    pub average_minutes: f64,
}

/// Catalog of lesson modules keyed by id.
///
/// Iteration follows registration order; an overwrite keeps the original slot.
pub struct ModuleRegistry {
    entries: HashMap<String, RegistryEntry>,
    order: Vec<String>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a module. Returns `Ok(false)` and leaves the catalog untouched when
    /// the id is taken and `overwrite` is off. A malformed id is rejected even
    /// when `validate` is off, since lookups could never reach it.
    pub fn register(
        &mut self,
        module: impl Into<Arc<LessonModule>>,
        options: RegisterOptions,
    ) -> Result<bool, RegistryError> {
        let module = module.into();
        let id = module.id().to_string();

        if options.validate {
            let report = validate_module(&module);
            if !report.is_valid() {
                warn!("Rejected module {}: {} validation errors", id, report.errors.len());
                return Err(RegistryError::Validation {
                    id,
                    violations: report.errors,
                });
            }
            for warning in &report.warnings {
                debug!("Module {}: {}", id, warning);
            }
        } else if !is_well_formed_id(&id) {
            warn!("Rejected module {}: malformed id", id);
            return Err(RegistryError::Validation {
                violations: vec![format!("module id '{id}' is malformed")],
                id,
            });
        }

        if self.entries.contains_key(&id) && !options.overwrite {
            warn!("Module {} is already registered, skipping", id);
            return Ok(false);
        }

        let entry = RegistryEntry {
            summary: ModuleSummary::of(&module),
            module,
            registered_at: Utc::now(),
        };
        if self.entries.insert(id.clone(), entry).is_some() {
            info!("Replaced module {}", id);
        } else {
            info!("Registered module {}", id);
            self.order.push(id);
        }
        Ok(true)
    }

    /// Look up a module. Unknown and malformed ids give `None`.
    pub fn get(&self, id: &str) -> Option<Arc<LessonModule>> {
        self.entry(id).map(|e| Arc::clone(&e.module))
    }

    /// Like [`get`](Self::get), but a miss is an error.
    pub fn require(&self, id: &str) -> Result<Arc<LessonModule>, RegistryError> {
        self.get(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        let id = id.trim();
        if !is_well_formed_id(id) {
            return None;
        }
        self.entries.get(id)
    }

    pub fn summary(&self, id: &str) -> Option<&ModuleSummary> {
        self.entry(id).map(|e| &e.summary)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entry(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        let id = id.trim();
        if self.entries.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        info!("Unregistered module {}", id);
        true
    }

    fn entries_in_order(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Filtered and sorted modules. The sort is stable, so ties keep
    /// registration order.
    pub fn get_all(&self, options: &QueryOptions) -> Vec<Arc<LessonModule>> {
        let mut matched: Vec<&RegistryEntry> = self.entries_in_order().filter(|e| options.accepts(e)).collect();
        matched.sort_by(|a, b| options.compare(a, b));
        matched.into_iter().map(|e| Arc::clone(&e.module)).collect()
    }

    /// Case-insensitive substring search. An empty `fields` slice searches the
    /// default fields; a blank query matches nothing.
    pub fn search(&self, query: &str, fields: &[SearchField]) -> Vec<Arc<LessonModule>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let fields = if fields.is_empty() { &SearchField::DEFAULT[..] } else { fields };
        self.entries_in_order()
            .filter(|e| fields.iter().any(|f| f.matches(&e.module.metadata, &needle)))
            .map(|e| Arc::clone(&e.module))
            .collect()
    }

    /// Re-run validation over the whole catalog. Prerequisites that name an
    /// unregistered module are reported as warnings.
    pub fn validate_all(&self) -> ValidationSummary {
        let known: HashSet<&str> = self.order.iter().map(String::as_str).collect();
        let mut summary = ValidationSummary::default();

        for entry in self.entries_in_order() {
            let id = entry.summary.id.clone();
            let mut report = validate_module(&entry.module);
            for prerequisite in &entry.summary.prerequisites {
                if !known.contains(prerequisite.as_str()) {
                    report
                        .warnings
                        .push(format!("prerequisite {prerequisite} is not registered"));
                }
            }

            if !report.warnings.is_empty() {
                summary.warnings.push(ModuleWarnings {
                    id: id.clone(),
                    warnings: report.warnings,
                });
            }
            if report.errors.is_empty() {
                summary.valid.push(id);
            } else {
                summary.invalid.push(InvalidModule {
                    id,
                    errors: report.errors,
                });
            }
        }
        summary
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        let mut minutes = 0u64;

        for entry in self.entries_in_order() {
            let s = &entry.summary;
            stats.total_modules += 1;
            *stats.by_difficulty.entry(s.difficulty.name().to_string()).or_insert(0) += 1;
            *stats.by_category.entry(s.category.clone()).or_insert(0) += 1;
            stats.total_phases += s.phase_count;
            stats.total_parameters += s.parameter_count;
            minutes += u64::from(s.estimated_minutes);
        }

        if stats.total_modules > 0 {
            let n = stats.total_modules as f64;
            stats.average_phases = stats.total_phases as f64 / n;
            stats.average_parameters = stats.total_parameters as f64 / n;
            stats.average_minutes = minutes as f64 / n;
        }
        stats
    }
}
