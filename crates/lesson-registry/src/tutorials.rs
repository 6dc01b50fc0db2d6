use std::sync::Arc;

use lesson_core::{Difficulty, LessonModule};

use crate::error::RegistryError;
use crate::query::{Filter, QueryOptions, SearchField};
use crate::registry::{ModuleRegistry, ModuleSummary, RegisterOptions, RegistryStats, ValidationSummary};

/// Tutorial-facing API over a [`ModuleRegistry`], the surface the
/// presentation layer calls.
#[derive(Default)]
pub struct TutorialCatalog {
    registry: ModuleRegistry,
}

impl TutorialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registry(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Register every module, stopping at the first rejection.
    pub fn register_all<I>(&mut self, modules: I, options: RegisterOptions) -> Result<usize, RegistryError>
    where
        I: IntoIterator<Item = LessonModule>,
    {
        let mut added = 0;
        for module in modules {
            if self.registry.register(module, options)? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn register_tutorial(&mut self, module: LessonModule, options: RegisterOptions) -> Result<bool, RegistryError> {
        self.registry.register(module, options)
    }

    pub fn get_tutorial(&self, id: &str) -> Option<Arc<LessonModule>> {
        self.registry.get(id)
    }

    pub fn require_tutorial(&self, id: &str) -> Result<Arc<LessonModule>, RegistryError> {
        self.registry.require(id)
    }

    pub fn get_all_tutorials(&self, options: &QueryOptions) -> Vec<Arc<LessonModule>> {
        self.registry.get_all(options)
    }

    pub fn get_tutorial_metadata(&self, id: &str) -> Option<ModuleSummary> {
        self.registry.summary(id).cloned()
    }

    pub fn get_tutorial_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub fn has_tutorial(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn unregister_tutorial(&mut self, id: &str) -> bool {
        self.registry.unregister(id)
    }

    pub fn get_tutorials_by_category(&self, category: &str) -> Vec<Arc<LessonModule>> {
        self.registry
            .get_all(&QueryOptions::new().filter(Filter::Category(category.to_string())))
    }

    pub fn get_tutorials_by_difficulty(&self, difficulty: Difficulty) -> Vec<Arc<LessonModule>> {
        self.registry.get_all(&QueryOptions::new().filter(Filter::Difficulty(difficulty)))
    }

    pub fn get_tutorials_by_topic(&self, topic: &str) -> Vec<Arc<LessonModule>> {
        self.registry
            .get_all(&QueryOptions::new().filter(Filter::Topic(topic.to_string())))
    }

    pub fn search_tutorials(&self, query: &str) -> Vec<Arc<LessonModule>> {
        self.registry.search(query, &SearchField::DEFAULT)
    }

    pub fn validate_all_tutorials(&self) -> ValidationSummary {
        self.registry.validate_all()
    }

    pub fn get_registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}
