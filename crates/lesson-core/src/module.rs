use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{LessonEngine, Parameter, ParameterSet, PhaseDescriptor};

/// Difficulty tier of a lesson. Ordering follows the learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn rank(&self) -> u8 {
        match self {
            Difficulty::Beginner => 1,
            Difficulty::Intermediate => 2,
            Difficulty::Advanced => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// Presentation-agnostic description of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub estimated_minutes: u32,
    pub prerequisites: Vec<String>,
}

impl LessonMetadata {
    pub fn new(id: &str, title: &str, category: &str, difficulty: Difficulty) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: category.to_string(),
            difficulty,
            topics: Vec::new(),
            estimated_minutes: 0,
            prerequisites: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.topics = topics.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn with_prerequisites(mut self, ids: &[&str]) -> Self {
        self.prerequisites = ids.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// A complete lesson: metadata, inputs, walkthrough and computation.
#[derive(Clone)]
pub struct LessonModule {
    pub metadata: LessonMetadata,
    pub parameter_schema: Vec<Parameter>,
    pub phases: Vec<PhaseDescriptor>,
    pub default_parameters: ParameterSet,
    pub engine: Arc<dyn LessonEngine>,
}

impl LessonModule {
    /// Build a module whose defaults are the schema's declared default values.
    pub fn new(
        metadata: LessonMetadata,
        parameter_schema: Vec<Parameter>,
        phases: Vec<PhaseDescriptor>,
        engine: Arc<dyn LessonEngine>,
    ) -> Self {
        let default_parameters = parameter_schema
            .iter()
            .map(|p| (p.key.clone(), p.default_value.clone()))
            .collect();
        Self {
            metadata,
            parameter_schema,
            phases,
            default_parameters,
            engine,
        }
    }

    pub fn with_defaults(mut self, defaults: ParameterSet) -> Self {
        self.default_parameters = defaults;
        self
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.parameter_schema.iter().find(|p| p.key == key)
    }

    pub fn phase(&self, id: &str) -> Option<&PhaseDescriptor> {
        self.phases.iter().find(|p| p.id == id)
    }
}

impl fmt::Debug for LessonModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessonModule")
            .field("metadata", &self.metadata)
            .field("parameters", &self.parameter_schema.len())
            .field("phases", &self.phases.len())
            .finish_non_exhaustive()
    }
}
