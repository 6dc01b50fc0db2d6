use std::cmp::Ordering;

use lesson_core::{Difficulty, LessonMetadata};
use serde::{Deserialize, Serialize};

use crate::registry::RegistryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Title,
    Category,
    Difficulty,
    EstimatedMinutes,
    PhaseCount,
    ParameterCount,
    RegisteredAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Equality on scalar metadata, containment on list metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Filter {
    Category(String),
    Difficulty(Difficulty),
    EstimatedMinutes(u32),
    Topic(String),
    Prerequisite(String),
}

impl Filter {
    pub fn matches(&self, meta: &LessonMetadata) -> bool {
        match self {
            Filter::Category(category) => meta.category.eq_ignore_ascii_case(category.trim()),
            Filter::Difficulty(difficulty) => meta.difficulty == *difficulty,
            Filter::EstimatedMinutes(minutes) => meta.estimated_minutes == *minutes,
            Filter::Topic(topic) => contains_ignore_case(&meta.topics, topic),
            Filter::Prerequisite(id) => contains_ignore_case(&meta.prerequisites, id),
        }
    }
}

fn contains_ignore_case(items: &[String], wanted: &str) -> bool {
    let wanted = wanted.trim();
    items.iter().any(|item| item.eq_ignore_ascii_case(wanted))
}

/// Sorting and filtering for [`ModuleRegistry::get_all`](crate::ModuleRegistry::get_all).
///
/// Without a sort field results keep registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub sort_by: Option<SortField>,
    pub order: SortOrder,
    pub filters: Vec<Filter>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, field: SortField) -> Self {
        self.sort_by = Some(field);
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub(crate) fn accepts(&self, entry: &RegistryEntry) -> bool {
        self.filters.iter().all(|f| f.matches(&entry.module.metadata))
    }

    pub(crate) fn compare(&self, a: &RegistryEntry, b: &RegistryEntry) -> Ordering {
        let Some(field) = self.sort_by else {
            return Ordering::Equal;
        };
        let ordering = compare_by(field, a, b);
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_by(field: SortField, a: &RegistryEntry, b: &RegistryEntry) -> Ordering {
    let (ma, mb) = (&a.module.metadata, &b.module.metadata);
    match field {
        SortField::Id => compare_text(&ma.id, &mb.id),
        SortField::Title => compare_text(&ma.title, &mb.title),
        SortField::Category => compare_text(&ma.category, &mb.category),
        SortField::Difficulty => ma.difficulty.rank().cmp(&mb.difficulty.rank()),
        SortField::EstimatedMinutes => ma.estimated_minutes.cmp(&mb.estimated_minutes),
        SortField::PhaseCount => a.summary.phase_count.cmp(&b.summary.phase_count),
        SortField::ParameterCount => a.summary.parameter_count.cmp(&b.summary.parameter_count),
        SortField::RegisteredAt => a.registered_at.cmp(&b.registered_at),
    }
}

/// Metadata fields a text search can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Id,
    Title,
    Description,
    Category,
    Topics,
}

impl SearchField {
    pub const DEFAULT: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Description,
        SearchField::Category,
        SearchField::Topics,
    ];

    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, meta: &LessonMetadata, needle: &str) -> bool {
        let hit = |text: &str| text.to_lowercase().contains(needle);
        match self {
            SearchField::Id => hit(&meta.id),
            SearchField::Title => hit(&meta.title),
            SearchField::Description => hit(&meta.description),
            SearchField::Category => hit(&meta.category),
            SearchField::Topics => meta.topics.iter().any(|t| hit(t)),
        }
    }
}
