use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, LessonEngine, LessonError, LessonMetadata, LessonModule, Parameter,
    ParameterSet, PhaseDescriptor,
};

use crate::*;

struct FlatEngine;

impl LessonEngine for FlatEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let mut result = CalculationResult::new();
        result.set_number("doubled", params.require_number("x")? * 2.0);
        Ok(result)
    }

    fn generate(&self, _params: &ParameterSet, _result: &CalculationResult, _seed: u64) -> Result<ChartData, LessonError> {
        Ok(ChartData::new())
    }
}

/// Helper: a minimal module that passes validation.
fn lesson(id: &str, title: &str, category: &str, difficulty: Difficulty) -> LessonModule {
    let metadata = LessonMetadata::new(id, title, category, difficulty)
        .with_description(&format!("{title} explained"))
        .with_topics(&["testing"])
        .with_estimated_minutes(10);
    LessonModule::new(
        metadata,
        vec![Parameter::slider("x", "X", 0.0, 10.0, 1.0, 5.0)],
        vec![
            PhaseDescriptor::narrative("intro", "Intro", "Some text."),
            PhaseDescriptor::explorer("explore", "Explore", &["x"]),
        ],
        Arc::new(FlatEngine),
    )
}

fn simple(id: &str) -> LessonModule {
    lesson(id, id, "general", Difficulty::Beginner)
}

fn ids(modules: &[Arc<LessonModule>]) -> Vec<&str> {
    modules.iter().map(|m| m.id()).collect()
}

fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for module in lessons::builtin_lessons() {
        assert!(registry.register(module, RegisterOptions::default()).unwrap());
    }
    registry
}

// ===== Registration =====

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = ModuleRegistry::new();
    assert!(registry.register(simple("a"), RegisterOptions::default()).unwrap());
    let replacement = lesson("a", "Replacement", "general", Difficulty::Advanced);
    assert!(!registry.register(replacement, RegisterOptions::default()).unwrap());

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("a").unwrap().title(), "a");
}

#[test]
fn test_overwrite_replaces_fully() {
    let mut registry = ModuleRegistry::new();
    registry.register(simple("a"), RegisterOptions::default()).unwrap();
    registry.register(simple("b"), RegisterOptions::default()).unwrap();

    let replacement = lesson("a", "Replacement", "other", Difficulty::Advanced);
    assert!(registry.register(replacement, RegisterOptions::overwrite()).unwrap());

    let summary = registry.summary("a").unwrap();
    assert_eq!(summary.title, "Replacement");
    assert_eq!(summary.difficulty, Difficulty::Advanced);
    assert_eq!(registry.ids(), vec!["a", "b"]);
}

#[test]
fn test_validation_reports_every_violation() {
    let mut bad = simple("broken");
    bad.metadata.title = String::new();
    bad.parameter_schema.push(Parameter::slider("x", "Again", 0.0, 1.0, 0.1, 0.5));
    bad.phases.push(PhaseDescriptor::explorer("explore", "Twice", &["missing"]));

    let err = ModuleRegistry::new()
        .register(bad, RegisterOptions::default())
        .unwrap_err();
    let RegistryError::Validation { id, violations } = err else {
        panic!("expected a validation error");
    };
    assert_eq!(id, "broken");
    assert!(violations.iter().any(|v| v.contains("title")));
    assert!(violations.iter().any(|v| v.contains("declared twice")));
    assert!(violations.iter().any(|v| v.contains("used twice")));
    assert!(violations.iter().any(|v| v.contains("undeclared parameter missing")));
}

#[test]
fn test_out_of_range_default_is_an_error() {
    let module = simple("ranged").with_defaults(ParameterSet::new().with("x", 50.0));
    let report = validate_module(&module);
    assert!(report.errors.iter().any(|e| e.contains("at most 10")));
}

#[test]
fn test_unchecked_registration_skips_validation() {
    let mut bad = simple("loose");
    bad.phases.clear();
    let mut registry = ModuleRegistry::new();
    assert!(registry.register(bad, RegisterOptions::unchecked()).unwrap());

    let summary = registry.validate_all();
    assert_eq!(summary.invalid.len(), 1);
    assert_eq!(summary.invalid[0].id, "loose");
    assert!(!summary.all_valid());
}

#[test]
fn test_unchecked_registration_still_rejects_malformed_id() {
    let mut registry = ModuleRegistry::new();
    let err = registry
        .register(simple("My Lesson"), RegisterOptions::unchecked())
        .unwrap_err();
    assert_eq!(err.id(), "My Lesson");
    assert!(matches!(err, RegistryError::Validation { .. }));
    assert!(registry.is_empty());
    assert!(registry.ids().is_empty());
    assert!(registry.get_all(&QueryOptions::new()).is_empty());
}

// ===== Lookup =====

#[test]
fn test_get_unknown_or_malformed() {
    let registry = builtin_registry();
    assert!(registry.get("kelly-criterion").is_some());
    assert!(registry.get("  kelly-criterion ").is_some());
    assert!(registry.get("nope").is_none());
    assert!(registry.get("").is_none());
    assert!(registry.get("Kelly Criterion").is_none());
}

#[test]
fn test_require_opts_into_not_found() {
    let registry = builtin_registry();
    assert!(registry.require("value-at-risk").is_ok());
    let err = registry.require("missing").unwrap_err();
    assert_eq!(err, RegistryError::NotFound("missing".to_string()));
    assert_eq!(err.to_string(), "Module not found: missing");
}

#[test]
fn test_unregister() {
    let mut registry = builtin_registry();
    let before = registry.len();
    assert!(registry.unregister("fourier-analysis"));
    assert!(!registry.unregister("fourier-analysis"));
    assert_eq!(registry.len(), before - 1);
    assert!(!registry.ids().contains(&"fourier-analysis".to_string()));
}

#[test]
fn test_unregister_trims_id_like_lookup() {
    let mut registry = ModuleRegistry::new();
    registry.register(simple("a"), RegisterOptions::default()).unwrap();
    assert!(registry.contains(" a "));
    assert!(registry.unregister(" a "));
    assert!(!registry.contains("a"));
    assert!(registry.ids().is_empty());
}

// ===== Queries =====

#[test]
fn test_sort_is_case_insensitive() {
    let mut registry = ModuleRegistry::new();
    for (id, title) in [("one", "banana"), ("two", "Apple"), ("three", "cherry")] {
        registry
            .register(lesson(id, title, "general", Difficulty::Beginner), RegisterOptions::default())
            .unwrap();
    }

    let ascending = registry.get_all(&QueryOptions::new().sort_by(SortField::Title));
    assert_eq!(ids(&ascending), vec!["two", "one", "three"]);

    let descending = registry.get_all(&QueryOptions::new().sort_by(SortField::Title).descending());
    assert_eq!(ids(&descending), vec!["three", "one", "two"]);
}

#[test]
fn test_difficulty_sort_is_stable_and_ordinal() {
    let mut registry = ModuleRegistry::new();
    for (id, difficulty) in [
        ("x", Difficulty::Advanced),
        ("y", Difficulty::Beginner),
        ("z", Difficulty::Advanced),
        ("w", Difficulty::Intermediate),
    ] {
        registry
            .register(lesson(id, id, "general", difficulty), RegisterOptions::default())
            .unwrap();
    }

    let sorted = registry.get_all(&QueryOptions::new().sort_by(SortField::Difficulty));
    assert_eq!(ids(&sorted), vec!["y", "w", "x", "z"]);
}

#[test]
fn test_filters() {
    let registry = builtin_registry();

    let advanced = registry.get_all(&QueryOptions::new().filter(Filter::Difficulty(Difficulty::Advanced)));
    assert!(!advanced.is_empty());
    assert!(advanced.iter().all(|m| m.metadata.difficulty == Difficulty::Advanced));

    let needs_regimes = registry.get_all(&QueryOptions::new().filter(Filter::Prerequisite("market-regimes".into())));
    assert!(ids(&needs_regimes).contains(&"long-memory"));

    let combined = registry.get_all(
        &QueryOptions::new()
            .filter(Filter::Category("RISK-MANAGEMENT".into()))
            .filter(Filter::Difficulty(Difficulty::Beginner)),
    );
    assert!(combined.is_empty());
}

#[test]
fn test_search() {
    let registry = builtin_registry();
    assert!(registry.search("   ", &[]).is_empty());

    let hits = registry.search("KELLY", &[]);
    assert_eq!(ids(&hits), vec!["kelly-criterion"]);

    let by_id = registry.search("vwap", &[SearchField::Id]);
    assert_eq!(ids(&by_id), vec!["vwap-execution"]);
}

// ===== Catalog-wide =====

#[test]
fn test_validate_all_flags_missing_prerequisites() {
    let mut registry = ModuleRegistry::new();
    registry
        .register(lessons::long_memory::module(), RegisterOptions::default())
        .unwrap();

    let summary = registry.validate_all();
    assert_eq!(summary.valid, vec!["long-memory"]);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].warnings[0].contains("market-regimes"));
}

#[test]
fn test_builtin_catalog_is_valid() {
    let summary = builtin_registry().validate_all();
    assert!(summary.all_valid(), "{:?}", summary.invalid);
    assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
}

#[test]
fn test_stats() {
    let mut registry = ModuleRegistry::new();
    assert_eq!(registry.stats().average_phases, 0.0);

    registry
        .register(lesson("a", "A", "risk", Difficulty::Beginner), RegisterOptions::default())
        .unwrap();
    let mut wide = lesson("b", "B", "risk", Difficulty::Advanced);
    wide.phases.push(PhaseDescriptor::summary("wrap", "Wrap", &["done"]));
    registry.register(wide, RegisterOptions::default()).unwrap();

    let stats = registry.stats();
    assert_eq!(stats.total_modules, 2);
    assert_eq!(stats.total_phases, 5);
    assert_eq!(stats.total_parameters, 2);
    assert_eq!(stats.average_phases, 2.5);
    assert_eq!(stats.by_category.get("risk"), Some(&2));
    assert_eq!(stats.by_difficulty.get("advanced"), Some(&1));
    assert_eq!(stats.average_minutes, 10.0);
}

// ===== Tutorial API =====

#[test]
fn test_tutorial_catalog() {
    let mut catalog = TutorialCatalog::new();
    let added = catalog
        .register_all(lessons::builtin_lessons(), RegisterOptions::default())
        .unwrap();
    assert_eq!(added, catalog.get_tutorial_ids().len());
    assert_eq!(catalog.register_all([simple("kelly-criterion")], RegisterOptions::default()).unwrap(), 0);

    assert!(catalog.has_tutorial("options-pricing"));
    let meta = catalog.get_tutorial_metadata("options-pricing").unwrap();
    assert_eq!(meta.phase_count, catalog.get_tutorial("options-pricing").unwrap().phases.len());

    assert!(!catalog.get_tutorials_by_category("risk-management").is_empty());
    assert!(!catalog.get_tutorials_by_difficulty(Difficulty::Beginner).is_empty());
    assert_eq!(ids(&catalog.get_tutorials_by_topic("hurst")), vec!["long-memory"]);
    assert!(!catalog.search_tutorials("volatility").is_empty());
    assert!(catalog.validate_all_tutorials().all_valid());
    assert_eq!(catalog.get_registry_stats().total_modules, added);

    assert!(catalog.unregister_tutorial("options-pricing"));
    assert!(catalog.require_tutorial("options-pricing").is_err());
}

#[test]
fn test_summary_serializes() {
    let registry = builtin_registry();
    let json = serde_json::to_value(registry.summary("value-at-risk").unwrap()).unwrap();
    assert_eq!(json["difficulty"], "intermediate");
    assert_eq!(json["id"], "value-at-risk");
}
