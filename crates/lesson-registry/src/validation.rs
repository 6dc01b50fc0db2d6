use std::collections::HashSet;

use lesson_core::{LessonModule, PhaseContent};
use serde::{Deserialize, Serialize};

/// Everything wrong with a module, split into blocking errors and advisories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ModuleReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Ids are lowercase ascii words joined by `-` or `_`.
pub fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && !id.starts_with(['-', '_'])
        && !id.ends_with(['-', '_'])
}

/// Check a module's declaration. Collects every problem rather than stopping
/// at the first one.
pub fn validate_module(module: &LessonModule) -> ModuleReport {
    let mut report = ModuleReport::default();
    check_metadata(module, &mut report);
    check_parameters(module, &mut report);
    check_phases(module, &mut report);
    report
}

fn check_metadata(module: &LessonModule, report: &mut ModuleReport) {
    let meta = &module.metadata;
    if meta.id.trim().is_empty() {
        report.errors.push("module id is empty".to_string());
    } else if !is_well_formed_id(&meta.id) {
        report.errors.push(format!("module id '{}' is malformed", meta.id));
    }
    if meta.title.trim().is_empty() {
        report.errors.push("module title is empty".to_string());
    }
    if meta.category.trim().is_empty() {
        report.errors.push("module category is empty".to_string());
    }
    if meta.prerequisites.iter().any(|p| *p == meta.id) {
        report.errors.push("module lists itself as a prerequisite".to_string());
    }

    if meta.description.trim().is_empty() {
        report.warnings.push("module has no description".to_string());
    }
    if meta.topics.is_empty() {
        report.warnings.push("module has no topics".to_string());
    }
    if meta.estimated_minutes == 0 {
        report.warnings.push("module has no estimated duration".to_string());
    }
}

fn check_parameters(module: &LessonModule, report: &mut ModuleReport) {
    let mut seen = HashSet::new();
    for param in &module.parameter_schema {
        report.errors.extend(param.check());
        if !seen.insert(param.key.as_str()) {
            report.errors.push(format!("parameter key {} is declared twice", param.key));
        }
    }

    for (key, value) in module.default_parameters.iter() {
        match module.parameter(key) {
            None => report.errors.push(format!("default {key} is not in the parameter schema")),
            Some(param) => {
                if let Err(violation) = param.validate_value(value) {
                    report.errors.push(format!("default {}", violation.message));
                }
            }
        }
    }

    for param in &module.parameter_schema {
        if !module.default_parameters.contains(&param.key) {
            report.warnings.push(format!("parameter {} has no default value", param.key));
        }
    }
}

fn check_phases(module: &LessonModule, report: &mut ModuleReport) {
    if module.phases.is_empty() {
        report.errors.push("module has no phases".to_string());
        return;
    }

    let mut seen = HashSet::new();
    for phase in &module.phases {
        if phase.id.trim().is_empty() {
            report.errors.push("phase id is empty".to_string());
        } else if !seen.insert(phase.id.as_str()) {
            report.errors.push(format!("phase id {} is used twice", phase.id));
        }
        if !phase.content.is_renderable() {
            report.errors.push(format!(
                "phase {} has no renderable {} content",
                phase.id,
                phase.content.kind()
            ));
        }
        if let PhaseContent::ParameterExplorer { parameters } = &phase.content {
            for key in parameters {
                if module.parameter(key).is_none() {
                    report
                        .errors
                        .push(format!("phase {} explores undeclared parameter {key}", phase.id));
                }
            }
        }
    }
}
