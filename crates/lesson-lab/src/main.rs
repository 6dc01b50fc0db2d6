use anyhow::{bail, Context, Result};
use lesson_core::{LessonSession, SessionConfig};
use lesson_registry::{QueryOptions, RegisterOptions, SortField, TutorialCatalog};

mod config;
mod report;

use config::{LabConfig, OutputFormat};
use report::LessonReport;

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs go to stderr so stdout carries only the lesson output.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting lesson lab");

    // 2. Load configuration
    let config = LabConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Seed: {}", config.seed);
    tracing::info!("  Output: {:?}", config.output);
    tracing::info!("  Strict: {}", config.strict);

    // 3. Build the catalog from the built-in lessons
    let mut catalog = TutorialCatalog::new();
    let added = catalog
        .register_all(lessons::builtin_lessons(), RegisterOptions::default())
        .context("Failed to register built-in lessons")?;
    tracing::info!("Registered {} lessons", added);

    let validation = catalog.validate_all_tutorials();
    for entry in &validation.warnings {
        for warning in &entry.warnings {
            tracing::warn!("{}: {}", entry.id, warning);
        }
    }
    for entry in &validation.invalid {
        tracing::error!("{} is invalid: {}", entry.id, entry.errors.join("; "));
    }
    if config.strict && !validation.all_valid() {
        bail!("{} lessons failed validation", validation.invalid.len());
    }

    let stats = catalog.get_registry_stats();
    tracing::info!(
        "Catalog: {} lessons, {} phases, {} parameters ({:.1} phases per lesson)",
        stats.total_modules,
        stats.total_phases,
        stats.total_parameters,
        stats.average_phases
    );

    // 4. Pick lessons: the configured list, or everything by difficulty
    let modules = if config.lessons.is_empty() {
        catalog.get_all_tutorials(&QueryOptions::new().sort_by(SortField::Difficulty))
    } else {
        config
            .lessons
            .iter()
            .map(|id| catalog.require_tutorial(id))
            .collect::<Result<Vec<_>, _>>()?
    };

    // 5. Run one session per lesson at its defaults
    let mut reports = Vec::with_capacity(modules.len());
    for module in modules {
        let id = module.id().to_string();
        let mut session = LessonSession::new(
            module,
            SessionConfig {
                seed: config.seed,
                ..SessionConfig::default()
            },
        );
        let snapshot = session.snapshot()?;
        if !snapshot.is_valid {
            tracing::warn!("{} reports an invalid state at its defaults", id);
            if config.strict {
                bail!("Lesson {} is invalid at its defaults", id);
            }
        }
        reports.push(LessonReport::new(session.module(), &snapshot));
    }

    // 6. Output
    match config.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Summary => {
            for report in &reports {
                println!("{report}");
            }
        }
    }

    tracing::info!("Done");
    Ok(())
}
