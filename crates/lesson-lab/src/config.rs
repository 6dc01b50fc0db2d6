use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Summary,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabConfig {
    pub seed: u64,              // LAB_SEED, 42
    pub lessons: Vec<String>,   // LAB_LESSONS, empty = every registered lesson
    pub output: OutputFormat,   // LAB_OUTPUT, summary | json
    pub strict: bool,           // LAB_STRICT, stop on any invalid module
}

impl LabConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let seed = lookup("LAB_SEED")
            .unwrap_or_else(|| "42".to_string())
            .trim()
            .parse()
            .context("LAB_SEED must be a non-negative integer")?;

        let lessons = lookup("LAB_LESSONS")
            .map(|list| {
                list.split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let output = match lookup("LAB_OUTPUT")
            .unwrap_or_else(|| "summary".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "summary" => OutputFormat::Summary,
            "json" => OutputFormat::Json,
            other => bail!("LAB_OUTPUT must be 'summary' or 'json', got '{other}'"),
        };

        let strict = lookup("LAB_STRICT")
            .unwrap_or_else(|| "true".to_string())
            .trim()
            .parse()
            .context("LAB_STRICT must be true or false")?;

        Ok(Self {
            seed,
            lessons,
            output,
            strict,
        })
    }
}
