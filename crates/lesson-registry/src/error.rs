use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Module {id} failed validation: {}", violations.join("; "))]
    Validation { id: String, violations: Vec<String> },

    #[error("Module not found: {0}")]
    NotFound(String),
}

impl RegistryError {
    pub fn id(&self) -> &str {
        match self {
            RegistryError::Validation { id, .. } => id,
            RegistryError::NotFound(id) => id,
        }
    }
}
