//! Catalog of lesson modules: registration with declaration checks, lookup,
//! filtered and sorted listing, text search, catalog-wide validation and
//! summary statistics.

pub mod error;
pub mod query;
pub mod registry;
pub mod tutorials;
pub mod validation;

pub use error::RegistryError;
pub use query::{Filter, QueryOptions, SearchField, SortField, SortOrder};
pub use registry::{
    InvalidModule, ModuleRegistry, ModuleSummary, ModuleWarnings, RegisterOptions, RegistryEntry, RegistryStats,
    ValidationSummary,
};
pub use tutorials::TutorialCatalog;
pub use validation::{is_well_formed_id, validate_module, ModuleReport};

#[cfg(test)]
mod tests;
