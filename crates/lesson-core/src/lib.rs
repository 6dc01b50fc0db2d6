//! Shared contract for interactive finance lessons: parameter declarations,
//! the per-session parameter store, derived results, generated series, phase
//! descriptors and the memoized session binding.

pub mod error;
pub mod module;
pub mod parameter;
pub mod phase;
pub mod session;
pub mod store;
pub mod traits;
pub mod types;

pub use error::*;
pub use module::*;
pub use parameter::*;
pub use phase::*;
pub use session::*;
pub use store::*;
pub use traits::*;
pub use types::*;
