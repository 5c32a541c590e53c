//! Domain layer - core business logic and types.
//!
//! This layer contains pure domain models, the merge algorithm and error
//! types without any IO.

pub mod error;
pub mod merge;
pub mod models;
pub mod sync;

pub use error::{AppError, Result};
pub use merge::merge;
pub use models::{default_quotes, Quote, SyncReport, ALL_CATEGORIES};
pub use sync::{AppConfig, SyncConfig, SyncState};
