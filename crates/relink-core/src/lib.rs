//! # relink-core
//!
//! Core types, collaborator traits, and the migration engine that moves
//! legacy link fields (Linkit, Typed Link) onto the unified link field.
//!
//! The engine talks to the outside world only through the traits in
//! [`traits`]. [`memory::InMemoryStore`] implements all of them in memory;
//! `relink-db` implements them against PostgreSQL.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod memory;
pub mod migration;
pub mod models;
pub mod sink;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ConfigError, MigrationConfig};
pub use error::{Error, Result};
pub use memory::{InMemoryStore, StoreSnapshot};
pub use migration::{
    Conversion, LegacyPlugin, LinkFieldMigration, MigrationOptions, MigrationReport,
    RecordConverter, TypeMapper, LINKIT, TYPED_LINK,
};
pub use models::*;
pub use sink::{LogLine, RecordingLog, TracingLog};
pub use traits::*;
