//! # relink-db
//!
//! PostgreSQL implementation of the relink collaborator traits.
//!
//! This crate provides:
//! - Connection pool management
//! - Identifier validation for runtime table and column names
//! - [`PgStore`], implementing every trait the migration engine needs
//!
//! ## Example
//!
//! ```rust,ignore
//! use relink_core::{LinkFieldMigration, MigrationContext, TracingLog, LINKIT};
//! use relink_db::{PgStore, PoolConfig};
//!
//! let store = PgStore::connect("postgres://localhost/craft", "craft_", PoolConfig::default())?;
//! let log = TracingLog;
//! let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &LINKIT).run()?;
//! println!("{}", report);
//! ```

pub mod content;
pub mod fields;
pub mod identifiers;
pub mod pool;
pub mod store;

pub use identifiers::{quote_identifier, validate_identifier, TableNames};
pub use pool::PoolConfig;
pub use store::PgStore;
