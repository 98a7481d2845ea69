//! # relink-cli
//!
//! Command-line runner for link field migrations. Works against a live
//! PostgreSQL database or a JSON store snapshot.
//!
//! ```text
//! relink migrate --plugin linkit --database-url postgres://localhost/craft
//! relink migrate --plugin typed-link --snapshot store.json --output migrated.json
//! relink inspect --plugin typed-link --snapshot store.json
//! ```

pub mod args;
pub mod commands;
pub mod console;
pub mod telemetry;

pub use args::{Cli, Commands};
pub use commands::{inspect, migrate, run, run_with, FieldLocation};
