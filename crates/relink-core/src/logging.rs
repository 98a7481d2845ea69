//! Structured logging field name constants for relink.
//!
//! Every crate uses these names for `tracing` fields so a migration run can be
//! audited by grepping or querying a single vocabulary.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A row or field could not be migrated |
//! | WARN  | Something was skipped (unmapped type, missing owner) |
//! | INFO  | Run lifecycle, per-field completions |
//! | DEBUG | Decision points (resolved locations, persistence mode) |
//! | TRACE | Per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "migration", "database", "config", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "settings", "content", "locator", "rich_content", "orchestrator", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

/// Legacy plugin the run is migrating from.
pub const PLUGIN: &str = "plugin";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Field id being operated on.
pub const FIELD_ID: &str = "field_id";

/// Field handle being operated on.
pub const FIELD_HANDLE: &str = "field_handle";

/// Content row id.
pub const ROW_ID: &str = "row_id";

/// Element id owning a content row.
pub const ELEMENT_ID: &str = "element_id";

/// Site id of a content row.
pub const SITE_ID: &str = "site_id";

// ─── Storage fields ────────────────────────────────────────────────────────

/// Physical table touched.
pub const DB_TABLE: &str = "db_table";

/// Physical column touched.
pub const DB_COLUMN: &str = "db_column";

/// Storage context string of a field.
pub const CONTEXT: &str = "context";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows visited.
pub const ROW_COUNT: &str = "row_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
