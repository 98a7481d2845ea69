//! Collaborator traits for relink.
//!
//! The engine never talks to a database or a CMS directly. Everything it needs
//! from the outside world goes through these traits, which keeps the engine
//! testable against [`crate::memory::InMemoryStore`] and lets
//! `relink-db` supply a PostgreSQL implementation.
//!
//! All traits are synchronous and take `&self`: a run is strictly
//! single-threaded and sequential.

use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// FIELD REGISTRY
// =============================================================================

/// The CMS field service.
pub trait FieldRegistry {
    /// Fetch a field through the registry cache.
    fn field_by_id(&self, id: FieldId) -> Result<Option<Field>>;

    /// Persist a field definition.
    ///
    /// Saving a container persists every field embedded in its block type
    /// layouts. A refusal is reported as [`crate::Error::FieldRejected`].
    fn save_field(&self, field: &Field) -> Result<()>;

    /// Drop cached field definitions so later lookups see persisted state.
    fn refresh(&self) -> Result<()>;
}

// =============================================================================
// RAW TABLE ACCESS
// =============================================================================

/// Row-level access to the tables a migration reads and writes.
pub trait TableAccess {
    /// Rows of the fields table with the given type, ordered by id.
    fn fields_of_type(&self, field_type: &str) -> Result<Vec<LegacyFieldRecord>>;

    /// Overwrite the type and settings columns of a field row.
    fn rewrite_field_row(&self, id: FieldId, field_type: &str, settings: &JsonValue)
        -> Result<()>;

    /// Resolve a block type UID to the container field owning it.
    fn block_type_owner(
        &self,
        kind: ContainerKind,
        block_type_uid: &str,
    ) -> Result<Option<BlockTypeOwner>>;

    /// Rows of `table` whose `column` is neither null nor empty.
    fn populated_rows(&self, table: &str, column: &str) -> Result<Vec<ContentRow>>;

    /// Every row of a side table belonging to a field, as JSON objects.
    fn rows_for_field(&self, table: &str, field_id: FieldId) -> Result<Vec<JsonValue>>;

    /// The content row of an element on a site, without its value.
    fn row_for_element(
        &self,
        table: &str,
        element_id: i64,
        site_id: i64,
    ) -> Result<Option<ContentRow>>;

    /// Single-row update of one column, keyed by row id.
    fn write_value(&self, table: &str, column: &str, row_id: i64, value: &str) -> Result<()>;
}

// =============================================================================
// SITES AND PLUGINS
// =============================================================================

pub trait SiteDirectory {
    /// UID of a site, if the site exists.
    fn site_uid(&self, site_id: i64) -> Result<Option<String>>;
}

pub trait PluginRegistry {
    fn is_installed_and_enabled(&self, handle: &str) -> Result<bool>;
}

// =============================================================================
// RICH CONTENT
// =============================================================================

/// Mutation applied to one rich-content document.
///
/// Receives the handle of the embedded field being migrated and the full
/// document, returns the document to persist.
pub type DocumentMutation<'a> = dyn FnMut(&str, JsonValue) -> JsonValue + 'a;

/// The rich-content plugin's content service.
pub trait RichContent {
    /// Run `mutate` once for every document embedding the field with
    /// `field_uid`, persisting each document whose content changed.
    ///
    /// Returns the number of documents persisted.
    fn modify_content(&self, field_uid: &str, mutate: &mut DocumentMutation<'_>)
        -> Result<usize>;
}

// =============================================================================
// MIGRATION LOG
// =============================================================================

/// Outcome colouring of a migration log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTone {
    Plain,
    Success,
    Error,
}

/// Line-item sink for migration outcomes. Purely observational.
pub trait MigrationLog {
    fn write(&self, message: &str, tone: LogTone);
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything a migration run borrows from the outside world.
#[derive(Clone, Copy)]
pub struct MigrationContext<'a> {
    pub fields: &'a dyn FieldRegistry,
    pub tables: &'a dyn TableAccess,
    pub sites: &'a dyn SiteDirectory,
    pub plugins: &'a dyn PluginRegistry,
    pub rich_content: &'a dyn RichContent,
    pub log: &'a dyn MigrationLog,
}

impl<'a> MigrationContext<'a> {
    /// Build a context from a store implementing every collaborator.
    pub fn new<S>(store: &'a S, log: &'a dyn MigrationLog) -> Self
    where
        S: FieldRegistry + TableAccess + SiteDirectory + PluginRegistry + RichContent,
    {
        Self {
            fields: store,
            tables: store,
            sites: store,
            plugins: store,
            rich_content: store,
            log,
        }
    }
}
