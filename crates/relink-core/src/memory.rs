//! In-memory implementation of every collaborator trait.
//!
//! Backs the test suite and the CLI's snapshot mode. The store keeps a
//! persisted view and a registry cache: raw row rewrites only touch the
//! persisted view, and [`FieldRegistry::field_by_id`] keeps returning the
//! cached definition until [`FieldRegistry::refresh`] is called.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::migration::read;
use crate::models::{
    BlockTypeOwner, ContainerKind, ContentRow, Field, FieldErrors, FieldId, LayoutElement,
    LegacyFieldRecord,
};
use crate::traits::{
    DocumentMutation, FieldRegistry, PluginRegistry, RichContent, SiteDirectory, TableAccess,
};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A row of a block-type mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypeRecord {
    pub kind: ContainerKind,
    pub uid: String,
    pub field_id: FieldId,
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: i64,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub handle: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// A rich-content document and the fields embedded in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichDocument {
    pub id: i64,
    /// Embedded field uid → handle.
    #[serde(default)]
    pub embeds: BTreeMap<String, String>,
    pub content: JsonValue,
}

/// Serializable state of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub block_types: Vec<BlockTypeRecord>,
    /// Table name → rows.
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Map<String, JsonValue>>>,
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
    #[serde(default)]
    pub plugins: Vec<PluginRecord>,
    #[serde(default)]
    pub rich_documents: Vec<RichDocument>,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryStore {
    fields: RefCell<BTreeMap<FieldId, Field>>,
    cache: RefCell<BTreeMap<FieldId, Field>>,
    block_types: Vec<BlockTypeRecord>,
    tables: RefCell<BTreeMap<String, Vec<Map<String, JsonValue>>>>,
    sites: Vec<SiteRecord>,
    plugins: Vec<PluginRecord>,
    documents: RefCell<Vec<RichDocument>>,
    rejections: BTreeMap<String, FieldErrors>,
    saves: Cell<usize>,
    refreshes: Cell<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let fields: BTreeMap<FieldId, Field> = snapshot
            .fields
            .into_iter()
            .map(|field| (field.id, field))
            .collect();

        let store = Self {
            fields: RefCell::new(fields),
            block_types: snapshot.block_types,
            tables: RefCell::new(snapshot.tables),
            sites: snapshot.sites,
            plugins: snapshot.plugins,
            documents: RefCell::new(snapshot.rich_documents),
            ..Self::default()
        };
        store.rebuild_cache();
        store
    }

    /// Load a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)?;
        debug!(
            subsystem = "migration",
            component = "memory",
            path = %path.as_ref().display(),
            field_count = snapshot.fields.len(),
            "Loaded store snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Persisted state as a snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            fields: self.fields.borrow().values().cloned().collect(),
            block_types: self.block_types.clone(),
            tables: self.tables.borrow().clone(),
            sites: self.sites.clone(),
            plugins: self.plugins.clone(),
            rich_documents: self.documents.borrow().clone(),
        }
    }

    /// Write the persisted state to a snapshot file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let encoded = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, encoded)?;
        Ok(())
    }

    // ─── Builders ──────────────────────────────────────────────────────────

    pub fn with_field(self, field: Field) -> Self {
        self.fields.borrow_mut().insert(field.id, field);
        self.rebuild_cache();
        self
    }

    pub fn with_block_type(
        mut self,
        kind: ContainerKind,
        uid: &str,
        field_id: FieldId,
        handle: Option<&str>,
    ) -> Self {
        self.block_types.push(BlockTypeRecord {
            kind,
            uid: uid.to_string(),
            field_id,
            handle: handle.map(str::to_string),
        });
        self
    }

    /// Append a row to a table. Non-object rows are ignored.
    pub fn with_row(self, table: &str, row: JsonValue) -> Self {
        if let JsonValue::Object(row) = row {
            self.tables
                .borrow_mut()
                .entry(table.to_string())
                .or_default()
                .push(row);
        }
        self
    }

    pub fn with_site(mut self, id: i64, uid: &str) -> Self {
        self.sites.push(SiteRecord {
            id,
            uid: uid.to_string(),
        });
        self
    }

    pub fn with_plugin(mut self, handle: &str, enabled: bool) -> Self {
        self.plugins.push(PluginRecord {
            handle: handle.to_string(),
            enabled,
        });
        self
    }

    pub fn with_document(self, id: i64, embeds: &[(&str, &str)], content: JsonValue) -> Self {
        self.documents.borrow_mut().push(RichDocument {
            id,
            embeds: embeds
                .iter()
                .map(|(uid, handle)| (uid.to_string(), handle.to_string()))
                .collect(),
            content,
        });
        self
    }

    /// Make the registry refuse saves of the field with `handle`.
    pub fn rejecting_saves_for(mut self, handle: &str, errors: FieldErrors) -> Self {
        self.rejections.insert(handle.to_string(), errors);
        self
    }

    // ─── Inspection ────────────────────────────────────────────────────────

    /// Persisted definition of a field, bypassing the registry cache.
    pub fn persisted_field(&self, id: FieldId) -> Option<Field> {
        self.fields.borrow().get(&id).cloned()
    }

    pub fn rows(&self, table: &str) -> Vec<Map<String, JsonValue>> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    /// Value of `column` in the row with `row_id`.
    pub fn value(&self, table: &str, row_id: i64, column: &str) -> Option<JsonValue> {
        self.tables
            .borrow()
            .get(table)?
            .iter()
            .find(|row| read::id(row.get("id")) == Some(row_id))?
            .get(column)
            .cloned()
    }

    /// A stored value decoded from its JSON text.
    pub fn decoded_value(&self, table: &str, row_id: i64, column: &str) -> Option<JsonValue> {
        self.value(table, row_id, column).map(read::decode_if_json)
    }

    pub fn document(&self, id: i64) -> Option<JsonValue> {
        self.documents
            .borrow()
            .iter()
            .find(|doc| doc.id == id)
            .map(|doc| doc.content.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.get()
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    /// Rebuild the registry cache from persisted rows, re-syncing the field
    /// copies embedded in container layouts.
    fn rebuild_cache(&self) {
        let persisted = self.fields.borrow();
        let mut cache = persisted.clone();

        for container in cache.values_mut() {
            for block_type in &mut container.block_types {
                for tab in &mut block_type.layout.tabs {
                    for element in &mut tab.elements {
                        if let LayoutElement::Field { field } = element {
                            if let Some(current) = persisted.get(&field.id) {
                                *field = current.clone();
                            }
                        }
                    }
                }
            }
        }

        *self.cache.borrow_mut() = cache;
    }

    fn upsert(&self, field: &Field) {
        self.fields.borrow_mut().insert(field.id, field.clone());
        self.cache.borrow_mut().insert(field.id, field.clone());
    }
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

impl FieldRegistry for InMemoryStore {
    fn field_by_id(&self, id: FieldId) -> Result<Option<Field>> {
        Ok(self.cache.borrow().get(&id).cloned())
    }

    fn save_field(&self, field: &Field) -> Result<()> {
        if let Some(errors) = self.rejections.get(&field.handle) {
            return Err(Error::FieldRejected {
                handle: field.handle.clone(),
                errors: errors.clone(),
            });
        }

        self.upsert(field);
        for (_, nested) in field.nested_fields() {
            self.upsert(nested);
        }
        self.saves.set(self.saves.get() + 1);

        debug!(
            subsystem = "migration",
            component = "memory",
            field_id = field.id,
            field_handle = %field.handle,
            "Field saved"
        );
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        self.rebuild_cache();
        self.refreshes.set(self.refreshes.get() + 1);
        Ok(())
    }
}

impl TableAccess for InMemoryStore {
    fn fields_of_type(&self, field_type: &str) -> Result<Vec<LegacyFieldRecord>> {
        Ok(self
            .fields
            .borrow()
            .values()
            .filter(|field| field.field_type == field_type)
            .map(|field| LegacyFieldRecord {
                id: field.id,
                uid: field.uid.clone(),
                name: field.name.clone(),
                handle: field.handle.clone(),
                context: field.context.clone(),
                column_suffix: field.column_suffix.clone(),
                field_type: field.field_type.clone(),
                settings: match &field.settings {
                    JsonValue::String(raw) => raw.clone(),
                    JsonValue::Null => String::new(),
                    other => other.to_string(),
                },
            })
            .collect())
    }

    fn rewrite_field_row(
        &self,
        id: FieldId,
        field_type: &str,
        settings: &JsonValue,
    ) -> Result<()> {
        let mut fields = self.fields.borrow_mut();
        let field = fields
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("field #{}", id)))?;

        field.field_type = field_type.to_string();
        field.settings = settings.clone();
        Ok(())
    }

    fn block_type_owner(
        &self,
        kind: ContainerKind,
        block_type_uid: &str,
    ) -> Result<Option<BlockTypeOwner>> {
        Ok(self
            .block_types
            .iter()
            .find(|record| record.kind == kind && record.uid == block_type_uid)
            .map(|record| BlockTypeOwner {
                field_id: record.field_id,
                handle: record.handle.clone(),
            }))
    }

    fn populated_rows(&self, table: &str, column: &str) -> Result<Vec<ContentRow>> {
        let tables = self.tables.borrow();
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                let raw = match row.get(column)? {
                    JsonValue::Null => return None,
                    JsonValue::String(s) if s.is_empty() => return None,
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some(ContentRow {
                    id: read::id(row.get("id"))?,
                    element_id: read::id(row.get("elementId")).unwrap_or_default(),
                    site_id: read::id(row.get("siteId")).unwrap_or_default(),
                    raw_value: Some(raw),
                })
            })
            .collect())
    }

    fn rows_for_field(&self, table: &str, field_id: FieldId) -> Result<Vec<JsonValue>> {
        Ok(self
            .tables
            .borrow()
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| read::id(row.get("fieldId")) == Some(field_id))
                    .map(|row| JsonValue::Object(row.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn row_for_element(
        &self,
        table: &str,
        element_id: i64,
        site_id: i64,
    ) -> Result<Option<ContentRow>> {
        let tables = self.tables.borrow();
        let Some(rows) = tables.get(table) else {
            return Ok(None);
        };

        Ok(rows
            .iter()
            .find(|row| {
                read::id(row.get("elementId")) == Some(element_id)
                    && read::id(row.get("siteId")) == Some(site_id)
            })
            .and_then(|row| {
                Some(ContentRow {
                    id: read::id(row.get("id"))?,
                    element_id,
                    site_id,
                    raw_value: None,
                })
            }))
    }

    fn write_value(&self, table: &str, column: &str, row_id: i64, value: &str) -> Result<()> {
        let mut tables = self.tables.borrow_mut();
        let row = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| read::id(row.get("id")) == Some(row_id))
            })
            .ok_or_else(|| Error::NotFound(format!("row #{} in {}", row_id, table)))?;

        row.insert(column.to_string(), JsonValue::String(value.to_string()));
        Ok(())
    }
}

impl SiteDirectory for InMemoryStore {
    fn site_uid(&self, site_id: i64) -> Result<Option<String>> {
        Ok(self
            .sites
            .iter()
            .find(|site| site.id == site_id)
            .map(|site| site.uid.clone()))
    }
}

impl PluginRegistry for InMemoryStore {
    fn is_installed_and_enabled(&self, handle: &str) -> Result<bool> {
        Ok(self
            .plugins
            .iter()
            .any(|plugin| plugin.handle == handle && plugin.enabled))
    }
}

impl RichContent for InMemoryStore {
    fn modify_content(
        &self,
        field_uid: &str,
        mutate: &mut DocumentMutation<'_>,
    ) -> Result<usize> {
        let mut saved = 0;

        for document in self.documents.borrow_mut().iter_mut() {
            let Some(handle) = document.embeds.get(field_uid).cloned() else {
                continue;
            };

            let updated = mutate(&handle, document.content.clone());
            if updated != document.content {
                document.content = updated;
                saved += 1;
            }
        }

        Ok(saved)
    }
}
