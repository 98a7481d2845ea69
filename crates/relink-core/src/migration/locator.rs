//! Resolves where a field's values are physically stored.

use tracing::debug;

use crate::defaults::CONTENT_TABLE;
use crate::error::Result;
use crate::models::{ContainerKind, Field, FieldId, StorageContext};
use crate::traits::{FieldRegistry, TableAccess};

/// Content column name: `prefix + handle`, plus `_suffix` when a suffix is set.
pub fn field_column(prefix: &str, handle: &str, suffix: Option<&str>) -> String {
    match suffix.filter(|s| !s.is_empty()) {
        Some(suffix) => format!("{prefix}{handle}_{suffix}"),
        None => format!("{prefix}{handle}"),
    }
}

/// Strip the `{{%name}}` table-prefix placeholder from a table reference.
pub fn bare_table_name(raw: &str) -> &str {
    raw.trim()
        .strip_prefix("{{%")
        .and_then(|rest| rest.strip_suffix("}}"))
        .or_else(|| raw.trim().strip_prefix("{{").and_then(|rest| rest.strip_suffix("}}")))
        .unwrap_or_else(|| raw.trim())
}

/// The container a nested field lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub kind: ContainerKind,
    pub field_id: FieldId,
    pub block_type_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocation {
    pub table: String,
    pub column: String,
    pub container: Option<ContainerInfo>,
}

impl ContentLocation {
    /// Short description used in migration log lines, e.g. `“cta:links” Matrix`.
    pub fn describe(&self, handle: &str) -> String {
        match &self.container {
            None => String::new(),
            Some(info) => match &info.block_type_handle {
                Some(block) => format!("“{}:{}” {} ", handle, block, info.kind),
                None => format!("“{}” {} ", handle, info.kind),
            },
        }
    }
}

/// Outcome of resolving a field's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ContentLocation),
    /// The field cannot be located; the message says why.
    Unlocatable(String),
}

pub struct ContentLocator<'a> {
    fields: &'a dyn FieldRegistry,
    tables: &'a dyn TableAccess,
}

impl<'a> ContentLocator<'a> {
    pub fn new(fields: &'a dyn FieldRegistry, tables: &'a dyn TableAccess) -> Self {
        Self { fields, tables }
    }

    pub fn resolve(&self, field: &Field) -> Result<Resolution> {
        let prefix = field.column_prefix();
        let suffix = field.column_suffix.as_deref();

        let (kind, block_type_uid) = match field.storage_context() {
            StorageContext::Global => {
                return Ok(Resolution::Found(ContentLocation {
                    table: CONTENT_TABLE.to_string(),
                    column: field_column(prefix, &field.handle, suffix),
                    container: None,
                }));
            }
            StorageContext::Block {
                kind,
                block_type_uid,
            } => (kind, block_type_uid),
            StorageContext::Unsupported(context) => {
                return Ok(Resolution::Unlocatable(format!(
                    "Unsupported field context “{}”.",
                    context
                )));
            }
        };

        let Some(owner) = self.tables.block_type_owner(kind, &block_type_uid)? else {
            return Ok(Resolution::Unlocatable(format!(
                "Unable to find owner {} field for context “{}”.",
                kind, field.context
            )));
        };

        let Some(container) = self.fields.field_by_id(owner.field_id)? else {
            return Ok(Resolution::Unlocatable(format!(
                "Unable to find owner {} field for ID “{}”.",
                kind, owner.field_id
            )));
        };

        let Some(table) = container.content_table.as_deref().map(bare_table_name) else {
            return Ok(Resolution::Unlocatable(format!(
                "Owner {} field “{}” has no content table.",
                kind, container.handle
            )));
        };

        let column = if kind.prefixes_block_handle() {
            match owner.handle.as_deref() {
                Some(block) => field_column(prefix, &format!("{}_{}", block, field.handle), suffix),
                None => {
                    return Ok(Resolution::Unlocatable(format!(
                        "Block type “{}” has no handle.",
                        block_type_uid
                    )));
                }
            }
        } else {
            field_column(prefix, &field.handle, suffix)
        };

        debug!(
            subsystem = "migration",
            component = "locator",
            field_id = field.id,
            db_table = table,
            db_column = %column,
            "Resolved nested field location"
        );

        Ok(Resolution::Found(ContentLocation {
            table: table.to_string(),
            column,
            container: Some(ContainerInfo {
                kind,
                field_id: owner.field_id,
                block_type_handle: owner.handle.filter(|_| kind.prefixes_block_handle()),
            }),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{LINKIT_FIELD_TYPE, MATRIX_FIELD_TYPE, SUPER_TABLE_FIELD_TYPE};
    use crate::memory::InMemoryStore;
    use serde_json::json;

    fn field(id: FieldId, handle: &str, field_type: &str, context: &str) -> Field {
        Field {
            id,
            uid: format!("f-{id}"),
            name: handle.to_string(),
            handle: handle.to_string(),
            context: context.to_string(),
            column_prefix: None,
            column_suffix: None,
            field_type: field_type.to_string(),
            settings: json!({}),
            content_table: None,
            block_types: Vec::new(),
        }
    }

    fn container(id: FieldId, field_type: &str, content_table: &str) -> Field {
        Field {
            content_table: Some(content_table.to_string()),
            ..field(id, "blocks", field_type, "global")
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_field(container(30, MATRIX_FIELD_TYPE, "{{%matrixcontent_blocks}}"))
            .with_field(container(40, SUPER_TABLE_FIELD_TYPE, "{{%stc_links}}"))
            .with_block_type(ContainerKind::Matrix, "bt-links", 30, Some("links"))
            .with_block_type(ContainerKind::SuperTable, "st-1", 40, None)
            .with_block_type(ContainerKind::Matrix, "bt-orphan", 77, Some("orphan"))
    }

    fn resolve(store: &InMemoryStore, context: &str) -> Resolution {
        let cta = field(31, "cta", LINKIT_FIELD_TYPE, context);
        ContentLocator::new(store, store).resolve(&cta).unwrap()
    }

    fn found(resolution: Resolution) -> ContentLocation {
        match resolution {
            Resolution::Found(location) => location,
            Resolution::Unlocatable(reason) => panic!("expected a location, got: {}", reason),
        }
    }

    #[test]
    fn test_resolve_global() {
        let location = found(resolve(&store(), "global"));
        assert_eq!(location.table, "content");
        assert_eq!(location.column, "field_cta");
        assert!(location.container.is_none());
    }

    #[test]
    fn test_resolve_matrix_prefixes_block_handle() {
        let location = found(resolve(&store(), "matrixBlockType:bt-links"));
        assert_eq!(location.table, "matrixcontent_blocks");
        assert_eq!(location.column, "field_links_cta");

        let container = location.container.unwrap();
        assert_eq!(container.kind, ContainerKind::Matrix);
        assert_eq!(container.field_id, 30);
        assert_eq!(container.block_type_handle.as_deref(), Some("links"));
    }

    #[test]
    fn test_resolve_super_table_keeps_plain_column() {
        let location = found(resolve(&store(), "superTableBlockType:st-1"));
        assert_eq!(location.table, "stc_links");
        assert_eq!(location.column, "field_cta");
        assert_eq!(location.container.unwrap().block_type_handle, None);
    }

    #[test]
    fn test_resolve_unlocatable() {
        let store = store();

        match resolve(&store, "matrixBlockType:missing") {
            Resolution::Unlocatable(reason) => assert!(reason.contains("owner Matrix field")),
            other => panic!("expected unlocatable, got {:?}", other),
        }
        match resolve(&store, "matrixBlockType:bt-orphan") {
            Resolution::Unlocatable(reason) => assert!(reason.contains("ID “77”")),
            other => panic!("expected unlocatable, got {:?}", other),
        }
        assert!(matches!(
            resolve(&store, "elementIndex:foo"),
            Resolution::Unlocatable(_)
        ));
    }

    #[test]
    fn test_field_column() {
        assert_eq!(field_column("field_", "cta", None), "field_cta");
        assert_eq!(field_column("field_", "cta", Some("")), "field_cta");
        assert_eq!(field_column("field_", "cta", Some("abcd1234")), "field_cta_abcd1234");
        assert_eq!(field_column("field_", "links_cta", None), "field_links_cta");
    }

    #[test]
    fn test_bare_table_name() {
        assert_eq!(bare_table_name("{{%matrixcontent_blocks}}"), "matrixcontent_blocks");
        assert_eq!(bare_table_name("{{stc_links}}"), "stc_links");
        assert_eq!(bare_table_name("content"), "content");
    }

    #[test]
    fn test_describe() {
        let location = ContentLocation {
            table: "matrixcontent_blocks".to_string(),
            column: "field_links_cta".to_string(),
            container: Some(ContainerInfo {
                kind: ContainerKind::Matrix,
                field_id: 9,
                block_type_handle: Some("links".to_string()),
            }),
        };
        assert_eq!(location.describe("cta"), "“cta:links” Matrix ");

        let global = ContentLocation {
            table: "content".to_string(),
            column: "field_cta".to_string(),
            container: None,
        };
        assert_eq!(global.describe("cta"), "");
    }
}
