//! Core data models for relink.
//!
//! These types describe the legacy side (field rows, content rows), the
//! registry view of fields (including container fields and their block type
//! layouts) and the new link-field schema the migration produces.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use crate::defaults::{
    FIELD_COLUMN_PREFIX, GLOBAL_CONTEXT, LINK_FIELD_TYPE, MATRIX_BLOCK_TYPES_TABLE,
    MATRIX_CONTEXT_MARKER, SUPER_TABLE_BLOCK_TYPES_TABLE, SUPER_TABLE_CONTEXT_MARKER,
};
use crate::error::Result;

/// Primary key of a field row.
pub type FieldId = i64;

// =============================================================================
// LEGACY SIDE
// =============================================================================

/// A row of the fields table as selected at the start of a run.
///
/// Never mutated; the settings blob is kept exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFieldRecord {
    pub id: FieldId,
    pub uid: String,
    pub name: String,
    pub handle: String,
    pub context: String,
    #[serde(default)]
    pub column_suffix: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    pub settings: String,
}

impl LegacyFieldRecord {
    pub fn storage_context(&self) -> StorageContext {
        StorageContext::parse(&self.context)
    }
}

/// One stored value instance in a content table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRow {
    pub id: i64,
    pub element_id: i64,
    pub site_id: i64,
    pub raw_value: Option<String>,
}

// =============================================================================
// STORAGE CONTEXT
// =============================================================================

/// The two kinds of nested block containers a field can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Matrix,
    SuperTable,
}

impl ContainerKind {
    /// Table mapping block type UIDs to their owning container field.
    pub fn mapping_table(&self) -> &'static str {
        match self {
            Self::Matrix => MATRIX_BLOCK_TYPES_TABLE,
            Self::SuperTable => SUPER_TABLE_BLOCK_TYPES_TABLE,
        }
    }

    /// Marker substring identifying this kind in a context string.
    pub fn context_marker(&self) -> &'static str {
        match self {
            Self::Matrix => MATRIX_CONTEXT_MARKER,
            Self::SuperTable => SUPER_TABLE_CONTEXT_MARKER,
        }
    }

    /// Whether content columns carry the block type handle before the field handle.
    pub fn prefixes_block_handle(&self) -> bool {
        matches!(self, Self::Matrix)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matrix => write!(f, "Matrix"),
            Self::SuperTable => write!(f, "Super Table"),
        }
    }
}

/// Where a field's values are physically stored, decoded from its context string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageContext {
    /// Stored in the generic content table.
    Global,
    /// Stored in the content table of the container owning `block_type_uid`.
    Block {
        kind: ContainerKind,
        block_type_uid: String,
    },
    /// A context this engine does not know how to locate.
    Unsupported(String),
}

impl StorageContext {
    pub fn parse(context: &str) -> Self {
        if context == GLOBAL_CONTEXT {
            return Self::Global;
        }

        let kind = if context.contains(MATRIX_CONTEXT_MARKER) {
            ContainerKind::Matrix
        } else if context.contains(SUPER_TABLE_CONTEXT_MARKER) {
            ContainerKind::SuperTable
        } else {
            return Self::Unsupported(context.to_string());
        };

        match context.split(':').nth(1).filter(|uid| !uid.is_empty()) {
            Some(uid) => Self::Block {
                kind,
                block_type_uid: uid.to_string(),
            },
            None => Self::Unsupported(context.to_string()),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

/// A row of a block-type mapping table: the container that owns a block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypeOwner {
    pub field_id: FieldId,
    /// Block type handle. Only matrix block types have one.
    #[serde(default)]
    pub handle: Option<String>,
}

// =============================================================================
// REGISTRY VIEW
// =============================================================================

/// A field as the field registry knows it.
///
/// Container fields (matrix, super table) carry their block types; every
/// other field leaves `block_types` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub uid: String,
    pub name: String,
    pub handle: String,
    pub context: String,
    #[serde(default)]
    pub column_prefix: Option<String>,
    #[serde(default)]
    pub column_suffix: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub settings: JsonValue,
    /// Content table of a container field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_table: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_types: Vec<BlockType>,
}

impl Field {
    pub fn storage_context(&self) -> StorageContext {
        StorageContext::parse(&self.context)
    }

    /// Column prefix, falling back to the CMS default.
    pub fn column_prefix(&self) -> &str {
        self.column_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(FIELD_COLUMN_PREFIX)
    }

    /// Replace every layout element embedding a field with `replacement.id`.
    ///
    /// Returns the number of elements replaced. Block types whose layouts do
    /// not reference the field are left untouched.
    pub fn replace_nested_field(&mut self, replacement: &Field) -> usize {
        let mut replaced = 0;

        for block_type in &mut self.block_types {
            for tab in &mut block_type.layout.tabs {
                for element in &mut tab.elements {
                    if let LayoutElement::Field { field } = element {
                        if field.id == replacement.id {
                            *field = replacement.clone();
                            replaced += 1;
                        }
                    }
                }
            }
        }

        replaced
    }

    /// All fields embedded in this container's block type layouts.
    pub fn nested_fields(&self) -> Vec<(&BlockType, &Field)> {
        self.block_types
            .iter()
            .flat_map(|block_type| {
                block_type
                    .layout
                    .tabs
                    .iter()
                    .flat_map(|tab| tab.elements.iter())
                    .filter_map(move |element| match element {
                        LayoutElement::Field { field } => Some((block_type, field)),
                        LayoutElement::Native { .. } => None,
                    })
            })
            .collect()
    }
}

/// A block type of a container field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockType {
    pub id: i64,
    pub uid: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub layout: FieldLayout,
}

/// An ordered list of tabs.
///
/// Used both for container block types and for the sub-layout attached to
/// each migrated link type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub tabs: Vec<LayoutTab>,
}

impl FieldLayout {
    pub fn tab(&self, name: &str) -> Option<&LayoutTab> {
        self.tabs.iter().find(|tab| tab.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTab {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<LayoutElement>,
}

impl LayoutTab {
    /// Element type identifiers in display order.
    pub fn element_types(&self) -> Vec<&str> {
        self.elements
            .iter()
            .map(|element| match element {
                LayoutElement::Field { .. } => crate::defaults::CUSTOM_FIELD_ELEMENT,
                LayoutElement::Native { element_type, .. } => element_type.as_str(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutElement {
    /// A custom field placed in the layout.
    Field { field: Field },
    /// A built-in element identified by its type.
    Native {
        #[serde(rename = "type")]
        element_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u8>,
    },
}

// =============================================================================
// NEW SCHEMA
// =============================================================================

/// One link entry of a migrated value. Stored values are lists of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkValue {
    #[serde(rename = "type")]
    pub link_type: String,
    pub handle: String,
    pub link_value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_site_id: Option<JsonValue>,
    pub new_window: bool,
}

/// Settings of one link type offered by a migrated field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTypeConfig {
    #[serde(rename = "type")]
    pub link_type: String,
    pub label: String,
    pub handle: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sites: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub layout_uid: String,
    pub layout_config: FieldLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFieldSettings {
    pub new_window: bool,
    #[serde(default)]
    pub default_link_type: Option<String>,
    pub link_types: Vec<LinkTypeConfig>,
}

/// A link field definition built from a legacy field, ready for validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFieldDefinition {
    pub id: FieldId,
    pub uid: String,
    pub name: String,
    pub handle: String,
    pub context: String,
    pub column_suffix: Option<String>,
    pub settings: LinkFieldSettings,
}

impl NewFieldDefinition {
    pub fn from_legacy(record: &LegacyFieldRecord, settings: LinkFieldSettings) -> Self {
        Self {
            id: record.id,
            uid: record.uid.clone(),
            name: record.name.clone(),
            handle: record.handle.clone(),
            context: record.context.clone(),
            column_suffix: record.column_suffix.clone(),
            settings,
        }
    }

    pub fn storage_context(&self) -> StorageContext {
        StorageContext::parse(&self.context)
    }

    /// Serialized settings as written to the fields table.
    pub fn settings_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(&self.settings)?)
    }

    /// The registry view of this definition.
    pub fn to_field(&self) -> Result<Field> {
        Ok(Field {
            id: self.id,
            uid: self.uid.clone(),
            name: self.name.clone(),
            handle: self.handle.clone(),
            context: self.context.clone(),
            column_prefix: None,
            column_suffix: self.column_suffix.clone(),
            field_type: LINK_FIELD_TYPE.to_string(),
            settings: self.settings_json()?,
            content_table: None,
            block_types: Vec::new(),
        })
    }
}

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// Attribute → messages map, as reported by validation and by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.0
            .entry(attribute.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of messages across attributes.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, attribute: &str) -> Option<&[String]> {
        self.0.get(attribute).map(Vec::as_slice)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}
