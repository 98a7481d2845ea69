//! Centralized default constants for relink.
//!
//! **This module is the single source of truth** for table names, context
//! markers, field type identifiers and layout element identifiers. Every
//! crate references these constants instead of repeating string literals.

// =============================================================================
// FIELD TYPES
// =============================================================================

/// Field type written for every migrated field.
pub const LINK_FIELD_TYPE: &str = r"verbb\hyper\fields\HyperField";

/// Field type of Linkit fields.
pub const LINKIT_FIELD_TYPE: &str = r"presseddigital\linkit\fields\LinkitField";

/// Field type of Typed Link fields.
pub const TYPED_LINK_FIELD_TYPE: &str = r"lenz\linkfield\fields\LinkField";

/// Field type of block-type A containers.
pub const MATRIX_FIELD_TYPE: &str = r"craft\fields\Matrix";

/// Field type of block-type B containers.
pub const SUPER_TABLE_FIELD_TYPE: &str = r"verbb\supertable\fields\SuperTableField";

/// Field type of rich-content fields.
pub const RICH_CONTENT_FIELD_TYPE: &str = r"verbb\vizy\fields\VizyField";

// =============================================================================
// STORAGE
// =============================================================================

/// Context of fields stored directly in the content table.
pub const GLOBAL_CONTEXT: &str = "global";

/// Context marker of fields nested in a matrix block type.
pub const MATRIX_CONTEXT_MARKER: &str = "matrixBlockType";

/// Context marker of fields nested in a super table block type.
pub const SUPER_TABLE_CONTEXT_MARKER: &str = "superTableBlockType";

/// Column prefix used when a field does not carry its own.
pub const FIELD_COLUMN_PREFIX: &str = "field_";

/// Generic content table.
pub const CONTENT_TABLE: &str = "content";

/// Fields table.
pub const FIELDS_TABLE: &str = "fields";

/// Block-type to container mapping table for matrix fields.
pub const MATRIX_BLOCK_TYPES_TABLE: &str = "matrixblocktypes";

/// Block-type to container mapping table for super table fields.
pub const SUPER_TABLE_BLOCK_TYPES_TABLE: &str = "supertableblocktypes";

/// Field layout tabs table.
pub const FIELD_LAYOUT_TABS_TABLE: &str = "fieldlayouttabs";

/// Sites table.
pub const SITES_TABLE: &str = "sites";

/// Plugins table.
pub const PLUGINS_TABLE: &str = "plugins";

/// Side table holding Typed Link values.
pub const TYPED_LINK_TABLE: &str = "lenz_linkfield";

/// Length of the column suffix assigned to re-created fields.
pub const COLUMN_SUFFIX_LENGTH: usize = 8;

// =============================================================================
// RICH CONTENT
// =============================================================================

/// Handle of the rich-content plugin whose documents embed field values.
pub const RICH_CONTENT_PLUGIN: &str = "vizy";

/// Path segment under which rich-content blocks keep their field values.
pub const RICH_CONTENT_FIELDS_KEY: &str = "fields";

// =============================================================================
// LINK TYPES
// =============================================================================

/// Prefix of synthetic link type handles.
pub const LINK_TYPE_HANDLE_PREFIX: &str = "default-";

/// Legacy target value meaning "open in a new window".
pub const NEW_WINDOW_TARGET: &str = "_blank";

/// Sources value meaning "every source".
pub const ALL_SOURCES: &str = "*";

// =============================================================================
// SUB-LAYOUT
// =============================================================================

/// First tab of a link type layout.
pub const LAYOUT_CONTENT_TAB: &str = "Content";

/// Second tab of a link type layout.
pub const LAYOUT_ADVANCED_TAB: &str = "Advanced";

/// Width of the link value and link text elements.
pub const LAYOUT_HALF_WIDTH: u8 = 50;

pub const LINK_FIELD_ELEMENT: &str = r"verbb\hyper\fieldlayoutelements\LinkField";
pub const LINK_TEXT_ELEMENT: &str = r"verbb\hyper\fieldlayoutelements\LinkTextField";
pub const LINK_TITLE_ELEMENT: &str = r"verbb\hyper\fieldlayoutelements\LinkTitleField";
pub const CLASSES_ELEMENT: &str = r"verbb\hyper\fieldlayoutelements\ClassesField";
pub const CUSTOM_ATTRIBUTES_ELEMENT: &str =
    r"verbb\hyper\fieldlayoutelements\CustomAttributesField";
pub const ARIA_LABEL_ELEMENT: &str = r"verbb\hyper\fieldlayoutelements\AriaLabelField";

/// Layout element type that embeds a custom field.
pub const CUSTOM_FIELD_ELEMENT: &str = r"craft\fieldlayoutelements\CustomField";
