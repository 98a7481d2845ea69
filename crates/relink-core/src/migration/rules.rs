//! Conversion-rule records, one per legacy plugin.
//!
//! The engine is generic; everything that differs between Linkit and Typed
//! Link (setting keys, value nesting, target encoding, where content lives,
//! how the new definition is persisted) is data in a [`LegacyPlugin`].

use heck::ToTitleCase;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use crate::defaults::{
    LINKIT_FIELD_TYPE, NEW_WINDOW_TARGET, TYPED_LINK_FIELD_TYPE, TYPED_LINK_TABLE,
};
use crate::error::Error;
use crate::migration::read;
use crate::migration::type_map::TypeMapper;

// =============================================================================
// LINK KINDS
// =============================================================================

/// How a link type references its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Points at a CMS element (entry, asset, ...) by id.
    Element,
    /// Points at a site.
    Site,
    /// Free-form value (URL, email, phone, custom).
    Plain,
}

impl LinkKind {
    pub fn of(link_type: &str) -> Self {
        match link_type {
            "asset" | "category" | "entry" | "user" | "product" | "variant" => Self::Element,
            "site" => Self::Site,
            _ => Self::Plain,
        }
    }
}

/// Display label of a link type.
pub fn link_type_label(link_type: &str) -> String {
    match link_type {
        "url" => "URL".to_string(),
        other => other.to_title_case(),
    }
}

// =============================================================================
// SETTINGS RULES
// =============================================================================

/// A boolean field setting: fixed for the plugin, or read with a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingFlag {
    Fixed(bool),
    Key { key: &'static str, default: bool },
}

impl SettingFlag {
    pub fn read(&self, settings: &Map<String, JsonValue>) -> bool {
        match *self {
            Self::Fixed(value) => value,
            Self::Key { key, default } => read::flag(settings.get(key), default),
        }
    }
}

/// Where a link type's default link text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTextSource {
    /// A key inside each legacy type entry.
    PerType(&'static str),
    /// A field-level setting shared by every type.
    FieldSetting(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct SettingsRules {
    /// Key of the object holding one entry per legacy link type.
    pub types_key: &'static str,
    pub enabled_key: &'static str,
    /// Field-level flag that forces every type enabled when set.
    pub enable_all: Option<SettingFlag>,
    pub link_text: LinkTextSource,
    pub sources_key: &'static str,
    pub selection_label_key: Option<&'static str>,
    pub placeholder_key: Option<&'static str>,
    /// Key of the site id list of the site link type.
    pub sites_key: Option<&'static str>,
    pub include_text: SettingFlag,
    pub enable_title: SettingFlag,
    pub enable_aria_label: SettingFlag,
    pub new_window: SettingFlag,
    pub default_link_type_key: Option<&'static str>,
}

// =============================================================================
// VALUE RULES
// =============================================================================

/// Where text, title, aria label and target live in a legacy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSource {
    /// Next to the type marker.
    Inline,
    /// Inside a nested object stored under this key, possibly as a JSON string.
    Payload(&'static str),
}

/// How a legacy value encodes "open in a new window".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    Flag(&'static str),
    Marker {
        key: &'static str,
        marker: &'static str,
    },
}

/// Keys carrying the element reference of element link kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementReference {
    pub id_key: &'static str,
    pub site_id_key: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ValueRules {
    pub type_key: &'static str,
    pub value_key: &'static str,
    pub attributes: AttributeSource,
    pub text_key: &'static str,
    pub title_key: Option<&'static str>,
    pub aria_label_key: Option<&'static str>,
    pub target: TargetRule,
    pub element_reference: Option<ElementReference>,
}

// =============================================================================
// STORAGE RULES
// =============================================================================

/// Where legacy content lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// In the field's own content column.
    FieldColumn,
    /// In a side table keyed by field id; converted values go to the field's
    /// content column of the matching element/site row.
    SideTable { table: &'static str },
}

/// How a validated definition is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsPersistence {
    /// Overwrite type and settings on the field's row.
    RewriteFieldRow,
    /// Save through the field registry (containers for nested fields).
    SaveField,
}

// =============================================================================
// PLUGINS
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct LegacyPlugin {
    pub name: &'static str,
    pub field_type: &'static str,
    pub type_table: &'static [(&'static str, &'static str)],
    pub settings: SettingsRules,
    pub values: ValueRules,
    pub content: ContentSource,
    pub persistence: SettingsPersistence,
    /// Give the new definition a fresh column suffix.
    pub assign_column_suffix: bool,
    /// Re-save migrated fields at the end of a run.
    pub resave_fields: bool,
}

pub const LINKIT: LegacyPlugin = LegacyPlugin {
    name: "linkit",
    field_type: LINKIT_FIELD_TYPE,
    type_table: &[
        (r"presseddigital\linkit\models\Asset", "asset"),
        (r"presseddigital\linkit\models\Category", "category"),
        (r"presseddigital\linkit\models\Email", "email"),
        (r"presseddigital\linkit\models\Entry", "entry"),
        (r"presseddigital\linkit\models\Phone", "phone"),
        (r"presseddigital\linkit\models\Url", "url"),
        (r"presseddigital\linkit\models\Twitter", "url"),
        (r"presseddigital\linkit\models\Facebook", "url"),
        (r"presseddigital\linkit\models\Instagram", "url"),
        (r"presseddigital\linkit\models\LinkedIn", "url"),
        (r"presseddigital\linkit\models\User", "user"),
    ],
    settings: SettingsRules {
        types_key: "types",
        enabled_key: "enabled",
        enable_all: None,
        link_text: LinkTextSource::PerType("customLabel"),
        sources_key: "sources",
        selection_label_key: Some("customSelectionLabel"),
        placeholder_key: Some("customPlaceholder"),
        sites_key: None,
        include_text: SettingFlag::Key {
            key: "allowCustomText",
            default: true,
        },
        enable_title: SettingFlag::Fixed(true),
        enable_aria_label: SettingFlag::Fixed(false),
        new_window: SettingFlag::Key {
            key: "allowTarget",
            default: false,
        },
        default_link_type_key: None,
    },
    values: ValueRules {
        type_key: "type",
        value_key: "value",
        attributes: AttributeSource::Inline,
        text_key: "customText",
        title_key: None,
        aria_label_key: None,
        target: TargetRule::Flag("target"),
        element_reference: None,
    },
    content: ContentSource::FieldColumn,
    persistence: SettingsPersistence::RewriteFieldRow,
    assign_column_suffix: false,
    resave_fields: true,
};

pub const TYPED_LINK: LegacyPlugin = LegacyPlugin {
    name: "typed-link",
    field_type: TYPED_LINK_FIELD_TYPE,
    type_table: &[
        ("asset", "asset"),
        ("category", "category"),
        ("custom", "custom"),
        ("email", "email"),
        ("entry", "entry"),
        ("site", "site"),
        ("tel", "phone"),
        ("url", "url"),
        ("user", "user"),
    ],
    settings: SettingsRules {
        types_key: "typeSettings",
        enabled_key: "enabled",
        enable_all: Some(SettingFlag::Key {
            key: "enableAllLinkTypes",
            default: true,
        }),
        link_text: LinkTextSource::FieldSetting("defaultText"),
        sources_key: "sources",
        selection_label_key: None,
        placeholder_key: None,
        sites_key: Some("sites"),
        include_text: SettingFlag::Key {
            key: "allowCustomText",
            default: true,
        },
        enable_title: SettingFlag::Key {
            key: "enableTitle",
            default: true,
        },
        enable_aria_label: SettingFlag::Key {
            key: "enableAriaLabel",
            default: true,
        },
        new_window: SettingFlag::Key {
            key: "allowTarget",
            default: true,
        },
        default_link_type_key: Some("defaultLinkName"),
    },
    values: ValueRules {
        type_key: "type",
        value_key: "linkedUrl",
        attributes: AttributeSource::Payload("payload"),
        text_key: "customText",
        title_key: Some("title"),
        aria_label_key: Some("ariaLabel"),
        target: TargetRule::Marker {
            key: "target",
            marker: NEW_WINDOW_TARGET,
        },
        element_reference: Some(ElementReference {
            id_key: "linkedId",
            site_id_key: "linkedSiteId",
        }),
    },
    content: ContentSource::SideTable {
        table: TYPED_LINK_TABLE,
    },
    persistence: SettingsPersistence::SaveField,
    assign_column_suffix: true,
    resave_fields: false,
};

impl LegacyPlugin {
    pub fn all() -> [&'static LegacyPlugin; 2] {
        [&LINKIT, &TYPED_LINK]
    }

    pub fn by_name(name: &str) -> Option<&'static LegacyPlugin> {
        Self::all().into_iter().find(|plugin| plugin.name == name)
    }

    /// A mapper over this plugin's static type table, without override.
    pub fn type_mapper(&self) -> TypeMapper {
        TypeMapper::new(self.type_table.iter().copied())
    }
}

impl fmt::Display for LegacyPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for &'static LegacyPlugin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LegacyPlugin::by_name(&s.to_lowercase()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Unknown legacy plugin \"{}\" (expected one of: linkit, typed-link)",
                s
            ))
        })
    }
}
