//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use relink_core::defaults::{LINKIT_FIELD_TYPE, TYPED_LINK_FIELD_TYPE};
use relink_core::{BlockType, Field, FieldLayout, LayoutElement, LayoutTab};
use serde_json::{json, Value as JsonValue};

pub const URL_CLASS: &str = r"presseddigital\linkit\models\Url";
pub const ENTRY_CLASS: &str = r"presseddigital\linkit\models\Entry";
pub const PRODUCT_CLASS: &str = r"presseddigital\linkit\models\Product";
pub const TWITTER_CLASS: &str = r"presseddigital\linkit\models\Twitter";

pub fn field(id: i64, handle: &str, field_type: &str, settings: JsonValue) -> Field {
    Field {
        id,
        uid: format!("f-{id}"),
        name: handle.to_string(),
        handle: handle.to_string(),
        context: "global".to_string(),
        column_prefix: None,
        column_suffix: None,
        field_type: field_type.to_string(),
        settings,
        content_table: None,
        block_types: Vec::new(),
    }
}

pub fn nested(id: i64, handle: &str, field_type: &str, context: &str, settings: JsonValue) -> Field {
    Field {
        context: context.to_string(),
        ..field(id, handle, field_type, settings)
    }
}

pub fn block_type(id: i64, uid: &str, handle: &str, fields: Vec<Field>) -> BlockType {
    BlockType {
        id,
        uid: uid.to_string(),
        handle: Some(handle.to_string()),
        layout: FieldLayout {
            tabs: vec![LayoutTab {
                name: "Content".to_string(),
                elements: fields
                    .into_iter()
                    .map(|field| LayoutElement::Field { field })
                    .collect(),
            }],
        },
    }
}

pub fn linkit_settings() -> JsonValue {
    json!({
        "allowCustomText": true,
        "allowTarget": "1",
        "types": {
            URL_CLASS: {"enabled": "1", "customLabel": "Visit", "customPlaceholder": "https://"},
            TWITTER_CLASS: {"enabled": "", "customLabel": "Tweet"},
            ENTRY_CLASS: {"enabled": "", "sources": ["section:news"], "customSelectionLabel": "Pick"},
            PRODUCT_CLASS: {"enabled": "1"}
        }
    })
}

pub fn linkit_field(id: i64, handle: &str) -> Field {
    field(id, handle, LINKIT_FIELD_TYPE, linkit_settings())
}

pub fn typed_link_settings() -> JsonValue {
    json!({
        "allowTarget": false,
        "defaultLinkName": "entry",
        "defaultText": "Read more",
        "enableAllLinkTypes": false,
        "typeSettings": {
            "url": {"enabled": true},
            "entry": {"enabled": true, "sources": "*"},
            "site": {"enabled": true, "sites": [1, "2", 99]},
            "tel": {"enabled": false}
        }
    })
}

pub fn typed_link_field(id: i64, handle: &str, context: &str) -> Field {
    nested(id, handle, TYPED_LINK_FIELD_TYPE, context, typed_link_settings())
}

/// A legacy Linkit value as stored in a content column.
pub fn linkit_value(value: JsonValue) -> JsonValue {
    JsonValue::String(value.to_string())
}

pub fn content_row(id: i64, element_id: i64, column: &str, value: JsonValue) -> JsonValue {
    json!({"id": id, "elementId": element_id, "siteId": 1, column: value})
}
