//! Legacy value → link value conversion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::Result;
use crate::migration::read;
use crate::migration::rules::{AttributeSource, LinkKind, TargetRule, ValueRules};
use crate::migration::type_map::{link_type_handle, TypeMapper};
use crate::models::LinkValue;

/// Why a legacy value could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ConversionFailure {
    /// The type marker has no mapping.
    UnmappedType(String),
    /// The stored cell is not decodable.
    MalformedValue(String),
    /// The converted value could not be serialized for storage.
    Unstorable(String),
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedType(t) => write!(f, "no link type for legacy type \"{}\"", t),
            Self::MalformedValue(e) => write!(f, "stored value is not valid JSON ({})", e),
            Self::Unstorable(e) => write!(f, "converted value cannot be stored ({})", e),
        }
    }
}

/// Result of converting one stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Nothing stored; leave the row alone.
    Empty,
    /// Something stored that cannot be converted; leave the row alone, report it.
    Failed(ConversionFailure),
    /// The new link value.
    Converted(LinkValue),
}

impl Conversion {
    /// The value to store: always a one-element list. `None` unless converted.
    pub fn stored_value(&self) -> Result<Option<JsonValue>> {
        match self {
            Self::Converted(link) => Ok(Some(JsonValue::Array(vec![serde_json::to_value(link)?]))),
            _ => Ok(None),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Converts legacy values of one plugin. Pure.
pub struct RecordConverter<'a> {
    rules: &'a ValueRules,
    mapper: &'a TypeMapper,
}

impl<'a> RecordConverter<'a> {
    pub fn new(rules: &'a ValueRules, mapper: &'a TypeMapper) -> Self {
        Self { rules, mapper }
    }

    /// Convert a decoded legacy value.
    pub fn convert(&self, legacy: &JsonValue) -> Conversion {
        let record = match legacy {
            JsonValue::Object(map) => map,
            _ => return Conversion::Empty,
        };

        let Some(legacy_type) = read::type_marker(record, self.rules.type_key) else {
            return Conversion::Empty;
        };

        let Some(link_type) = self.mapper.resolve(&legacy_type) else {
            return Conversion::Failed(ConversionFailure::UnmappedType(legacy_type));
        };

        let attributes = match self.rules.attributes {
            AttributeSource::Inline => record.clone(),
            AttributeSource::Payload(key) => read::nested_object(record.get(key)),
        };

        let mut link = LinkValue {
            handle: link_type_handle(&link_type),
            link_value: record
                .get(self.rules.value_key)
                .filter(|v| !v.is_null())
                .cloned(),
            link_text: read::text(attributes.get(self.rules.text_key)),
            link_title: self
                .rules
                .title_key
                .and_then(|key| read::text(attributes.get(key))),
            aria_label: self
                .rules
                .aria_label_key
                .and_then(|key| read::text(attributes.get(key))),
            link_site_id: None,
            new_window: new_window(&self.rules.target, &attributes),
            link_type,
        };

        if let Some(reference) = self.rules.element_reference {
            if LinkKind::of(&link.link_type) == LinkKind::Element {
                link.link_value = present(record, reference.id_key);
                link.link_site_id = present(record, reference.site_id_key);
            }
        }

        Conversion::Converted(link)
    }

    /// Decode a stored cell, then convert it.
    pub fn convert_raw(&self, raw: Option<&str>) -> Conversion {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Conversion::Empty,
            Some(raw) => raw,
        };

        match serde_json::from_str::<JsonValue>(raw) {
            Ok(decoded) => self.convert(&decoded),
            Err(e) => Conversion::Failed(ConversionFailure::MalformedValue(e.to_string())),
        }
    }
}

fn new_window(rule: &TargetRule, attributes: &Map<String, JsonValue>) -> bool {
    match *rule {
        TargetRule::Flag(key) => read::flag(attributes.get(key), false),
        TargetRule::Marker { key, marker } => {
            read::text(attributes.get(key)).as_deref() == Some(marker)
        }
    }
}

fn present(record: &Map<String, JsonValue>, key: &str) -> Option<JsonValue> {
    record.get(key).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::rules::{LINKIT, TYPED_LINK};
    use serde_json::json;

    fn url_mapper() -> TypeMapper {
        TypeMapper::new([("url", "url"), ("entry", "entry")])
    }

    #[test]
    fn test_convert_flat_value() {
        let mapper = url_mapper();
        let converter = RecordConverter::new(&LINKIT.values, &mapper);

        let result = converter.convert(&json!({
            "type": "url",
            "value": "https://example.com",
            "customText": "Click"
        }));

        assert_eq!(
            result.stored_value().unwrap().unwrap(),
            json!([{
                "type": "url",
                "handle": "default-url",
                "linkValue": "https://example.com",
                "linkText": "Click",
                "newWindow": false
            }])
        );
    }

    #[test]
    fn test_convert_missing_type_is_empty() {
        let mapper = url_mapper();
        let converter = RecordConverter::new(&LINKIT.values, &mapper);

        assert_eq!(converter.convert(&json!({"type": null})), Conversion::Empty);
        assert_eq!(
            converter.convert(&json!({"value": "https://example.com", "customText": "x"})),
            Conversion::Empty
        );
        assert_eq!(converter.convert(&json!("https://example.com")), Conversion::Empty);
        assert_eq!(converter.convert(&json!(null)), Conversion::Empty);
    }

    #[test]
    fn test_convert_unknown_type_fails() {
        let mapper = url_mapper();
        let converter = RecordConverter::new(&LINKIT.values, &mapper);

        let result = converter.convert(&json!({"type": "unknown-legacy-type", "value": "x"}));
        assert_eq!(
            result,
            Conversion::Failed(ConversionFailure::UnmappedType(
                "unknown-legacy-type".to_string()
            ))
        );
        assert_eq!(result.stored_value().unwrap(), None);
    }

    #[test]
    fn test_convert_flag_target() {
        let mapper = url_mapper();
        let converter = RecordConverter::new(&LINKIT.values, &mapper);

        for target in [json!(true), json!("1"), json!(1)] {
            match converter.convert(&json!({"type": "url", "value": "/", "target": target})) {
                Conversion::Converted(link) => assert!(link.new_window),
                other => panic!("expected conversion, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_convert_payload_value() {
        let mapper = TYPED_LINK.type_mapper();
        let converter = RecordConverter::new(&TYPED_LINK.values, &mapper);

        let row = json!({
            "id": 3,
            "elementId": 40,
            "siteId": 1,
            "type": "url",
            "linkedUrl": "https://example.com/docs",
            "linkedId": null,
            "linkedSiteId": null,
            "payload": "{\"customText\":\"Docs\",\"title\":\"Read the docs\",\"ariaLabel\":\"Documentation\",\"target\":\"_blank\"}"
        });

        match converter.convert(&row) {
            Conversion::Converted(link) => {
                assert_eq!(link.handle, "default-url");
                assert_eq!(link.link_value, Some(json!("https://example.com/docs")));
                assert_eq!(link.link_text.as_deref(), Some("Docs"));
                assert_eq!(link.link_title.as_deref(), Some("Read the docs"));
                assert_eq!(link.aria_label.as_deref(), Some("Documentation"));
                assert!(link.new_window);
                assert_eq!(link.link_site_id, None);
            }
            other => panic!("expected conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_marker_target_other_value() {
        let mapper = TYPED_LINK.type_mapper();
        let converter = RecordConverter::new(&TYPED_LINK.values, &mapper);

        let row = json!({"type": "tel", "linkedUrl": "+3100", "payload": "{\"target\":\"_self\"}"});
        match converter.convert(&row) {
            Conversion::Converted(link) => {
                assert_eq!(link.link_type, "phone");
                assert_eq!(link.handle, "default-phone");
                assert!(!link.new_window);
            }
            other => panic!("expected conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_element_reference() {
        let mapper = TYPED_LINK.type_mapper();
        let converter = RecordConverter::new(&TYPED_LINK.values, &mapper);

        let row = json!({
            "type": "entry",
            "linkedUrl": "",
            "linkedId": 812,
            "linkedSiteId": 2,
            "payload": null
        });

        match converter.convert(&row) {
            Conversion::Converted(link) => {
                assert_eq!(link.handle, "default-entry");
                assert_eq!(link.link_value, Some(json!(812)));
                assert_eq!(link.link_site_id, Some(json!(2)));
                assert_eq!(link.link_text, None);
            }
            other => panic!("expected conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_raw() {
        let mapper = url_mapper();
        let converter = RecordConverter::new(&LINKIT.values, &mapper);

        assert_eq!(converter.convert_raw(None), Conversion::Empty);
        assert_eq!(converter.convert_raw(Some("  ")), Conversion::Empty);
        assert!(matches!(
            converter.convert_raw(Some("{\"type\":")),
            Conversion::Failed(ConversionFailure::MalformedValue(_))
        ));
        assert!(matches!(
            converter.convert_raw(Some("{\"type\":\"url\",\"value\":\"/\"}")),
            Conversion::Converted(_)
        ));
    }

    #[test]
    fn test_converted_value_is_not_reconverted() {
        let mapper = url_mapper();
        let converter = RecordConverter::new(&LINKIT.values, &mapper);

        let first = converter
            .convert(&json!({"type": "url", "value": "https://example.com"}))
            .stored_value()
            .unwrap()
            .unwrap();

        assert_eq!(converter.convert(&first), Conversion::Empty);
    }

    #[test]
    fn test_stored_value_only_for_converted() {
        assert_eq!(Conversion::Empty.stored_value().unwrap(), None);
        assert_eq!(
            Conversion::Failed(ConversionFailure::MalformedValue("eof".to_string()))
                .stored_value()
                .unwrap(),
            None
        );

        let link = LinkValue {
            link_type: "url".to_string(),
            handle: "default-url".to_string(),
            link_value: Some(json!("/")),
            link_text: None,
            link_title: None,
            aria_label: None,
            link_site_id: None,
            new_window: true,
        };
        let stored = Conversion::Converted(link).stored_value().unwrap().unwrap();
        assert_eq!(
            stored,
            json!([{"type": "url", "handle": "default-url", "linkValue": "/", "newWindow": true}])
        );
    }

    #[test]
    fn test_unstorable_failure_display() {
        let failure = ConversionFailure::Unstorable("key must be a string".to_string());
        assert_eq!(
            failure.to_string(),
            "converted value cannot be stored (key must be a string)"
        );
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"reason": "unstorable", "detail": "key must be a string"})
        );
    }
}
