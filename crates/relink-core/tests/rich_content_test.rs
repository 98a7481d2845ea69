//! Integration tests for link values embedded in rich-content documents

mod common;

use common::*;
use relink_core::migration::DeepContentPatcher;
use relink_core::{
    InMemoryStore, LinkFieldMigration, MigrationContext, MigrationOptions, RecordConverter,
    RecordingLog, LINKIT,
};
use serde_json::{json, Value as JsonValue};

fn document() -> JsonValue {
    json!([
        {
            "type": "vizyBlock",
            "attrs": {
                "id": "vizy-block-1",
                "values": {
                    "content": {
                        "fields": {
                            "cta": {"type": URL_CLASS, "value": "/top", "customText": "Top"},
                            "heading": "Welcome"
                        }
                    }
                }
            }
        },
        {
            "type": "vizyBlock",
            "attrs": {
                "values": {
                    "content": {
                        "fields": {
                            "sections": [
                                {
                                    "fields": {
                                        "cards": [
                                            {"fields": {"cta": linkit_value(json!({
                                                "type": ENTRY_CLASS,
                                                "value": "12",
                                                "target": "1"
                                            }))}}
                                        ]
                                    }
                                }
                            ]
                        }
                    }
                }
            }
        },
        {"type": "paragraph", "content": [{"type": "text", "text": "cta"}]}
    ])
}

fn vizy_store(enabled: bool) -> InMemoryStore {
    InMemoryStore::new()
        .with_field(linkit_field(1, "cta"))
        .with_plugin("vizy", enabled)
        .with_document(1, &[("f-1", "cta")], document())
        .with_document(2, &[("f-other", "cta")], document())
}

#[test]
fn test_rich_content_patched_at_any_depth_integration() {
    let store = vizy_store(true);
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &LINKIT)
        .run()
        .unwrap();

    let patched = store.document(1).unwrap();
    assert_eq!(
        patched[0]["attrs"]["values"]["content"]["fields"]["cta"],
        json!([{
            "type": "url",
            "handle": "default-url",
            "linkValue": "/top",
            "linkText": "Top",
            "newWindow": false
        }])
    );
    assert_eq!(
        patched[1]["attrs"]["values"]["content"]["fields"]["sections"][0]["fields"]["cards"][0]
            ["fields"]["cta"],
        json!([{
            "type": "entry",
            "handle": "default-entry",
            "linkValue": "12",
            "newWindow": true
        }])
    );

    // Sibling values and unrelated nodes are kept.
    assert_eq!(
        patched[0]["attrs"]["values"]["content"]["fields"]["heading"],
        json!("Welcome")
    );
    assert_eq!(patched[0]["attrs"]["id"], json!("vizy-block-1"));
    assert_eq!(patched[2], document()[2]);

    // Documents that do not embed this field are not visited.
    assert_eq!(store.document(2).unwrap(), document());

    let rich = report.field("cta").unwrap().rich_content.unwrap();
    assert_eq!(rich.documents_saved, 1);
    assert_eq!(rich.values_converted, 2);
    assert_eq!(rich.values_failed, 0);
}

#[test]
fn test_rich_content_skipped_when_plugin_disabled_integration() {
    let store = vizy_store(false);
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &LINKIT)
        .run()
        .unwrap();

    assert_eq!(store.document(1).unwrap(), document());
    assert!(report.field("cta").unwrap().rich_content.is_none());
}

#[test]
fn test_rich_content_plugin_handle_is_configurable_integration() {
    let store = vizy_store(false).with_plugin("blocks", true);
    let log = RecordingLog::new();

    LinkFieldMigration::new(MigrationContext::new(&store, &log), &LINKIT)
        .with_options(MigrationOptions {
            rich_content_plugin: "blocks".to_string(),
            ..MigrationOptions::default()
        })
        .run()
        .unwrap();

    assert_ne!(store.document(1).unwrap(), document());
}

#[test]
fn test_rich_content_failure_logged_integration() {
    let store = InMemoryStore::new()
        .with_field(linkit_field(1, "cta"))
        .with_plugin("vizy", true)
        .with_document(
            1,
            &[("f-1", "cta")],
            json!({"fields": {"cta": {"type": PRODUCT_CLASS, "value": "7"}}}),
        );
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &LINKIT)
        .run()
        .unwrap();

    let rich = report.field("cta").unwrap().rich_content.unwrap();
    assert_eq!(rich.documents_saved, 0);
    assert_eq!(rich.values_failed, 1);
    assert_eq!(
        log.errors(),
        vec!["    > Unable to convert rich content “cta” at fields.cta".to_string()]
    );
    assert_eq!(
        store.document(1).unwrap(),
        json!({"fields": {"cta": {"type": PRODUCT_CLASS, "value": "7"}}})
    );
}

#[test]
fn test_patch_document_second_pass_is_noop_integration() {
    let mapper = LINKIT.type_mapper();
    let converter = RecordConverter::new(&LINKIT.values, &mapper);
    let patcher = DeepContentPatcher::new(&converter);

    let first = patcher.patch_document(document(), "cta");
    assert_eq!(first.converted, 2);

    let second = patcher.patch_document(first.document.clone(), "cta");
    assert_eq!(second.converted, 0);
    assert!(second.failed.is_empty());
    assert_eq!(second.document, first.document);
}
