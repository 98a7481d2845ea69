//! Integration tests for migrating Typed Link fields
//!
//! Typed Link keeps values in a side table and nested fields are persisted
//! through their container, so these tests build a small matrix setup.

mod common;

use common::*;
use relink_core::defaults::{
    LINK_FIELD_TYPE, MATRIX_FIELD_TYPE, TYPED_LINK_FIELD_TYPE, TYPED_LINK_TABLE,
};
use relink_core::migration::SettingsOutcome;
use relink_core::{
    ContainerKind, Field, FieldErrors, InMemoryStore, LayoutElement, LinkFieldMigration,
    MigrationContext, RecordingLog, TYPED_LINK,
};
use serde_json::json;

const BLOCKS_TABLE: &str = "matrixcontent_blocks";

fn heading() -> Field {
    nested(22, "heading", "craft\\fields\\PlainText", "matrixBlockType:bt-links", json!({}))
}

fn body() -> Field {
    nested(23, "body", "craft\\fields\\PlainText", "matrixBlockType:bt-text", json!({}))
}

fn container() -> Field {
    let cta = typed_link_field(21, "cta", "matrixBlockType:bt-links");

    Field {
        content_table: Some("{{%matrixcontent_blocks}}".to_string()),
        block_types: vec![
            block_type(1, "bt-links", "links", vec![cta, heading()]),
            block_type(2, "bt-text", "text", vec![body()]),
        ],
        ..field(20, "blocks", MATRIX_FIELD_TYPE, json!({}))
    }
}

fn side_row(id: i64, element_id: i64, link_type: &str, extra: serde_json::Value) -> serde_json::Value {
    let mut row = json!({
        "id": id,
        "fieldId": 21,
        "elementId": element_id,
        "siteId": 1,
        "type": link_type,
        "linkedUrl": null,
        "linkedId": null,
        "linkedSiteId": null,
        "payload": "{}"
    });
    if let (Some(row), Some(extra)) = (row.as_object_mut(), extra.as_object()) {
        row.extend(extra.clone());
    }
    row
}

fn matrix_store() -> InMemoryStore {
    InMemoryStore::new()
        .with_field(container())
        .with_field(typed_link_field(21, "cta", "matrixBlockType:bt-links"))
        .with_field(heading())
        .with_field(body())
        .with_block_type(ContainerKind::Matrix, "bt-links", 20, Some("links"))
        .with_block_type(ContainerKind::Matrix, "bt-text", 20, Some("text"))
        .with_site(1, "site-uid-1")
        .with_site(2, "site-uid-2")
        .with_row(
            TYPED_LINK_TABLE,
            side_row(
                1,
                100,
                "url",
                json!({
                    "linkedUrl": "https://example.com",
                    "payload": "{\"customText\":\"Go\",\"target\":\"_blank\"}"
                }),
            ),
        )
        .with_row(
            TYPED_LINK_TABLE,
            side_row(2, 101, "entry", json!({"linkedId": 55, "linkedSiteId": 1})),
        )
        .with_row(
            TYPED_LINK_TABLE,
            side_row(3, 999, "url", json!({"linkedUrl": "https://orphan.example"})),
        )
        .with_row(
            TYPED_LINK_TABLE,
            json!({"id": 4, "fieldId": 77, "elementId": 100, "siteId": 1, "type": "url"}),
        )
        .with_row(BLOCKS_TABLE, json!({"id": 500, "elementId": 100, "siteId": 1}))
        .with_row(BLOCKS_TABLE, json!({"id": 501, "elementId": 101, "siteId": 1}))
        .with_row(BLOCKS_TABLE, json!({"id": 502, "elementId": 102, "siteId": 1}))
}

fn cta_column(store: &InMemoryStore) -> String {
    let suffix = store
        .persisted_field(21)
        .and_then(|field| field.column_suffix)
        .expect("migrated field has a column suffix");
    format!("field_links_cta_{}", suffix)
}

#[test]
fn test_typed_link_nested_settings_integration() {
    let store = matrix_store();
    let untouched_block_type = container().block_types[1].clone();
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    let field = report.field("cta").unwrap();
    assert_eq!(field.settings, SettingsOutcome::Migrated);
    assert_eq!(field.link_types, 4);
    assert!(field.skipped_types.is_empty());

    let migrated = store.persisted_field(21).unwrap();
    assert_eq!(migrated.field_type, LINK_FIELD_TYPE);
    assert_eq!(migrated.context, "matrixBlockType:bt-links");

    let suffix = migrated.column_suffix.clone().unwrap();
    assert_eq!(suffix.len(), 8);
    assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

    let settings = &migrated.settings;
    assert_eq!(settings["newWindow"], json!(false));
    assert_eq!(settings["defaultLinkType"], json!("default-entry"));

    let link_types = settings["linkTypes"].as_array().unwrap();
    let handles: Vec<&str> = link_types
        .iter()
        .map(|t| t["handle"].as_str().unwrap())
        .collect();
    assert_eq!(handles, vec!["default-url", "default-entry", "default-site", "default-phone"]);
    assert!(link_types.iter().all(|t| t["linkText"] == json!("Read more")));
    assert_eq!(link_types[1]["sources"], json!("*"));
    assert_eq!(link_types[2]["sites"], json!(["site-uid-1", "site-uid-2", 99]));
    assert_eq!(link_types[3]["enabled"], json!(false));

    // Title and aria label are on by default.
    let advanced = &link_types[0]["layoutConfig"]["tabs"][1]["elements"];
    assert_eq!(advanced.as_array().unwrap().len(), 4);

    // Only the block type embedding the field changed.
    let saved_container = store.persisted_field(20).unwrap();
    assert_eq!(saved_container.block_types[1], untouched_block_type);
    match &saved_container.block_types[0].layout.tabs[0].elements[0] {
        LayoutElement::Field { field } => {
            assert_eq!(field.id, 21);
            assert_eq!(field.field_type, LINK_FIELD_TYPE);
        }
        other => panic!("expected a field element, got {:?}", other),
    }
    assert_eq!(store.persisted_field(22).unwrap(), heading());
}

#[test]
fn test_typed_link_side_table_content_integration() {
    let store = matrix_store();
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    let column = cta_column(&store);
    assert_eq!(
        report.field("cta").unwrap().location,
        Some(format!("{}.{}", BLOCKS_TABLE, column))
    );

    assert_eq!(
        store.decoded_value(BLOCKS_TABLE, 500, &column).unwrap(),
        json!([{
            "type": "url",
            "handle": "default-url",
            "linkValue": "https://example.com",
            "linkText": "Go",
            "newWindow": true
        }])
    );
    assert_eq!(
        store.decoded_value(BLOCKS_TABLE, 501, &column).unwrap(),
        json!([{
            "type": "entry",
            "handle": "default-entry",
            "linkValue": 55,
            "linkSiteId": 1,
            "newWindow": false
        }])
    );
    assert_eq!(store.value(BLOCKS_TABLE, 502, &column), None);

    let tally = report.field("cta").unwrap().content;
    assert_eq!(tally.migrated, 2);
    assert_eq!(tally.missing_rows, 1);
    assert_eq!(tally.failed, 0);
}

#[test]
fn test_typed_link_missing_content_row_logged_integration() {
    let store = matrix_store();
    let log = RecordingLog::new();

    LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    assert_eq!(
        log.errors(),
        vec!["    > Unable to find “cta:links” Matrix content row for element #999 and site #1"
            .to_string()]
    );
    assert!(log.contains("    > Migrated “cta:links” Matrix content #500 for element #100"));
}

#[test]
fn test_typed_link_content_uses_refreshed_definition_integration() {
    let store = matrix_store();
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    // The suffixed column only exists in the saved definition, so content
    // landing there means the registry was refreshed in between.
    assert_eq!(store.refresh_count(), 2);
    assert!(store.value(BLOCKS_TABLE, 500, &cta_column(&store)).is_some());
    assert!(store.value(BLOCKS_TABLE, 500, "field_links_cta").is_none());

    // No re-save by default: the only save is the container.
    assert_eq!(store.save_count(), 1);
    assert!(!report.field("cta").unwrap().resaved);
}

#[test]
fn test_typed_link_global_field_integration() {
    let store = InMemoryStore::new()
        .with_field(typed_link_field(5, "button", "global"))
        .with_row(
            TYPED_LINK_TABLE,
            json!({
                "id": 1,
                "fieldId": 5,
                "elementId": 7,
                "siteId": 1,
                "type": "email",
                "linkedUrl": "hello@example.com",
                "payload": {"title": "Mail us", "ariaLabel": "Email"}
            }),
        )
        .with_row("content", json!({"id": 70, "elementId": 7, "siteId": 1}));
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    assert!(report.field("button").unwrap().settings.is_migrated());
    let column = format!(
        "field_button_{}",
        store.persisted_field(5).unwrap().column_suffix.unwrap()
    );
    assert_eq!(
        store.decoded_value("content", 70, &column).unwrap(),
        json!([{
            "type": "email",
            "handle": "default-email",
            "linkValue": "hello@example.com",
            "linkTitle": "Mail us",
            "ariaLabel": "Email",
            "newWindow": false
        }])
    );
}

#[test]
fn test_typed_link_owner_missing_integration() {
    let store = InMemoryStore::new()
        .with_field(typed_link_field(30, "orphan", "superTableBlockType:nope"))
        .with_field(typed_link_field(31, "stray", "matrixBlockType:gone"))
        .with_block_type(ContainerKind::Matrix, "gone", 77, Some("gone"));
    let log = RecordingLog::new();

    let report = LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    match &report.field("orphan").unwrap().settings {
        SettingsOutcome::OwnerMissing { reason } => assert_eq!(
            reason,
            "Unable to find owner Super Table field for context “superTableBlockType:nope”."
        ),
        other => panic!("expected missing owner, got {:?}", other),
    }
    match &report.field("stray").unwrap().settings {
        SettingsOutcome::OwnerMissing { reason } => {
            assert_eq!(reason, "Unable to find owner Matrix field for ID “77”.")
        }
        other => panic!("expected missing owner, got {:?}", other),
    }

    assert_eq!(store.persisted_field(30).unwrap().field_type, TYPED_LINK_FIELD_TYPE);
    assert_eq!(store.persisted_field(31).unwrap().field_type, TYPED_LINK_FIELD_TYPE);
    assert_eq!(store.save_count(), 0);
    assert_eq!(log.errors().len(), 2);
}

#[test]
fn test_typed_link_rejected_save_aborts_integration() {
    let mut errors = FieldErrors::default();
    errors.add("handle", "Handle “button” is already in use.");

    let store = InMemoryStore::new()
        .with_field(typed_link_field(5, "button", "global"))
        .with_field(typed_link_field(6, "later", "global"))
        .rejecting_saves_for("button", errors);
    let log = RecordingLog::new();

    let err = LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap_err();

    assert!(err.is_field_rejection());
    assert!(err.to_string().contains("already in use"));

    // The run stopped before the next field or any refresh.
    assert_eq!(store.persisted_field(6).unwrap().field_type, TYPED_LINK_FIELD_TYPE);
    assert_eq!(store.refresh_count(), 0);
    assert!(!log.contains("Finished Migration"));
}

#[test]
fn test_typed_link_enable_all_link_types_integration() {
    let mut settings = typed_link_settings();
    settings["enableAllLinkTypes"] = json!(true);
    let store = InMemoryStore::new().with_field(field(
        5,
        "button",
        TYPED_LINK_FIELD_TYPE,
        settings,
    ));
    let log = RecordingLog::new();

    LinkFieldMigration::new(MigrationContext::new(&store, &log), &TYPED_LINK)
        .run()
        .unwrap();

    let persisted = store.persisted_field(5).unwrap();
    let link_types = persisted.settings["linkTypes"].as_array().unwrap();
    assert!(link_types.iter().all(|t| t["enabled"] == json!(true)));
}
