//! Field rows, block types and field layouts.

use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use relink_core::defaults::{
    CONTENT_TABLE, CUSTOM_FIELD_ELEMENT, FIELDS_TABLE, FIELD_LAYOUT_TABS_TABLE, LINK_FIELD_TYPE,
    MATRIX_BLOCK_TYPES_TABLE, MATRIX_FIELD_TYPE, SUPER_TABLE_BLOCK_TYPES_TABLE,
    SUPER_TABLE_FIELD_TYPE,
};
use relink_core::migration::locator::{bare_table_name, field_column};
use relink_core::{
    BlockType, BlockTypeOwner, ContainerKind, Error, Field, FieldErrors, FieldId, FieldLayout,
    LayoutElement, LayoutTab, LegacyFieldRecord, Result,
};

use crate::identifiers::{quote_identifier, TableNames};

const FIELD_COLUMNS: &str = r#"id::bigint AS id, uid::text AS uid, name, handle, context,
    "columnSuffix", type, settings"#;

/// Container kind of a field type, if the type is a block container.
pub fn container_kind(field_type: &str) -> Option<ContainerKind> {
    match field_type {
        MATRIX_FIELD_TYPE => Some(ContainerKind::Matrix),
        SUPER_TABLE_FIELD_TYPE => Some(ContainerKind::SuperTable),
        _ => None,
    }
}

/// Decode a stored settings blob, keeping undecodable text as a string.
pub fn decode_settings(raw: Option<String>) -> JsonValue {
    match raw {
        None => JsonValue::Null,
        Some(raw) => serde_json::from_str(&raw).unwrap_or(JsonValue::String(raw)),
    }
}

/// Settings as stored in the `settings` text column.
pub fn encode_settings(settings: &JsonValue) -> String {
    match settings {
        JsonValue::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

fn field_from_row(row: &PgRow) -> Field {
    Field {
        id: row.get("id"),
        uid: row.get("uid"),
        name: row.get("name"),
        handle: row.get("handle"),
        context: row.get("context"),
        column_prefix: None,
        column_suffix: row.get("columnSuffix"),
        field_type: row.get("type"),
        settings: decode_settings(row.get("settings")),
        content_table: None,
        block_types: Vec::new(),
    }
}

/// Legacy field rows of one type, ordered by id.
pub async fn fields_of_type(
    pool: &PgPool,
    tables: &TableNames,
    field_type: &str,
) -> Result<Vec<LegacyFieldRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE type = $1 ORDER BY id",
        FIELD_COLUMNS,
        tables.table(FIELDS_TABLE)?
    );

    let rows = sqlx::query(&sql)
        .bind(field_type)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    Ok(rows
        .into_iter()
        .map(|row| LegacyFieldRecord {
            id: row.get("id"),
            uid: row.get("uid"),
            name: row.get("name"),
            handle: row.get("handle"),
            context: row.get("context"),
            column_suffix: row.get("columnSuffix"),
            field_type: row.get("type"),
            settings: row
                .get::<Option<String>, _>("settings")
                .unwrap_or_default(),
        })
        .collect())
}

async fn plain_field_by_uid(pool: &PgPool, tables: &TableNames, uid: &str) -> Result<Option<Field>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE uid = $1",
        FIELD_COLUMNS,
        tables.table(FIELDS_TABLE)?
    );

    let row = sqlx::query(&sql)
        .bind(uid)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?;

    Ok(row.as_ref().map(field_from_row))
}

/// Handle of the field with `uid`.
pub async fn handle_by_uid(pool: &PgPool, tables: &TableNames, uid: &str) -> Result<Option<String>> {
    Ok(plain_field_by_uid(pool, tables, uid)
        .await?
        .map(|field| field.handle))
}

/// Global fields of `field_type` whose settings mention `needle`.
pub async fn global_fields_mentioning(
    pool: &PgPool,
    tables: &TableNames,
    field_type: &str,
    needle: &str,
) -> Result<Vec<Field>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE type = $1 AND context = 'global' AND settings LIKE $2 ESCAPE '\\' ORDER BY id",
        FIELD_COLUMNS,
        tables.table(FIELDS_TABLE)?
    );

    let rows = sqlx::query(&sql)
        .bind(field_type)
        .bind(format!("%{}%", escape_like(needle)))
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    Ok(rows.iter().map(field_from_row).collect())
}

/// Full registry view of a field, including block types of containers.
pub async fn load_field(pool: &PgPool, tables: &TableNames, id: FieldId) -> Result<Option<Field>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        FIELD_COLUMNS,
        tables.table(FIELDS_TABLE)?
    );

    let Some(row) = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?
    else {
        return Ok(None);
    };

    let mut field = field_from_row(&row);

    if let Some(kind) = container_kind(&field.field_type) {
        field.content_table = field
            .settings
            .get("contentTable")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        field.block_types = load_block_types(pool, tables, kind, field.id).await?;

        debug!(
            subsystem = "database",
            component = "fields",
            field_id = field.id,
            block_types = field.block_types.len(),
            "Loaded container field"
        );
    }

    Ok(Some(field))
}

async fn load_block_types(
    pool: &PgPool,
    tables: &TableNames,
    kind: ContainerKind,
    field_id: FieldId,
) -> Result<Vec<BlockType>> {
    let sql = match kind {
        ContainerKind::Matrix => format!(
            r#"SELECT id::bigint AS id, uid::text AS uid, handle, "fieldLayoutId"::bigint AS layout_id
               FROM {} WHERE "fieldId" = $1 ORDER BY "sortOrder", id"#,
            tables.table(MATRIX_BLOCK_TYPES_TABLE)?
        ),
        ContainerKind::SuperTable => format!(
            r#"SELECT id::bigint AS id, uid::text AS uid, NULL::text AS handle, "fieldLayoutId"::bigint AS layout_id
               FROM {} WHERE "fieldId" = $1 ORDER BY id"#,
            tables.table(SUPER_TABLE_BLOCK_TYPES_TABLE)?
        ),
    };

    let rows = sqlx::query(&sql)
        .bind(field_id)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    let mut block_types = Vec::with_capacity(rows.len());
    for row in rows {
        let layout = match row.get::<Option<i64>, _>("layout_id") {
            Some(layout_id) => load_layout(pool, tables, layout_id).await?,
            None => FieldLayout::default(),
        };

        block_types.push(BlockType {
            id: row.get("id"),
            uid: row.get("uid"),
            handle: row.get("handle"),
            layout,
        });
    }

    Ok(block_types)
}

async fn load_layout(pool: &PgPool, tables: &TableNames, layout_id: i64) -> Result<FieldLayout> {
    let sql = format!(
        r#"SELECT name, elements FROM {} WHERE "layoutId" = $1 ORDER BY "sortOrder", id"#,
        tables.table(FIELD_LAYOUT_TABS_TABLE)?
    );

    let rows = sqlx::query(&sql)
        .bind(layout_id)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    let mut tabs = Vec::with_capacity(rows.len());
    for row in rows {
        let raw = decode_settings(row.get("elements"));
        let mut elements = Vec::new();

        for element in raw.as_array().into_iter().flatten() {
            elements.push(match custom_field_uid(element) {
                Some(uid) => match plain_field_by_uid(pool, tables, uid).await? {
                    Some(field) => LayoutElement::Field { field },
                    None => native_element(element),
                },
                None => native_element(element),
            });
        }

        tabs.push(LayoutTab {
            name: row.get("name"),
            elements,
        });
    }

    Ok(FieldLayout { tabs })
}

/// Field UID of a custom-field layout element.
pub fn custom_field_uid(element: &JsonValue) -> Option<&str> {
    if element.get("type").and_then(JsonValue::as_str) != Some(CUSTOM_FIELD_ELEMENT) {
        return None;
    }
    element.get("fieldUid").and_then(JsonValue::as_str)
}

/// A stored layout element as a native element.
pub fn native_element(element: &JsonValue) -> LayoutElement {
    LayoutElement::Native {
        element_type: element
            .get("type")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        width: element
            .get("width")
            .and_then(JsonValue::as_u64)
            .and_then(|w| u8::try_from(w).ok()),
    }
}

/// Owning container of a block type.
pub async fn block_type_owner(
    pool: &PgPool,
    tables: &TableNames,
    kind: ContainerKind,
    block_type_uid: &str,
) -> Result<Option<BlockTypeOwner>> {
    let sql = match kind {
        ContainerKind::Matrix => format!(
            r#"SELECT "fieldId"::bigint AS field_id, handle FROM {} WHERE uid = $1"#,
            tables.table(MATRIX_BLOCK_TYPES_TABLE)?
        ),
        ContainerKind::SuperTable => format!(
            r#"SELECT "fieldId"::bigint AS field_id, NULL::text AS handle FROM {} WHERE uid = $1"#,
            tables.table(SUPER_TABLE_BLOCK_TYPES_TABLE)?
        ),
    };

    let row = sqlx::query(&sql)
        .bind(block_type_uid)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?;

    Ok(row.map(|row| BlockTypeOwner {
        field_id: row.get("field_id"),
        handle: row.get("handle"),
    }))
}

/// Overwrite type and settings of a field row.
pub async fn rewrite_field_row(
    pool: &PgPool,
    tables: &TableNames,
    id: FieldId,
    field_type: &str,
    settings: &JsonValue,
) -> Result<()> {
    let sql = format!(
        r#"UPDATE {} SET type = $1, settings = $2, "dateUpdated" = now() WHERE id = $3"#,
        tables.table(FIELDS_TABLE)?
    );

    let result = sqlx::query(&sql)
        .bind(field_type)
        .bind(encode_settings(settings))
        .bind(id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("field #{}", id)));
    }
    Ok(())
}

/// Content column each link field touched by a save must have.
///
/// Containers contribute the columns of their nested link fields.
pub fn required_columns(field: &Field) -> Vec<(String, String)> {
    let mut columns = Vec::new();

    if field.field_type == LINK_FIELD_TYPE && field.storage_context().is_global() {
        columns.push((
            CONTENT_TABLE.to_string(),
            field_column(field.column_prefix(), &field.handle, field.column_suffix.as_deref()),
        ));
    }

    let (Some(kind), Some(table)) = (container_kind(&field.field_type), field.content_table.as_deref())
    else {
        return columns;
    };

    for (block_type, nested) in field.nested_fields() {
        if nested.field_type != LINK_FIELD_TYPE {
            continue;
        }
        let handle = match (kind.prefixes_block_handle(), block_type.handle.as_deref()) {
            (true, Some(block)) => format!("{}_{}", block, nested.handle),
            _ => nested.handle.clone(),
        };
        columns.push((
            bare_table_name(table).to_string(),
            field_column(nested.column_prefix(), &handle, nested.column_suffix.as_deref()),
        ));
    }

    columns
}

/// Persist a field and every field nested in it, in one transaction.
pub async fn save_field(pool: &PgPool, tables: &TableNames, field: &Field) -> Result<()> {
    let mut tx = pool.begin().await.map_err(Error::Database)?;

    update_field(&mut tx, tables, field).await?;
    for (_, nested) in field.nested_fields() {
        update_field(&mut tx, tables, nested).await?;
    }

    for (table, column) in required_columns(field) {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} text",
            tables.table(&table)?,
            quote_identifier(&column)?
        );
        sqlx::query(&sql)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "fields",
            db_table = %table,
            db_column = %column,
            "Ensured content column"
        );
    }

    tx.commit().await.map_err(Error::Database)?;
    Ok(())
}

async fn update_field(
    tx: &mut Transaction<'_, Postgres>,
    tables: &TableNames,
    field: &Field,
) -> Result<()> {
    let sql = format!(
        r#"UPDATE {} SET type = $1, settings = $2, "columnSuffix" = $3, "dateUpdated" = now()
           WHERE id = $4"#,
        tables.table(FIELDS_TABLE)?
    );

    sqlx::query(&sql)
        .bind(&field.field_type)
        .bind(encode_settings(&field.settings))
        .bind(&field.column_suffix)
        .bind(field.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| rejection(&field.handle, e))?;

    Ok(())
}

/// Constraint violations mean the definition itself is unacceptable.
fn rejection(handle: &str, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_check_violation() {
            let mut errors = FieldErrors::default();
            errors.add("handle", db.message());
            return Error::FieldRejected {
                handle: handle.to_string(),
                errors,
            };
        }
    }
    Error::Database(err)
}

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(id: FieldId, handle: &str, field_type: &str, context: &str) -> Field {
        Field {
            id,
            uid: format!("f-{id}"),
            name: handle.to_string(),
            handle: handle.to_string(),
            context: context.to_string(),
            column_prefix: None,
            column_suffix: Some("ab12cd34".to_string()),
            field_type: field_type.to_string(),
            settings: json!({}),
            content_table: None,
            block_types: Vec::new(),
        }
    }

    #[test]
    fn test_container_kind() {
        assert_eq!(container_kind(MATRIX_FIELD_TYPE), Some(ContainerKind::Matrix));
        assert_eq!(container_kind(SUPER_TABLE_FIELD_TYPE), Some(ContainerKind::SuperTable));
        assert_eq!(container_kind(LINK_FIELD_TYPE), None);
    }

    #[test]
    fn test_settings_round_trip() {
        assert_eq!(decode_settings(Some("{\"a\":1}".to_string())), json!({"a": 1}));
        assert_eq!(decode_settings(Some("{oops".to_string())), json!("{oops"));
        assert_eq!(decode_settings(None), JsonValue::Null);

        assert_eq!(encode_settings(&json!({"a": 1})), "{\"a\":1}");
        assert_eq!(encode_settings(&json!("{oops")), "{oops");
    }

    #[test]
    fn test_layout_elements() {
        let custom = json!({"type": CUSTOM_FIELD_ELEMENT, "fieldUid": "f-21", "width": 100});
        assert_eq!(custom_field_uid(&custom), Some("f-21"));

        let native = json!({"type": "craft\\fieldlayoutelements\\Tip", "width": 50});
        assert_eq!(custom_field_uid(&native), None);
        assert_eq!(
            native_element(&native),
            LayoutElement::Native {
                element_type: "craft\\fieldlayoutelements\\Tip".to_string(),
                width: Some(50),
            }
        );
    }

    #[test]
    fn test_required_columns_global() {
        let link = field(5, "button", LINK_FIELD_TYPE, "global");
        assert_eq!(
            required_columns(&link),
            vec![("content".to_string(), "field_button_ab12cd34".to_string())]
        );

        let legacy = field(6, "old", "legacy", "global");
        assert!(required_columns(&legacy).is_empty());
    }

    #[test]
    fn test_required_columns_matrix() {
        let cta = field(21, "cta", LINK_FIELD_TYPE, "matrixBlockType:bt-links");
        let heading = field(22, "heading", "craft\\fields\\PlainText", "matrixBlockType:bt-links");

        let mut container = field(20, "blocks", MATRIX_FIELD_TYPE, "global");
        container.content_table = Some("{{%matrixcontent_blocks}}".to_string());
        container.block_types = vec![BlockType {
            id: 1,
            uid: "bt-links".to_string(),
            handle: Some("links".to_string()),
            layout: FieldLayout {
                tabs: vec![LayoutTab {
                    name: "Content".to_string(),
                    elements: vec![
                        LayoutElement::Field { field: cta },
                        LayoutElement::Field { field: heading },
                    ],
                }],
            },
        }];

        assert_eq!(
            required_columns(&container),
            vec![(
                "matrixcontent_blocks".to_string(),
                "field_links_cta_ab12cd34".to_string()
            )]
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("f_1%"), "f\\_1\\%");
        assert_eq!(escape_like("6f1c-22"), "6f1c-22");
    }
}
