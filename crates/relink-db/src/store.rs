//! `PgStore`: every collaborator trait over one PostgreSQL pool.
//!
//! The engine is synchronous. `PgStore` owns a current-thread tokio runtime
//! and blocks on each query, so it must not be used from inside another
//! async runtime.

use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use relink_core::defaults::{CONTENT_TABLE, FIELD_COLUMN_PREFIX, RICH_CONTENT_FIELD_TYPE};
use relink_core::migration::locator::field_column;
use relink_core::{
    BlockTypeOwner, ContainerKind, ContentRow, DocumentMutation, Field, FieldId, FieldRegistry,
    LegacyFieldRecord, PluginRegistry, Result, RichContent, SiteDirectory, TableAccess,
};

use crate::identifiers::TableNames;
use crate::pool::{connect_pool, log_pool_metrics, PoolConfig};
use crate::{content, fields};

pub struct PgStore {
    runtime: Runtime,
    pool: PgPool,
    tables: TableNames,
    cache: RefCell<HashMap<FieldId, Field>>,
}

impl PgStore {
    /// Connect to `database_url`. `table_prefix` is prepended to every table name.
    pub fn connect(database_url: &str, table_prefix: &str, config: PoolConfig) -> Result<Self> {
        let tables = TableNames::new(table_prefix)?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let pool = runtime.block_on(connect_pool(database_url, &config))?;

        info!(
            subsystem = "database",
            component = "store",
            table_prefix = tables.prefix(),
            "Connected migration store"
        );

        Ok(Self {
            runtime,
            pool,
            tables,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Close the pool. Pending queries finish first.
    pub fn close(self) {
        log_pool_metrics(&self.pool);
        self.runtime.block_on(self.pool.close());
    }
}

impl FieldRegistry for PgStore {
    fn field_by_id(&self, id: FieldId) -> Result<Option<Field>> {
        if let Some(field) = self.cache.borrow().get(&id) {
            return Ok(Some(field.clone()));
        }

        let field = self.block_on(fields::load_field(&self.pool, &self.tables, id))?;
        if let Some(field) = &field {
            self.cache.borrow_mut().insert(id, field.clone());
        }
        Ok(field)
    }

    fn save_field(&self, field: &Field) -> Result<()> {
        self.block_on(fields::save_field(&self.pool, &self.tables, field))?;

        let mut cache = self.cache.borrow_mut();
        cache.insert(field.id, field.clone());
        for (_, nested) in field.nested_fields() {
            cache.insert(nested.id, nested.clone());
        }

        debug!(
            subsystem = "database",
            component = "store",
            field_id = field.id,
            field_handle = %field.handle,
            "Field saved"
        );
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        let dropped = self.cache.borrow().len();
        self.cache.borrow_mut().clear();
        debug!(
            subsystem = "database",
            component = "store",
            dropped,
            "Field cache cleared"
        );
        Ok(())
    }
}

impl TableAccess for PgStore {
    fn fields_of_type(&self, field_type: &str) -> Result<Vec<LegacyFieldRecord>> {
        self.block_on(fields::fields_of_type(&self.pool, &self.tables, field_type))
    }

    fn rewrite_field_row(&self, id: FieldId, field_type: &str, settings: &JsonValue) -> Result<()> {
        self.block_on(fields::rewrite_field_row(
            &self.pool,
            &self.tables,
            id,
            field_type,
            settings,
        ))
    }

    fn block_type_owner(
        &self,
        kind: ContainerKind,
        block_type_uid: &str,
    ) -> Result<Option<BlockTypeOwner>> {
        self.block_on(fields::block_type_owner(
            &self.pool,
            &self.tables,
            kind,
            block_type_uid,
        ))
    }

    fn populated_rows(&self, table: &str, column: &str) -> Result<Vec<ContentRow>> {
        self.block_on(content::populated_rows(&self.pool, &self.tables, table, column))
    }

    fn rows_for_field(&self, table: &str, field_id: FieldId) -> Result<Vec<JsonValue>> {
        self.block_on(content::rows_for_field(&self.pool, &self.tables, table, field_id))
    }

    fn row_for_element(
        &self,
        table: &str,
        element_id: i64,
        site_id: i64,
    ) -> Result<Option<ContentRow>> {
        self.block_on(content::row_for_element(
            &self.pool,
            &self.tables,
            table,
            element_id,
            site_id,
        ))
    }

    fn write_value(&self, table: &str, column: &str, row_id: i64, value: &str) -> Result<()> {
        self.block_on(content::write_value(
            &self.pool,
            &self.tables,
            table,
            column,
            row_id,
            value,
        ))
    }
}

impl SiteDirectory for PgStore {
    fn site_uid(&self, site_id: i64) -> Result<Option<String>> {
        self.block_on(content::site_uid(&self.pool, &self.tables, site_id))
    }
}

impl PluginRegistry for PgStore {
    fn is_installed_and_enabled(&self, handle: &str) -> Result<bool> {
        self.block_on(content::plugin_enabled(&self.pool, &self.tables, handle))
    }
}

impl RichContent for PgStore {
    /// Documents are the values of global rich-content fields whose
    /// settings embed the field.
    fn modify_content(&self, field_uid: &str, mutate: &mut DocumentMutation<'_>) -> Result<usize> {
        let Some(handle) = self.block_on(fields::handle_by_uid(&self.pool, &self.tables, field_uid))?
        else {
            return Ok(0);
        };

        let hosts = self.block_on(fields::global_fields_mentioning(
            &self.pool,
            &self.tables,
            RICH_CONTENT_FIELD_TYPE,
            field_uid,
        ))?;

        let mut saved = 0;
        for host in hosts {
            let column = field_column(FIELD_COLUMN_PREFIX, &host.handle, host.column_suffix.as_deref());
            let rows = self.populated_rows(CONTENT_TABLE, &column)?;

            for row in rows {
                let Some(raw) = row.raw_value.as_deref() else {
                    continue;
                };
                let document: JsonValue = match serde_json::from_str(raw) {
                    Ok(document) => document,
                    Err(e) => {
                        warn!(
                            subsystem = "database",
                            component = "rich_content",
                            row_id = row.id,
                            db_column = %column,
                            error = %e,
                            "Rich content document is not valid JSON, skipped"
                        );
                        continue;
                    }
                };

                let updated = mutate(&handle, document.clone());
                if updated != document {
                    self.write_value(CONTENT_TABLE, &column, row.id, &serde_json::to_string(&updated)?)?;
                    saved += 1;
                }
            }

            debug!(
                subsystem = "database",
                component = "rich_content",
                host_field = %host.handle,
                saved,
                "Scanned rich content field"
            );
        }

        Ok(saved)
    }
}
