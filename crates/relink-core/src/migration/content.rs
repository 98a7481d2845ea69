//! Rewrites stored values of migrated fields.

use serde_json::Value as JsonValue;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::migration::convert::{Conversion, RecordConverter};
use crate::migration::locator::{ContentLocation, ContentLocator, Resolution};
use crate::migration::patch::{DeepContentPatcher, RichContentTally};
use crate::migration::read;
use crate::migration::report::ContentTally;
use crate::migration::rules::{ContentSource, LegacyPlugin};
use crate::models::{Field, LegacyFieldRecord};
use crate::traits::{LogTone, MigrationContext};

/// Content migration result of one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResult {
    pub location: Option<ContentLocation>,
    pub tally: ContentTally,
    pub rich_content: Option<RichContentTally>,
}

pub struct ContentMigrator<'a> {
    ctx: MigrationContext<'a>,
    plugin: &'a LegacyPlugin,
    converter: &'a RecordConverter<'a>,
    rich_content_plugin: &'a str,
}

impl<'a> ContentMigrator<'a> {
    pub fn new(
        ctx: MigrationContext<'a>,
        plugin: &'a LegacyPlugin,
        converter: &'a RecordConverter<'a>,
        rich_content_plugin: &'a str,
    ) -> Self {
        Self {
            ctx,
            plugin,
            converter,
            rich_content_plugin,
        }
    }

    /// Convert every stored value of one migrated field.
    ///
    /// Per-row problems are logged and counted; only collaborator failures
    /// are returned as errors.
    pub fn migrate(&self, record: &LegacyFieldRecord) -> Result<ContentResult> {
        let start = Instant::now();
        let log = self.ctx.log;
        let mut result = ContentResult::default();

        log.write(
            &format!(
                "Preparing to migrate field “{}” ({}) content.",
                record.handle, record.uid
            ),
            LogTone::Plain,
        );

        match self.ctx.fields.field_by_id(record.id)? {
            Some(field) => match ContentLocator::new(self.ctx.fields, self.ctx.tables).resolve(&field)? {
                Resolution::Found(location) => {
                    result.tally = self.migrate_rows(&field, &location)?;
                    result.location = Some(location);
                }
                Resolution::Unlocatable(reason) => {
                    warn!(
                        subsystem = "migration",
                        component = "content",
                        field_id = record.id,
                        reason = %reason,
                        "Field content cannot be located"
                    );
                    log.write(&format!("    > {}", reason), LogTone::Error);
                }
            },
            None => {
                warn!(
                    subsystem = "migration",
                    component = "content",
                    field_id = record.id,
                    "Field missing from registry after settings migration"
                );
                log.write(
                    &format!("    > Unable to find field #{}.", record.id),
                    LogTone::Error,
                );
            }
        }

        if self
            .ctx
            .plugins
            .is_installed_and_enabled(self.rich_content_plugin)?
        {
            let patcher = DeepContentPatcher::new(self.converter);
            result.rich_content =
                Some(patcher.patch_field(self.ctx.rich_content, &record.uid, log)?);
        }

        info!(
            subsystem = "migration",
            component = "content",
            field_id = record.id,
            field_handle = %record.handle,
            migrated = result.tally.migrated,
            failed = result.tally.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Field content migrated"
        );
        log.write(
            &format!("    > Field “{}” content migrated.", record.handle),
            LogTone::Success,
        );

        Ok(result)
    }

    fn migrate_rows(&self, field: &Field, location: &ContentLocation) -> Result<ContentTally> {
        let mut tally = ContentTally::default();
        let label = location.describe(&field.handle);

        match self.plugin.content {
            ContentSource::FieldColumn => {
                let rows = self
                    .ctx
                    .tables
                    .populated_rows(&location.table, &location.column)?;

                debug!(
                    subsystem = "migration",
                    component = "content",
                    field_id = field.id,
                    db_table = %location.table,
                    db_column = %location.column,
                    row_count = rows.len(),
                    "Loaded populated content rows"
                );

                for row in rows {
                    let conversion = self.converter.convert_raw(row.raw_value.as_deref());
                    self.apply(&mut tally, location, &label, row.id, row.element_id, conversion)?;
                }
            }
            ContentSource::SideTable { table } => {
                let rows = self.ctx.tables.rows_for_field(table, field.id)?;

                debug!(
                    subsystem = "migration",
                    component = "content",
                    field_id = field.id,
                    db_table = table,
                    row_count = rows.len(),
                    "Loaded side table rows"
                );

                for row in rows {
                    self.migrate_side_row(&mut tally, location, &label, &row)?;
                }
            }
        }

        Ok(tally)
    }

    fn migrate_side_row(
        &self,
        tally: &mut ContentTally,
        location: &ContentLocation,
        label: &str,
        row: &JsonValue,
    ) -> Result<()> {
        let element_id = read::id(row.get("elementId"));
        let site_id = read::id(row.get("siteId"));

        let target = match (element_id, site_id) {
            (Some(element_id), Some(site_id)) => {
                self.ctx
                    .tables
                    .row_for_element(&location.table, element_id, site_id)?
            }
            _ => None,
        };

        let Some(target) = target else {
            tally.missing_rows += 1;
            let element = element_id.map_or_else(|| "?".to_string(), |id| id.to_string());
            let site = site_id.map_or_else(|| "?".to_string(), |id| id.to_string());
            warn!(
                subsystem = "migration",
                component = "content",
                db_table = %location.table,
                element = %element,
                site = %site,
                "No content row for side table value"
            );
            self.ctx.log.write(
                &format!(
                    "    > Unable to find {}content row for element #{} and site #{}",
                    label, element, site
                ),
                LogTone::Error,
            );
            return Ok(());
        };

        let conversion = self.converter.convert(row);
        self.apply(tally, location, label, target.id, target.element_id, conversion)
    }

    fn apply(
        &self,
        tally: &mut ContentTally,
        location: &ContentLocation,
        label: &str,
        row_id: i64,
        element_id: i64,
        conversion: Conversion,
    ) -> Result<()> {
        match conversion {
            Conversion::Empty => {
                tally.empty += 1;
                trace!(
                    subsystem = "migration",
                    component = "content",
                    row_id,
                    element_id,
                    "Empty value left alone"
                );
            }
            Conversion::Failed(reason) => {
                tally.failed += 1;
                warn!(
                    subsystem = "migration",
                    component = "content",
                    row_id,
                    element_id,
                    reason = %reason,
                    "Value not converted"
                );
                self.ctx.log.write(
                    &format!(
                        "    > Unable to convert {}content #{} for element #{}",
                        label, row_id, element_id
                    ),
                    LogTone::Error,
                );
            }
            converted @ Conversion::Converted(_) => {
                let Some(stored) = converted.stored_value()? else {
                    return Ok(());
                };
                self.ctx.tables.write_value(
                    &location.table,
                    &location.column,
                    row_id,
                    &serde_json::to_string(&stored)?,
                )?;
                tally.migrated += 1;
                trace!(
                    subsystem = "migration",
                    component = "content",
                    row_id,
                    element_id,
                    "Value migrated"
                );
                self.ctx.log.write(
                    &format!(
                        "    > Migrated {}content #{} for element #{}",
                        label, row_id, element_id
                    ),
                    LogTone::Success,
                );
            }
        }

        Ok(())
    }
}
