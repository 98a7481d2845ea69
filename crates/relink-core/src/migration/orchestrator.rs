//! Migration run driver.

use chrono::Utc;
use std::time::Instant;
use tracing::{info, warn};

use crate::defaults::RICH_CONTENT_PLUGIN;
use crate::error::Result;
use crate::migration::content::ContentMigrator;
use crate::migration::convert::RecordConverter;
use crate::migration::report::{FieldReport, MigrationReport};
use crate::migration::rules::LegacyPlugin;
use crate::migration::settings::SettingsMigrator;
use crate::migration::type_map::{TypeMapper, TypeOverride};
use crate::models::LegacyFieldRecord;
use crate::traits::{LogTone, MigrationContext};

/// Run options that are not part of a plugin's rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Force the re-save step on or off. `None` uses the plugin default.
    pub resave_fields: Option<bool>,
    /// Handle of the rich-content plugin to patch documents of.
    pub rich_content_plugin: String,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            resave_fields: None,
            rich_content_plugin: RICH_CONTENT_PLUGIN.to_string(),
        }
    }
}

/// Migrates every field of one legacy plugin to the link field type.
///
/// Phases run strictly in order: load, settings, refresh, content, refresh,
/// optional re-save. A registry refusal in any save aborts the run.
pub struct LinkFieldMigration<'a> {
    ctx: MigrationContext<'a>,
    plugin: &'static LegacyPlugin,
    mapper: TypeMapper,
    options: MigrationOptions,
}

impl<'a> LinkFieldMigration<'a> {
    pub fn new(ctx: MigrationContext<'a>, plugin: &'static LegacyPlugin) -> Self {
        Self {
            ctx,
            plugin,
            mapper: plugin.type_mapper(),
            options: MigrationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    /// Install a callback that may redirect or veto legacy type mappings.
    pub fn with_type_override(mut self, hook: TypeOverride) -> Self {
        self.mapper = self.mapper.with_override(hook);
        self
    }

    pub fn plugin(&self) -> &'static LegacyPlugin {
        self.plugin
    }

    pub fn mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    /// Legacy fields this run would migrate.
    pub fn load_fields(&self) -> Result<Vec<LegacyFieldRecord>> {
        self.ctx.tables.fields_of_type(self.plugin.field_type)
    }

    pub fn run(&self) -> Result<MigrationReport> {
        let start = Instant::now();
        let log = self.ctx.log;
        let mut report = MigrationReport::new(self.plugin.name);

        let records = self.load_fields()?;
        info!(
            subsystem = "migration",
            component = "orchestrator",
            op = "run",
            plugin = self.plugin.name,
            row_count = records.len(),
            "Starting link field migration"
        );

        let settings = SettingsMigrator::new(self.ctx, self.plugin, &self.mapper);
        for record in &records {
            let migrated = settings.migrate(record)?;

            let mut field = FieldReport::new(record.id, &record.uid, &record.handle, &record.context);
            field.settings = migrated.outcome;
            field.skipped_types = migrated.skipped_types;
            field.link_types = migrated.link_types;
            report.fields.push(field);
        }

        self.ctx.fields.refresh()?;

        let converter = RecordConverter::new(&self.plugin.values, &self.mapper);
        let content = ContentMigrator::new(
            self.ctx,
            self.plugin,
            &converter,
            &self.options.rich_content_plugin,
        );

        for (record, field) in records.iter().zip(report.fields.iter_mut()) {
            if !field.settings.is_migrated() {
                continue;
            }

            let migrated = content.migrate(record)?;
            field.location = migrated
                .location
                .map(|location| format!("{}.{}", location.table, location.column));
            field.content = migrated.tally;
            field.rich_content = migrated.rich_content;
        }

        self.ctx.fields.refresh()?;

        if self.options.resave_fields.unwrap_or(self.plugin.resave_fields) {
            for (record, field) in records.iter().zip(report.fields.iter_mut()) {
                if !field.settings.is_migrated() {
                    continue;
                }
                field.resaved = self.resave(record)?;
            }
        }

        log.write("Finished Migration", LogTone::Success);
        report.finished_at = Some(Utc::now());

        info!(
            subsystem = "migration",
            component = "orchestrator",
            op = "run",
            plugin = self.plugin.name,
            duration_ms = start.elapsed().as_millis() as u64,
            summary = %report,
            "Link field migration finished"
        );

        Ok(report)
    }

    fn resave(&self, record: &LegacyFieldRecord) -> Result<bool> {
        let log = self.ctx.log;
        log.write(&format!("Re-saving field “{}”.", record.handle), LogTone::Plain);

        let Some(field) = self.ctx.fields.field_by_id(record.id)? else {
            warn!(
                subsystem = "migration",
                component = "orchestrator",
                field_id = record.id,
                "Field missing at re-save, skipped"
            );
            return Ok(false);
        };

        self.ctx.fields.save_field(&field)?;
        log.write(
            &format!("    > Field “{}” migration finalised.", record.handle),
            LogTone::Success,
        );

        Ok(true)
    }
}
