//! Legacy field settings → link field definition.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::defaults::{ALL_SOURCES, COLUMN_SUFFIX_LENGTH, LINK_FIELD_TYPE};
use crate::error::Result;
use crate::migration::layout::build_default_layout;
use crate::migration::read;
use crate::migration::report::SettingsOutcome;
use crate::migration::rules::{
    link_type_label, LegacyPlugin, LinkKind, LinkTextSource, SettingsPersistence, SettingsRules,
};
use crate::migration::type_map::{link_type_handle, TypeMapper};
use crate::migration::validation::validate_field_definition;
use crate::models::{
    LegacyFieldRecord, LinkFieldSettings, LinkTypeConfig, NewFieldDefinition, StorageContext,
};
use crate::traits::{LogTone, MigrationContext, SiteDirectory};

/// Settings migration result of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsResult {
    pub outcome: SettingsOutcome,
    pub skipped_types: Vec<String>,
    pub link_types: usize,
}

impl SettingsResult {
    fn skipped(outcome: SettingsOutcome) -> Self {
        Self {
            outcome,
            skipped_types: Vec::new(),
            link_types: 0,
        }
    }
}

pub struct SettingsMigrator<'a> {
    ctx: MigrationContext<'a>,
    plugin: &'a LegacyPlugin,
    mapper: &'a TypeMapper,
}

impl<'a> SettingsMigrator<'a> {
    pub fn new(ctx: MigrationContext<'a>, plugin: &'a LegacyPlugin, mapper: &'a TypeMapper) -> Self {
        Self {
            ctx,
            plugin,
            mapper,
        }
    }

    /// Build, validate and persist the new definition of one legacy field.
    ///
    /// Only a registry refusal is returned as an error; every other problem
    /// skips the field and is reported in the result.
    pub fn migrate(&self, record: &LegacyFieldRecord) -> Result<SettingsResult> {
        let log = self.ctx.log;
        log.write(
            &format!("Preparing to migrate field “{}” ({}).", record.handle, record.uid),
            LogTone::Plain,
        );

        let settings = match decode_settings(&record.settings) {
            Ok(settings) => settings,
            Err(reason) => {
                warn!(
                    subsystem = "migration",
                    component = "settings",
                    field_id = record.id,
                    error = %reason,
                    "Unreadable legacy settings"
                );
                log.write(
                    &format!("    > Unable to read settings of field “{}”: {}", record.handle, reason),
                    LogTone::Error,
                );
                return Ok(SettingsResult::skipped(SettingsOutcome::Unreadable { reason }));
            }
        };

        let (link_types, skipped_types) = self.build_link_types(&settings)?;
        for key in &skipped_types {
            warn!(
                subsystem = "migration",
                component = "settings",
                field_id = record.id,
                legacy_type = %key,
                "Legacy link type left out of the new definition"
            );
        }

        let rules = &self.plugin.settings;
        let default_link_type = rules
            .default_link_type_key
            .and_then(|key| read::non_empty_text(settings.get(key)))
            .and_then(|name| self.mapper.resolve(&name))
            .map(|link_type| link_type_handle(&link_type));

        let mut definition = NewFieldDefinition::from_legacy(
            record,
            LinkFieldSettings {
                new_window: rules.new_window.read(&settings),
                default_link_type,
                link_types,
            },
        );

        if self.plugin.assign_column_suffix {
            definition.column_suffix = Some(random_column_suffix());
        }

        let link_type_count = definition.settings.link_types.len();
        let result = |outcome| SettingsResult {
            outcome,
            skipped_types: skipped_types.clone(),
            link_types: link_type_count,
        };

        if let Err(errors) = validate_field_definition(&definition) {
            warn!(
                subsystem = "migration",
                component = "settings",
                field_id = record.id,
                error_count = errors.len(),
                "New field definition failed validation"
            );
            log.write(&errors.to_string(), LogTone::Error);
            return Ok(result(SettingsOutcome::Invalid { errors }));
        }

        if let Some(outcome) = self.persist(&definition)? {
            return Ok(result(outcome));
        }

        info!(
            subsystem = "migration",
            component = "settings",
            field_id = record.id,
            field_handle = %record.handle,
            link_types = link_type_count,
            "Field settings migrated"
        );
        log.write(
            &format!("    > Field “{}” migrated.", record.handle),
            LogTone::Success,
        );

        Ok(result(SettingsOutcome::Migrated))
    }

    fn build_link_types(&self, settings: &Map<String, JsonValue>) -> Result<(Vec<LinkTypeConfig>, Vec<String>)> {
        let rules = &self.plugin.settings;
        let include_text = rules.include_text.read(settings);
        let enable_title = rules.enable_title.read(settings);
        let enable_aria_label = rules.enable_aria_label.read(settings);
        let enable_all = rules
            .enable_all
            .map(|flag| flag.read(settings))
            .unwrap_or(false);

        let legacy_types = read::nested_object(settings.get(rules.types_key));

        let mut link_types = Vec::with_capacity(legacy_types.len());
        let mut skipped = Vec::new();

        for (key, entry) in &legacy_types {
            let Some(link_type) = self.mapper.resolve(key) else {
                skipped.push(key.clone());
                continue;
            };

            let entry = entry.as_object().cloned().unwrap_or_default();
            let enabled = enable_all || read::flag(entry.get(rules.enabled_key), false);

            // Several legacy types can map onto one link type; the first keeps
            // its attributes and the rest only contribute their enabled flag.
            let handle = link_type_handle(&link_type);
            if let Some(existing) = link_types
                .iter_mut()
                .find(|config: &&mut LinkTypeConfig| config.handle == handle)
            {
                existing.enabled |= enabled;
                debug!(
                    subsystem = "migration",
                    component = "settings",
                    legacy_type = %key,
                    link_type = %link_type,
                    enabled = existing.enabled,
                    "Legacy link type merged into existing link type"
                );
                skipped.push(key.clone());
                continue;
            }

            let layout_config = build_default_layout(include_text, enable_title, enable_aria_label);

            let mut config = LinkTypeConfig {
                label: link_type_label(&link_type),
                handle,
                enabled,
                link_text: link_text(rules, settings, &entry),
                sources: None,
                selection_label: None,
                sites: None,
                placeholder: None,
                layout_uid: Uuid::new_v4().to_string(),
                layout_config,
                link_type,
            };

            match LinkKind::of(&config.link_type) {
                LinkKind::Element => {
                    config.sources = Some(
                        entry
                            .get(rules.sources_key)
                            .filter(|v| !v.is_null())
                            .cloned()
                            .unwrap_or_else(|| json!(ALL_SOURCES)),
                    );
                    config.selection_label = rules
                        .selection_label_key
                        .and_then(|key| read::text(entry.get(key)));
                }
                LinkKind::Site => {
                    if let Some(sites) = rules
                        .sites_key
                        .and_then(|key| entry.get(key))
                        .filter(|v| !v.is_null())
                    {
                        config.sites = Some(site_uids(self.ctx.sites, sites.clone())?);
                    }
                }
                LinkKind::Plain => {
                    config.placeholder = rules
                        .placeholder_key
                        .and_then(|key| read::text(entry.get(key)));
                }
            }

            debug!(
                subsystem = "migration",
                component = "settings",
                legacy_type = %key,
                link_type = %config.link_type,
                enabled = config.enabled,
                "Mapped legacy link type"
            );

            link_types.push(config);
        }

        Ok((link_types, skipped))
    }

    /// Persist a validated definition. Returns an outcome when the field had
    /// to be skipped.
    fn persist(&self, definition: &NewFieldDefinition) -> Result<Option<SettingsOutcome>> {
        match self.plugin.persistence {
            SettingsPersistence::RewriteFieldRow => {
                debug!(
                    subsystem = "migration",
                    component = "settings",
                    field_id = definition.id,
                    "Rewriting field row"
                );
                self.ctx
                    .tables
                    .rewrite_field_row(definition.id, LINK_FIELD_TYPE, &definition.settings_json()?)?;
                Ok(None)
            }
            SettingsPersistence::SaveField => self.save_through_registry(definition),
        }
    }

    fn save_through_registry(&self, definition: &NewFieldDefinition) -> Result<Option<SettingsOutcome>> {
        let field = definition.to_field()?;

        let (kind, block_type_uid) = match definition.storage_context() {
            StorageContext::Global => {
                self.ctx.fields.save_field(&field)?;
                return Ok(None);
            }
            StorageContext::Block {
                kind,
                block_type_uid,
            } => (kind, block_type_uid),
            StorageContext::Unsupported(context) => {
                self.ctx.log.write(
                    &format!("    > Unsupported field context “{}”.", context),
                    LogTone::Error,
                );
                return Ok(Some(SettingsOutcome::UnsupportedContext { context }));
            }
        };

        let owner = self.ctx.tables.block_type_owner(kind, &block_type_uid)?;
        let Some(owner) = owner else {
            let reason = format!(
                "Unable to find owner {} field for context “{}”.",
                kind, definition.context
            );
            self.ctx.log.write(&format!("    > {}", reason), LogTone::Error);
            return Ok(Some(SettingsOutcome::OwnerMissing { reason }));
        };

        let Some(mut container) = self.ctx.fields.field_by_id(owner.field_id)? else {
            let reason = format!(
                "Unable to find owner {} field for ID “{}”.",
                kind, owner.field_id
            );
            self.ctx.log.write(&format!("    > {}", reason), LogTone::Error);
            return Ok(Some(SettingsOutcome::OwnerMissing { reason }));
        };

        let replaced = container.replace_nested_field(&field);
        if replaced == 0 {
            warn!(
                subsystem = "migration",
                component = "settings",
                field_id = definition.id,
                container_id = container.id,
                "Field not found in any block type layout of its container"
            );
        }

        debug!(
            subsystem = "migration",
            component = "settings",
            field_id = definition.id,
            container_id = container.id,
            replaced,
            "Saving container with migrated field"
        );
        self.ctx.fields.save_field(&container)?;

        Ok(None)
    }
}

/// Decode a settings blob. Empty and `null` blobs mean "no settings".
fn decode_settings(raw: &str) -> std::result::Result<Map<String, JsonValue>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(JsonValue::Null) => Ok(Map::new()),
        Ok(other) => Err(format!("expected an object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn link_text(
    rules: &SettingsRules,
    settings: &Map<String, JsonValue>,
    entry: &Map<String, JsonValue>,
) -> Option<String> {
    match rules.link_text {
        LinkTextSource::PerType(key) => read::text(entry.get(key)),
        LinkTextSource::FieldSetting(key) => read::text(settings.get(key)),
    }
}

/// Replace site ids with site UIDs. Ids of unknown sites are kept as they are.
fn site_uids(sites: &dyn SiteDirectory, value: JsonValue) -> Result<JsonValue> {
    let translate = |item: JsonValue| -> Result<JsonValue> {
        match read::id(Some(&item)) {
            Some(id) => Ok(sites.site_uid(id)?.map(JsonValue::String).unwrap_or(item)),
            None => Ok(item),
        }
    };

    match value {
        JsonValue::Array(items) => Ok(JsonValue::Array(
            items.into_iter().map(translate).collect::<Result<_>>()?,
        )),
        JsonValue::Object(map) => Ok(JsonValue::Object(
            map.into_iter()
                .map(|(key, item)| -> Result<(String, JsonValue)> { Ok((key, translate(item)?)) })
                .collect::<Result<_>>()?,
        )),
        other => Ok(other),
    }
}

/// A fresh lowercase alphanumeric column suffix.
pub fn random_column_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(COLUMN_SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_settings() {
        assert!(decode_settings("").unwrap().is_empty());
        assert!(decode_settings("null").unwrap().is_empty());
        assert_eq!(decode_settings("{\"a\":1}").unwrap()["a"], json!(1));
        assert!(decode_settings("[1]").unwrap_err().contains("an array"));
        assert!(decode_settings("{oops").is_err());
    }

    #[test]
    fn test_random_column_suffix() {
        let suffix = random_column_suffix();
        assert_eq!(suffix.len(), COLUMN_SUFFIX_LENGTH);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
