//! Structured result of a migration run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::migration::patch::RichContentTally;
use crate::models::{FieldErrors, FieldId};

/// What happened to a field's settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettingsOutcome {
    Migrated,
    /// The legacy settings blob could not be decoded.
    Unreadable { reason: String },
    /// The new definition failed validation.
    Invalid { errors: FieldErrors },
    /// The container owning a nested field could not be found.
    OwnerMissing { reason: String },
    /// The field's context is not one this engine can persist.
    UnsupportedContext { context: String },
}

impl SettingsOutcome {
    pub fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated)
    }
}

/// Per-row content counters of one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentTally {
    pub migrated: usize,
    pub empty: usize,
    pub failed: usize,
    /// Side-table rows without a matching content row.
    pub missing_rows: usize,
}

impl ContentTally {
    pub fn add(&mut self, other: &ContentTally) {
        self.migrated += other.migrated;
        self.empty += other.empty;
        self.failed += other.failed;
        self.missing_rows += other.missing_rows;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    pub id: FieldId,
    pub uid: String,
    pub handle: String,
    pub context: String,
    pub settings: SettingsOutcome,
    /// Legacy type keys left out of the new definition: unmapped, or merged
    /// into a link type an earlier key already produced.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_types: Vec<String>,
    pub link_types: usize,
    /// `table.column` the content was read from and written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub content: ContentTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<RichContentTally>,
    pub resaved: bool,
}

impl FieldReport {
    pub fn new(id: FieldId, uid: &str, handle: &str, context: &str) -> Self {
        Self {
            id,
            uid: uid.to_string(),
            handle: handle.to_string(),
            context: context.to_string(),
            settings: SettingsOutcome::Migrated,
            skipped_types: Vec::new(),
            link_types: 0,
            location: None,
            content: ContentTally::default(),
            rich_content: None,
            resaved: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub fields: usize,
    pub settings_migrated: usize,
    pub settings_skipped: usize,
    pub content: ContentTally,
    pub rich_values_converted: usize,
    pub rich_values_failed: usize,
    pub resaved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub plugin: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fields: Vec<FieldReport>,
}

impl MigrationReport {
    pub fn new(plugin: &str) -> Self {
        Self {
            plugin: plugin.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, handle: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|f| f.handle == handle)
    }

    pub fn totals(&self) -> ReportTotals {
        let mut totals = ReportTotals {
            fields: self.fields.len(),
            ..ReportTotals::default()
        };

        for field in &self.fields {
            if field.settings.is_migrated() {
                totals.settings_migrated += 1;
            } else {
                totals.settings_skipped += 1;
            }
            totals.content.add(&field.content);
            if let Some(rich) = &field.rich_content {
                totals.rich_values_converted += rich.values_converted;
                totals.rich_values_failed += rich.values_failed;
            }
            if field.resaved {
                totals.resaved += 1;
            }
        }

        totals
    }

    /// Whether any field or row could not be migrated.
    pub fn has_failures(&self) -> bool {
        let totals = self.totals();
        totals.settings_skipped > 0
            || totals.content.failed > 0
            || totals.content.missing_rows > 0
            || totals.rich_values_failed > 0
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.totals();
        write!(
            f,
            "{}: {} field(s), {} migrated, {} skipped; rows {} migrated, {} empty, {} failed, {} missing",
            self.plugin,
            totals.fields,
            totals.settings_migrated,
            totals.settings_skipped,
            totals.content.migrated,
            totals.content.empty,
            totals.content.failed,
            totals.content.missing_rows,
        )
    }
}
