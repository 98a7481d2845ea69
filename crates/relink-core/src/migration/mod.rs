//! The link-field migration engine.
//!
//! Leaves first: [`type_map`] and [`read`] normalize legacy data, [`convert`]
//! turns one legacy value into a link value, [`settings`] and [`content`]
//! migrate a field's definition and stored values, [`patch`] handles values
//! embedded in rich-content documents and [`orchestrator`] drives a run.

pub mod content;
pub mod convert;
pub mod flatten;
pub mod layout;
pub mod locator;
pub mod orchestrator;
pub mod patch;
pub mod read;
pub mod report;
pub mod rules;
pub mod settings;
pub mod type_map;
pub mod validation;

pub use content::{ContentMigrator, ContentResult};
pub use convert::{Conversion, ConversionFailure, RecordConverter};
pub use flatten::{flatten, unflatten, FlatEntry, PathSegment};
pub use layout::build_default_layout;
pub use locator::{field_column, ContentLocation, ContentLocator, Resolution};
pub use orchestrator::{LinkFieldMigration, MigrationOptions};
pub use patch::{DeepContentPatcher, PatchOutcome, RichContentTally};
pub use report::{ContentTally, FieldReport, MigrationReport, ReportTotals, SettingsOutcome};
pub use rules::{LegacyPlugin, LINKIT, TYPED_LINK};
pub use settings::{SettingsMigrator, SettingsResult};
pub use type_map::{link_type_handle, TypeMapper, TypeOverride};
pub use validation::validate_field_definition;
