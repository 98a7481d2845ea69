//! In-place patching of field values embedded in rich-content documents.
//!
//! Rich-content blocks keep their field values under `fields.<handle>`, at
//! any depth. The patcher flattens a document, finds every such location and
//! rewrites the legacy value found there.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::defaults::RICH_CONTENT_FIELDS_KEY;
use crate::error::Result;
use crate::migration::convert::{Conversion, ConversionFailure, RecordConverter};
use crate::migration::flatten::{dotted, flatten, get_at, set_at, PathSegment};
use crate::migration::read::decode_if_json;
use crate::traits::{LogTone, MigrationLog, RichContent};

/// Result of patching one document.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub document: JsonValue,
    pub converted: usize,
    pub failed: Vec<(String, ConversionFailure)>,
}

/// Rich-content totals for one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RichContentTally {
    pub documents_saved: usize,
    pub values_converted: usize,
    pub values_failed: usize,
}

pub struct DeepContentPatcher<'a> {
    converter: &'a RecordConverter<'a>,
}

impl<'a> DeepContentPatcher<'a> {
    pub fn new(converter: &'a RecordConverter<'a>) -> Self {
        Self { converter }
    }

    /// Paths of every `fields.<handle>` value in `document`, in document order.
    pub fn candidate_paths(document: &JsonValue, handle: &str) -> Vec<Vec<PathSegment>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for entry in flatten(document) {
            let position = entry.path.windows(2).position(|pair| {
                pair[0].as_key() == Some(RICH_CONTENT_FIELDS_KEY) && pair[1].as_key() == Some(handle)
            });

            if let Some(position) = position {
                let prefix = entry.path[..position + 2].to_vec();
                if seen.insert(prefix.clone()) {
                    candidates.push(prefix);
                }
            }
        }

        candidates
    }

    /// Convert every legacy value of field `handle` inside `document`.
    pub fn patch_document(&self, document: JsonValue, handle: &str) -> PatchOutcome {
        let mut outcome = PatchOutcome {
            document,
            converted: 0,
            failed: Vec::new(),
        };

        for path in Self::candidate_paths(&outcome.document, handle) {
            let Some(current) = get_at(&outcome.document, &path).cloned() else {
                continue;
            };

            match self.converter.convert(&decode_if_json(current)) {
                Conversion::Empty => {}
                Conversion::Failed(reason) => outcome.failed.push((dotted(&path), reason)),
                conversion @ Conversion::Converted(_) => match conversion.stored_value() {
                    Ok(Some(stored)) => {
                        set_at(&mut outcome.document, &path, stored);
                        outcome.converted += 1;
                    }
                    Ok(None) => {}
                    Err(e) => outcome
                        .failed
                        .push((dotted(&path), ConversionFailure::Unstorable(e.to_string()))),
                },
            }
        }

        outcome
    }

    /// Patch every rich-content document embedding the field with `field_uid`.
    pub fn patch_field(
        &self,
        rich_content: &dyn RichContent,
        field_uid: &str,
        log: &dyn MigrationLog,
    ) -> Result<RichContentTally> {
        let mut tally = RichContentTally::default();

        let saved = rich_content.modify_content(field_uid, &mut |handle: &str, document: JsonValue| {
            let outcome = self.patch_document(document, handle);

            tally.values_converted += outcome.converted;
            tally.values_failed += outcome.failed.len();

            for (path, reason) in &outcome.failed {
                warn!(
                    subsystem = "migration",
                    component = "rich_content",
                    field_handle = handle,
                    path = %path,
                    reason = %reason,
                    "Rich content value not converted"
                );
                log.write(
                    &format!("    > Unable to convert rich content “{}” at {}", handle, path),
                    LogTone::Error,
                );
            }

            outcome.document
        })?;

        tally.documents_saved = saved;

        debug!(
            subsystem = "migration",
            component = "rich_content",
            documents = saved,
            converted = tally.values_converted,
            failed = tally.values_failed,
            "Rich content patched"
        );

        Ok(tally)
    }
}
