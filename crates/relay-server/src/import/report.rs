//! Result aggregation

use std::collections::BTreeMap;

use serde::Serialize;

use crate::clients::ArchivalReference;

/// Status of a record that reached the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Inserted,
    Updated,
}

/// What happened to one input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Imported(ImportStatus),
    Skipped(String),
}

/// Outcome tagged with the row's report key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedOutcome {
    pub key: String,
    pub outcome: RecordOutcome,
}

impl KeyedOutcome {
    pub fn inserted(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            outcome: RecordOutcome::Imported(ImportStatus::Inserted),
        }
    }

    pub fn updated(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            outcome: RecordOutcome::Imported(ImportStatus::Updated),
        }
    }

    pub fn skipped(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            outcome: RecordOutcome::Skipped(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Final answer of one bulk import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: BTreeMap<String, ImportStatus>,
    pub skipped: BTreeMap<String, String>,
    pub archive: ArchivalReference,
    pub summary: ImportSummary,
}

impl ImportReport {
    pub fn status_of(&self, key: &str) -> Option<ImportStatus> {
        self.imported.get(key).copied()
    }

    pub fn skip_reason(&self, key: &str) -> Option<&str> {
        self.skipped.get(key).map(String::as_str)
    }
}

/// Fold outcomes and the archive reference into a report
pub fn aggregate(outcomes: Vec<KeyedOutcome>, archive: ArchivalReference) -> ImportReport {
    let mut imported = BTreeMap::new();
    let mut skipped = BTreeMap::new();
    let mut summary = ImportSummary {
        rows: outcomes.len(),
        ..ImportSummary::default()
    };

    for KeyedOutcome { key, outcome } in outcomes {
        debug_assert!(
            !imported.contains_key(&key) && !skipped.contains_key(&key),
            "outcome key {key} reported twice"
        );
        match outcome {
            RecordOutcome::Imported(status) => {
                match status {
                    ImportStatus::Inserted => summary.inserted += 1,
                    ImportStatus::Updated => summary.updated += 1,
                }
                imported.insert(key, status);
            },
            RecordOutcome::Skipped(reason) => {
                summary.skipped += 1;
                skipped.insert(key, reason);
            },
        }
    }

    ImportReport {
        imported,
        skipped,
        archive,
        summary,
    }
}
