//! Record mapper
//!
//! Converts parsed rows into typed [`CustomerRecord`]s and assigns every row of
//! a batch a unique outcome key, so each row lands in exactly one place of the
//! final report.

use std::collections::HashSet;

use relay_common::types::NamingPolicy;
use serde_json::{Map, Value};
use thiserror::Error;

use super::parser::{CsvRows, ParsedRow};

/// Column order of the customer CSV layout
pub const CUSTOMER_COLUMNS: [&str; 5] = ["id", "first_name", "last_name", "age", "street_address"];

/// Document key of the identifier, independent of the naming policy
pub const IDENTIFIER_KEY: &str = "id";

/// Characters an identifier cannot contain; they break document addressing
const RESERVED_ID_CHARS: [char; 4] = ['/', '\\', '?', '#'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<u32>,
    pub street_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("identifier is empty")]
    MissingIdentifier,

    #[error("identifier '{0}' contains a reserved character")]
    InvalidIdentifier(String),

    #[error("age '{0}' is not a whole non-negative number")]
    InvalidAge(String),
}

impl CustomerRecord {
    /// Map one well-formed row
    pub fn from_row(row: &ParsedRow) -> Result<Self, MappingError> {
        let id = row.field(0).trim();
        if id.is_empty() {
            return Err(MappingError::MissingIdentifier);
        }
        if !is_usable_identifier(id) {
            return Err(MappingError::InvalidIdentifier(id.to_string()));
        }

        let age = match row.field(3).trim() {
            "" => None,
            raw => Some(
                raw.parse::<u32>()
                    .map_err(|_| MappingError::InvalidAge(raw.to_string()))?,
            ),
        };

        Ok(Self {
            id: id.to_string(),
            first_name: row.field(1).trim().to_string(),
            last_name: row.field(2).trim().to_string(),
            age,
            street_address: row.field(4).trim().to_string(),
        })
    }

    /// Document body sent to the object store
    pub fn to_document(&self, naming: NamingPolicy) -> Value {
        let mut doc = Map::new();
        doc.insert(IDENTIFIER_KEY.to_string(), Value::String(self.id.clone()));
        doc.insert(naming.apply("first_name"), Value::String(self.first_name.clone()));
        doc.insert(naming.apply("last_name"), Value::String(self.last_name.clone()));
        doc.insert(
            naming.apply("age"),
            self.age.map(Value::from).unwrap_or(Value::Null),
        );
        doc.insert(
            naming.apply("street_address"),
            Value::String(self.street_address.clone()),
        );
        Value::Object(doc)
    }
}

pub fn is_usable_identifier(id: &str) -> bool {
    !id.is_empty() && !id.contains(RESERVED_ID_CHARS)
}

/// A row after mapping: ready for reconciliation, or already skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedRow {
    Record { key: String, record: CustomerRecord },
    Skipped { key: String, reason: String },
}

impl MappedRow {
    pub fn key(&self) -> &str {
        match self {
            MappedRow::Record { key, .. } | MappedRow::Skipped { key, .. } => key,
        }
    }
}

/// Map every row of a batch.
///
/// Keys: a record's identifier when it is unseen in the batch, `<id>#row-<line>`
/// for a repeat or for a row that failed to parse or map, `#row-<line>` when
/// the row has no usable identifier. Failed rows never claim an identifier.
/// Reserved `#` keeps generated keys apart from real identifiers.
pub fn map_rows(rows: &CsvRows<'_>) -> Vec<MappedRow> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut mapped = Vec::new();

    for row in rows {
        let entry = match row {
            Ok(row) => map_row(&row, &mut seen),
            Err(err) => {
                let key = failed_row_key(err.leading_field(), err.line());
                MappedRow::Skipped {
                    key,
                    reason: err.to_string(),
                }
            },
        };
        mapped.push(entry);
    }

    mapped
}

fn map_row(row: &ParsedRow, seen: &mut HashSet<String>) -> MappedRow {
    match CustomerRecord::from_row(row) {
        Ok(record) => {
            if seen.insert(record.id.clone()) {
                MappedRow::Record {
                    key: record.id.clone(),
                    record,
                }
            } else {
                MappedRow::Skipped {
                    key: format!("{}#row-{}", record.id, row.line),
                    reason: format!(
                        "line {}: duplicate identifier '{}' in this import",
                        row.line, record.id
                    ),
                }
            }
        },
        Err(err) => MappedRow::Skipped {
            key: failed_row_key(Some(row.field(0).trim()), row.line),
            reason: format!("line {}: {}", row.line, err),
        },
    }
}

fn failed_row_key(candidate: Option<&str>, line: u64) -> String {
    match candidate.filter(|id| is_usable_identifier(id)) {
        Some(id) => format!("{id}#row-{line}"),
        None => format!("#row-{line}"),
    }
}
