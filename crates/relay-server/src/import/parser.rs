//! CSV row parser
//!
//! Turns the raw import payload into a lazy sequence of rows. Each row is
//! either its cells or a [`RowError`]; a bad row never stops the rows after it.

use thiserror::Error;

/// Dialect and layout of an import payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// First record is a header and is not imported
    pub has_headers: bool,
    pub delimiter: u8,
    /// Number of cells every row must carry
    pub expected_fields: usize,
}

/// One well-formed row, tagged with the line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub line: u64,
    pub fields: Vec<String>,
}

impl ParsedRow {
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
        /// First cell of the row, if it had one
        leading: Option<String>,
    },

    #[error("line {line}: malformed CSV: {message}")]
    Malformed { line: u64, message: String },
}

impl RowError {
    pub fn line(&self) -> u64 {
        match self {
            RowError::FieldCount { line, .. } | RowError::Malformed { line, .. } => *line,
        }
    }

    /// Identifier-looking first cell of the failed row, for keying the skip
    pub fn leading_field(&self) -> Option<&str> {
        match self {
            RowError::FieldCount { leading, .. } => leading.as_deref(),
            RowError::Malformed { .. } => None,
        }
    }
}

/// Restartable view over a CSV payload.
///
/// Nothing is parsed until iterated; every call to [`CsvRows::iter`] starts
/// again from the first row.
#[derive(Debug, Clone, Copy)]
pub struct CsvRows<'a> {
    input: &'a str,
    options: CsvOptions,
}

impl<'a> CsvRows<'a> {
    pub fn new(input: &'a str, options: CsvOptions) -> Self {
        Self { input, options }
    }

    pub fn options(&self) -> CsvOptions {
        self.options
    }

    pub fn iter(&self) -> RowIter<'a> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.options.has_headers)
            .delimiter(self.options.delimiter)
            .flexible(true)
            .from_reader(self.input.as_bytes());

        RowIter {
            records: reader.into_records(),
            expected_fields: self.options.expected_fields,
            last_line: 0,
        }
    }
}

impl<'a> IntoIterator for &CsvRows<'a> {
    type Item = Result<ParsedRow, RowError>;
    type IntoIter = RowIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct RowIter<'a> {
    records: csv::StringRecordsIntoIter<&'a [u8]>,
    expected_fields: usize,
    last_line: u64,
}

impl Iterator for RowIter<'_> {
    type Item = Result<ParsedRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => {
                    let line = err
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(self.last_line + 1);
                    self.last_line = line;
                    return Some(Err(RowError::Malformed {
                        line,
                        message: err.to_string(),
                    }));
                },
            };

            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(self.last_line + 1);
            self.last_line = line;

            // Blank lines carry no record
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }

            if record.len() != self.expected_fields {
                let leading = record
                    .get(0)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                return Some(Err(RowError::FieldCount {
                    line,
                    expected: self.expected_fields,
                    found: record.len(),
                    leading,
                }));
            }

            return Some(Ok(ParsedRow {
                line,
                fields: record.iter().map(str::to_string).collect(),
            }));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn options(has_headers: bool) -> CsvOptions {
        CsvOptions {
            has_headers,
            delimiter: b',',
            expected_fields: 5,
        }
    }

    #[test]
    fn test_parses_quoted_and_bare_cells() {
        let input = "\"1\",\"John\",\"Doe\",24,\"1234 Main St\"\n\"2\",\"Jane\",\"Roe\",,\"5 Elm, Apt 2\"\n";
        let rows: Vec<_> = CsvRows::new(input, options(false)).iter().collect();

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.line, 1);
        assert_eq!(first.fields, vec!["1", "John", "Doe", "24", "1234 Main St"]);

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.line, 2);
        assert_eq!(second.field(3), "");
        assert_eq!(second.field(4), "5 Elm, Apt 2");
    }

    #[test]
    fn test_multiline_field_and_doubled_quotes() {
        let input = "\"1\",\"John\",\"Doe\",24,\"12 Main\nApt \"\"B\"\"\"\n2,Jane,Roe,31,Elm\n";
        let rows: Vec<_> = CsvRows::new(input, options(false)).iter().collect();

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.line, 1);
        assert_eq!(first.field(4), "12 Main\nApt \"B\"");

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.line, 3);
        assert_eq!(second.field(0), "2");
    }

    #[test]
    fn test_short_row_is_an_error_and_parsing_continues() {
        let input = "\"1\",\"John\"\n\"2\",\"Jane\",\"Roe\",31,\"5 Elm\"\n";
        let rows: Vec<_> = CsvRows::new(input, options(false)).iter().collect();

        assert_eq!(
            rows[0],
            Err(RowError::FieldCount {
                line: 1,
                expected: 5,
                found: 2,
                leading: Some("1".to_string()),
            })
        );
        assert_eq!(rows[1].as_ref().unwrap().field(0), "2");
    }

    #[test]
    fn test_header_is_skipped_and_lines_stay_physical() {
        let input = "id,first_name,last_name,age,street_address\n1,John,Doe,24,Main\n";
        let rows: Vec<_> = CsvRows::new(input, options(true)).iter().collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().line, 2);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let input = "1,John,Doe,24,Main\n\n2,Jane,Roe,31,Elm\n";
        let rows: Vec<_> = CsvRows::new(input, options(false))
            .iter()
            .map(|r| r.unwrap().line)
            .collect();

        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let rows = CsvRows::new("1,John,Doe,24,Main\n", options(false));
        assert_eq!(rows.iter().count(), 1);
        assert_eq!(rows.iter().count(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let opts = CsvOptions {
            delimiter: b';',
            ..options(false)
        };
        let row = CsvRows::new("1;John;Doe;24;Main, 4\n", opts)
            .iter()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(row.field(4), "Main, 4");
    }
}
