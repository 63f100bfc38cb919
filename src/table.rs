use std::{io::Read, path::Path};

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("the input has no header row")]
    MissingHeaders,
    #[error("error reading CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// A table of text cells with named columns, as it was read from the input.
/// Nothing about the cells has been interpreted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_csv_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_csv_reader(std::io::BufReader::new(file), delimiter)?;
        info!("Read {} rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    /// Reads a CSV document whose first record holds the column names. Rows
    /// may be shorter or longer than the header; missing cells read as blank.
    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(TableError::MissingHeaders);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect());
        }
        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let input = "a,b,c\n1,2,3\n4,5,6\n";
        let table = RawTable::from_csv_reader(input.as_bytes(), b',').unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][2], "6");
    }

    #[test]
    fn short_rows_are_tolerated() {
        let input = "a,b,c\n1,2\n";
        let table = RawTable::from_csv_reader(input.as_bytes(), b',').unwrap();
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn header_whitespace_is_trimmed() {
        let input = " Opportunity Source ;isQualified\nWeb;1\n";
        let table = RawTable::from_csv_reader(input.as_bytes(), b';').unwrap();
        assert_eq!(table.headers, vec!["Opportunity Source", "isQualified"]);
    }

    #[test]
    fn empty_input_has_no_headers() {
        let err = RawTable::from_csv_reader("".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, TableError::MissingHeaders));
    }
}
