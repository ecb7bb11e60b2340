use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Warehouse column types used by the listing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Date => "DATE",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column set of every listing table, in order.
pub const LISTING_COLUMNS: [(&str, ColumnType); 4] = [
    ("title", ColumnType::String),
    ("company", ColumnType::String),
    ("location", ColumnType::String),
    ("date_posted", ColumnType::Date),
];

/// One normalized row. Field names match [`LISTING_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub title: String,
    pub company: String,
    pub location: String,
    /// `None` when the scraped value was not a valid `YYYY-MM-DD` date.
    pub date_posted: Option<NaiveDate>,
}

/// Rows in page order, ready for a single load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingTable {
    rows: Vec<ListingRow>,
}

impl ListingTable {
    pub fn new(rows: Vec<ListingRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ListingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_types(&self) -> &'static [(&'static str, ColumnType)] {
        &LISTING_COLUMNS
    }

    /// `title: STRING, company: STRING, ...` for diagnostics.
    pub fn describe_columns(&self) -> String {
        self.column_types()
            .iter()
            .map(|(name, column_type)| format!("{}: {}", name, column_type))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Newline-delimited JSON, one object per row. Missing dates are `null`.
    pub fn to_ndjson(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::new();
        for row in &self.rows {
            serde_json::to_writer(&mut out, row)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}
