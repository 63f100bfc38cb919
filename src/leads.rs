use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use crate::table::RawTable;

/// Canonical column names, after the rename mapping has been applied.
pub mod columns {
    pub const QUALIFIED: &str = "isQualified";
    pub const CALLED: &str = "is_Lead_Called";
    pub const CONNECTED: &str = "is_Lead_Connected";
    pub const CREATED_AT: &str = "LeadCreateDateTime";
    pub const CREATED_MONTH: &str = "LeadCreateMonth";
    pub const ATTEMPT_HOURS: &str = "TimeDiffLeadAttempt_hours";
    pub const CONNECT_HOURS: &str = "TimeDiffLeadConnect_hours";
    pub const SOURCE: &str = "Opportunity Source";

    pub const REQUIRED: &[&str] = &[
        QUALIFIED,
        CALLED,
        CONNECTED,
        CREATED_AT,
        CREATED_MONTH,
        ATTEMPT_HOURS,
        CONNECT_HOURS,
        SOURCE,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadRecord {
    pub is_qualified: bool,
    /// Whether a first attempt to reach the lead was made.
    pub is_contacted: bool,
    pub is_connected: bool,
    pub created_at: NaiveDateTime,
    pub hours_to_first_attempt: Option<f64>,
    pub hours_to_first_connect: Option<f64>,
    pub period_label: String,
    pub source: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("required columns are missing from the input: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingTimestamp,
    UnparseableTimestamp(String),
    MissingPeriodLabel,
    MissingSource,
}

impl Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::MissingTimestamp => write!(f, "missing creation timestamp"),
            ExclusionReason::UnparseableTimestamp(value) => {
                write!(f, "unparseable creation timestamp \"{}\"", value)
            }
            ExclusionReason::MissingPeriodLabel => write!(f, "missing period label"),
            ExclusionReason::MissingSource => write!(f, "missing source"),
        }
    }
}

/// An input row that did not make it into the record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    /// 1-based position among the data rows (the header is not counted).
    pub row_number: usize,
    pub reasons: Vec<ExclusionReason>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<LeadRecord>,
    pub exclusions: Vec<Exclusion>,
    pub total_rows: usize,
}

impl Normalized {
    pub fn dropped_count(&self) -> usize {
        self.exclusions.len()
    }
}

struct ColumnIndices {
    qualified: usize,
    called: usize,
    connected: usize,
    created_at: usize,
    created_month: usize,
    attempt_hours: usize,
    connect_hours: usize,
    source: usize,
}

impl ColumnIndices {
    fn resolve(
        table: &RawTable,
        renames: &BTreeMap<String, String>,
    ) -> Result<Self, NormalizeError> {
        let headers: Vec<&str> = table
            .headers
            .iter()
            .map(|h| renames.get(h).map(String::as_str).unwrap_or(h.as_str()))
            .collect();
        let find = |name: &str| headers.iter().position(|h| *h == name);

        let missing: Vec<String> = columns::REQUIRED
            .iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(NormalizeError::MissingColumns(missing));
        }

        let index = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            qualified: index(columns::QUALIFIED),
            called: index(columns::CALLED),
            connected: index(columns::CONNECTED),
            created_at: index(columns::CREATED_AT),
            created_month: index(columns::CREATED_MONTH),
            attempt_hours: index(columns::ATTEMPT_HOURS),
            connect_hours: index(columns::CONNECT_HOURS),
            source: index(columns::SOURCE),
        })
    }
}

/// Turns the raw table into lead records. Column names are first renamed
/// through `renames` (old name to canonical name). Rows that cannot be used
/// are dropped and reported in [`Normalized::exclusions`]; only a missing
/// required column fails the whole table.
pub fn normalize(
    table: &RawTable,
    renames: &BTreeMap<String, String>,
) -> Result<Normalized, NormalizeError> {
    let indices = ColumnIndices::resolve(table, renames)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut exclusions = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let cell = |column: usize| row.get(column).map(String::as_str).unwrap_or("");
        match normalize_row(cell, &indices) {
            Ok(record) => records.push(record),
            Err(reasons) => {
                let exclusion = Exclusion { row_number: i + 1, reasons };
                debug!(
                    "excluding row {}: {}",
                    exclusion.row_number,
                    exclusion.reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("; ")
                );
                exclusions.push(exclusion);
            }
        }
    }

    info!(
        "Normalized {} of {} rows ({} excluded)",
        records.len(),
        table.rows.len(),
        exclusions.len()
    );
    Ok(Normalized { records, exclusions, total_rows: table.rows.len() })
}

fn normalize_row<'r>(
    cell: impl Fn(usize) -> &'r str,
    indices: &ColumnIndices,
) -> Result<LeadRecord, Vec<ExclusionReason>> {
    let mut reasons = Vec::new();

    let created_text = cell(indices.created_at).trim();
    let created_at = if created_text.is_empty() {
        reasons.push(ExclusionReason::MissingTimestamp);
        None
    } else {
        let parsed = parse_timestamp(created_text);
        if parsed.is_none() {
            reasons.push(ExclusionReason::UnparseableTimestamp(created_text.to_owned()));
        }
        parsed
    };

    let period_label = cell(indices.created_month).trim();
    if period_label.is_empty() {
        reasons.push(ExclusionReason::MissingPeriodLabel);
    }

    let source = cell(indices.source);
    if source.trim().is_empty() {
        reasons.push(ExclusionReason::MissingSource);
    }

    match created_at {
        Some(created_at) if reasons.is_empty() => Ok(LeadRecord {
            is_qualified: parse_flag(cell(indices.qualified)),
            is_contacted: parse_flag(cell(indices.called)),
            is_connected: parse_flag(cell(indices.connected)),
            created_at,
            hours_to_first_attempt: parse_hours(cell(indices.attempt_hours)),
            hours_to_first_connect: parse_hours(cell(indices.connect_hours)),
            period_label: period_label.to_owned(),
            source: source.to_owned(),
        }),
        _ => Err(reasons),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a creation timestamp. Offsets in RFC 3339 input are dropped and the
/// wall-clock time is kept; date-only values are taken as midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS.iter().find_map(|fmt| {
                NaiveDate::parse_from_str(text, fmt)
                    .ok()
                    .map(|date| NaiveDateTime::new(date, NaiveTime::MIN))
            })
        })
}

/// A flag is set when the cell holds the number 1 or the word "true".
pub fn parse_flag(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("true") || text.parse::<f64>().is_ok_and(|v| v == 1.0)
}

pub fn parse_hours(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
