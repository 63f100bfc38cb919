use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use serde::Serialize;
use tracing::{info, trace, warn};

use crate::config::ReportConfig;
use crate::leads::{self, Exclusion, LeadRecord, NormalizeError};
use crate::period::PeriodSpec;
use crate::table::RawTable;
use crate::utils::round_one_decimal;

mod metrics;
pub mod output;

pub use metrics::{compute_kpis, KpiResult, Metric, MetricValue};

pub const SOURCE_HEADER: &str = "Source";
pub const GROUP_HEADER: &str = "Overall Leads";
pub const METRIC_HEADER: &str = "KPIs";

/// Blank rows placed between two segment blocks.
const SEPARATOR_ROWS: usize = 2;

const OVERALL_LABEL: &str = "Overall";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKey {
    Overall,
    Source(String),
}
/// A source that is itself named "Overall" is labelled "Overall (source)" so
/// its block stays distinct from the aggregate one.
impl Display for SegmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKey::Source(name) if name == OVERALL_LABEL => write!(f, "{} (source)", name),
            _ => f.write_str(self.as_str()),
        }
    }
}
impl SegmentKey {
    pub fn as_str(&self) -> &str {
        match self {
            SegmentKey::Overall => OVERALL_LABEL,
            SegmentKey::Source(name) => name,
        }
    }

    pub fn matches(&self, lead: &LeadRecord) -> bool {
        match self {
            SegmentKey::Overall => true,
            SegmentKey::Source(name) => lead.source == *name,
        }
    }
}

/// `Overall` first, then every distinct source in lexicographic order.
pub fn segment_keys(records: &[LeadRecord]) -> Vec<SegmentKey> {
    let sources: BTreeSet<&str> = records.iter().map(|l| l.source.as_str()).collect();
    if sources.contains(OVERALL_LABEL) {
        warn!(
            "A lead source is named \"{}\"; its block is labelled \"{}\"",
            OVERALL_LABEL,
            SegmentKey::Source(OVERALL_LABEL.to_owned())
        );
    }
    std::iter::once(SegmentKey::Overall)
        .chain(sources.into_iter().map(|s| SegmentKey::Source(s.to_owned())))
        .collect()
}

/// The leads of one segment created within one period.
pub fn select<'a>(
    records: &'a [LeadRecord],
    segment: &SegmentKey,
    period: &PeriodSpec,
) -> Vec<&'a LeadRecord> {
    records.iter().filter(|l| segment.matches(l) && period.contains(&l.created_at)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportRow {
    Kpi {
        segment: String,
        /// `None` when the metric has no KPI group configured.
        group: Option<String>,
        metric: Metric,
        /// One value per report period column, rounded to one decimal. `None`
        /// renders as a blank cell.
        values: Vec<Option<f64>>,
    },
    Blank,
}

/// Every segment's KPI block stacked into one table, blocks separated by two
/// blank rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedReport {
    /// Names of the period columns, in configured order. Only periods that
    /// produced results for at least one segment get a column.
    pub periods: Vec<String>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Populated(ConsolidatedReport),
    /// No segment had any leads in any period.
    NoData,
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&ConsolidatedReport> {
        match self {
            ReportOutcome::Populated(report) => Some(report),
            ReportOutcome::NoData => None,
        }
    }
}

struct SegmentBlock<'p> {
    segment: String,
    results: Vec<(&'p PeriodSpec, KpiResult)>,
}

pub fn assemble(
    records: &[LeadRecord],
    segment_keys: &[SegmentKey],
    periods: &[PeriodSpec],
    kpi_groups: &BTreeMap<Metric, String>,
) -> ReportOutcome {
    let mut blocks = Vec::new();
    for segment in segment_keys {
        let results: Vec<_> = periods
            .iter()
            .filter_map(|period| {
                let subset = select(records, segment, period);
                trace!("{} leads for {} in {}", subset.len(), segment, period.name);
                let result = compute_kpis(&subset);
                (!result.is_empty()).then_some((period, result))
            })
            .collect();
        if results.is_empty() {
            trace!("no leads for {} in any period; skipping", segment);
            continue;
        }
        blocks.push(SegmentBlock { segment: segment.to_string(), results });
    }

    if blocks.is_empty() {
        warn!("No data found for any source in the specified periods");
        return ReportOutcome::NoData;
    }

    let periods: Vec<&PeriodSpec> = periods
        .iter()
        .filter(|period| {
            blocks.iter().any(|b| b.results.iter().any(|(p, _)| p.name == period.name))
        })
        .collect();

    let mut rows = Vec::new();
    for block in &blocks {
        let metrics: BTreeSet<Metric> =
            block.results.iter().flat_map(|(_, result)| result.metrics()).collect();
        for metric in metrics {
            let values = periods
                .iter()
                .map(|period| {
                    block
                        .results
                        .iter()
                        .find(|(p, _)| p.name == period.name)
                        .and_then(|(_, result)| result.get(metric))
                        .and_then(MetricValue::as_f64)
                        .map(round_one_decimal)
                })
                .collect();
            rows.push(ReportRow::Kpi {
                segment: block.segment.clone(),
                group: kpi_groups.get(&metric).cloned(),
                metric,
                values,
            });
        }
        rows.extend(std::iter::repeat(ReportRow::Blank).take(SEPARATOR_ROWS));
    }
    rows.truncate(rows.len() - SEPARATOR_ROWS);

    info!("Assembled KPI report with {} segment blocks", blocks.len());
    ReportOutcome::Populated(ConsolidatedReport {
        periods: periods.into_iter().map(|p| p.name.clone()).collect(),
        rows,
    })
}

/// Normalizes the table and assembles the report as configured. The exclusions
/// are returned even when the report ends up empty.
pub fn generate_report(
    table: &RawTable,
    config: &ReportConfig,
) -> Result<(ReportOutcome, Vec<Exclusion>), NormalizeError> {
    let normalized = leads::normalize(table, &config.column_renames)?;
    if normalized.dropped_count() > 0 {
        info!(
            "{} of {} rows were excluded during normalization",
            normalized.dropped_count(),
            normalized.total_rows
        );
    }
    let keys = segment_keys(&normalized.records);
    info!(
        "Computing KPIs for {} segments over {} periods",
        keys.len(),
        config.periods.len()
    );
    let outcome = assemble(&normalized.records, &keys, &config.periods, &config.kpi_groups);
    Ok((outcome, normalized.exclusions))
}

/// A cell of the rendered report table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Cell::Empty => serializer.serialize_str(""),
            Cell::Text(text) => serializer.serialize_str(text),
            Cell::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

/// The report as a plain grid of named columns, independent of any sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ConsolidatedReport {
    pub fn headers(&self) -> Vec<String> {
        [SOURCE_HEADER, GROUP_HEADER, METRIC_HEADER]
            .into_iter()
            .map(str::to_owned)
            .chain(self.periods.iter().cloned())
            .collect()
    }

    pub fn to_table(&self) -> Table {
        let columns = self.headers();
        let width = columns.len();
        let rows = self
            .rows
            .iter()
            .map(|row| match row {
                ReportRow::Kpi { segment, group, metric, values } => {
                    let mut cells = Vec::with_capacity(width);
                    cells.push(Cell::Text(segment.clone()));
                    cells.push(group.clone().map_or(Cell::Empty, Cell::Text));
                    cells.push(Cell::Text(metric.label().to_owned()));
                    cells.extend(values.iter().map(|v| v.map_or(Cell::Empty, Cell::Number)));
                    cells
                }
                ReportRow::Blank => vec![Cell::Empty; width],
            })
            .collect();
        Table { columns, rows }
    }
}
