use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    leads::LeadRecord,
    utils::{percentage, percentile},
};

/// Hours after which a first attempt or connection counts as late.
const LATE_AFTER_HOURS: f64 = 24.0;

/// The metrics of a KPI block. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "# of Leads Created (Salesforce)")]
    LeadsCreated,
    #[serde(rename = "# of Qualified leads")]
    QualifiedLeads,
    #[serde(rename = "% Qualified Leads of Leads Created")]
    QualifiedPct,
    #[serde(rename = "# of Leads Attempted")]
    LeadsAttempted,
    #[serde(rename = "Attempt% of Qualified leads")]
    AttemptPct,
    #[serde(rename = "# of Leads Connected")]
    LeadsConnected,
    #[serde(rename = "Connection % of Qualified Leads")]
    ConnectionPct,
    #[serde(rename = "Time to First Attempt (P50) in hours")]
    FirstAttemptP50,
    #[serde(rename = "Time to First Attempt (P90) in hours")]
    FirstAttemptP90,
    #[serde(rename = "Time to First Connect (P50) in hours")]
    FirstConnectP50,
    #[serde(rename = "Time to First Connect (P90) in hours")]
    FirstConnectP90,
    #[serde(rename = "% Contri. of Leads Attempted after 24 hours")]
    AttemptedAfter24hPct,
    #[serde(rename = "% Contri. of Leads Contacted after 24 hours")]
    ContactedAfter24hPct,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::LeadsCreated,
        Metric::QualifiedLeads,
        Metric::QualifiedPct,
        Metric::LeadsAttempted,
        Metric::AttemptPct,
        Metric::LeadsConnected,
        Metric::ConnectionPct,
        Metric::FirstAttemptP50,
        Metric::FirstAttemptP90,
        Metric::FirstConnectP50,
        Metric::FirstConnectP90,
        Metric::AttemptedAfter24hPct,
        Metric::ContactedAfter24hPct,
    ];

    /// The label shown in the KPIs column. Must stay in sync with the serde
    /// names above, which config files use.
    pub fn label(self) -> &'static str {
        match self {
            Metric::LeadsCreated => "# of Leads Created (Salesforce)",
            Metric::QualifiedLeads => "# of Qualified leads",
            Metric::QualifiedPct => "% Qualified Leads of Leads Created",
            Metric::LeadsAttempted => "# of Leads Attempted",
            Metric::AttemptPct => "Attempt% of Qualified leads",
            Metric::LeadsConnected => "# of Leads Connected",
            Metric::ConnectionPct => "Connection % of Qualified Leads",
            Metric::FirstAttemptP50 => "Time to First Attempt (P50) in hours",
            Metric::FirstAttemptP90 => "Time to First Attempt (P90) in hours",
            Metric::FirstConnectP50 => "Time to First Connect (P50) in hours",
            Metric::FirstConnectP90 => "Time to First Connect (P90) in hours",
            Metric::AttemptedAfter24hPct => "% Contri. of Leads Attempted after 24 hours",
            Metric::ContactedAfter24hPct => "% Contri. of Leads Contacted after 24 hours",
        }
    }

    pub fn default_group(self) -> &'static str {
        match self {
            Metric::LeadsCreated | Metric::QualifiedLeads | Metric::QualifiedPct => "Lead Vol",
            Metric::LeadsAttempted
            | Metric::AttemptPct
            | Metric::FirstAttemptP50
            | Metric::FirstAttemptP90
            | Metric::AttemptedAfter24hPct => "Lead Attempt",
            Metric::LeadsConnected
            | Metric::ConnectionPct
            | Metric::FirstConnectP50
            | Metric::FirstConnectP90
            | Metric::ContactedAfter24hPct => "Lead Connect",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    /// Already scaled to 0..=100.
    Percentage(f64),
    /// `None` when no lead in the subset has a value to take a percentile of.
    Hours(Option<f64>),
}

impl MetricValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            MetricValue::Count(n) => Some(n as f64),
            MetricValue::Percentage(p) => Some(p),
            MetricValue::Hours(h) => h,
        }
    }
}

/// Metrics for one segment in one period. Empty when the segment had no leads
/// in the period; otherwise it holds every [`Metric`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiResult(BTreeMap<Metric, MetricValue>);

impl KpiResult {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, metric: Metric) -> Option<MetricValue> {
        self.0.get(&metric).copied()
    }

    /// In report order.
    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.0.keys().copied()
    }
}

pub fn compute_kpis(subset: &[&LeadRecord]) -> KpiResult {
    if subset.is_empty() {
        return KpiResult::default();
    }

    let created = subset.len();
    let qualified: Vec<&LeadRecord> = subset.iter().copied().filter(|l| l.is_qualified).collect();
    let attempted_qualified = qualified.iter().filter(|l| l.is_contacted).count();
    let connected_qualified = qualified.iter().filter(|l| l.is_connected).count();

    // percentiles and late shares run over the whole subset, not just the
    // qualified leads
    let attempt_hours: Vec<f64> = subset.iter().filter_map(|l| l.hours_to_first_attempt).collect();
    let connect_hours: Vec<f64> = subset.iter().filter_map(|l| l.hours_to_first_connect).collect();

    let contacted: Vec<&LeadRecord> = subset.iter().copied().filter(|l| l.is_contacted).collect();
    let contacted_late = contacted
        .iter()
        .filter(|l| l.hours_to_first_attempt.is_some_and(|h| h > LATE_AFTER_HOURS))
        .count();
    let connected: Vec<&LeadRecord> = subset.iter().copied().filter(|l| l.is_connected).collect();
    let connected_late = connected
        .iter()
        .filter(|l| l.hours_to_first_connect.is_some_and(|h| h > LATE_AFTER_HOURS))
        .count();

    use MetricValue::{Count, Hours, Percentage};
    let values = [
        (Metric::LeadsCreated, Count(created as u64)),
        (Metric::QualifiedLeads, Count(qualified.len() as u64)),
        (Metric::QualifiedPct, Percentage(percentage(qualified.len(), created))),
        (Metric::LeadsAttempted, Count(attempted_qualified as u64)),
        (Metric::AttemptPct, Percentage(percentage(attempted_qualified, qualified.len()))),
        (Metric::LeadsConnected, Count(connected_qualified as u64)),
        (Metric::ConnectionPct, Percentage(percentage(connected_qualified, qualified.len()))),
        (Metric::FirstAttemptP50, Hours(percentile(&attempt_hours, 0.5))),
        (Metric::FirstAttemptP90, Hours(percentile(&attempt_hours, 0.9))),
        (Metric::FirstConnectP50, Hours(percentile(&connect_hours, 0.5))),
        (Metric::FirstConnectP90, Hours(percentile(&connect_hours, 0.9))),
        (Metric::AttemptedAfter24hPct, Percentage(percentage(contacted_late, contacted.len()))),
        (Metric::ContactedAfter24hPct, Percentage(percentage(connected_late, connected.len()))),
    ];
    KpiResult(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn lead(qualified: bool, contacted: bool, connected: bool) -> LeadRecord {
        LeadRecord {
            is_qualified: qualified,
            is_contacted: contacted,
            is_connected: connected,
            created_at: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            hours_to_first_attempt: None,
            hours_to_first_connect: None,
            period_label: "May".to_owned(),
            source: "Web".to_owned(),
        }
    }

    fn value(result: &KpiResult, metric: Metric) -> Option<f64> {
        result.get(metric).and_then(MetricValue::as_f64)
    }

    #[test]
    fn empty_subset_has_no_metrics() {
        let result = compute_kpis(&[]);
        assert!(result.is_empty());
        assert_eq!(result.metrics().count(), 0);
    }

    #[test]
    fn every_metric_is_present_in_order() {
        let leads = [lead(false, false, false)];
        let refs: Vec<&LeadRecord> = leads.iter().collect();
        let result = compute_kpis(&refs);
        assert_eq!(result.metrics().collect::<Vec<_>>(), Metric::ALL.to_vec());
    }

    #[test]
    fn zero_denominators_give_zero_not_nan() {
        let leads = [lead(false, false, false), lead(false, false, false)];
        let refs: Vec<&LeadRecord> = leads.iter().collect();
        let result = compute_kpis(&refs);
        assert_eq!(value(&result, Metric::QualifiedPct), Some(0.0));
        assert_eq!(value(&result, Metric::AttemptPct), Some(0.0));
        assert_eq!(value(&result, Metric::ConnectionPct), Some(0.0));
        assert_eq!(value(&result, Metric::AttemptedAfter24hPct), Some(0.0));
        assert_eq!(value(&result, Metric::ContactedAfter24hPct), Some(0.0));
        assert_eq!(result.get(Metric::FirstAttemptP50), Some(MetricValue::Hours(None)));
    }

    #[test]
    fn single_attempt_value_is_both_percentiles() {
        let mut only = lead(true, true, false);
        only.hours_to_first_attempt = Some(7.25);
        let leads = [only, lead(true, false, false)];
        let refs: Vec<&LeadRecord> = leads.iter().collect();
        let result = compute_kpis(&refs);
        assert_eq!(value(&result, Metric::FirstAttemptP50), Some(7.25));
        assert_eq!(value(&result, Metric::FirstAttemptP90), Some(7.25));
    }

    #[test]
    fn attempted_and_connected_only_count_qualified_leads() {
        let leads = [
            lead(true, true, true),
            lead(true, true, false),
            lead(false, true, true),
            lead(true, false, false),
        ];
        let refs: Vec<&LeadRecord> = leads.iter().collect();
        let result = compute_kpis(&refs);
        assert_eq!(result.get(Metric::LeadsCreated), Some(MetricValue::Count(4)));
        assert_eq!(result.get(Metric::QualifiedLeads), Some(MetricValue::Count(3)));
        assert_eq!(result.get(Metric::LeadsAttempted), Some(MetricValue::Count(2)));
        assert_eq!(result.get(Metric::LeadsConnected), Some(MetricValue::Count(1)));
        assert_eq!(value(&result, Metric::QualifiedPct), Some(75.0));
        assert_eq!(value(&result, Metric::AttemptPct), Some(2.0 / 3.0 * 100.0));
    }

    #[test]
    fn late_shares_use_all_contacted_leads() {
        let mut leads = Vec::new();
        for (hours, qualified) in [(5.0, true), (30.0, false), (24.0, true), (50.0, true)] {
            let mut l = lead(qualified, true, true);
            l.hours_to_first_attempt = Some(hours);
            l.hours_to_first_connect = Some(hours + 1.0);
            leads.push(l);
        }
        // contacted without a recorded attempt time still counts in the denominator
        leads.push(lead(true, true, false));
        let refs: Vec<&LeadRecord> = leads.iter().collect();
        let result = compute_kpis(&refs);
        // 30 and 50 are late out of 5 contacted
        assert_eq!(value(&result, Metric::AttemptedAfter24hPct), Some(40.0));
        // 31, 25 and 51 are late out of 4 connected
        assert_eq!(value(&result, Metric::ContactedAfter24hPct), Some(75.0));
    }

    #[test]
    fn percentiles_ignore_missing_hours() {
        let mut leads = Vec::new();
        for hours in [Some(1.0), None, Some(3.0), None] {
            let mut l = lead(false, false, false);
            l.hours_to_first_connect = hours;
            leads.push(l);
        }
        let refs: Vec<&LeadRecord> = leads.iter().collect();
        let result = compute_kpis(&refs);
        assert_eq!(value(&result, Metric::FirstConnectP50), Some(2.0));
        assert_eq!(value(&result, Metric::FirstAttemptP90), None);
    }

    #[test]
    fn labels_match_serde_names() {
        for metric in Metric::ALL {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.label()));
        }
    }
}
