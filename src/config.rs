use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    leads::columns,
    period::{PeriodSpec, YearMonth},
    tools::kpi::Metric,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("error deserializing config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("period name \"{0}\" is used more than once")]
    DuplicatePeriod(String),
    #[error("period \"{name}\" has day cutoff {day}, which is not a day of the month")]
    InvalidDayCutoff { name: String, day: u32 },
}

/// Everything the report engine needs besides the input table. Fields missing
/// from a config file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Maps input column names to the canonical names the engine expects.
    pub column_renames: BTreeMap<String, String>,
    /// Reporting periods, in the order their columns appear in the report.
    pub periods: Vec<PeriodSpec>,
    /// The KPI group shown next to each metric. Metrics without a group get a
    /// blank cell.
    pub kpi_groups: BTreeMap<Metric, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let column_renames = [
            ("is Lead Called?", columns::CALLED),
            ("is Lead Connected?", columns::CONNECTED),
            ("TimeDiffLeadAttempt", columns::ATTEMPT_HOURS),
            ("TimeDiffLeadConnect", columns::CONNECT_HOURS),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_owned(), to.to_owned()))
        .collect();

        let year_month =
            |year, month| YearMonth::new(year, month).expect("hardcoded month should be valid");
        let periods = vec![
            PeriodSpec::new("April", year_month(2025, 4)),
            PeriodSpec::new("May", year_month(2025, 5)),
            PeriodSpec::month_to_date("June MTD (till 19th)", year_month(2025, 6), 19),
        ];

        let kpi_groups = Metric::ALL
            .into_iter()
            .map(|metric| (metric, metric.default_group().to_owned()))
            .collect();

        Self { column_renames, periods, kpi_groups }
    }
}

impl ReportConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        info!("Loaded report config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for period in &self.periods {
            if !seen.insert(period.name.as_str()) {
                return Err(ConfigError::DuplicatePeriod(period.name.clone()));
            }
            if let Some(day) = period.day_cutoff {
                if !(1..=31).contains(&day) {
                    return Err(ConfigError::InvalidDayCutoff { name: period.name.clone(), day });
                }
            }
        }
        Ok(())
    }

    /// Replaces the configured periods, e.g. with ones given on the command
    /// line.
    pub fn with_periods(self, periods: Vec<PeriodSpec>) -> Result<Self, ConfigError> {
        let config = Self { periods, ..self };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn default_config_matches_lead_master_layout() {
        let config = ReportConfig::default();
        assert_eq!(config.column_renames["is Lead Called?"], "is_Lead_Called");
        assert_eq!(
            config.periods.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["April", "May", "June MTD (till 19th)"]
        );
        assert_eq!(config.periods[2].day_cutoff, Some(19));
        assert_eq!(config.kpi_groups.len(), Metric::ALL.len());
        assert_eq!(config.kpi_groups[&Metric::LeadsCreated], "Lead Vol");
        assert_eq!(config.kpi_groups[&Metric::ContactedAfter24hPct], "Lead Connect");
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{
                "periods": [{{ "name": "Q3 start", "month": "2025-07", "day_cutoff": 10 }}],
                "kpi_groups": {{ "# of Leads Created (Salesforce)": "Volume" }}
            }}"##
        )
        .unwrap();

        let config = ReportConfig::from_file(file.path()).unwrap();
        assert_eq!(config.column_renames, ReportConfig::default().column_renames);
        assert_eq!(config.periods.len(), 1);
        assert_eq!(config.periods[0].month, YearMonth::new(2025, 7).unwrap());
        assert_eq!(config.kpi_groups.len(), 1);
        assert_eq!(config.kpi_groups[&Metric::LeadsCreated], "Volume");
    }

    #[test]
    fn unknown_metric_label_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r##"{{ "kpi_groups": {{ "# of Unicorns": "Lead Vol" }} }}"##).unwrap();
        assert!(matches!(ReportConfig::from_file(file.path()), Err(ConfigError::Json(_))));
    }

    #[test]
    fn duplicate_period_names_are_rejected() {
        let periods = vec![
            "May=2025-05".parse().unwrap(),
            "May=2024-05".parse().unwrap(),
        ];
        let err = ReportConfig::default().with_periods(periods).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePeriod(name) if name == "May"));
    }

    #[test]
    fn out_of_range_cutoff_is_rejected() {
        let periods =
            vec![PeriodSpec::month_to_date("June", YearMonth::new(2025, 6).unwrap(), 0)];
        let err = ReportConfig::default().with_periods(periods).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDayCutoff { day: 0, .. }));
    }
}
