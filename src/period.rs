use std::{fmt::Display, str::FromStr};

use chrono::{Datelike as _, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodParseError {
    #[error("invalid month \"{0}\". Use the format '%Y-%m', e.g. 2025-06")]
    InvalidMonth(String),
    #[error("invalid day cutoff \"{0}\". Use a day of the month between 1 and 31")]
    InvalidDayCutoff(String),
    #[error("invalid period \"{0}\". Use 'NAME=%Y-%m' or 'NAME=%Y-%m:DAY'")]
    InvalidSyntax(String),
}

/// A calendar month, written as `%Y-%m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Whether the timestamp falls in this month. Same result as comparing
    /// `timestamp.format("%Y-%m")` with this month's text form.
    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        timestamp.year() == self.year && timestamp.month() == self.month
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map(|date| Self { year: date.year(), month: date.month() })
            .map_err(|_| PeriodParseError::InvalidMonth(s.to_owned()))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = PeriodParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// A named reporting window: a calendar month, optionally cut off after a
/// given day of the month (a month-to-date window).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpec {
    pub name: String,
    pub month: YearMonth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_cutoff: Option<u32>,
}

impl PeriodSpec {
    pub fn new(name: impl Into<String>, month: YearMonth) -> Self {
        Self { name: name.into(), month, day_cutoff: None }
    }

    pub fn month_to_date(name: impl Into<String>, month: YearMonth, day_cutoff: u32) -> Self {
        Self { name: name.into(), month, day_cutoff: Some(day_cutoff) }
    }

    /// The time of day is ignored for the cutoff, and the timestamp is taken
    /// as-is without any timezone conversion.
    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        self.month.contains(timestamp)
            && self.day_cutoff.map_or(true, |cutoff| timestamp.day() <= cutoff)
    }
}

/// Parses the command-line form `NAME=%Y-%m` or `NAME=%Y-%m:DAY`. The name may
/// itself contain `=`; only the last one separates it from the month.
impl FromStr for PeriodSpec {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, window)) = s.rsplit_once('=') else {
            return Err(PeriodParseError::InvalidSyntax(s.to_owned()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(PeriodParseError::InvalidSyntax(s.to_owned()));
        }

        let (month, day_cutoff) = match window.split_once(':') {
            Some((month, day)) => {
                let day = day.trim();
                let day_cutoff = day
                    .parse::<u32>()
                    .ok()
                    .filter(|d| (1..=31).contains(d))
                    .ok_or_else(|| PeriodParseError::InvalidDayCutoff(day.to_owned()))?;
                (month.parse()?, Some(day_cutoff))
            }
            None => (window.parse()?, None),
        };

        Ok(Self { name: name.to_owned(), month, day_cutoff })
    }
}

impl Display for PeriodSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.day_cutoff {
            Some(day) => write!(f, "{}={}:{}", self.name, self.month, day),
            None => write!(f, "{}={}", self.name, self.month),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
        )
    }

    #[test]
    fn parses_year_month() {
        let month: YearMonth = "2025-06".parse().unwrap();
        assert_eq!((month.year(), month.month()), (2025, 6));
        assert_eq!(month.to_string(), "2025-06");
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("June".parse::<YearMonth>().is_err());
    }

    #[test]
    fn month_to_date_cutoff_is_inclusive() {
        let june = PeriodSpec::month_to_date("June MTD", YearMonth::new(2025, 6).unwrap(), 19);
        assert!(june.contains(&at(2025, 6, 19, 23)));
        assert!(!june.contains(&at(2025, 6, 20, 0)));
        assert!(june.contains(&at(2025, 6, 1, 0)));
        assert!(!june.contains(&at(2025, 5, 19, 12)));
    }

    #[test]
    fn whole_month_ignores_day() {
        let may = PeriodSpec::new("May", YearMonth::new(2025, 5).unwrap());
        assert!(may.contains(&at(2025, 5, 31, 23)));
        assert!(!may.contains(&at(2024, 5, 10, 0)));
    }

    #[test]
    fn parses_command_line_form() {
        let spec: PeriodSpec = "June MTD (till 19th)=2025-06:19".parse().unwrap();
        assert_eq!(spec.name, "June MTD (till 19th)");
        assert_eq!(spec.month, YearMonth::new(2025, 6).unwrap());
        assert_eq!(spec.day_cutoff, Some(19));

        let spec: PeriodSpec = "April=2025-04".parse().unwrap();
        assert_eq!(spec.day_cutoff, None);
        assert_eq!(spec.to_string(), "April=2025-04");
    }

    #[test]
    fn rejects_bad_command_line_forms() {
        assert_eq!(
            "April".parse::<PeriodSpec>(),
            Err(PeriodParseError::InvalidSyntax("April".to_owned()))
        );
        assert_eq!(
            "June=2025-06:40".parse::<PeriodSpec>(),
            Err(PeriodParseError::InvalidDayCutoff("40".to_owned()))
        );
        assert!("=2025-06".parse::<PeriodSpec>().is_err());
    }

    #[test]
    fn serde_uses_text_month() {
        let spec: PeriodSpec =
            serde_json::from_str(r#"{"name":"June MTD","month":"2025-06","day_cutoff":19}"#)
                .unwrap();
        assert_eq!(spec.day_cutoff, Some(19));
        let json = serde_json::to_string(&PeriodSpec::new("May", "2025-05".parse().unwrap()))
            .unwrap();
        assert_eq!(json, r#"{"name":"May","month":"2025-05"}"#);
    }
}
