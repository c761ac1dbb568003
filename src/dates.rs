use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::TallyError;

const SAMPLE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Iso,
    MonthDayYear,
    DayMonthYear,
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Iso => "YYYY-MM-DD",
            Self::MonthDayYear => "MM/DD/YYYY",
            Self::DayMonthYear => "DD/MM/YYYY",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DateFormat {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "YYYY-MM-DD" | "YYYY/MM/DD" => Ok(Self::Iso),
            "MM/DD/YYYY" => Ok(Self::MonthDayYear),
            "DD/MM/YYYY" => Ok(Self::DayMonthYear),
            other => Err(TallyError::UnknownDateFormat(other.to_string())),
        }
    }
}

/// Infer which date layout a column uses from a sample of its values.
///
/// Samples up to 20 non-empty values. A component larger than 12 pins the
/// layout to day-first or month-first; purely ambiguous samples count for
/// both slashed layouts, and DD/MM/YYYY wins when nothing disambiguates.
pub fn detect_date_format(values: &[String]) -> DateFormat {
    let iso_re = Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$");
    let slashed_re = Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/]\d{2,4}$");
    let (Ok(iso_re), Ok(slashed_re)) = (iso_re, slashed_re) else {
        return DateFormat::DayMonthYear;
    };

    let mut iso = 0u32;
    let mut mdy = 0u32;
    let mut dmy = 0u32;
    let mut forced_dmy = false;
    let mut forced_mdy = false;

    let samples = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .take(SAMPLE_LIMIT);

    for raw in samples {
        if iso_re.is_match(raw) {
            iso += 1;
            continue;
        }
        if let Some(caps) = slashed_re.captures(raw) {
            let p1: u32 = caps[1].parse().unwrap_or(0);
            let p2: u32 = caps[2].parse().unwrap_or(0);
            if p1 > 12 {
                forced_dmy = true;
                dmy += 1;
            } else if p2 > 12 {
                forced_mdy = true;
                mdy += 1;
            } else {
                mdy += 1;
                dmy += 1;
            }
        }
    }

    if forced_dmy && !forced_mdy {
        return DateFormat::DayMonthYear;
    }
    if forced_mdy && !forced_dmy {
        return DateFormat::MonthDayYear;
    }
    if iso > mdy && iso > dmy {
        DateFormat::Iso
    } else if mdy > dmy {
        DateFormat::MonthDayYear
    } else {
        DateFormat::DayMonthYear
    }
}

/// Parse a raw value using the given layout. Two-digit years are taken as
/// 20xx. Dates that do not round-trip (Feb 30 and friends) come back `None`.
pub fn parse_date(raw: &str, format: DateFormat) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split(['-', '/']).collect();
    if parts.len() != 3 {
        return None;
    }
    let (y, m, d) = match format {
        DateFormat::Iso => (parts[0], parts[1], parts[2]),
        DateFormat::MonthDayYear => (parts[2], parts[0], parts[1]),
        DateFormat::DayMonthYear => (parts[2], parts[1], parts[0]),
    };
    let mut year: i32 = y.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let month: u32 = m.parse().ok()?;
    let day: u32 = d.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
