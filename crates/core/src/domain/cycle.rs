// Cycle Domain Model

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write};
use std::str::FromStr;

use super::error::{DomainError, Result};

/// POSIX cycle format used on the command line and in file names
pub const GLOBAL_FORMAT: &str = "%Y%m%d%H%M%S";

/// ISO-8601 format expected by the SOCA configuration files
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Analysis cycle (naive UTC date-time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle(NaiveDateTime);

impl Cycle {
    /// Parse a cycle in `%Y%m%d%H%M%S`.
    ///
    /// Parsing is strict: the value must re-format to exactly the input,
    /// so `2000010100` or `2000-01-01 00:00:00` are rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let datetime = NaiveDateTime::parse_from_str(value, GLOBAL_FORMAT)
            .map_err(|_| invalid_timestamp(value, GLOBAL_FORMAT))?;

        if datetime.format(GLOBAL_FORMAT).to_string() != value {
            return Err(invalid_timestamp(value, GLOBAL_FORMAT));
        }

        Ok(Self(datetime))
    }

    /// Build a cycle from the workflow `PDY` (`%Y%m%d`) and `cyc` (`%H`) values
    pub fn from_pdy_cyc(pdy: &str, cyc: &str) -> Result<Self> {
        check_format(pdy, "%Y%m%d")?;
        check_format(cyc, "%H")?;
        Self::parse(&format!("{pdy}{cyc}0000"))
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Shift the cycle by a signed number of seconds.
    ///
    /// Offsets come straight from the experiment configuration, so a shift
    /// that leaves the representable calendar is an error.
    pub fn offset(&self, seconds: i64) -> Result<Self> {
        TimeDelta::try_seconds(seconds)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
            .ok_or_else(|| DomainError::OffsetOutOfRange {
                cycle: self.to_string(),
                seconds,
            })
    }

    /// Signed number of seconds from `self` to `other`
    pub fn seconds_until(&self, other: &Cycle) -> i64 {
        (other.0 - self.0).num_seconds()
    }

    /// Render a strftime pattern at this cycle.
    ///
    /// Unknown directives and directives that need a time zone (`%z`)
    /// are reported instead of panicking inside `Display`.
    pub fn format(&self, pattern: &str) -> Result<String> {
        let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(DomainError::InvalidTemplate {
                template: pattern.to_string(),
                reason: "unrecognized strftime directive".to_string(),
            });
        }

        let mut rendered = String::with_capacity(pattern.len() + 16);
        write!(rendered, "{}", self.0.format_with_items(items.into_iter())).map_err(|_| {
            DomainError::InvalidTemplate {
                template: pattern.to_string(),
                reason: "directive cannot be rendered for a naive UTC time".to_string(),
            }
        })?;

        Ok(rendered)
    }

    pub fn to_iso(&self) -> String {
        self.0.format(ISO_FORMAT).to_string()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(GLOBAL_FORMAT))
    }
}

impl FromStr for Cycle {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Cycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // YAML writers often emit unquoted cycles as integers
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a %Y%m%d%H%M%S timestamp, found {other:?}"
                )))
            }
        };
        Cycle::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Check that `value` is strictly formatted according to `format`.
///
/// Supports date-time, date-only and time-only formats (e.g. `%H`).
pub fn check_format(value: &str, format: &str) -> Result<()> {
    let rendered = NaiveDateTime::parse_from_str(value, format)
        .map(|dt| dt.format(format).to_string())
        .or_else(|_| NaiveDate::parse_from_str(value, format).map(|d| d.format(format).to_string()))
        .or_else(|_| {
            // chrono needs minutes to build a time; pad them on
            NaiveTime::parse_from_str(&format!("{value}00"), &format!("{format}%M"))
                .map(|t| t.format(format).to_string())
        })
        .map_err(|_| invalid_timestamp(value, format))?;

    if rendered != value {
        return Err(invalid_timestamp(value, format));
    }

    Ok(())
}

fn invalid_timestamp(value: &str, format: &str) -> DomainError {
    DomainError::InvalidTimestamp {
        value: value.to_string(),
        format: format.to_string(),
    }
}
