//! Value history: what gets recorded and how it is queried back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::ControlAddress;
use crate::time::Timestamp;

/// Bucketing applied to recorded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Raw rows, newest first.
    Realtime,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Realtime => "realtime",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        })
    }
}

/// Aggregate computed over one bucket. Ignored for [`Period::Realtime`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    Average,
    /// `max - min` within the bucket; meters use this for consumption.
    Delta,
    Max,
    Min,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Average => "average",
            Self::Delta => "delta",
            Self::Max => "max",
            Self::Min => "min",
        })
    }
}

/// Query issued to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub address: ControlAddress,
    pub period: Period,
    pub aggregate: Aggregate,
    pub offset: u32,
    pub amount: u32,
}

/// One row returned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    /// Unix seconds of the row (or of the bucket start).
    pub time: i64,
    pub unit: String,
    pub value: Option<f64>,
}

/// One point of a history result sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time: i64,
    pub value: Option<f64>,
}

impl From<&HistoryRow> for HistoryPoint {
    fn from(row: &HistoryRow) -> Self {
        Self {
            time: row.time,
            value: row.value,
        }
    }
}

/// A value change as handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChangeRecord {
    pub address: ControlAddress,
    pub unit: String,
    pub value: String,
    pub numeric_value: Option<f64>,
    pub recorded_at: Timestamp,
}

impl ValueChangeRecord {
    /// Build a record, deriving the numeric value from the raw one.
    #[must_use]
    pub fn new(
        address: ControlAddress,
        unit: impl Into<String>,
        value: impl Into<String>,
        recorded_at: Timestamp,
    ) -> Self {
        let value = value.into();
        Self {
            numeric_value: numeric_value(&value),
            address,
            unit: unit.into(),
            value,
            recorded_at,
        }
    }
}

/// Numeric reading of a raw value: `on`/`true` → 1, `off`/`false` → 0,
/// otherwise the parsed number.
#[must_use]
pub fn numeric_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("on") || trimmed.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if trimmed.eq_ignore_ascii_case("off") || trimmed.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_switch_words_to_numbers() {
        assert_eq!(numeric_value("on"), Some(1.0));
        assert_eq!(numeric_value("TRUE"), Some(1.0));
        assert_eq!(numeric_value("off"), Some(0.0));
        assert_eq!(numeric_value("False"), Some(0.0));
    }

    #[test]
    fn should_parse_decimal_readings() {
        assert_eq!(numeric_value(" 21.5 "), Some(21.5));
        assert_eq!(numeric_value("-3"), Some(-3.0));
    }

    #[test]
    fn should_return_none_for_non_numeric_values() {
        assert_eq!(numeric_value("#ff0000"), None);
        assert_eq!(numeric_value(""), None);
        assert_eq!(numeric_value("NaN"), None);
    }

    #[test]
    fn should_derive_numeric_value_when_building_record() {
        let record = ValueChangeRecord::new(
            ControlAddress::new("mesh", "4", "49.1"),
            "°C",
            "19.25",
            crate::time::now(),
        );
        assert_eq!(record.numeric_value, Some(19.25));
    }

    #[test]
    fn should_default_aggregate_to_average() {
        assert_eq!(Aggregate::default(), Aggregate::Average);
        assert_eq!(Period::Weekly.to_string(), "weekly");
    }
}
