//! History requests: answering them, and an in-memory store.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};

use homelink_domain::error::HubError;
use homelink_domain::history::{
    Aggregate, HistoryPoint, HistoryQuery, HistoryRow, Period, ValueChangeRecord,
};
use homelink_domain::message::{AddressedMessage, Payload};

use crate::ports::HistoryStore;

/// Answer a `HistoryRequest` through `store`.
///
/// `title` names the value (usually the controller's `value_name`). Returns
/// `None` for any other payload. Storage failures are logged and answered
/// with an empty result.
pub async fn answer(
    store: &dyn HistoryStore,
    request: &AddressedMessage,
    title: String,
) -> Option<AddressedMessage> {
    let Payload::HistoryRequest {
        period,
        aggregate,
        offset,
        amount,
    } = request.payload
    else {
        return None;
    };

    let query = HistoryQuery {
        address: request.address.clone(),
        period,
        aggregate,
        offset,
        amount,
    };
    let rows = store.select_history(&query).await.unwrap_or_else(|err| {
        tracing::error!(address = %query.address, error = %err, "history query failed");
        Vec::new()
    });

    let unit = rows
        .iter()
        .map(|row| row.unit.as_str())
        .find(|unit| !unit.is_empty())
        .unwrap_or_default()
        .to_string();
    let points = rows.iter().map(HistoryPoint::from).collect();

    Some(AddressedMessage::new(
        request.address.clone(),
        Payload::HistoryResult {
            title,
            unit,
            offset,
            points,
        },
    ))
}

/// History kept in memory. Buckets are computed on read.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<ValueChangeRecord>>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded change, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<ValueChangeRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn insert_value_change(&self, record: ValueChangeRecord) -> Result<(), HubError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }

    async fn select_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRow>, HubError> {
        let matching: Vec<ValueChangeRecord> = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.address == query.address)
            .cloned()
            .collect();

        let mut rows = match query.period {
            Period::Realtime => matching
                .iter()
                .map(|record| HistoryRow {
                    time: record.recorded_at.timestamp(),
                    unit: record.unit.clone(),
                    value: record.numeric_value,
                })
                .collect(),
            period => bucketed(&matching, period, query.aggregate),
        };

        rows.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.amount as usize)
            .collect())
    }
}

fn bucket_start(date: NaiveDate, period: Period) -> NaiveDate {
    match period {
        Period::Weekly => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
        Period::Monthly => date.with_day(1).unwrap_or(date),
        Period::Realtime | Period::Daily => date,
    }
}

fn bucketed(records: &[ValueChangeRecord], period: Period, aggregate: Aggregate) -> Vec<HistoryRow> {
    let mut buckets: BTreeMap<NaiveDate, (String, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let start = bucket_start(record.recorded_at.date_naive(), period);
        let bucket = buckets
            .entry(start)
            .or_insert_with(|| (record.unit.clone(), Vec::new()));
        if let Some(value) = record.numeric_value {
            bucket.1.push(value);
        }
    }

    buckets
        .into_iter()
        .filter_map(|(start, (unit, values))| {
            let time = start.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
            Some(HistoryRow {
                time,
                unit,
                value: aggregate_values(&values, aggregate),
            })
        })
        .collect()
}

fn aggregate_values(values: &[f64], aggregate: Aggregate) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    Some(match aggregate {
        #[allow(clippy::cast_precision_loss)]
        Aggregate::Average => values.iter().sum::<f64>() / values.len() as f64,
        Aggregate::Delta => max - min,
        Aggregate::Max => max,
        Aggregate::Min => min,
    })
}
