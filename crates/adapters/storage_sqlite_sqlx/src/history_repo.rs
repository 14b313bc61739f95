//! `SQLite` implementation of [`HistoryStore`].

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homelink_app::ports::HistoryStore;
use homelink_domain::error::HubError;
use homelink_domain::history::{Aggregate, HistoryQuery, HistoryRow, Period, ValueChangeRecord};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(HistoryRow);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let time: i64 = row.try_get("time")?;
        let unit: Option<String> = row.try_get("unit")?;
        let value: Option<f64> = row.try_get("value")?;

        Ok(Self(HistoryRow {
            time,
            unit: unit.unwrap_or_default(),
            value,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO home_history
        (time, controller_identifier, node_identifier, value_identifier, unit, value, value_d)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";

const SELECT_REALTIME: &str = r"
    SELECT time, unit, value_d AS value FROM home_history
    WHERE controller_identifier = ? AND node_identifier = ? AND value_identifier = ?
    ORDER BY time DESC
    LIMIT ? OFFSET ?
";

/// Start of the bucket holding `time`, as a date string.
fn bucket(period: Period) -> &'static str {
    match period {
        Period::Realtime | Period::Daily => "date(time, 'unixepoch')",
        // Back to the last Monday, or stay on it.
        Period::Weekly => "date(time, 'unixepoch', '-6 days', 'weekday 1')",
        Period::Monthly => "date(time, 'unixepoch', 'start of month')",
    }
}

fn aggregate(aggregate: Aggregate) -> &'static str {
    match aggregate {
        Aggregate::Average => "AVG(value_d)",
        Aggregate::Delta => "MAX(value_d) - MIN(value_d)",
        Aggregate::Max => "MAX(value_d)",
        Aggregate::Min => "MIN(value_d)",
    }
}

fn select_bucketed(period: Period, agg: Aggregate) -> String {
    format!(
        r"
    SELECT CAST(strftime('%s', {bucket}) AS INTEGER) AS time, MAX(unit) AS unit, {aggregate} AS value
    FROM home_history
    WHERE controller_identifier = ? AND node_identifier = ? AND value_identifier = ?
    GROUP BY 1
    ORDER BY 1 DESC
    LIMIT ? OFFSET ?
",
        bucket = bucket(period),
        aggregate = aggregate(agg),
    )
}

/// `SQLite`-backed history store.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn insert_value_change(&self, record: ValueChangeRecord) -> Result<(), HubError> {
        sqlx::query(INSERT)
            .bind(record.recorded_at.timestamp())
            .bind(&record.address.controller_id)
            .bind(&record.address.node_id)
            .bind(&record.address.value_id)
            .bind(&record.unit)
            .bind(&record.value)
            .bind(record.numeric_value)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn select_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRow>, HubError> {
        let sql = match query.period {
            Period::Realtime => SELECT_REALTIME.to_string(),
            period => select_bucketed(period, query.aggregate),
        };
        let rows: Vec<Wrapper> = sqlx::query_as(&sql)
            .bind(&query.address.controller_id)
            .bind(&query.address.node_id)
            .bind(&query.address.value_id)
            .bind(i64::from(query.amount))
            .bind(i64::from(query.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
