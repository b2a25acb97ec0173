//! ClickHouse table schemas.

/// DDL for the analytics table.
///
/// Rows are append-only facts; redelivered messages produce duplicate rows,
/// which readers must tolerate.
pub fn create_analytics_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    user_id String,
    movie_id String,
    timestamp_ms Int64,

    inserted_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(fromUnixTimestamp64Milli(timestamp_ms))
ORDER BY (user_id, movie_id, timestamp_ms)
"#
    )
}

/// Columns written by the pipeline, in insert order.
pub const ANALYTICS_COLUMNS: &[&str] = &["user_id", "movie_id", "timestamp_ms"];
