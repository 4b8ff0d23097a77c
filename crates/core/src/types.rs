/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// One materialized result row, keyed by field name.
pub type Row = serde_json::Map<String, serde_json::Value>;
