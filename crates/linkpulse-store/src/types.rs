//! Domain types for the LinkPulse result store.

use time::OffsetDateTime;

/// Sentinel server name/country written for failed attempts.
pub const NO_SERVER: &str = "n/a";

/// One persisted measurement attempt, success or failure.
///
/// A failed attempt always has all three measurement fields `None` and
/// both server fields set to [`NO_SERVER`]. Records are immutable once
/// written.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Monotonically increasing identifier assigned on insert.
    pub id: i64,
    /// Download throughput in Mbps; `None` when the attempt failed.
    pub download_mbps: Option<f64>,
    /// Upload throughput in Mbps; `None` when the attempt failed.
    pub upload_mbps: Option<f64>,
    /// Latency in milliseconds; `None` when the attempt failed.
    pub ping_ms: Option<f64>,
    /// Sponsor name of the measurement server.
    pub server_name: String,
    /// Country of the measurement server.
    pub server_country: String,
    /// UTC instant of attempt completion.
    pub timestamp: OffsetDateTime,
    /// Whether the attempt produced measurements.
    pub success: bool,
}

/// Insert form of a record: no id yet, timestamp optional.
///
/// The constructors enforce the failure invariant, so callers cannot
/// build a partial failure row with some fields set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub ping_ms: Option<f64>,
    pub server_name: String,
    pub server_country: String,
    /// Assigned by the store at append time when `None`.
    pub timestamp: Option<OffsetDateTime>,
    pub success: bool,
}

impl NewRecord {
    /// A successful attempt. Ping may be absent (legacy tool output).
    pub fn success(
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: Option<f64>,
        server_name: impl Into<String>,
        server_country: impl Into<String>,
    ) -> Self {
        Self {
            download_mbps: Some(download_mbps),
            upload_mbps: Some(upload_mbps),
            ping_ms,
            server_name: server_name.into(),
            server_country: server_country.into(),
            timestamp: None,
            success: true,
        }
    }

    /// A failed attempt: no measurements, sentinel server fields.
    pub fn failure() -> Self {
        Self {
            download_mbps: None,
            upload_mbps: None,
            ping_ms: None,
            server_name: NO_SERVER.to_string(),
            server_country: NO_SERVER.to_string(),
            timestamp: None,
            success: false,
        }
    }

    /// Pin the record to an explicit completion instant.
    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn failure_has_sentinels_and_no_measurements() {
        let record = NewRecord::failure();
        assert!(!record.success);
        assert_eq!(record.download_mbps, None);
        assert_eq!(record.upload_mbps, None);
        assert_eq!(record.ping_ms, None);
        assert_eq!(record.server_name, NO_SERVER);
        assert_eq!(record.server_country, NO_SERVER);
    }

    #[test]
    fn success_carries_measurements() {
        let record = NewRecord::success(95.2, 11.4, Some(18.0), "ExampleNet", "DE");
        assert!(record.success);
        assert_eq!(record.download_mbps, Some(95.2));
        assert_eq!(record.upload_mbps, Some(11.4));
        assert_eq!(record.ping_ms, Some(18.0));
    }

    #[test]
    fn at_pins_timestamp() {
        let ts = datetime!(2026-08-30 12:00 UTC);
        let record = NewRecord::failure().at(ts);
        assert_eq!(record.timestamp, Some(ts));
    }
}
