pub mod logging;

pub use logging::LogState;

/// Wall-clock time as fractional Unix seconds, the timestamp format used on the wire.
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
