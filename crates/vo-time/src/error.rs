//! Time errors.

use thiserror::Error;
use vo_time_core::Duration;

#[derive(Debug, Error)]
pub enum TimeError {
    /// Binary encoding needs a zone offset in whole minutes
    #[error("Time.MarshalBinary: zone offset has fractional minute")]
    FractionalMinuteOffset,

    /// Zone offset (in minutes) cannot be encoded
    #[error("Time.MarshalBinary: unexpected zone offset {0}")]
    OffsetOutOfRange(i32),

    #[error("Time.UnmarshalBinary: no data")]
    NoData,

    #[error("Time.UnmarshalBinary: unsupported version {0}")]
    UnsupportedVersion(u8),

    #[error("Time.UnmarshalBinary: invalid length {0}")]
    InvalidLength(usize),

    #[error("Time.UnmarshalBinary: nanoseconds {0} outside [0, 999999999]")]
    InvalidNanoseconds(i32),

    /// Text forms only cover four-digit years
    #[error("year {0} outside of range [0,9999]")]
    YearOutOfRange(i64),

    /// Text forms write the offset as `±hh:mm` with hours below 24
    #[error("zone offset {0}s cannot be written as [-+]hh:mm")]
    TextOffset(i32),

    #[error("parsing time {value:?}: {reason}")]
    Parse { value: String, reason: String },

    #[error("non-positive interval {0} for ticker")]
    NonPositiveInterval(Duration),

    #[error("invalid zone table: {0}")]
    InvalidZoneTable(String),

    /// The process-wide context was already initialised
    #[error("time context already installed")]
    ContextInstalled,

    #[error("failed to start timer thread")]
    TimerUnavailable(#[source] std::io::Error),
}

impl TimeError {
    pub(crate) fn parse(value: &str, reason: impl Into<String>) -> Self {
        TimeError::Parse {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
