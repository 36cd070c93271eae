use derive_more::{Display, Error};

/// Reasons a grid power sample could not be taken.
///
/// The sampler treats all of them the same way (log, keep the previous
/// value); the variants exist for the log line.
#[derive(Debug, Display, Error)]
pub enum MeterError {
    /// Wi-Fi is not associated
    #[display("network link is down")]
    NetworkDown,
    /// DNS, TCP or HTTP-level failure
    #[display("transport error: {_0}")]
    Transport(#[error(not(source))] String),
    /// The inverter answered with a non-200 HTTP status
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The Solar API reported an error in its response header
    #[display("inverter reported status {code}: {reason}")]
    ApiStatus { code: i32, reason: String },
    /// The response body did not fit the read buffer
    #[display("response exceeds {_0} bytes")]
    ResponseTooLarge(#[error(not(source))] usize),
    /// The body was not the expected JSON document
    #[display("malformed response: {_0}")]
    Parse(#[error(source)] serde_json::Error),
    /// The document had no grid power value
    #[display("response has no Body.Data[\"0\"].PowerReal_P_Sum")]
    MissingField,
}

impl From<serde_json::Error> for MeterError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}
