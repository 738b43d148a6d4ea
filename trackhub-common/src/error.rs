//! Common error types for trackhub

use thiserror::Error;

/// Common result type for trackhub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the record model, the enrichment pipeline and
/// the store layer.
///
/// Variants are split into client-input errors (the caller violated a
/// precondition, reported with a 4xx-equivalent classification) and
/// internal errors (fatal to the current operation, detail stays in the
/// server logs). See [`Error::is_client_error`].
#[derive(Error, Debug)]
pub enum Error {
    /// Payload was not decodable as a tracker record
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The `_type` discriminator named a record kind this server does not handle
    #[error("unsupported record kind: {0:?}")]
    UnsupportedRecordKind(String),

    /// Location record carried no lat/lon pair
    #[error("lat,lon missing")]
    MissingCoordinates,

    /// A timestamp was required for localization but absent
    #[error("missing tst timestamp")]
    MissingTimestamp,

    /// Database operation error (wraps sqlx::Error)
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    /// A resolved zone name was not loadable from the tz database
    #[error("timezone resolution failed: {0}")]
    TimezoneResolution(String),

    /// A stored row failed to decode on a read path
    #[error("corrupt stored record: {0}")]
    CorruptStoredRecord(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid user input or request parameter
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller caused this error (4xx-equivalent).
    ///
    /// Client errors surface their message to the caller; everything else
    /// surfaces a generic message with detail confined to server logs.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedPayload(_)
                | Error::UnsupportedRecordKind(_)
                | Error::MissingCoordinates
                | Error::MissingTimestamp
                | Error::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::MissingCoordinates.is_client_error());
        assert!(Error::MissingTimestamp.is_client_error());
        assert!(Error::MalformedPayload("bad json".into()).is_client_error());
        assert!(Error::UnsupportedRecordKind("status".into()).is_client_error());
        assert!(Error::InvalidInput("user required".into()).is_client_error());

        assert!(!Error::TimezoneResolution("Mars/Olympus".into()).is_client_error());
        assert!(!Error::CorruptStoredRecord("row 3".into()).is_client_error());
        assert!(!Error::Internal("boom".into()).is_client_error());
    }
}
