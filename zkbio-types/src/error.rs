pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Truncated {record} record: expected {expected} bytes, got {actual}")]
    TruncatedRecord {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Text is not representable in {encoding}: {reason}")]
    Encoding {
        encoding: &'static str,
        reason: String,
    },

    #[error("Unknown text encoding label: {0}")]
    UnknownEncoding(String),

    #[error("Field `{field}` too long: {actual} bytes (max: {max})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

impl Error {
    pub(crate) fn truncated(record: &'static str, expected: usize, actual: usize) -> Self {
        Self::TruncatedRecord {
            record,
            expected,
            actual,
        }
    }
}
