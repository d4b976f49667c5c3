//! Error types for cachetree

use std::fmt;

/// Result type alias for cachetree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache construction and input decoding
///
/// Lookups never fail on missing data; these variants only cover misuse.
#[derive(Debug)]
pub enum Error {
    /// Field schema has no fields
    EmptySchema,

    /// Field name appears more than once in the schema
    DuplicateField(String),

    /// Capacity must be at least 1
    InvalidCapacity(usize),

    /// Filter omits a schema field where every field is required
    MissingField(String),

    /// Input value is not a record (or a list of records)
    InvalidRecord(String),

    /// Text filter could not be parsed
    Parse(String),

    /// JSON decoding error
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptySchema => write!(f, "Field schema is empty"),
            Error::DuplicateField(name) => write!(f, "Duplicate schema field: {}", name),
            Error::InvalidCapacity(n) => write!(f, "Invalid capacity: {} (min 1)", n),
            Error::MissingField(name) => write!(f, "Filter is missing field: {}", name),
            Error::InvalidRecord(msg) => write!(f, "Invalid record: {}", msg),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                Error::Parse(format!("unexpected input at {:?}", e.input))
            }
            nom::Err::Incomplete(_) => Error::Parse("incomplete input".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::InvalidCapacity(0).to_string(), "Invalid capacity: 0 (min 1)");
        assert_eq!(
            Error::MissingField("age".to_string()).to_string(),
            "Filter is missing field: age"
        );
    }

    #[test]
    fn test_json_source() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
