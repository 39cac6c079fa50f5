//! Value model errors.

use thiserror::Error;

/// Result type used by the value model.
pub type ValueResult<T> = Result<T, ValueError>;

/// Failure converting between typed data and [`crate::Value`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The data could not be (de)serialized into the requested shape.
    #[error("value conversion failed: {0}")]
    Conversion(String),
}

impl From<serde_json::Error> for ValueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Conversion(err.to_string())
    }
}
