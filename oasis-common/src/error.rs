//! Common error types for Oasis

use thiserror::Error;

use crate::result_code::ResultCode;

/// Common result type for Oasis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by Oasis crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Result code reported to the caller for this error
    pub fn code(&self) -> ResultCode {
        match self {
            Error::Config(_) => ResultCode::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_invalid_argument() {
        let err = Error::Config("missing frame_size".into());
        assert_eq!(err.code(), ResultCode::InvalidArgument);
        assert_eq!(err.to_string(), "Configuration error: missing frame_size");
    }
}
