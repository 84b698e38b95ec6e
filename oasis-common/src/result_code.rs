//! Result codes surfaced to callers of the pipeline
//!
//! Every failure in the workspace maps onto one of these codes. The
//! description strings and exit codes are stable: scripts and the CLI
//! rely on them, so new codes are only ever appended.

use std::fmt;

/// Outcome of a top-level pipeline call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    Error,
    InvalidArgument,
    MemoryAllocation,
    FileNotFound,
    FileNotMedia,
    UnsupportedFormat,
    UnsupportedCodec,
    UnsupportedOperation,
    Unknown,
}

impl ResultCode {
    /// All codes in exit-code order
    pub const ALL: [ResultCode; 10] = [
        ResultCode::Success,
        ResultCode::Error,
        ResultCode::InvalidArgument,
        ResultCode::MemoryAllocation,
        ResultCode::FileNotFound,
        ResultCode::FileNotMedia,
        ResultCode::UnsupportedFormat,
        ResultCode::UnsupportedCodec,
        ResultCode::UnsupportedOperation,
        ResultCode::Unknown,
    ];

    /// Human-readable description used in logs and CLI output
    pub fn description(self) -> &'static str {
        match self {
            ResultCode::Success => "Success",
            ResultCode::Error => "Error",
            ResultCode::InvalidArgument => "Invalid argument",
            ResultCode::MemoryAllocation => "Memory allocation error",
            ResultCode::FileNotFound => "File not found",
            ResultCode::FileNotMedia => "File is not a media file",
            ResultCode::UnsupportedFormat => "Unsupported format",
            ResultCode::UnsupportedCodec => "Unsupported codec",
            ResultCode::UnsupportedOperation => "Unsupported operation",
            ResultCode::Unknown => "Unknown error",
        }
    }

    /// Process exit code for this result
    pub fn exit_code(self) -> u8 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Error => 1,
            ResultCode::InvalidArgument => 2,
            ResultCode::MemoryAllocation => 3,
            ResultCode::FileNotFound => 4,
            ResultCode::FileNotMedia => 5,
            ResultCode::UnsupportedFormat => 6,
            ResultCode::UnsupportedCodec => 7,
            ResultCode::UnsupportedOperation => 8,
            ResultCode::Unknown => 9,
        }
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exit_codes_are_unique_and_ordered() {
        let codes: Vec<u8> = ResultCode::ALL.iter().map(|c| c.exit_code()).collect();
        let unique: HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), ResultCode::ALL.len());
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ResultCode::Success.exit_code(), 0);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(ResultCode::FileNotMedia.to_string(), "File is not a media file");
        assert_eq!(ResultCode::MemoryAllocation.description(), "Memory allocation error");
        assert!(ResultCode::Success.is_success());
        assert!(!ResultCode::Unknown.is_success());
    }
}
