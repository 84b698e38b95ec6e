//! Error types for oasis-ap
//!
//! One variant per failure the pipeline can report. Every variant maps to a
//! stable [`ResultCode`] through [`Error::code`].

use oasis_common::ResultCode;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for oasis-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an unusable value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Input path does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Container could not be opened or recognized
    #[error("Failed to open {}: {reason}", path.display())]
    OpenFailed { path: PathBuf, reason: String },

    /// Container holds no decodable audio track
    #[error("No audio stream found in {}", .0.display())]
    NoAudioStream(PathBuf),

    /// No decoder registered for the track's codec
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Decoder could not be created from the track parameters
    #[error("Decoder initialization failed: {0}")]
    DecoderInitFailed(String),

    /// Codec reported malformed data
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// Stream decoded to zero frames
    #[error("No audio frames decoded from {}", .0.display())]
    EmptyStream(PathBuf),

    /// Sample layout or format cannot be represented
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A frame's format differs from the first frame of the stream
    #[error("Frame {index} format mismatch: expected {expected}, found {found}")]
    FormatMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// Allocation of frame storage or the PCM buffer failed
    #[error("Memory allocation failed: {0}")]
    MemoryAllocationFailed(String),

    /// No sink in the preference list could be opened
    #[error("No audio output available: {0}")]
    NoOutputAvailable(String),

    /// Audio output device errors outside of packet writes
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Sink rejected or stalled on a packet; fatal to the session
    #[error("Playback write failed: {0}")]
    PlaybackWriteFailed(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared crate
    #[error(transparent)]
    Common(#[from] oasis_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Result code reported to the caller
    pub fn code(&self) -> ResultCode {
        match self {
            Error::InvalidArgument(_) | Error::Config(_) => ResultCode::InvalidArgument,
            Error::FileNotFound(_) => ResultCode::FileNotFound,
            Error::OpenFailed { .. } | Error::NoAudioStream(_) | Error::EmptyStream(_) => {
                ResultCode::FileNotMedia
            }
            Error::UnsupportedCodec(_) => ResultCode::UnsupportedCodec,
            Error::UnsupportedFormat(_) | Error::FormatMismatch { .. } => {
                ResultCode::UnsupportedFormat
            }
            Error::MemoryAllocationFailed(_) => ResultCode::MemoryAllocation,
            Error::NoOutputAvailable(_) => ResultCode::UnsupportedOperation,
            Error::DecoderInitFailed(_)
            | Error::DecodeFailed(_)
            | Error::AudioOutput(_)
            | Error::PlaybackWriteFailed(_)
            | Error::Io(_) => ResultCode::Error,
            Error::Common(e) => e.code(),
        }
    }
}

/// Convenience Result type using oasis-ap Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            Error::NoAudioStream(PathBuf::from("a.txt")).code(),
            ResultCode::FileNotMedia
        );
        assert_eq!(
            Error::MemoryAllocationFailed("pcm".into()).code(),
            ResultCode::MemoryAllocation
        );
        assert_eq!(
            Error::Common(oasis_common::Error::Config("bad".into())).code(),
            ResultCode::InvalidArgument
        );
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = Error::OpenFailed {
            path: PathBuf::from("/music/song.flac"),
            reason: "unsupported container".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open /music/song.flac: unsupported container"
        );
    }
}
