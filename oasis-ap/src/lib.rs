//! # Oasis Audio Player Library (oasis-ap)
//!
//! Decodes one audio file completely, assembles it into a single
//! interleaved PCM buffer, then plays it through an output sink with
//! keyboard transport control.
//!
//! **Pipeline:** symphonia decode -> [`audio::assemble`] -> [`playback::play`] -> cpal

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
