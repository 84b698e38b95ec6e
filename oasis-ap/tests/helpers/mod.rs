//! Test helper modules for oasis-ap integration tests
//!
//! - audio_generator: deterministic WAV fixtures written with hound
//! - audio_capture: sinks that record or reject packets
//! - control: scripted transport commands

#![allow(dead_code)]

pub mod audio_capture;
pub mod audio_generator;
pub mod control;

pub use audio_capture::{FailingSink, RecordingSink};
pub use audio_generator::{WavFixture, TEST_SAMPLE_RATE};
pub use control::ScriptedControl;
