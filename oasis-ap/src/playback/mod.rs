//! Paced playback of an assembled PCM buffer with transport control

pub mod control;
pub mod engine;
pub mod state;

pub use control::{Command, ControlSource, NoInput};
pub use engine::{play, PlaybackSession};
pub use state::{PlaybackOutcome, PlaybackState};
