//! Playback session state

/// Transport state of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Created, output stream not yet opened
    Idle,
    /// Emitting packets
    Streaming,
    /// Output paused, cursor retained
    Paused,
    Seeking,
    Restarting,
    /// Terminal
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Streaming => write!(f, "streaming"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Seeking => write!(f, "seeking"),
            PlaybackState::Restarting => write!(f, "restarting"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// How a playback session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Cursor reached the end of the buffer
    Finished,
    /// Quit by command
    Stopped,
}

impl std::fmt::Display for PlaybackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackOutcome::Finished => write!(f, "finished"),
            PlaybackOutcome::Stopped => write!(f, "stopped"),
        }
    }
}
