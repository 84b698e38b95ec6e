//! Playback engine
//!
//! Walks a cursor through the PCM buffer, emitting one packet of
//! `frame_size` samples per channel per iteration, and applies transport
//! commands between packets.
//!
//! # Timestamps
//!
//! Timestamps count samples per channel. `pts == dts` for every packet and
//! each packet's pts is the previous pts plus its duration. Seek and
//! restart recompute the pts from the cursor and reopen the output stream,
//! so a sink never observes a discontinuity within one stream.

use crate::audio::output::{AudioSink, CloseMode, PcmPacket, StreamDescription};
use crate::audio::types::{AudioStreamInfo, PcmBuffer};
use crate::config::PlaybackSettings;
use crate::error::{Error, Result};
use crate::playback::control::{print_controls, Command, ControlSource};
use crate::playback::state::{PlaybackOutcome, PlaybackState};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Play `pcm` to `sink` under `control` until it ends or is quit.
///
/// The output stream is closed on every exit path: drained when the buffer
/// finishes, discarded on quit or error.
pub fn play(
    pcm: PcmBuffer,
    info: &AudioStreamInfo,
    sink: &mut dyn AudioSink,
    control: &mut dyn ControlSource,
    settings: &PlaybackSettings,
) -> Result<PlaybackOutcome> {
    PlaybackSession::new(pcm, info, sink, settings)?.run(control)
}

pub struct PlaybackSession<'a> {
    pcm: PcmBuffer,
    sink: &'a mut dyn AudioSink,
    desc: StreamDescription,
    state: PlaybackState,
    packets_sent: u64,
    next_pts: u64,
    bytes_per_frame: usize,
    chunk_bytes: usize,
    seek_bytes: usize,
    pacing: Duration,
    /// Close mode once the buffer is finished; a seek past the end discards
    finish_mode: CloseMode,
}

impl<'a> PlaybackSession<'a> {
    pub fn new(
        pcm: PcmBuffer,
        info: &AudioStreamInfo,
        sink: &'a mut dyn AudioSink,
        settings: &PlaybackSettings,
    ) -> Result<Self> {
        let frame_size = sink.frame_size().unwrap_or(settings.frame_size);
        if frame_size == 0 {
            return Err(Error::InvalidArgument("frame size must be at least 1".into()));
        }

        let desc = StreamDescription::from_info(info, frame_size);
        let bytes_per_frame = desc.bytes_per_frame();
        if bytes_per_frame == 0 {
            return Err(Error::InvalidArgument("stream has no channels".into()));
        }

        Ok(Self {
            pcm,
            sink,
            chunk_bytes: desc.packet_bytes(),
            desc,
            state: PlaybackState::Idle,
            packets_sent: 0,
            next_pts: 0,
            bytes_per_frame,
            seek_bytes: info.bytes_for_seconds(settings.seek_seconds),
            pacing: settings.pacing,
            finish_mode: CloseMode::Drain,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Cursor in bytes
    pub fn position(&self) -> usize {
        self.pcm.position()
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn next_pts(&self) -> u64 {
        self.next_pts
    }

    pub fn description(&self) -> &StreamDescription {
        &self.desc
    }

    /// Open the output stream and start streaming
    pub fn start(&mut self) -> Result<()> {
        self.sink.open_stream(&self.desc)?;
        self.state = PlaybackState::Streaming;
        info!(
            "Streaming {} bytes to {} as {}",
            self.pcm.len(),
            self.sink.name(),
            self.desc
        );
        Ok(())
    }

    /// Run the session to completion.
    pub fn run(mut self, control: &mut dyn ControlSource) -> Result<PlaybackOutcome> {
        self.start()?;

        let result = self.drive(control);
        let mode = match result {
            Ok(PlaybackOutcome::Finished) => self.finish_mode,
            _ => CloseMode::Discard,
        };
        self.state = PlaybackState::Stopped;
        let closed = self.sink.close_stream(mode);

        match (result, closed) {
            (Ok(outcome), Ok(())) => {
                info!(
                    "Playback {} after {} packets ({} samples)",
                    outcome, self.packets_sent, self.next_pts
                );
                Ok(outcome)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Closing output after failure also failed: {}", close_err);
                Err(e)
            }
        }
    }

    fn drive(&mut self, control: &mut dyn ControlSource) -> Result<PlaybackOutcome> {
        loop {
            if let Some(command) = control.poll() {
                if let Some(outcome) = self.handle_command(command, control)? {
                    return Ok(outcome);
                }
            }

            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }

            if !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }
    }

    /// Emit the packet at the cursor.
    ///
    /// Returns `Finished` once the cursor reaches the end of the buffer.
    pub fn step(&mut self) -> Result<Option<PlaybackOutcome>> {
        if self.pcm.is_at_end() {
            return Ok(Some(PlaybackOutcome::Finished));
        }

        let data = self.pcm.peek(self.chunk_bytes);
        let duration = (data.len() / self.bytes_per_frame) as u64;
        let packet = PcmPacket {
            data,
            pts: self.next_pts,
            dts: self.next_pts,
            duration,
        };

        self.sink.write_packet(&packet).map_err(|e| match e {
            Error::PlaybackWriteFailed(_) => e,
            other => Error::PlaybackWriteFailed(other.to_string()),
        })?;

        let len = data.len();
        self.pcm.advance(len);
        self.next_pts += duration;
        self.packets_sent += 1;

        if self.pcm.is_at_end() {
            return Ok(Some(PlaybackOutcome::Finished));
        }
        Ok(None)
    }

    /// Apply one command; `Some` ends the session.
    pub fn handle_command(
        &mut self,
        command: Command,
        control: &mut dyn ControlSource,
    ) -> Result<Option<PlaybackOutcome>> {
        debug!("Command: {} ({})", command, self.state);
        match command {
            Command::Quit => {
                info!("Quit at {}", self.position_label());
                Ok(Some(PlaybackOutcome::Stopped))
            }
            Command::TogglePause => self.pause_until_resumed(control),
            Command::Restart => {
                self.restart()?;
                Ok(None)
            }
            Command::SeekForward => self.seek(true),
            Command::SeekBackward => self.seek(false),
            Command::Help => {
                print_controls();
                Ok(None)
            }
            Command::Unknown(c) => {
                warn!("Ignoring unknown command '{}'", c.escape_default());
                Ok(None)
            }
        }
    }

    fn pause_until_resumed(
        &mut self,
        control: &mut dyn ControlSource,
    ) -> Result<Option<PlaybackOutcome>> {
        self.state = PlaybackState::Paused;
        self.sink.pause()?;
        info!("Paused at {}", self.position_label());

        loop {
            match control.wait() {
                Some(Command::TogglePause) => break,
                Some(Command::Quit) => return Ok(Some(PlaybackOutcome::Stopped)),
                None => {
                    info!("Control input closed while paused");
                    return Ok(Some(PlaybackOutcome::Stopped));
                }
                Some(Command::Help) => print_controls(),
                Some(other) => debug!("Ignoring {} while paused", other),
            }
        }

        self.sink.resume()?;
        self.state = PlaybackState::Streaming;
        info!("Resumed at {}", self.position_label());
        Ok(None)
    }

    fn restart(&mut self) -> Result<()> {
        self.state = PlaybackState::Restarting;
        self.pcm.rewind();
        self.packets_sent = 0;
        self.next_pts = 0;
        self.reopen()?;
        info!("Restarted");
        Ok(())
    }

    fn seek(&mut self, forward: bool) -> Result<Option<PlaybackOutcome>> {
        self.state = PlaybackState::Seeking;
        let current = self.pcm.position();
        let target = if forward {
            current.saturating_add(self.seek_bytes)
        } else {
            current.saturating_sub(self.seek_bytes)
        };
        // Keep the cursor on a sample frame boundary
        let target = target - target % self.bytes_per_frame;
        let position = self.pcm.seek_to(target);

        if self.pcm.is_at_end() {
            info!("Seek reached end of stream");
            self.finish_mode = CloseMode::Discard;
            return Ok(Some(PlaybackOutcome::Finished));
        }

        self.next_pts = (position / self.bytes_per_frame) as u64;
        self.reopen()?;
        info!(
            "Seeked {} to {}",
            if forward { "forward" } else { "backward" },
            self.position_label()
        );
        Ok(None)
    }

    fn reopen(&mut self) -> Result<()> {
        self.sink.close_stream(CloseMode::Discard)?;
        self.sink.open_stream(&self.desc)?;
        self.state = PlaybackState::Streaming;
        Ok(())
    }

    fn position_label(&self) -> String {
        let seconds = self.pcm.position() as f64
            / (self.bytes_per_frame as f64 * self.desc.sample_rate.max(1) as f64);
        format!("{:.2}s", seconds)
    }
}
