//! Transport control input
//!
//! Commands are single characters. The terminal feeds them through a
//! reader thread into a channel; the playback loop polls the channel once
//! per packet and blocks on it while paused.

use crate::error::Result;
use std::fmt;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    Restart,
    SeekForward,
    SeekBackward,
    Help,
    Unknown(char),
}

impl Command {
    /// Map one input character; whitespace is not a command.
    pub fn from_char(c: char) -> Option<Command> {
        let command = match c {
            'q' => Command::Quit,
            'p' => Command::TogglePause,
            'r' => Command::Restart,
            's' => Command::SeekForward,
            'b' => Command::SeekBackward,
            'h' => Command::Help,
            c if c.is_whitespace() => return None,
            c => Command::Unknown(c),
        };
        Some(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Quit => write!(f, "quit"),
            Command::TogglePause => write!(f, "pause"),
            Command::Restart => write!(f, "restart"),
            Command::SeekForward => write!(f, "seek forward"),
            Command::SeekBackward => write!(f, "seek backward"),
            Command::Help => write!(f, "help"),
            Command::Unknown(c) => write!(f, "unknown '{}'", c.escape_default()),
        }
    }
}

/// Source of transport commands
pub trait ControlSource {
    /// Next pending command without blocking
    fn poll(&mut self) -> Option<Command>;

    /// Block until a command arrives; `None` once the source is closed
    fn wait(&mut self) -> Option<Command>;
}

impl ControlSource for Receiver<Command> {
    fn poll(&mut self) -> Option<Command> {
        self.try_recv().ok()
    }

    fn wait(&mut self) -> Option<Command> {
        self.recv().ok()
    }
}

/// Control source that never produces a command
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl ControlSource for NoInput {
    fn poll(&mut self) -> Option<Command> {
        None
    }

    fn wait(&mut self) -> Option<Command> {
        None
    }
}

/// Start the stdin reader thread and return its command channel.
///
/// The thread ends when stdin closes or the receiver is dropped.
pub fn spawn_stdin_reader() -> Result<Receiver<Command>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("oasis-stdin".to_string())
        .spawn(move || read_commands(std::io::stdin().lock(), tx))?;
    Ok(rx)
}

fn read_commands<R: Read>(mut input: R, tx: Sender<Command>) {
    let mut buf = [0u8; 64];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Control input read failed: {}", e);
                break;
            }
        };

        for command in buf[..n].iter().filter_map(|&b| Command::from_char(b as char)) {
            if tx.send(command).is_err() {
                return;
            }
        }
    }
    debug!("Control input closed");
}

/// Print the control key list to stdout
pub fn print_controls() {
    println!("Controls:");
    println!("  p  pause / resume");
    println!("  s  seek forward");
    println!("  b  seek backward");
    println!("  r  restart");
    println!("  h  show this help");
    println!("  q  quit");
}
