//! Scripted transport commands

use oasis_ap::playback::{Command, ControlSource};
use std::collections::VecDeque;

/// Replays one entry per playback loop iteration.
///
/// `None` entries are iterations without a command. Once the script is
/// exhausted the source behaves as closed.
pub struct ScriptedControl {
    steps: VecDeque<Option<Command>>,
}

impl ScriptedControl {
    pub fn new(steps: Vec<Option<Command>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// `command` on iteration `at` (0-based), nothing before it
    pub fn at(at: usize, command: Command) -> Self {
        let mut steps = vec![None; at];
        steps.push(Some(command));
        Self::new(steps)
    }
}

impl ControlSource for ScriptedControl {
    fn poll(&mut self) -> Option<Command> {
        self.steps.pop_front().flatten()
    }

    fn wait(&mut self) -> Option<Command> {
        while let Some(step) = self.steps.pop_front() {
            if step.is_some() {
                return step;
            }
        }
        None
    }
}
