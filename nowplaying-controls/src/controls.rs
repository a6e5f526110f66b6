use std::fmt;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    TogglePlayback,
    Play,
    Pause,
    Next,
    Previous,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlCommand::TogglePlayback => write!(f, "Toggle playback"),
            ControlCommand::Play => write!(f, "Play"),
            ControlCommand::Pause => write!(f, "Pause"),
            ControlCommand::Next => write!(f, "Skip to next"),
            ControlCommand::Previous => write!(f, "Skip to previous"),
        }
    }
}

pub type ControlReceiver = UnboundedReceiver<ControlCommand>;

/// Cloneable handle front-ends use to drive the presenter.
#[derive(Debug, Clone)]
pub struct Controls {
    tx: UnboundedSender<ControlCommand>,
}

impl Controls {
    pub fn new() -> (Self, ControlReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn toggle_playback(&self) {
        self.send(ControlCommand::TogglePlayback);
    }

    pub fn next(&self) {
        self.send(ControlCommand::Next);
    }

    pub fn previous(&self) {
        self.send(ControlCommand::Previous);
    }

    fn send(&self, command: ControlCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!(%command, "presenter is gone, dropping command");
        }
    }
}
