use crate::notification::Notification;
use snafu::prelude::*;

use crate::controls::ControlCommand;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{command} failed: {message}"))]
    Command {
        command: ControlCommand,
        message: String,
    },
    #[snafu(display("Not connected to a player"))]
    NotConnected,
    #[snafu(display("Bus error: {message}"))]
    Bus {
        message: String,
    },
    #[snafu(display("Unable to fetch artwork: {message}"))]
    ArtworkFetch {
        message: String,
    },
    #[snafu(display("Unable to decode artwork: {message}"))]
    ArtworkDecode {
        message: String,
    },
    #[snafu(display("Unable to broadcast notification"))]
    Notification,
    #[snafu(display("Terminal error: {message}"))]
    Terminal {
        message: String,
    },
}

impl From<image::ImageError> for Error {
    fn from(value: image::ImageError) -> Self {
        Self::ArtworkDecode {
            message: value.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Terminal {
            message: value.to_string(),
        }
    }
}

impl From<tokio::sync::broadcast::error::SendError<Notification>> for Error {
    fn from(_value: tokio::sync::broadcast::error::SendError<Notification>) -> Self {
        Self::Notification
    }
}
