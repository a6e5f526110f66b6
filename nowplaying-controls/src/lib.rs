use error::Error;

pub mod authorization;
pub mod controls;
pub mod demo;
pub mod error;
pub mod models;
pub mod notification;
pub mod palette;
pub mod presenter;
pub mod service;
pub mod time;

#[cfg(test)]
mod fake;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub use authorization::{
    AuthorizationGate, GateConfig, GateOutcome, GateReceiver, GateStatus, GateView,
};
pub use presenter::{PlaybackPresenter, PlaybackReceiver, PresenterConfig};
