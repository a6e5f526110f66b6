use std::{fmt, sync::Arc, time::Duration};

use tokio::sync::watch;
use tracing::{info, instrument};

use crate::{models::AuthorizationStatus, service::PlayerService};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    #[default]
    Pending,
    Denied,
    Restricted,
    Authorized,
}

impl From<AuthorizationStatus> for GateStatus {
    fn from(value: AuthorizationStatus) -> Self {
        match value {
            AuthorizationStatus::NotDetermined => GateStatus::Pending,
            AuthorizationStatus::Denied => GateStatus::Denied,
            AuthorizationStatus::Restricted => GateStatus::Restricted,
            AuthorizationStatus::Authorized => GateStatus::Authorized,
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GateStatus::Pending => write!(f, "Authorizing..."),
            GateStatus::Denied => write!(f, "Denied access, try again"),
            GateStatus::Restricted => write!(f, "Restricted"),
            GateStatus::Authorized => write!(f, "Authorized!"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateView {
    pub status: GateStatus,
    pub player_visible: bool,
}

pub type GateReceiver = watch::Receiver<GateView>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Revealed,
    Blocked(AuthorizationStatus),
}

#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Time the confirmation stays visible before the player shows up.
    pub reveal_delay: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_secs(1),
        }
    }
}

/// Decides when the playback view may be shown.
#[derive(Debug)]
pub struct AuthorizationGate {
    service: Arc<dyn PlayerService>,
    config: GateConfig,
    tx: watch::Sender<GateView>,
}

impl AuthorizationGate {
    pub fn new(service: Arc<dyn PlayerService>, config: GateConfig) -> Self {
        let status = service.authorization_status();
        let (tx, _) = watch::channel(GateView {
            status: status.into(),
            player_visible: status == AuthorizationStatus::Authorized,
        });

        Self {
            service,
            config,
            tx,
        }
    }

    pub fn subscribe(&self) -> GateReceiver {
        self.tx.subscribe()
    }

    pub fn view(&self) -> GateView {
        *self.tx.borrow()
    }

    /// Requests authorization if needed. Resolves to `Revealed` at most once
    /// per gate, consuming it.
    #[instrument(skip(self))]
    pub async fn run(self) -> GateOutcome {
        if self.view().player_visible {
            info!("already authorized");
            return GateOutcome::Revealed;
        }

        let status = self.service.request_authorization().await;
        info!(?status, "authorization resolved");

        self.tx.send_modify(|view| view.status = status.into());

        if status != AuthorizationStatus::Authorized {
            return GateOutcome::Blocked(status);
        }

        tokio::time::sleep(self.config.reveal_delay).await;
        self.tx.send_modify(|view| view.player_visible = true);

        GateOutcome::Revealed
    }
}
