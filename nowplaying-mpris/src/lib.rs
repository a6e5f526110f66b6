use std::{
    sync::{Arc, Mutex, OnceLock, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use nowplaying_controls::{
    Result,
    controls::ControlCommand,
    error::Error,
    models::{AuthorizationStatus, Bitmap, PlaybackStatus, QueueEntry},
    notification::{Notification, NotificationBroadcast},
    service::{EntryReceiver, PlayerService},
};
use proxy::MediaPlayerProxy;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use zbus::{
    Connection, fdo,
    names::{BusName, OwnedBusName},
};

mod artwork;
mod metadata;
mod proxy;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Follows a media player on the session bus through its MPRIS interface.
#[derive(Debug)]
pub struct MprisPlayer {
    filter: Option<String>,
    authorization: Mutex<AuthorizationStatus>,
    proxy: OnceLock<MediaPlayerProxy<'static>>,
    shared: Arc<Shared>,
    http: reqwest::Client,
}

#[derive(Debug)]
struct Shared {
    entry: watch::Sender<Option<QueueEntry>>,
    status: watch::Sender<PlaybackStatus>,
    notifications: Arc<NotificationBroadcast>,
}

impl Shared {
    fn update_entry(&self, entry: Option<QueueEntry>) {
        self.entry.send_if_modified(|current| {
            if *current == entry {
                return false;
            }
            debug!(id = ?entry.as_ref().map(|entry| &entry.id), "Entry changed");
            *current = entry;
            true
        });
    }

    fn update_status(&self, status: PlaybackStatus) {
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    fn player_left(&self) {
        info!("Player left the bus");
        self.update_entry(None);
        self.update_status(PlaybackStatus::Stopped);
        self.notifications.send_message(Notification::Warning("Player left the bus".to_string()));
    }

    fn player_returned(&self) {
        self.notifications.send_message(Notification::Info("Player is back".to_string()));
    }

    fn pause_failed(&self, err: zbus::Error) {
        let err = command_error(ControlCommand::Pause, err);
        warn!(%err, "Pause failed");
        self.notifications.send_message(Notification::Error(err.to_string()));
    }
}

impl MprisPlayer {
    /// `filter` restricts discovery to players whose bus name, after
    /// `org.mpris.MediaPlayer2.`, starts with it. Failures that happen after
    /// a command returned, and the player coming and going, are reported on
    /// `notifications`.
    pub fn new(filter: Option<String>, notifications: Arc<NotificationBroadcast>) -> Self {
        let (entry, _) = watch::channel(None);
        let (status, _) = watch::channel(PlaybackStatus::default());

        Self {
            filter,
            authorization: Mutex::new(AuthorizationStatus::NotDetermined),
            proxy: OnceLock::new(),
            shared: Arc::new(Shared {
                entry,
                status,
                notifications,
            }),
            http: reqwest::Client::new(),
        }
    }

    fn set_authorization(&self, status: AuthorizationStatus) -> AuthorizationStatus {
        *self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
        status
    }

    fn proxy(&self) -> Result<&MediaPlayerProxy<'static>> {
        self.proxy.get().ok_or(Error::NotConnected)
    }

    async fn find_player(&self, connection: &Connection) -> fdo::Result<Option<OwnedBusName>> {
        let dbus = fdo::DBusProxy::new(connection).await?;
        let names = dbus.list_names().await?;
        let names: Vec<String> = names.iter().map(|name| name.as_str().to_string()).collect();

        Ok(proxy::pick_player(&names, self.filter.as_deref()).and_then(dbus_name))
    }

    #[instrument(skip(self, connection))]
    async fn attach(&self, connection: &Connection, name: OwnedBusName) -> zbus::Result<()> {
        let proxy = MediaPlayerProxy::builder(connection)
            .destination(name)?
            .build()
            .await?;

        refresh(&proxy, &self.shared).await;

        tokio::spawn(watch_player(proxy.clone(), self.shared.clone()));

        if self.proxy.set(proxy).is_err() {
            warn!("Already attached to a player");
        }

        Ok(())
    }
}

fn dbus_name(name: &str) -> Option<OwnedBusName> {
    BusName::try_from(name.to_string())
        .ok()
        .map(OwnedBusName::from)
}

fn discovery_status(err: &fdo::Error) -> AuthorizationStatus {
    match err {
        fdo::Error::AccessDenied(_) => AuthorizationStatus::Denied,
        _ => AuthorizationStatus::Restricted,
    }
}

fn command_error(command: ControlCommand, err: zbus::Error) -> Error {
    Error::Command {
        command,
        message: err.to_string(),
    }
}

async fn refresh(proxy: &MediaPlayerProxy<'static>, shared: &Shared) {
    match proxy.metadata().await {
        Ok(metadata) => shared.update_entry(metadata::entry_from_metadata(&metadata)),
        Err(err) => debug!(?err, "Unable to read metadata"),
    }

    match proxy.playback_status().await {
        Ok(status) => shared.update_status(metadata::parse_status(&status)),
        Err(err) => debug!(?err, "Unable to read playback status"),
    }
}

async fn watch_player(proxy: MediaPlayerProxy<'static>, shared: Arc<Shared>) {
    let mut metadata_changes = proxy.receive_metadata_changed().await;
    let mut status_changes = proxy.receive_playback_status_changed().await;
    let mut owner_changes = match proxy.inner().receive_owner_changed().await {
        Ok(stream) => Some(stream),
        Err(err) => {
            warn!(?err, "Unable to follow player ownership");
            None
        }
    };

    loop {
        tokio::select! {
            Some(change) = metadata_changes.next() => {
                match change.get().await {
                    Ok(metadata) => shared.update_entry(metadata::entry_from_metadata(&metadata)),
                    Err(err) => debug!(?err, "Unable to read changed metadata"),
                }
            }
            Some(change) = status_changes.next() => {
                match change.get().await {
                    Ok(status) => shared.update_status(metadata::parse_status(&status)),
                    Err(err) => debug!(?err, "Unable to read changed playback status"),
                }
            }
            Some(owner) = async {
                match owner_changes.as_mut() {
                    Some(stream) => stream.next().await,
                    None => std::future::pending().await,
                }
            } => {
                match owner {
                    Some(owner) => {
                        info!(%owner, "Player reappeared");
                        refresh(&proxy, &shared).await;
                        shared.player_returned();
                    }
                    None => shared.player_left(),
                }
            }
            else => break,
        }
    }
}

#[async_trait]
impl PlayerService for MprisPlayer {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(skip(self))]
    async fn request_authorization(&self) -> AuthorizationStatus {
        if self.authorization_status() == AuthorizationStatus::Authorized {
            return AuthorizationStatus::Authorized;
        }

        let connection = match Connection::session().await {
            Ok(connection) => connection,
            Err(err) => {
                warn!(?err, "Session bus unavailable");
                return self.set_authorization(AuthorizationStatus::Restricted);
            }
        };

        loop {
            match self.find_player(&connection).await {
                Ok(Some(name)) => match self.attach(&connection, name).await {
                    Ok(()) => {
                        info!("Attached to player");
                        return self.set_authorization(AuthorizationStatus::Authorized);
                    }
                    Err(err) => warn!(?err, "Unable to attach to player"),
                },
                Ok(None) => debug!(filter = ?self.filter, "Waiting for a player"),
                Err(err) => {
                    warn!(?err, "Unable to list players");
                    return self.set_authorization(discovery_status(&err));
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn current_entry(&self) -> Option<QueueEntry> {
        self.shared.entry.borrow().clone()
    }

    fn subscribe(&self) -> EntryReceiver {
        self.shared.entry.subscribe()
    }

    fn playback_status(&self) -> PlaybackStatus {
        *self.shared.status.borrow()
    }

    async fn playback_time(&self) -> Result<f64> {
        let micros = self
            .proxy()?
            .position()
            .await
            .map_err(|err| Error::Bus {
                message: err.to_string(),
            })?;

        Ok(micros.max(0) as f64 / 1_000_000.0)
    }

    #[instrument(skip(self))]
    async fn play(&self) -> Result<()> {
        self.proxy()?
            .play()
            .await
            .map_err(|err| command_error(ControlCommand::Play, err))
    }

    /// Returns before the player answers. A failure shows up as an error
    /// notification.
    #[instrument(skip(self))]
    fn pause(&self) -> Result<()> {
        let proxy = self.proxy()?.clone();
        let shared = self.shared.clone();

        tokio::spawn(async move {
            if let Err(err) = proxy.pause().await {
                shared.pause_failed(err);
            }
        });

        Ok(())
    }

    #[instrument(skip(self))]
    async fn skip_to_next(&self) -> Result<()> {
        self.proxy()?
            .next()
            .await
            .map_err(|err| command_error(ControlCommand::Next, err))
    }

    #[instrument(skip(self))]
    async fn skip_to_previous(&self) -> Result<()> {
        self.proxy()?
            .previous()
            .await
            .map_err(|err| command_error(ControlCommand::Previous, err))
    }

    async fn fetch_artwork(&self, entry: &QueueEntry, width: u32, height: u32) -> Option<Bitmap> {
        let url = entry.artwork_url_for(width, height)?;

        match artwork::fetch(&self.http, &url, width, height).await {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                debug!(%err, id = entry.id, "No artwork");
                None
            }
        }
    }
}
