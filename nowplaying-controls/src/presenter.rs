use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        watch,
    },
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    Result,
    controls::{ControlCommand, ControlReceiver},
    error::Error,
    models::{Bitmap, Palette, PlaybackState, PlaybackStatus, QueueEntry},
    notification::{Notification, NotificationBroadcast},
    palette::{ForegroundPolicy, extract_palette},
    service::PlayerService,
};

/// How long a locally toggled play state wins over what the player reports.
const SETTLE_WINDOW: Duration = Duration::from_secs(2);

/// A tick gives up on the player's position after this long.
const POSITION_TIMEOUT: Duration = Duration::from_millis(500);

pub type PlaybackReceiver = watch::Receiver<Option<PlaybackState>>;

#[derive(Debug, Clone, Copy)]
pub struct PresenterConfig {
    pub tick_interval: Duration,
    pub artwork_size: u32,
    pub foreground_policy: ForegroundPolicy,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            artwork_size: 256,
            foreground_policy: ForegroundPolicy::default(),
        }
    }
}

#[derive(Debug)]
struct ArtworkLoaded {
    generation: u64,
    artwork: Option<(Bitmap, Palette)>,
}

#[derive(Debug)]
struct CommandOutcome {
    command: ControlCommand,
    revert_to: Option<bool>,
    result: Result<()>,
}

#[derive(Debug, Clone, Copy)]
struct Optimistic {
    playing: bool,
    since: Instant,
}

/// Mirrors the player's current entry into a [`PlaybackState`] and forwards
/// transport commands to it.
pub struct PlaybackPresenter {
    service: Arc<dyn PlayerService>,
    config: PresenterConfig,
    broadcast: Arc<NotificationBroadcast>,
    state: watch::Sender<Option<PlaybackState>>,
    current: Option<QueueEntry>,
    generation: u64,
    optimistic: Option<Optimistic>,
    artwork_tx: UnboundedSender<ArtworkLoaded>,
    artwork_rx: UnboundedReceiver<ArtworkLoaded>,
    outcome_tx: UnboundedSender<CommandOutcome>,
    outcome_rx: UnboundedReceiver<CommandOutcome>,
}

impl PlaybackPresenter {
    pub fn new(
        service: Arc<dyn PlayerService>,
        config: PresenterConfig,
        broadcast: Arc<NotificationBroadcast>,
    ) -> Self {
        let (state, _) = watch::channel(None);
        let (artwork_tx, artwork_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            service,
            config,
            broadcast,
            state,
            current: None,
            generation: 0,
            optimistic: None,
            artwork_tx,
            artwork_rx,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn subscribe(&self) -> PlaybackReceiver {
        self.state.subscribe()
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.state.borrow().clone()
    }

    pub fn has_current_entry(&self) -> bool {
        self.state.borrow().is_some()
    }

    #[instrument(skip(self))]
    pub fn on_current_entry_changed(&mut self, entry: Option<QueueEntry>) {
        if let Some(entry) = entry.as_ref()
            && self.has_current_entry()
            && self
                .current
                .as_ref()
                .is_some_and(|current| current.id == entry.id)
        {
            self.on_metadata_changed(entry.clone());
            return;
        }

        self.state.send_if_modified(|state| match state {
            Some(state) => {
                state.elapsed_seconds = 0.0;
                true
            }
            None => false,
        });

        self.generation += 1;
        self.current = entry.clone();

        let Some(entry) = entry else {
            debug!("queue is empty");
            self.state.send_replace(None);
            return;
        };

        let is_playing = self.local_playing();
        self.state
            .send_replace(Some(PlaybackState::from_entry(&entry, is_playing)));

        self.load_artwork(entry);
    }

    /// Same entry, new metadata. Progress is kept and artwork is only
    /// fetched again when its location moved.
    fn on_metadata_changed(&mut self, entry: QueueEntry) {
        debug!(entry = entry.id, "metadata changed");

        self.state.send_if_modified(|state| match state {
            Some(state) => state.update_metadata(&entry),
            None => false,
        });

        let artwork_moved = self
            .current
            .as_ref()
            .is_none_or(|current| current.artwork_url != entry.artwork_url);
        self.current = Some(entry.clone());

        if artwork_moved {
            self.generation += 1;
            self.load_artwork(entry);
        }
    }

    #[instrument(skip(self))]
    pub async fn on_tick(&mut self) {
        if !self.has_current_entry() {
            return;
        }

        let elapsed = match time::timeout(POSITION_TIMEOUT, self.service.playback_time()).await {
            Ok(Ok(elapsed)) => elapsed,
            Ok(Err(err)) => {
                debug!(%err, "no playback time");
                return;
            }
            Err(_) => {
                warn!("player did not report its position in time");
                return;
            }
        };
        let reported = self.service.playback_status() == PlaybackStatus::Playing;
        let is_playing = self.reconcile_playing(reported);

        self.state.send_if_modified(|state| {
            let Some(state) = state else {
                return false;
            };

            let before = (state.elapsed_seconds, state.is_playing);
            state.elapsed_seconds = elapsed.max(0.0);
            if let Some(is_playing) = is_playing {
                state.is_playing = is_playing;
            }

            before != (state.elapsed_seconds, state.is_playing)
        });
    }

    #[instrument(skip(self))]
    pub fn toggle_playback(&mut self) {
        let Some(is_playing) = self.state.borrow().as_ref().map(|state| state.is_playing) else {
            debug!("nothing to toggle");
            return;
        };

        if is_playing {
            match self.service.pause() {
                Ok(()) => self.set_playing(false),
                Err(err) => self.report(ControlCommand::Pause, err),
            }
            return;
        }

        self.set_playing(true);

        let service = self.service.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = service.play().await;
            _ = outcome_tx.send(CommandOutcome {
                command: ControlCommand::Play,
                revert_to: Some(false),
                result,
            });
        });
    }

    #[instrument(skip(self))]
    pub fn skip_next(&mut self) {
        self.skip(ControlCommand::Next);
    }

    #[instrument(skip(self))]
    pub fn skip_previous(&mut self) {
        self.skip(ControlCommand::Previous);
    }

    pub fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::TogglePlayback => self.toggle_playback(),
            ControlCommand::Next => self.skip_next(),
            ControlCommand::Previous => self.skip_previous(),
            ControlCommand::Play | ControlCommand::Pause => debug!(%command, "ignoring command"),
        }
    }

    /// Drives the presenter until every [`crate::controls::Controls`] handle
    /// is dropped or the player goes away.
    pub async fn run(mut self, mut commands: ControlReceiver) -> Result<()> {
        let mut entries = self.service.subscribe();
        let current = entries.borrow_and_update().clone();
        self.on_current_entry_changed(current);

        let mut interval = time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            select! {
                _ = interval.tick() => {
                    self.on_tick().await;
                }

                changed = entries.changed() => {
                    if changed.is_err() {
                        info!("player closed the entry stream");
                        break;
                    }
                    let entry = entries.borrow_and_update().clone();
                    self.on_current_entry_changed(entry);
                }

                Some(loaded) = self.artwork_rx.recv() => {
                    self.apply_artwork(loaded);
                }

                Some(outcome) = self.outcome_rx.recv() => {
                    self.handle_outcome(outcome);
                }

                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        Ok(())
    }

    fn skip(&mut self, command: ControlCommand) {
        let service = self.service.clone();
        let outcome_tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            let result = match command {
                ControlCommand::Previous => service.skip_to_previous().await,
                _ => service.skip_to_next().await,
            };
            _ = outcome_tx.send(CommandOutcome {
                command,
                revert_to: None,
                result,
            });
        });
    }

    fn load_artwork(&self, entry: QueueEntry) {
        let service = self.service.clone();
        let artwork_tx = self.artwork_tx.clone();
        let generation = self.generation;
        let size = self.config.artwork_size;
        let policy = self.config.foreground_policy;

        tokio::spawn(async move {
            let artwork = match service.fetch_artwork(&entry, size, size).await {
                Some(bitmap) => {
                    let palette = extract_palette(&bitmap, policy).unwrap_or_default();
                    Some((bitmap, palette))
                }
                None => {
                    debug!(entry = entry.id, "no artwork, keeping placeholder");
                    None
                }
            };

            _ = artwork_tx.send(ArtworkLoaded {
                generation,
                artwork,
            });
        });
    }

    fn apply_artwork(&mut self, loaded: ArtworkLoaded) {
        if loaded.generation != self.generation {
            debug!(
                stale = loaded.generation,
                current = self.generation,
                "discarding artwork for a previous entry"
            );
            return;
        }

        let Some((bitmap, palette)) = loaded.artwork else {
            return;
        };

        self.state.send_if_modified(|state| match state {
            Some(state) => {
                state.artwork = Some(bitmap);
                state.palette = palette;
                true
            }
            None => false,
        });
    }

    fn handle_outcome(&mut self, outcome: CommandOutcome) {
        let Err(err) = outcome.result else {
            debug!(command = %outcome.command, "command completed");
            return;
        };

        if let Some(playing) = outcome.revert_to {
            self.optimistic = None;
            self.state.send_if_modified(|state| match state {
                Some(state) => {
                    state.is_playing = playing;
                    true
                }
                None => false,
            });
        }

        self.report(outcome.command, err);
    }

    fn report(&self, command: ControlCommand, err: Error) {
        warn!(%command, %err, "command failed");

        let message = match err {
            Error::Command { .. } => err.to_string(),
            other => format!("{command} failed: {other}"),
        };
        self.broadcast.send_message(Notification::Error(message));
    }

    fn set_playing(&mut self, playing: bool) {
        self.optimistic = Some(Optimistic {
            playing,
            since: Instant::now(),
        });

        self.state.send_if_modified(|state| match state {
            Some(state) => {
                state.is_playing = playing;
                true
            }
            None => false,
        });
    }

    fn local_playing(&mut self) -> bool {
        let reported = self.service.playback_status() == PlaybackStatus::Playing;
        self.reconcile_playing(reported).unwrap_or_else(|| {
            self.optimistic
                .map(|optimistic| optimistic.playing)
                .unwrap_or(reported)
        })
    }

    /// `None` while a local toggle is still waiting for the player to agree.
    fn reconcile_playing(&mut self, reported: bool) -> Option<bool> {
        match self.optimistic {
            Some(optimistic)
                if optimistic.playing != reported && optimistic.since.elapsed() < SETTLE_WINDOW =>
            {
                None
            }
            _ => {
                self.optimistic = None;
                Some(reported)
            }
        }
    }
}
