use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::sync::{Notify, watch};

use crate::{
    Result,
    controls::ControlCommand,
    error::Error,
    models::{AuthorizationStatus, Bitmap, PlaybackStatus, QueueEntry},
    service::{EntryReceiver, PlayerService},
};

/// Scriptable player for tests.
#[derive(Debug)]
pub(crate) struct FakePlayer {
    authorization_status: Mutex<AuthorizationStatus>,
    authorization_result: Mutex<AuthorizationStatus>,
    authorization_requests: AtomicUsize,
    entry: watch::Sender<Option<QueueEntry>>,
    status: Mutex<PlaybackStatus>,
    time: Mutex<f64>,
    fail_commands: Mutex<bool>,
    play_gate: Mutex<Option<Arc<Notify>>>,
    time_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<ControlCommand>>,
    artwork: Mutex<HashMap<String, Bitmap>>,
    artwork_gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakePlayer {
    pub(crate) fn new() -> Self {
        let (entry, _) = watch::channel(None);
        Self {
            authorization_status: Mutex::new(AuthorizationStatus::NotDetermined),
            authorization_result: Mutex::new(AuthorizationStatus::NotDetermined),
            authorization_requests: AtomicUsize::new(0),
            entry,
            status: Mutex::new(PlaybackStatus::Paused),
            time: Mutex::new(0.0),
            fail_commands: Mutex::new(false),
            play_gate: Mutex::new(None),
            time_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            artwork: Mutex::new(HashMap::new()),
            artwork_gates: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_authorization_status(&self, status: AuthorizationStatus) {
        *self.authorization_status.lock().unwrap() = status;
    }

    pub(crate) fn set_authorization_result(&self, status: AuthorizationStatus) {
        *self.authorization_result.lock().unwrap() = status;
    }

    pub(crate) fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn set_entry(&self, entry: Option<QueueEntry>) {
        self.entry.send_replace(entry);
    }

    pub(crate) fn set_status(&self, status: PlaybackStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub(crate) fn set_time(&self, seconds: f64) {
        *self.time.lock().unwrap() = seconds;
    }

    pub(crate) fn fail_commands(&self) {
        *self.fail_commands.lock().unwrap() = true;
    }

    /// `play` waits until the returned handle is notified.
    pub(crate) fn hold_play(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.play_gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// `playback_time` waits until the returned handle is notified.
    pub(crate) fn hold_time(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.time_gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub(crate) fn calls(&self) -> Vec<ControlCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn set_artwork(&self, entry_id: &str, bitmap: Bitmap) {
        self.artwork
            .lock()
            .unwrap()
            .insert(entry_id.to_string(), bitmap);
    }

    /// Artwork for `entry_id` is only returned once the handle is notified.
    pub(crate) fn hold_artwork(&self, entry_id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.artwork_gates
            .lock()
            .unwrap()
            .insert(entry_id.to_string(), notify.clone());
        notify
    }

    fn record(&self, command: ControlCommand) -> Result<()> {
        self.calls.lock().unwrap().push(command);
        if *self.fail_commands.lock().unwrap() {
            return Err(Error::Command {
                command,
                message: "player unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerService for FakePlayer {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.authorization_status.lock().unwrap()
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        let status = *self.authorization_result.lock().unwrap();
        self.set_authorization_status(status);
        status
    }

    fn current_entry(&self) -> Option<QueueEntry> {
        self.entry.borrow().clone()
    }

    fn subscribe(&self) -> EntryReceiver {
        self.entry.subscribe()
    }

    fn playback_status(&self) -> PlaybackStatus {
        *self.status.lock().unwrap()
    }

    async fn playback_time(&self) -> Result<f64> {
        let gate = self.time_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(*self.time.lock().unwrap())
    }

    async fn play(&self) -> Result<()> {
        let gate = self.play_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record(ControlCommand::Play)
    }

    fn pause(&self) -> Result<()> {
        self.record(ControlCommand::Pause)
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.record(ControlCommand::Next)
    }

    async fn skip_to_previous(&self) -> Result<()> {
        self.record(ControlCommand::Previous)
    }

    async fn fetch_artwork(&self, entry: &QueueEntry, _width: u32, _height: u32) -> Option<Bitmap> {
        let gate = self.artwork_gates.lock().unwrap().get(&entry.id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.artwork.lock().unwrap().get(&entry.id).cloned()
    }
}

pub(crate) fn entry(id: &str, duration_seconds: f64) -> QueueEntry {
    QueueEntry {
        id: id.to_string(),
        title: format!("Song {id}"),
        artist: Some(format!("Artist {id}")),
        artwork_url: Some(format!("https://img.example/{id}/{{w}}x{{h}}.jpg")),
        duration_seconds: Some(duration_seconds),
    }
}

pub(crate) fn solid(r: u8, g: u8, b: u8) -> Bitmap {
    Arc::new(RgbaImage::from_pixel(16, 16, Rgba([r, g, b, 255])))
}
