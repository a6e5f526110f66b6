//! In-memory player used for offline runs.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::{sync::watch, time::Instant};
use tracing::{debug, instrument};

use crate::{
    Result,
    models::{AuthorizationStatus, Bitmap, PlaybackStatus, QueueEntry},
    service::{EntryReceiver, PlayerService},
};

const ARTWORK_SCHEME: &str = "demo://artwork/";
const PROMPT_DELAY: Duration = Duration::from_millis(400);
/// Going back further into a track than this restarts it instead.
const RESTART_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct PlaybackClock {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl PlaybackClock {
    fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        if self.start_time.is_some() {
            self.start_time = Some(Instant::now());
        }
    }

    fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    fn elapsed(&self) -> Duration {
        match self.start_time {
            Some(start) => self.elapsed + start.elapsed(),
            None => self.elapsed,
        }
    }
}

#[derive(Debug)]
struct DemoState {
    authorization: AuthorizationStatus,
    position: Option<usize>,
    clock: PlaybackClock,
}

#[derive(Debug)]
pub struct DemoPlayer {
    queue: Vec<QueueEntry>,
    authorization_result: AuthorizationStatus,
    state: Mutex<DemoState>,
    entry: watch::Sender<Option<QueueEntry>>,
}

impl DemoPlayer {
    pub fn new() -> Self {
        Self::with_queue(default_queue())
    }

    pub fn with_queue(queue: Vec<QueueEntry>) -> Self {
        let position = if queue.is_empty() { None } else { Some(0) };
        let (entry, _) = watch::channel(position.map(|index| queue[index].clone()));

        Self {
            queue,
            authorization_result: AuthorizationStatus::Authorized,
            state: Mutex::new(DemoState {
                authorization: AuthorizationStatus::NotDetermined,
                position,
                clock: PlaybackClock::new(),
            }),
            entry,
        }
    }

    /// What the simulated permission prompt answers.
    pub fn answering(mut self, status: AuthorizationStatus) -> Self {
        self.authorization_result = status;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn move_to(&self, state: &mut DemoState, position: Option<usize>) {
        state.position = position.filter(|&index| index < self.queue.len());
        state.clock.reset();

        if state.position.is_none() {
            state.clock.pause();
            state.clock.elapsed = Duration::ZERO;
        }

        let entry = state.position.map(|index| self.queue[index].clone());
        debug!(entry = entry.as_ref().map(|e| e.id.as_str()), "current entry");
        self.entry.send_replace(entry);
    }

    fn current_duration(&self, state: &DemoState) -> Option<Duration> {
        state
            .position
            .and_then(|index| self.queue[index].duration_seconds)
            .map(Duration::from_secs_f64)
    }
}

impl Default for DemoPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerService for DemoPlayer {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.lock().authorization
    }

    #[instrument(skip(self))]
    async fn request_authorization(&self) -> AuthorizationStatus {
        tokio::time::sleep(PROMPT_DELAY).await;
        let mut state = self.lock();
        state.authorization = self.authorization_result;
        state.authorization
    }

    fn current_entry(&self) -> Option<QueueEntry> {
        self.entry.borrow().clone()
    }

    fn subscribe(&self) -> EntryReceiver {
        self.entry.subscribe()
    }

    fn playback_status(&self) -> PlaybackStatus {
        let state = self.lock();
        match (state.position, state.clock.is_running()) {
            (None, _) => PlaybackStatus::Stopped,
            (Some(_), true) => PlaybackStatus::Playing,
            (Some(_), false) => PlaybackStatus::Paused,
        }
    }

    async fn playback_time(&self) -> Result<f64> {
        let mut state = self.lock();

        if let Some(duration) = self.current_duration(&state)
            && state.clock.elapsed() >= duration
        {
            let next = state.position.map(|index| index + 1);
            self.move_to(&mut state, next);
        }

        Ok(state.clock.elapsed().as_secs_f64())
    }

    #[instrument(skip(self))]
    async fn play(&self) -> Result<()> {
        let mut state = self.lock();
        if state.position.is_none() && !self.queue.is_empty() {
            self.move_to(&mut state, Some(0));
        }
        state.clock.start();
        Ok(())
    }

    #[instrument(skip(self))]
    fn pause(&self) -> Result<()> {
        self.lock().clock.pause();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn skip_to_next(&self) -> Result<()> {
        let mut state = self.lock();
        let next = state.position.map(|index| index + 1);
        self.move_to(&mut state, next);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn skip_to_previous(&self) -> Result<()> {
        let mut state = self.lock();

        if state.clock.elapsed() > RESTART_THRESHOLD {
            state.clock.reset();
            return Ok(());
        }

        let previous = state.position.map(|index| index.saturating_sub(1));
        self.move_to(&mut state, previous);
        Ok(())
    }

    async fn fetch_artwork(&self, entry: &QueueEntry, width: u32, height: u32) -> Option<Bitmap> {
        let hue: f32 = entry
            .artwork_url_for(width, height)?
            .strip_prefix(ARTWORK_SCHEME)?
            .parse()
            .ok()?;

        Some(Arc::new(generate_artwork(width, height, hue)))
    }
}

/// Square cover with a dark frame and a bright disc in the middle.
fn generate_artwork(width: u32, height: u32, hue: f32) -> RgbaImage {
    let frame = hsv_to_rgb(hue, 0.6, 0.35);
    let disc = hsv_to_rgb((hue + 180.0) % 360.0, 0.7, 0.95);
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = width.min(height) as f32 * 0.3;

    RgbaImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let [r, g, b] = if dx * dx + dy * dy <= radius * radius {
            disc
        } else {
            frame
        };
        Rgba([r, g, b, 255])
    })
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let chroma = value * saturation;
    let sector = (hue / 60.0) % 6.0;
    let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = value - chroma;

    [r, g, b].map(|channel| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8)
}

fn default_queue() -> Vec<QueueEntry> {
    [
        ("demo-1", "Harbour Lights", Some("The Quiet Tides"), 214.0, 210.0),
        ("demo-2", "Paper Satellites", Some("Nightjar"), 187.0, 20.0),
        ("demo-3", "Long Way Round", None, 251.0, 120.0),
        ("demo-4", "Static Bloom", Some("Velvet Static"), 176.0, 300.0),
    ]
    .into_iter()
    .map(|(id, title, artist, duration, hue)| QueueEntry {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.map(str::to_string),
        artwork_url: Some(format!("{ARTWORK_SCHEME}{hue}")),
        duration_seconds: Some(duration),
    })
    .collect()
}
