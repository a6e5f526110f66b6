use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::watch;

use crate::{
    Result,
    models::{AuthorizationStatus, Bitmap, PlaybackStatus, QueueEntry},
};

/// Receives the current queue entry whenever it changes. Dropping the
/// receiver unsubscribes.
pub type EntryReceiver = watch::Receiver<Option<QueueEntry>>;

/// The host media player this client mirrors and controls.
#[async_trait]
pub trait PlayerService: Send + Sync + Debug {
    fn authorization_status(&self) -> AuthorizationStatus;
    /// Resolves once the user or the system has decided. Never times out.
    async fn request_authorization(&self) -> AuthorizationStatus;

    fn current_entry(&self) -> Option<QueueEntry>;
    fn subscribe(&self) -> EntryReceiver;

    fn playback_status(&self) -> PlaybackStatus;
    async fn playback_time(&self) -> Result<f64>;

    async fn play(&self) -> Result<()>;
    /// Fire and forget, must not block.
    fn pause(&self) -> Result<()>;
    async fn skip_to_next(&self) -> Result<()>;
    async fn skip_to_previous(&self) -> Result<()>;

    async fn fetch_artwork(&self, entry: &QueueEntry, width: u32, height: u32) -> Option<Bitmap>;
}
