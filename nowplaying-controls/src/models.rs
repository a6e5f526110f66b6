use std::{fmt, sync::Arc};

use image::RgbaImage;

use crate::time::{format_countdown, remaining_seconds};

/// Decoded artwork, shared between the presenter and renderers.
pub type Bitmap = Arc<RgbaImage>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub artwork_url: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl QueueEntry {
    /// Artwork location for the requested size. Catalog style templates
    /// (`{w}x{h}`) get the size substituted, anything else is returned as is.
    pub fn artwork_url_for(&self, width: u32, height: u32) -> Option<String> {
        self.artwork_url.as_ref().map(|url| {
            url.replace("{w}", &width.to_string())
                .replace("{h}", &height.to_string())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GRAY: Rgb = Rgb::new(142, 142, 147);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived lightness in `[0, 1]`.
    pub fn luma(&self) -> f64 {
        0.2126 * (self.r as f64 / 255.0)
            + 0.7152 * (self.g as f64 / 255.0)
            + 0.0722 * (self.b as f64 / 255.0)
    }

    pub fn is_light(&self) -> bool {
        self.luma() > 0.5
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub foreground: Rgb,
    pub secondary_foreground: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb::BLACK,
            foreground: Rgb::WHITE,
            secondary_foreground: Rgb::GRAY,
        }
    }
}

/// Everything needed to draw the now playing screen for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub entry_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub is_playing: bool,
    pub elapsed_seconds: f64,
    pub total_seconds: f64,
    pub artwork: Option<Bitmap>,
    pub palette: Palette,
}

impl PlaybackState {
    pub(crate) fn from_entry(entry: &QueueEntry, is_playing: bool) -> Self {
        Self {
            entry_id: entry.id.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            is_playing,
            elapsed_seconds: 0.0,
            total_seconds: total_seconds(entry),
            artwork: None,
            palette: Palette::default(),
        }
    }

    /// Takes over the entry's descriptive fields, keeping progress and
    /// artwork. Returns whether anything changed.
    pub(crate) fn update_metadata(&mut self, entry: &QueueEntry) -> bool {
        let total = total_seconds(entry);
        if self.title == entry.title && self.artist == entry.artist && self.total_seconds == total {
            return false;
        }

        self.title = entry.title.clone();
        self.artist = entry.artist.clone();
        self.total_seconds = total;
        true
    }

    pub fn progress(&self) -> f64 {
        if self.total_seconds <= 0.0 {
            return 0.0;
        }

        (self.elapsed_seconds / self.total_seconds).clamp(0.0, 1.0)
    }

    pub fn elapsed_label(&self) -> String {
        format_countdown(self.elapsed_seconds)
    }

    pub fn remaining_label(&self) -> String {
        format_countdown(-remaining_seconds(self.elapsed_seconds, self.total_seconds))
    }

    pub fn total_label(&self) -> String {
        format_countdown(self.total_seconds)
    }
}

fn total_seconds(entry: &QueueEntry) -> f64 {
    entry.duration_seconds.unwrap_or(0.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(duration_seconds: Option<f64>) -> QueueEntry {
        QueueEntry {
            id: "a".into(),
            title: "Song A".into(),
            artist: Some("Artist".into()),
            artwork_url: Some("https://img.example/{w}x{h}bb.jpg".into()),
            duration_seconds,
        }
    }

    #[test]
    fn luma_uses_rec709_weights() {
        assert_eq!(Rgb::BLACK.luma(), 0.0);
        assert!((Rgb::WHITE.luma() - 1.0).abs() < 1e-9);
        assert!((Rgb::new(0, 255, 0).luma() - 0.7152).abs() < 1e-9);
    }

    #[test]
    fn artwork_url_substitutes_size() {
        assert_eq!(
            entry(None).artwork_url_for(256, 256).as_deref(),
            Some("https://img.example/256x256bb.jpg")
        );
    }

    #[test]
    fn unknown_duration_is_zero() {
        let state = PlaybackState::from_entry(&entry(None), false);
        assert_eq!(state.total_seconds, 0.0);
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn progress_and_labels() {
        let mut state = PlaybackState::from_entry(&entry(Some(180.0)), true);
        state.elapsed_seconds = 45.0;

        assert_eq!(state.progress(), 0.25);
        assert_eq!(state.elapsed_label(), "00:45");
        assert_eq!(state.remaining_label(), "-02:15");
        assert_eq!(state.total_label(), "03:00");
    }

    #[test]
    fn metadata_update_keeps_progress() {
        let mut state = PlaybackState::from_entry(&entry(Some(180.0)), true);
        state.elapsed_seconds = 90.0;

        assert!(!state.update_metadata(&entry(Some(180.0))));

        let edited = QueueEntry {
            artist: Some("Other Artist".into()),
            ..entry(Some(200.0))
        };
        assert!(state.update_metadata(&edited));
        assert_eq!(state.artist.as_deref(), Some("Other Artist"));
        assert_eq!(state.total_seconds, 200.0);
        assert_eq!(state.elapsed_seconds, 90.0);
    }

    #[test]
    fn progress_is_clamped() {
        let mut state = PlaybackState::from_entry(&entry(Some(10.0)), true);
        state.elapsed_seconds = 12.0;
        assert_eq!(state.progress(), 1.0);
    }
}
