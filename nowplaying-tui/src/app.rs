use std::sync::Arc;

use image::DynamicImage;
use nowplaying_controls::{
    GateReceiver, PlaybackReceiver, Result,
    controls::Controls,
    models::{Bitmap, PlaybackState},
    notification::Notification,
};
use ratatui::{
    DefaultTerminal,
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};
use tokio::{
    sync::broadcast,
    time::{self, Duration, Instant},
};
use tracing::debug;

use crate::theme::Theme;

const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) struct App {
    pub(crate) gate: GateReceiver,
    pub(crate) playback: PlaybackReceiver,
    pub(crate) controls: Controls,
    pub(crate) notifications: broadcast::Receiver<Notification>,
    pub(crate) theme: Theme,
    pub(crate) picker: Option<Picker>,
    pub(crate) artwork: Option<Artwork>,
    pub(crate) notification: Option<(Notification, Instant)>,
    pub(crate) exit: bool,
    pub(crate) should_draw: bool,
}

/// Terminal encoding of the artwork currently on screen.
pub(crate) struct Artwork {
    bitmap: Bitmap,
    protocol: StatefulProtocol,
}

impl App {
    pub(crate) fn new(
        gate: GateReceiver,
        playback: PlaybackReceiver,
        controls: Controls,
        notifications: broadcast::Receiver<Notification>,
        theme: Theme,
        picker: Option<Picker>,
    ) -> Self {
        Self {
            gate,
            playback,
            controls,
            notifications,
            theme,
            picker,
            artwork: None,
            notification: None,
            exit: false,
            should_draw: true,
        }
    }

    pub(crate) async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut tick_interval = time::interval(Duration::from_millis(10));

        while !self.exit {
            tokio::select! {
                Ok(_) = self.gate.changed() => {
                    self.should_draw = true;
                },
                Ok(_) = self.playback.changed() => {
                    self.sync_artwork();
                    self.should_draw = true;
                },
                Ok(notification) = self.notifications.recv() => {
                    self.show_notification(notification);
                }

                _ = tick_interval.tick() => {
                    self.expire_notification();

                    if event::poll(Duration::from_millis(0))? {
                        self.handle_events()?;
                    }
                }
            }

            if self.should_draw {
                terminal.draw(|frame| self.render(frame))?;
                self.should_draw = false;
            }
        }

        Ok(())
    }

    fn handle_events(&mut self) -> Result<()> {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                self.handle_key(key_event.code)
            }
            Event::Resize(_, _) => self.should_draw = true,
            _ => {}
        };
        Ok(())
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode) {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            self.exit = true;
            return;
        }

        if !self.gate.borrow().player_visible {
            return;
        }

        match code {
            KeyCode::Char(' ') => self.controls.toggle_playback(),
            KeyCode::Char('n') => self.controls.next(),
            KeyCode::Char('p') => self.controls.previous(),
            _ => return,
        };

        self.should_draw = true;
    }

    pub(crate) fn show_notification(&mut self, notification: Notification) {
        self.notification = Some((notification, Instant::now()));
        self.should_draw = true;
    }

    pub(crate) fn expire_notification(&mut self) {
        if self
            .notification
            .as_ref()
            .is_some_and(|(_, shown)| shown.elapsed() >= NOTIFICATION_TIMEOUT)
        {
            self.notification = None;
            self.should_draw = true;
        }
    }

    /// Re-encodes the artwork only when the presenter published a new bitmap.
    pub(crate) fn sync_artwork(&mut self) {
        let bitmap = self
            .playback
            .borrow()
            .as_ref()
            .and_then(|state| state.artwork.clone());

        let Some(bitmap) = bitmap else {
            self.artwork = None;
            return;
        };

        if self
            .artwork
            .as_ref()
            .is_some_and(|artwork| Arc::ptr_eq(&artwork.bitmap, &bitmap))
        {
            return;
        }

        self.artwork = self.picker.as_ref().map(|picker| {
            debug!("Encoding artwork for the terminal");
            let image = DynamicImage::ImageRgba8(bitmap.as_ref().clone());
            Artwork {
                protocol: picker.new_resize_protocol(image),
                bitmap,
            }
        });
    }

    pub(crate) fn artwork_for(&mut self, state: &PlaybackState) -> Option<&mut StatefulProtocol> {
        let bitmap = state.artwork.as_ref()?;

        self.artwork
            .as_mut()
            .filter(|artwork| Arc::ptr_eq(&artwork.bitmap, bitmap))
            .map(|artwork| &mut artwork.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use nowplaying_controls::{
        GateStatus, GateView,
        controls::{ControlCommand, ControlReceiver},
        models::Palette,
    };
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::watch;

    struct Harness {
        app: App,
        commands: ControlReceiver,
        gate: watch::Sender<GateView>,
        playback: watch::Sender<Option<PlaybackState>>,
    }

    fn harness() -> Harness {
        let (gate, gate_rx) = watch::channel(GateView::default());
        let (playback, playback_rx) = watch::channel(None);
        let (controls, commands) = Controls::new();
        let (_, notifications) = broadcast::channel(4);

        Harness {
            app: App::new(
                gate_rx,
                playback_rx,
                controls,
                notifications,
                Theme::default(),
                None,
            ),
            commands,
            gate,
            playback,
        }
    }

    fn reveal(harness: &Harness) {
        harness.gate.send_replace(GateView {
            status: GateStatus::Authorized,
            player_visible: true,
        });
    }

    fn state(artwork: Option<Bitmap>) -> PlaybackState {
        PlaybackState {
            entry_id: "a".to_string(),
            title: "Harbour Lights".to_string(),
            artist: None,
            is_playing: false,
            elapsed_seconds: 0.0,
            total_seconds: 200.0,
            artwork,
            palette: Palette::default(),
        }
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn transport_keys_wait_for_the_player() {
        let mut harness = harness();

        harness.app.handle_key(KeyCode::Char(' '));
        assert!(harness.commands.try_recv().is_err());

        reveal(&harness);
        harness.app.handle_key(KeyCode::Char(' '));
        harness.app.handle_key(KeyCode::Char('n'));
        harness.app.handle_key(KeyCode::Char('p'));
        harness.app.handle_key(KeyCode::Char('x'));

        assert_eq!(
            harness.commands.try_recv().unwrap(),
            ControlCommand::TogglePlayback
        );
        assert_eq!(harness.commands.try_recv().unwrap(), ControlCommand::Next);
        assert_eq!(harness.commands.try_recv().unwrap(), ControlCommand::Previous);
        assert!(harness.commands.try_recv().is_err());
        assert!(!harness.app.exit);
    }

    #[test]
    fn quit_keys() {
        let mut first = harness();
        first.app.handle_key(KeyCode::Char('q'));
        assert!(first.app.exit);

        let mut second = harness();
        second.app.handle_key(KeyCode::Esc);
        assert!(second.app.exit);
    }

    #[test]
    fn screen_follows_the_gate() {
        let mut harness = harness();
        assert!(screen(&mut harness.app).contains("Authorizing..."));

        reveal(&harness);
        assert!(screen(&mut harness.app).contains("Nothing playing"));

        harness.playback.send_replace(Some(state(None)));
        let text = screen(&mut harness.app);
        assert!(text.contains("Harbour Lights"));
        assert!(text.contains("00:00 / -03:20"));
        assert!(text.contains(" 03:20 "));
    }

    #[test]
    fn now_playing_screen_with_artwork_and_notification() {
        let mut harness = harness();
        reveal(&harness);

        let bitmap = Arc::new(RgbaImage::new(4, 4));
        harness.playback.send_replace(Some(state(Some(bitmap))));
        harness.app.sync_artwork();
        harness
            .app
            .show_notification(Notification::Error("Skip to next failed: gone".to_string()));

        let text = screen(&mut harness.app);
        assert!(text.contains("Harbour Lights"));
        assert!(text.contains(" 03:20 "));
        assert!(text.contains("Skip to next failed: gone"));
        assert!(!text.contains("q quit"));
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_expire() {
        let mut harness = harness();

        harness
            .app
            .show_notification(Notification::Error("Play failed: no player".to_string()));
        assert!(screen(&mut harness.app).contains("Play failed: no player"));

        time::advance(Duration::from_secs(4)).await;
        harness.app.expire_notification();
        assert!(harness.app.notification.is_some());

        time::advance(Duration::from_secs(1)).await;
        harness.app.expire_notification();
        assert!(harness.app.notification.is_none());
        assert!(screen(&mut harness.app).contains("q quit"));
    }

    #[test]
    fn artwork_is_dropped_with_the_entry() {
        let mut harness = harness();
        let bitmap = Arc::new(RgbaImage::new(4, 4));

        harness.playback.send_replace(Some(state(Some(bitmap))));
        harness.app.sync_artwork();
        // No graphics support detected, so nothing to encode.
        assert!(harness.app.artwork.is_none());

        harness.playback.send_replace(None);
        harness.app.sync_artwork();
        assert!(harness.app.artwork.is_none());
    }
}
