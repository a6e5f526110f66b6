use std::sync::Arc;

use app::App;
use nowplaying_controls::{
    GateReceiver, PlaybackReceiver, Result, controls::Controls, notification::NotificationBroadcast,
};
use ratatui_image::picker::Picker;
use tracing::warn;

pub use theme::Theme;

mod app;
mod authorization;
mod now_playing;
mod theme;
mod ui;

/// Takes over the terminal until the user quits.
pub async fn init(
    gate: GateReceiver,
    playback: PlaybackReceiver,
    controls: Controls,
    broadcast: Arc<NotificationBroadcast>,
    theme: Theme,
) -> Result<()> {
    let mut terminal = ratatui::init();

    let picker = match Picker::from_query_stdio() {
        Ok(picker) => Some(picker),
        Err(err) => {
            warn!(?err, "Unable to query terminal graphics, artwork disabled");
            None
        }
    };

    let mut app = App::new(
        gate,
        playback,
        controls,
        broadcast.subscribe(),
        theme,
        picker,
    );

    let result = app.run(&mut terminal).await;
    ratatui::restore();
    result
}
