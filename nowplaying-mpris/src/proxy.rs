use std::collections::HashMap;

use zbus::{proxy, zvariant::OwnedValue};

pub(crate) const BUS_PREFIX: &str = "org.mpris.MediaPlayer2.";

#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
pub(crate) trait MediaPlayer {
    fn play(&self) -> zbus::Result<()>;

    fn pause(&self) -> zbus::Result<()>;

    fn next(&self) -> zbus::Result<()>;

    fn previous(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    /// Microseconds. Players do not signal changes, so it is never cached.
    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> zbus::Result<i64>;
}

/// Picks the player to follow. With a filter, the first bus name whose
/// player part starts with it (case-insensitive), otherwise the first player.
pub(crate) fn pick_player<'a>(names: &'a [String], filter: Option<&str>) -> Option<&'a str> {
    let mut players: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(BUS_PREFIX))
        .collect();
    players.sort_unstable();

    let filter = filter.map(str::to_lowercase);

    players.into_iter().find(|name| match &filter {
        Some(filter) => name[BUS_PREFIX.len()..].to_lowercase().starts_with(filter),
        None => true,
    })
}
