use std::collections::HashMap;

use nowplaying_controls::models::{PlaybackStatus, QueueEntry};
use zbus::zvariant::{OwnedValue, Value};

const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

pub(crate) fn entry_from_metadata(metadata: &HashMap<String, OwnedValue>) -> Option<QueueEntry> {
    let field = |key: &str| metadata.get(key).map(|value| &**value);

    let track_id = field("mpris:trackid")
        .and_then(as_str)
        .filter(|id| *id != NO_TRACK);
    let title = field("xesam:title").and_then(as_str).map(str::to_string);

    if track_id.is_none() && title.is_none() {
        return None;
    }

    let artist = field("xesam:artist")
        .map(as_strings)
        .map(|artists| artists.join(", "))
        .filter(|artist| !artist.is_empty());

    let title = title.unwrap_or_else(|| "Unknown".to_string());

    let id = track_id
        .or_else(|| field("xesam:url").and_then(as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{title}\u{1f}{}", artist.as_deref().unwrap_or_default()));

    let duration_seconds = field("mpris:length")
        .and_then(as_i64)
        .filter(|micros| *micros > 0)
        .map(|micros| micros as f64 / 1_000_000.0);

    let artwork_url = field("mpris:artUrl")
        .and_then(as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    Some(QueueEntry {
        id,
        title,
        artist,
        artwork_url,
        duration_seconds,
    })
}

pub(crate) fn parse_status(status: &str) -> PlaybackStatus {
    match status {
        "Playing" => PlaybackStatus::Playing,
        "Paused" => PlaybackStatus::Paused,
        _ => PlaybackStatus::Stopped,
    }
}

fn as_str<'a>(value: &'a Value<'_>) -> Option<&'a str> {
    match value {
        Value::Str(s) => Some(s.as_str()),
        Value::ObjectPath(path) => Some(path.as_str()),
        Value::Value(inner) => as_str(inner),
        _ => None,
    }
}

fn as_i64(value: &Value<'_>) -> Option<i64> {
    match value {
        Value::I64(v) => Some(*v),
        Value::U64(v) => i64::try_from(*v).ok(),
        Value::I32(v) => Some(*v as i64),
        Value::U32(v) => Some(*v as i64),
        Value::F64(v) => Some(*v as i64),
        Value::Value(inner) => as_i64(inner),
        _ => None,
    }
}

fn as_strings(value: &Value<'_>) -> Vec<String> {
    match value {
        Value::Array(array) => array
            .iter()
            .filter_map(as_str)
            .map(str::to_string)
            .collect(),
        Value::Value(inner) => as_strings(inner),
        other => as_str(other).map(str::to_string).into_iter().collect(),
    }
}
