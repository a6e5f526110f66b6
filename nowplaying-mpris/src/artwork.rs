use std::{fmt::Display, sync::Arc};

use image::imageops::FilterType;
use nowplaying_controls::{Result, error::Error, models::Bitmap};
use reqwest::Client;
use tracing::instrument;
use url::Url;

/// Loads artwork from an `http(s)` or `file` URL and scales it to fill the
/// requested size.
#[instrument(skip(client))]
pub(crate) async fn fetch(
    client: &Client,
    location: &str,
    width: u32,
    height: u32,
) -> Result<Bitmap> {
    let url = Url::parse(location).map_err(fetch_error)?;

    let bytes = match url.scheme() {
        "http" | "https" => client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(fetch_error)?
            .bytes()
            .await
            .map_err(fetch_error)?
            .to_vec(),
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| fetch_error(format!("not a local path: {location}")))?;
            tokio::fs::read(path).await.map_err(fetch_error)?
        }
        other => return Err(fetch_error(format!("unsupported scheme {other}"))),
    };

    decode(&bytes, width, height)
}

pub(crate) fn decode(bytes: &[u8], width: u32, height: u32) -> Result<Bitmap> {
    let image = image::load_from_memory(bytes)?;
    Ok(Arc::new(
        image
            .resize_to_fill(width, height, FilterType::Triangle)
            .to_rgba8(),
    ))
}

fn fetch_error(err: impl Display) -> Error {
    Error::ArtworkFetch {
        message: err.to_string(),
    }
}
