//! Thumbnail download for the preview pane

use crate::error::{GrabError, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("yt-grab/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(15);

/// Fetch the raw image bytes behind a thumbnail URL.
///
/// Non-success HTTP statuses surface as `Network`; callers treat any
/// failure as "no preview".
pub async fn fetch_thumbnail(url: &str) -> Result<Vec<u8>> {
    let url = url.trim();
    if url.is_empty() {
        return Err(GrabError::InvalidArgument("thumbnail URL is empty".into()));
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(TIMEOUT)
        .build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    tracing::debug!(url, len = bytes.len(), "thumbnail fetched");
    Ok(bytes.to_vec())
}

/// Guess an image extension from its magic bytes
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [0x89, b'P', b'N', b'G', ..] => "png",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        _ => "img",
    }
}
