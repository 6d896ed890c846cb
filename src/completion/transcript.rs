use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

const VIDEO_ID_LEN: usize = 11;

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
}

#[derive(Deserialize)]
struct VideoSnippet {
    #[serde(default)]
    description: String,
}

/// Fetch a transcript stand-in for a YouTube video: resolve the video id,
/// pull snippet metadata, and use the description as the transcript
/// fallback.
pub async fn fetch_transcript(
    http: &reqwest::Client,
    api_key: &str,
    video_url: &str,
) -> Result<String> {
    let video_id =
        extract_video_id(video_url).ok_or_else(|| anyhow!("invalid YouTube URL: {video_url}"))?;

    let url = format!(
        "https://www.googleapis.com/youtube/v3/videos?part=snippet&id={video_id}&key={api_key}"
    );

    let response = http
        .get(&url)
        .send()
        .await
        .context("video metadata request failed")?;

    if !response.status().is_success() {
        bail!("video metadata request returned {}", response.status());
    }

    let data: VideoListResponse = response
        .json()
        .await
        .context("failed to decode video metadata")?;

    let item = data
        .items
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("video not found: {video_id}"))?;

    Ok(item.snippet.description)
}

/// Pull the 11-character video id out of a YouTube URL: the first run of id
/// characters following either a `v=` parameter or a path separator.
pub fn extract_video_id(url: &str) -> Option<&str> {
    let bytes = url.as_bytes();

    for i in 0..bytes.len() {
        let start = if bytes[i..].starts_with(b"v=") {
            i + 2
        } else if bytes[i] == b'/' {
            i + 1
        } else {
            continue;
        };

        let end = start + VIDEO_ID_LEN;
        if end <= bytes.len() && bytes[start..end].iter().copied().all(is_id_byte) {
            return Some(&url[start..end]);
        }
    }

    None
}

fn is_id_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_watch_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=abc&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn extracts_from_short_urls() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn rejects_urls_without_an_id() {
        assert_eq!(extract_video_id("https://example.com/page"), None);
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
    }
}
