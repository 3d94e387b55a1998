//! Media handling: remote video fetch, container sniffing and thumbnail
//! extraction through an external `ffmpeg` binary.

use image::ImageFormat;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::AppError;

/// Largest video accepted by upload or fetched for thumbnailing
pub const MAX_VIDEO_BYTES: usize = 8 * 1024 * 1024;
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("video fetch failed: {0}")]
    Fetch(String),

    #[error("video source responded with status {0}")]
    Status(u16),

    #[error("video exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffmpeg produced no frame: {0}")]
    NoFrame(String),

    #[error("media operation timed out")]
    Timeout,
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Fetch(_) | MediaError::Status(_) | MediaError::TooLarge(_) | MediaError::NoFrame(_) => {
                AppError::InvalidInput(err.to_string())
            }
            MediaError::Timeout => AppError::Transient(err.to_string()),
            MediaError::Spawn(_) => AppError::Internal(err.to_string()),
        }
    }
}

/// Content type of a video container: MP4/QuickTime (`ftyp` box at offset
/// 4) or WebM/Matroska (EBML header).
pub fn sniff_video(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some(if &bytes[8..12] == b"qt  " { "video/quicktime" } else { "video/mp4" });
    }
    if bytes.starts_with(&EBML_MAGIC) {
        return Some("video/webm");
    }
    None
}

pub fn is_video(bytes: &[u8]) -> bool {
    sniff_video(bytes).is_some()
}

/// Content type of an image recognised by the `image` crate.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    Some(match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    })
}

pub fn is_image(bytes: &[u8]) -> bool {
    sniff_image(bytes).is_some()
}

pub struct MediaProcessor {
    http: reqwest::Client,
    ffmpeg_path: String,
    timeout: Duration,
}

impl MediaProcessor {
    pub fn new(config: &MediaConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_millis(config.video_fetch_timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout,
        })
    }

    /// Download a video, refusing bodies larger than [`MAX_VIDEO_BYTES`].
    pub async fn fetch_video(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { MediaError::Timeout } else { MediaError::Fetch(e.to_string()) })?;

        if !response.status().is_success() {
            return Err(MediaError::Status(response.status().as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len as usize > MAX_VIDEO_BYTES)
        {
            return Err(MediaError::TooLarge(MAX_VIDEO_BYTES));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| if e.is_timeout() { MediaError::Timeout } else { MediaError::Fetch(e.to_string()) })?;
        if body.len() > MAX_VIDEO_BYTES {
            return Err(MediaError::TooLarge(MAX_VIDEO_BYTES));
        }

        debug!(url, size = body.len(), "fetched video");
        Ok(body.to_vec())
    }

    /// First frame of `video` as PNG bytes.
    pub async fn extract_thumbnail(&self, video: Vec<u8>) -> Result<Vec<u8>, MediaError> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-i",
                "pipe:0",
                "-frames:v",
                "1",
                "-f",
                "image2",
                "-vcodec",
                "png",
                "pipe:1",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::NoFrame("ffmpeg stdin unavailable".to_string()))?;

        // ffmpeg may stop reading once it has a frame; a broken pipe here is expected.
        let writer = tokio::spawn(async move {
            if let Err(err) = stdin.write_all(&video).await {
                debug!(error = %err, "ffmpeg closed stdin early");
            }
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout)??;

        if let Err(err) = writer.await {
            warn!(error = %err, "ffmpeg stdin writer failed");
        }

        if !output.status.success() || output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MediaError::NoFrame(stderr));
        }

        Ok(output.stdout)
    }
}
