use super::download_to;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const PEXELS_VIDEO_SEARCH: &str = "https://api.pexels.com/videos/search";

#[derive(Debug, Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PexelsVideo {
    pub id: u64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoFile {
    pub link: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_type: Option<String>,
}

impl PexelsVideo {
    /// Widest mp4 rendition that does not exceed `max_width`, falling back to
    /// the narrowest one when all are larger.
    pub fn best_file(&self, max_width: u32) -> Option<&VideoFile> {
        let mp4s = self
            .video_files
            .iter()
            .filter(|f| f.file_type.as_deref().map_or(true, |t| t == "video/mp4"));
        let fitting = mp4s
            .clone()
            .filter(|f| f.width.unwrap_or(0) <= max_width)
            .max_by_key(|f| f.width.unwrap_or(0));
        fitting.or_else(|| mp4s.min_by_key(|f| f.width.unwrap_or(u32::MAX)))
    }
}

pub struct PexelsClient {
    client: Client,
    api_key: String,
}

impl PexelsClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    pub async fn search_videos(&self, query: &str, count: usize) -> Result<Vec<PexelsVideo>> {
        let per_page = count.clamp(1, 80).to_string();
        let resp = self
            .client
            .get(PEXELS_VIDEO_SEARCH)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("Pexels request failed")?
            .error_for_status()
            .context("Pexels HTTP error")?;

        let body = resp.text().await.context("Pexels response read failed")?;
        let parsed: VideoSearchResponse =
            serde_json::from_str(&body).context("Failed to parse Pexels response")?;
        Ok(parsed.videos)
    }

    /// Downloads the best rendition of `video` to `dest_dir/pexels_<id>.mp4`.
    pub async fn download(&self, video: &PexelsVideo, max_width: u32, dest_dir: &Path) -> Result<Option<PathBuf>> {
        let Some(file) = video.best_file(max_width) else {
            return Ok(None);
        };
        let dest = dest_dir.join(format!("pexels_{}.mp4", video.id));
        download_to(&self.client, &file.link, &dest, 60).await?;
        Ok(Some(dest))
    }
}
