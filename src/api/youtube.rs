use crate::config::YoutubeCredentials;
use crate::story::VideoMetadata;
use crate::{logi, logok};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URI: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

pub struct YoutubeUploader {
    client: Client,
    credentials: YoutubeCredentials,
}

impl YoutubeUploader {
    pub fn new(client: Client, credentials: YoutubeCredentials) -> Self {
        Self { client, credentials }
    }

    async fn access_token(&self) -> Result<String> {
        let form = [
            ("client_id", self.credentials.client.client_id.as_str()),
            ("client_secret", self.credentials.client.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let resp = self
            .client
            .post(TOKEN_URI)
            .form(&form)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .context("OAuth token request failed")?
            .error_for_status()
            .context("OAuth token refresh rejected")?;
        let token: TokenResponse = resp.json().await.context("Failed to parse OAuth token")?;
        Ok(token.access_token)
    }

    /// Uploads `video_path` and returns the new video id.
    pub async fn upload(&self, video_path: &Path, metadata: &VideoMetadata) -> Result<String> {
        let bytes = fs::read(video_path)
            .await
            .with_context(|| format!("Failed to read {}", video_path.display()))?;
        let token = self.access_token().await?;

        logi(format!("Opening upload session for {} ({} bytes)", video_path.display(), bytes.len()));
        let session = self
            .client
            .post(UPLOAD_URI)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", bytes.len().to_string())
            .json(&upload_body(metadata))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .context("YouTube upload session request failed")?
            .error_for_status()
            .context("YouTube upload session rejected")?;

        let location = session
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("YouTube upload session returned no Location header")?;

        let resp = self
            .client
            .put(&location)
            .bearer_auth(&token)
            .header("Content-Type", "video/mp4")
            .body(bytes)
            .timeout(Duration::from_secs(600))
            .send()
            .await
            .context("YouTube upload failed")?
            .error_for_status()
            .context("YouTube upload rejected")?;

        let video: UploadedVideo = resp.json().await.context("Failed to parse upload response")?;
        logok(format!("Video uploaded: https://youtube.com/watch?v={}", video.id));
        Ok(video.id)
    }
}

fn upload_body(metadata: &VideoMetadata) -> Value {
    json!({
        "snippet": {
            "title": metadata.title,
            "description": metadata.description,
            "tags": metadata.tags,
            "categoryId": metadata.category_id,
        },
        "status": {"privacyStatus": metadata.privacy_status},
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_matches_videos_insert_shape() {
        let meta = VideoMetadata {
            title: "Storm hits coast".to_string(),
            description: "Heavy rain".to_string(),
            tags: vec!["news".to_string()],
            category_id: "25".to_string(),
            privacy_status: "private".to_string(),
        };
        let body = upload_body(&meta);
        assert_eq!(body["snippet"]["title"], "Storm hits coast");
        assert_eq!(body["snippet"]["tags"][0], "news");
        assert_eq!(body["snippet"]["categoryId"], "25");
        assert_eq!(body["status"]["privacyStatus"], "private");
    }
}
