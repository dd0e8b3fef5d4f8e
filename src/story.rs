use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_BYTES: usize = 5000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Story {
    pub title: String,
    pub url: String,
    pub body: String,
    pub images: Vec<PathBuf>,
    pub clips: Vec<PathBuf>,
}

impl Story {
    pub fn new(title: impl Into<String>, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn has_visuals(&self) -> bool {
        !self.images.is_empty() || !self.clips.is_empty()
    }
}

/// Snippet and status of the upload request, handed from render to upload
/// through a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    #[serde(default = "default_privacy_status")]
    pub privacy_status: String,
}

fn default_category_id() -> String {
    "25".to_string()
}

fn default_privacy_status() -> String {
    "public".to_string()
}

impl VideoMetadata {
    pub fn for_story(
        story: &Story,
        tags: &[String],
        category_id: &str,
        privacy_status: &str,
    ) -> Self {
        let mut description = story.body.trim().to_string();
        if !story.url.is_empty() {
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str("Source: ");
            description.push_str(&story.url);
        }

        Self {
            title: truncate_chars(story.title.trim(), MAX_TITLE_CHARS),
            description: truncate_bytes(&description, MAX_DESCRIPTION_BYTES),
            tags: tags.to_vec(),
            category_id: category_id.to_string(),
            privacy_status: privacy_status.to_string(),
        }
    }

    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .await
            .with_context(|| format!("write metadata: {}", path.display()))
    }

    pub async fn read_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("read metadata: {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse metadata: {}", path.display()))
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}

fn truncate_bytes(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }
    let mut cut = max_bytes;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Vec<String> {
        vec!["news".to_string(), "daily news".to_string()]
    }

    #[test]
    fn metadata_caps_title_and_description() {
        let story = Story::new("t".repeat(150), "https://example.com/a", "ü".repeat(4000));
        let meta = VideoMetadata::for_story(&story, &tags(), "25", "public");

        assert_eq!(meta.title.chars().count(), 100);
        assert!(meta.description.len() <= 5000);
        assert!(meta.description.chars().all(|c| c == 'ü'));
    }

    #[test]
    fn description_cites_the_source() {
        let story = Story::new("Title", "https://example.com/a", "Body text.");
        let meta = VideoMetadata::for_story(&story, &tags(), "25", "unlisted");
        assert_eq!(meta.description, "Body text.\n\nSource: https://example.com/a");
        assert_eq!(meta.privacy_status, "unlisted");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let meta: VideoMetadata =
            serde_json::from_str(r#"{"title":"a","description":"b"}"#).unwrap();
        assert!(meta.tags.is_empty());
        assert_eq!(meta.category_id, "25");
        assert_eq!(meta.privacy_status, "public");
    }

    #[tokio::test]
    async fn metadata_file_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        let story = Story::new("Storm hits coast", "", "Heavy rain expected.");
        let meta = VideoMetadata::for_story(&story, &tags(), "25", "public");

        meta.write_json(&path).await.unwrap();
        let back = VideoMetadata::read_json(&path).await.unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn visuals_flag() {
        let mut story = Story::new("a", "b", "c");
        assert!(!story.has_visuals());
        story.clips.push(PathBuf::from("clip.mp4"));
        assert!(story.has_visuals());
    }
}
