use crate::error::PipelineError;
use crate::logi;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_SETTINGS_PATH: &str = "news_shorts.json";

/// Pipeline knobs, read from a JSON file. Every field has a default so a
/// missing or partial file still yields a runnable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,

    pub news_lang: String,
    pub news_country: String,
    pub intro: String,

    pub image_count: usize,
    pub clip_count: usize,
    pub image_seconds: f64,
    pub max_video_seconds: f64,
    pub skip_domains: Vec<String>,
    pub extra_clip_urls: Vec<String>,
    pub generate_clip: bool,

    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub logo: Option<PathBuf>,
    pub logo_width: u32,
    pub bgm_files: Vec<PathBuf>,
    pub voice_volume: f64,
    pub bgm_volume: f64,
    pub subtitle_wrap: usize,
    pub subtitle_font: String,
    pub subtitle_font_size: u32,

    pub tts_language: String,
    pub tts_voices: Vec<String>,

    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: String,
    pub upload: bool,
    pub keep_work_files: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("work"),
            output_dir: PathBuf::from("output"),
            output_name: "news_{date}.mp4".to_string(),
            news_lang: "en".to_string(),
            news_country: "us".to_string(),
            intro: "Welcome! Please like, comment and subscribe. On today's latest:".to_string(),
            image_count: 10,
            clip_count: 3,
            image_seconds: 5.0,
            max_video_seconds: 420.0,
            skip_domains: [
                "washingtonpost.com",
                "navigacloud.com",
                "redlakenationnews.com",
                "arc-anglerfish-washpost-prod-washpost.s3.amazonaws.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            extra_clip_urls: Vec::new(),
            generate_clip: false,
            width: 1280,
            height: 720,
            fps: 30,
            logo: Some(PathBuf::from("assets/logo.gif")),
            logo_width: 160,
            bgm_files: vec![PathBuf::from("assets/bkg1.mp3"), PathBuf::from("assets/bkg2.mp3")],
            voice_volume: 1.0,
            bgm_volume: 0.05,
            subtitle_wrap: 70,
            subtitle_font: "Arial".to_string(),
            subtitle_font_size: 56,
            tts_language: "en-US".to_string(),
            tts_voices: vec!["en-US-Wavenet-D".to_string(), "en-US-Wavenet-F".to_string()],
            tags: vec![
                "news".to_string(),
                "ai generated".to_string(),
                "daily news".to_string(),
            ],
            category_id: "25".to_string(),
            privacy_status: "public".to_string(),
            upload: true,
            keep_work_files: false,
        }
    }
}

impl Settings {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if fs::metadata(path).await.is_err() {
            logi(format!("No settings file at {}; using defaults.", path.display()));
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.image_seconds.is_finite() && self.image_seconds > 0.0) {
            anyhow::bail!("settings: image_seconds must be positive");
        }
        if !(self.max_video_seconds.is_finite() && self.max_video_seconds > 0.0) {
            anyhow::bail!("settings: max_video_seconds must be positive");
        }
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            anyhow::bail!("settings: width and height must be positive and even");
        }
        if self.fps == 0 {
            anyhow::bail!("settings: fps must be positive");
        }
        if self.bgm_volume < 0.0 || self.voice_volume < 0.0 {
            anyhow::bail!("settings: volumes cannot be negative");
        }
        if self.tts_voices.is_empty() {
            anyhow::bail!("settings: tts_voices is empty");
        }
        Ok(())
    }

    /// Output file name with `{date}` replaced by the run date.
    pub fn output_path(&self, date: chrono::NaiveDate) -> PathBuf {
        let name = self
            .output_name
            .replace("{date}", &date.format("%Y-%m-%d").to_string());
        self.output_dir.join(name)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.work_dir.join("images")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.work_dir.join("clips")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct InstalledSecret {
    installed: OAuthClient,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YoutubeCredentials {
    pub client: OAuthClient,
    pub refresh_token: String,
}

/// API keys and OAuth material, taken from the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Secrets {
    pub gnews_key: Option<String>,
    pub gcp_api_key: Option<String>,
    pub cse_id: Option<String>,
    pub pexels_key: Option<String>,
    pub runway_key: Option<String>,
    pub youtube: Option<YoutubeCredentials>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client = match get("YT_CLIENT_SECRET_JSON") {
            Some(json) => {
                let parsed: InstalledSecret = serde_json::from_str(&json)
                    .context("YT_CLIENT_SECRET_JSON is not a valid installed-app client secret")?;
                Some(parsed.installed)
            }
            None => match (get("YT_CLIENT_ID"), get("YT_CLIENT_SECRET")) {
                (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                    client_id,
                    client_secret,
                }),
                _ => None,
            },
        };
        let youtube = match (client, get("YT_REFRESH_TOKEN")) {
            (Some(client), Some(refresh_token)) => Some(YoutubeCredentials {
                client,
                refresh_token,
            }),
            _ => None,
        };

        Ok(Self {
            gnews_key: get("GNEWS_KEY"),
            gcp_api_key: get("GCP_API_KEY"),
            cse_id: get("GSEARCH_CSE_ID"),
            pexels_key: get("PEXELS_API_KEY"),
            runway_key: get("RUNWAY_API_KEY"),
            youtube,
        })
    }

    pub fn require<'a>(
        value: &'a Option<String>,
        name: &'static str,
    ) -> Result<&'a str, PipelineError> {
        value
            .as_deref()
            .ok_or(PipelineError::MissingCredential(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("absent.json")).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn partial_file_overrides_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"image_count": 4, "width": 1920, "height": 1080, "logo": null}"#)
            .await
            .unwrap();

        let settings = Settings::load(&path).await.unwrap();
        assert_eq!(settings.image_count, 4);
        assert_eq!((settings.width, settings.height), (1920, 1080));
        assert_eq!(settings.logo, None);
        assert_eq!(settings.image_seconds, 5.0);
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"width": 1281}"#).await.unwrap();
        let err = Settings::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("even"));
    }

    #[test]
    fn output_path_substitutes_date() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            Settings::default().output_path(date),
            PathBuf::from("output/news_2026-03-09.mp4")
        );
    }

    #[test]
    fn secrets_from_installed_client_json() {
        let secrets = Secrets::from_lookup(lookup(&[
            ("GNEWS_KEY", "g"),
            (
                "YT_CLIENT_SECRET_JSON",
                r#"{"installed":{"client_id":"id","client_secret":"sec"}}"#,
            ),
            ("YT_REFRESH_TOKEN", "rt"),
            ("PEXELS_API_KEY", "  "),
        ]))
        .unwrap();

        assert_eq!(secrets.gnews_key.as_deref(), Some("g"));
        assert_eq!(secrets.pexels_key, None);
        let yt = secrets.youtube.unwrap();
        assert_eq!(yt.client.client_id, "id");
        assert_eq!(yt.refresh_token, "rt");
    }

    #[test]
    fn secrets_from_split_client_vars() {
        let secrets = Secrets::from_lookup(lookup(&[
            ("YT_CLIENT_ID", "id"),
            ("YT_CLIENT_SECRET", "sec"),
            ("YT_REFRESH_TOKEN", "rt"),
        ]))
        .unwrap();
        assert!(secrets.youtube.is_some());

        let no_token =
            Secrets::from_lookup(lookup(&[("YT_CLIENT_ID", "id"), ("YT_CLIENT_SECRET", "sec")])).unwrap();
        assert!(no_token.youtube.is_none());
    }

    #[test]
    fn bad_client_json_is_an_error() {
        assert!(Secrets::from_lookup(lookup(&[("YT_CLIENT_SECRET_JSON", "{}")])).is_err());
    }

    #[test]
    fn require_names_the_variable() {
        let secrets = Secrets::default();
        let err = Secrets::require(&secrets.gnews_key, "GNEWS_KEY").unwrap_err();
        assert_eq!(err.to_string(), "missing credential: GNEWS_KEY");
    }
}
