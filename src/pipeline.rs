use crate::api::article::fetch_article_text;
use crate::api::gnews::GNewsClient;
use crate::api::google_tts::GoogleTts;
use crate::api::image_search::{ImageSearchClient, download_image};
use crate::api::pexels::PexelsClient;
use crate::api::runway::RunwayClient;
use crate::api::youtube::YoutubeUploader;
use crate::config::{Secrets, Settings};
use crate::error::PipelineError;
use crate::ffmpeg::{self, Ffprobe};
use crate::filter_graph::{AudioMix, LogoOverlay, RenderLayout, RenderPlan, path_for_filter};
use crate::narration::{Narrator, narration_text};
use crate::sequence::{build_playlist, resolve_assets};
use crate::story::{Story, VideoMetadata};
use crate::subtitles::{AssStyle, write_ass};
use crate::{init, logi, logok, logw};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use walkdir::WalkDir;

const FALLBACK_VOICE: &str = "en-US-Wavenet-D";
const GENERATED_CLIP_SECONDS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub video: PathBuf,
    pub metadata: PathBuf,
    pub duration: f64,
    pub video_id: Option<String>,
}

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn file_exists(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn file_len(path: &Path) -> u64 {
    fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

/// Removes everything below `dir_path`, leaving the directory itself.
pub async fn clear_directory_contents(dir_path: &Path) -> Result<bool> {
    if fs::metadata(dir_path).await.is_err() {
        return Ok(true);
    }

    let mut clean = true;
    for entry in WalkDir::new(dir_path).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(path).await
        } else {
            fs::remove_file(path).await
        };
        if removed.is_err() {
            clean = false;
        }
    }

    Ok(clean)
}

/// Picks one of the configured background tracks that exists on disk.
pub fn pick_background_music(candidates: &[PathBuf], rng: &mut StdRng) -> Option<PathBuf> {
    let present: Vec<&PathBuf> = candidates.iter().filter(|p| p.is_file()).collect();
    present.choose(rng).map(|p| (*p).clone())
}

async fn fetch_story(client: &Client, settings: &Settings, secrets: &Secrets) -> Result<Story> {
    let token = Secrets::require(&secrets.gnews_key, "GNEWS_KEY")?;
    let gnews = GNewsClient::new(client.clone(), token, &settings.news_lang, &settings.news_country);

    logi("Fetching news...");
    let headline = match gnews.top_headline().await {
        Ok(Some(h)) => h,
        Ok(None) => return Err(PipelineError::NoStory.into()),
        Err(err) => {
            logw(format!("News fetch error: {:#}", err));
            return Err(PipelineError::NoStory.into());
        }
    };
    logok(format!("Headline: {}", headline.title));

    let body = match fetch_article_text(client, &headline.url).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            logw("Article page had no readable paragraphs; using the feed summary.");
            headline.summary()
        }
        Err(err) => {
            logw(format!("Article scrape failed ({:#}); using the feed summary.", err));
            headline.summary()
        }
    };

    Ok(Story::new(headline.title, headline.url, body))
}

async fn gather_images(client: &Client, settings: &Settings, secrets: &Secrets, story: &mut Story) -> Result<()> {
    if settings.image_count == 0 {
        return Ok(());
    }
    let api_key = Secrets::require(&secrets.gcp_api_key, "GCP_API_KEY")?;
    let cse_id = Secrets::require(&secrets.cse_id, "GSEARCH_CSE_ID")?;
    let search = ImageSearchClient::new(client.clone(), api_key, cse_id);

    logi("Searching for images...");
    let urls = match search.search(&story.title, settings.image_count, &settings.skip_domains).await {
        Ok(urls) => urls,
        Err(err) => {
            logw(format!("Image search failed: {:#}", err));
            return Ok(());
        }
    };

    logi(format!("Downloading up to {} of {} images...", settings.image_count, urls.len()));
    let images_dir = settings.images_dir();
    for (i, url) in urls.iter().enumerate() {
        let stem = images_dir.join(format!("img_{:03}", i));
        match download_image(client, url, &stem).await {
            Ok(Some(path)) => story.images.push(path),
            Ok(None) => {}
            Err(err) => logw(format!("Image download failed: {:#}", err)),
        }
        if story.images.len() >= settings.image_count {
            break;
        }
    }
    logok(format!("Images downloaded: {}", story.images.len()));
    Ok(())
}

async fn gather_clips(client: &Client, settings: &Settings, secrets: &Secrets, story: &mut Story) {
    let clips_dir = settings.clips_dir();

    if let (Some(key), true) = (secrets.pexels_key.as_deref(), settings.clip_count > 0) {
        let pexels = PexelsClient::new(client.clone(), key);
        match pexels.search_videos(&story.title, settings.clip_count).await {
            Ok(videos) => {
                for video in videos.iter().take(settings.clip_count) {
                    match pexels.download(video, settings.width, &clips_dir).await {
                        Ok(Some(path)) => story.clips.push(path),
                        Ok(None) => {}
                        Err(err) => logw(format!("Pexels download failed: {:#}", err)),
                    }
                }
            }
            Err(err) => logw(format!("Pexels search failed: {:#}", err)),
        }
    }

    for (i, url) in settings.extra_clip_urls.iter().enumerate() {
        match ffmpeg::ytdlp_download(url, &clips_dir, &format!("extra_{:02}", i)).await {
            Ok(path) => story.clips.push(path),
            Err(err) => logw(format!("yt-dlp failed for {}: {:#}", url, err)),
        }
    }

    if settings.generate_clip {
        match secrets.runway_key.as_deref() {
            Some(key) => {
                let runway = RunwayClient::new(client.clone(), key);
                let dest = clips_dir.join("generated.mp4");
                logi("Requesting generated clip...");
                match runway.generate_clip(&story.title, GENERATED_CLIP_SECONDS, &dest).await {
                    Ok(()) => story.clips.push(dest),
                    Err(err) => logw(format!("Clip generation failed: {:#}", err)),
                }
            }
            None => logw("generate_clip is set but RUNWAY_API_KEY is missing; skipping."),
        }
    }

    if !story.clips.is_empty() {
        logok(format!("Clips gathered: {}", story.clips.len()));
    }
}

async fn narrate(narrator: &dyn Narrator, text: &str, voice_path: &Path) -> Result<f64> {
    if let Err(err) = narrator.synthesize(text, voice_path).await {
        return Err(PipelineError::NoNarration(format!("{:#}", err)).into());
    }
    if !file_exists(voice_path).await || file_len(voice_path).await == 0 {
        return Err(PipelineError::NoNarration(format!("{} is empty", voice_path.display())).into());
    }
    ffmpeg::ffprobe_duration_seconds(voice_path)
        .await
        .map_err(|err| PipelineError::NoNarration(format!("unreadable narration: {:#}", err)).into())
}

/// Render length and subtitle span for a narration of `voice_seconds`.
/// Subtitles follow the full narration; the render cut drops late events.
fn timeline(voice_seconds: f64, max_video_seconds: f64) -> (f64, f64) {
    (voice_seconds.min(max_video_seconds), voice_seconds)
}

async fn upload(client: &Client, settings: &Settings, secrets: &Secrets, video: &Path, metadata: &VideoMetadata) -> Result<Option<String>> {
    if !settings.upload {
        logi("Upload disabled; keeping the rendered file only.");
        return Ok(None);
    }
    let Some(credentials) = secrets.youtube.clone() else {
        logw("YouTube credentials missing; skipping upload.");
        return Ok(None);
    };

    logi("Uploading to YouTube...");
    let uploader = YoutubeUploader::new(client.clone(), credentials);
    let id = uploader.upload(video, metadata).await?;
    Ok(Some(id))
}

pub async fn run_pipeline(settings: &Settings, secrets: &Secrets) -> Result<PipelineOutcome> {
    let client = crate::api::build_client()?;
    init::ensure_directories(settings).await?;

    logi(format!("Clearing {}...", settings.work_dir.display()));
    if !clear_directory_contents(&settings.work_dir).await? {
        logw("Failed to fully clear the work directory (continuing anyway).");
    }
    init::ensure_directories(settings).await?;

    let mut rng = StdRng::seed_from_u64(now_seed());

    let mut story = fetch_story(&client, settings, secrets).await?;
    let narration = narration_text(&settings.intro, &story.title, &story.body);

    gather_images(&client, settings, secrets, &mut story).await?;
    gather_clips(&client, settings, secrets, &mut story).await;
    if !story.has_visuals() {
        return Err(PipelineError::NoVisualAssets.into());
    }

    let api_key = Secrets::require(&secrets.gcp_api_key, "GCP_API_KEY")?;
    let voice = settings
        .tts_voices
        .choose(&mut rng)
        .map(String::as_str)
        .unwrap_or(FALLBACK_VOICE);
    let tts = GoogleTts::new(client.clone(), api_key, &settings.tts_language, voice);

    logi(format!("Creating voiceover with {}...", tts.voice()));
    let voice_path = settings.work_dir.join("voice.mp3");
    let voice_seconds = narrate(&tts, &narration, &voice_path).await?;
    let (target, subtitle_span) = timeline(voice_seconds, settings.max_video_seconds);
    logok(format!("Narration: {:.2}s (rendering {:.2}s)", voice_seconds, target));

    logi("Creating subtitles...");
    let ass_path = settings.work_dir.join("subtitles.ass");
    let style = AssStyle {
        play_res_x: settings.width,
        play_res_y: settings.height,
        font: settings.subtitle_font.clone(),
        font_size: settings.subtitle_font_size,
        wrap_width: settings.subtitle_wrap,
    };
    write_ass(&narration, subtitle_span, &style, &ass_path).await?;

    let assets = resolve_assets(&story.images, &story.clips, &Ffprobe).await;
    let playlist = build_playlist(&assets, target, settings.image_seconds, &mut rng).map_err(PipelineError::from)?;
    logok(format!(
        "Playlist: {} entries covering {:.2}s of {:.2}s",
        playlist.len(),
        playlist.covered,
        playlist.target
    ));

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let logo = match &settings.logo {
        Some(path) if path.is_file() => Some(LogoOverlay {
            path: path.clone(),
            width: settings.logo_width,
            margin: 20,
        }),
        Some(path) => {
            logw(format!("Logo {} not found; rendering without it.", path.display()));
            None
        }
        None => None,
    };
    let layout = RenderLayout {
        width: settings.width,
        height: settings.height,
        fps: settings.fps,
        logo,
        subtitles: Some(path_for_filter(&ass_path, &cwd)),
    };

    let music = pick_background_music(&settings.bgm_files, &mut rng);
    match &music {
        Some(path) => logi(format!("Mixing background music: {}", path.display())),
        None => logw("No background music found; output will be narration-only."),
    }
    let audio = AudioMix {
        voice: voice_path.clone(),
        voice_volume: settings.voice_volume,
        music,
        music_volume: settings.bgm_volume,
    };

    let plan = RenderPlan::build(&playlist, &layout, &audio).map_err(PipelineError::from)?;
    let output = settings.output_path(chrono::Local::now().date_naive());
    logi("Rendering final video...");
    ffmpeg::render(&plan, &output, target).await?;
    logok(format!("Final video rendered: {}", output.display()));

    let metadata = VideoMetadata::for_story(&story, &settings.tags, &settings.category_id, &settings.privacy_status);
    let metadata_path = output.with_extension("json");
    metadata.write_json(&metadata_path).await?;
    logok(format!("Metadata written: {}", metadata_path.display()));

    let video_id = upload(&client, settings, secrets, &output, &metadata).await?;

    if settings.keep_work_files {
        logi(format!("Keeping work files in {}", settings.work_dir.display()));
    } else {
        logi("Cleaning up temporary files...");
        if clear_directory_contents(&settings.work_dir).await? {
            logok("Cleanup complete.");
        } else {
            logw("Some temporary files could not be removed.");
        }
    }

    Ok(PipelineOutcome {
        video: output,
        metadata: metadata_path,
        duration: target,
        video_id,
    })
}
