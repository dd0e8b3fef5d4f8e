use anyhow::{Context, Result};
use news_shorts::api::build_client;
use news_shorts::api::youtube::YoutubeUploader;
use news_shorts::config::Secrets;
use news_shorts::story::VideoMetadata;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: news-shorts-upload <video.mp4> [metadata.json]";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args_os().skip(1);
    let video = PathBuf::from(args.next().context(USAGE)?);
    let metadata_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| video.with_extension("json"));

    let metadata = VideoMetadata::read_json(&metadata_path).await?;
    let credentials = Secrets::from_env()?
        .youtube
        .context("set YT_REFRESH_TOKEN and YT_CLIENT_SECRET_JSON (or YT_CLIENT_ID/YT_CLIENT_SECRET)")?;

    let uploader = YoutubeUploader::new(build_client()?, credentials);
    let id = uploader.upload(&video, &metadata).await?;
    info!("Uploaded Video ID: {}", id);
    Ok(())
}
