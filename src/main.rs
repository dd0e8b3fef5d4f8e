use anyhow::Result;
use news_shorts::PipelineError;
use news_shorts::config::{DEFAULT_SETTINGS_PATH, Secrets, Settings};
use news_shorts::init;
use news_shorts::pipeline::run_pipeline;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings_path =
        std::env::var("NEWS_SHORTS_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let settings = Settings::load(&settings_path).await?;
    let secrets = Secrets::from_env()?;

    init::ensure_directories(&settings).await?;
    if !init::check_tools(!settings.extra_clip_urls.is_empty()).await {
        warn!("Rendering will fail without ffmpeg and ffprobe.");
    }

    match run_pipeline(&settings, &secrets).await {
        Ok(outcome) => {
            info!(
                video = %outcome.video.display(),
                metadata = %outcome.metadata.display(),
                "Done ({:.2}s)",
                outcome.duration
            );
            if let Some(id) = outcome.video_id {
                info!("https://youtube.com/watch?v={}", id);
            }
            Ok(())
        }
        Err(err) => {
            let code = err
                .downcast_ref::<PipelineError>()
                .map(PipelineError::code)
                .unwrap_or("FAILED");
            error!(code, "{:#}", err);
            std::process::exit(1);
        }
    }
}
