pub mod api;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod filter_graph;
pub mod init;
pub mod narration;
pub mod pipeline;
pub mod sequence;
pub mod story;
pub mod subtitles;

pub use error::PipelineError;

pub(crate) fn logi(message: impl AsRef<str>) {
    tracing::info!("{}", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    tracing::info!(status = "ok", "{}", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    tracing::warn!("{}", message.as_ref());
}
