use crate::config::Settings;
use crate::{logi, logw};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

const REQUIRED_TOOLS: &[(&str, &str)] = &[("ffmpeg", "-version"), ("ffprobe", "-version")];
const OPTIONAL_TOOLS: &[(&str, &str)] = &[("yt-dlp", "--version")];

fn required_dirs(settings: &Settings) -> Vec<PathBuf> {
    vec![
        settings.work_dir.clone(),
        settings.images_dir(),
        settings.clips_dir(),
        settings.output_dir.clone(),
    ]
}

pub async fn ensure_directories(settings: &Settings) -> Result<()> {
    for dir in required_dirs(settings) {
        if fs::metadata(&dir).await.is_err() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

pub async fn tool_available(program: &str, version_flag: &str) -> bool {
    match tokio::process::Command::new(program)
        .arg(version_flag)
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Returns false when a tool the render cannot do without is missing.
pub async fn check_tools(need_ytdlp: bool) -> bool {
    let mut ok = true;
    for (program, flag) in REQUIRED_TOOLS {
        if !tool_available(program, flag).await {
            logw(format!("{} not found in PATH. Please install FFmpeg.", program));
            ok = false;
        }
    }
    if need_ytdlp {
        for (program, flag) in OPTIONAL_TOOLS {
            if !tool_available(program, flag).await {
                logw(format!("{} not found in PATH; extra clip URLs will be skipped.", program));
            }
        }
    }
    ok
}
