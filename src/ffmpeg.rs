use crate::error::PipelineError;
use crate::filter_graph::RenderPlan;
use crate::logi;
use crate::sequence::DurationProbe;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

async fn run_cmd(args: &[String]) -> Result<()> {
    let Some((program, rest)) = args.split_first() else {
        return Ok(());
    };

    let status = Command::new(program)
        .args(rest)
        .status()
        .await
        .with_context(|| format!("{} execution failed", program))?;
    if !status.success() {
        return Err(PipelineError::Subprocess {
            program: program.clone(),
            status: status.to_string(),
        }
        .into());
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed for {}", path.display()));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    parse_duration(&text).ok_or_else(|| anyhow::anyhow!("Invalid duration {:?}", text))
}

fn parse_duration(text: &str) -> Option<f64> {
    let duration = text.lines().next()?.trim().parse::<f64>().ok()?;
    if duration.is_finite() && duration > 0.1 {
        Some(duration)
    } else {
        None
    }
}

/// ffprobe-backed [`DurationProbe`].
pub struct Ffprobe;

#[async_trait]
impl DurationProbe for Ffprobe {
    async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        ffprobe_duration_seconds(path).await
    }
}

/// Runs the final render. Every input must already be on disk.
pub async fn render(plan: &RenderPlan, output: &Path, target_seconds: f64) -> Result<()> {
    if let Some(missing) = plan.missing_inputs().first() {
        return Err(PipelineError::MissingInput(missing.to_path_buf()).into());
    }
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }

    let args = plan.to_ffmpeg_args(output, target_seconds);
    logi(format!(
        "ffmpeg: {} inputs, {:.2}s -> {}",
        plan.inputs.len(),
        target_seconds,
        output.display()
    ));
    run_cmd(&args).await?;

    if !output.exists() {
        return Err(PipelineError::MissingInput(output.to_path_buf()).into());
    }
    Ok(())
}

/// Downloads `url` as mp4 into `dest_dir/stem.mp4` with yt-dlp.
pub async fn ytdlp_download(url: &str, dest_dir: &Path, stem: &str) -> Result<PathBuf> {
    let out = dest_dir.join(format!("{stem}.mp4"));
    let args = vec![
        "yt-dlp".to_string(),
        "--no-playlist".to_string(),
        "--quiet".to_string(),
        "-f".to_string(),
        "mp4/bestvideo[ext=mp4]/best".to_string(),
        "-o".to_string(),
        out.display().to_string(),
        url.to_string(),
    ];
    run_cmd(&args).await?;
    if !out.exists() {
        anyhow::bail!("yt-dlp produced no file for {}", url);
    }
    Ok(out)
}
