//! Builds the ffmpeg input list and `-filter_complex` expression for a
//! rendered playlist: every visual is scaled and padded to the output size,
//! the results are concatenated, an optional logo is overlaid, subtitles are
//! burned in and the narration is mixed with background music.

use crate::sequence::{MediaKind, Playlist, SequenceError};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct LogoOverlay {
    pub path: PathBuf,
    pub width: u32,
    pub margin: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderLayout {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub logo: Option<LogoOverlay>,
    pub subtitles: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioMix {
    pub voice: PathBuf,
    pub voice_volume: f64,
    pub music: Option<PathBuf>,
    pub music_volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    /// Still image looped for a fixed number of seconds.
    LoopedImage { path: PathBuf, seconds: f64 },
    Clip { path: PathBuf },
    /// Logo or gif repeated for the whole render.
    Overlay { path: PathBuf },
    Audio { path: PathBuf },
    LoopedAudio { path: PathBuf },
}

impl InputSpec {
    pub fn path(&self) -> &Path {
        match self {
            Self::LoopedImage { path, .. }
            | Self::Clip { path }
            | Self::Overlay { path }
            | Self::Audio { path }
            | Self::LoopedAudio { path } => path,
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            Self::LoopedImage { path, seconds } => {
                // the gif demuxer has no -loop option
                if is_gif(path) {
                    args.extend(["-ignore_loop".to_string(), "0".to_string()]);
                } else {
                    args.extend(["-loop".to_string(), "1".to_string()]);
                }
                args.extend(["-t".to_string(), format!("{:.3}", seconds)]);
            }
            Self::Overlay { path } => {
                if is_gif(path) {
                    args.extend(["-ignore_loop".to_string(), "0".to_string()]);
                } else {
                    args.extend(["-loop".to_string(), "1".to_string()]);
                }
            }
            Self::LoopedAudio { .. } => {
                args.extend(["-stream_loop".to_string(), "-1".to_string()]);
            }
            Self::Clip { .. } | Self::Audio { .. } => {}
        }
        args.push("-i".to_string());
        args.push(self.path().display().to_string());
    }
}

fn is_gif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gif"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub inputs: Vec<InputSpec>,
    pub filter: String,
    pub video_label: String,
    pub audio_label: String,
    pub fps: u32,
}

impl RenderPlan {
    pub fn build(
        playlist: &Playlist,
        layout: &RenderLayout,
        audio: &AudioMix,
    ) -> Result<Self, SequenceError> {
        if playlist.is_empty() {
            return Err(SequenceError::NoVisualAssets);
        }

        let (w, h, fps) = (layout.width, layout.height, layout.fps);
        let mut inputs = Vec::with_capacity(playlist.len() + 3);
        let mut filter = String::new();

        for (idx, entry) in playlist.entries.iter().enumerate() {
            let trim = match entry.kind {
                MediaKind::Image => {
                    inputs.push(InputSpec::LoopedImage {
                        path: entry.path.clone(),
                        seconds: entry.duration,
                    });
                    if is_gif(&entry.path) {
                        // a single-frame gif decodes to one frame; hold it
                        format!(
                            "tpad=stop_mode=clone:stop_duration={d:.3},trim=duration={d:.3},",
                            d = entry.duration
                        )
                    } else {
                        String::new()
                    }
                }
                MediaKind::Clip => {
                    inputs.push(InputSpec::Clip {
                        path: entry.path.clone(),
                    });
                    if entry.duration > 0.0 {
                        format!("trim=duration={:.3},", entry.duration)
                    } else {
                        String::new()
                    }
                }
            };
            let _ = write!(
                filter,
                "[{idx}:v]{trim}setpts=PTS-STARTPTS,scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,setsar=1,fps={fps},format=yuv420p[v{idx}];"
            );
        }

        for idx in 0..playlist.len() {
            let _ = write!(filter, "[v{idx}]");
        }
        let _ = write!(filter, "concat=n={}:v=1:a=0", playlist.len());
        if !playlist.is_complete() {
            // hold the last frame so the output still reaches the target
            let _ = write!(
                filter,
                ",tpad=stop_mode=clone:stop_duration={:.3}",
                playlist.target
            );
        }
        filter.push_str("[vcat]");
        let mut video = "vcat".to_string();

        if let Some(logo) = &layout.logo {
            let logo_idx = inputs.len();
            inputs.push(InputSpec::Overlay {
                path: logo.path.clone(),
            });
            let m = logo.margin;
            let _ = write!(
                filter,
                ";[{logo_idx}:v]scale={}:-1[logo];[{video}][logo]overlay=W-w-{m}:{m}:shortest=1[vlogo]",
                logo.width
            );
            video = "vlogo".to_string();
        }

        if let Some(subs) = &layout.subtitles {
            let _ = write!(
                filter,
                ";[{video}]subtitles={}[vsub]",
                escape_filter_value(&subs.display().to_string())
            );
            video = "vsub".to_string();
        }

        let voice_idx = inputs.len();
        inputs.push(InputSpec::Audio {
            path: audio.voice.clone(),
        });
        match &audio.music {
            Some(music) => {
                let music_idx = inputs.len();
                inputs.push(InputSpec::LoopedAudio {
                    path: music.clone(),
                });
                let _ = write!(
                    filter,
                    ";[{voice_idx}:a]volume={:.3}[a1];[{music_idx}:a]volume={:.3}[a2];[a1][a2]amix=inputs=2:duration=first:normalize=0[aout]",
                    audio.voice_volume, audio.music_volume
                );
            }
            None => {
                let _ = write!(
                    filter,
                    ";[{voice_idx}:a]volume={:.3}[aout]",
                    audio.voice_volume
                );
            }
        }

        Ok(Self {
            inputs,
            filter,
            video_label: video,
            audio_label: "aout".to_string(),
            fps,
        })
    }

    /// Input files that are not on disk yet.
    pub fn missing_inputs(&self) -> Vec<&Path> {
        self.inputs
            .iter()
            .map(InputSpec::path)
            .filter(|p| !p.exists())
            .collect()
    }

    /// Full ffmpeg command line, program name first. The output is cut at
    /// exactly `target_seconds`.
    pub fn to_ffmpeg_args(&self, output: &Path, target_seconds: f64) -> Vec<String> {
        let mut args = vec![
            "ffmpeg".to_string(),
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        for input in &self.inputs {
            input.push_args(&mut args);
        }
        args.extend([
            "-filter_complex".to_string(),
            self.filter.clone(),
            "-map".to_string(),
            format!("[{}]", self.video_label),
            "-map".to_string(),
            format!("[{}]", self.audio_label),
            "-t".to_string(),
            format!("{:.3}", target_seconds),
            "-r".to_string(),
            self.fps.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            "22".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.display().to_string(),
        ]);
        args
    }
}

/// Escapes a value for use as a filter option inside `-filter_complex`:
/// once for the option parser, once for the graph parser.
pub fn escape_filter_value(value: &str) -> String {
    let mut option = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '\'' | ':') {
            option.push('\\');
        }
        option.push(ch);
    }

    let mut graph = String::with_capacity(option.len());
    for ch in option.chars() {
        if matches!(ch, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(ch);
    }
    graph
}

/// Rewrites `path` relative to `base` when possible so the filter string
/// avoids drive letters and long absolute prefixes.
pub fn path_for_filter(path: &Path, base: &Path) -> PathBuf {
    if path.is_relative() {
        return path.to_path_buf();
    }
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}
