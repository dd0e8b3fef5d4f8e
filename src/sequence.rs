//! Visual sequencing: turns downloaded images and clips into an ordered
//! playlist long enough to cover the narration.
//!
//! Assets are shuffled once and then consumed round-robin. Still images are
//! shown for a fixed duration, clips for their probed duration. The playlist
//! only guarantees `covered >= target`; the renderer cuts the output at the
//! exact target.

use crate::logw;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on playlist length; keeps the filter graph a sane size when
/// assets are very short.
pub const MAX_PLAYLIST_ENTRIES: usize = 512;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("no visual assets")]
    NoVisualAssets,

    #[error("target duration must be positive, got {0}")]
    InvalidTarget(f64),

    #[error("image duration must be positive, got {0}")]
    InvalidImageDuration(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Clip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Probed length in seconds. Zero for images and for clips that could
    /// not be probed.
    pub duration: f64,
}

impl VisualAsset {
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: MediaKind::Image,
            duration: 0.0,
        }
    }

    pub fn clip(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            kind: MediaKind::Clip,
            duration,
        }
    }

    fn display_seconds(&self, image_seconds: f64) -> f64 {
        match self.kind {
            MediaKind::Image => image_seconds,
            MediaKind::Clip if self.duration.is_finite() && self.duration > 0.0 => self.duration,
            MediaKind::Clip => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
    pub target: f64,
    pub covered: f64,
}

impl Playlist {
    pub fn is_complete(&self) -> bool {
        self.covered >= self.target
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn build_playlist<R: Rng + ?Sized>(
    assets: &[VisualAsset],
    target_seconds: f64,
    image_seconds: f64,
    rng: &mut R,
) -> Result<Playlist, SequenceError> {
    if !target_seconds.is_finite() || target_seconds <= 0.0 {
        return Err(SequenceError::InvalidTarget(target_seconds));
    }
    if !image_seconds.is_finite() || image_seconds <= 0.0 {
        return Err(SequenceError::InvalidImageDuration(image_seconds));
    }
    if assets.is_empty() {
        return Err(SequenceError::NoVisualAssets);
    }

    let mut order: Vec<&VisualAsset> = assets.iter().collect();
    order.shuffle(rng);

    let mut entries = Vec::new();
    let mut covered = 0.0;
    let mut pass_gain = 0.0;

    for (step, asset) in order.iter().cycle().enumerate() {
        if covered >= target_seconds || entries.len() >= MAX_PLAYLIST_ENTRIES {
            break;
        }
        // a whole pass that added nothing will never reach the target
        if step > 0 && step % order.len() == 0 {
            if pass_gain <= 0.0 {
                logw(format!(
                    "Visual assets cover no measurable time; stopping after one pass ({} entries).",
                    entries.len()
                ));
                break;
            }
            pass_gain = 0.0;
        }

        let duration = asset.display_seconds(image_seconds);
        entries.push(PlaylistEntry {
            path: asset.path.clone(),
            kind: asset.kind,
            duration,
        });
        covered += duration;
        pass_gain += duration;
    }

    Ok(Playlist {
        entries,
        target: target_seconds,
        covered,
    })
}

/// Source of media durations, ffprobe in production.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration_seconds(&self, path: &Path) -> Result<f64>;
}

/// Classifies each path and probes clip durations. A clip whose probe fails
/// stays in the list with zero duration.
pub async fn resolve_assets(
    image_paths: &[PathBuf],
    clip_paths: &[PathBuf],
    probe: &dyn DurationProbe,
) -> Vec<VisualAsset> {
    let mut out = Vec::with_capacity(image_paths.len() + clip_paths.len());
    out.extend(image_paths.iter().cloned().map(VisualAsset::image));

    for path in clip_paths {
        let duration = match probe.duration_seconds(path).await {
            Ok(v) => v,
            Err(err) => {
                logw(format!("Could not probe {}: {}; counting it as 0s", path.display(), err));
                0.0
            }
        };
        out.push(VisualAsset::clip(path.clone(), duration));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn covers_target_with_images_only() {
        let assets: Vec<_> = (0..3).map(|i| VisualAsset::image(format!("img_{i}.jpg"))).collect();
        let playlist = build_playlist(&assets, 22.0, 5.0, &mut rng()).unwrap();

        assert!(playlist.is_complete());
        assert_eq!(playlist.len(), 5);
        assert_eq!(playlist.covered, 25.0);
        assert!(playlist.entries.iter().all(|e| e.kind == MediaKind::Image && e.duration == 5.0));
    }

    #[test]
    fn cycles_through_every_asset_before_repeating() {
        let assets: Vec<_> = (0..4).map(|i| VisualAsset::image(format!("img_{i}.jpg"))).collect();
        let playlist = build_playlist(&assets, 40.0, 5.0, &mut rng()).unwrap();

        assert_eq!(playlist.len(), 8);
        let first: Vec<_> = playlist.entries[..4].iter().map(|e| e.path.clone()).collect();
        let second: Vec<_> = playlist.entries[4..].iter().map(|e| e.path.clone()).collect();
        assert_eq!(first, second);

        let mut seen = first.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn clips_contribute_their_probed_length() {
        let assets = vec![VisualAsset::clip("a.mp4", 12.5), VisualAsset::image("b.png")];
        let playlist = build_playlist(&assets, 30.0, 4.0, &mut rng()).unwrap();

        assert!(playlist.covered >= 30.0);
        for entry in &playlist.entries {
            match entry.kind {
                MediaKind::Clip => assert_eq!(entry.duration, 12.5),
                MediaKind::Image => assert_eq!(entry.duration, 4.0),
            }
        }
    }

    #[test]
    fn unprobed_clips_shorten_coverage() {
        let assets = vec![
            VisualAsset::clip("broken.mp4", 0.0),
            VisualAsset::clip("nan.mp4", f64::NAN),
            VisualAsset::image("still.jpg"),
        ];
        let playlist = build_playlist(&assets, 10.0, 5.0, &mut rng()).unwrap();

        assert!(playlist.is_complete());
        let image_entries = playlist.entries.iter().filter(|e| e.kind == MediaKind::Image).count();
        assert_eq!(image_entries, 2);
        assert!(
            playlist
                .entries
                .iter()
                .filter(|e| e.kind == MediaKind::Clip)
                .all(|e| e.duration == 0.0)
        );
    }

    #[test]
    fn zero_length_clips_stop_after_one_pass() {
        let assets = vec![VisualAsset::clip("a.mp4", 0.0), VisualAsset::clip("b.mp4", -3.0)];
        let playlist = build_playlist(&assets, 60.0, 5.0, &mut rng()).unwrap();

        assert_eq!(playlist.len(), 2);
        assert!(!playlist.is_complete());
    }

    #[test]
    fn entry_count_is_capped() {
        let assets = vec![VisualAsset::image("tiny.png")];
        let playlist = build_playlist(&assets, 1_000_000.0, 0.5, &mut rng()).unwrap();
        assert_eq!(playlist.len(), MAX_PLAYLIST_ENTRIES);
    }

    #[test]
    fn empty_assets_fail() {
        let err = build_playlist(&[], 10.0, 5.0, &mut rng()).unwrap_err();
        assert_eq!(err, SequenceError::NoVisualAssets);
        assert_eq!(err.to_string(), "no visual assets");
    }

    #[test]
    fn rejects_non_positive_durations() {
        let assets = vec![VisualAsset::image("a.jpg")];
        assert_eq!(
            build_playlist(&assets, 0.0, 5.0, &mut rng()).unwrap_err(),
            SequenceError::InvalidTarget(0.0)
        );
        assert!(matches!(
            build_playlist(&assets, f64::INFINITY, 5.0, &mut rng()),
            Err(SequenceError::InvalidTarget(_))
        ));
        assert_eq!(
            build_playlist(&assets, 10.0, 0.0, &mut rng()).unwrap_err(),
            SequenceError::InvalidImageDuration(0.0)
        );
    }

    #[test]
    fn same_seed_same_order() {
        let assets: Vec<_> = (0..6).map(|i| VisualAsset::image(format!("{i}.jpg"))).collect();
        let a = build_playlist(&assets, 30.0, 5.0, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = build_playlist(&assets, 30.0, 5.0, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    struct FakeProbe(HashMap<PathBuf, f64>);

    #[async_trait]
    impl DurationProbe for FakeProbe {
        async fn duration_seconds(&self, path: &Path) -> Result<f64> {
            self.0
                .get(path)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("ffprobe failed"))
        }
    }

    #[tokio::test]
    async fn resolve_falls_back_to_zero_on_probe_failure() {
        let probe = FakeProbe(HashMap::from([(PathBuf::from("good.mp4"), 8.0)]));
        let images = vec![PathBuf::from("a.jpg")];
        let clips = vec![PathBuf::from("good.mp4"), PathBuf::from("bad.mp4")];

        let assets = resolve_assets(&images, &clips, &probe).await;

        assert_eq!(
            assets,
            vec![
                VisualAsset::image("a.jpg"),
                VisualAsset::clip("good.mp4", 8.0),
                VisualAsset::clip("bad.mp4", 0.0),
            ]
        );
    }
}
