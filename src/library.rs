use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::analyzer::frames::{Frame, FrameError, FrameSeries};
use crate::analyzer::phases::Phase;
use crate::sequence::key::Key;

/// Feature file extension produced by the DSP front-end.
pub const FEATURE_EXTENSION: &str = "json";

/// Pre-extracted features for one track, as emitted by the DSP front-end.
/// phaseline never touches audio; this file is its whole view of a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFeatures {
    pub id: String,
    pub tempo_bpm: f64,
    /// Key notation, e.g. "C", "Am", "F# minor".
    pub key: String,
    pub hop_secs: f64,
    pub frames: Vec<Frame>,
}

impl TrackFeatures {
    /// Validate the frame payload into a `FrameSeries`.
    pub fn frame_series(&self) -> Result<FrameSeries, FrameError> {
        FrameSeries::new(self.hop_secs, self.frames.clone())
    }
}

/// Per-track analysis output: scalar summary plus the owned phase list.
/// Field names are stable — exporters and downstream presentation depend
/// on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    pub duration: f64,
    pub tempo_bpm: f64,
    pub key: Key,
    pub energy_mean: f64,
    pub brightness_mean: f64,
    pub mood_tags: Vec<String>,
    pub character_tags: Vec<String>,
    pub phases: Vec<Phase>,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A feature file that could not be loaded. The batch carries on without it.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub message: String,
}

pub struct LoadOutcome {
    pub features: Vec<TrackFeatures>,
    pub failures: Vec<LoadFailure>,
}

/// Load every feature file under the given paths. Files are visited in
/// sorted order so track ids come out deterministically; unreadable or
/// malformed files are collected as failures, never a batch abort.
pub fn load_features(paths: &[String]) -> LoadOutcome {
    let mut files: Vec<PathBuf> = Vec::new();

    for path in paths {
        let p = Path::new(path);
        if p.is_file() {
            files.push(p.to_path_buf());
            continue;
        }
        for entry in WalkDir::new(p)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if ext == FEATURE_EXTENSION {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();

    let mut features = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    for path in files {
        match load_one(&path) {
            Ok(f) => features.push(f),
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                failures.push(LoadFailure {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Loaded {} feature files ({} failed)",
        features.len(),
        failures.len()
    );

    LoadOutcome { features, failures }
}

fn load_one(path: &Path) -> Result<TrackFeatures, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_file_deserialize() {
        let json = r#"{
            "id": "gd77-05-08-scarlet",
            "tempo_bpm": 104.0,
            "key": "Bm",
            "hop_secs": 0.1,
            "frames": [
                {"time": 0.0, "energy": 0.12, "centroid_hz": 1800.0},
                {"time": 0.1, "energy": 0.15, "centroid_hz": 1900.0}
            ]
        }"#;
        let f: TrackFeatures = serde_json::from_str(json).unwrap();
        assert_eq!(f.id, "gd77-05-08-scarlet");
        assert_eq!(f.frames.len(), 2);
        assert!(f.frame_series().is_ok());
    }

    #[test]
    fn test_malformed_frames_surface_as_frame_error() {
        let json = r#"{
            "id": "bad",
            "tempo_bpm": 120.0,
            "key": "C",
            "hop_secs": 0.1,
            "frames": [
                {"time": 0.1, "energy": 0.5, "centroid_hz": 1000.0},
                {"time": 0.0, "energy": 0.5, "centroid_hz": 1000.0}
            ]
        }"#;
        let f: TrackFeatures = serde_json::from_str(json).unwrap();
        assert!(f.frame_series().is_err());
    }

    #[test]
    fn test_summary_json_field_names_stable() {
        let summary = TrackSummary {
            id: "t1".into(),
            duration: 30.0,
            tempo_bpm: 120.0,
            key: Key::parse("Am").unwrap(),
            energy_mean: 0.4,
            brightness_mean: 2100.0,
            mood_tags: vec!["flowing".into()],
            character_tags: vec![],
            phases: vec![],
        };
        let v: serde_json::Value = serde_json::to_value(&summary).unwrap();
        for field in [
            "id",
            "duration",
            "tempo_bpm",
            "key",
            "energy_mean",
            "brightness_mean",
            "mood_tags",
            "character_tags",
            "phases",
        ] {
            assert!(v.get(field).is_some(), "missing field {field}");
        }
    }
}
