pub mod boundaries;
pub mod classify;
pub mod frames;
pub mod mood;
pub mod phases;
pub mod smoothing;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::{TrackFeatures, TrackSummary};
use crate::sequence::key::{Key, KeyError};
use boundaries::BoundaryParams;
use classify::ClassifierThresholds;
use frames::{FrameError, FrameSeries};
use phases::Segment;

/// All segmentation/classification tunables in one immutable value, so runs
/// are reproducible across parameter sets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    pub smoothing_window_secs: f64,
    pub boundary_threshold_k: f64,
    pub min_phase_secs: f64,
    pub brightness_weight: f64,
    /// Multiplier on the mean absolute energy delta for the onset proxy.
    pub onset_ratio: f64,
    pub thresholds: ClassifierThresholds,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            smoothing_window_secs: 2.0,
            boundary_threshold_k: 1.75,
            min_phase_secs: 1.0,
            brightness_weight: 0.5,
            onset_ratio: 1.5,
            thresholds: ClassifierThresholds::default(),
        }
    }
}

impl AnalysisParams {
    fn boundary_params(&self) -> BoundaryParams {
        BoundaryParams {
            threshold_k: self.boundary_threshold_k,
            min_phase_secs: self.min_phase_secs,
            brightness_weight: self.brightness_weight,
            smoothing_window_secs: self.smoothing_window_secs,
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("malformed frame series: {0}")]
    Frames(#[from] FrameError),
    #[error("bad key field: {0}")]
    Key(#[from] KeyError),
}

/// A track that failed analysis. The batch carries on without it.
#[derive(Debug)]
pub struct TrackFailure {
    pub id: String,
    pub message: String,
}

pub struct BatchResult {
    pub summaries: Vec<TrackSummary>,
    pub failures: Vec<TrackFailure>,
}

/// Segmented-but-unclassified track state between the two batch passes.
struct PreparedTrack {
    id: String,
    duration: f64,
    tempo_bpm: f64,
    key: Key,
    energy_mean: f64,
    brightness_mean: f64,
    energy_spread: f64,
    segments: Vec<Segment>,
}

/// Analyze a whole collection.
///
/// Two passes: segmentation runs per-track in parallel (embarrassingly
/// parallel, results keyed by id), then classification runs once the
/// collection median brightness is known (rule 8 input). Per-track failures
/// are isolated and reported — one bad feature file never aborts the batch.
pub fn analyze_batch(
    features: &[TrackFeatures],
    params: &AnalysisParams,
    jobs: usize,
) -> BatchResult {
    if features.is_empty() {
        return BatchResult {
            summaries: Vec::new(),
            failures: Vec::new(),
        };
    }

    log::info!("Analyzing {} tracks with {} workers", features.len(), jobs);

    let pb = ProgressBar::new(features.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .unwrap();

    let results: Vec<Result<PreparedTrack, TrackFailure>> = pool.install(|| {
        features
            .par_iter()
            .map(|f| {
                let result = prepare_track(f, params).map_err(|e| TrackFailure {
                    id: f.id.clone(),
                    message: e.to_string(),
                });
                pb.inc(1);
                result
            })
            .collect()
    });

    let mut prepared = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for r in results {
        match r {
            Ok(p) => prepared.push(p),
            Err(f) => {
                log::warn!("Analysis failed for {}: {}", f.id, f.message);
                failures.push(f);
            }
        }
    }

    let brightness_median = median(prepared.iter().map(|p| p.brightness_mean).collect());

    let summaries = prepared
        .into_iter()
        .map(|p| finish_track(p, brightness_median, params))
        .collect();

    pb.finish_with_message(format!("{} failed", failures.len()));
    BatchResult {
        summaries,
        failures,
    }
}

/// Analyze one track in isolation. With no collection to take a median over,
/// rule 8 splits on the track's own mean brightness.
pub fn analyze_track(
    features: &TrackFeatures,
    params: &AnalysisParams,
) -> Result<TrackSummary, AnalyzeError> {
    let prepared = prepare_track(features, params)?;
    let median = prepared.brightness_mean;
    Ok(finish_track(prepared, median, params))
}

/// Validate, smooth, detect boundaries, and segment — everything that needs
/// only this track's data.
fn prepare_track(
    features: &TrackFeatures,
    params: &AnalysisParams,
) -> Result<PreparedTrack, AnalyzeError> {
    let series = features.frame_series()?;
    let key = Key::parse(&features.key)?;

    let smoothed = smoothing::smooth(&series, params.smoothing_window_secs);
    let bounds = boundaries::detect_boundaries(&smoothed, &params.boundary_params());
    let segments = phases::segment(&series, &bounds, params.onset_ratio);

    log::debug!("{}: {} phases", features.id, segments.len());

    let (energy_mean, energy_spread) = mean_and_spread(&series.energies());
    let (brightness_mean, _) = mean_and_spread(&series.centroids());

    Ok(PreparedTrack {
        id: features.id.clone(),
        duration: series.duration(),
        tempo_bpm: features.tempo_bpm,
        key,
        energy_mean,
        brightness_mean,
        energy_spread,
        segments,
    })
}

/// Classification + tagging, once the collection median brightness is known.
fn finish_track(
    prepared: PreparedTrack,
    brightness_median: f64,
    params: &AnalysisParams,
) -> TrackSummary {
    let phases = classify::classify_track(
        &prepared.segments,
        prepared.duration,
        brightness_median,
        &params.thresholds,
    );

    let rhythm_density = duration_weighted_density(&prepared.segments, prepared.duration);
    let mood_tags = mood::phase_tags(prepared.energy_mean, prepared.brightness_mean, rhythm_density);
    let character_tags =
        mood::character_tags(prepared.energy_mean, prepared.energy_spread, phases.len());

    TrackSummary {
        id: prepared.id,
        duration: prepared.duration,
        tempo_bpm: prepared.tempo_bpm,
        key: prepared.key,
        energy_mean: prepared.energy_mean,
        brightness_mean: prepared.brightness_mean,
        mood_tags,
        character_tags,
        phases,
    }
}

fn duration_weighted_density(segments: &[Segment], duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    segments
        .iter()
        .map(|s| s.rhythm_density * (s.end_time - s.start_time))
        .sum::<f64>()
        / duration
}

fn mean_and_spread(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, var.sqrt())
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Validate a series without analyzing — used by callers that want the typed
/// error before committing to a batch.
pub fn validate(features: &TrackFeatures) -> Result<FrameSeries, FrameError> {
    features.frame_series()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::frames::Frame;
    use crate::analyzer::phases::Phase;

    fn features(id: &str, energies: &[f64]) -> TrackFeatures {
        TrackFeatures {
            id: id.to_string(),
            tempo_bpm: 110.0,
            key: "Am".to_string(),
            hop_secs: 0.1,
            frames: energies
                .iter()
                .enumerate()
                .map(|(i, &e)| Frame {
                    time: i as f64 * 0.1,
                    energy: e,
                    centroid_hz: 2000.0 + 500.0 * e,
                })
                .collect(),
        }
    }

    #[test]
    fn test_phases_partition_track() {
        let mut energies = vec![0.1; 150];
        energies.extend(vec![0.7; 150]);
        energies.extend(vec![0.2; 100]);
        let f = features("t", &energies);
        let summary = analyze_track(&f, &AnalysisParams::default()).unwrap();

        let total: f64 = summary.phases.iter().map(Phase::duration).sum();
        assert!(
            (total - summary.duration).abs() < 1e-9,
            "phase durations {total} != track duration {}",
            summary.duration
        );
        assert_eq!(summary.phases[0].start_time, 0.0);
        for w in summary.phases.windows(2) {
            assert_eq!(w[0].end_time, w[1].start_time);
        }
        for (i, p) in summary.phases.iter().enumerate() {
            assert_eq!(p.index, i);
        }
    }

    #[test]
    fn test_flat_track_single_development_phase() {
        // 300 flat frames -> one phase, Development
        let f = features("flat", &vec![0.05; 300]);
        let summary = analyze_track(&f, &AnalysisParams::default()).unwrap();
        assert_eq!(summary.phases.len(), 1);
        assert_eq!(
            summary.phases[0].phase_type,
            classify::PhaseType::Development
        );
    }

    #[test]
    fn test_degenerate_track_single_phase() {
        // Shorter than one smoothing window: recovered locally, same rule table
        let f = features("stub", &[0.3, 0.4, 0.3]);
        let summary = analyze_track(&f, &AnalysisParams::default()).unwrap();
        assert_eq!(summary.phases.len(), 1);
    }

    #[test]
    fn test_malformed_series_is_typed_error() {
        let mut f = features("bad", &[0.3, 0.4]);
        f.frames[1].energy = f64::NAN;
        assert!(matches!(
            analyze_track(&f, &AnalysisParams::default()),
            Err(AnalyzeError::Frames(_))
        ));
    }

    #[test]
    fn test_bad_key_is_typed_error() {
        let mut f = features("badkey", &[0.3; 50]);
        f.key = "H#".to_string();
        assert!(matches!(
            analyze_track(&f, &AnalysisParams::default()),
            Err(AnalyzeError::Key(_))
        ));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let good = features("good", &vec![0.3; 100]);
        let mut bad = features("bad", &vec![0.3; 100]);
        bad.frames[5].energy = -1.0;

        let result = analyze_batch(&[good, bad], &AnalysisParams::default(), 2);
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.summaries[0].id, "good");
        assert_eq!(result.failures[0].id, "bad");
    }

    #[test]
    fn test_batch_empty_input() {
        let result = analyze_batch(&[], &AnalysisParams::default(), 2);
        assert!(result.summaries.is_empty());
        assert!(result.failures.is_empty());
    }

    #[test]
    fn test_batch_deterministic() {
        let tracks: Vec<_> = (0..6)
            .map(|i| {
                let energies: Vec<f64> = (0..200)
                    .map(|j| 0.1 + 0.4 * (((i * 31 + j * 7) % 23) as f64 / 23.0))
                    .collect();
                features(&format!("t{i}"), &energies)
            })
            .collect();
        let a = analyze_batch(&tracks, &AnalysisParams::default(), 3);
        let b = analyze_batch(&tracks, &AnalysisParams::default(), 3);
        assert_eq!(a.summaries, b.summaries);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(vec![]), 0.0);
    }
}
