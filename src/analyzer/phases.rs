use serde::{Deserialize, Serialize};

use super::classify::PhaseType;
use super::frames::FrameSeries;

/// A classified structural section of a track. Created once by
/// segmentation + classification, immutable thereafter. Phases of one track
/// fully partition [0, duration) — no gaps, no overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub start_time: f64,
    pub end_time: f64,
    /// 0-based, contiguous within the track.
    pub index: usize,
    pub phase_type: PhaseType,
    pub energy_mean: f64,
    pub brightness_mean: f64,
    /// Percussive onsets per second within the phase.
    pub rhythm_density: f64,
    pub mood_tags: Vec<String>,
}

impl Phase {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// An unclassified phase interval with aggregate stats, as produced by the
/// segmenter. The classifier turns these into `Phase` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start_time: f64,
    pub end_time: f64,
    pub index: usize,
    pub energy_mean: f64,
    pub brightness_mean: f64,
    pub rhythm_density: f64,
}

/// Convert an ordered boundary list (including 0 and duration) into contiguous
/// segments with aggregate stats. Always produces `boundaries.len() - 1`
/// segments, >= 1.
///
/// Aggregates come from the *raw* series so smoothing doesn't wash out the
/// percussive-onset proxy.
pub fn segment(raw: &FrameSeries, boundaries: &[f64], onset_ratio: f64) -> Vec<Segment> {
    debug_assert!(boundaries.len() >= 2, "need at least [0, duration]");

    let onsets = onset_times(raw, onset_ratio);

    boundaries
        .windows(2)
        .enumerate()
        .map(|(index, w)| {
            let (start, end) = (w[0], w[1]);
            let in_phase: Vec<_> = raw
                .frames
                .iter()
                .filter(|f| f.time >= start && f.time < end)
                .collect();

            let (energy_mean, brightness_mean) = if in_phase.is_empty() {
                (0.0, 0.0)
            } else {
                let n = in_phase.len() as f64;
                (
                    in_phase.iter().map(|f| f.energy).sum::<f64>() / n,
                    in_phase.iter().map(|f| f.centroid_hz).sum::<f64>() / n,
                )
            };

            let duration = (end - start).max(f64::EPSILON);
            let onset_count = onsets.iter().filter(|&&t| t >= start && t < end).count();

            Segment {
                start_time: start,
                end_time: end,
                index,
                energy_mean,
                brightness_mean,
                rhythm_density: onset_count as f64 / duration,
            }
        })
        .collect()
}

/// Percussive-onset proxy: timestamps where the frame-to-frame energy jump
/// exceeds `onset_ratio` times the track's mean absolute energy delta.
fn onset_times(raw: &FrameSeries, onset_ratio: f64) -> Vec<f64> {
    let deltas: Vec<f64> = raw
        .frames
        .windows(2)
        .map(|w| w[1].energy - w[0].energy)
        .collect();
    if deltas.is_empty() {
        return Vec::new();
    }

    let mean_abs = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64;
    if mean_abs < 1e-12 {
        return Vec::new();
    }

    deltas
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d > onset_ratio * mean_abs)
        .map(|(i, _)| raw.frames[i + 1].time)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::frames::series_from_energies;

    const ONSET_RATIO: f64 = 1.5;

    #[test]
    fn test_segment_count_is_boundaries_minus_one() {
        let s = series_from_energies(0.1, &[0.5; 100]);
        let segs = segment(&s, &[0.0, 3.0, 7.0, 10.0], ONSET_RATIO);
        assert_eq!(segs.len(), 3);
    }

    #[test]
    fn test_single_boundary_pair_gives_one_segment() {
        let s = series_from_energies(0.1, &[0.5; 20]);
        let segs = segment(&s, &[0.0, 2.0], ONSET_RATIO);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].index, 0);
    }

    #[test]
    fn test_partition_no_gaps_no_overlaps() {
        let s = series_from_energies(0.1, &[0.5; 200]);
        let boundaries = [0.0, 4.5, 11.0, 20.0];
        let segs = segment(&s, &boundaries, ONSET_RATIO);

        assert_eq!(segs[0].start_time, 0.0);
        for w in segs.windows(2) {
            assert_eq!(w[0].end_time, w[1].start_time);
        }
        let total: f64 = segs.iter().map(|p| p.end_time - p.start_time).sum();
        assert!((total - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_means_reflect_content() {
        // Quiet first half, loud second half
        let mut energies = vec![0.1; 50];
        energies.extend(vec![0.9; 50]);
        let s = series_from_energies(0.1, &energies);
        let segs = segment(&s, &[0.0, 5.0, 10.0], ONSET_RATIO);
        assert!((segs[0].energy_mean - 0.1).abs() < 1e-9);
        assert!((segs[1].energy_mean - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_rhythm_density_counts_spikes() {
        // Sharp spike every 10 frames over a quiet floor
        let energies: Vec<f64> = (0..100)
            .map(|i| if i % 10 == 0 { 0.9 } else { 0.1 })
            .collect();
        let s = series_from_energies(0.1, &energies);
        let segs = segment(&s, &[0.0, 10.0], ONSET_RATIO);
        // ~10 spikes over 10 seconds
        assert!(
            segs[0].rhythm_density > 0.5,
            "density = {}",
            segs[0].rhythm_density
        );
    }

    #[test]
    fn test_flat_series_zero_rhythm_density() {
        let s = series_from_energies(0.1, &[0.5; 100]);
        let segs = segment(&s, &[0.0, 10.0], ONSET_RATIO);
        assert_eq!(segs[0].rhythm_density, 0.0);
    }
}
