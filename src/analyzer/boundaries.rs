use super::frames::FrameSeries;
use super::smoothing::window_frames;

/// Tunables for change-point detection. Immutable; passed in explicitly so
/// runs are reproducible across parameter sets.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryParams {
    /// A frame is a boundary candidate when |derivative| exceeds this many
    /// standard deviations of the channel's derivative.
    pub threshold_k: f64,
    /// Candidates closer together than this merge into one.
    pub min_phase_secs: f64,
    /// Strength multiplier for the secondary (brightness) channel.
    pub brightness_weight: f64,
    /// Smoothing window — tracks shorter than this get the single-phase fallback.
    pub smoothing_window_secs: f64,
}

impl Default for BoundaryParams {
    fn default() -> Self {
        Self {
            threshold_k: 1.75,
            min_phase_secs: 1.0,
            brightness_weight: 0.5,
            smoothing_window_secs: 2.0,
        }
    }
}

/// A change-point candidate before merging.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    time: f64,
    strength: f64,
}

/// Detect phase boundaries in a smoothed series.
///
/// Returns a strictly increasing list that always starts at 0.0 and ends at the
/// track duration — even with zero internal detections (single-phase fallback).
/// A track shorter than one smoothing window yields exactly `[0, duration]`.
pub fn detect_boundaries(smoothed: &FrameSeries, params: &BoundaryParams) -> Vec<f64> {
    let duration = smoothed.duration();

    if smoothed.len() < window_frames(params.smoothing_window_secs, smoothed.hop_secs) {
        return vec![0.0, duration];
    }

    let mut candidates =
        channel_candidates(&smoothed.energies(), smoothed, params.threshold_k, 1.0);
    candidates.extend(channel_candidates(
        &smoothed.centroids(),
        smoothed,
        params.threshold_k,
        params.brightness_weight,
    ));
    candidates.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let merged = merge_candidates(&candidates, params.min_phase_secs);

    let mut boundaries = vec![0.0];
    for c in merged {
        // Keep every phase at least min_phase long, including first and last
        if c.time >= params.min_phase_secs && c.time <= duration - params.min_phase_secs {
            boundaries.push(c.time);
        }
    }
    boundaries.push(duration);
    boundaries
}

/// Flag frames where the derivative of one channel exceeds `k` standard
/// deviations, scaled by the channel weight. A flat channel (zero variance)
/// produces no candidates.
fn channel_candidates(
    values: &[f64],
    series: &FrameSeries,
    k: f64,
    weight: f64,
) -> Vec<Candidate> {
    let derivative: Vec<f64> = values
        .windows(2)
        .map(|w| (w[1] - w[0]) / series.hop_secs)
        .collect();

    let std = stddev(&derivative);
    if std < 1e-12 {
        return Vec::new();
    }

    derivative
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| {
            let normalized = d.abs() / std;
            if normalized > k {
                Some(Candidate {
                    // Derivative index i spans frames i..i+1; the change lands
                    // at frame i+1.
                    time: series.frames[i + 1].time,
                    strength: normalized * weight,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Merge time-sorted candidates closer than `min_phase_secs`, keeping the one
/// with maximum derivative magnitude. Ties keep the earlier candidate (strict
/// greater-than comparison over an in-order scan).
fn merge_candidates(candidates: &[Candidate], min_phase_secs: f64) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();

    for &c in candidates {
        match merged.last_mut() {
            Some(last) if c.time - last.time < min_phase_secs => {
                if c.strength > last.strength {
                    *last = c;
                }
            }
            _ => merged.push(c),
        }
    }

    merged
}

fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
