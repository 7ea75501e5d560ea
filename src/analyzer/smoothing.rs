use super::frames::{Frame, FrameSeries};

/// Low-pass the energy and brightness channels with a centered moving average.
///
/// The window is expressed as a duration and converted to frames from the
/// series' hop size. Edges use a shrinking window (the average covers whatever
/// part of the window lies inside the series). A series shorter than one full
/// window is returned unsmoothed — that is the degenerate-track fallback, not
/// an error.
pub fn smooth(series: &FrameSeries, window_secs: f64) -> FrameSeries {
    let window = window_frames(window_secs, series.hop_secs);
    if series.len() < window {
        return series.clone();
    }

    let energies = moving_average(&series.energies(), window);
    let centroids = moving_average(&series.centroids(), window);

    let frames = series
        .frames
        .iter()
        .zip(energies)
        .zip(centroids)
        .map(|((f, energy), centroid_hz)| Frame {
            time: f.time,
            energy,
            centroid_hz,
        })
        .collect();

    FrameSeries {
        hop_secs: series.hop_secs,
        frames,
    }
}

/// Number of frames covered by a smoothing window, always >= 1.
pub fn window_frames(window_secs: f64, hop_secs: f64) -> usize {
    ((window_secs / hop_secs).round() as usize).max(1)
}

/// Centered moving average with shrinking edges. `window` is the full width;
/// each output sample averages up to `window / 2` samples on either side.
fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = values.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let span = &values[lo..=hi];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}
