use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single analysis frame from the DSP front-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame start time in seconds.
    pub time: f64,
    /// RMS-style energy, >= 0.
    pub energy: f64,
    /// Spectral centroid in Hz, >= 0.
    pub centroid_hz: f64,
}

/// An ordered per-frame feature series at a fixed hop size.
///
/// Produced externally (decoded + windowed by the DSP front-end); phaseline
/// only validates and consumes it. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSeries {
    /// Hop size between consecutive frames, in seconds.
    pub hop_secs: f64,
    pub frames: Vec<Frame>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("empty frame series")]
    Empty,
    #[error("hop size must be finite and > 0, got {0}")]
    BadHop(f64),
    #[error("non-monotonic timestamp at frame {index}: {time} <= {previous}")]
    NonMonotonic {
        index: usize,
        time: f64,
        previous: f64,
    },
    #[error("invalid {field} at frame {index}: {value}")]
    BadValue {
        index: usize,
        field: &'static str,
        value: f64,
    },
}

impl FrameSeries {
    /// Validate and wrap a raw frame list. Malformed input is rejected here,
    /// before any smoothing or boundary detection — never silently coerced.
    pub fn new(hop_secs: f64, frames: Vec<Frame>) -> Result<Self, FrameError> {
        if !hop_secs.is_finite() || hop_secs <= 0.0 {
            return Err(FrameError::BadHop(hop_secs));
        }
        if frames.is_empty() {
            return Err(FrameError::Empty);
        }

        let mut previous = f64::NEG_INFINITY;
        for (index, f) in frames.iter().enumerate() {
            if !f.time.is_finite() {
                return Err(FrameError::BadValue {
                    index,
                    field: "time",
                    value: f.time,
                });
            }
            if f.time <= previous {
                return Err(FrameError::NonMonotonic {
                    index,
                    time: f.time,
                    previous,
                });
            }
            if !f.energy.is_finite() || f.energy < 0.0 {
                return Err(FrameError::BadValue {
                    index,
                    field: "energy",
                    value: f.energy,
                });
            }
            if !f.centroid_hz.is_finite() || f.centroid_hz < 0.0 {
                return Err(FrameError::BadValue {
                    index,
                    field: "centroid_hz",
                    value: f.centroid_hz,
                });
            }
            previous = f.time;
        }

        Ok(Self { hop_secs, frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Track duration covered by the series: last frame start + one hop.
    pub fn duration(&self) -> f64 {
        self.frames.last().map_or(0.0, |f| f.time + self.hop_secs)
    }

    pub fn energies(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.energy).collect()
    }

    pub fn centroids(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.centroid_hz).collect()
    }
}

#[cfg(test)]
pub(crate) fn series_from_energies(hop: f64, energies: &[f64]) -> FrameSeries {
    let frames = energies
        .iter()
        .enumerate()
        .map(|(i, &e)| Frame {
            time: i as f64 * hop,
            energy: e,
            centroid_hz: 2000.0,
        })
        .collect();
    FrameSeries::new(hop, frames).unwrap()
}
