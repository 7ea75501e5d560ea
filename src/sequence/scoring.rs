use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key;
use crate::library::TrackSummary;

/// Relative weights of the four transition factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub key: f64,
    pub tempo: f64,
    pub energy: f64,
    pub mood: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            key: 0.30,
            tempo: 0.25,
            energy: 0.25,
            mood: 0.20,
        }
    }
}

/// Full scoring configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    pub weights: ScoringWeights,
    /// Tempo delta (BPM) at which the tempo component bottoms out.
    pub max_tempo_delta: f64,
    /// Energy rise at which the energy component bottoms out.
    pub energy_rise_tolerance: f64,
    /// Energy drop at which the energy component bottoms out. Smaller than
    /// the rise tolerance: drops kill momentum faster than rises tire ears.
    pub energy_drop_tolerance: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            max_tempo_delta: 40.0,
            energy_rise_tolerance: 0.30,
            energy_drop_tolerance: 0.15,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("scoring weight {name} must be finite and >= 0, got {value}")]
    BadWeight { name: &'static str, value: f64 },
    #[error("scoring weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },
    #[error("{name} must be finite and > 0, got {value}")]
    BadTolerance { name: &'static str, value: f64 },
}

/// The four raw components (each 0..=1) and the weighted total of one
/// directed transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub key: f64,
    pub tempo: f64,
    pub energy: f64,
    pub mood: f64,
    pub total: f64,
}

/// Which factor dominated a transition (largest weighted contribution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Key,
    Tempo,
    Energy,
    Mood,
}

impl ScoreBreakdown {
    /// The factor with the largest weighted contribution. Ties resolve in
    /// declaration order (key, tempo, energy, mood).
    pub fn dominant(&self, weights: &ScoringWeights) -> Factor {
        let contributions = [
            (Factor::Key, self.key * weights.key),
            (Factor::Tempo, self.tempo * weights.tempo),
            (Factor::Energy, self.energy * weights.energy),
            (Factor::Mood, self.mood * weights.mood),
        ];
        let mut best = contributions[0];
        for c in &contributions[1..] {
            if c.1 > best.1 {
                best = *c;
            }
        }
        best.0
    }
}

/// Scores how well track B follows track A. Pure and deterministic: output
/// depends only on the two summaries and the configuration. Asymmetric by
/// design — A→B need not equal B→A (the energy component is directional).
pub struct TransitionScorer {
    params: ScoringParams,
}

impl TransitionScorer {
    /// Validate the configuration eagerly, before any scoring happens.
    pub fn new(params: ScoringParams) -> Result<Self, ScoringError> {
        let w = &params.weights;
        for (name, value) in [
            ("key", w.key),
            ("tempo", w.tempo),
            ("energy", w.energy),
            ("mood", w.mood),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringError::BadWeight { name, value });
            }
        }
        let sum = w.key + w.tempo + w.energy + w.mood;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ScoringError::WeightSum { sum });
        }
        for (name, value) in [
            ("max_tempo_delta", params.max_tempo_delta),
            ("energy_rise_tolerance", params.energy_rise_tolerance),
            ("energy_drop_tolerance", params.energy_drop_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoringError::BadTolerance { name, value });
            }
        }
        Ok(Self { params })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.params.weights
    }

    pub fn score(&self, from: &TrackSummary, to: &TrackSummary) -> ScoreBreakdown {
        let key = key::key_score(from.key, to.key);
        let tempo = self.tempo_score(from.tempo_bpm, to.tempo_bpm);
        let energy = self.energy_score(from.energy_mean, to.energy_mean);
        let mood = jaccard(&from.mood_tags, &to.mood_tags);

        let w = &self.params.weights;
        let total =
            (key * w.key + tempo * w.tempo + energy * w.energy + mood * w.mood).clamp(0.0, 1.0);

        ScoreBreakdown {
            key,
            tempo,
            energy,
            mood,
            total,
        }
    }

    fn tempo_score(&self, from_bpm: f64, to_bpm: f64) -> f64 {
        1.0 - ((to_bpm - from_bpm).abs() / self.params.max_tempo_delta).min(1.0)
    }

    /// Directional: a gentle rise is near-perfect, a same-size drop scores
    /// worse because the drop tolerance is tighter.
    fn energy_score(&self, from: f64, to: f64) -> f64 {
        let delta = to - from;
        if delta >= 0.0 {
            1.0 - (delta / self.params.energy_rise_tolerance).min(1.0)
        } else {
            1.0 - (-delta / self.params.energy_drop_tolerance).min(1.0)
        }
    }
}

/// Jaccard overlap of two tag sets. Two empty sets count as identical.
fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.iter().filter(|t| b.contains(t)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
pub(crate) fn test_summary(id: &str, energy: f64, key_name: &str, tempo: f64) -> TrackSummary {
    TrackSummary {
        id: id.to_string(),
        duration: 300.0,
        tempo_bpm: tempo,
        key: super::key::Key::parse(key_name).unwrap(),
        energy_mean: energy,
        brightness_mean: 2000.0,
        mood_tags: vec!["flowing".into(), "warm".into()],
        character_tags: vec![],
        phases: vec![],
    }
}
