pub mod key;
pub mod reasoning;
pub mod scoring;

use rayon::prelude::*;
use serde::Serialize;

use crate::library::TrackSummary;
use reasoning::Narrator;
use scoring::{ScoreBreakdown, TransitionScorer};

/// One slot of a recommended playlist. A full step list is a permutation of
/// the input tracks; stateless across sequencing requests.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceStep {
    pub track_id: String,
    pub position: usize,
    /// None for the opening track.
    pub transition_score: Option<f64>,
    /// None for the opening track.
    pub reasoning: Option<String>,
}

/// Full result of one sequencing run, including per-step breakdowns for
/// exporters that want the component detail.
#[derive(Debug, Clone, Serialize)]
pub struct Sequence {
    pub steps: Vec<SequenceStep>,
    #[serde(skip)]
    pub breakdowns: Vec<Option<ScoreBreakdown>>,
}

/// Greedily order all tracks into a playlist.
///
/// The opening track is the one with the lowest mean energy (ties: smallest
/// id, then smallest duration). Each subsequent step scores every remaining
/// candidate against the last placed track and takes the argmax, breaking
/// score ties toward the smallest id. Deterministic; O(N²); greedy rather
/// than globally optimal — a documented tradeoff, not a defect.
///
/// Empty input yields an empty sequence, not an error. Candidate scoring
/// within one step fans out across rayon threads; the step order itself is
/// strictly sequential.
pub fn build_sequence(
    tracks: &[TrackSummary],
    scorer: &TransitionScorer,
    narrator: &dyn Narrator,
) -> Sequence {
    if tracks.is_empty() {
        return Sequence {
            steps: Vec::new(),
            breakdowns: Vec::new(),
        };
    }

    let start = opening_track(tracks);
    log::debug!("sequence opens with {} (lowest energy)", tracks[start].id);

    let mut remaining: Vec<usize> = (0..tracks.len()).filter(|&i| i != start).collect();
    let mut last_placed = start;
    let mut steps = vec![SequenceStep {
        track_id: tracks[start].id.clone(),
        position: 0,
        transition_score: None,
        reasoning: None,
    }];
    let mut breakdowns: Vec<Option<ScoreBreakdown>> = vec![None];

    while !remaining.is_empty() {
        let last = &tracks[last_placed];

        // Independent candidate scores; the argmax scan stays sequential so
        // tie-breaks are reproducible.
        let scored: Vec<(usize, ScoreBreakdown)> = remaining
            .par_iter()
            .map(|&i| (i, scorer.score(last, &tracks[i])))
            .collect();

        let mut best = &scored[0];
        for candidate in &scored[1..] {
            if candidate.1.total > best.1.total
                || (candidate.1.total == best.1.total && tracks[candidate.0].id < tracks[best.0].id)
            {
                best = candidate;
            }
        }

        let (chosen, breakdown) = (best.0, best.1);
        let to = &tracks[chosen];
        steps.push(SequenceStep {
            track_id: to.id.clone(),
            position: steps.len(),
            transition_score: Some(breakdown.total),
            reasoning: Some(narrator.describe(last, to, &breakdown, scorer.weights())),
        });
        breakdowns.push(Some(breakdown));
        last_placed = chosen;
        remaining.retain(|&i| i != chosen);
    }

    Sequence { steps, breakdowns }
}

/// Lowest energy wins; ties fall to smallest id, then smallest duration.
fn opening_track(tracks: &[TrackSummary]) -> usize {
    let mut best = 0;
    for i in 1..tracks.len() {
        let (a, b) = (&tracks[i], &tracks[best]);
        let better = a
            .energy_mean
            .partial_cmp(&b.energy_mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| {
                a.duration
                    .partial_cmp(&b.duration)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .is_lt();
        if better {
            best = i;
        }
    }
    best
}
