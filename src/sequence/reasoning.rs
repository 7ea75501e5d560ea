use super::scoring::{Factor, ScoreBreakdown, ScoringWeights};
use crate::library::TrackSummary;

/// Turns a scored transition into a human-readable reason. Kept behind a
/// trait so the scoring/ordering core has no dependency on presentation
/// vocabulary — swap in a different narrator (or a no-op one) freely.
pub trait Narrator {
    fn describe(
        &self,
        from: &TrackSummary,
        to: &TrackSummary,
        breakdown: &ScoreBreakdown,
        weights: &ScoringWeights,
    ) -> String;
}

/// Default narrator: one template per dominant score factor.
pub struct TemplateNarrator;

impl Narrator for TemplateNarrator {
    fn describe(
        &self,
        from: &TrackSummary,
        to: &TrackSummary,
        breakdown: &ScoreBreakdown,
        weights: &ScoringWeights,
    ) -> String {
        match breakdown.dominant(weights) {
            Factor::Key => format!(
                "{} moves smoothly into {} harmonically ({} to {})",
                from.id,
                to.id,
                from.key.name(),
                to.key.name()
            ),
            Factor::Tempo => format!(
                "tempo carries over cleanly ({:.0} to {:.0} BPM)",
                from.tempo_bpm, to.tempo_bpm
            ),
            Factor::Energy => {
                if to.energy_mean >= from.energy_mean {
                    "energy lifts gently, keeping the arc rising".to_string()
                } else {
                    "energy eases off without breaking the flow".to_string()
                }
            }
            Factor::Mood => format!("shared mood ({})", common_tags(from, to)),
        }
    }
}

/// No-op narrator for callers that only need the numeric ordering.
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn describe(
        &self,
        _from: &TrackSummary,
        _to: &TrackSummary,
        _breakdown: &ScoreBreakdown,
        _weights: &ScoringWeights,
    ) -> String {
        String::new()
    }
}

fn common_tags(from: &TrackSummary, to: &TrackSummary) -> String {
    let shared: Vec<&str> = from
        .mood_tags
        .iter()
        .filter(|t| to.mood_tags.contains(t))
        .map(String::as_str)
        .collect();
    if shared.is_empty() {
        "none".to_string()
    } else {
        shared.join(", ")
    }
}
