use serde::{Deserialize, Serialize};

use super::mood;
use super::phases::{Phase, Segment};

/// Structural role of a phase within a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Introduction,
    OutroFade,
    ClimaxPeak,
    BuildUp,
    Breakdown,
    Rhythmic,
    Conclusion,
    Development,
    BrightMelodic,
}

impl PhaseType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Introduction => "Introduction",
            Self::OutroFade => "Outro/Fade",
            Self::ClimaxPeak => "Climax/Peak",
            Self::BuildUp => "Build-up",
            Self::Breakdown => "Breakdown",
            Self::Rhythmic => "Rhythmic",
            Self::Conclusion => "Conclusion",
            Self::Development => "Development",
            Self::BrightMelodic => "Bright/Melodic",
        }
    }
}

/// Classification thresholds, all overridable via config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    pub intro_max_position: f64,
    pub intro_max_relative_energy: f64,
    pub outro_min_position: f64,
    pub climax_min_relative_energy: f64,
    pub climax_band: (f64, f64),
    pub build_energy_band: (f64, f64),
    pub breakdown_max_relative_energy: f64,
    pub rhythmic_min_density: f64,
    pub conclusion_min_position: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            intro_max_position: 0.05,
            intro_max_relative_energy: 0.6,
            outro_min_position: 0.95,
            climax_min_relative_energy: 1.3,
            climax_band: (0.2, 0.9),
            build_energy_band: (0.8, 1.3),
            breakdown_max_relative_energy: 0.4,
            rhythmic_min_density: 3.0,
            conclusion_min_position: 0.8,
        }
    }
}

/// Everything a rule may look at when classifying one phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext {
    /// phase.start_time / track_duration.
    pub position_ratio: f64,
    /// phase.energy_mean / track mean energy.
    pub relative_energy: f64,
    /// sign(energy_mean - previous.energy_mean); 0 for the first phase.
    pub energy_trend: i8,
    pub rhythm_density: f64,
    pub brightness: f64,
    /// Collection median brightness (rule 8 split).
    pub brightness_median: f64,
}

/// One entry of the ordered rule table.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&PhaseContext, &ClassifierThresholds) -> Option<PhaseType>,
}

/// The classification contract: rules fire in this order, first match wins.
/// Reordering entries changes behavior.
pub const RULES: &[Rule] = &[
    Rule {
        name: "intro",
        apply: |c, t| {
            (c.position_ratio < t.intro_max_position
                && c.relative_energy < t.intro_max_relative_energy)
                .then_some(PhaseType::Introduction)
        },
    },
    Rule {
        name: "outro",
        // Position alone decides; energy is irrelevant at the very end
        apply: |c, t| (c.position_ratio > t.outro_min_position).then_some(PhaseType::OutroFade),
    },
    Rule {
        name: "climax",
        apply: |c, t| {
            (c.relative_energy > t.climax_min_relative_energy
                && c.energy_trend >= 0
                && c.position_ratio >= t.climax_band.0
                && c.position_ratio <= t.climax_band.1)
                .then_some(PhaseType::ClimaxPeak)
        },
    },
    Rule {
        name: "build",
        apply: |c, t| {
            (c.energy_trend > 0
                && c.relative_energy >= t.build_energy_band.0
                && c.relative_energy <= t.build_energy_band.1)
                .then_some(PhaseType::BuildUp)
        },
    },
    Rule {
        name: "breakdown",
        apply: |c, t| {
            (c.relative_energy < t.breakdown_max_relative_energy).then_some(PhaseType::Breakdown)
        },
    },
    Rule {
        name: "rhythmic",
        apply: |c, t| (c.rhythm_density > t.rhythmic_min_density).then_some(PhaseType::Rhythmic),
    },
    Rule {
        name: "conclusion",
        apply: |c, t| {
            (c.position_ratio > t.conclusion_min_position && c.energy_trend <= 0)
                .then_some(PhaseType::Conclusion)
        },
    },
    Rule {
        name: "default",
        // Fallback, split on brightness vs the collection median
        apply: |c, _| {
            if c.brightness > c.brightness_median {
                Some(PhaseType::BrightMelodic)
            } else {
                Some(PhaseType::Development)
            }
        },
    },
];

/// Classify a single phase context. The final rule always matches.
pub fn classify_one(ctx: &PhaseContext, thresholds: &ClassifierThresholds) -> PhaseType {
    for rule in RULES {
        if let Some(t) = (rule.apply)(ctx, thresholds) {
            log::trace!("rule '{}' matched: {:?}", rule.name, t);
            return t;
        }
    }
    // The "default" rule is total
    unreachable!("rule table must end in a total rule")
}

/// Classify every segment of a track and attach mood tags, producing the final
/// immutable `Phase` list. `brightness_median` is the collection-wide median
/// centroid; callers analyzing a single track pass the track's own mean.
pub fn classify_track(
    segments: &[Segment],
    track_duration: f64,
    brightness_median: f64,
    thresholds: &ClassifierThresholds,
) -> Vec<Phase> {
    let track_energy = if segments.is_empty() {
        0.0
    } else {
        // Duration-weighted mean so short loud segments don't dominate
        let total: f64 = segments
            .iter()
            .map(|s| s.energy_mean * (s.end_time - s.start_time))
            .sum();
        total / track_duration.max(f64::EPSILON)
    };

    let mut previous_energy: Option<f64> = None;

    segments
        .iter()
        .map(|seg| {
            let relative_energy = if track_energy > 1e-12 {
                seg.energy_mean / track_energy
            } else {
                1.0
            };
            let energy_trend = match previous_energy {
                None => 0,
                Some(prev) => {
                    let d = seg.energy_mean - prev;
                    if d > 0.0 {
                        1
                    } else if d < 0.0 {
                        -1
                    } else {
                        0
                    }
                }
            };
            previous_energy = Some(seg.energy_mean);

            let ctx = PhaseContext {
                position_ratio: seg.start_time / track_duration.max(f64::EPSILON),
                relative_energy,
                energy_trend,
                rhythm_density: seg.rhythm_density,
                brightness: seg.brightness_mean,
                brightness_median,
            };

            Phase {
                start_time: seg.start_time,
                end_time: seg.end_time,
                index: seg.index,
                phase_type: classify_one(&ctx, thresholds),
                energy_mean: seg.energy_mean,
                brightness_mean: seg.brightness_mean,
                rhythm_density: seg.rhythm_density,
                mood_tags: mood::phase_tags(seg.energy_mean, seg.brightness_mean, seg.rhythm_density),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PhaseContext {
        PhaseContext {
            position_ratio: 0.5,
            relative_energy: 1.0,
            energy_trend: 0,
            rhythm_density: 1.0,
            brightness: 2000.0,
            brightness_median: 2500.0,
        }
    }

    fn thresholds() -> ClassifierThresholds {
        ClassifierThresholds::default()
    }

    #[test]
    fn test_rule1_intro() {
        let c = PhaseContext {
            position_ratio: 0.0,
            relative_energy: 0.5,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::Introduction);
    }

    #[test]
    fn test_rule1_requires_low_energy() {
        // Early but loud -> not an intro
        let c = PhaseContext {
            position_ratio: 0.0,
            relative_energy: 0.9,
            ..ctx()
        };
        assert_ne!(classify_one(&c, &thresholds()), PhaseType::Introduction);
    }

    #[test]
    fn test_rule2_outro_regardless_of_energy() {
        let c = PhaseContext {
            position_ratio: 0.97,
            relative_energy: 2.0,
            energy_trend: 1,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::OutroFade);
    }

    #[test]
    fn test_rule3_climax() {
        let c = PhaseContext {
            position_ratio: 0.5,
            relative_energy: 1.5,
            energy_trend: 1,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::ClimaxPeak);
    }

    #[test]
    fn test_rule3_climax_not_outside_middle_band() {
        let c = PhaseContext {
            position_ratio: 0.1,
            relative_energy: 1.5,
            energy_trend: 1,
            ..ctx()
        };
        assert_ne!(classify_one(&c, &thresholds()), PhaseType::ClimaxPeak);
    }

    #[test]
    fn test_rule4_build() {
        let c = PhaseContext {
            relative_energy: 1.0,
            energy_trend: 1,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::BuildUp);
    }

    #[test]
    fn test_rule5_breakdown() {
        let c = PhaseContext {
            relative_energy: 0.3,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::Breakdown);
    }

    #[test]
    fn test_rule6_rhythmic() {
        let c = PhaseContext {
            rhythm_density: 5.0,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::Rhythmic);
    }

    #[test]
    fn test_rule7_conclusion() {
        let c = PhaseContext {
            position_ratio: 0.85,
            energy_trend: -1,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::Conclusion);
    }

    #[test]
    fn test_rule8_default_split_on_brightness() {
        let dark = PhaseContext {
            brightness: 2000.0,
            brightness_median: 2500.0,
            ..ctx()
        };
        assert_eq!(classify_one(&dark, &thresholds()), PhaseType::Development);

        let bright = PhaseContext {
            brightness: 3000.0,
            brightness_median: 2500.0,
            ..ctx()
        };
        assert_eq!(classify_one(&bright, &thresholds()), PhaseType::BrightMelodic);
    }

    #[test]
    fn test_rule_order_intro_beats_breakdown() {
        // Quiet phase at the start satisfies both rule 1 and rule 5;
        // rule 1 must win because it fires first.
        let c = PhaseContext {
            position_ratio: 0.0,
            relative_energy: 0.3,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::Introduction);
    }

    #[test]
    fn test_rule_order_outro_beats_climax() {
        let c = PhaseContext {
            position_ratio: 0.96,
            relative_energy: 1.5,
            energy_trend: 1,
            ..ctx()
        };
        assert_eq!(classify_one(&c, &thresholds()), PhaseType::OutroFade);
    }

    #[test]
    fn test_classify_track_trend_uses_previous_phase() {
        use crate::analyzer::phases::Segment;

        let segments = vec![
            Segment {
                start_time: 0.0,
                end_time: 100.0,
                index: 0,
                energy_mean: 0.3,
                brightness_mean: 2000.0,
                rhythm_density: 1.0,
            },
            Segment {
                start_time: 100.0,
                end_time: 200.0,
                index: 1,
                energy_mean: 0.35,
                brightness_mean: 2000.0,
                rhythm_density: 1.0,
            },
        ];
        // Second phase: rising trend, relative energy ~1.08 -> Build-up
        let phases = classify_track(&segments, 200.0, 2500.0, &thresholds());
        assert_eq!(phases[1].phase_type, PhaseType::BuildUp);
    }

    #[test]
    fn test_single_flat_phase_is_development() {
        use crate::analyzer::phases::Segment;

        // One whole-track phase, flat energy. position_ratio = 0
        // but relative energy = 1.0 keeps rule 1 from firing -> Development.
        let segments = vec![Segment {
            start_time: 0.0,
            end_time: 30.0,
            index: 0,
            energy_mean: 0.05,
            brightness_mean: 2000.0,
            rhythm_density: 0.0,
        }];
        let phases = classify_track(&segments, 30.0, 2500.0, &thresholds());
        assert_eq!(phases[0].phase_type, PhaseType::Development);
    }
}
