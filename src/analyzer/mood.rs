//! Mood and character tagging via numeric range lookups.
//!
//! Deliberately shallow: the structural core consumes these tag sets (mood
//! overlap feeds the transition scorer) but has no dependency on how the
//! ranges were derived. Ranges are calibrated against normalized 0-1 energy
//! and raw centroid Hz from the front-end.

/// Mood tags for a phase (or whole track) from its aggregates.
pub fn phase_tags(energy_mean: f64, brightness_mean: f64, rhythm_density: f64) -> Vec<String> {
    let mut tags = Vec::new();

    // Energy band
    if energy_mean < 0.15 {
        tags.push("calm");
    } else if energy_mean < 0.45 {
        tags.push("flowing");
    } else if energy_mean < 0.75 {
        tags.push("energetic");
    } else {
        tags.push("intense");
    }

    // Brightness band (spectral centroid)
    if brightness_mean < 1200.0 {
        tags.push("dark");
    } else if brightness_mean < 3000.0 {
        tags.push("warm");
    } else {
        tags.push("bright");
    }

    // Rhythm band
    if rhythm_density > 4.0 {
        tags.push("driving");
    } else if rhythm_density < 0.5 {
        tags.push("sparse");
    }

    tags.into_iter().map(String::from).collect()
}

/// Track-level character tags from whole-track aggregates.
/// Tiered like the mood bands but looks at spread rather than level.
pub fn character_tags(energy_mean: f64, energy_spread: f64, phase_count: usize) -> Vec<String> {
    let mut tags = Vec::new();

    if energy_spread > 0.25 {
        tags.push("dynamic");
    } else if energy_spread < 0.05 {
        tags.push("steady");
    }

    if phase_count >= 6 {
        tags.push("episodic");
    } else if phase_count == 1 {
        tags.push("monolithic");
    }

    if energy_mean > 0.6 && energy_spread < 0.1 {
        tags.push("relentless");
    }

    tags.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_dark_phase() {
        let tags = phase_tags(0.05, 800.0, 0.2);
        assert!(tags.contains(&"calm".to_string()));
        assert!(tags.contains(&"dark".to_string()));
        assert!(tags.contains(&"sparse".to_string()));
    }

    #[test]
    fn test_loud_bright_driving_phase() {
        let tags = phase_tags(0.9, 4500.0, 6.0);
        assert_eq!(tags, vec!["intense", "bright", "driving"]);
    }

    #[test]
    fn test_midrange_has_no_rhythm_tag() {
        let tags = phase_tags(0.3, 2000.0, 2.0);
        assert_eq!(tags, vec!["flowing", "warm"]);
    }

    #[test]
    fn test_band_boundaries() {
        assert!(phase_tags(0.15, 2000.0, 1.0).contains(&"flowing".to_string()));
        assert!(phase_tags(0.45, 2000.0, 1.0).contains(&"energetic".to_string()));
        assert!(phase_tags(0.75, 2000.0, 1.0).contains(&"intense".to_string()));
    }

    #[test]
    fn test_character_single_phase_is_monolithic() {
        let tags = character_tags(0.3, 0.02, 1);
        assert!(tags.contains(&"steady".to_string()));
        assert!(tags.contains(&"monolithic".to_string()));
    }

    #[test]
    fn test_character_many_phases_is_episodic() {
        let tags = character_tags(0.5, 0.3, 7);
        assert_eq!(tags, vec!["dynamic", "episodic"]);
    }
}
