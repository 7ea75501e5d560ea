use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Major or minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Major,
    Minor,
}

/// A musical key: pitch class (0 = C .. 11 = B) plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub pitch_class: u8,
    pub mode: Mode,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("unparseable key: {0:?}")]
    Unparseable(String),
    #[error("pitch class out of range: {0}")]
    PitchClassRange(u8),
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl Key {
    pub fn new(pitch_class: u8, mode: Mode) -> Result<Self, KeyError> {
        if pitch_class > 11 {
            return Err(KeyError::PitchClassRange(pitch_class));
        }
        Ok(Self { pitch_class, mode })
    }

    /// Parse common key notation: "C", "Am", "F# minor", "Bb major", "c#m".
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();

        let letter = chars
            .next()
            .ok_or_else(|| KeyError::Unparseable(s.to_string()))?;
        let mut pitch_class: i16 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(KeyError::Unparseable(s.to_string())),
        };

        let mut rest: &str = chars.as_str();
        if let Some(stripped) = rest.strip_prefix('#') {
            pitch_class += 1;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('b') {
            pitch_class -= 1;
            rest = stripped;
        }

        let mode = match rest.trim().to_ascii_lowercase().as_str() {
            "" | "maj" | "major" => Mode::Major,
            "m" | "min" | "minor" => Mode::Minor,
            _ => return Err(KeyError::Unparseable(s.to_string())),
        };

        Ok(Self {
            pitch_class: pitch_class.rem_euclid(12) as u8,
            mode,
        })
    }

    /// Pitch class of the relative major (minor keys map up a minor third).
    fn relative_major_pitch_class(&self) -> u8 {
        match self.mode {
            Mode::Major => self.pitch_class,
            Mode::Minor => (self.pitch_class + 3) % 12,
        }
    }

    pub fn name(&self) -> String {
        let root = NOTE_NAMES[self.pitch_class as usize];
        match self.mode {
            Mode::Major => root.to_string(),
            Mode::Minor => format!("{root}m"),
        }
    }
}

/// Circle-of-fifths distance between two keys, 0..=6.
///
/// Minor keys are treated as their relative major first, so A minor sits at
/// the same point on the circle as C major — the standard harmonic-mixing
/// equivalence. Symmetric.
pub fn fifths_distance(a: Key, b: Key) -> u8 {
    let pos_a = (a.relative_major_pitch_class() as i16 * 7) % 12;
    let pos_b = (b.relative_major_pitch_class() as i16 * 7) % 12;
    let d = (pos_a - pos_b).rem_euclid(12);
    d.min(12 - d) as u8
}

/// Harmonic compatibility score: 1.0 at distance 0, linearly down to 0.0 at
/// the tritone (distance 6). Monotone non-increasing in distance.
pub fn key_score(a: Key, b: Key) -> f64 {
    1.0 - fifths_distance(a, b) as f64 / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    #[test]
    fn test_parse_plain_major() {
        assert_eq!(key("C"), Key { pitch_class: 0, mode: Mode::Major });
        assert_eq!(key("G"), Key { pitch_class: 7, mode: Mode::Major });
        assert_eq!(key("Bb"), Key { pitch_class: 10, mode: Mode::Major });
        assert_eq!(key("F#"), Key { pitch_class: 6, mode: Mode::Major });
    }

    #[test]
    fn test_parse_minor_forms() {
        for s in ["Am", "A min", "A minor", "a minor"] {
            assert_eq!(key(s), Key { pitch_class: 9, mode: Mode::Minor }, "{s}");
        }
    }

    #[test]
    fn test_parse_cb_wraps() {
        assert_eq!(key("Cb").pitch_class, 11);
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(Key::parse("H").is_err());
        assert!(Key::parse("").is_err());
        assert!(Key::parse("C mixolydian").is_err());
    }

    #[test]
    fn test_identical_keys_distance_zero() {
        assert_eq!(fifths_distance(key("C"), key("C")), 0);
        assert_eq!(key_score(key("C"), key("C")), 1.0);
    }

    #[test]
    fn test_adjacent_fifth() {
        // C and G are neighbors on the circle
        assert_eq!(fifths_distance(key("C"), key("G")), 1);
        assert_eq!(fifths_distance(key("C"), key("F")), 1);
    }

    #[test]
    fn test_tritone_is_max_distance() {
        // C and F# are opposite poles
        assert_eq!(fifths_distance(key("C"), key("F#")), 6);
        assert_eq!(key_score(key("C"), key("F#")), 0.0);
    }

    #[test]
    fn test_semitone_neighbors_are_far() {
        // C and C# are adjacent in pitch but 5 fifths apart
        assert_eq!(fifths_distance(key("C"), key("C#")), 5);
    }

    #[test]
    fn test_relative_minor_distance_zero() {
        // A minor is the relative minor of C major
        assert_eq!(fifths_distance(key("C"), key("Am")), 0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [("C", "G"), ("Am", "E"), ("Bb", "F#m")];
        for (a, b) in pairs {
            assert_eq!(fifths_distance(key(a), key(b)), fifths_distance(key(b), key(a)));
        }
    }

    #[test]
    fn test_score_monotone_in_distance() {
        // Walk the circle outward from C; score must never increase
        let others = ["C", "G", "D", "A", "E", "B", "F#"];
        let scores: Vec<f64> = others.iter().map(|s| key_score(key("C"), key(s))).collect();
        for w in scores.windows(2) {
            assert!(w[0] >= w[1], "scores not monotone: {scores:?}");
        }
    }

    #[test]
    fn test_name_round_trip() {
        for s in ["C", "F#", "Am", "A#m"] {
            assert_eq!(Key::parse(&key(s).name()).unwrap(), key(s));
        }
    }
}
