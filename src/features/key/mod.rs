//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Kessler templates (24 keys)
//! - Pearson template matching against the global chromagram
//! - Key clarity scoring

pub mod detector;
pub mod key_clarity;
pub mod templates;

pub use detector::detect_key;
pub use key_clarity::compute_key_clarity;
pub use templates::KeyTemplates;

use serde::{Deserialize, Serialize};

use crate::features::chroma::pitch_class_name;

/// Circle of fifths starting at C major (1A … 12A)
const CIRCLE_OF_FIFTHS_MAJOR: [u32; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

/// Relative minors in circle-of-fifths order (1B … 12B)
const CIRCLE_OF_FIFTHS_MINOR: [u32; 12] = [9, 4, 11, 6, 1, 8, 3, 10, 5, 0, 7, 2];

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Tonic pitch class (0-11)
    pub fn root(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// True for minor keys
    pub fn is_minor(&self) -> bool {
        matches!(self, Key::Minor(_))
    }

    /// Short notation: note name, plus "m" for minor ("C", "F#", "Am")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_studio::features::key::Key;
    ///
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Minor(1).name(), "C#m");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(_) => pitch_class_name(self.root() as usize).to_string(),
            Key::Minor(_) => format!("{}m", pitch_class_name(self.root() as usize)),
        }
    }

    /// Long notation used in analysis results ("C major", "A minor")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_studio::features::key::Key;
    ///
    /// assert_eq!(Key::Major(0).display_name(), "C major");
    /// assert_eq!(Key::Minor(9).display_name(), "A minor");
    /// ```
    pub fn display_name(&self) -> String {
        let mode = if self.is_minor() { "minor" } else { "major" };
        format!("{} {}", pitch_class_name(self.root() as usize), mode)
    }

    /// DJ numerical notation ("1A" = C major … "12B" = D minor)
    ///
    /// Numbering follows the circle of fifths; a major key and its relative
    /// minor share a number.
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_studio::features::key::Key;
    ///
    /// assert_eq!(Key::Major(7).numerical(), "2A"); // G
    /// assert_eq!(Key::Minor(4).numerical(), "2B"); // Em
    /// ```
    pub fn numerical(&self) -> String {
        let (circle, suffix) = match self {
            Key::Major(_) => (&CIRCLE_OF_FIFTHS_MAJOR, 'A'),
            Key::Minor(_) => (&CIRCLE_OF_FIFTHS_MINOR, 'B'),
        };
        let position = circle
            .iter()
            .position(|&x| x == self.root())
            .unwrap_or(0);
        format!("{}{}", position + 1, suffix)
    }

    /// Parse DJ numerical notation
    ///
    /// Returns `None` for anything outside `1A`..`12B`.
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_studio::features::key::Key;
    ///
    /// assert_eq!(Key::from_numerical("1B"), Some(Key::Minor(9)));
    /// assert_eq!(Key::from_numerical("13A"), None);
    /// ```
    pub fn from_numerical(notation: &str) -> Option<Self> {
        let notation = notation.trim();
        if notation.len() < 2 || !notation.is_ascii() {
            return None;
        }
        let (num_str, suffix) = notation.split_at(notation.len() - 1);
        let num: usize = num_str.parse().ok()?;
        if !(1..=12).contains(&num) {
            return None;
        }
        match suffix {
            "A" | "a" => Some(Key::Major(CIRCLE_OF_FIFTHS_MAJOR[num - 1])),
            "B" | "b" => Some(Key::Minor(CIRCLE_OF_FIFTHS_MINOR[num - 1])),
            _ => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Key detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDetectionResult {
    /// Detected key (best match)
    pub key: Key,

    /// Relative lead over the runner-up (0.0-1.0)
    pub confidence: f32,

    /// How tonal the recording is (0.0-1.0)
    pub clarity: f32,

    /// All 24 key correlations (ranked, highest first)
    pub all_scores: Vec<(Key, f32)>,

    /// Top keys with scores, useful for ambiguous cases or key mixing
    pub top_keys: Vec<(Key, f32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Key::Major(0).name(), "C");
        assert_eq!(Key::Minor(9).name(), "Am");
        assert_eq!(Key::Minor(3).display_name(), "D# minor");
        assert_eq!(Key::Major(11).to_string(), "B major");
    }

    #[test]
    fn test_numerical_round_trip_all_keys() {
        for root in 0..12 {
            for key in [Key::Major(root), Key::Minor(root)] {
                assert_eq!(Key::from_numerical(&key.numerical()), Some(key));
            }
        }
    }

    #[test]
    fn test_relative_keys_share_number() {
        assert_eq!(Key::Major(0).numerical(), "1A");
        assert_eq!(Key::Minor(9).numerical(), "1B");
        assert_eq!(Key::Major(5).numerical(), "12A");
        assert_eq!(Key::Minor(2).numerical(), "12B");
    }

    #[test]
    fn test_from_numerical_rejects_garbage() {
        assert_eq!(Key::from_numerical(""), None);
        assert_eq!(Key::from_numerical("0A"), None);
        assert_eq!(Key::from_numerical("5C"), None);
        assert_eq!(Key::from_numerical("xA"), None);
    }
}
