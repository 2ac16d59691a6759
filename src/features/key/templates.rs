//! Krumhansl-Kessler key templates
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor). The C major and
//! C minor probe-tone profiles are rotated to every root.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in
//! Perceived Tonal Organization in a Spatial Representation of Musical Keys.
//! *Psychological Review*, 89(4), 334-368.

use super::Key;

/// C major probe-tone ratings
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// C minor probe-tone ratings
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (12 keys: C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (12 keys: C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create the 24 rotated Krumhansl-Kessler templates
    pub fn new() -> Self {
        Self {
            major: std::array::from_fn(|root| rotate(&MAJOR_PROFILE, root)),
            minor: std::array::from_fn(|root| rotate(&MINOR_PROFILE, root)),
        }
    }

    /// Template for one key
    pub fn template(&self, key: Key) -> &[f32; 12] {
        match key {
            Key::Major(root) => &self.major[root as usize % 12],
            Key::Minor(root) => &self.minor[root as usize % 12],
        }
    }

    /// All 24 keys with their templates, majors first
    pub fn iter(&self) -> impl Iterator<Item = (Key, &[f32; 12])> {
        let majors = (0..12u32).map(move |r| (Key::Major(r), &self.major[r as usize]));
        let minors = (0..12u32).map(move |r| (Key::Minor(r), &self.minor[r as usize]));
        majors.chain(minors)
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate a C-rooted profile so index `root` carries the tonic weight
fn rotate(profile: &[f32; 12], root: usize) -> [f32; 12] {
    std::array::from_fn(|pc| profile[(pc + 12 - root % 12) % 12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation() {
        let t = KeyTemplates::new();
        assert_eq!(t.major[0], MAJOR_PROFILE);
        // G major: tonic weight on G, dominant weight on D
        assert_eq!(t.major[7][7], 6.35);
        assert_eq!(t.major[7][2], 5.19);
        // A minor: tonic on A, minor third on C
        assert_eq!(t.template(Key::Minor(9))[9], 6.33);
        assert_eq!(t.template(Key::Minor(9))[0], 5.38);
    }

    #[test]
    fn test_iter_covers_24_keys() {
        let t = KeyTemplates::new();
        assert_eq!(t.iter().count(), 24);
    }
}
