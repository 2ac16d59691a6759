//! Channel mixing utilities (stereo to mono conversion)

use serde::{Deserialize, Serialize};

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelMixMode {
    /// Simple average of all channels
    #[default]
    Mean,
    /// Keep the channel with the higher RMS
    Dominant,
}

/// Mix one or two channels down to mono
///
/// Non-finite samples are treated as silence.
///
/// # Arguments
///
/// * `channels` - Per-channel samples (equal lengths)
/// * `mode` - Mixing mode
///
/// # Returns
///
/// Mono samples
pub fn mix_to_mono(channels: &[Vec<f32>], mode: ChannelMixMode) -> Vec<f32> {
    log::debug!("Mixing {} channel(s) to mono using {:?}", channels.len(), mode);

    let sanitize = |x: f32| if x.is_finite() { x } else { 0.0 };

    match channels {
        [] => Vec::new(),
        [only] => only.iter().copied().map(sanitize).collect(),
        [left, right, ..] => match mode {
            ChannelMixMode::Mean => left
                .iter()
                .zip(right.iter())
                .map(|(&l, &r)| (sanitize(l) + sanitize(r)) * 0.5)
                .collect(),
            ChannelMixMode::Dominant => {
                let energy = |c: &[f32]| c.iter().map(|&x| sanitize(x) * sanitize(x)).sum::<f32>();
                let source = if energy(left) >= energy(right) { left } else { right };
                source.iter().copied().map(sanitize).collect()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_mix() {
        let mono = mix_to_mono(&[vec![1.0, 0.5], vec![0.0, 0.5]], ChannelMixMode::Mean);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn test_dominant_mix_picks_louder_channel() {
        let mono = mix_to_mono(&[vec![0.1, 0.1], vec![0.9, -0.9]], ChannelMixMode::Dominant);
        assert_eq!(mono, vec![0.9, -0.9]);
    }

    #[test]
    fn test_non_finite_samples_become_silence() {
        let mono = mix_to_mono(&[vec![f32::NAN, f32::INFINITY, 0.25]], ChannelMixMode::Mean);
        assert_eq!(mono, vec![0.0, 0.0, 0.25]);
    }
}
