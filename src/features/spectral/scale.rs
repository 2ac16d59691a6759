//! Frequency and level scale conversions

/// Floor applied before converting magnitudes to dB
pub const DB_FLOOR_AMPLITUDE: f32 = 1e-9;

/// Convert a linear magnitude to dB: `20·log10(max(x, 1e-9))`
pub fn amplitude_to_db(x: f32) -> f32 {
    let x = if x.is_finite() { x } else { 0.0 };
    20.0 * x.max(DB_FLOOR_AMPLITUDE).log10()
}

/// Convert dB back to a linear magnitude
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Fractional MIDI note number for a frequency (A4 = 440 Hz = 69)
pub fn hz_to_midi(hz: f32) -> f32 {
    12.0 * (hz / 440.0).log2() + 69.0
}

/// Frequency of a (fractional) MIDI note number
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * 2.0_f32.powf((midi - 69.0) / 12.0)
}

/// Pitch class (0 = C … 11 = B) of the semitone nearest to `hz`
pub fn pitch_class_of(hz: f32) -> usize {
    (hz_to_midi(hz).round() as i64).rem_euclid(12) as usize
}

/// Hz to mel (O'Shaughnessy formula)
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Mel to Hz
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Power of two nearest to `x` on a log scale, clamped to `[min, max]`
pub fn nearest_power_of_two(x: f32, min: usize, max: usize) -> usize {
    if x <= 1.0 {
        return min;
    }
    let exponent = x.log2().round() as u32;
    (1usize << exponent.min(30)).clamp(min, max)
}
