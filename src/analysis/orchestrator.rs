//! Analysis orchestrator
//!
//! Runs the requested components over one buffer in a fixed order:
//!
//! 1. Rhythm: onsets → beat grid → drum hits → quiet-hit prediction →
//!    optional quantisation → pattern match
//! 2. Harmony: chroma → key → chords (stem fusion, bass notes, beat
//!    alignment when available)
//! 3. Mix: band energies → problems, masking, resonances, loudness,
//!    reference comparison
//! 4. Room (pure function of the room description)
//! 5. Psychoacoustic weighting of the mix band energies
//!
//! Harmony and mix share one STFT of the mono mixdown. Every long loop
//! passes through the run's suspension point, so a run can be cancelled
//! and yields to the host at least every time slice.
//!
//! A component that hits an internal error is marked `Failed` and the run
//! continues; invalid input, invalid configuration and cancellation abort
//! the run.

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;

use super::context::{CancelToken, EngineContext, NoSuspend, ProgressCallback, RunControl, Suspend};
use super::metadata::AnalysisMetadata;
use super::result::{
    AnalysisFlag, AnalysisResult, ComponentStatus, ComponentStatuses, HarmonyResult,
    RhythmResult,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::beat_tracking::{track_beats, LOW_CONFIDENCE_CAP};
use crate::features::chords::fusion::resolve_stems;
use crate::features::chords::{
    align_to_grid, attach_bass_notes, detect_chords, fuse_chroma, ChordSegment, StemChroma,
    StemKind,
};
use crate::features::chroma::{extract_chroma, harmony_grid, Chroma};
use crate::features::drums::predictor::predict_in_samples;
use crate::features::drums::{
    assign_positions, classify_samples, default_catalogue, match_pattern, quantise, QuantiseConfig,
};
use crate::features::key::{detect_key, KeyTemplates};
use crate::features::mix::{analyse_mix, MixReport};
use crate::features::onset::detector::detect;
use crate::features::onset::envelope::rhythm_grid;
use crate::features::psychoacoustic::{resolve_genre, weigh_mix};
use crate::features::room::{analyse_room, Room};
use crate::features::spectral::bands::N_BANDS;
use crate::features::spectral::stft::stft_samples;
use crate::features::spectral::{to_bands, Band, FrameGrid, Spectrogram, StftScratch, WindowType};
use crate::io::AudioBuffer;

/// Buffers shorter than this are analysed with capped confidence
const SHORT_BUFFER_S: f32 = 1.0;

/// Key clarity below which harmony is flagged as weakly tonal
const WEAK_TONALITY_CLARITY: f32 = 0.2;

/// Reference for the mix comparison
#[derive(Debug, Clone)]
pub enum Reference {
    /// A reference track; its band energies are measured like the mix
    Buffer(AudioBuffer),
    /// Precomputed mean band energies in dB (sub … air)
    BandEnergies([f32; N_BANDS]),
}

/// Inputs and switches for one analysis run
pub struct AnalysisOptions {
    /// Run onset, beat and drum analysis
    pub do_rhythm: bool,

    /// Run chroma, key and chord analysis
    pub do_harmony: bool,

    /// Run the mix analyser (and the psychoacoustic weighting)
    pub do_mix: bool,

    /// Run room analysis when a room is supplied
    pub do_room: bool,

    /// Separated stems keyed by `"vocals"`, `"bass"`, `"drums"`, `"other"`
    pub stems: HashMap<String, AudioBuffer>,

    /// Reference for the mix comparison
    pub reference: Option<Reference>,

    /// Room description
    pub room: Option<Room>,

    /// Genre id for the psychoacoustic targets (default `"pop"`)
    pub genre: String,

    /// Monitor level, 0 = quiet, 1 = loud (default 0.5)
    pub monitor_level: f32,

    /// Reject unknown genre ids and stem keys instead of warning
    pub strict: bool,

    /// Snap chord boundaries to the beat grid when rhythm ran
    pub grid_align: bool,

    /// Quantise drum hits to the beat grid
    pub quantise: Option<QuantiseConfig>,

    /// Progress callback `(phase, fraction)`
    pub progress: Option<ProgressCallback>,

    /// Cancellation token
    pub cancel: Option<CancelToken>,

    /// Engine configuration
    pub config: AnalysisConfig,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            do_rhythm: true,
            do_harmony: true,
            do_mix: true,
            do_room: true,
            stems: HashMap::new(),
            reference: None,
            room: None,
            genre: "pop".to_string(),
            monitor_level: 0.5,
            strict: false,
            grid_align: true,
            quantise: None,
            progress: None,
            cancel: None,
            config: AnalysisConfig::default(),
        }
    }
}

impl std::fmt::Debug for AnalysisOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOptions")
            .field("do_rhythm", &self.do_rhythm)
            .field("do_harmony", &self.do_harmony)
            .field("do_mix", &self.do_mix)
            .field("do_room", &self.do_room)
            .field("stems", &self.stems.keys().collect::<Vec<_>>())
            .field("reference", &self.reference.is_some())
            .field("room", &self.room)
            .field("genre", &self.genre)
            .field("monitor_level", &self.monitor_level)
            .field("strict", &self.strict)
            .field("grid_align", &self.grid_align)
            .field("quantise", &self.quantise)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Analyse a buffer
///
/// # Arguments
///
/// * `buffer` - Mix to analyse (mono or multi-channel)
/// * `options` - Components to run, auxiliary inputs and configuration
///
/// # Returns
///
/// `AnalysisResult` with one status per component. `ok` is false when any
/// component failed.
///
/// # Errors
///
/// - `AnalysisError::InvalidInput` for an empty buffer, a bad room or
///   mismatched stem sample rates
/// - `AnalysisError::InvalidConfig` for invalid configuration, or an unknown
///   genre / stem key in strict mode
/// - `AnalysisError::Cancelled` when the cancel token fires
///
/// # Example
///
/// ```no_run
/// use stratum_studio::{analyse, AnalysisOptions, AudioBuffer};
///
/// let samples: Vec<f32> = vec![0.0; 44100 * 30];
/// let buffer = AudioBuffer::mono(samples, 44100)?;
/// let result = analyse(&buffer, AnalysisOptions::default())?;
/// println!("BPM: {:?}, key: {:?}", result.bpm(), result.key_name());
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
pub fn analyse(buffer: &AudioBuffer, options: AnalysisOptions) -> Result<AnalysisResult, AnalysisError> {
    let start_time = Instant::now();

    let AnalysisOptions {
        do_rhythm,
        do_harmony,
        do_mix,
        do_room,
        stems: stem_map,
        reference,
        room,
        genre,
        monitor_level,
        strict,
        grid_align,
        quantise: quantise_config,
        progress,
        cancel,
        config,
    } = options;

    buffer.validate()?;
    config.validate()?;
    if let Some(q) = &quantise_config {
        q.validate()?;
    }
    if let Some(Reference::Buffer(r)) = &reference {
        r.validate()?;
    }
    if do_room {
        if let Some(r) = &room {
            r.validate()?;
        }
    }
    let genre = resolve_genre(&genre, strict)?;
    let stems = resolve_stems(&stem_map, buffer.sample_rate(), strict)?;

    let sample_rate = buffer.sample_rate();
    let duration = buffer.duration_seconds();
    let short = duration < SHORT_BUFFER_S;

    log::debug!(
        "Starting analysis: {} samples ({} ch) at {} Hz, {:.2}s, {} stems",
        buffer.len(),
        buffer.channel_count(),
        sample_rate,
        duration,
        stems.len()
    );

    let mut context = EngineContext::new(RunControl::new(cancel, progress));
    let mut statuses = ComponentStatuses::default();
    let mut warnings: Vec<String> = Vec::new();

    if short {
        log::warn!("Buffer is {:.2}s: confidence will be capped", duration);
        warnings.push(format!(
            "Buffer is shorter than {:.0}s; rhythm and harmony confidence are capped",
            SHORT_BUFFER_S
        ));
    }

    let mono = buffer.mixdown(config.mix_mode);

    // Rhythm
    let rhythm = if do_rhythm {
        let outcome = run_rhythm(&mono, sample_rate, short, &config, quantise_config.as_ref(), &mut context);
        component("rhythm", outcome, &mut statuses.rhythm, &mut warnings)?
    } else {
        None
    };

    // Shared spectrogram for harmony and mix
    let spectrogram = if do_harmony || do_mix {
        let grid = harmony_grid(sample_rate, mono.len(), &config.harmony)?;
        let (scratch, control) = context.split();
        control.report("spectrum", 0.0)?;
        let spectrogram = hann_stft(&mono, &grid, scratch, control);
        control.report("spectrum", 1.0)?;
        match spectrogram {
            Ok(s) => Some(s),
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                log::warn!("Spectrum failed: {}", e);
                warnings.push(format!("Spectrum failed: {}", e));
                if do_harmony {
                    statuses.harmony = ComponentStatus::Failed;
                }
                if do_mix {
                    statuses.mix = ComponentStatus::Failed;
                }
                None
            }
        }
    } else {
        None
    };

    // Harmony
    let harmony = match (&spectrogram, do_harmony) {
        (Some(spectrogram), true) => {
            let beats = if grid_align {
                rhythm.as_ref().map(|r| r.beat_grid.beats.as_slice())
            } else {
                None
            };
            let outcome = run_harmony(
                spectrogram,
                &stems,
                beats,
                duration,
                short,
                &config,
                &mut context,
            );
            component("harmony", outcome, &mut statuses.harmony, &mut warnings)?
        }
        _ => None,
    };

    // Mix
    let mix = match (&spectrogram, do_mix) {
        (Some(spectrogram), true) => {
            let outcome = run_mix(buffer, spectrogram, reference.as_ref(), short, &config, &mut context);
            component("mix", outcome, &mut statuses.mix, &mut warnings)?
        }
        _ => None,
    };

    // Room
    let room_report = match (&room, do_room) {
        (Some(room), true) => {
            context.control().report("room", 0.0)?;
            let outcome = analyse_room(room, &config.room).map(|r| (r, ComponentStatus::Ok));
            let report = component("room", outcome, &mut statuses.room, &mut warnings)?;
            context.control().report("room", 1.0)?;
            report
        }
        (None, true) => {
            log::debug!("No room description supplied, skipping room analysis");
            None
        }
        (Some(_), false) => {
            warnings.push("Room description supplied but room analysis was not requested".to_string());
            None
        }
        (None, false) => None,
    };

    // Psychoacoustic weighting
    let psychoacoustic = match &mix {
        Some(report) => {
            context.control().report("psychoacoustic", 0.0)?;
            let weighted = weigh_mix(&report.band_energies_db, genre, monitor_level, &config.psychoacoustic);
            statuses.psychoacoustic = ComponentStatus::Ok;
            context.control().report("psychoacoustic", 1.0)?;
            Some(weighted)
        }
        None => None,
    };

    context.control().report("complete", 1.0)?;

    for (name, status) in statuses.iter() {
        if let ComponentStatus::Degraded(flags) = status {
            for flag in flags {
                if *flag != AnalysisFlag::ShortBuffer {
                    warnings.push(format!("{}: {}", name, flag_message(*flag)));
                }
            }
        }
    }

    let processing_time_ms = start_time.elapsed().as_secs_f64() as f32 * 1000.0;
    let ok = !statuses.any_failed();

    log::info!(
        "Analysis complete: ok={}, bpm={:?}, key={:?}, {:.2} ms",
        ok,
        rhythm.as_ref().map(|r| r.beat_grid.bpm),
        harmony.as_ref().map(|h| h.key.as_str()),
        processing_time_ms
    );

    Ok(AnalysisResult {
        ok,
        status: statuses,
        rhythm,
        harmony,
        mix,
        room: room_report,
        psychoacoustic,
        metadata: AnalysisMetadata {
            duration_seconds: duration,
            sample_rate,
            channels: buffer.channel_count(),
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            suspensions: context.control().suspensions(),
            warnings,
        },
    })
}

/// Analyse several buffers in parallel
///
/// Each job gets its own engine context; results keep the job order.
pub fn analyse_batch(jobs: Vec<(AudioBuffer, AnalysisOptions)>) -> Vec<Result<AnalysisResult, AnalysisError>> {
    log::debug!("Analysing batch of {} buffers", jobs.len());
    jobs.into_par_iter()
        .map(|(buffer, options)| analyse(&buffer, options))
        .collect()
}

/// Upper bound on the number of FFT frames a run performs
///
/// Counts the rhythm STFT, the shared harmony/mix STFT and one drum
/// classification FFT per possible onset. Stems and a reference buffer add
/// one harmony STFT each on top of this.
pub fn estimate_work(buffer: &AudioBuffer, config: &AnalysisConfig) -> Result<usize, AnalysisError> {
    buffer.validate()?;
    config.validate()?;
    let sample_rate = buffer.sample_rate();
    let rhythm = rhythm_grid(sample_rate, buffer.len(), &config.rhythm)?.n_frames;
    let harmony = harmony_grid(sample_rate, buffer.len(), &config.harmony)?.n_frames;
    let max_onsets = (buffer.duration_seconds() / config.rhythm.refractory_s).ceil() as usize + 1;
    Ok(rhythm + harmony + max_onsets)
}

/// Mean band energies (dB) of a buffer, measured the way the mix analyser
/// measures them
///
/// Hosts can use this to precompute a `Reference::BandEnergies`.
pub fn band_energies(buffer: &AudioBuffer, config: &AnalysisConfig) -> Result<[f32; N_BANDS], AnalysisError> {
    buffer.validate()?;
    let mut scratch = StftScratch::new();
    band_energies_with(buffer, config, &mut scratch, &mut NoSuspend)
}

fn band_energies_with(
    buffer: &AudioBuffer,
    config: &AnalysisConfig,
    scratch: &mut StftScratch,
    suspend: &mut dyn Suspend,
) -> Result<[f32; N_BANDS], AnalysisError> {
    let mono = buffer.mixdown(config.mix_mode);
    let grid = harmony_grid(buffer.sample_rate(), mono.len(), &config.harmony)?;
    let spectrogram = hann_stft(&mono, &grid, scratch, suspend)?;
    Ok(to_bands(&spectrogram, &Band::ALL).mean_db())
}

fn hann_stft(
    samples: &[f32],
    grid: &FrameGrid,
    scratch: &mut StftScratch,
    suspend: &mut dyn Suspend,
) -> Result<Spectrogram, AnalysisError> {
    stft_samples(samples, grid, WindowType::Hann, scratch, suspend)
}

fn run_rhythm(
    mono: &[f32],
    sample_rate: u32,
    short: bool,
    config: &AnalysisConfig,
    quantise_config: Option<&QuantiseConfig>,
    context: &mut EngineContext,
) -> Result<(RhythmResult, ComponentStatus), AnalysisError> {
    let (scratch, control) = context.split();

    control.report("rhythm", 0.0)?;
    let (envelope, onsets) = detect(mono, sample_rate, &config.rhythm, scratch, control)?;
    control.report("rhythm", 0.3)?;

    let analysed_s = envelope.grid.n_samples as f32 / sample_rate as f32;
    let tracked = track_beats(&envelope, &onsets, analysed_s, &config.rhythm, control)?;
    control.report("rhythm", 0.6)?;

    let hits = classify_samples(mono, sample_rate, &onsets, &config.drums, scratch, control)?;
    control.report("rhythm", 0.9)?;

    let mut beat_grid = tracked.grid;
    let mut hits = predict_in_samples(mono, sample_rate, &hits, &beat_grid, &config.quiet_hits, control)?;
    assign_positions(&mut hits, &beat_grid);
    if let Some(q) = quantise_config {
        hits = quantise(&hits, &beat_grid, q)?;
    }
    let pattern = match_pattern(&hits, &beat_grid, &default_catalogue());

    let mut flags = Vec::new();
    if short {
        flags.push(AnalysisFlag::ShortBuffer);
        beat_grid.confidence = beat_grid.confidence.min(LOW_CONFIDENCE_CAP);
    }
    if tracked.sparse_onsets {
        flags.push(AnalysisFlag::SparseOnsets);
    }
    if tracked.weak_periodicity {
        flags.push(AnalysisFlag::WeakPeriodicity);
    }
    control.report("rhythm", 1.0)?;

    log::debug!(
        "Rhythm: {:.2} BPM ({:?}), {} onsets, {} hits, pattern {:?}",
        beat_grid.bpm,
        beat_grid.auto_corrected,
        onsets.len(),
        hits.len(),
        pattern.as_ref().map(|p| p.pattern_id.as_str())
    );

    Ok((
        RhythmResult {
            beat_grid,
            onsets,
            hits,
            pattern,
            onset_density: tracked.onset_density,
        },
        ComponentStatus::from_flags(flags),
    ))
}

fn run_harmony(
    spectrogram: &Spectrogram,
    stems: &[(StemKind, &AudioBuffer)],
    beats: Option<&[f32]>,
    duration: f32,
    short: bool,
    config: &AnalysisConfig,
    context: &mut EngineContext,
) -> Result<(HarmonyResult, ComponentStatus), AnalysisError> {
    let (scratch, control) = context.split();
    let mut flags = Vec::new();

    control.report("harmony", 0.0)?;
    let chromagram = extract_chroma(spectrogram, &config.harmony, control)?;
    let key_detection = detect_key(&chromagram.global, &KeyTemplates::new())?;
    control.report("harmony", 0.3)?;

    let mut stem_chroma = Vec::new();
    for (kind, stem) in stems.iter().filter(|(kind, _)| kind.is_harmonic()) {
        let stem_mono = stem.mixdown(config.mix_mode);
        let grid = harmony_grid(stem.sample_rate(), stem_mono.len(), &config.harmony)?;
        let stem_spectrogram = hann_stft(&stem_mono, &grid, scratch, control)?;
        let chroma = extract_chroma(&stem_spectrogram, &config.harmony, control)?;
        stem_chroma.push(StemChroma::new(*kind, chroma, &stem_mono));
    }
    control.report("harmony", 0.6)?;

    let mut fused_frames: Vec<Chroma> = fuse_chroma(&stem_chroma, &config.harmony.fusion);
    fused_frames.truncate(spectrogram.n_frames());
    let fused = !fused_frames.is_empty();
    if !stem_chroma.is_empty() && !fused {
        log::warn!("Harmonic stems carry no signal, detecting chords on the mix");
        flags.push(AnalysisFlag::SilentStems);
    }
    let frames: &[Chroma] = if fused { &fused_frames } else { &chromagram.frames };

    let mut chords = detect_chords(frames, spectrogram.grid(), &config.harmony, control)?;
    if let Some(bass) = stem_chroma.iter().find(|s| s.kind == StemKind::Bass) {
        attach_bass_notes(&mut chords, &bass.chromagram);
    }
    if let Some(beats) = beats {
        chords = align_to_grid(&chords, beats);
    }
    control.report("harmony", 1.0)?;

    let mut confidence = harmony_confidence(key_detection.clarity, &chords, duration);
    if short {
        flags.push(AnalysisFlag::ShortBuffer);
        confidence = confidence.min(LOW_CONFIDENCE_CAP);
    }
    if key_detection.clarity < WEAK_TONALITY_CLARITY {
        flags.push(AnalysisFlag::WeakTonality);
    }
    if chords.is_empty() {
        flags.push(AnalysisFlag::NoChords);
    }

    let key = key_detection.key.display_name();
    log::debug!(
        "Harmony: key {} (clarity {:.3}), {} chords, fused={}, confidence {:.3}",
        key,
        key_detection.clarity,
        chords.len(),
        fused,
        confidence
    );

    Ok((
        HarmonyResult {
            chromagram,
            key_detection,
            key,
            chords,
            fused,
            confidence,
        },
        ComponentStatus::from_flags(flags),
    ))
}

/// Mean of key clarity and coverage-weighted chord confidence
fn harmony_confidence(clarity: f32, chords: &[ChordSegment], duration: f32) -> f32 {
    let covered: f32 = chords.iter().map(|c| c.duration()).sum();
    let chord_score = if covered > 0.0 && duration > 0.0 {
        let mean = chords.iter().map(|c| c.confidence * c.duration()).sum::<f32>() / covered;
        mean * (covered / duration).min(1.0)
    } else {
        0.0
    };
    (0.5 * (clarity + chord_score)).clamp(0.0, 1.0)
}

fn run_mix(
    buffer: &AudioBuffer,
    spectrogram: &Spectrogram,
    reference: Option<&Reference>,
    short: bool,
    config: &AnalysisConfig,
    context: &mut EngineContext,
) -> Result<(MixReport, ComponentStatus), AnalysisError> {
    let (scratch, control) = context.split();

    control.report("mix", 0.0)?;
    let bands = to_bands(spectrogram, &Band::ALL);
    let reference_db = match reference {
        Some(Reference::BandEnergies(db)) => Some(*db),
        Some(Reference::Buffer(r)) => Some(band_energies_with(r, config, scratch, control)?),
        None => None,
    };
    control.report("mix", 0.2)?;

    let report = analyse_mix(buffer, spectrogram, &bands, reference_db.as_ref(), &config.mix, control)?;
    control.report("mix", 1.0)?;

    let flags = if short {
        vec![AnalysisFlag::ShortBuffer]
    } else {
        Vec::new()
    };
    Ok((report, ComponentStatus::from_flags(flags)))
}

fn is_fatal(error: &AnalysisError) -> bool {
    matches!(
        error,
        AnalysisError::Cancelled | AnalysisError::InvalidInput(_) | AnalysisError::InvalidConfig(_)
    )
}

/// Record a component outcome
///
/// Internal errors mark the component `Failed`; fatal errors abort the run.
fn component<T>(
    name: &str,
    outcome: Result<(T, ComponentStatus), AnalysisError>,
    status: &mut ComponentStatus,
    warnings: &mut Vec<String>,
) -> Result<Option<T>, AnalysisError> {
    match outcome {
        Ok((value, s)) => {
            *status = s;
            Ok(Some(value))
        }
        Err(e) if is_fatal(&e) => Err(e),
        Err(e) => {
            log::warn!("Component {} failed: {}", name, e);
            warnings.push(format!("{} failed: {}", name, e));
            *status = ComponentStatus::Failed;
            Ok(None)
        }
    }
}

fn flag_message(flag: AnalysisFlag) -> &'static str {
    match flag {
        AnalysisFlag::ShortBuffer => "buffer shorter than one second",
        AnalysisFlag::SparseOnsets => "too few onsets for a reliable beat grid",
        AnalysisFlag::WeakPeriodicity => "no clear periodicity in the onset envelope",
        AnalysisFlag::WeakTonality => "weak tonality, key is ambiguous",
        AnalysisFlag::NoChords => "no stable chord found",
        AnalysisFlag::SilentStems => "stems carry no harmonic signal, chords detected on the mix",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chords::ChordQuality;
    use std::f32::consts::PI;

    fn sine(freq: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| 0.3 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn segment(confidence: f32, start_s: f32, end_s: f32) -> ChordSegment {
        ChordSegment {
            root: 0,
            quality: ChordQuality::Maj,
            confidence,
            margin: 0.1,
            start_s,
            end_s,
            bass_pitch_class: None,
        }
    }

    #[test]
    fn test_harmony_confidence() {
        assert_eq!(harmony_confidence(0.0, &[], 10.0), 0.0);
        // Full coverage at confidence 0.8, clarity 0.6
        let full = harmony_confidence(0.6, &[segment(0.8, 0.0, 10.0)], 10.0);
        assert!((full - 0.7).abs() < 1e-5);
        // Half coverage halves the chord term
        let half = harmony_confidence(0.6, &[segment(0.8, 0.0, 5.0)], 10.0);
        assert!((half - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_fatal_errors() {
        assert!(is_fatal(&AnalysisError::Cancelled));
        assert!(is_fatal(&AnalysisError::InvalidConfig("x".into())));
        assert!(!is_fatal(&AnalysisError::ProcessingError("x".into())));
        assert!(!is_fatal(&AnalysisError::InvalidFrame("x".into())));
    }

    #[test]
    fn test_processing_error_marks_failed() {
        let mut status = ComponentStatus::Skipped;
        let mut warnings = Vec::new();
        let outcome: Result<((), ComponentStatus), AnalysisError> =
            Err(AnalysisError::ProcessingError("boom".into()));
        let value = component("mix", outcome, &mut status, &mut warnings).unwrap();
        assert!(value.is_none());
        assert!(status.is_failed());
        assert_eq!(warnings.len(), 1);

        let outcome: Result<((), ComponentStatus), AnalysisError> = Err(AnalysisError::Cancelled);
        assert!(component("mix", outcome, &mut status, &mut warnings).is_err());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let buffer = AudioBuffer::mono(vec![], 44100).unwrap();
        let err = analyse(&buffer, AnalysisOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_strict_genre() {
        let buffer = AudioBuffer::mono(sine(440.0, 0.5, 44100), 44100).unwrap();
        let options = AnalysisOptions {
            genre: "polka".to_string(),
            strict: true,
            ..AnalysisOptions::default()
        };
        let err = analyse(&buffer, options).unwrap_err();
        assert_eq!(err.kind(), "invalid_config");
    }

    #[test]
    fn test_components_can_be_skipped() {
        let buffer = AudioBuffer::mono(sine(440.0, 2.0, 44100), 44100).unwrap();
        let options = AnalysisOptions {
            do_rhythm: false,
            do_harmony: false,
            ..AnalysisOptions::default()
        };
        let result = analyse(&buffer, options).unwrap();
        assert!(result.ok);
        assert!(result.rhythm.is_none());
        assert!(result.harmony.is_none());
        assert_eq!(result.status.rhythm, ComponentStatus::Skipped);
        assert!(result.mix.is_some());
        assert_eq!(result.status.psychoacoustic, ComponentStatus::Ok);
        assert_eq!(result.status.room, ComponentStatus::Skipped);
    }

    #[test]
    fn test_short_buffer_degraded() {
        let buffer = AudioBuffer::mono(sine(440.0, 0.5, 44100), 44100).unwrap();
        let result = analyse(&buffer, AnalysisOptions::default()).unwrap();
        assert!(result.ok);
        assert!(result.status.mix.flags().contains(&AnalysisFlag::ShortBuffer));
        let rhythm = result.rhythm.unwrap();
        assert!(rhythm.beat_grid.confidence <= LOW_CONFIDENCE_CAP);
        assert!(result.harmony.unwrap().confidence <= LOW_CONFIDENCE_CAP);
        assert!(!result.metadata.warnings.is_empty());
    }

    #[test]
    fn test_estimate_work_bounds_frames() {
        let buffer = AudioBuffer::mono(sine(440.0, 3.0, 44100), 44100).unwrap();
        let config = AnalysisConfig::default();
        let work = estimate_work(&buffer, &config).unwrap();
        let harmony = harmony_grid(44100, buffer.len(), &config.harmony).unwrap();
        assert!(work > harmony.n_frames);
    }

    #[test]
    fn test_band_energies_reference_matches_self() {
        let buffer = AudioBuffer::mono(sine(1000.0, 2.0, 44100), 44100).unwrap();
        let config = AnalysisConfig::default();
        let db = band_energies(&buffer, &config).unwrap();
        let options = AnalysisOptions {
            do_rhythm: false,
            do_harmony: false,
            reference: Some(Reference::BandEnergies(db)),
            ..AnalysisOptions::default()
        };
        let result = analyse(&buffer, options).unwrap();
        let comparison = result.mix.unwrap().reference.unwrap();
        assert!(comparison.differences_db.iter().all(|d| d.abs() < 1e-3));
        assert!(comparison.moves.is_empty());
    }
}
