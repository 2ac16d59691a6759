//! Performance benchmarks for audio analysis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stratum_studio::config::HarmonyConfig;
use stratum_studio::features::room::{analyse_room, Dimensions, Material, Room};
use stratum_studio::{analyse, AnalysisOptions, AudioBuffer, LiveChordMeter};

fn synth(seconds: usize) -> Vec<f32> {
    // A-minor triad with a click every half second
    (0..44100 * seconds)
        .map(|i| {
            let t = i as f32 / 44100.0;
            let tone: f32 = [220.0f32, 261.63, 329.63]
                .iter()
                .map(|f| 0.1 * (2.0 * std::f32::consts::PI * f * t).sin())
                .sum();
            let click = if i % 22050 < 64 { 0.5 } else { 0.0 };
            tone + click
        })
        .collect()
}

fn bench_analyse(c: &mut Criterion) {
    let buffer = AudioBuffer::mono(synth(30), 44100).unwrap();

    c.bench_function("analyse_30s", |b| {
        b.iter(|| {
            let _ = analyse(black_box(&buffer), AnalysisOptions::default());
        });
    });

    c.bench_function("analyse_30s_rhythm_only", |b| {
        b.iter(|| {
            let options = AnalysisOptions {
                do_harmony: false,
                do_mix: false,
                ..AnalysisOptions::default()
            };
            let _ = analyse(black_box(&buffer), options);
        });
    });
}

fn bench_live_meter(c: &mut Criterion) {
    let mut meter = LiveChordMeter::new(44100, &HarmonyConfig::default()).unwrap();
    let samples = synth(1);
    let frame = samples[..meter.window_size()].to_vec();

    c.bench_function("live_chord_frame", |b| {
        b.iter(|| {
            let _ = meter.push_samples(black_box(&frame));
        });
    });
}

fn bench_room(c: &mut Criterion) {
    let room = Room {
        dimensions: Dimensions {
            length: 5.0,
            width: 4.0,
            height: 2.8,
        },
        floor: Material::CarpetThin,
        ceiling: Material::Plasterboard,
        walls: Material::Plasterboard,
    };
    let config = Default::default();

    c.bench_function("analyse_room", |b| {
        b.iter(|| {
            let _ = analyse_room(black_box(&room), &config);
        });
    });
}

criterion_group!(benches, bench_analyse, bench_live_meter, bench_room);
criterion_main!(benches);
