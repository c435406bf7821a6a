use criterion::{criterion_group, criterion_main, Criterion};
use liquidlight_core::{
    AudioBands, AudioFrame, AudioReactivePipeline, BeatDetector, EnergySample, PhysicsMapper,
};
use std::hint::black_box;

fn synthetic_frames(count: usize) -> Vec<AudioFrame> {
    (0..count)
        .map(|i| {
            let kick = if i % 30 < 2 { 0.9 } else { 0.2 };
            let wobble = (i as f32 * 0.07).sin() * 0.5 + 0.5;
            AudioFrame::from_bands(AudioBands::new(kick, wobble, 1.0 - wobble, 0.6))
        })
        .collect()
}

fn audio_pipeline_benchmark(c: &mut Criterion) {
    let frames = synthetic_frames(600);

    let mut group = c.benchmark_group("AudioReactivePipeline");
    group.bench_function("process_600_frames", |b| {
        b.iter(|| {
            let mut pipeline = AudioReactivePipeline::default();
            for (i, frame) in frames.iter().enumerate() {
                black_box(pipeline.process(Some(black_box(frame)), i as f64 * 16.67));
            }
        })
    });
    group.finish();

    let mut group = c.benchmark_group("Components");
    group.bench_function("beat_detector_detect", |b| {
        let mut detector = BeatDetector::default();
        let mut now = 0.0;
        b.iter(|| {
            now += 16.67;
            black_box(detector.detect(EnergySample::new(black_box(42.0), now)))
        })
    });
    group.bench_function("physics_mapper", |b| {
        let mapper = PhysicsMapper::default();
        let bands = AudioBands::new(0.7, 0.4, 0.3, 0.8);
        b.iter(|| black_box(mapper.calculate_physics_params(Some(black_box(&bands)), 1.3)))
    });
    group.finish();
}

criterion_group!(benches, audio_pipeline_benchmark);
criterion_main!(benches);
