use liquidlight_core::audio::physics::{
    COLOR_PHASE, CURL_STRENGTH, INTENSITY, SPLAT_FORCE, THERMAL_RATE, VISCOSITY,
};
use liquidlight_core::{
    AudioBands, AudioFrame, AudioReactiveConfig, AudioReactivePipeline, BeatDetector,
    BeatDetectorConfig, BeatGate, EnergySample, PhysicsMapper, PhysicsParameterSet,
};
use proptest::prelude::*;

/// 120 BPM kick pattern sampled at 60 fps
fn kick_frame(now: f64) -> AudioFrame {
    let phase = now % 500.0;
    let bass = if phase < 34.0 { 0.95 } else { 0.15 };
    AudioFrame::from_bands(AudioBands::new(bass, 0.4, 0.3, 0.6))
}

fn in_range(params: &PhysicsParameterSet) -> bool {
    let pairs = [
        (params.splat_force, SPLAT_FORCE),
        (params.thermal_rate, THERMAL_RATE),
        (params.color_phase, COLOR_PHASE),
        (params.intensity, INTENSITY),
        (params.curl_strength, CURL_STRENGTH),
        (params.viscosity, VISCOSITY),
    ];
    pairs
        .iter()
        .all(|(v, r)| v.is_finite() && *v >= r.min && *v <= r.max + 1e-4)
}

#[test]
fn test_warmup_then_spike() {
    let mut detector = BeatDetector::default();
    for i in 0..10 {
        let event = detector.detect(EnergySample::new(10.0, i as f64 * 16.0));
        assert!(!event.is_beat);
    }
    let event = detector.detect(EnergySample::new(40.0, 176.0));
    assert!(event.is_beat);
    assert!(event.confidence >= 0.5);
}

#[test]
fn test_pipeline_locks_onto_tempo() {
    let mut pipeline = AudioReactivePipeline::new(AudioReactiveConfig {
        beat: BeatDetectorConfig::dance_floor(),
        ..Default::default()
    });

    let mut beats = 0;
    let mut now = 0.0;
    while now < 10_000.0 {
        let out = pipeline.process(Some(&kick_frame(now)), now);
        if out.beat.map_or(false, |b| b.is_beat) {
            beats += 1;
        }
        assert!(in_range(&out.params));
        now += 1000.0 / 60.0;
    }

    assert!(beats >= 8, "only {} beats detected", beats);
    let bpm = pipeline.detector().bpm();
    assert!((bpm - 120.0).abs() <= 10.0, "bpm {}", bpm);
}

#[test]
fn test_audio_loss_returns_to_base() {
    let mut pipeline = AudioReactivePipeline::default();
    for i in 0..60 {
        let now = i as f64 * 16.0;
        pipeline.process(Some(&kick_frame(now)), now);
    }
    let out = pipeline.process(None, 1000.0);
    assert_eq!(out.params, PhysicsParameterSet::base());
    assert!(out.beat.is_none());
}

proptest! {
    #[test]
    fn prop_mapper_output_in_range(
        bass in any::<f32>(),
        mids in any::<f32>(),
        treble in any::<f32>(),
        volume in any::<f32>(),
        burst in any::<f32>(),
    ) {
        let params = PhysicsMapper::default()
            .calculate_physics_params(Some(&AudioBands::new(bass, mids, treble, volume)), burst);
        prop_assert!(in_range(&params), "{:?}", params);
    }

    #[test]
    fn prop_bpm_within_configured_range(
        energies in proptest::collection::vec(0.0f32..100.0, 20..400),
        step in 5.0f64..60.0,
    ) {
        let mut detector = BeatDetector::default();
        let config = *detector.config();
        for (i, e) in energies.iter().enumerate() {
            let event = detector.detect(EnergySample::new(*e, i as f64 * step));
            let bpm = event.bpm_estimate;
            prop_assert!(bpm == 0.0 || (config.bpm_min..=config.bpm_max).contains(&bpm));
        }
    }

    #[test]
    fn prop_beats_respect_refractory_period(
        energies in proptest::collection::vec(0.0f32..100.0, 20..400),
        step in 5.0f64..60.0,
    ) {
        let mut detector = BeatDetector::default();
        let refractory = detector.config().refractory_period_ms;
        let mut last_beat: Option<f64> = None;
        for (i, e) in energies.iter().enumerate() {
            let now = i as f64 * step;
            if detector.detect(EnergySample::new(*e, now)).is_beat {
                if let Some(last) = last_beat {
                    prop_assert!(now - last >= refractory);
                }
                last_beat = Some(now);
            }
        }
    }

    #[test]
    fn prop_gate_decays_monotonically(deltas in proptest::collection::vec(0.0f32..50.0, 1..100)) {
        let mut gate = BeatGate::default();
        let mut previous = gate.update(true, 0.0);
        for delta in deltas {
            let value = gate.update(false, delta);
            prop_assert!(value <= previous);
            prop_assert!(value >= 1.0);
            previous = value;
        }
    }
}
