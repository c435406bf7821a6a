//! Audio conditioning and beat tracking
//!
//! Raw band energies flow through [`EnergySmoother`] and the [`curves`]
//! into the [`BeatDetector`] and [`BeatGate`]; [`PhysicsMapper`] turns the
//! result into a bounded [`PhysicsParameterSet`]. [`AudioReactivePipeline`]
//! runs that chain once per frame.

pub mod beat_detector;
pub mod beat_gate;
pub mod curves;
pub mod physics;
pub mod pipeline;
pub mod smoother;

pub use beat_detector::{BeatDetector, BeatDetectorConfig, BeatEvent, EnergySample};
pub use beat_gate::{BeatGate, BeatGateConfig};
pub use curves::CurveConfig;
pub use physics::{ParameterRange, PhysicsMapper, PhysicsParameterSet};
pub use pipeline::{
    AudioBands, AudioFrame, AudioFrameOutput, AudioReactiveConfig, AudioReactivePipeline,
};
pub use smoother::EnergySmoother;
