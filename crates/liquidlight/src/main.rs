//! LiquidLight - audio-reactive fluid visuals
//!
//! Headless host: drives the engine with a synthetic 120 BPM source and a
//! renderer that overheats, and logs every adaptation the engine makes.

#![warn(missing_docs)]

mod battery;
mod engine;
mod logging_setup;
mod simulation;

use anyhow::{Context, Result};
use engine::Engine;
use liquidlight_core::EngineConfig;
use simulation::{SyntheticAudio, SyntheticRenderer};
use std::path::PathBuf;
use tracing::{debug, info, warn};

const DEFAULT_DURATION_SECS: f64 = 30.0;
const SOURCE_BPM: f64 = 120.0;

/// Command line: `liquidlight [seconds] [config.json]`
struct Args {
    duration_ms: f64,
    config_path: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = std::env::args().skip(1);
        let duration_secs = match args.next() {
            Some(raw) => raw
                .parse::<f64>()
                .with_context(|| format!("Invalid duration: {}", raw))?,
            None => DEFAULT_DURATION_SECS,
        };
        Ok(Self {
            duration_ms: duration_secs.max(0.0) * 1000.0,
            config_path: args.next().map(PathBuf::from),
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse()?;
    let config = EngineConfig::load_or_default(args.config_path.as_deref());

    let _log_guard = logging_setup::init(&config.logging)?;

    info!("==========================================");
    info!("===    LiquidLight Session Started     ===");
    info!("==========================================");

    let mut engine = Engine::create(&config, battery::query(), 0.0)?;
    info!(
        "Starting at tier {} with {} bytes of GPU resources",
        engine.tier(),
        engine.pool_stats().total_bytes
    );

    // Dropout a third of the way in, heat from the halfway point
    let duration = args.duration_ms;
    let audio = SyntheticAudio::new(SOURCE_BPM, Some((duration / 3.0, duration / 3.0 + 1500.0)));
    let renderer = SyntheticRenderer::new(duration / 2.0, duration / 4.0);

    info!("--- Entering Simulation Loop ---");
    let mut now = 0.0;
    let mut beats = 0usize;
    while now < duration {
        let settings = engine.quality_settings();
        let metrics = renderer.metrics(&settings, now);
        now += metrics.frame_time.unwrap_or(16.0) as f64;

        let report = engine.frame(audio.frame(now).as_ref(), metrics, now)?;

        if let Some(beat) = report.beat.filter(|b| b.is_beat) {
            beats += 1;
            debug!(
                "Beat at {:.0}ms: bpm={:.1} confidence={:.2} splat={:.1}",
                now, beat.bpm_estimate, beat.confidence, report.params.splat_force
            );
        }
        if let Some(tier) = report.decision.tier {
            warn!("Tier changed to {} at {:.0}ms", tier, now);
        }
        if let Some(settings) = report.decision.quality {
            info!(
                "Quality now: resolution={:.2} particles={} complexity={:.2}",
                settings.resolution, settings.particle_count, settings.effect_complexity
            );
        }
        if let Some(thermal) = report.thermal.filter(|t| t.is_throttled) {
            warn!(
                "Thermal throttling ({:?}): {}",
                thermal.throttling_level,
                thermal.recommendations.join(", ")
            );
        }
    }

    let summary = engine.destroy()?;

    info!("==========================================");
    info!(
        "Frames: {} Beats: {} Final tier: {} ({} particles)",
        summary.frames, beats, summary.final_tier, summary.final_settings.particle_count
    );
    if let Some(profile) = &summary.profile {
        info!(
            "FPS min/avg/max: {:.1}/{:.1}/{:.1}",
            profile.fps.min, profile.fps.avg, profile.fps.max
        );
    }
    info!(
        "GPU memory at exit: {} bytes in {} pools ({} swept)",
        summary.pools.total_bytes,
        summary.pools.pools.len(),
        summary.swept_resources
    );
    debug!("Alerts: {}", summary.alerts_json);
    info!("===      LiquidLight Session Ended      ===");

    Ok(())
}
