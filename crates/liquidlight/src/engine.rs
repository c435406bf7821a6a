//! Engine lifecycle: wires the audio chain, performance control and the
//! resource pools together for one session.

use anyhow::{Context, Result};
use liquidlight_core::{
    AudioFrame, AudioReactivePipeline, BatteryStatus, BeatEvent, ControlDecision,
    DeviceCapabilities, DeviceProfile, EngineConfig, FrameMetrics, PerformanceController,
    PerformanceProfile, PhysicsParameterSet, QualitySettings, ThermalStatus, Tier,
};
use liquidlight_render::{
    BufferUsage, GpuResourcePool, HeadlessAllocator, PoolMonitor, ResourceAllocator,
    ResourceDescriptor, ResourceHandle, ResourcePoolStats, SharedResourcePool, TextureFormat,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DYE_POOL: &str = "dye";
const VELOCITY_POOL: &str = "velocity";
const PARTICLE_POOL: &str = "particles";

/// Simulation field size at resolution scale 1.0
const FIELD_WIDTH: f32 = 256.0;
const FIELD_HEIGHT: f32 = 144.0;
/// Bytes per particle (position, velocity, color, age)
const PARTICLE_STRIDE: u64 = 32;
/// Ping-pong pairs per field
const FIELD_BUFFERS: usize = 2;
/// Resources one frame borrows
const FRAME_RESOURCES: [&str; 5] = [
    DYE_POOL,
    DYE_POOL,
    VELOCITY_POOL,
    VELOCITY_POOL,
    PARTICLE_POOL,
];

/// Everything one frame produced
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Parameters for the fluid simulation
    pub params: PhysicsParameterSet,
    /// Detector output, `None` without audio
    pub beat: Option<BeatEvent>,
    /// Quality/tier changes and alerts
    pub decision: ControlDecision,
    /// Result of the interval thermal check, when one ran
    pub thermal: Option<ThermalStatus>,
}

/// Session summary returned by [`Engine::destroy`]
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Frames processed
    pub frames: u64,
    /// Profiler summary of the last frames
    pub profile: Option<PerformanceProfile>,
    /// Retained alerts as JSON
    pub alerts_json: String,
    /// Tier at shutdown
    pub final_tier: Tier,
    /// Settings at shutdown
    pub final_settings: QualitySettings,
    /// Pool state at shutdown
    pub pools: ResourcePoolStats,
    /// Resources destroyed by the memory monitor
    pub swept_resources: usize,
}

/// One running LiquidLight session
pub struct Engine {
    audio: AudioReactivePipeline,
    performance: PerformanceController,
    resources: SharedResourcePool<HeadlessAllocator>,
    monitor: PoolMonitor,
    frames: u64,
}

impl Engine {
    /// Classify the device, build every component and start monitoring
    pub fn create(config: &EngineConfig, battery: Option<BatteryStatus>, now: f64) -> Result<Self> {
        config.validate().context("Invalid engine configuration")?;

        let capabilities = DeviceCapabilities::detect().with_overrides(&config.device);
        let profile = DeviceProfile::classify(&capabilities);

        let mut performance = PerformanceController::new(profile, config.performance);
        performance.set_battery_status(battery);
        performance.start(now);

        let resources = Arc::new(Mutex::new(GpuResourcePool::new(
            HeadlessAllocator::new(),
            &config.resource_pool,
        )));
        build_pools(&mut resources.lock(), &performance.quality_settings())
            .context("Failed to allocate initial GPU resources")?;

        let monitor = PoolMonitor::start(
            resources.clone(),
            Duration::from_millis(config.resource_pool.monitor_interval_ms),
        )
        .context("Failed to start the resource monitor")?;

        info!(
            "Engine created: tier={} max={} battery={:?}",
            profile.recommended_tier, profile.max_tier, battery
        );

        Ok(Self {
            audio: AudioReactivePipeline::new(config.audio),
            performance,
            resources,
            monitor,
            frames: 0,
        })
    }

    /// Current quality settings
    pub fn quality_settings(&self) -> QualitySettings {
        self.performance.quality_settings()
    }

    /// Current tier
    pub fn tier(&self) -> Tier {
        self.performance.tier()
    }

    /// Pool statistics
    pub fn pool_stats(&self) -> ResourcePoolStats {
        self.resources.lock().stats()
    }

    /// Run one frame: audio, a simulated render pass, then performance control
    pub fn frame(
        &mut self,
        audio: Option<&AudioFrame>,
        metrics: FrameMetrics,
        now: f64,
    ) -> Result<FrameReport> {
        let output = self.audio.process(audio, now);

        let memory_usage = render_pass(&mut self.resources.lock())?;
        let decision = self.performance.on_frame(
            FrameMetrics {
                memory_usage,
                ..metrics
            },
            now,
        );

        if let Some(settings) = decision.quality {
            build_pools(&mut self.resources.lock(), &settings)
                .context("Failed to resize GPU resources")?;
        }

        let thermal = self.performance.on_interval(now);
        if let Some(status) = thermal.as_ref().filter(|s| s.is_throttled) {
            for advice in &status.recommendations {
                debug!("Thermal recommendation: {}", advice);
            }
        }

        self.frames += 1;
        Ok(FrameReport {
            params: output.params,
            beat: output.beat,
            decision,
            thermal,
        })
    }

    /// Stop monitoring, release every pool and summarize the session
    pub fn destroy(mut self) -> Result<SessionSummary> {
        self.monitor.stop();
        self.performance.stop();

        let profiler = self.performance.profiler();
        let summary = SessionSummary {
            frames: self.frames,
            profile: profiler.get_performance_profile(),
            alerts_json: profiler
                .export_alerts_json()
                .context("Failed to export alerts")?,
            final_tier: self.performance.tier(),
            final_settings: self.performance.quality_settings(),
            pools: self.resources.lock().stats(),
            swept_resources: self.monitor.destroyed(),
        };

        let mut pool = self.resources.lock();
        for id in [DYE_POOL, VELOCITY_POOL, PARTICLE_POOL] {
            if let Err(e) = pool.destroy_pool(id) {
                warn!("Failed to destroy pool '{}': {}", id, e);
            }
        }

        info!("Engine destroyed after {} frames", summary.frames);
        Ok(summary)
    }
}

/// Borrow the per-frame resources and return them; reports memory usage
fn render_pass<A: ResourceAllocator>(pool: &mut GpuResourcePool<A>) -> Result<f32> {
    let mut held: Vec<(&str, ResourceHandle)> = Vec::with_capacity(FRAME_RESOURCES.len());
    let mut failure = None;
    for id in FRAME_RESOURCES {
        match pool.acquire(id) {
            Ok(handle) => held.push((id, handle)),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    let usage = pool.memory_usage();

    // Everything taken goes back, also when the pass stopped halfway
    for (id, handle) in held {
        if let Err(e) = pool.release(id, handle) {
            warn!("Failed to release {:?} to pool '{}': {}", handle, id, e);
        }
    }
    if let Some(e) = failure {
        return Err(e).context("Failed to acquire frame resources");
    }
    Ok(usage)
}

fn field_descriptor(settings: &QualitySettings, format: TextureFormat) -> ResourceDescriptor {
    let width = (FIELD_WIDTH * settings.resolution).round().max(1.0) as u32;
    let height = (FIELD_HEIGHT * settings.resolution).round().max(1.0) as u32;
    ResourceDescriptor::texture(width, height, format)
}

/// (Re)create the pools so their descriptors match `settings`
fn build_pools(
    pool: &mut GpuResourcePool<HeadlessAllocator>,
    settings: &QualitySettings,
) -> liquidlight_render::Result<()> {
    let wanted = [
        (DYE_POOL, field_descriptor(settings, TextureFormat::Rgba16Float), FIELD_BUFFERS),
        (VELOCITY_POOL, field_descriptor(settings, TextureFormat::Rg16Float), FIELD_BUFFERS),
        (
            PARTICLE_POOL,
            ResourceDescriptor::buffer(
                settings.particle_count as u64 * PARTICLE_STRIDE,
                BufferUsage::Storage,
            ),
            1,
        ),
    ];

    for (id, descriptor, count) in wanted {
        if pool.descriptor(id) == Some(descriptor) {
            continue;
        }
        if pool.descriptor(id).is_some() {
            pool.destroy_pool(id)?;
        }
        pool.create_pool(id, descriptor, count)?;
        debug!("Pool '{}' sized for {:?}", id, descriptor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{SyntheticAudio, SyntheticRenderer};
    use liquidlight_core::{AlertKind, LogConfig, ProfilerConfig};

    fn test_config() -> EngineConfig {
        EngineConfig {
            logging: LogConfig {
                file_output: false,
                ..Default::default()
            },
            device: DeviceCapabilities {
                device_memory_gb: Some(8.0),
                cpu_cores: Some(8),
                max_texture_size: Some(4096),
                is_mobile: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_session() {
        let mut engine = Engine::create(&test_config(), None, 0.0).unwrap();
        assert_eq!(engine.tier(), Tier::High);
        let audio = SyntheticAudio::new(120.0, None);

        let mut now = 0.0;
        for _ in 0..300 {
            now += 16.0;
            let metrics = FrameMetrics {
                fps: Some(55.0),
                frame_time: Some(18.0),
                ..Default::default()
            };
            let report = engine.frame(audio.frame(now).as_ref(), metrics, now).unwrap();
            assert!(report.beat.is_some());
            assert!(report.decision.tier.is_none());
        }

        let summary = engine.destroy().unwrap();
        assert_eq!(summary.frames, 300);
        assert_eq!(summary.final_tier, Tier::High);
        assert!(summary.profile.is_some());
        assert_eq!(summary.pools.pools.len(), 3);
    }

    #[test]
    fn test_overheating_session_degrades() {
        let mut engine = Engine::create(&test_config(), None, 0.0).unwrap();
        let initial = engine.quality_settings();
        let particle_bytes = |engine: &Engine| {
            engine
                .pool_stats()
                .pools
                .iter()
                .find(|p| p.id == PARTICLE_POOL)
                .map(|p| p.memory_bytes)
                .unwrap_or_default()
        };
        let initial_bytes = particle_bytes(&engine);

        let audio = SyntheticAudio::new(120.0, Some((5_000.0, 6_000.0)));
        let renderer = SyntheticRenderer::new(2_000.0, 4_000.0);
        let mut now = 0.0;
        let mut saw_missing_audio = false;
        let mut alert_kinds = Vec::new();
        while now < 20_000.0 {
            let settings = engine.quality_settings();
            let metrics = renderer.metrics(&settings, now);
            now += metrics.frame_time.unwrap_or(16.0) as f64;
            let frame = audio.frame(now);
            let report = engine.frame(frame.as_ref(), metrics, now).unwrap();
            alert_kinds.extend(report.decision.alerts.iter().map(|a| a.kind));
            if frame.is_none() {
                saw_missing_audio = true;
                assert_eq!(report.params, PhysicsParameterSet::base());
            }
        }

        assert!(saw_missing_audio);
        let settings = engine.quality_settings();
        assert!(settings.particle_count < initial.particle_count);
        assert!(particle_bytes(&engine) < initial_bytes);
        assert!(engine.tier() < Tier::High);

        assert!(alert_kinds.contains(&AlertKind::FpsLow));
        assert!(alert_kinds.contains(&AlertKind::GpuOverload));

        // the retained log is bounded, so early alerts may be gone by now
        let summary = engine.destroy().unwrap();
        let exported: Vec<serde_json::Value> = serde_json::from_str(&summary.alerts_json).unwrap();
        assert!(!exported.is_empty());
        assert!(exported.len() <= ProfilerConfig::default().max_alerts);
    }

    #[test]
    fn test_failed_render_pass_returns_borrowed_resources() {
        let mut pool = GpuResourcePool::new(HeadlessAllocator::new(), &Default::default());
        let settings = QualitySettings::recommended(Tier::Low);
        pool.create_pool(DYE_POOL, field_descriptor(&settings, TextureFormat::Rgba16Float), 2)
            .unwrap();
        pool.create_pool(VELOCITY_POOL, field_descriptor(&settings, TextureFormat::Rg16Float), 2)
            .unwrap();

        // no particle pool, so the last acquire fails
        assert!(render_pass(&mut pool).is_err());
        assert!(pool.in_use_handles(DYE_POOL).is_empty());
        assert!(pool.in_use_handles(VELOCITY_POOL).is_empty());
        assert_eq!(pool.available_handles(DYE_POOL).len(), 2);

        pool.create_pool(PARTICLE_POOL, ResourceDescriptor::buffer(64, BufferUsage::Storage), 1)
            .unwrap();
        assert!(render_pass(&mut pool).is_ok());
        assert!(pool.in_use_handles(PARTICLE_POOL).is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = test_config();
        config.audio.smoothing_alpha = 3.0;
        assert!(Engine::create(&config, None, 0.0).is_err());
    }
}
