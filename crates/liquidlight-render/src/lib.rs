//! LiquidLight Render - GPU resource management
//!
//! This crate provides the resource side of the renderer:
//! - Pools of interchangeable textures and buffers
//! - A pluggable allocator (a headless, host-memory one ships here)
//! - A background memory monitor that sweeps idle resources

#![warn(missing_docs)]

use thiserror::Error;

pub mod monitor;
pub mod pool;

pub use monitor::{PoolMonitor, SharedResourcePool};
pub use pool::{
    BufferUsage, GpuResourcePool, HeadlessAllocator, HeadlessResource, PoolStats,
    ResourceAllocator, ResourceDescriptor, ResourceHandle, ResourcePoolStats, TextureFormat,
};

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// No pool with this id exists
    #[error("Unknown resource pool: {0}")]
    UnknownPool(String),

    /// A pool with this id already exists
    #[error("Resource pool already exists: {0}")]
    DuplicatePool(String),

    /// The allocator could not provide a resource
    #[error("Resource allocation failed: {0}")]
    AllocationFailed(String),

    /// Background thread could not be started
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
