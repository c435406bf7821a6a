//! GPU resource pooling
//!
//! Resources are grouped in pools keyed by a string id. Every pool has a fixed
//! descriptor, so all of its resources are interchangeable: `acquire` hands out
//! an idle one (or allocates a new one) and `release` returns it for reuse.

use crate::{RenderError, Result};
use liquidlight_core::ResourcePoolConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Pixel formats of pooled textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    /// Single 8-bit channel
    R8Unorm,
    /// 8-bit RGBA
    #[default]
    Rgba8Unorm,
    /// Two 16-bit float channels (velocity fields)
    Rg16Float,
    /// 16-bit float RGBA (dye fields)
    Rgba16Float,
    /// 32-bit float RGBA
    Rgba32Float,
}

impl TextureFormat {
    /// Bytes per texel
    pub fn bytes_per_pixel(self) -> u64 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgba8Unorm | TextureFormat::Rg16Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Intended use of a pooled buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Vertex data
    #[default]
    Vertex,
    /// Index data
    Index,
    /// Uniform block
    Uniform,
    /// Storage buffer (particles)
    Storage,
}

/// Shape of every resource in a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceDescriptor {
    /// 2D texture
    Texture {
        /// Width in texels
        width: u32,
        /// Height in texels
        height: u32,
        /// Texel format
        format: TextureFormat,
        /// Mip chain length (at least 1)
        mip_levels: u32,
    },
    /// Linear buffer
    Buffer {
        /// Size in bytes
        size: u64,
        /// Intended use
        usage: BufferUsage,
    },
}

impl ResourceDescriptor {
    /// Single-level texture
    pub fn texture(width: u32, height: u32, format: TextureFormat) -> Self {
        ResourceDescriptor::Texture {
            width,
            height,
            format,
            mip_levels: 1,
        }
    }

    /// Buffer of `size` bytes
    pub fn buffer(size: u64, usage: BufferUsage) -> Self {
        ResourceDescriptor::Buffer { size, usage }
    }

    /// Memory one resource occupies
    pub fn size_bytes(&self) -> u64 {
        match *self {
            ResourceDescriptor::Texture {
                width,
                height,
                format,
                mip_levels,
            } => {
                let bpp = format.bytes_per_pixel();
                let (mut w, mut h) = (width.max(1) as u64, height.max(1) as u64);
                let mut total = 0;
                for _ in 0..mip_levels.max(1) {
                    total += w * h * bpp;
                    w = (w / 2).max(1);
                    h = (h / 2).max(1);
                }
                total
            }
            ResourceDescriptor::Buffer { size, .. } => size,
        }
    }
}

/// Creates and destroys the actual resources behind a pool
pub trait ResourceAllocator: Send {
    /// Allocated resource
    type Resource: Send;

    /// Allocate one resource
    fn allocate(&mut self, label: &str, descriptor: &ResourceDescriptor) -> Result<Self::Resource>;

    /// Free one resource
    fn destroy(&mut self, resource: Self::Resource);
}

/// CPU-side stand-in for a GPU resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessResource {
    /// Debug label
    pub label: String,
    /// Descriptor it was created from
    pub descriptor: ResourceDescriptor,
    /// Backing storage
    pub data: Vec<u8>,
}

/// Allocator backed by host memory, with an optional hard limit
#[derive(Debug, Default)]
pub struct HeadlessAllocator {
    limit_bytes: Option<u64>,
    allocated_bytes: u64,
}

impl HeadlessAllocator {
    /// Unlimited allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that fails once `limit_bytes` are live
    pub fn with_limit(limit_bytes: u64) -> Self {
        Self {
            limit_bytes: Some(limit_bytes),
            allocated_bytes: 0,
        }
    }

    /// Bytes currently allocated
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }
}

impl ResourceAllocator for HeadlessAllocator {
    type Resource = HeadlessResource;

    fn allocate(
        &mut self,
        label: &str,
        descriptor: &ResourceDescriptor,
    ) -> Result<HeadlessResource> {
        let size = descriptor.size_bytes();
        if let Some(limit) = self.limit_bytes {
            if self.allocated_bytes + size > limit {
                return Err(RenderError::AllocationFailed(format!(
                    "{}: {} bytes requested, {} of {} in use",
                    label, size, self.allocated_bytes, limit
                )));
            }
        }
        let len = usize::try_from(size).map_err(|_| {
            RenderError::AllocationFailed(format!(
                "{}: {} bytes exceeds address space",
                label, size
            ))
        })?;
        self.allocated_bytes += size;
        Ok(HeadlessResource {
            label: label.to_string(),
            descriptor: *descriptor,
            data: vec![0; len],
        })
    }

    fn destroy(&mut self, resource: HeadlessResource) {
        self.allocated_bytes = self
            .allocated_bytes
            .saturating_sub(resource.descriptor.size_bytes());
    }
}

/// Opaque handle to a pooled resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// Raw id
    pub fn id(self) -> u64 {
        self.0
    }
}

struct Pool<R> {
    descriptor: ResourceDescriptor,
    resources: HashMap<ResourceHandle, R>,
    available: Vec<ResourceHandle>,
    in_use: HashSet<ResourceHandle>,
}

impl<R> Pool<R> {
    fn bytes(&self) -> u64 {
        self.descriptor.size_bytes() * self.resources.len() as u64
    }
}

/// Statistics of one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Pool id
    pub id: String,
    /// Live resources
    pub total: usize,
    /// Idle resources
    pub available: usize,
    /// Handed-out resources
    pub in_use: usize,
    /// Memory held by the pool
    pub memory_bytes: u64,
}

/// Statistics of every pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePoolStats {
    /// Per-pool statistics, sorted by id
    pub pools: Vec<PoolStats>,
    /// Memory held by all pools
    pub total_bytes: u64,
    /// Configured budget
    pub budget_bytes: u64,
    /// `total_bytes / budget_bytes`
    pub usage: f32,
}

/// Pools of interchangeable GPU resources sharing one memory budget
pub struct GpuResourcePool<A: ResourceAllocator> {
    allocator: A,
    pools: HashMap<String, Pool<A::Resource>>,
    next_handle: u64,
    budget_bytes: u64,
    cleanup_threshold: f32,
}

impl<A: ResourceAllocator> GpuResourcePool<A> {
    /// Create an empty pool set
    pub fn new(allocator: A, config: &ResourcePoolConfig) -> Self {
        Self {
            allocator,
            pools: HashMap::new(),
            next_handle: 0,
            budget_bytes: config.memory_budget_bytes.max(1),
            cleanup_threshold: config.cleanup_threshold,
        }
    }

    /// Allocator in use
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    fn allocate(
        &mut self,
        id: &str,
        descriptor: &ResourceDescriptor,
    ) -> Result<(ResourceHandle, A::Resource)> {
        let handle = ResourceHandle(self.next_handle);
        let label = format!("{}#{}", id, handle.0);
        let resource = self.allocator.allocate(&label, descriptor)?;
        self.next_handle += 1;
        Ok((handle, resource))
    }

    /// Create a pool and eagerly allocate `initial_count` resources
    pub fn create_pool(
        &mut self,
        id: &str,
        descriptor: ResourceDescriptor,
        initial_count: usize,
    ) -> Result<()> {
        if self.pools.contains_key(id) {
            return Err(RenderError::DuplicatePool(id.to_string()));
        }

        let mut pool = Pool {
            descriptor,
            resources: HashMap::with_capacity(initial_count),
            available: Vec::with_capacity(initial_count),
            in_use: HashSet::new(),
        };
        for _ in 0..initial_count {
            match self.allocate(id, &descriptor) {
                Ok((handle, resource)) => {
                    pool.resources.insert(handle, resource);
                    pool.available.push(handle);
                }
                Err(e) => {
                    for (_, resource) in pool.resources.drain() {
                        self.allocator.destroy(resource);
                    }
                    return Err(e);
                }
            }
        }

        debug!(
            "Created pool '{}' with {} resources ({} bytes each)",
            id,
            initial_count,
            descriptor.size_bytes()
        );
        self.pools.insert(id.to_string(), pool);
        Ok(())
    }

    /// Hand out an idle resource, allocating one when none is idle
    pub fn acquire(&mut self, id: &str) -> Result<ResourceHandle> {
        let pool = self
            .pools
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownPool(id.to_string()))?;

        if let Some(handle) = pool.available.pop() {
            pool.in_use.insert(handle);
            return Ok(handle);
        }

        let descriptor = pool.descriptor;
        let (handle, resource) = self.allocate(id, &descriptor)?;
        let pool = self
            .pools
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownPool(id.to_string()))?;
        pool.resources.insert(handle, resource);
        pool.in_use.insert(handle);
        debug!("Pool '{}' grew to {} resources", id, pool.resources.len());
        Ok(handle)
    }

    /// Return a resource to its pool.
    ///
    /// Returns `false` (and changes nothing) if the handle is not in use.
    pub fn release(&mut self, id: &str, handle: ResourceHandle) -> Result<bool> {
        let pool = self
            .pools
            .get_mut(id)
            .ok_or_else(|| RenderError::UnknownPool(id.to_string()))?;
        if pool.in_use.remove(&handle) {
            pool.available.push(handle);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Descriptor a pool was created with
    pub fn descriptor(&self, id: &str) -> Option<ResourceDescriptor> {
        self.pools.get(id).map(|pool| pool.descriptor)
    }

    /// Resource behind a handle
    pub fn get(&self, id: &str, handle: ResourceHandle) -> Option<&A::Resource> {
        self.pools.get(id)?.resources.get(&handle)
    }

    /// Mutable resource behind a handle
    pub fn get_mut(&mut self, id: &str, handle: ResourceHandle) -> Option<&mut A::Resource> {
        self.pools.get_mut(id)?.resources.get_mut(&handle)
    }

    /// Whether a handle is currently handed out
    pub fn is_in_use(&self, id: &str, handle: ResourceHandle) -> bool {
        self.pools
            .get(id)
            .map_or(false, |pool| pool.in_use.contains(&handle))
    }

    /// Idle handles of a pool
    pub fn available_handles(&self, id: &str) -> Vec<ResourceHandle> {
        self.pools
            .get(id)
            .map(|pool| pool.available.clone())
            .unwrap_or_default()
    }

    /// Handed-out handles of a pool, sorted
    pub fn in_use_handles(&self, id: &str) -> Vec<ResourceHandle> {
        let mut handles: Vec<_> = self
            .pools
            .get(id)
            .map(|pool| pool.in_use.iter().copied().collect())
            .unwrap_or_default();
        handles.sort();
        handles
    }

    /// Destroy a pool and every resource in it. Returns how many were freed.
    pub fn destroy_pool(&mut self, id: &str) -> Result<usize> {
        let mut pool = self
            .pools
            .remove(id)
            .ok_or_else(|| RenderError::UnknownPool(id.to_string()))?;
        if !pool.in_use.is_empty() {
            warn!(
                "Destroying pool '{}' with {} resources still in use",
                id,
                pool.in_use.len()
            );
        }
        let count = pool.resources.len();
        for (_, resource) in pool.resources.drain() {
            self.allocator.destroy(resource);
        }
        debug!("Destroyed pool '{}' ({} resources)", id, count);
        Ok(count)
    }

    /// Memory held by all pools
    pub fn total_bytes(&self) -> u64 {
        self.pools.values().map(Pool::bytes).sum()
    }

    /// Held memory as a fraction of the budget
    pub fn memory_usage(&self) -> f32 {
        (self.total_bytes() as f64 / self.budget_bytes as f64) as f32
    }

    /// Destroy every idle resource in every pool. In-use ones are kept.
    pub fn cleanup_idle(&mut self) -> usize {
        let mut destroyed = 0;
        for pool in self.pools.values_mut() {
            for handle in pool.available.drain(..) {
                if let Some(resource) = pool.resources.remove(&handle) {
                    self.allocator.destroy(resource);
                    destroyed += 1;
                }
            }
        }
        destroyed
    }

    /// Sweep idle resources when usage is above the cleanup threshold.
    /// Returns how many were destroyed.
    pub fn check_memory(&mut self) -> usize {
        let usage = self.memory_usage();
        if usage <= self.cleanup_threshold {
            return 0;
        }
        let destroyed = self.cleanup_idle();
        info!(
            "Memory usage {:.0}% above {:.0}%: destroyed {} idle resources, now {:.0}%",
            usage * 100.0,
            self.cleanup_threshold * 100.0,
            destroyed,
            self.memory_usage() * 100.0
        );
        destroyed
    }

    /// Statistics of one pool
    pub fn pool_stats(&self, id: &str) -> Option<PoolStats> {
        self.pools.get(id).map(|pool| PoolStats {
            id: id.to_string(),
            total: pool.resources.len(),
            available: pool.available.len(),
            in_use: pool.in_use.len(),
            memory_bytes: pool.bytes(),
        })
    }

    /// Statistics of every pool
    pub fn stats(&self) -> ResourcePoolStats {
        let mut pools: Vec<PoolStats> = self
            .pools
            .keys()
            .filter_map(|id| self.pool_stats(id))
            .collect();
        pools.sort_by(|a, b| a.id.cmp(&b.id));
        ResourcePoolStats {
            pools,
            total_bytes: self.total_bytes(),
            budget_bytes: self.budget_bytes,
            usage: self.memory_usage(),
        }
    }
}

impl<A: ResourceAllocator> Drop for GpuResourcePool<A> {
    fn drop(&mut self) {
        for (_, mut pool) in self.pools.drain() {
            for (_, resource) in pool.resources.drain() {
                self.allocator.destroy(resource);
            }
        }
    }
}
