//! Per-visual vertex buffers for generated geometry.
//!
//! Tiled maps and particle emitters generate their vertices once and keep
//! them in a dynamic buffer keyed by [`VisualId`]. An entry also remembers
//! which component it was generated from: if that component is replaced the
//! entry no longer matches and is rebuilt. Entries must be evicted when their
//! visual is destroyed or their source component detaches, otherwise the
//! buffer leaks.

use std::collections::HashMap;

use lucent_visual::component::ComponentId;
use lucent_visual::handle::VisualId;

use crate::backend::{BufferDesc, BufferHandle, BufferUsage, GpuBackend};
use crate::RenderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryEntry {
    pub buffer: BufferHandle,
    pub vertex_count: u32,
    pub stride: u32,
    /// Component the vertices were generated from.
    pub source: ComponentId,
    /// Game time at creation, in seconds.
    pub created_at: f64,
}

#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: HashMap<VisualId, GeometryEntry>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `id` if it was generated from `source`.
    pub fn get(&self, id: VisualId, source: ComponentId) -> Option<&GeometryEntry> {
        self.entries.get(&id).filter(|e| e.source == source)
    }

    /// The entry for `id`, whatever its source.
    pub fn entry(&self, id: VisualId) -> Option<&GeometryEntry> {
        self.entries.get(&id)
    }

    /// Return the matching entry, generating and uploading `vertices` first
    /// when there is none. A stale entry for the same visual is released.
    pub fn get_or_upload<B, V, F>(
        &mut self,
        backend: &mut B,
        id: VisualId,
        source: ComponentId,
        created_at: f64,
        generate: F,
    ) -> Result<GeometryEntry, RenderError>
    where
        B: GpuBackend,
        V: bytemuck::Pod,
        F: FnOnce() -> Vec<V>,
    {
        if let Some(entry) = self.get(id, source) {
            return Ok(*entry);
        }
        if let Some(stale) = self.entries.remove(&id) {
            tracing::warn!(visual = %id, stale = %stale.source, current = %source, "source component changed, regenerating geometry");
            backend.release_buffer(stale.buffer);
        }

        let vertices = generate();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        if bytes.is_empty() {
            return Err(RenderError::Backend(crate::BackendError::ResourceCreation {
                resource: "vertex buffer".to_owned(),
                details: format!("visual {id} generated no vertices"),
            }));
        }
        let buffer = backend.create_buffer(&BufferDesc::vertex(bytes.len(), BufferUsage::Dynamic), None)?;
        if let Err(e) = backend.write_buffer(buffer, bytes) {
            backend.release_buffer(buffer);
            return Err(e.into());
        }

        let entry = GeometryEntry {
            buffer,
            vertex_count: vertices.len() as u32,
            stride: std::mem::size_of::<V>() as u32,
            source,
            created_at,
        };
        self.entries.insert(id, entry);
        tracing::debug!(visual = %id, vertices = entry.vertex_count, "geometry cached");
        Ok(entry)
    }

    /// Drop the entry for `id` and release its buffer.
    pub fn evict<B: GpuBackend>(&mut self, backend: &mut B, id: VisualId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                backend.release_buffer(entry.buffer);
                tracing::trace!(visual = %id, "geometry evicted");
                true
            }
            None => false,
        }
    }

    /// Evict every entry for which `keep(visual, source)` is false.
    /// Returns how many were evicted.
    pub fn retain<B, F>(&mut self, backend: &mut B, mut keep: F) -> usize
    where
        B: GpuBackend,
        F: FnMut(VisualId, ComponentId) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            if keep(*id, entry.source) {
                return true;
            }
            backend.release_buffer(entry.buffer);
            tracing::trace!(visual = %id, source = %entry.source, "geometry source detached");
            false
        });
        before - self.entries.len()
    }

    pub fn release_all<B: GpuBackend>(&mut self, backend: &mut B) {
        for (_, entry) in self.entries.drain() {
            backend.release_buffer(entry.buffer);
        }
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{FailurePoint, RecordingBackend};

    fn id(index: u32) -> VisualId {
        VisualId::new(index, 0)
    }

    #[test]
    fn generates_once_per_visual() {
        let mut gpu = RecordingBackend::new();
        let mut cache = GeometryCache::new();
        let source = ComponentId::new(1);
        let mut calls = 0;

        for _ in 0..3 {
            let entry = cache
                .get_or_upload(&mut gpu, id(0), source, 0.0, || {
                    calls += 1;
                    vec![[0.0f32; 4]; 6]
                })
                .unwrap();
            assert_eq!(entry.vertex_count, 6);
            assert_eq!(entry.stride, 16);
        }
        assert_eq!(calls, 1);
        assert_eq!(gpu.live_buffers(), 1);
    }

    #[test]
    fn changed_source_regenerates_and_releases_old_buffer() {
        let mut gpu = RecordingBackend::new();
        let mut cache = GeometryCache::new();
        let first = cache
            .get_or_upload(&mut gpu, id(0), ComponentId::new(1), 0.0, || vec![[0u32; 2]; 3])
            .unwrap();
        let second = cache
            .get_or_upload(&mut gpu, id(0), ComponentId::new(2), 1.0, || vec![[0u32; 2]; 6])
            .unwrap();

        assert_ne!(first.buffer, second.buffer);
        assert_eq!(second.created_at, 1.0);
        assert_eq!(cache.len(), 1);
        assert_eq!(gpu.live_buffers(), 1);
    }

    #[test]
    fn evict_removes_exactly_one_entry() {
        let mut gpu = RecordingBackend::new();
        let mut cache = GeometryCache::new();
        for i in 0..3 {
            cache
                .get_or_upload(&mut gpu, id(i), ComponentId::new(0), 0.0, || vec![0u32; 3])
                .unwrap();
        }
        assert!(cache.evict(&mut gpu, id(1)));
        assert!(!cache.evict(&mut gpu, id(1)));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(id(1)));
        assert_eq!(gpu.live_buffers(), 2);
    }

    #[test]
    fn retain_releases_entries_with_detached_sources() {
        let mut gpu = RecordingBackend::new();
        let mut cache = GeometryCache::new();
        for i in 0..3 {
            cache
                .get_or_upload(&mut gpu, id(i), ComponentId::new(i), 0.0, || vec![0u32; 3])
                .unwrap();
        }
        let evicted = cache.retain(&mut gpu, |_, source| source != ComponentId::new(1));
        assert_eq!(evicted, 1);
        assert!(!cache.contains(id(1)));
        assert!(cache.contains(id(0)) && cache.contains(id(2)));
        assert_eq!(gpu.live_buffers(), 2);
    }

    #[test]
    fn failed_upload_leaves_nothing_behind() {
        let mut gpu = RecordingBackend::new();
        let mut cache = GeometryCache::new();
        gpu.fail_next(FailurePoint::BufferUpload);
        assert!(cache
            .get_or_upload(&mut gpu, id(0), ComponentId::new(0), 0.0, || vec![0u32; 3])
            .is_err());
        assert!(cache.is_empty());
        assert_eq!(gpu.live_buffers(), 0);
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let mut gpu = RecordingBackend::new();
        let mut cache = GeometryCache::new();
        let result = cache.get_or_upload(&mut gpu, id(0), ComponentId::new(0), 0.0, Vec::<u32>::new);
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
