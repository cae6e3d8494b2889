//! Layer registry and frame driver.

use crate::error::RenderError;
use crate::particle::{LayerBase, ParticleLayer, ParticlePolicy};
use crate::render::{RenderDevice, RenderParams, UniformProvider};

/// Handle to a registered layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LayerId(u64);

struct LayerEntry<D: RenderDevice> {
    id: LayerId,
    layer: Box<dyn LayerBase<D>>,
    enabled: bool,
    /// Last failure, kept to avoid logging the same error every frame.
    failure: Option<RenderError>,
}

/// Owns layers in draw order and forwards the frame to them.
///
/// Every layer is ticked before any layer is displayed. A layer that fails to
/// display is skipped for that frame; the others still draw.
pub struct ParticleManager<D: RenderDevice + 'static> {
    layers: Vec<LayerEntry<D>>,
    next_id: u64,
}

impl<D: RenderDevice + 'static> Default for ParticleManager<D> {
    fn default() -> Self {
        Self { layers: Vec::new(), next_id: 0 }
    }
}

impl<D: RenderDevice + 'static> ParticleManager<D> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Appends a layer; it draws after every layer added before it.
    pub fn add_layer(&mut self, layer: impl LayerBase<D>) -> LayerId {
        self.add_boxed(Box::new(layer))
    }

    pub fn add_boxed(&mut self, layer: Box<dyn LayerBase<D>>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        log::debug!("registered layer `{}` as {:?}", layer.label(), id);
        self.layers.push(LayerEntry { id, layer, enabled: true, failure: None });
        id
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<Box<dyn LayerBase<D>>> {
        let index = self.layers.iter().position(|e| e.id == id)?;
        Some(self.layers.remove(index).layer)
    }

    fn entry(&self, id: LayerId) -> Option<&LayerEntry<D>> {
        self.layers.iter().find(|e| e.id == id)
    }

    fn entry_mut(&mut self, id: LayerId) -> Option<&mut LayerEntry<D>> {
        self.layers.iter_mut().find(|e| e.id == id)
    }

    pub fn get(&self, id: LayerId) -> Option<&dyn LayerBase<D>> {
        self.entry(id).map(|e| e.layer.as_ref())
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut dyn LayerBase<D>> {
        match self.entry_mut(id) {
            Some(entry) => Some(entry.layer.as_mut()),
            None => None,
        }
    }

    /// Typed access; `None` when the id is unknown or the policy differs.
    pub fn layer<T: ParticlePolicy>(&self, id: LayerId) -> Option<&ParticleLayer<T, D>> {
        self.entry(id)?.layer.as_any().downcast_ref()
    }

    pub fn layer_mut<T: ParticlePolicy>(&mut self, id: LayerId) -> Option<&mut ParticleLayer<T, D>> {
        self.entry_mut(id)?.layer.as_any_mut().downcast_mut()
    }

    /// Disabled layers are neither ticked nor displayed.
    pub fn set_layer_enabled(&mut self, id: LayerId, enabled: bool) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_layer_enabled(&self, id: LayerId) -> bool {
        self.entry(id).is_some_and(|e| e.enabled)
    }

    /// Error of the layer's last display, cleared once it draws again.
    pub fn last_failure(&self, id: LayerId) -> Option<&RenderError> {
        self.entry(id)?.failure.as_ref()
    }

    /// Live particles over every layer.
    pub fn particle_count(&self) -> usize {
        self.layers.iter().map(|e| e.layer.particle_count()).sum()
    }

    pub fn tick(&mut self, dt: f32) {
        for entry in self.layers.iter_mut().filter(|e| e.enabled) {
            entry.layer.tick(dt);
        }
    }

    /// Displays every enabled layer in order. Returns the particles drawn.
    pub fn display(&mut self, device: &mut D, uniforms: &dyn UniformProvider, params: &RenderParams) -> usize {
        let mut drawn = 0;
        for entry in self.layers.iter_mut().filter(|e| e.enabled) {
            match entry.layer.display(device, uniforms, params) {
                Ok(n) => {
                    if entry.failure.take().is_some() {
                        log::info!("layer `{}` recovered", entry.layer.label());
                    }
                    drawn += n;
                }
                Err(err) => report(entry, err),
            }
        }
        drawn
    }

    /// `tick(dt)` for every layer, then `display` for every layer.
    pub fn frame(&mut self, dt: f32, device: &mut D, uniforms: &dyn UniformProvider, params: &RenderParams) -> usize {
        self.tick(dt);
        self.display(device, uniforms, params)
    }

    pub fn clear_all_allocations(&mut self) {
        for entry in &mut self.layers {
            entry.layer.clear_all_allocations();
        }
    }

    /// Frees every layer's device buffers. Call on teardown.
    pub fn release_buffers(&mut self, device: &mut D) {
        for entry in &mut self.layers {
            entry.layer.release_buffers(device);
        }
    }
}

fn report<D: RenderDevice + 'static>(entry: &mut LayerEntry<D>, err: RenderError) {
    let label = entry.layer.label();
    let repeated = entry.failure.as_ref() == Some(&err);

    if repeated {
        log::debug!("layer `{}` still failing: {}", label, err);
    } else if err.is_programming_error() {
        log::error!("layer `{}` skipped: {}", label, err);
    } else if matches!(err, RenderError::InvalidState { .. }) {
        log::error!("layer `{}` display aborted: {}", label, err);
    } else {
        log::warn!("layer `{}` skipped this frame: {}", label, err);
    }
    if err.is_programming_error() {
        debug_assert!(false, "layer `{label}`: {err}");
    }

    entry.failure = Some(err);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::particle::{DefaultPolicy, LayerConfig, SpawnTarget};
    use crate::primitive::PrimitiveKind;
    use crate::render::{HeadlessDevice, HeadlessMaterial, NoUniforms, VertexSemantic};

    type Layer = ParticleLayer<DefaultPolicy, HeadlessDevice>;

    fn layer(label: &str, primitive: PrimitiveKind, count: usize) -> Layer {
        let mut layer = Layer::new(
            DefaultPolicy,
            Arc::new(HeadlessMaterial::new(label)),
            LayerConfig::labeled(label).with_primitive(primitive),
        )
        .unwrap();
        layer.spawn_particles(count, true).unwrap();
        layer
    }

    fn params() -> RenderParams {
        RenderParams::new(1)
    }

    /// Layer whose display always fails with `InvalidState`.
    struct Stuck;

    impl LayerBase<HeadlessDevice> for Stuck {
        fn label(&self) -> &str {
            "stuck"
        }

        fn tick(&mut self, _dt: f32) {}

        fn display(
            &mut self,
            _device: &mut HeadlessDevice,
            _uniforms: &dyn UniformProvider,
            _params: &RenderParams,
        ) -> crate::Result<usize> {
            Err(RenderError::InvalidState { operation: "reserve", state: "writing" })
        }

        fn particle_count(&self) -> usize {
            0
        }

        fn clear_all_allocations(&mut self) {}

        fn release_buffers(&mut self, _device: &mut HeadlessDevice) {}

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    /// Layer whose material reads an attribute its vertices do not carry.
    fn mismatched(label: &str) -> Layer {
        let material = HeadlessMaterial::new(label).with_inputs(&[VertexSemantic::Custom(0)]);
        let mut layer = Layer::new(DefaultPolicy, Arc::new(material), LayerConfig::labeled(label)).unwrap();
        layer.spawn_particles(1, true).unwrap();
        layer
    }

    // ── registry ──────────────────────────────────────────────────────────

    #[test]
    fn typed_access_checks_policy() {
        let mut mgr = ParticleManager::<HeadlessDevice>::new();
        let id = mgr.add_layer(layer("a", PrimitiveKind::Quad, 2));

        assert!(mgr.layer::<DefaultPolicy>(id).is_some());
        mgr.layer_mut::<DefaultPolicy>(id)
            .unwrap()
            .spawn_particles_into(3, SpawnTarget::Latest)
            .unwrap();
        assert_eq!(mgr.particle_count(), 5);

        assert!(mgr.remove_layer(id).is_some());
        assert!(mgr.layer::<DefaultPolicy>(id).is_none());
        assert!(mgr.is_empty());
    }

    // ── frame ─────────────────────────────────────────────────────────────

    #[test]
    fn layers_draw_in_registration_order() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        mgr.add_layer(layer("back", PrimitiveKind::Quad, 2));
        mgr.add_layer(layer("front", PrimitiveKind::TriangleStrip, 1));

        assert_eq!(mgr.frame(0.016, &mut dev, &NoUniforms, &params()), 3);
        let names: Vec<&str> = dev.draws().iter().map(|d| d.material.as_str()).collect();
        assert_eq!(names, vec!["back", "front"]);
    }

    #[test]
    fn disabled_layer_is_skipped() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        let hidden = mgr.add_layer(layer("hidden", PrimitiveKind::Quad, 2));
        mgr.add_layer(layer("shown", PrimitiveKind::Quad, 1));

        assert!(mgr.set_layer_enabled(hidden, false));
        assert!(!mgr.is_layer_enabled(hidden));
        assert_eq!(mgr.frame(0.016, &mut dev, &NoUniforms, &params()), 1);
        assert_eq!(dev.draws().len(), 1);
    }

    #[test]
    fn failing_layer_does_not_stop_others() {
        // Room for one layer's buffers only.
        let mut dev = HeadlessDevice::with_memory_limit(2048);
        let mut mgr = ParticleManager::new();
        mgr.add_layer(layer("first", PrimitiveKind::Quad, 1));
        mgr.add_layer(layer("second", PrimitiveKind::Quad, 1));

        assert_eq!(mgr.display(&mut dev, &NoUniforms, &params()), 1);
        assert_eq!(dev.draws().len(), 1);
        assert_eq!(dev.last_draw().unwrap().material, "first");

        // Same failure again, then recovery once memory is available.
        assert_eq!(mgr.display(&mut dev, &NoUniforms, &params()), 1);
        dev.set_memory_limit(None);
        assert_eq!(mgr.display(&mut dev, &NoUniforms, &params()), 2);
        assert_eq!(dev.last_draw().unwrap().material, "second");
    }

    #[test]
    fn invalid_state_aborts_only_that_layer() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        let stuck = mgr.add_layer(Stuck);
        let after = mgr.add_layer(layer("after", PrimitiveKind::Quad, 2));

        for _ in 0..2 {
            assert_eq!(mgr.frame(0.016, &mut dev, &NoUniforms, &params()), 2);
        }
        assert_eq!(dev.draws().len(), 2);
        assert!(dev.draws().iter().all(|d| d.material == "after"));
        assert!(matches!(mgr.last_failure(stuck), Some(RenderError::InvalidState { .. })));
        assert!(mgr.last_failure(after).is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "layer `broken`")]
    fn programming_error_asserts_in_debug() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        mgr.add_layer(mismatched("broken"));
        mgr.display(&mut dev, &NoUniforms, &params());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn programming_error_is_skipped_in_release() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        let broken = mgr.add_layer(mismatched("broken"));
        mgr.add_layer(layer("fine", PrimitiveKind::Quad, 1));

        assert_eq!(mgr.display(&mut dev, &NoUniforms, &params()), 1);
        assert_eq!(dev.last_draw().unwrap().material, "fine");
        assert!(mgr.last_failure(broken).is_some_and(RenderError::is_programming_error));
    }

    #[test]
    fn release_buffers_frees_every_layer() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        mgr.add_layer(layer("a", PrimitiveKind::TrianglePair, 1));
        mgr.add_layer(layer("b", PrimitiveKind::TriangleFan, 1));
        mgr.display(&mut dev, &NoUniforms, &params());
        assert!(dev.live_buffer_count() > 0);

        mgr.release_buffers(&mut dev);
        assert_eq!(dev.live_buffer_count(), 0);
    }

    #[test]
    fn clear_all_allocations_empties_layers() {
        let mut dev = HeadlessDevice::new();
        let mut mgr = ParticleManager::new();
        mgr.add_layer(layer("a", PrimitiveKind::Quad, 4));
        mgr.clear_all_allocations();
        assert_eq!(mgr.particle_count(), 0);
        assert_eq!(mgr.display(&mut dev, &NoUniforms, &params()), 0);
        assert!(dev.draws().is_empty());
    }
}
