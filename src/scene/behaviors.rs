//! Demo behaviors
//!
//! Small components used by the demo scene and by integration tests.

use std::f32::consts::TAU;
use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use phantasm_core::{
    BehaviorError, BoxError, Component, ComponentContext, ComponentKind, RenderView, ResourceCache,
};

use super::mesh::{load_obj, MeshData};

/// Rotates its entity about a fixed axis
pub struct Spinner {
    pub axis: Vec3,
    /// Radians per second
    pub speed: f32,
}

impl Spinner {
    pub fn new(axis: Vec3, speed: f32) -> Self {
        Self { axis, speed }
    }
}

impl Component for Spinner {
    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), BehaviorError> {
        ctx.transform_mut().rotate(self.speed * dt, self.axis);
        Ok(())
    }
}

/// Moves its entity up and down around the position it had at initialization
pub struct Bobber {
    pub amplitude: f32,
    /// Cycles per second
    pub frequency: f32,
    phase: f32,
    origin: Option<Vec3>,
}

impl Bobber {
    pub fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
            phase: 0.0,
            origin: None,
        }
    }
}

impl Component for Bobber {
    fn initialize(&mut self, ctx: &mut ComponentContext<'_>) -> Result<(), BehaviorError> {
        self.origin = Some(ctx.transform().position());
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), BehaviorError> {
        let Some(origin) = self.origin else {
            return Ok(());
        };
        self.phase = (self.phase + dt * self.frequency).fract();
        let offset = self.amplitude * (self.phase * TAU).sin();
        ctx.transform_mut().set_position(origin + Vec3::Y * offset);
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.origin = None;
    }
}

type MeshLoader = fn(&Path) -> Result<MeshData, BoxError>;

/// Draws a cached mesh
///
/// The mesh is taken from the resource cache on initialize and given back on
/// cleanup, so renderers sharing a path share one loaded mesh. Drawing itself
/// is left to a render backend; this component computes the model-view-projection
/// matrix and counts draws.
pub struct MeshRenderer {
    cache: Arc<ResourceCache>,
    path: String,
    loader: MeshLoader,
    mesh: Option<Arc<MeshData>>,
    last_mvp: Mat4,
    draw_calls: u64,
}

impl MeshRenderer {
    /// Render a mesh loaded from an OBJ file
    pub fn from_file(cache: Arc<ResourceCache>, path: impl Into<String>) -> Self {
        Self::with_loader(cache, path, load_obj)
    }

    /// Render a procedurally generated cube, cached under `procedural/cube`
    pub fn cube(cache: Arc<ResourceCache>) -> Self {
        Self::with_loader(cache, "procedural/cube", |_| Ok(MeshData::cube(1.0)))
    }

    /// Render a procedurally generated plane, cached under `procedural/plane`
    pub fn plane(cache: Arc<ResourceCache>) -> Self {
        Self::with_loader(cache, "procedural/plane", |_| Ok(MeshData::plane(1.0)))
    }

    pub fn with_loader(cache: Arc<ResourceCache>, path: impl Into<String>, loader: MeshLoader) -> Self {
        Self {
            cache,
            path: path.into(),
            loader,
            mesh: None,
            last_mvp: Mat4::IDENTITY,
            draw_calls: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The mesh, while the renderer holds a reference to it
    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        self.mesh.as_ref()
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Model-view-projection matrix of the last draw
    pub fn last_mvp(&self) -> Mat4 {
        self.last_mvp
    }
}

impl Component for MeshRenderer {
    fn initialize(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), BehaviorError> {
        if self.mesh.is_some() {
            return Ok(());
        }
        let mesh = self
            .cache
            .load(&self.path, self.loader)
            .map_err(|e| BehaviorError::with_source(format!("failed to load mesh '{}'", self.path), e))?;
        self.mesh = Some(mesh);
        Ok(())
    }

    fn render(&mut self, ctx: &mut ComponentContext<'_>, view: &RenderView) -> Result<(), BehaviorError> {
        let Some(mesh) = &self.mesh else {
            return Ok(());
        };
        self.last_mvp = view.view_projection() * ctx.transform().world_matrix();
        self.draw_calls += 1;
        log::trace!(
            "Draw '{}' ({} triangles) for {:?}",
            self.path,
            mesh.triangle_count(),
            ctx.name().unwrap_or("<unnamed>")
        );
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut ComponentContext<'_>) {
        if self.mesh.take().is_some() {
            if let Err(e) = self.cache.release(&self.path) {
                log::warn!("Mesh renderer could not release '{}': {}", self.path, e);
            }
        }
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::named("mesh_renderer")
    }
}
