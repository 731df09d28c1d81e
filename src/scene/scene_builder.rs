//! SceneBuilder - Declarative scene construction
//!
//! Provides a fluent API for building scenes of meshes and behaviors.

use std::sync::Arc;

use glam::Vec3;
use phantasm_core::{Entity, EntityKey, ResourceCache, Scene, SceneError, Transform};

use super::behaviors::{Bobber, MeshRenderer, Spinner};

/// Builder for constructing scenes
///
/// The first error is kept and returned from [`SceneBuilder::build`]; later
/// calls after an error are skipped.
///
/// # Example
/// ```ignore
/// let scene = SceneBuilder::new("demo", resources)
///     .add_floor(-1.0, 20.0)
///     .add_spinning_cube("cube", Vec3::ZERO, 1.0)
///     .add_child_cube("cube", "moon", Vec3::new(2.0, 0.0, 0.0), 0.5)
///     .build()?;
/// ```
pub struct SceneBuilder {
    scene: Scene,
    resources: Arc<ResourceCache>,
    error: Option<SceneError>,
}

impl SceneBuilder {
    /// Create a builder for an empty scene whose meshes come from `resources`
    pub fn new(name: impl Into<String>, resources: Arc<ResourceCache>) -> Self {
        Self {
            scene: Scene::new(name),
            resources,
            error: None,
        }
    }

    /// Add a flat floor plane at the given height
    pub fn add_floor(self, y: f32, size: f32) -> Self {
        let mut transform = Transform::from_position(Vec3::new(0.0, y, 0.0));
        transform.set_uniform_scale(size);
        let renderer = MeshRenderer::plane(self.resources.clone());
        self.add_root(Entity::named("floor").with_transform(transform), |scene, key| {
            scene.world_mut().add_component(key, renderer).map(|_| ())
        })
    }

    /// Add a cube that spins about the Y axis at `speed` radians per second
    pub fn add_spinning_cube(self, name: &str, position: Vec3, speed: f32) -> Self {
        let renderer = MeshRenderer::cube(self.resources.clone());
        self.add_root(
            Entity::named(name).with_transform(Transform::from_position(position)),
            |scene, key| {
                let world = scene.world_mut();
                world.add_component(key, renderer)?;
                world.add_component(key, Spinner::new(Vec3::Y, speed))?;
                Ok(())
            },
        )
    }

    /// Add a cube that bobs up and down around `position`
    pub fn add_bobbing_cube(self, name: &str, position: Vec3, amplitude: f32, frequency: f32) -> Self {
        let renderer = MeshRenderer::cube(self.resources.clone());
        self.add_root(
            Entity::named(name).with_transform(Transform::from_position(position)),
            |scene, key| {
                let world = scene.world_mut();
                world.add_component(key, renderer)?;
                world.add_component(key, Bobber::new(amplitude, frequency))?;
                Ok(())
            },
        )
    }

    /// Add a scaled cube as a child of the named root
    ///
    /// The child's transform is local to its parent.
    pub fn add_child_cube(mut self, parent: &str, name: &str, offset: Vec3, scale: f32) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(parent_key) = self.scene.find_game_object(parent) else {
            self.error = Some(SceneError::UnknownName(parent.to_string()));
            return self;
        };

        let mut transform = Transform::from_position(offset);
        transform.set_uniform_scale(scale);
        let child = self.scene.spawn(Entity::named(name).with_transform(transform));
        let renderer = MeshRenderer::cube(self.resources.clone());
        let result = self
            .scene
            .world_mut()
            .add_component(child, renderer)
            .and_then(|_| self.scene.add_child(parent_key, child));
        if let Err(e) = result {
            self.error = Some(e);
        }
        self
    }

    /// Add a custom entity as a root
    ///
    /// For entities that don't fit the standard patterns.
    pub fn add_entity(self, entity: Entity) -> Self {
        self.add_root(entity, |_, _| Ok(()))
    }

    /// Build the scene (inactive; the engine initializes it when it becomes current)
    pub fn build(self) -> Result<Scene, SceneError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.scene),
        }
    }

    fn add_root<F>(mut self, entity: Entity, attach: F) -> Self
    where
        F: FnOnce(&mut Scene, EntityKey) -> Result<(), SceneError>,
    {
        if self.error.is_some() {
            return self;
        }
        let result = self
            .scene
            .spawn_root(entity)
            .and_then(|key| attach(&mut self.scene, key));
        if let Err(e) = result {
            self.error = Some(e);
        }
        self
    }
}

/// The scene the demo binary runs: a floor, a spinning cube with an orbiting
/// child, and a bobbing cube
pub fn demo_scene(resources: Arc<ResourceCache>) -> Result<Scene, SceneError> {
    SceneBuilder::new("demo", resources)
        .add_floor(-1.0, 20.0)
        .add_spinning_cube("spinner", Vec3::ZERO, 1.0)
        .add_child_cube("spinner", "satellite", Vec3::new(2.0, 0.0, 0.0), 0.25)
        .add_bobbing_cube("bobber", Vec3::new(-3.0, 0.5, 0.0), 0.5, 0.5)
        .build()
}
