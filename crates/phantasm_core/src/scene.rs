//! Scene: the top-level container of root entities
//!
//! A Scene owns a [`World`] and an ordered list of root entities. It gates the
//! lifecycle: nothing is initialized or updated until the scene itself is
//! initialized, and `cleanup` tears every root down.
//!
//! Named roots can be found in O(1) through the scene's lookup table.

use std::collections::HashMap;

use thiserror::Error;

use crate::component::{BehaviorError, RenderView};
use crate::entity::{Entity, EntityKey};
use crate::World;

/// Error from a scene graph operation
#[derive(Debug, Error)]
pub enum SceneError {
    /// The key does not refer to a live entity (it was despawned, or never existed)
    #[error("Unknown entity {0:?}")]
    UnknownEntity(EntityKey),

    /// No root entity carries the name
    #[error("No root entity named '{0}'")]
    UnknownName(String),

    #[error("Entity {0:?} cannot be its own parent")]
    SelfParent(EntityKey),

    /// The child is an ancestor of the requested parent
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle { parent: EntityKey, child: EntityKey },

    /// A component hook failed while the operation initialized it
    #[error(transparent)]
    Behavior(#[from] BehaviorError),
}

/// A scene of root entities with name lookup
///
/// The lookup table holds exactly the named roots. When two roots share a
/// name, the one added last wins.
pub struct Scene {
    name: String,
    world: World,
    roots: Vec<EntityKey>,
    names: HashMap<String, EntityKey>,
    active: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Scene {
    /// Create a new, inactive, empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world: World::new(),
            roots: Vec::new(),
            names: HashMap::new(),
            active: false,
        }
    }

    /// Scene name (for display/debugging)
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the entity arena
    ///
    /// A root despawned or parented through the arena directly stops being a
    /// root: lookups skip it, and the next initialize/update/render/cleanup
    /// drops it from the root list and name table.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Create an entity in this scene's world (not yet a root)
    pub fn spawn(&mut self, entity: Entity) -> EntityKey {
        self.world.spawn(entity)
    }

    /// Spawn an entity and add it as a root in one step
    pub fn spawn_root(&mut self, entity: Entity) -> Result<EntityKey, SceneError> {
        let key = self.world.spawn(entity);
        self.add_game_object(key)?;
        Ok(key)
    }

    /// Root entities in insertion order
    pub fn roots(&self) -> &[EntityKey] {
        &self.roots
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Add an entity as a root
    ///
    /// The entity is detached from any parent first. If the scene is already
    /// active, the entity's subtree is initialized immediately. Adding an
    /// existing root again does nothing.
    pub fn add_game_object(&mut self, key: EntityKey) -> Result<(), SceneError> {
        if !self.world.contains(key) {
            return Err(SceneError::UnknownEntity(key));
        }
        if self.roots.contains(&key) {
            return Ok(());
        }
        self.world.detach_from_parent(key);
        self.roots.push(key);
        self.index_name(key);

        if self.active {
            self.world.initialize(key)?;
        }
        Ok(())
    }

    /// Find a root entity by name
    pub fn find_game_object(&self, name: &str) -> Option<EntityKey> {
        self.names
            .get(name)
            .copied()
            .filter(|&key| self.is_detached_root(key))
    }

    /// Remove a root: drop it from the roots and name table, clean it up and
    /// despawn its subtree
    ///
    /// Returns false (and does nothing) if the entity is not a root of this scene.
    pub fn remove_game_object(&mut self, key: EntityKey) -> bool {
        let Some(index) = self.roots.iter().position(|&root| root == key) else {
            return false;
        };
        self.roots.remove(index);
        self.unindex_name(key);
        self.world.despawn(key);
        true
    }

    /// Rename an entity, keeping the lookup table consistent
    pub fn set_name(&mut self, key: EntityKey, name: Option<String>) -> Result<(), SceneError> {
        if !self.world.contains(key) {
            return Err(SceneError::UnknownEntity(key));
        }
        let is_root = self.roots.contains(&key);
        if is_root {
            self.unindex_name(key);
        }
        if let Some(entity) = self.world.get_mut(key) {
            entity.set_name(name);
        }
        if is_root {
            self.index_name(key);
        }
        Ok(())
    }

    /// Attach `child` under `parent`, taking it out of the root list if needed
    ///
    /// If the child is linked but initializing its subtree fails, it still
    /// leaves the root list before the error is returned.
    pub fn add_child(&mut self, parent: EntityKey, child: EntityKey) -> Result<(), SceneError> {
        let result = self.world.add_child(parent, child);
        if self.world.parent(child) == Some(parent) {
            if let Some(index) = self.roots.iter().position(|&root| root == child) {
                self.roots.remove(index);
                self.unindex_name(child);
            }
        }
        result
    }

    /// Activate the scene and initialize every root
    pub fn initialize(&mut self) -> Result<(), BehaviorError> {
        self.active = true;
        self.prune_roots();
        log::debug!("Initializing scene '{}' ({} roots)", self.name, self.roots.len());
        for root in self.roots.clone() {
            self.world.initialize(root)?;
        }
        Ok(())
    }

    /// Update every active root. Does nothing while the scene is inactive.
    pub fn update(&mut self, dt: f32) -> Result<(), BehaviorError> {
        if !self.active {
            return Ok(());
        }
        self.prune_roots();
        for root in self.roots.clone() {
            self.world.update(root, dt)?;
        }
        Ok(())
    }

    /// Render every active root. Does nothing while the scene is inactive.
    pub fn render(&mut self, view: &RenderView) -> Result<(), BehaviorError> {
        if !self.active {
            return Ok(());
        }
        self.prune_roots();
        for root in self.roots.clone() {
            self.world.render(root, view)?;
        }
        Ok(())
    }

    /// Clean up and despawn every root, clear the name table and deactivate
    pub fn cleanup(&mut self) {
        log::debug!("Cleaning up scene '{}'", self.name);
        self.prune_roots();
        for root in std::mem::take(&mut self.roots) {
            self.world.despawn(root);
        }
        self.names.clear();
        self.active = false;
    }

    /// Still alive and without a parent
    fn is_detached_root(&self, key: EntityKey) -> bool {
        self.world.contains(key) && self.world.parent(key).is_none()
    }

    /// Drop roots that were despawned or parented behind the scene's back
    fn prune_roots(&mut self) {
        let stale: Vec<EntityKey> = self
            .roots
            .iter()
            .copied()
            .filter(|&key| !self.is_detached_root(key))
            .collect();
        if stale.is_empty() {
            return;
        }
        log::debug!("Scene '{}': dropping {} stale roots", self.name, stale.len());
        self.roots.retain(|key| !stale.contains(key));
        self.names.retain(|_, key| !stale.contains(key));
    }

    fn index_name(&mut self, key: EntityKey) {
        let Some(name) = self.world.get(key).and_then(Entity::name) else {
            return;
        };
        if let Some(previous) = self.names.insert(name.to_string(), key) {
            if previous != key {
                log::warn!(
                    "Scene '{}': name '{}' now refers to {:?}, replacing {:?}",
                    self.name,
                    name,
                    key,
                    previous
                );
            }
        }
    }

    /// Remove the entity's name entry, but only if it still points at this entity
    fn unindex_name(&mut self, key: EntityKey) {
        let Some(name) = self.world.get(key).and_then(Entity::name) else {
            return;
        };
        if self.names.get(name) == Some(&key) {
            self.names.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentContext};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counts {
        init: usize,
        update: usize,
        render: usize,
        cleanup: usize,
    }

    struct Counter(Rc<RefCell<Counts>>);

    impl Component for Counter {
        fn initialize(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), BehaviorError> {
            self.0.borrow_mut().init += 1;
            Ok(())
        }

        fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), BehaviorError> {
            self.0.borrow_mut().update += 1;
            Ok(())
        }

        fn render(&mut self, _ctx: &mut ComponentContext<'_>, _view: &RenderView) -> Result<(), BehaviorError> {
            self.0.borrow_mut().render += 1;
            Ok(())
        }

        fn cleanup(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.0.borrow_mut().cleanup += 1;
        }
    }

    fn counted(scene: &mut Scene, entity: Entity) -> (EntityKey, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let key = scene.spawn(entity);
        scene.world_mut().add_component(key, Counter(counts.clone())).unwrap();
        (key, counts)
    }

    #[test]
    fn test_new_scene_is_inactive() {
        let scene = Scene::new("Test");
        assert_eq!(scene.name(), "Test");
        assert!(!scene.is_active());
        assert_eq!(scene.root_count(), 0);
    }

    #[test]
    fn test_player_lifecycle() {
        let mut scene = Scene::new("Test");
        let (player, counts) = counted(&mut scene, Entity::named("Player"));
        scene.add_game_object(player).unwrap();

        scene.initialize().unwrap();
        assert_eq!(counts.borrow().init, 1);
        assert_eq!(scene.find_game_object("Player"), Some(player));

        scene.cleanup();
        assert_eq!(counts.borrow().cleanup, 1);
        assert_eq!(scene.find_game_object("Player"), None);
        assert!(!scene.is_active());
        assert!(!scene.world().contains(player));
    }

    #[test]
    fn test_add_to_active_scene_initializes_immediately() {
        let mut scene = Scene::new("Test");
        scene.initialize().unwrap();

        let (key, counts) = counted(&mut scene, Entity::new());
        assert_eq!(counts.borrow().init, 0);
        scene.add_game_object(key).unwrap();
        assert_eq!(counts.borrow().init, 1);

        // Re-adding an existing root is a no-op
        scene.add_game_object(key).unwrap();
        assert_eq!(scene.root_count(), 1);
        assert_eq!(counts.borrow().init, 1);
    }

    #[test]
    fn test_update_is_noop_while_inactive() {
        let mut scene = Scene::new("Test");
        let (key, counts) = counted(&mut scene, Entity::new());
        scene.add_game_object(key).unwrap();

        scene.update(0.016).unwrap();
        scene.render(&RenderView::default()).unwrap();
        assert_eq!(counts.borrow().update, 0);
        assert_eq!(counts.borrow().render, 0);

        scene.initialize().unwrap();
        scene.update(0.016).unwrap();
        scene.render(&RenderView::default()).unwrap();
        assert_eq!(counts.borrow().update, 1);
        assert_eq!(counts.borrow().render, 1);
    }

    #[test]
    fn test_inactive_root_is_skipped() {
        let mut scene = Scene::new("Test");
        let (key, counts) = counted(&mut scene, Entity::new().with_active(false));
        scene.add_game_object(key).unwrap();
        scene.initialize().unwrap();
        scene.update(0.016).unwrap();

        assert_eq!(counts.borrow().init, 1);
        assert_eq!(counts.borrow().update, 0);
    }

    #[test]
    fn test_unnamed_roots_are_not_indexed() {
        let mut scene = Scene::new("Test");
        scene.spawn_root(Entity::new()).unwrap();
        assert_eq!(scene.root_count(), 1);
        assert_eq!(scene.find_game_object(""), None);
    }

    #[test]
    fn test_name_collision_last_write_wins() {
        let mut scene = Scene::new("Test");
        let first = scene.spawn_root(Entity::named("Enemy")).unwrap();
        let second = scene.spawn_root(Entity::named("Enemy")).unwrap();
        assert_eq!(scene.find_game_object("Enemy"), Some(second));

        // Removing the shadowed entity does not drop the newer entry
        assert!(scene.remove_game_object(first));
        assert_eq!(scene.find_game_object("Enemy"), Some(second));

        assert!(scene.remove_game_object(second));
        assert_eq!(scene.find_game_object("Enemy"), None);
    }

    #[test]
    fn test_remove_game_object_cleans_up() {
        let mut scene = Scene::new("Test");
        let (key, counts) = counted(&mut scene, Entity::named("Crate"));
        scene.add_game_object(key).unwrap();
        scene.initialize().unwrap();

        assert!(scene.remove_game_object(key));
        assert_eq!(counts.borrow().cleanup, 1);
        assert_eq!(scene.root_count(), 0);
        assert_eq!(scene.find_game_object("Crate"), None);
        assert!(!scene.remove_game_object(key));
    }

    #[test]
    fn test_add_game_object_detaches_from_parent() {
        let mut scene = Scene::new("Test");
        let parent = scene.spawn_root(Entity::new()).unwrap();
        let child = scene.spawn(Entity::named("Child"));
        scene.add_child(parent, child).unwrap();

        scene.add_game_object(child).unwrap();
        assert_eq!(scene.world().parent(child), None);
        assert!(scene.world().children(parent).is_empty());
        assert_eq!(scene.find_game_object("Child"), Some(child));
    }

    #[test]
    fn test_add_child_removes_root() {
        let mut scene = Scene::new("Test");
        let parent = scene.spawn_root(Entity::named("Parent")).unwrap();
        let child = scene.spawn_root(Entity::named("Child")).unwrap();

        scene.add_child(parent, child).unwrap();
        assert_eq!(scene.roots(), &[parent]);
        assert_eq!(scene.find_game_object("Child"), None);
    }

    /// Always fails to initialize
    struct FailsToStart;

    impl Component for FailsToStart {
        fn initialize(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), BehaviorError> {
            Err(BehaviorError::new("missing asset"))
        }
    }

    #[test]
    fn test_add_child_failed_initialize_still_leaves_roots() {
        let mut scene = Scene::new("Test");
        // Live parent outside the root list
        let parent = scene.spawn(Entity::named("Parent"));
        scene.world_mut().initialize(parent).unwrap();
        let child = scene.spawn_root(Entity::named("Child")).unwrap();
        scene.world_mut().add_component(child, FailsToStart).unwrap();

        let result = scene.add_child(parent, child);
        assert!(matches!(result, Err(SceneError::Behavior(_))));

        // Linked under the parent, so no longer a root
        assert_eq!(scene.world().parent(child), Some(parent));
        assert!(!scene.roots().contains(&child));
        assert_eq!(scene.find_game_object("Child"), None);
    }

    #[test]
    fn test_add_child_rejected_keeps_root() {
        let mut scene = Scene::new("Test");
        let root = scene.spawn_root(Entity::named("Root")).unwrap();

        assert!(matches!(scene.add_child(root, root), Err(SceneError::SelfParent(_))));
        assert_eq!(scene.roots(), &[root]);
        assert_eq!(scene.find_game_object("Root"), Some(root));
    }

    #[test]
    fn test_root_parented_through_world_is_traversed_once() {
        let mut scene = Scene::new("Test");
        let (a, _) = counted(&mut scene, Entity::named("A"));
        let (b, b_counts) = counted(&mut scene, Entity::named("B"));
        scene.add_game_object(a).unwrap();
        scene.add_game_object(b).unwrap();
        scene.initialize().unwrap();

        scene.world_mut().add_child(a, b).unwrap();
        assert_eq!(scene.find_game_object("B"), None);

        scene.update(0.016).unwrap();
        scene.render(&RenderView::default()).unwrap();
        assert_eq!(b_counts.borrow().update, 1);
        assert_eq!(b_counts.borrow().render, 1);
        assert_eq!(scene.roots(), &[a]);
    }

    #[test]
    fn test_root_despawned_through_world_is_dropped() {
        let mut scene = Scene::new("Test");
        let a = scene.spawn_root(Entity::named("A")).unwrap();
        let b = scene.spawn_root(Entity::named("B")).unwrap();
        scene.initialize().unwrap();

        scene.world_mut().despawn(a);
        assert_eq!(scene.find_game_object("A"), None);

        scene.update(0.016).unwrap();
        assert_eq!(scene.roots(), &[b]);
        assert_eq!(scene.find_game_object("B"), Some(b));
    }

    #[test]
    fn test_set_name_updates_lookup() {
        let mut scene = Scene::new("Test");
        let key = scene.spawn_root(Entity::named("Old")).unwrap();

        scene.set_name(key, Some("New".to_string())).unwrap();
        assert_eq!(scene.find_game_object("Old"), None);
        assert_eq!(scene.find_game_object("New"), Some(key));

        scene.set_name(key, None).unwrap();
        assert_eq!(scene.find_game_object("New"), None);
    }

    #[test]
    fn test_unknown_entity_errors() {
        let mut scene = Scene::new("Test");
        let key = scene.spawn(Entity::new());
        scene.world_mut().despawn(key);
        assert!(matches!(scene.add_game_object(key), Err(SceneError::UnknownEntity(_))));
        assert!(matches!(scene.set_name(key, None), Err(SceneError::UnknownEntity(_))));
    }

    #[test]
    fn test_scene_can_be_repopulated_after_cleanup() {
        let mut scene = Scene::new("Test");
        scene.spawn_root(Entity::named("A")).unwrap();
        scene.initialize().unwrap();
        scene.cleanup();

        let (key, counts) = counted(&mut scene, Entity::named("B"));
        scene.add_game_object(key).unwrap();
        assert_eq!(counts.borrow().init, 0);
        scene.initialize().unwrap();
        assert_eq!(counts.borrow().init, 1);
    }
}
