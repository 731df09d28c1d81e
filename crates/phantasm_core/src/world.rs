//! World container for entities
//!
//! The World is an arena of [`Entity`] values addressed by [`EntityKey`]. The
//! scene graph is a forest inside that arena: children are stored as key
//! lists and parents as an optional key. Every graph and lifecycle operation
//! is a World method, so parent and child links are always updated together.

use slotmap::SlotMap;

use crate::component::{BehaviorError, Component, ComponentContext, ComponentId, ComponentKind, ComponentSlot, RenderView};
use crate::entity::{DirtyFlags, Entity, EntityKey};
use crate::scene::SceneError;

/// The entity arena
pub struct World {
    entities: SlotMap<EntityKey, Entity>,
    next_component_id: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
            next_component_id: 0,
        }
    }

    /// Create a world with pre-allocated capacity for entities
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: SlotMap::with_capacity_and_key(capacity),
            next_component_id: 0,
        }
    }

    /// Add a detached entity to the world, returning its key
    pub fn spawn(&mut self, entity: Entity) -> EntityKey {
        self.entities.insert(entity)
    }

    /// Clean up and remove an entity and its whole subtree
    ///
    /// The entity is detached from its parent first. Returns false if the key
    /// is unknown.
    pub fn despawn(&mut self, key: EntityKey) -> bool {
        let Some(parent) = self.entities.get(key).map(Entity::parent) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|p| self.entities.get_mut(p)) {
            parent.take_child(key);
        }
        self.cleanup(key);
        self.entities.remove(key);
        true
    }

    /// Get a reference to an entity by key
    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Get a mutable reference to an entity by key
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    #[inline]
    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Get the number of entities
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the world is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over keys and entities
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter()
    }

    /// Remove every entity without running cleanup hooks
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Keys of entities whose transform changed since their flags were last cleared
    pub fn dirty_transforms(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.entities
            .iter()
            .filter(|(_, e)| e.dirty_flags().contains(DirtyFlags::TRANSFORM))
            .map(|(k, _)| k)
    }

    /// Clear dirty flags on every entity
    pub fn clear_all_dirty(&mut self) {
        for (_, entity) in self.entities.iter_mut() {
            entity.clear_dirty();
        }
    }

    // --- Components ---

    /// Attach a component to an entity
    ///
    /// If the entity is already live, the component is initialized
    /// immediately. A failed initialize leaves the component attached.
    pub fn add_component<C: Component>(&mut self, key: EntityKey, unit: C) -> Result<ComponentId, SceneError> {
        self.add_boxed_component(key, Box::new(unit))
    }

    /// Attach an already boxed component
    pub fn add_boxed_component(
        &mut self,
        key: EntityKey,
        unit: Box<dyn Component>,
    ) -> Result<ComponentId, SceneError> {
        let Some(entity) = self.entities.get_mut(key) else {
            return Err(SceneError::UnknownEntity(key));
        };
        let id = ComponentId(self.next_component_id);
        self.next_component_id += 1;

        entity.push_component(ComponentSlot::new(id, key, unit));
        if entity.is_live() {
            let index = entity.component_count() - 1;
            initialize_slot(entity, key, index)?;
        }
        Ok(id)
    }

    /// Get the first attached component of type `T`
    pub fn get_component<T: Component>(&self, key: EntityKey) -> Option<&T> {
        self.entities
            .get(key)?
            .components()
            .iter()
            .find_map(|slot| slot.downcast_ref::<T>())
    }

    /// Get the first attached component of type `T`, mutably
    pub fn get_component_mut<T: Component>(&mut self, key: EntityKey) -> Option<&mut T> {
        let entity = self.entities.get_mut(key)?;
        let index = entity
            .components()
            .iter()
            .position(|slot| slot.downcast_ref::<T>().is_some())?;
        entity.slot_mut(index).downcast_mut::<T>()
    }

    /// Find the first component advertising `kind`
    pub fn find_component(&self, key: EntityKey, kind: ComponentKind) -> Option<ComponentId> {
        self.entities
            .get(key)?
            .components()
            .iter()
            .find(|slot| slot.kind() == kind)
            .map(ComponentSlot::id)
    }

    /// Look at an attached component's slot
    pub fn component(&self, key: EntityKey, id: ComponentId) -> Option<&ComponentSlot> {
        let entity = self.entities.get(key)?;
        let index = entity.component_index(id)?;
        Some(entity.slot(index))
    }

    /// Detach a component, run its cleanup and hand it back
    ///
    /// Returns `None` (and does nothing) if the component is not attached.
    pub fn remove_component(&mut self, key: EntityKey, id: ComponentId) -> Option<Box<dyn Component>> {
        let entity = self.entities.get_mut(key)?;
        let index = entity.component_index(id)?;
        let mut slot = entity.remove_component_at(index);
        entity.with_detached(key, &mut slot, |slot, ctx| slot.unit_mut().cleanup(ctx));
        Some(slot.detach())
    }

    /// Enable or disable a component
    ///
    /// Enabling a component that has never been initialized on a live entity
    /// initializes it. Returns `Ok(false)` if the component is not attached.
    pub fn set_component_enabled(
        &mut self,
        key: EntityKey,
        id: ComponentId,
        enabled: bool,
    ) -> Result<bool, BehaviorError> {
        let Some(entity) = self.entities.get_mut(key) else {
            return Ok(false);
        };
        let Some(index) = entity.component_index(id) else {
            return Ok(false);
        };
        if entity.slot(index).is_enabled() != enabled {
            entity.slot_mut(index).set_enabled(enabled);
            entity.mark_dirty(DirtyFlags::COMPONENTS);
        }
        if enabled && entity.is_live() && !entity.slot(index).is_initialized() {
            initialize_slot(entity, key, index)?;
        }
        Ok(true)
    }

    // --- Hierarchy ---

    /// Attach `child` under `parent`
    ///
    /// A child that already has a parent is moved, never duplicated. Adding a
    /// child to a live parent initializes the child's subtree.
    ///
    /// # Errors
    ///
    /// - [`SceneError::UnknownEntity`] if either key is stale
    /// - [`SceneError::SelfParent`] for `add_child(a, a)`
    /// - [`SceneError::WouldCreateCycle`] if `child` is an ancestor of `parent`
    /// - [`SceneError::Behavior`] if initializing the child subtree fails
    pub fn add_child(&mut self, parent: EntityKey, child: EntityKey) -> Result<(), SceneError> {
        for key in [parent, child] {
            if !self.contains(key) {
                return Err(SceneError::UnknownEntity(key));
            }
        }
        if parent == child {
            log::warn!("Rejected attaching {:?} to itself", child);
            return Err(SceneError::SelfParent(child));
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Rejected attaching {:?} under its descendant {:?}", child, parent);
            return Err(SceneError::WouldCreateCycle { parent, child });
        }

        self.detach_from_parent(child);
        if let Some(entity) = self.entities.get_mut(child) {
            entity.set_parent(Some(parent));
        }
        let parent_live = match self.entities.get_mut(parent) {
            Some(entity) => {
                entity.push_child(child);
                entity.is_live()
            }
            None => false,
        };

        if parent_live {
            self.initialize(child)?;
        }
        Ok(())
    }

    /// Detach `child` from `parent`
    ///
    /// Returns false (and does nothing) if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: EntityKey, child: EntityKey) -> bool {
        let removed = self
            .entities
            .get_mut(parent)
            .is_some_and(|entity| entity.take_child(child));
        if removed {
            if let Some(entity) = self.entities.get_mut(child) {
                entity.set_parent(None);
            }
        }
        removed
    }

    /// Detach an entity from whatever parent it has. Returns the old parent.
    pub fn detach_from_parent(&mut self, key: EntityKey) -> Option<EntityKey> {
        let parent = self.parent(key)?;
        self.remove_child(parent, key);
        Some(parent)
    }

    pub fn parent(&self, key: EntityKey) -> Option<EntityKey> {
        self.entities.get(key)?.parent()
    }

    /// Children of an entity (empty for unknown keys)
    pub fn children(&self, key: EntityKey) -> &[EntityKey] {
        self.entities.get(key).map(Entity::children).unwrap_or(&[])
    }

    /// Walk from an entity's parent up to its root
    pub fn ancestors(&self, key: EntityKey) -> Ancestors<'_> {
        Ancestors {
            world: self,
            next: self.parent(key),
        }
    }

    /// Check whether `ancestor` is a strict ancestor of `key`
    pub fn is_ancestor(&self, ancestor: EntityKey, key: EntityKey) -> bool {
        self.ancestors(key).any(|k| k == ancestor)
    }

    // --- Lifecycle ---

    /// Initialize an entity's subtree and mark it live
    ///
    /// Runs `initialize` on enabled components that have not been initialized
    /// yet, then recurses into every child, active or not.
    pub fn initialize(&mut self, key: EntityKey) -> Result<(), BehaviorError> {
        let Some(entity) = self.entities.get_mut(key) else {
            return Ok(());
        };
        entity.set_live(true);
        for index in 0..entity.component_count() {
            let slot = entity.slot(index);
            if slot.is_enabled() && !slot.is_initialized() {
                initialize_slot(entity, key, index)?;
            }
        }

        let children = entity.children().to_vec();
        for child in children {
            self.initialize(child)?;
        }
        Ok(())
    }

    /// Update an entity's subtree
    ///
    /// Does nothing if the entity is inactive. Otherwise runs enabled
    /// components in order, then recurses into active children. The first
    /// failing hook stops the traversal.
    pub fn update(&mut self, key: EntityKey, dt: f32) -> Result<(), BehaviorError> {
        self.propagate(key, &mut |slot, ctx| slot.unit_mut().update(ctx, dt))
    }

    /// Render an entity's subtree (same traversal rules as [`World::update`])
    pub fn render(&mut self, key: EntityKey, view: &RenderView) -> Result<(), BehaviorError> {
        self.propagate(key, &mut |slot, ctx| slot.unit_mut().render(ctx, view))
    }

    /// Clean up an entity's subtree
    ///
    /// Runs `cleanup` on every component regardless of enabled state, then on
    /// each child top-down. Components are dropped and descendants despawned;
    /// the entity itself stays in the world, idle. Calling this twice is a no-op.
    pub fn cleanup(&mut self, key: EntityKey) {
        let Some(entity) = self.entities.get_mut(key) else {
            return;
        };
        let mut slots = entity.take_components();
        for slot in slots.iter_mut() {
            entity.with_detached(key, slot, |slot, ctx| slot.unit_mut().cleanup(ctx));
        }
        drop(slots);
        entity.set_live(false);

        for child in entity.take_children() {
            self.cleanup(child);
            self.entities.remove(child);
        }
    }

    fn propagate<F>(&mut self, key: EntityKey, hook: &mut F) -> Result<(), BehaviorError>
    where
        F: FnMut(&mut ComponentSlot, &mut ComponentContext<'_>) -> Result<(), BehaviorError>,
    {
        let Some(entity) = self.entities.get_mut(key) else {
            return Ok(());
        };
        if !entity.is_active() {
            return Ok(());
        }
        for index in 0..entity.component_count() {
            if entity.slot(index).is_enabled() {
                entity
                    .with_component(key, index, &mut *hook)
                    .map_err(|e| e.for_entity(key))?;
            }
        }

        let children = entity.children().to_vec();
        for child in children {
            if self.entities.get(child).is_some_and(Entity::is_active) {
                self.propagate(child, hook)?;
            }
        }
        Ok(())
    }
}

fn initialize_slot(entity: &mut Entity, key: EntityKey, index: usize) -> Result<(), BehaviorError> {
    entity.slot_mut(index).mark_initialized();
    entity
        .with_component(key, index, |slot, ctx| slot.unit_mut().initialize(ctx))
        .map_err(|e| e.for_entity(key))
}

/// Iterator over an entity's ancestors, nearest first
pub struct Ancestors<'a> {
    world: &'a World,
    next: Option<EntityKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = EntityKey;

    fn next(&mut self) -> Option<EntityKey> {
        let current = self.next?;
        self.next = self.world.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook call as "<label>.<hook>"
    struct Recorder {
        label: &'static str,
        log: Log,
        fail_update: bool,
    }

    impl Recorder {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                log: log.clone(),
                fail_update: false,
            }
        }

        fn failing(label: &'static str, log: &Log) -> Self {
            Self {
                fail_update: true,
                ..Self::new(label, log)
            }
        }

        fn push(&self, hook: &str) {
            self.log.borrow_mut().push(format!("{}.{}", self.label, hook));
        }
    }

    impl Component for Recorder {
        fn initialize(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), BehaviorError> {
            self.push("init");
            Ok(())
        }

        fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), BehaviorError> {
            self.push("update");
            if self.fail_update {
                return Err(BehaviorError::new(format!("{} failed", self.label)));
            }
            Ok(())
        }

        fn render(&mut self, _ctx: &mut ComponentContext<'_>, _view: &RenderView) -> Result<(), BehaviorError> {
            self.push("render");
            Ok(())
        }

        fn cleanup(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.push("cleanup");
        }
    }

    struct Mover;

    impl Component for Mover {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), BehaviorError> {
            ctx.transform_mut().translate(Vec3::X * dt);
            Ok(())
        }

        fn kind(&self) -> ComponentKind {
            ComponentKind::named("mover")
        }
    }

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    fn count(log: &Log, entry: &str) -> usize {
        log.borrow().iter().filter(|e| e.as_str() == entry).count()
    }

    #[test]
    fn test_world_new() {
        let world = World::new();
        assert!(world.is_empty());
        assert_eq!(world.len(), 0);
    }

    #[test]
    fn test_spawn_and_get() {
        let mut world = World::with_capacity(4);
        let key = world.spawn(Entity::named("Player"));
        assert!(world.contains(key));
        assert_eq!(world.len(), 1);
        assert_eq!(world.get(key).unwrap().name(), Some("Player"));
    }

    #[test]
    fn test_despawn_invalidates_key() {
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        assert!(world.despawn(key));
        assert!(!world.contains(key));
        assert!(world.get(key).is_none());
        assert!(!world.despawn(key));

        // A reused slot does not resurrect the stale key
        let other = world.spawn(Entity::new());
        assert_ne!(key, other);
        assert!(world.get(key).is_none());
    }

    #[test]
    fn test_component_added_before_live_waits_for_initialize() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        let id = world.add_component(key, Recorder::new("u", &log)).unwrap();

        assert!(entries(&log).is_empty());
        assert!(!world.component(key, id).unwrap().is_initialized());

        world.initialize(key).unwrap();
        world.initialize(key).unwrap();
        assert_eq!(count(&log, "u.init"), 1);
        assert!(world.get(key).unwrap().is_live());
    }

    #[test]
    fn test_component_added_to_live_entity_initializes_immediately() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        world.initialize(key).unwrap();

        world.add_component(key, Recorder::new("late", &log)).unwrap();
        assert_eq!(entries(&log), vec!["late.init"]);
    }

    #[test]
    fn test_add_component_unknown_entity() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        world.despawn(key);
        let result = world.add_component(key, Recorder::new("u", &log));
        assert!(matches!(result, Err(SceneError::UnknownEntity(k)) if k == key));
    }

    #[test]
    fn test_component_back_reference() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        let id = world.add_component(key, Recorder::new("u", &log)).unwrap();
        assert_eq!(world.component(key, id).unwrap().owner(), Some(key));
    }

    #[test]
    fn test_get_component_by_type_and_kind() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        world.add_component(key, Recorder::new("u", &log)).unwrap();
        let mover = world.add_component(key, Mover).unwrap();

        assert_eq!(world.get_component::<Recorder>(key).unwrap().label, "u");
        assert!(world.get_component_mut::<Mover>(key).is_some());
        assert_eq!(world.find_component(key, ComponentKind::named("mover")), Some(mover));
        assert_eq!(world.find_component(key, ComponentKind::named("missing")), None);
        assert!(world.find_component(key, ComponentKind::of::<Recorder>()).is_some());
    }

    #[test]
    fn test_remove_component_runs_cleanup() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        let id = world.add_component(key, Recorder::new("u", &log)).unwrap();

        let removed = world.remove_component(key, id);
        assert!(removed.is_some());
        assert_eq!(entries(&log), vec!["u.cleanup"]);
        assert_eq!(world.get(key).unwrap().component_count(), 0);

        // Second removal is a no-op
        assert!(world.remove_component(key, id).is_none());
        assert_eq!(count(&log, "u.cleanup"), 1);
    }

    #[test]
    fn test_disabled_component_skips_hooks_except_cleanup() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        let id = world.add_component(key, Recorder::new("u", &log)).unwrap();
        assert_eq!(world.set_component_enabled(key, id, false).unwrap(), true);

        world.initialize(key).unwrap();
        world.update(key, 0.1).unwrap();
        world.render(key, &RenderView::default()).unwrap();
        assert!(entries(&log).is_empty());

        world.cleanup(key);
        assert_eq!(entries(&log), vec!["u.cleanup"]);
    }

    #[test]
    fn test_enabling_on_live_entity_initializes_once() {
        let log = new_log();
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        let id = world.add_component(key, Recorder::new("u", &log)).unwrap();
        world.set_component_enabled(key, id, false).unwrap();
        world.initialize(key).unwrap();

        world.set_component_enabled(key, id, true).unwrap();
        world.set_component_enabled(key, id, false).unwrap();
        world.set_component_enabled(key, id, true).unwrap();
        assert_eq!(count(&log, "u.init"), 1);
    }

    #[test]
    fn test_set_enabled_unknown_component() {
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        let id = world.add_component(key, Mover).unwrap();
        world.remove_component(key, id);
        assert_eq!(world.set_component_enabled(key, id, true).unwrap(), false);
    }

    #[test]
    fn test_add_child_sets_both_links() {
        let mut world = World::new();
        let parent = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        world.add_child(parent, child).unwrap();

        assert_eq!(world.parent(child), Some(parent));
        assert_eq!(world.children(parent), &[child]);
    }

    #[test]
    fn test_reparenting_is_exclusive() {
        let mut world = World::new();
        let e1 = world.spawn(Entity::new());
        let e2 = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());

        world.add_child(e1, child).unwrap();
        world.add_child(e2, child).unwrap();

        assert!(!world.children(e1).contains(&child));
        assert_eq!(world.children(e2), &[child]);
        assert_eq!(world.parent(child), Some(e2));
    }

    #[test]
    fn test_add_child_rejects_self() {
        let mut world = World::new();
        let a = world.spawn(Entity::new());
        assert!(matches!(world.add_child(a, a), Err(SceneError::SelfParent(k)) if k == a));
        assert!(world.children(a).is_empty());
        assert_eq!(world.parent(a), None);
    }

    #[test]
    fn test_add_child_rejects_cycle() {
        let mut world = World::new();
        let grandparent = world.spawn(Entity::new());
        let parent = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        world.add_child(grandparent, parent).unwrap();
        world.add_child(parent, child).unwrap();

        let result = world.add_child(child, grandparent);
        assert!(matches!(result, Err(SceneError::WouldCreateCycle { .. })));

        // Tree unchanged
        assert_eq!(world.parent(grandparent), None);
        assert_eq!(world.children(child), &[] as &[EntityKey]);
        assert!(world.is_ancestor(grandparent, child));
        assert_eq!(world.ancestors(child).collect::<Vec<_>>(), vec![parent, grandparent]);
    }

    #[test]
    fn test_remove_child() {
        let mut world = World::new();
        let parent = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        let stranger = world.spawn(Entity::new());
        world.add_child(parent, child).unwrap();

        assert!(!world.remove_child(parent, stranger));
        assert!(world.remove_child(parent, child));
        assert_eq!(world.parent(child), None);
        assert!(world.children(parent).is_empty());
        assert!(!world.remove_child(parent, child));
    }

    #[test]
    fn test_units_run_before_children_in_attachment_order() {
        let log = new_log();
        let mut world = World::new();
        let parent = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        world.add_component(parent, Recorder::new("p1", &log)).unwrap();
        world.add_child(parent, child).unwrap();
        world.add_component(child, Recorder::new("c", &log)).unwrap();
        world.add_component(parent, Recorder::new("p2", &log)).unwrap();

        world.initialize(parent).unwrap();
        world.update(parent, 0.016).unwrap();
        world.cleanup(parent);

        assert_eq!(
            entries(&log),
            vec![
                "p1.init", "p2.init", "c.init",
                "p1.update", "p2.update", "c.update",
                "p1.cleanup", "p2.cleanup", "c.cleanup",
            ]
        );
    }

    #[test]
    fn test_inactive_child_prunes_subtree() {
        let log = new_log();
        let mut world = World::new();
        let a = world.spawn(Entity::new());
        let b = world.spawn(Entity::new());
        let c = world.spawn(Entity::new());
        world.add_child(a, b).unwrap();
        world.add_child(b, c).unwrap();
        world.add_component(a, Recorder::new("a", &log)).unwrap();
        world.add_component(b, Recorder::new("b", &log)).unwrap();
        world.add_component(c, Recorder::new("c", &log)).unwrap();

        world.get_mut(b).unwrap().set_active(false);
        world.update(a, 0.016).unwrap();
        world.render(a, &RenderView::default()).unwrap();

        assert_eq!(entries(&log), vec!["a.update", "a.render"]);
    }

    #[test]
    fn test_inactive_entity_update_is_noop() {
        let mut world = World::new();
        let key = world.spawn(Entity::new().with_active(false));
        world.add_component(key, Mover).unwrap();
        world.update(key, 1.0).unwrap();
        assert_eq!(world.get(key).unwrap().transform().position(), Vec3::ZERO);
    }

    #[test]
    fn test_initialize_reaches_inactive_children() {
        let log = new_log();
        let mut world = World::new();
        let parent = world.spawn(Entity::new());
        let child = world.spawn(Entity::new().with_active(false));
        world.add_child(parent, child).unwrap();
        world.add_component(child, Recorder::new("c", &log)).unwrap();

        world.initialize(parent).unwrap();
        assert_eq!(entries(&log), vec!["c.init"]);
    }

    #[test]
    fn test_add_child_to_live_parent_initializes_subtree() {
        let log = new_log();
        let mut world = World::new();
        let parent = world.spawn(Entity::new());
        world.initialize(parent).unwrap();

        let child = world.spawn(Entity::new());
        let grandchild = world.spawn(Entity::new());
        world.add_child(child, grandchild).unwrap();
        world.add_component(grandchild, Recorder::new("g", &log)).unwrap();
        assert!(entries(&log).is_empty());

        world.add_child(parent, child).unwrap();
        assert_eq!(entries(&log), vec!["g.init"]);
        assert!(world.get(grandchild).unwrap().is_live());
    }

    #[test]
    fn test_cleanup_is_idempotent_and_despawns_descendants() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        world.add_child(root, child).unwrap();
        world.add_component(root, Recorder::new("r", &log)).unwrap();
        world.add_component(child, Recorder::new("c", &log)).unwrap();
        world.initialize(root).unwrap();

        world.cleanup(root);
        world.cleanup(root);

        assert_eq!(count(&log, "r.cleanup"), 1);
        assert_eq!(count(&log, "c.cleanup"), 1);
        assert!(!world.contains(child));
        assert!(world.contains(root));
        let root_entity = world.get(root).unwrap();
        assert!(!root_entity.is_live());
        assert!(root_entity.children().is_empty());
        assert_eq!(root_entity.component_count(), 0);
    }

    #[test]
    fn test_despawn_detaches_from_parent() {
        let mut world = World::new();
        let parent = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        let grandchild = world.spawn(Entity::new());
        world.add_child(parent, child).unwrap();
        world.add_child(child, grandchild).unwrap();

        world.despawn(child);
        assert!(world.children(parent).is_empty());
        assert!(!world.contains(grandchild));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_update_error_stops_traversal_and_names_entity() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(Entity::new());
        let child = world.spawn(Entity::new());
        world.add_child(root, child).unwrap();
        world.add_component(root, Recorder::failing("bad", &log)).unwrap();
        world.add_component(root, Recorder::new("after", &log)).unwrap();
        world.add_component(child, Recorder::new("child", &log)).unwrap();

        let err = world.update(root, 0.016).unwrap_err();
        assert_eq!(err.entity(), Some(root));
        assert_eq!(err.message(), "bad failed");
        assert_eq!(entries(&log), vec!["bad.update"]);
    }

    #[test]
    fn test_component_moves_transform_and_marks_dirty() {
        let mut world = World::new();
        let key = world.spawn(Entity::new());
        world.add_component(key, Mover).unwrap();
        world.clear_all_dirty();

        world.update(key, 2.0).unwrap();

        assert_eq!(world.get(key).unwrap().transform().position(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(world.dirty_transforms().collect::<Vec<_>>(), vec![key]);
    }
}
