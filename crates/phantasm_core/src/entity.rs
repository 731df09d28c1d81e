//! Entity type and change tracking
//!
//! An Entity is a node in the scene graph: a name, an active flag, exactly one
//! Transform, an ordered list of components and an ordered list of children.
//! Entities live in a [`World`](crate::World) arena and refer to each other by
//! [`EntityKey`]; the World owns all graph operations.

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::component::{ComponentContext, ComponentId, ComponentSlot};
use crate::Transform;

new_key_type! {
    /// Generational key to an entity in a [`World`](crate::World)
    ///
    /// Keys of despawned entities never resolve again, even if the slot is reused.
    pub struct EntityKey;
}

bitflags! {
    /// Flags indicating which parts of an entity have changed since the
    /// frame driver last looked
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// No changes
        const NONE = 0;
        /// Transform (position, rotation, scale) has changed
        const TRANSFORM = 1 << 0;
        /// A component was attached, removed or toggled
        const COMPONENTS = 1 << 1;
        /// Parent or children changed
        const HIERARCHY = 1 << 2;
        /// All flags set
        const ALL = Self::TRANSFORM.bits() | Self::COMPONENTS.bits() | Self::HIERARCHY.bits();
    }
}

/// A node in the scene graph
///
/// Each entity has:
/// - An optional name (for scene lookup)
/// - An active flag (inactive entities prune their whole subtree from update/render)
/// - A transform
/// - Components, run in attachment order
/// - Children, and at most one parent
/// - Dirty flags (for change tracking)
#[derive(Debug)]
pub struct Entity {
    name: Option<String>,
    active: bool,
    /// Initialized by a reachable activation pass and not cleaned up since
    live: bool,
    transform: Transform,
    components: Vec<ComponentSlot>,
    parent: Option<EntityKey>,
    children: Vec<EntityKey>,
    dirty: DirtyFlags,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    /// Create a detached, unnamed, active entity with an identity transform
    pub fn new() -> Self {
        Self {
            name: None,
            active: true,
            live: false,
            transform: Transform::identity(),
            components: Vec::new(),
            parent: None,
            children: Vec::new(),
            dirty: DirtyFlags::ALL, // New entities are dirty
        }
    }

    /// Create a detached entity with a name
    pub fn named(name: impl Into<String>) -> Self {
        let mut entity = Self::new();
        entity.name = Some(name.into());
        entity
    }

    /// Set the initial transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the initial active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Renames go through [`Scene::set_name`](crate::Scene::set_name) so the
    /// scene's lookup table stays consistent.
    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activate or deactivate this entity and its subtree for update/render
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the entity has been initialized and not yet cleaned up
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub(crate) fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the transform (marks TRANSFORM dirty)
    pub fn transform_mut(&mut self) -> &mut Transform {
        self.mark_dirty(DirtyFlags::TRANSFORM);
        &mut self.transform
    }

    /// Replace the transform and mark it as dirty
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.mark_dirty(DirtyFlags::TRANSFORM);
    }

    #[inline]
    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityKey>) {
        self.parent = parent;
        self.mark_dirty(DirtyFlags::HIERARCHY);
    }

    #[inline]
    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: EntityKey) {
        self.children.push(child);
        self.mark_dirty(DirtyFlags::HIERARCHY);
    }

    /// Remove a child from the list, returning whether it was present
    pub(crate) fn take_child(&mut self, child: EntityKey) -> bool {
        match self.children.iter().position(|&c| c == child) {
            Some(index) => {
                self.children.remove(index);
                self.mark_dirty(DirtyFlags::HIERARCHY);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_children(&mut self) -> Vec<EntityKey> {
        if !self.children.is_empty() {
            self.mark_dirty(DirtyFlags::HIERARCHY);
        }
        std::mem::take(&mut self.children)
    }

    // --- Components ---

    /// Attached components in attachment order
    #[inline]
    pub fn components(&self) -> &[ComponentSlot] {
        &self.components
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Check whether a component is attached to this entity
    pub fn has_component(&self, id: ComponentId) -> bool {
        self.component_index(id).is_some()
    }

    pub(crate) fn component_index(&self, id: ComponentId) -> Option<usize> {
        self.components.iter().position(|slot| slot.id() == id)
    }

    pub(crate) fn slot(&self, index: usize) -> &ComponentSlot {
        &self.components[index]
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut ComponentSlot {
        &mut self.components[index]
    }

    pub(crate) fn push_component(&mut self, slot: ComponentSlot) {
        self.components.push(slot);
        self.mark_dirty(DirtyFlags::COMPONENTS);
    }

    pub(crate) fn remove_component_at(&mut self, index: usize) -> ComponentSlot {
        self.mark_dirty(DirtyFlags::COMPONENTS);
        self.components.remove(index)
    }

    pub(crate) fn take_components(&mut self) -> Vec<ComponentSlot> {
        if !self.components.is_empty() {
            self.mark_dirty(DirtyFlags::COMPONENTS);
        }
        std::mem::take(&mut self.components)
    }

    /// Run `f` against the component at `index` with this entity's state lent
    /// out as a [`ComponentContext`]
    pub(crate) fn with_component<R>(
        &mut self,
        key: EntityKey,
        index: usize,
        f: impl FnOnce(&mut ComponentSlot, &mut ComponentContext<'_>) -> R,
    ) -> R {
        let Entity {
            name,
            transform,
            components,
            dirty,
            ..
        } = self;
        let mut ctx = ComponentContext::new(key, name.as_deref(), transform, dirty);
        f(&mut components[index], &mut ctx)
    }

    /// Run `f` against a detached slot (one already taken out of the list)
    pub(crate) fn with_detached<R>(
        &mut self,
        key: EntityKey,
        slot: &mut ComponentSlot,
        f: impl FnOnce(&mut ComponentSlot, &mut ComponentContext<'_>) -> R,
    ) -> R {
        let mut ctx = ComponentContext::new(key, self.name.as_deref(), &mut self.transform, &mut self.dirty);
        f(slot, &mut ctx)
    }

    // --- Dirty tracking methods ---

    /// Check if this entity has any dirty flags set
    #[inline]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Get the current dirty flags
    #[inline]
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    /// Mark this entity as dirty with the given flags
    #[inline]
    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    /// Clear all dirty flags
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = DirtyFlags::NONE;
    }
}
