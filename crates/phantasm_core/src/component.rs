//! Behavior units attached to entities
//!
//! A [`Component`] is a per-entity logic object with four lifecycle hooks:
//! initialize, update, render and cleanup. All hooks have empty default
//! bodies so a concrete unit only overrides what it uses.
//!
//! Hooks never see the [`World`](crate::World). They receive a
//! [`ComponentContext`] that exposes the owning entity's key, name and
//! transform, which is all a unit may touch while the graph is being walked.

use std::any::{type_name, Any};
use std::fmt;

use glam::Mat4;
use thiserror::Error;

use crate::entity::{DirtyFlags, EntityKey};
use crate::resource_error::BoxError;
use crate::Transform;

/// Identifier of one component attachment, unique within a [`World`](crate::World)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u64);

impl ComponentId {
    /// Get the raw value of this id
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Capability tag used to look components up without knowing their type
///
/// By default a component's kind is its Rust type name. Units that stand in
/// for one another (two mesh renderer implementations, say) can return the
/// same named kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentKind(&'static str);

impl ComponentKind {
    /// A named capability
    pub const fn named(name: &'static str) -> Self {
        Self(name)
    }

    /// The default kind for a component type
    pub fn of<T: ?Sized>() -> Self {
        Self(type_name::<T>())
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// View state handed to render hooks by the frame driver
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderView {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl RenderView {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Combined `projection * view` matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Failure returned from a component hook
///
/// The graph does not swallow these: the first failing hook stops the
/// traversal and the error travels up to the frame driver, which decides
/// whether to skip the frame or abort.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BehaviorError {
    message: String,
    #[source]
    source: Option<BoxError>,
    entity: Option<EntityKey>,
}

impl BehaviorError {
    /// Create a behavior error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            entity: None,
        }
    }

    /// Create a behavior error wrapping an underlying cause
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
            entity: None,
        }
    }

    /// Record the entity whose component failed (the first one recorded wins)
    pub fn for_entity(mut self, entity: EntityKey) -> Self {
        self.entity.get_or_insert(entity);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The entity whose component failed, if known
    pub fn entity(&self) -> Option<EntityKey> {
        self.entity
    }
}

/// The owning entity's state, lent to a component for the duration of a hook
pub struct ComponentContext<'a> {
    entity: EntityKey,
    name: Option<&'a str>,
    transform: &'a mut Transform,
    dirty: &'a mut DirtyFlags,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(
        entity: EntityKey,
        name: Option<&'a str>,
        transform: &'a mut Transform,
        dirty: &'a mut DirtyFlags,
    ) -> Self {
        Self {
            entity,
            name,
            transform,
            dirty,
        }
    }

    /// Key of the owning entity
    #[inline]
    pub fn entity(&self) -> EntityKey {
        self.entity
    }

    /// Name of the owning entity
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        self.transform
    }

    /// Mutable access to the owning transform (marks the entity's transform dirty)
    pub fn transform_mut(&mut self) -> &mut Transform {
        *self.dirty |= DirtyFlags::TRANSFORM;
        self.transform
    }
}

/// Upcast to `Any`, implemented for every `'static` type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A behavior unit attached to an entity
///
/// Hooks run in attachment order within an entity, and an entity's own
/// components always run before its children's.
///
/// # Example
///
/// ```ignore
/// struct Spinner { speed: f32 }
///
/// impl Component for Spinner {
///     fn update(&mut self, ctx: &mut ComponentContext, dt: f32) -> Result<(), BehaviorError> {
///         ctx.transform_mut().rotate(self.speed * dt, Vec3::Y);
///         Ok(())
///     }
/// }
/// ```
pub trait Component: AsAny + 'static {
    /// Called once per attachment, when the owning entity becomes live
    fn initialize(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Called every frame while the component is enabled and its entity is active
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Called every rendered frame while the component is enabled and its entity is active
    fn render(&mut self, _ctx: &mut ComponentContext<'_>, _view: &RenderView) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Called on removal or entity cleanup, whether or not the component is enabled
    fn cleanup(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Capability tag for [`World::find_component`](crate::World::find_component)
    fn kind(&self) -> ComponentKind {
        ComponentKind::of::<Self>()
    }
}

/// An attached component and its bookkeeping
pub struct ComponentSlot {
    id: ComponentId,
    /// Back-reference to the owning entity; cleared on removal
    owner: Option<EntityKey>,
    enabled: bool,
    initialized: bool,
    unit: Box<dyn Component>,
}

impl ComponentSlot {
    pub(crate) fn new(id: ComponentId, owner: EntityKey, unit: Box<dyn Component>) -> Self {
        Self {
            id,
            owner: Some(owner),
            enabled: true,
            initialized: false,
            unit,
        }
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[inline]
    pub fn owner(&self) -> Option<EntityKey> {
        self.owner
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `initialize` has run for this attachment
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn kind(&self) -> ComponentKind {
        self.unit.kind()
    }

    pub fn unit(&self) -> &dyn Component {
        self.unit.as_ref()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub(crate) fn unit_mut(&mut self) -> &mut dyn Component {
        self.unit.as_mut()
    }

    pub(crate) fn downcast_ref<T: Component>(&self) -> Option<&T> {
        let unit: &dyn Component = self.unit.as_ref();
        unit.as_any().downcast_ref::<T>()
    }

    pub(crate) fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        let unit: &mut dyn Component = self.unit.as_mut();
        unit.as_any_mut().downcast_mut::<T>()
    }

    /// Detach: clear the back-reference and hand the unit back
    pub(crate) fn detach(mut self) -> Box<dyn Component> {
        self.owner = None;
        self.unit
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("owner", &self.owner)
            .field("enabled", &self.enabled)
            .field("initialized", &self.initialized)
            .finish()
    }
}
