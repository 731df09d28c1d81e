//! Core types for the Phantasm engine
//!
//! This crate provides the object model the frame driver walks every frame:
//!
//! - [`Transform`] - Position, rotation, and scale with a cached world matrix
//! - [`Component`] - A behavior unit with initialize/update/render/cleanup hooks
//! - [`Entity`] - A scene graph node with a transform, components and children
//! - [`World`] - Arena holding all entities, addressed by [`EntityKey`]
//! - [`Scene`] - Root entities, name lookup and the active/inactive gate
//! - [`ResourceCache`] - Reference-counted, thread-safe resource store
//! - [`EventBus`] - Publish/subscribe messaging between systems

mod component;
mod entity;
mod events;
mod resource_cache;
mod resource_error;
mod scene;
mod transform;
mod world;

pub use component::{
    AsAny, BehaviorError, Component, ComponentContext, ComponentId, ComponentKind, ComponentSlot,
    RenderView,
};
pub use entity::{DirtyFlags, Entity, EntityKey};
pub use events::{Event, EventBus, ListenerId, Payload};
pub use resource_cache::{loaders, Resource, ResourceCache, ResourceLoader, DEFAULT_RESOURCE_DIRS};
pub use resource_error::{BoxError, ResourceError};
pub use scene::{Scene, SceneError};
pub use transform::Transform;
pub use world::{Ancestors, World};

// Re-export the math types used throughout the public API
pub use glam::{Mat4, Quat, Vec3};
