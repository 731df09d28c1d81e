//! Scene construction utilities
//!
//! This module provides the demo behaviors, the mesh and texture resources
//! and a declarative API for building scenes.

mod behaviors;
mod mesh;
mod scene_builder;
mod texture;

pub use behaviors::{Bobber, MeshRenderer, Spinner};
pub use mesh::{load_obj, MeshData};
pub use scene_builder::{demo_scene, SceneBuilder};
pub use texture::{load_texture, TextureData};
