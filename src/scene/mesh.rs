//! Mesh data as a cacheable resource
//!
//! Meshes are loaded from a minimal OBJ subset (`v x y z` vertex lines and
//! `f a b c` triangle lines with 1-based indices) or generated procedurally.

use std::fs;
use std::path::Path;

use glam::Vec3;
use phantasm_core::{BoxError, Resource};

/// Triangle mesh geometry
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    /// Triangle list, three indices per triangle
    pub indices: Vec<u32>,
}

impl Resource for MeshData {}

impl MeshData {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 7, 6, 3, 6, 2, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self { vertices, indices }
    }

    /// Flat square in the XZ plane centered on the origin
    pub fn plane(size: f32) -> Self {
        let h = size / 2.0;
        Self {
            vertices: vec![
                Vec3::new(-h, 0.0, -h),
                Vec3::new(h, 0.0, -h),
                Vec3::new(h, 0.0, h),
                Vec3::new(-h, 0.0, h),
            ],
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// Parse the OBJ subset. Lines other than `v` and `f` are ignored.
    pub fn parse_obj(source: &str) -> Result<Self, BoxError> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for (number, line) in source.lines().enumerate() {
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let coords = parts
                        .take(3)
                        .map(str::parse::<f32>)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| format!("line {}: bad vertex: {}", number + 1, e))?;
                    if coords.len() != 3 {
                        return Err(format!("line {}: vertex needs 3 coordinates", number + 1).into());
                    }
                    vertices.push(Vec3::new(coords[0], coords[1], coords[2]));
                }
                Some("f") => {
                    let face = parts
                        // "f 1/1/1 2/2/2 3/3/3" keeps only the position index
                        .map(|p| p.split('/').next().unwrap_or(p).parse::<u32>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| format!("line {}: bad face: {}", number + 1, e))?;
                    if face.len() != 3 || face.contains(&0) {
                        return Err(format!("line {}: faces must be triangles with 1-based indices", number + 1).into());
                    }
                    indices.extend(face.iter().map(|i| i - 1));
                }
                _ => {}
            }
        }

        if let Some(&max) = indices.iter().max() {
            if max as usize >= vertices.len() {
                return Err(format!("face index {} out of range ({} vertices)", max + 1, vertices.len()).into());
            }
        }
        Ok(Self { vertices, indices })
    }
}

/// Resource loader for OBJ files
pub fn load_obj(path: &Path) -> Result<MeshData, BoxError> {
    let source = fs::read_to_string(path)?;
    MeshData::parse_obj(&source)
}
