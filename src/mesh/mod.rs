//! Mesh loading and generation.
//!
//! This module contains the tetrahedral mesh format consumed by soft bodies
//! and the shared utilities used to build it:
//! - Flat-buffer geometry helpers and the [`Spatial`] trait
//! - The [`TetMesh`] asset format with JSON, bincode and tetgen loaders
//! - Procedural meshes (single tetrahedron, cell blocks)

pub mod common;
pub mod tetrahedral;
pub mod tgimport;

// Re-export common types for convenience
pub use common::{boxes_overlap, dedup_with_warning, sorted_key, tet_volume, Spatial};

// Re-export specific mesh types
pub use tetrahedral::TetMesh;
