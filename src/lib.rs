//! Position-based dynamics for tetrahedral soft bodies and rigid spheres.
//!
//! A [`World`] owns [`Body`] values and advances them one tick at a time:
//! gravity integration, an optional grab, a fixed number of Gauss-Seidel
//! constraint passes interleaved with body-to-body collision, container
//! contact, and finally velocity derivation from the position change.

#![warn(clippy::pedantic)]
#![warn(missing_docs)]

pub mod body;
pub mod boundary;
pub mod collision;
pub mod error;
pub mod hash;
pub mod mesh;
pub mod softbody;
pub mod sphere;
pub mod vector;
pub mod world;

pub use body::{Body, Entity};
pub use boundary::Boundary;
pub use collision::{check_collision, solve_collision, ContactParams};
pub use error::{Error, Result};
pub use hash::SpatialHash;
pub use mesh::TetMesh;
pub use softbody::SoftBody;
pub use sphere::RigidSphere;
pub use world::{Grab, SimParams, World};
