//! Error type shared by mesh loading, body construction and the world API.

use thiserror::Error;

/// Errors raised while building or configuring a simulation.
///
/// Runtime numerical degeneracies (collapsed tetrahedra, zero-length edges,
/// singular barycentric matrices) are never reported through this type; the
/// solvers skip them for the current step.
#[derive(Error, Debug)]
pub enum Error {
    /// A flat buffer does not hold a whole number of elements.
    #[error("buffer `{name}` has length {len}, expected a multiple of {stride}")]
    BufferLength {
        /// Buffer name.
        name: &'static str,
        /// Actual length.
        len: usize,
        /// Element stride.
        stride: usize,
    },

    /// An index buffer refers to a vertex that does not exist.
    #[error("`{name}` refers to vertex {index}, but the mesh has {count} vertices")]
    IndexOutOfRange {
        /// Buffer name.
        name: &'static str,
        /// Offending vertex index.
        index: usize,
        /// Number of vertices.
        count: usize,
    },

    /// The mesh has no vertices or no tetrahedra.
    #[error("mesh `{0}` has no vertices or no tetrahedra")]
    EmptyMesh(String),

    /// A configuration value is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// No body is stored under this id.
    #[error("no body with id {0}")]
    NoSuchBody(usize),

    /// The body exists but is not a soft body.
    #[error("body {0} is not a soft body")]
    NotASoftBody(usize),

    /// A vertex id is out of range for the addressed body.
    #[error("vertex {vertex} out of range for body {body} with {count} vertices")]
    NoSuchVertex {
        /// Body id.
        body: usize,
        /// Vertex id.
        vertex: usize,
        /// Number of vertices of the body.
        count: usize,
    },

    /// A tetgen file could not be parsed.
    #[error("failed to parse {file}: {reason}")]
    Parse {
        /// File being parsed.
        file: String,
        /// Parser message.
        reason: String,
    },

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Bincode (de)serialization failure.
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reject values that fail `ok`, naming the parameter.
pub(crate) fn ensure(ok: bool, name: &'static str, reason: impl Into<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            reason: reason.into(),
        })
    }
}
