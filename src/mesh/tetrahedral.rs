//! Tetrahedral mesh interchange format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::common::{dedup_with_warning, sorted_key, tet_volume, Spatial};
use super::tgimport::TetgenParser;
use crate::error::{Error, Result};
use crate::vector::Vec3;

/// Flat buffers describing a tetrahedral mesh.
///
/// Field names serialize to the keys of the JSON asset format
/// (`verts`, `tetIds`, `tetEdgeIds`, `tetSurfaceTriIds`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TetMesh {
    /// Mesh name.
    #[serde(default)]
    pub name: String,
    /// Vertex positions, 3 floats per vertex.
    pub verts: Vec<f32>,
    /// Tetrahedra, 4 vertex indices each.
    #[serde(rename = "tetIds")]
    pub tet_ids: Vec<u32>,
    /// Edges of the tetrahedra, 2 vertex indices each.
    #[serde(rename = "tetEdgeIds", default)]
    pub edge_ids: Vec<u32>,
    /// Outer surface triangles, 3 vertex indices each, wound outward.
    #[serde(rename = "tetSurfaceTriIds", default)]
    pub surface_tri_ids: Vec<u32>,
}

impl TetMesh {
    /// Number of vertices.
    #[must_use]
    pub fn vert_count(&self) -> usize {
        self.verts.len() / 3
    }

    /// Number of tetrahedra.
    #[must_use]
    pub fn tet_count(&self) -> usize {
        self.tet_ids.len() / 4
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_ids.len() / 2
    }

    /// Number of surface triangles.
    #[must_use]
    pub fn surface_tri_count(&self) -> usize {
        self.surface_tri_ids.len() / 3
    }

    /// Check buffer strides and index ranges.
    ///
    /// # Errors
    /// Returns an error describing the first malformed buffer.
    pub fn validate(&self) -> Result<()> {
        let strides: [(&'static str, usize, usize); 4] = [
            ("verts", self.verts.len(), 3),
            ("tet_ids", self.tet_ids.len(), 4),
            ("edge_ids", self.edge_ids.len(), 2),
            ("surface_tri_ids", self.surface_tri_ids.len(), 3),
        ];
        for (name, len, stride) in strides {
            if len % stride != 0 {
                return Err(Error::BufferLength { name, len, stride });
            }
        }
        if self.verts.is_empty() || self.tet_ids.is_empty() {
            return Err(Error::EmptyMesh(self.name.clone()));
        }

        let count = self.vert_count();
        let indices: [(&'static str, &[u32]); 3] = [
            ("tet_ids", &self.tet_ids),
            ("edge_ids", &self.edge_ids),
            ("surface_tri_ids", &self.surface_tri_ids),
        ];
        for (name, ids) in indices {
            if let Some(&index) = ids.iter().find(|&&id| id as usize >= count) {
                return Err(Error::IndexOutOfRange {
                    name,
                    index: index as usize,
                    count,
                });
            }
        }
        if let Some(p) = self.verts.iter().find(|c| !c.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "verts",
                reason: format!("non-finite coordinate {p}"),
            });
        }
        Ok(())
    }

    /// Fill in edges and surface triangles when the source omitted them.
    pub fn complete(&mut self) {
        if self.edge_ids.is_empty() {
            self.derive_edges();
        }
        if self.surface_tri_ids.is_empty() {
            self.derive_surface();
        }
    }

    /// Replace the edge list with the unique edges of all tetrahedra.
    pub fn derive_edges(&mut self) {
        const PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let edges: Vec<[u32; 2]> = self
            .tet_ids
            .chunks_exact(4)
            .flat_map(|t| PAIRS.iter().map(move |&(a, b)| [t[a], t[b]]))
            .collect();
        // Every interior edge is shared by several tets, so duplicates are expected here.
        let mut seen = std::collections::HashSet::new();
        self.edge_ids = edges
            .into_iter()
            .filter(|e| seen.insert(sorted_key(*e)))
            .flatten()
            .collect();
        debug!(edges = self.edge_count(), "Derived edges from tetrahedra");
    }

    /// Replace the surface with the faces that belong to exactly one
    /// tetrahedron, wound so their normal points away from that tetrahedron.
    pub fn derive_surface(&mut self) {
        const FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];
        let mut faces: HashMap<[u32; 3], ([u32; 3], usize)> = HashMap::new();
        let mut order = Vec::new();
        for t in self.tet_ids.chunks_exact(4) {
            let ids = [t[0] as usize, t[1] as usize, t[2] as usize, t[3] as usize];
            let flip = tet_volume(&self.verts, ids) < 0.0;
            for face in FACES {
                let mut tri = [t[face[0]], t[face[1]], t[face[2]]];
                if flip {
                    tri.swap(1, 2);
                }
                let key = sorted_key(tri);
                let entry = faces.entry(key).or_insert_with(|| {
                    order.push(key);
                    (tri, 0)
                });
                entry.1 += 1;
            }
        }
        self.surface_tri_ids = order
            .iter()
            .filter_map(|key| faces.get(key))
            .filter(|(_, uses)| *uses == 1)
            .flat_map(|(tri, _)| *tri)
            .collect();
        debug!(
            triangles = self.surface_tri_count(),
            "Derived surface from tetrahedra"
        );
    }

    /// Drop duplicate tetrahedra and edges.
    pub fn dedup(&mut self) {
        let tets: Vec<[u32; 4]> = self
            .tet_ids
            .chunks_exact(4)
            .map(|t| [t[0], t[1], t[2], t[3]])
            .collect();
        self.tet_ids = dedup_with_warning(tets, |t| sorted_key(*t), "tetrahedron")
            .into_iter()
            .flatten()
            .collect();
        let edges: Vec<[u32; 2]> = self
            .edge_ids
            .chunks_exact(2)
            .map(|e| [e[0], e[1]])
            .collect();
        self.edge_ids = dedup_with_warning(edges, |e| sorted_key(*e), "edge")
            .into_iter()
            .flatten()
            .collect();
    }

    /// Recentre the mesh so it rests on `y = 0` centred on the xz origin, and
    /// optionally scale it so its bounding-box diagonal equals `length`.
    pub fn fit_to_ground(&mut self, length: Option<f32>) {
        let (min, max) = self.verts.bounding_box();
        let center = [(min[0] + max[0]) * 0.5, min[1], (min[2] + max[2]) * 0.5];
        self.verts.translate([-center[0], -center[1], -center[2]]);

        if let Some(length) = length {
            let diagonal = (0..3).map(|k| (max[k] - min[k]).powi(2)).sum::<f32>().sqrt();
            if diagonal > 0.0 {
                let s = length / diagonal;
                self.verts.iter_mut().for_each(|c| *c *= s);
            }
        }
    }

    /// A single tetrahedron with corners at the origin and `size` along each axis.
    #[must_use]
    pub fn tetrahedron(size: f32) -> Self {
        let mut mesh = Self {
            name: "tetrahedron".into(),
            verts: vec![0.0, 0.0, 0.0, size, 0.0, 0.0, 0.0, size, 0.0, 0.0, 0.0, size],
            tet_ids: vec![0, 1, 2, 3],
            ..Self::default()
        };
        mesh.complete();
        mesh
    }

    /// An `nx` x `ny` x `nz` block of cubic cells of side `cell`, each split
    /// into six tetrahedra along its main diagonal. The block's minimum corner
    /// sits at the origin.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn block(nx: usize, ny: usize, nz: usize, cell: f32) -> Self {
        const AXES: [[usize; 3]; 3] = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];
        const ORDERS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let (nx, ny, nz) = (nx.max(1), ny.max(1), nz.max(1));
        let id = |i: usize, j: usize, k: usize| ((i * (ny + 1) + j) * (nz + 1) + k) as u32;

        let mut verts = Vec::with_capacity(3 * (nx + 1) * (ny + 1) * (nz + 1));
        for i in 0..=nx {
            for j in 0..=ny {
                for k in 0..=nz {
                    verts.extend([i as f32 * cell, j as f32 * cell, k as f32 * cell]);
                }
            }
        }

        let mut tet_ids = Vec::with_capacity(24 * nx * ny * nz);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    for order in ORDERS {
                        let mut corner = [i, j, k];
                        let mut tet = [id(i, j, k); 4];
                        for (slot, &axis) in order.iter().enumerate() {
                            for d in 0..3 {
                                corner[d] += AXES[axis][d];
                            }
                            tet[slot + 1] = id(corner[0], corner[1], corner[2]);
                        }
                        let ids = tet.map(|v| v as usize);
                        if tet_volume(&verts, ids) < 0.0 {
                            tet.swap(2, 3);
                        }
                        tet_ids.extend(tet);
                    }
                }
            }
        }

        let mut mesh = Self {
            name: format!("block_{nx}x{ny}x{nz}"),
            verts,
            tet_ids,
            ..Self::default()
        };
        mesh.complete();
        mesh
    }

    /// Load tetrahedral mesh from tetgen files.
    ///
    /// # Errors
    /// Returns an error if files cannot be read or parsed.
    #[tracing::instrument]
    pub fn from_files(prefix: &str) -> Result<Self> {
        let nodes = TetgenParser::load_vertices(prefix)?;
        let edges = TetgenParser::load_edges(prefix, nodes.base)?;
        let faces = TetgenParser::load_faces(prefix, nodes.base)?;
        let tets = TetgenParser::load_tetrahedra(prefix, nodes.base)?;

        let mut result = Self {
            name: prefix.to_string(),
            verts: nodes.verts,
            tet_ids: tets.into_iter().flatten().collect(),
            edge_ids: edges.into_iter().flatten().collect(),
            // Tetgen .face files may include interior faces; the surface is
            // rebuilt from the tetrahedra instead when none are present.
            surface_tri_ids: faces.into_iter().flatten().collect(),
        };
        result.dedup();
        result.complete();
        result.validate()?;

        info!(
            vertices = result.vert_count(),
            edges = result.edge_count(),
            faces = result.surface_tri_count(),
            tetrahedra = result.tet_count(),
            "Mesh loaded from tetgen files"
        );

        Ok(result)
    }

    /// Load a mesh from the JSON asset format.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the mesh is malformed.
    #[tracing::instrument]
    pub fn from_json(filename: &str) -> Result<Self> {
        let data = std::fs::read(filename)?;
        debug!("Parsing {} bytes of JSON", data.len());
        let mut mesh: Self = serde_json::from_slice(&data)?;
        if mesh.name.is_empty() {
            mesh.name = filename.to_string();
        }
        mesh.validate()?;
        mesh.complete();
        Ok(mesh)
    }

    /// Decode a bincode buffer and check the result is a usable mesh.
    fn decode(data: &[u8]) -> Result<Self> {
        let mesh: Self = bincode::deserialize(data)?;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Read a mesh from a bincode cache written by
    /// [`export_to_bincode`](Self::export_to_bincode).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, decoded or validated.
    #[tracing::instrument]
    pub fn from_bincode(filename: &str) -> Result<Self> {
        let data = std::fs::read(filename)?;
        debug!(bytes = data.len(), "Decoding bincode mesh");
        Self::decode(&data)
    }

    /// Write the mesh as a bincode cache. Malformed meshes are refused, and
    /// the encoded bytes are decoded again before returning.
    ///
    /// # Errors
    /// Returns an error if the mesh is invalid or the file cannot be written.
    #[tracing::instrument(skip(self), fields(name = %self.name))]
    pub fn export_to_bincode(&self, output_path: &str) -> Result<()> {
        self.validate()?;
        let encoded = bincode::serialize(self)?;
        std::fs::write(output_path, &encoded)?;
        let decoded = Self::decode(&encoded)?;
        debug_assert_eq!(&decoded, self);
        info!(
            output_path,
            bytes = encoded.len(),
            tetrahedra = decoded.tet_count(),
            "Exported mesh"
        );
        Ok(())
    }

    /// Load mesh with automatic format detection: `.bin` is bincode, `.json`
    /// is the JSON asset format, anything else is a tetgen file prefix.
    ///
    /// # Errors
    /// Returns an error if loading fails.
    #[tracing::instrument]
    pub fn load_mesh(mesh_path: &str) -> Result<Self> {
        info!(mesh_path, "Attempting to load mesh");

        let extension = std::path::Path::new(mesh_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let mesh = match extension.as_deref() {
            Some("bin") => {
                debug!("Loading as bincode file");
                Self::from_bincode(mesh_path)
            }
            Some("json") => {
                debug!("Loading as JSON file");
                Self::from_json(mesh_path)
            }
            _ => {
                debug!("Loading as tetgen files");
                Self::from_files(mesh_path)
            }
        };

        match &mesh {
            Ok(m) => {
                info!(
                    vertices = m.vert_count(),
                    edges = m.edge_count(),
                    faces = m.surface_tri_count(),
                    tetrahedra = m.tet_count(),
                    "Mesh loaded successfully"
                );
            }
            Err(e) => {
                error!(mesh_path, error = %e, "Failed to load mesh");
            }
        }

        mesh
    }

    /// Total signed volume of the rest shape.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.tet_ids
            .chunks_exact(4)
            .map(|t| {
                let ids = [t[0] as usize, t[1] as usize, t[2] as usize, t[3] as usize];
                tet_volume(&self.verts, ids)
            })
            .sum()
    }

    /// Bounding box of the vertices.
    #[must_use]
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.verts.bounding_box()
    }
}
