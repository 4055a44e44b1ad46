//! Readers for tetgen output (`.node`, `.ele`, `.edge`, `.face`).
//!
//! Each reader turns one file into the flat index buffers used by [`TetMesh`](super::TetMesh).
//! Tetgen numbers vertices from 0 or 1 depending on its `-z` switch; the base is
//! taken from the first entry of the `.node` file and all indices are shifted to
//! start at 0.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Stateless reader for a tetgen file set sharing one prefix.
pub struct TetgenParser;

/// Vertex buffer plus the index base used by the file set.
pub struct NodeData {
    /// Flat vertex positions.
    pub verts: Vec<f32>,
    /// Index of the first vertex in the files (0 or 1).
    pub base: u32,
}

impl TetgenParser {
    /// Read a count-prefixed tetgen table: a header whose first token is
    /// the row count, then one row per item. `#` comments and blank lines
    /// are skipped.
    fn parse_file<T>(
        filename: &str,
        processor: impl Fn(&[&str]) -> std::result::Result<T, String>,
    ) -> Result<Vec<T>> {
        let parse_err = |reason: String| Error::Parse {
            file: filename.to_string(),
            reason,
        };
        let file = File::open(filename)?;

        let mut lines = BufReader::new(file)
            .lines()
            .map_while(std::result::Result::ok)
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let header = lines.next().ok_or_else(|| parse_err("empty file".into()))?;
        let count: usize = header
            .split_whitespace()
            .next()
            .ok_or_else(|| parse_err("invalid first line".into()))?
            .parse()
            .map_err(|e| parse_err(format!("invalid item count: {e}")))?;

        debug!(count, "Reading tetgen table");

        let items = lines
            .take(count)
            .map(|line| {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                processor(&tokens).map_err(&parse_err)
            })
            .collect::<Result<Vec<T>>>()?;

        if items.len() == count {
            Ok(items)
        } else {
            Err(parse_err(format!("expected {count} items, found {}", items.len())))
        }
    }

    /// Parse `count` values of type `T` from tokens starting at a given position.
    fn parse_values<T: std::str::FromStr>(
        tokens: &[&str],
        start: usize,
        count: usize,
    ) -> std::result::Result<Vec<T>, String> {
        tokens
            .get(start..start + count)
            .ok_or_else(|| format!("expected {count} values on line `{}`", tokens.join(" ")))?
            .iter()
            .map(|&t| t.parse().map_err(|_| format!("invalid value `{t}`")))
            .collect()
    }

    /// Parse indices and rebase them to start from 0.
    fn parse_indices(
        tokens: &[&str],
        count: usize,
        base: u32,
    ) -> std::result::Result<Vec<u32>, String> {
        Self::parse_values::<u32>(tokens, 1, count)?
            .into_iter()
            .map(|id| {
                id.checked_sub(base)
                    .ok_or_else(|| format!("index {id} below base {base}"))
            })
            .collect()
    }

    /// Read vertex coordinates from `<prefix>.node`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    #[tracing::instrument]
    pub fn load_vertices(prefix: &str) -> Result<NodeData> {
        let rows = Self::parse_file(&format!("{prefix}.node"), |tokens| {
            let id = Self::parse_values::<u32>(tokens, 0, 1)?[0];
            let coords = Self::parse_values::<f32>(tokens, 1, 3)?;
            Ok((id, [coords[0], coords[1], coords[2]]))
        })?;
        let base = rows.first().map_or(0, |(id, _)| *id).min(1);
        let verts = rows.into_iter().flat_map(|(_, p)| p).collect();
        Ok(NodeData { verts, base })
    }

    /// Read `<prefix>.edge`, or nothing when there is no such file.
    ///
    /// # Errors
    /// Returns an error if the file is present but malformed.
    #[tracing::instrument]
    pub fn load_edges(prefix: &str, base: u32) -> Result<Vec<[u32; 2]>> {
        let edge_file = format!("{prefix}.edge");
        if Path::new(&edge_file).exists() {
            debug!(file = %edge_file, "Reading edges");
            Self::parse_file(&edge_file, |tokens| {
                let ids = Self::parse_indices(tokens, 2, base)?;
                Ok([ids[0], ids[1]])
            })
        } else {
            debug!("No edge file; edges will be derived");
            Ok(Vec::new())
        }
    }

    /// Read `<prefix>.face`, or nothing when there is no such file.
    ///
    /// # Errors
    /// Returns an error if the file is present but malformed.
    #[tracing::instrument]
    pub fn load_faces(prefix: &str, base: u32) -> Result<Vec<[u32; 3]>> {
        let face_file = format!("{prefix}.face");
        if Path::new(&face_file).exists() {
            debug!(file = %face_file, "Reading faces");
            Self::parse_file(&face_file, |tokens| {
                let ids = Self::parse_indices(tokens, 3, base)?;
                Ok([ids[0], ids[1], ids[2]])
            })
        } else {
            debug!("No face file; surface will be derived");
            Ok(Vec::new())
        }
    }

    /// Read `<prefix>.ele`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    #[tracing::instrument]
    pub fn load_tetrahedra(prefix: &str, base: u32) -> Result<Vec<[u32; 4]>> {
        let ele_file = format!("{prefix}.ele");
        debug!(file = %ele_file, "Reading tetrahedra");
        Self::parse_file(&ele_file, |tokens| {
            let ids = Self::parse_indices(tokens, 4, base)?;
            Ok([ids[0], ids[1], ids[2], ids[3]])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_one_based_files_are_rebased() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("tet");
        let prefix = prefix.to_str().unwrap();
        fs::write(
            format!("{prefix}.node"),
            "# nodes\n4 3 0 0\n1 0 0 0\n2 1 0 0\n3 0 1 0\n4 0 0 1\n",
        )
        .unwrap();
        fs::write(format!("{prefix}.ele"), "1 4 0\n1 1 2 3 4\n").unwrap();

        let nodes = TetgenParser::load_vertices(prefix).unwrap();
        assert_eq!(nodes.base, 1);
        assert_eq!(nodes.verts.len(), 12);
        let tets = TetgenParser::load_tetrahedra(prefix, nodes.base).unwrap();
        assert_eq!(tets, vec![[0, 1, 2, 3]]);
        assert!(TetgenParser::load_edges(prefix, nodes.base).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("bad");
        let prefix = prefix.to_str().unwrap();
        fs::write(format!("{prefix}.node"), "3 3 0 0\n0 0 0 0\n").unwrap();
        assert!(matches!(
            TetgenParser::load_vertices(prefix),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_bad_token_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("tok");
        let prefix = prefix.to_str().unwrap();
        fs::write(format!("{prefix}.ele"), "1 4 0\n0 0 1 x 3\n").unwrap();
        assert!(TetgenParser::load_tetrahedra(prefix, 0).is_err());
    }
}
