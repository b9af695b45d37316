//! Loading the whitespace-delimited vertex, edge and tree tables

use crate::error::{Error, Result};
use crate::graph::{Edge, NodeId};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// One row of the vertex table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub id: NodeId,
    pub name: String,
}

/// One row of a tree file: the node's hierarchical path, its flow and its name
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub path: String,
    pub flow: f32,
    pub name: String,
}

fn schema(fields: &[(&str, DataType)]) -> SchemaRef {
    Arc::new(Schema::from_iter(
        fields
            .iter()
            .map(|(name, dtype)| (PlSmallStr::from_str(name), dtype.clone())),
    ))
}

fn read_table(path: &Path, schema: SchemaRef, comments: bool) -> Result<DataFrame> {
    if !path.exists() {
        return Err(Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        ));
    }

    log::debug!("Reading table {}", path.display());

    CsvReadOptions::default()
        .with_has_header(false)
        .with_schema(Some(schema))
        .map_parse_options(|opts| {
            opts.with_separator(b' ')
                .with_quote_char(Some(b'"'))
                .with_comment_prefix(comments.then_some("#"))
                .with_truncate_ragged_lines(true)
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|source| Error::Table {
            path: path.to_path_buf(),
            source,
        })
}

fn table_error(path: &Path) -> impl Fn(PolarsError) -> Error + '_ {
    move |source| Error::Table {
        path: path.to_path_buf(),
        source,
    }
}

/// Load the `node_id node_name` table written by the splitter
pub fn load_vertices(path: &Path) -> Result<Vec<Vertex>> {
    let df = read_table(
        path,
        schema(&[("node_id", DataType::Int64), ("node_name", DataType::String)]),
        false,
    )?;

    let ids = df.column("node_id").and_then(|c| c.i64()).map_err(table_error(path))?;
    let names = df.column("node_name").and_then(|c| c.str()).map_err(table_error(path))?;

    let vertices: Vec<Vertex> = ids
        .into_iter()
        .zip(names.into_iter())
        .filter_map(|(id, name)| {
            Some(Vertex {
                id: id?,
                name: name?.to_string(),
            })
        })
        .collect();

    log::info!("Loaded {} vertices from {}", vertices.len(), path.display());
    Ok(vertices)
}

/// Load the `source target` table written by the splitter
pub fn load_edges(path: &Path) -> Result<Vec<Edge>> {
    let df = read_table(
        path,
        schema(&[("source", DataType::Int64), ("target", DataType::Int64)]),
        false,
    )?;

    let sources = df.column("source").and_then(|c| c.i64()).map_err(table_error(path))?;
    let targets = df.column("target").and_then(|c| c.i64()).map_err(table_error(path))?;

    // Rows with an unresolved endpoint carry no usable edge
    let edges: Vec<Edge> = sources
        .into_iter()
        .zip(targets.into_iter())
        .filter_map(|(source, target)| Some(Edge::new(source?, target?)))
        .collect();

    log::info!("Loaded {} edges from {}", edges.len(), path.display());
    Ok(edges)
}

/// Load a tree file (`path flow "name"` rows, `#` comments)
pub fn load_tree(path: &Path) -> Result<Vec<TreeEntry>> {
    let df = read_table(
        path,
        schema(&[
            ("cl", DataType::String),
            ("flow", DataType::Float32),
            ("node_name", DataType::String),
        ]),
        true,
    )?;

    let df = df
        .lazy()
        .filter(col("cl").is_not_null().and(col("node_name").is_not_null()))
        .collect()
        .map_err(table_error(path))?;

    let paths = df.column("cl").and_then(|c| c.str()).map_err(table_error(path))?;
    let flows = df.column("flow").and_then(|c| c.f32()).map_err(table_error(path))?;
    let names = df.column("node_name").and_then(|c| c.str()).map_err(table_error(path))?;

    let entries: Vec<TreeEntry> = paths
        .into_iter()
        .zip(flows.into_iter())
        .zip(names.into_iter())
        .filter_map(|((cl, flow), name)| {
            Some(TreeEntry {
                path: cl?.to_string(),
                flow: flow.unwrap_or(0.0),
                name: name?.to_string(),
            })
        })
        .collect();

    log::info!("Loaded {} tree entries from {}", entries.len(), path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_vertices_with_quoted_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.txt");
        fs::write(&path, "1 \"alpha beta\"\n2 \"gamma\"\n").unwrap();

        let vertices = load_vertices(&path).unwrap();
        assert_eq!(
            vertices,
            vec![
                Vertex { id: 1, name: "alpha beta".to_string() },
                Vertex { id: 2, name: "gamma".to_string() },
            ]
        );
    }

    #[test]
    fn test_load_edges_keeps_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.txt");
        fs::write(&path, "1 2\n1 2\n2 3\n").unwrap();

        let edges = load_edges(&path).unwrap();
        assert_eq!(edges, vec![Edge::new(1, 2), Edge::new(1, 2), Edge::new(2, 3)]);
    }

    #[test]
    fn test_load_tree_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tree");
        fs::write(
            &path,
            "# path flow name\n1:1 0.5 \"alpha beta\"\n1:2 0.25 \"gamma\"\n2:1 0.25 \"delta\"\n",
        )
        .unwrap();

        let entries = load_tree(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "1:1");
        assert_eq!(entries[0].name, "alpha beta");
        assert!((entries[1].flow - 0.25).abs() < f32::EPSILON);
        assert_eq!(entries[2].name, "delta");
    }

    #[test]
    fn test_load_tree_ignores_trailing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tree");
        fs::write(&path, "# path flow name node_id\n1:1 0.5 \"a\" 17\n").unwrap();

        let entries = load_tree(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_vertices(&dir.path().join("absent.txt")),
            Err(Error::Io { .. })
        ));
    }
}
