//! Splitting a Pajek network file into vertex and edge tables

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Locations of the two tables derived from a Pajek file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFiles {
    pub vertices: PathBuf,
    pub edges: PathBuf,
}

impl SplitFiles {
    /// `<stem>_vertices.txt` and `<stem>_edges.txt` next to the network file
    pub fn for_network(network_file: &Path) -> Self {
        let stem = network_file.with_extension("");
        let stem = stem.to_string_lossy();
        Self {
            vertices: PathBuf::from(format!("{stem}_vertices.txt")),
            edges: PathBuf::from(format!("{stem}_edges.txt")),
        }
    }

    pub fn exist(&self) -> bool {
        self.vertices.exists() && self.edges.exists()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Vertices,
    Edges,
    /// `*Edgeslist` / `*Arcslist`: one source followed by all its targets
    EdgeList,
    Other,
}

/// Split `network_file` unless both derived tables already exist.
///
/// Existing tables are reused as-is.
pub fn split_pajek(network_file: &Path) -> Result<SplitFiles> {
    let files = SplitFiles::for_network(network_file);
    if files.exist() {
        log::debug!(
            "pajek split files {} and {} already exist. using these.",
            files.vertices.display(),
            files.edges.display()
        );
        return Ok(files);
    }

    log::debug!(
        "splitting pajek file {} into {} and {}",
        network_file.display(),
        files.vertices.display(),
        files.edges.display()
    );

    let input = File::open(network_file).map_err(|e| Error::io(network_file, e))?;
    let vertices_tmp = tmp_path(&files.vertices);
    let edges_tmp = tmp_path(&files.edges);

    let (vertex_count, edge_count) = write_split(
        BufReader::new(input),
        network_file,
        &vertices_tmp,
        &edges_tmp,
    )
    .inspect_err(|_| {
        let _ = fs::remove_file(&vertices_tmp);
        let _ = fs::remove_file(&edges_tmp);
    })?;

    fs::rename(&vertices_tmp, &files.vertices).map_err(|e| Error::io(&files.vertices, e))?;
    fs::rename(&edges_tmp, &files.edges).map_err(|e| Error::io(&files.edges, e))?;

    log::info!(
        "Split {} into {} vertices and {} edges",
        network_file.display(),
        vertex_count,
        edge_count
    );

    Ok(files)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_split(
    reader: impl BufRead,
    source: &Path,
    vertices_path: &Path,
    edges_path: &Path,
) -> Result<(usize, usize)> {
    let mut vertices = BufWriter::new(
        File::create(vertices_path).map_err(|e| Error::io(vertices_path, e))?,
    );
    let mut edges = BufWriter::new(File::create(edges_path).map_err(|e| Error::io(edges_path, e))?);

    let mut section = Section::Preamble;
    let mut vertex_count = 0;
    let mut edge_count = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| Error::io(source, e))?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if let Some(header) = line.strip_prefix('*') {
            let keyword = header.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
            section = match keyword.as_str() {
                "vertices" => Section::Vertices,
                "edges" | "arcs" => Section::Edges,
                "edgeslist" | "arcslist" => Section::EdgeList,
                _ => Section::Other,
            };
            continue;
        }

        match section {
            Section::Vertices => {
                let (id, name) = parse_vertex(line).ok_or_else(|| Error::Parse {
                    path: source.to_path_buf(),
                    line: line_no,
                    message: format!("malformed vertex line: {line}"),
                })?;
                // Embedded quotes are doubled so the table reader unescapes them
                writeln!(vertices, "{id} \"{}\"", name.replace('"', "\"\""))
                    .map_err(|e| Error::io(vertices_path, e))?;
                vertex_count += 1;
            }
            Section::Edges => {
                let (source_id, target_id) = parse_edge(line).ok_or_else(|| Error::Parse {
                    path: source.to_path_buf(),
                    line: line_no,
                    message: format!("malformed edge line: {line}"),
                })?;
                writeln!(edges, "{source_id} {target_id}").map_err(|e| Error::io(edges_path, e))?;
                edge_count += 1;
            }
            Section::EdgeList => {
                let (source_id, targets) = parse_edge_list(line).ok_or_else(|| Error::Parse {
                    path: source.to_path_buf(),
                    line: line_no,
                    message: format!("malformed edge list line: {line}"),
                })?;
                for target_id in targets {
                    writeln!(edges, "{source_id} {target_id}").map_err(|e| Error::io(edges_path, e))?;
                    edge_count += 1;
                }
            }
            Section::Preamble | Section::Other => {}
        }
    }

    vertices.flush().map_err(|e| Error::io(vertices_path, e))?;
    edges.flush().map_err(|e| Error::io(edges_path, e))?;

    Ok((vertex_count, edge_count))
}

/// `id "name" [attributes...]`, or `id name` when the name has no whitespace
fn parse_vertex(line: &str) -> Option<(i64, &str)> {
    let (id, rest) = line.split_once(char::is_whitespace)?;
    let id = id.parse().ok()?;
    let rest = rest.trim_start();

    let name = match rest.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => rest.split_whitespace().next()?,
    };

    Some((id, name))
}

/// `source target [weight]`
fn parse_edge(line: &str) -> Option<(i64, i64)> {
    let mut tokens = line.split_whitespace();
    let source = tokens.next()?.parse().ok()?;
    let target = tokens.next()?.parse().ok()?;
    Some((source, target))
}

/// `source target1 target2 ...`
fn parse_edge_list(line: &str) -> Option<(i64, Vec<i64>)> {
    let mut tokens = line.split_whitespace();
    let source = tokens.next()?.parse().ok()?;
    let targets = tokens.map(str::parse).collect::<std::result::Result<Vec<i64>, _>>().ok()?;
    Some((source, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = "\
*Vertices 3
1 \"alpha beta\" 0.5
2 \"gamma\"
3 delta
*Arcs 3
1 2 1.0
2 3
% a comment
3 1 2.5
";

    fn write_network(dir: &Path) -> PathBuf {
        let path = dir.join("net.net");
        fs::write(&path, NETWORK).unwrap();
        path
    }

    #[test]
    fn test_split_writes_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let network = write_network(dir.path());

        let files = split_pajek(&network).unwrap();

        assert_eq!(files.vertices, dir.path().join("net_vertices.txt"));
        assert_eq!(files.edges, dir.path().join("net_edges.txt"));
        assert_eq!(
            fs::read_to_string(&files.vertices).unwrap(),
            "1 \"alpha beta\"\n2 \"gamma\"\n3 \"delta\"\n"
        );
        assert_eq!(fs::read_to_string(&files.edges).unwrap(), "1 2\n2 3\n3 1\n");
        assert!(!tmp_path(&files.vertices).exists());
    }

    #[test]
    fn test_split_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let network = write_network(dir.path());

        let files = split_pajek(&network).unwrap();
        let vertices = fs::read(&files.vertices).unwrap();
        let edges = fs::read(&files.edges).unwrap();

        // A changed network must not be re-split once the tables exist
        fs::write(&network, "*Vertices 1\n9 \"other\"\n*Edges\n").unwrap();
        let again = split_pajek(&network).unwrap();

        assert_eq!(again, files);
        assert_eq!(fs::read(&again.vertices).unwrap(), vertices);
        assert_eq!(fs::read(&again.edges).unwrap(), edges);
    }

    #[test]
    fn test_malformed_edge_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("bad.net");
        fs::write(&network, "*Vertices 1\n1 \"a\"\n*Edges\n1 x\n").unwrap();

        match split_pajek(&network) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {other:?}"),
        }
        let files = SplitFiles::for_network(&network);
        assert!(!files.vertices.exists());
        assert!(!tmp_path(&files.edges).exists());
    }

    #[test]
    fn test_arcslist_expands_every_target() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("list.net");
        fs::write(&network, "*Vertices 4\n1 a\n2 b\n3 c\n4 d\n*Arcslist\n1 2 3 4\n3 1\n").unwrap();

        let files = split_pajek(&network).unwrap();
        assert_eq!(fs::read_to_string(&files.edges).unwrap(), "1 2\n1 3\n1 4\n3 1\n");
    }

    #[test]
    fn test_malformed_edge_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("list.net");
        fs::write(&network, "*Vertices 1\n1 a\n*Edgeslist\n1 2 x\n").unwrap();

        assert!(matches!(split_pajek(&network), Err(Error::Parse { line: 4, .. })));
    }

    #[test]
    fn test_quote_in_name_survives_table_load() {
        let dir = tempfile::tempdir().unwrap();
        let network = dir.path().join("quotes.net");
        fs::write(&network, "*Vertices 2\n1 o\"neil\n2 \"b\"\n*Edges\n1 2\n").unwrap();

        let files = split_pajek(&network).unwrap();
        let vertices = crate::data::tables::load_vertices(&files.vertices).unwrap();

        let names: Vec<&str> = vertices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["o\"neil", "b"]);
    }

    #[test]
    fn test_parse_vertex_variants() {
        assert_eq!(parse_vertex("7 \"a b\" 1 2"), Some((7, "a b")));
        assert_eq!(parse_vertex("7   plain"), Some((7, "plain")));
        assert_eq!(parse_vertex("x \"a\""), None);
        assert_eq!(parse_vertex("7 \"unterminated"), None);
    }
}
