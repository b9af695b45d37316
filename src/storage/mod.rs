//! Results persistence module

use crate::cluster::driver::ClusteredGroup;
use crate::error::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Column names of every shard's header row
pub const HEADER: [&str; 3] = ["cl_top", "node_id", "hierInfomap_cl"];

pub const SUMMARY_FILE: &str = "_summary.json";
pub const SUCCESS_FILE: &str = "_SUCCESS";

/// Fail if anything (file, directory, dangling link) already sits at `path`
pub fn ensure_output_absent(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(_) => Err(Error::OutputExists(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn create_output_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::create_dir(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::OutputExists(path.to_path_buf()),
        _ => Error::io(path, e),
    })
}

pub fn shard_file_name(shard: usize) -> String {
    format!("part-{shard:05}.csv.gz")
}

/// Spread whole groups over at most `shards` shards, largest groups first,
/// each onto the currently lightest shard
fn plan_shards(groups: &[ClusteredGroup], shards: usize) -> Vec<Vec<&ClusteredGroup>> {
    let count = shards.min(groups.len()).max(1);
    let mut plan: Vec<Vec<&ClusteredGroup>> = vec![Vec::new(); count];
    let mut load = vec![0usize; count];

    for group in groups.iter().sorted_by(|a, b| b.rows.len().cmp(&a.rows.len()).then_with(|| a.group.cmp(&b.group))) {
        let lightest = (0..count).min_by_key(|&i| (load[i], i)).unwrap_or(0);
        load[lightest] += group.rows.len();
        plan[lightest].push(group);
    }

    plan
}

fn write_shard(path: &Path, groups: &[&ClusteredGroup]) -> Result<usize> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = GzEncoder::new(BufWriter::new(file), Compression::default());

    let mut rows = 0;
    writeln!(writer, "{}", HEADER.join("\t")).map_err(|e| Error::io(path, e))?;
    for row in groups.iter().flat_map(|group| &group.rows) {
        writeln!(writer, "{}\t{}\t{}", row.group, row.node_id, row.label)
            .map_err(|e| Error::io(path, e))?;
        rows += 1;
    }

    writer
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(|e| Error::io(path, e))?;

    Ok(rows)
}

/// Write all rows as tab-separated gzip shards into a new `output_dir`.
///
/// The directory must not exist yet. A group never straddles two shards,
/// and at least one (possibly header-only) shard is always written.
pub fn write_results(groups: &[ClusteredGroup], output_dir: &Path, shards: usize) -> Result<Vec<PathBuf>> {
    create_output_dir(output_dir)?;

    let plan = plan_shards(groups, shards);
    log::info!(
        "Writing {} rows to {} shards in {}",
        groups.iter().map(|g| g.rows.len()).sum::<usize>(),
        plan.len(),
        output_dir.display()
    );

    let written: Vec<(PathBuf, usize)> = plan
        .par_iter()
        .enumerate()
        .map(|(shard, groups)| {
            let path = output_dir.join(shard_file_name(shard));
            write_shard(&path, groups).map(|rows| (path, rows))
        })
        .collect::<Result<_>>()?;

    for (path, rows) in &written {
        log::debug!("wrote {} rows to {}", rows, path.display());
    }

    Ok(written.into_iter().map(|(path, _)| path).collect())
}

/// Write the run summary and the `_SUCCESS` marker, in that order
pub fn finalize_output<T: Serialize>(output_dir: &Path, summary: &T) -> Result<()> {
    let path = output_dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&path, json).map_err(|e| Error::io(&path, e))?;

    let marker = output_dir.join(SUCCESS_FILE);
    File::create(&marker).map_err(|e| Error::io(&marker, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterLabel, ClusterRow, FailureReason, GroupKey, HierPath};
    use crate::error::ClusterError;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn group(key: &str, ids: &[i64], failed: bool) -> ClusteredGroup {
        let rows = ids
            .iter()
            .enumerate()
            .map(|(leaf, &node_id)| ClusterRow {
                group: GroupKey::from(key),
                node_id,
                label: if failed {
                    ClusterLabel::Failed(FailureReason::Routine(ClusterError::NoLinks))
                } else {
                    ClusterLabel::Path(HierPath::new(vec![1, leaf as u32 + 1]))
                },
            })
            .collect();
        ClusteredGroup {
            group: GroupKey::from(key),
            rows,
            failure: failed.then_some(ClusterError::NoLinks),
        }
    }

    fn read_gz(path: &Path) -> String {
        let mut text = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[test]
    fn test_existing_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ensure_output_absent(dir.path()),
            Err(Error::OutputExists(_))
        ));
        assert!(ensure_output_absent(&dir.path().join("fresh")).is_ok());

        let groups = [group("1", &[1], false)];
        assert!(matches!(
            write_results(&groups, dir.path(), 1),
            Err(Error::OutputExists(_))
        ));
    }

    #[test]
    fn test_shard_contents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let groups = [group("1", &[1, 2], false), group("2", &[3], true)];

        let shards = write_results(&groups, &out, 1).unwrap();

        assert_eq!(shards, vec![out.join("part-00000.csv.gz")]);
        assert_eq!(
            read_gz(&shards[0]),
            "cl_top\tnode_id\thierInfomap_cl\n1\t1\t1:1\n1\t2\t1:2\n2\t3\tINFOMAP_FAILED\n"
        );
    }

    #[test]
    fn test_groups_never_straddle_shards() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let groups = [
            group("1", &[1, 2, 3, 4], false),
            group("2", &[5, 6], false),
            group("3", &[7, 8], false),
        ];

        let shards = write_results(&groups, &out, 8).unwrap();
        assert_eq!(shards.len(), 3);

        let mut seen = Vec::new();
        for shard in &shards {
            let text = read_gz(shard);
            let mut lines = text.lines();
            assert_eq!(lines.next(), Some("cl_top\tnode_id\thierInfomap_cl"));
            let keys: Vec<&str> = lines.map(|l| l.split('\t').next().unwrap()).dedup().collect();
            assert_eq!(keys.len(), 1);
            seen.push(keys[0].to_string());
        }
        seen.sort();
        assert_eq!(seen, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_result_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");

        let shards = write_results(&[], &out, 4).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(read_gz(&shards[0]), "cl_top\tnode_id\thierInfomap_cl\n");
    }

    #[test]
    fn test_finalize_writes_marker() {
        let dir = tempfile::tempdir().unwrap();
        finalize_output(dir.path(), &serde_json::json!({ "rows": 3 })).unwrap();

        assert!(dir.path().join(SUCCESS_FILE).exists());
        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["rows"], 3);
    }
}
