use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use itertools::kmerge_by;
use tracing::{debug, info};

use common::codec::{output_file_name, read_records, write_record};
use common::{Job, KeyValue, Workload};

/// Merge every partition file of one reduce shard and run the reduce
/// function once per distinct key.
///
/// The partitions are already sorted by key, so a k-way merge yields all
/// records of a key next to each other without sorting again. Output goes
/// to a temporary file that is renamed to `mr-out-<reduce index>`.
pub fn perform_reduce(job: &Job, workload: &Workload, work_dir: &Path) -> Result<PathBuf> {
    info!(
        "Starting reduce task {} over {} partitions",
        job,
        job.inputs.len()
    );

    let streams = job
        .inputs
        .iter()
        .map(|name| -> Result<_> {
            let path = work_dir.join(name);
            let file =
                File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
            Ok(read_records(BufReader::new(file)))
        })
        .collect::<Result<Vec<_>>>()?;

    // Read errors sort first so they surface as soon as they happen.
    let merged = kmerge_by(streams, |a: &Result<KeyValue>, b: &Result<KeyValue>| {
        match (a, b) {
            (Ok(a), Ok(b)) => a.key < b.key,
            (Err(_), _) => true,
            (Ok(_), Err(_)) => false,
        }
    });

    let temp = tempfile::Builder::new()
        .prefix("temp_reduce_")
        .tempfile_in(work_dir)
        .with_context(|| format!("cannot create temp file in {}", work_dir.display()))?;
    let mut out_file = BufWriter::new(temp);

    let mut previous_key: Option<Bytes> = None;
    let mut values: Vec<Bytes> = vec![];
    let mut groups = 0usize;

    for record in merged {
        let kv = record?;

        if previous_key.as_ref() == Some(&kv.key) {
            values.push(kv.value);
            continue;
        }

        if let Some(key) = previous_key.take() {
            write_group(&mut out_file, workload, key, &mut values)?;
            groups += 1;
        }
        previous_key = Some(kv.key);
        values.push(kv.value);
    }

    // write the last group to the output
    if let Some(key) = previous_key {
        write_group(&mut out_file, workload, key, &mut values)?;
        groups += 1;
    }

    out_file.flush()?;
    let temp = out_file.into_inner().map_err(|e| e.into_error())?;

    let path = work_dir.join(output_file_name(job.index));
    temp.persist(&path)
        .with_context(|| format!("cannot rename output to {}", path.display()))?;

    debug!("reduce task {} wrote {} keys", job, groups);
    Ok(path)
}

fn write_group<W: Write>(
    out: &mut W,
    workload: &Workload,
    key: Bytes,
    values: &mut Vec<Bytes>,
) -> Result<()> {
    let result = (workload.reduce_fn)(key.clone(), Box::new(values.drain(..)))?;
    write_record(out, &key, &result)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn word_count() -> Workload {
        workload::try_named("wc").unwrap()
    }

    /// Reduce that lists its values in arrival order.
    fn concat(_key: Bytes, values: Box<dyn Iterator<Item = Bytes> + '_>) -> Result<Bytes> {
        let mut values = values
            .map(|v| String::from_utf8(v.to_vec()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        values.sort();
        Ok(Bytes::from(values.join(",")))
    }

    fn concat_workload() -> Workload {
        Workload {
            map_fn: word_count().map_fn,
            reduce_fn: concat,
        }
    }

    fn partition(dir: &Path, name: &str, lines: &[&str]) -> String {
        let mut contents = lines.join("\n");
        if !lines.is_empty() {
            contents.push('\n');
        }
        fs::write(dir.join(name), contents).unwrap();
        name.to_string()
    }

    #[test]
    fn merges_sorted_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            partition(dir.path(), "mr-0-1", &["a 1", "c 1", "c 1"]),
            partition(dir.path(), "mr-1-1", &["b 1", "c 1", "d 1"]),
            partition(dir.path(), "mr-2-1", &["a 1"]),
        ];
        let job = Job::reduce(1, inputs, 2);

        let path = perform_reduce(&job, &word_count(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "mr-out-1");
        assert_eq!(fs::read_to_string(path).unwrap(), "a 2\nb 1\nc 3\nd 1\n");
    }

    #[test]
    fn groups_are_the_union_of_all_values() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            partition(dir.path(), "mr-0-0", &["k x", "z p"]),
            partition(dir.path(), "mr-1-0", &["k y", "k w"]),
        ];
        let job = Job::reduce(0, inputs, 1);

        let path = perform_reduce(&job, &concat_workload(), dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "k w,x,y\nz p\n");
    }

    #[test]
    fn input_order_does_not_matter() {
        let dir = tempfile::tempdir().unwrap();
        let a = partition(dir.path(), "mr-0-0", &["a 1", "b 1"]);
        let b = partition(dir.path(), "mr-1-0", &["a 1", "c 1"]);

        let forward = perform_reduce(
            &Job::reduce(0, vec![a.clone(), b.clone()], 1),
            &word_count(),
            dir.path(),
        )
        .unwrap();
        let forward = fs::read(forward).unwrap();
        let backward = perform_reduce(&Job::reduce(0, vec![b, a], 1), &word_count(), dir.path())
            .unwrap();
        assert_eq!(forward, fs::read(backward).unwrap());
    }

    #[test]
    fn empty_partitions_give_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            partition(dir.path(), "mr-0-0", &[]),
            partition(dir.path(), "mr-1-0", &[]),
        ];
        let path = perform_reduce(&Job::reduce(0, inputs, 1), &word_count(), dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");

        let path = perform_reduce(&Job::reduce(3, vec![], 4), &word_count(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "mr-out-3");
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn missing_partition_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::reduce(0, vec!["mr-9-0".to_string()], 1);
        assert!(perform_reduce(&job, &word_count(), dir.path()).is_err());
        assert!(!dir.path().join("mr-out-0").exists());
    }

    #[test]
    fn malformed_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![partition(dir.path(), "mr-0-0", &["a 1", "garbage"])];
        assert!(perform_reduce(&Job::reduce(0, inputs, 1), &word_count(), dir.path()).is_err());
    }
}
