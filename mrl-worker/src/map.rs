use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use common::codec::{partition_file_name, write_record};
use common::{shard_for, Job, KeyValue, Workload};

/// Run the map function over the job's input shard and split its output
/// into one sorted partition file per reduce shard.
///
/// Each partition is written to a temporary file in `work_dir` and then
/// renamed to `mr-<map index>-<reduce index>`, so readers never see a
/// half-written file. Every reduce shard gets a file, even an empty one.
pub fn perform_map(job: &Job, workload: &Workload, work_dir: &Path) -> Result<Vec<PathBuf>> {
    let source = job
        .inputs
        .first()
        .ok_or_else(|| anyhow!("map job {} has no input", job))?;
    info!("Starting map task {} on `{}`", job, source);

    let contents = fs::read(source).with_context(|| format!("cannot read {}", source))?;

    let mut records = (workload.map_fn)(KeyValue::new(source.clone(), contents))?
        .collect::<Result<Vec<_>>>()?;

    // Stable, so equal keys keep emission order.
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let shard_count = job.shard_count.max(1);
    let mut partitions = (0..shard_count)
        .map(|_| -> Result<_> {
            let file = tempfile::Builder::new()
                .prefix("temp_map_")
                .tempfile_in(work_dir)
                .with_context(|| format!("cannot create temp file in {}", work_dir.display()))?;
            Ok(BufWriter::new(file))
        })
        .collect::<Result<Vec<BufWriter<NamedTempFile>>>>()?;

    for kv in &records {
        let bucket = shard_for(&kv.key, shard_count);
        write_record(&mut partitions[bucket], &kv.key, &kv.value)?;
    }

    let mut outputs = Vec::with_capacity(partitions.len());
    for (reduce_index, mut writer) in partitions.into_iter().enumerate() {
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;

        let path = work_dir.join(partition_file_name(job.index, reduce_index as u32));
        file.persist(&path)
            .with_context(|| format!("cannot rename partition to {}", path.display()))?;
        outputs.push(path);
    }

    debug!(
        "map task {} wrote {} records into {} partitions",
        job,
        records.len(),
        outputs.len()
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use common::codec::read_records;
    use common::ihash;

    use super::*;

    fn word_count() -> Workload {
        workload::try_named("wc").unwrap()
    }

    fn read_partition(path: &Path) -> Vec<KeyValue> {
        let file = fs::File::open(path).unwrap();
        read_records(std::io::BufReader::new(file))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn write_input(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn writes_one_sorted_file_per_shard() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "pg-0.txt", "the quick brown fox jumps over the lazy dog");
        let job = Job::map(4, input, 3);

        let outputs = perform_map(&job, &word_count(), dir.path()).unwrap();
        assert_eq!(outputs.len(), 3);

        let mut total = 0;
        for (r, path) in outputs.iter().enumerate() {
            assert_eq!(path.file_name().unwrap(), format!("mr-4-{r}").as_str());
            let records = read_partition(path);
            assert!(records.windows(2).all(|w| w[0].key <= w[1].key));
            for kv in &records {
                assert_eq!(ihash(&kv.key) % 3, r as u32);
            }
            total += records.len();
        }
        assert_eq!(total, 9);
    }

    #[test]
    fn key_lands_in_same_shard_across_map_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_input(dir.path(), "a.txt", "apple banana cherry");
        let b = write_input(dir.path(), "b.txt", "cherry banana apple date");

        perform_map(&Job::map(0, a, 4), &word_count(), dir.path()).unwrap();
        perform_map(&Job::map(1, b, 4), &word_count(), dir.path()).unwrap();

        let mut shard_of: HashMap<Bytes, usize> = HashMap::new();
        for m in 0..2 {
            for r in 0..4 {
                let path = dir.path().join(partition_file_name(m, r as u32));
                for kv in read_partition(&path) {
                    let prev = shard_of.insert(kv.key.clone(), r);
                    assert!(prev.is_none() || prev == Some(r), "{:?} split across shards", kv.key);
                }
            }
        }
        assert_eq!(shard_of.len(), 4);
    }

    #[test]
    fn re_execution_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "in.txt", "b a c a b a");
        let job = Job::map(0, input, 2);

        let first: Vec<Vec<u8>> = perform_map(&job, &word_count(), dir.path())
            .unwrap()
            .iter()
            .map(|p| fs::read(p).unwrap())
            .collect();
        let second: Vec<Vec<u8>> = perform_map(&job, &word_count(), dir.path())
            .unwrap()
            .iter()
            .map(|p| fs::read(p).unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn no_temp_files_are_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "in.txt", "x y z");
        perform_map(&Job::map(0, input, 2), &word_count(), dir.path()).unwrap();

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("temp_map_"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::map(0, dir.path().join("nope").to_string_lossy().to_string(), 2);
        assert!(perform_map(&job, &word_count(), dir.path()).is_err());
        assert!(!dir.path().join("mr-0-0").exists());
    }
}
