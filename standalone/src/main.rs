//! Runs a whole map reduce job in one process, one task at a time.
//!
//! Uses the same executors and file layout as the distributed workers, so
//! its `mr-out-*` files are a reference to compare a cluster run against.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use common::codec::partition_file_name;
use common::utils::expand_inputs;
use common::{Job, Workload};
use mrl_worker::map::perform_map;
use mrl_worker::reduce::perform_reduce;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name of the workload to run.
    #[arg(short, long, default_value = "wc")]
    workload: String,

    /// Number of reduce shards.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    n_reduce: u32,

    /// Directory for intermediate and output files.
    #[arg(short = 'd', long, default_value = ".")]
    work_dir: PathBuf,

    /// Input files. Glob patterns are expanded.
    #[arg(required = true)]
    inputs: Vec<String>,
}

/// Map every input, then reduce every shard. Returns the output files.
fn run(inputs: &[String], shard_count: u32, workload: &Workload, work_dir: &Path) -> Result<Vec<PathBuf>> {
    for (index, input) in inputs.iter().enumerate() {
        perform_map(&Job::map(index as u32, input.clone(), shard_count), workload, work_dir)?;
    }

    (0..shard_count)
        .map(|r| {
            let partitions = (0..inputs.len())
                .map(|m| partition_file_name(m as u32, r))
                .collect();
            perform_reduce(&Job::reduce(r, partitions, shard_count), workload, work_dir)
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let workload = workload::try_named(&args.workload)
        .ok_or_else(|| anyhow!("unknown workload `{}`", args.workload))?;

    let inputs = expand_inputs(&args.inputs)?;

    let outputs = run(&inputs, args.n_reduce, &workload, &args.work_dir)?;
    info!(
        "{} inputs reduced into {} output files in {}",
        inputs.len(),
        outputs.len(),
        args.work_dir.display()
    );
    Ok(())
}
