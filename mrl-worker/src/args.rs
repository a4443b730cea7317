use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server
    #[arg(short = 'j', long = "join", default_value = "http://[::1]:8030")]
    pub address: String,

    /// Name of the workload to run.
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Directory holding intermediate and output files. Shared by all workers.
    /// Input paths come from the coordinator already absolute.
    #[arg(short = 'd', long, default_value = ".")]
    pub work_dir: String,

    /// Milliseconds to wait before asking again when no task is available.
    #[arg(short, long, default_value = "500")]
    pub poll_interval: u64,
}
