use clap::Parser;

use mrl_coordinator::DEFAULT_LEASE_TIMEOUT;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The port for the server to run on.
    #[arg(short, long, default_value = "8030")]
    pub port: u16,

    /// Number of reduce shards.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub n_reduce: u32,

    /// Seconds a worker may hold a task before it is handed to someone else.
    #[arg(short, long, default_value_t = DEFAULT_LEASE_TIMEOUT.as_secs())]
    pub lease_timeout: u64,

    /// Seconds to keep serving after the job is done, so polling workers
    /// learn about it before the coordinator goes away.
    #[arg(long, default_value = "2")]
    pub linger: u64,

    /// Input files, one map task each. Glob patterns are expanded.
    #[arg(required = true)]
    pub inputs: Vec<String>,
}
