use clap::{Parser, Subcommand};

//
// For parsing user specified command.
//
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server
    #[arg(short, long, default_value = "http://[::1]:8030")]
    pub address: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display the progress of the running job: its phase, how many tasks
    /// are pending or leased and how many have been confirmed.
    Status,
}
