mod args;
use args::{Args, Commands};
use clap::Parser;

mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Commands::Status => core::status(args.address).await?,
    }

    Ok(())
}
