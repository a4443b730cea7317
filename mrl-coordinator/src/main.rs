mod args;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use args::Args;
use clap::Parser;
use tonic::transport::Server;
use tracing::{info, warn};

use common::rpc::CoordinatorServer;
use common::utils::expand_inputs;
use mrl_coordinator::MRCoordinator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let inputs = expand_inputs(&args.inputs)?;
    info!(
        "{} input files, {} reduce shards, {}s lease",
        inputs.len(),
        args.n_reduce,
        args.lease_timeout
    );

    let coordinator = MRCoordinator::new(
        inputs,
        args.n_reduce,
        Duration::from_secs(args.lease_timeout),
    );

    // Configure address.
    let addr: SocketAddr = format!("[::1]:{}", args.port).parse()?;
    info!("CoordinatorServer listening on {}", addr);

    let linger = Duration::from_secs(args.linger);
    let shutdown = {
        let coordinator = coordinator.clone();
        async move {
            tokio::select! {
                _ = coordinator.wait_done() => {
                    info!("job finished, shutting down in {:?}", linger);
                    tokio::time::sleep(linger).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupted before the job finished");
                }
            }
        }
    };

    Server::builder()
        .add_service(CoordinatorServer::new(coordinator))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    Ok(())
}
