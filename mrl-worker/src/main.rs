use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing::{error, info};

mod args;
use args::Args;

use common::rpc::RpcError;
use mrl_worker::{Exit, GrpcCoordinator, MRWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let workload = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "The workload `{}` is not a known workload (expected one of {:?})",
            args.workload,
            workload::NAMES
        )
    })?;

    let coordinator = match GrpcCoordinator::connect(args.address.clone()).await {
        Ok(coordinator) => coordinator,
        Err(RpcError::Unreachable(e)) => {
            info!("Coordinator at {} unreachable ({}), nothing to do", args.address, e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!("Worker joined coordinator at {}", args.address);

    let worker = MRWorker::new(
        workload,
        args.work_dir,
        Duration::from_millis(args.poll_interval),
    );

    match worker.run(&coordinator).await {
        Ok(Exit::Finished) => info!("Worker finished"),
        Ok(Exit::CoordinatorGone) => info!("Worker exiting, coordinator is gone"),
        Err(e) => {
            error!("Fatal error encountered {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}
