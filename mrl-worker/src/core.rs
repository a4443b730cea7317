use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use common::rpc::{CoordinatorApi, RpcError};
use common::{Job, JobKind, Workload};

use crate::{map, reduce};

/// Why the worker loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The coordinator said the whole computation is done.
    Finished,

    /// The coordinator could not be reached; it is assumed to have shut
    /// down after finishing.
    CoordinatorGone,
}

pub struct MRWorker {
    workload: Workload,

    /// Where partition and output files are read and written.
    work_dir: PathBuf,

    /// How long to wait before asking again when no task is available.
    poll_interval: Duration,
}

impl MRWorker {
    pub fn new(workload: Workload, work_dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            workload,
            work_dir: work_dir.into(),
            poll_interval,
        }
    }

    /// Request, execute and report tasks one at a time until the
    /// coordinator is done or gone.
    ///
    /// A failing task aborts the loop with its error and is not reported;
    /// its lease runs out and another worker picks it up.
    pub async fn run<C>(&self, coordinator: &C) -> Result<Exit>
    where
        C: CoordinatorApi + ?Sized,
    {
        loop {
            let assignment = match coordinator.request_task().await {
                Ok(assignment) => assignment,
                Err(RpcError::Unreachable(e)) => return Ok(gone(&e)),
                Err(e) => return Err(e.into()),
            };

            if assignment.job.is_none() {
                match coordinator.is_done().await {
                    Ok(true) => {
                        info!("Coordinator reports the job is done");
                        return Ok(Exit::Finished);
                    }
                    Ok(false) => {
                        debug!("No task available, retrying in {:?}", self.poll_interval);
                        tokio::time::sleep(self.poll_interval).await;
                        continue;
                    }
                    Err(RpcError::Unreachable(e)) => return Ok(gone(&e)),
                    Err(e) => return Err(e.into()),
                }
            }

            let job = assignment.job;
            info!("Received task {} ({})", assignment.task_id, job);
            self.execute(&job).await?;

            match coordinator.report_success(&assignment.task_id, &job).await {
                Ok(()) => debug!("Task {} confirmed", assignment.task_id),
                Err(RpcError::UnknownTask(_)) => {
                    warn!(
                        "Task {} was already resolved, discarding report",
                        assignment.task_id
                    );
                }
                Err(RpcError::Unreachable(e)) => return Ok(gone(&e)),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run one job to completion on a blocking thread.
    pub async fn execute(&self, job: &Job) -> Result<()> {
        let job = job.clone();
        let workload = self.workload;
        let work_dir = self.work_dir.clone();

        tokio::task::spawn_blocking(move || match job.kind {
            JobKind::Map => map::perform_map(&job, &workload, &work_dir).map(|_| ()),
            JobKind::Reduce => reduce::perform_reduce(&job, &workload, &work_dir).map(|_| ()),
            JobKind::None => Ok(()),
        })
        .await?
    }
}

fn gone(reason: &str) -> Exit {
    info!("Coordinator unreachable ({}), exiting", reason);
    Exit::CoordinatorGone
}
