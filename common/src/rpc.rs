//! The request/response contract between coordinator and workers.
//!
//! [`CoordinatorApi`] is what the worker loop talks to. The coordinator
//! implements it in-process and `mrl-worker` implements it over gRPC with
//! the stubs generated from `protos/coordinator.proto`.

use thiserror::Error;
use tonic::{Code, Status};

use crate::job::{Job, JobKind};

pub mod coordinator {
    tonic::include_proto!("coordinator");
}

pub use coordinator::coordinator_client::CoordinatorClient;
pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};

pub type TaskId = String;

/// A job handed out by the coordinator together with its lease id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: TaskId,
    pub job: Job,
}

impl Assignment {
    /// The "no job" answer. The task id is empty.
    pub fn none() -> Self {
        Self {
            task_id: TaskId::new(),
            job: Job::none(),
        }
    }
}

/// Errors seen by a caller of [`CoordinatorApi`].
#[derive(Debug, Error)]
pub enum RpcError {
    /// The task id was already resolved, by an earlier report or by lease
    /// expiry. Callers discard this.
    #[error("unknown task id {0}")]
    UnknownTask(TaskId),

    /// The coordinator cannot be contacted at all.
    #[error("coordinator unreachable: {0}")]
    Unreachable(String),

    /// Anything else the transport reported.
    #[error("rpc failed: {0}")]
    Other(String),
}

impl From<Status> for RpcError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::NotFound => RpcError::UnknownTask(status.message().to_string()),
            Code::Unavailable | Code::Cancelled => {
                RpcError::Unreachable(status.message().to_string())
            }
            _ => RpcError::Other(status.to_string()),
        }
    }
}

impl From<tonic::transport::Error> for RpcError {
    fn from(e: tonic::transport::Error) -> Self {
        RpcError::Unreachable(e.to_string())
    }
}

/// Operations a worker needs from the coordinator.
#[tonic::async_trait]
pub trait CoordinatorApi: Send + Sync {
    /// Lease the next pending job. Returns [`Assignment::none`] right away
    /// when nothing is pending.
    async fn request_task(&self) -> Result<Assignment, RpcError>;

    /// Confirm that the job leased under `task_id` finished.
    async fn report_success(&self, task_id: &str, job: &Job) -> Result<(), RpcError>;

    /// Whether the whole computation has finished.
    async fn is_done(&self) -> Result<bool, RpcError>;
}

/////////////////////////////////////////////////////////////////////////////
// Wire conversions
/////////////////////////////////////////////////////////////////////////////

impl From<coordinator::JobKind> for JobKind {
    fn from(kind: coordinator::JobKind) -> Self {
        match kind {
            coordinator::JobKind::None => JobKind::None,
            coordinator::JobKind::Map => JobKind::Map,
            coordinator::JobKind::Reduce => JobKind::Reduce,
        }
    }
}

impl From<JobKind> for coordinator::JobKind {
    fn from(kind: JobKind) -> Self {
        match kind {
            JobKind::None => coordinator::JobKind::None,
            JobKind::Map => coordinator::JobKind::Map,
            JobKind::Reduce => coordinator::JobKind::Reduce,
        }
    }
}

impl From<Job> for coordinator::Job {
    fn from(job: Job) -> Self {
        Self {
            kind: coordinator::JobKind::from(job.kind) as i32,
            inputs: job.inputs,
            shard_count: job.shard_count,
            index: job.index,
        }
    }
}

impl From<coordinator::Job> for Job {
    fn from(job: coordinator::Job) -> Self {
        // Unknown enum values decode as the sentinel.
        let kind = coordinator::JobKind::try_from(job.kind)
            .map(JobKind::from)
            .unwrap_or(JobKind::None);
        Self {
            kind,
            inputs: job.inputs,
            shard_count: job.shard_count,
            index: job.index,
        }
    }
}

impl From<coordinator::RequestTaskResponse> for Assignment {
    fn from(resp: coordinator::RequestTaskResponse) -> Self {
        Self {
            task_id: resp.task_id,
            job: resp.job.map(Job::from).unwrap_or_else(Job::none),
        }
    }
}

impl From<Assignment> for coordinator::RequestTaskResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            job: Some(assignment.job.into()),
            task_id: assignment.task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_survives_the_wire() {
        let job = Job::reduce(2, vec!["mr-0-2".into(), "mr-1-2".into()], 3);
        let wire: coordinator::Job = job.clone().into();
        assert_eq!(wire.kind, coordinator::JobKind::Reduce as i32);
        assert_eq!(Job::from(wire), job);
    }

    #[test]
    fn unknown_kind_decodes_as_none() {
        let wire = coordinator::Job {
            kind: 42,
            inputs: vec![],
            shard_count: 1,
            index: 0,
        };
        assert!(Job::from(wire).is_none());
    }

    #[test]
    fn missing_job_is_the_sentinel() {
        let resp = coordinator::RequestTaskResponse {
            job: None,
            task_id: String::new(),
        };
        assert_eq!(Assignment::from(resp), Assignment::none());
    }

    #[test]
    fn status_codes_map_to_rpc_errors() {
        assert!(matches!(
            RpcError::from(Status::not_found("abc")),
            RpcError::UnknownTask(_)
        ));
        assert!(matches!(
            RpcError::from(Status::unavailable("gone")),
            RpcError::Unreachable(_)
        ));
        assert!(matches!(
            RpcError::from(Status::internal("boom")),
            RpcError::Other(_)
        ));
    }
}
