use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};
use uuid::Uuid;

use common::rpc::coordinator::{
    IsDoneRequest, IsDoneResponse, ReportSuccessRequest, ReportSuccessResponse,
    RequestTaskRequest, RequestTaskResponse, StatusRequest, StatusResponse,
};
pub use common::rpc::{Coordinator, CoordinatorServer};
use common::rpc::{Assignment, CoordinatorApi, RpcError, TaskId};
use common::Job;

use crate::state::{CoordinatorError, CoordinatorState, Snapshot};

/// Lease duration used when none is configured.
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared handle to the coordinator. Cheap to clone; every clone sees the
/// same state.
#[derive(Debug, Clone)]
pub struct MRCoordinator {
    state: Arc<Mutex<CoordinatorState>>,
    lease_timeout: Duration,

    /// Flips to true once, when the last reduce job is confirmed.
    done: Arc<watch::Sender<bool>>,
}

impl MRCoordinator {
    pub fn new(inputs: Vec<String>, shard_count: u32, lease_timeout: Duration) -> Self {
        let state = CoordinatorState::new(inputs, shard_count);
        let (done, _) = watch::channel(state.is_done());
        Self {
            state: Arc::new(Mutex::new(state)),
            lease_timeout,
            done: Arc::new(done),
        }
    }

    /// Lease the next pending job, or hand out the sentinel.
    pub async fn request_task(&self) -> Assignment {
        let task_id = Uuid::new_v4().to_string();

        let leased = {
            let mut state = self.state.lock().await;
            state.assign(task_id.clone(), self.lease_timeout)
        };

        match leased {
            Some((job, cancel)) => {
                self.start_lease_timer(task_id.clone(), cancel);
                Assignment { task_id, job }
            }
            None => Assignment::none(),
        }
    }

    pub async fn report_success(&self, task_id: &str, job: &Job) -> Result<(), CoordinatorError> {
        let mut state = self.state.lock().await;
        state.complete(task_id, job)?;
        if state.is_done() {
            self.done.send_replace(true);
        }
        Ok(())
    }

    pub async fn is_done(&self) -> bool {
        self.state.lock().await.is_done()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }

    /// Wait until every reduce job is confirmed.
    pub async fn wait_done(&self) {
        let mut done = self.done.subscribe();
        // The sender lives as long as `self`, so this only returns once done.
        let _ = done.wait_for(|done| *done).await;
    }

    /// Race the lease deadline against a report. Whichever resolves the
    /// lease table entry first wins; the other finds nothing to do.
    fn start_lease_timer(&self, task_id: TaskId, cancel: CancellationToken) {
        let state = Arc::clone(&self.state);
        let lease_timeout = self.lease_timeout;

        tokio::spawn(async move {
            select! {
                _ = cancel.cancelled() => {
                    debug!("lease timer for task {} cancelled", task_id);
                }
                _ = tokio::time::sleep(lease_timeout) => {
                    state.lock().await.expire(&task_id);
                }
            }
        });
    }
}

#[tonic::async_trait]
impl CoordinatorApi for MRCoordinator {
    async fn request_task(&self) -> Result<Assignment, RpcError> {
        Ok(MRCoordinator::request_task(self).await)
    }

    async fn report_success(&self, task_id: &str, job: &Job) -> Result<(), RpcError> {
        MRCoordinator::report_success(self, task_id, job)
            .await
            .map_err(|CoordinatorError::UnknownTask(id)| RpcError::UnknownTask(id))
    }

    async fn is_done(&self) -> Result<bool, RpcError> {
        Ok(MRCoordinator::is_done(self).await)
    }
}

#[tonic::async_trait]
impl Coordinator for MRCoordinator {
    async fn request_task(
        &self,
        _: Request<RequestTaskRequest>,
    ) -> Result<Response<RequestTaskResponse>, Status> {
        let assignment = MRCoordinator::request_task(self).await;
        Ok(Response::new(assignment.into()))
    }

    async fn report_success(
        &self,
        request: Request<ReportSuccessRequest>,
    ) -> Result<Response<ReportSuccessResponse>, Status> {
        let ReportSuccessRequest { task_id, job } = request.into_inner();
        let job = job
            .map(Job::from)
            .ok_or_else(|| Status::invalid_argument("missing job"))?;

        match MRCoordinator::report_success(self, &task_id, &job).await {
            Ok(()) => Ok(Response::new(ReportSuccessResponse {})),
            Err(e) => {
                warn!("rejecting report: {}", e);
                Err(Status::not_found(task_id))
            }
        }
    }

    async fn is_done(
        &self,
        _: Request<IsDoneRequest>,
    ) -> Result<Response<IsDoneResponse>, Status> {
        let done = MRCoordinator::is_done(self).await;
        Ok(Response::new(IsDoneResponse { done }))
    }

    async fn status(
        &self,
        _: Request<StatusRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let snapshot = self.snapshot().await;
        Ok(Response::new(StatusResponse {
            phase: snapshot.phase.to_string(),
            pending: snapshot.pending as u32,
            leased: snapshot.leased as u32,
            maps_done: snapshot.maps_done as u32,
            map_total: snapshot.map_total,
            reduces_done: snapshot.reduces_done as u32,
            shard_count: snapshot.shard_count,
        }))
    }
}
