use tonic::transport::Channel;

use common::rpc::coordinator::{
    IsDoneRequest, ReportSuccessRequest, RequestTaskRequest,
};
use common::rpc::{Assignment, CoordinatorApi, CoordinatorClient, RpcError};
use common::Job;

/// [`CoordinatorApi`] over gRPC.
#[derive(Debug, Clone)]
pub struct GrpcCoordinator {
    client: CoordinatorClient<Channel>,
}

impl GrpcCoordinator {
    /// Connect to the coordinator at `address`, e.g. `http://[::1]:8030`.
    pub async fn connect(address: String) -> Result<Self, RpcError> {
        let client = CoordinatorClient::connect(address).await?;
        Ok(Self { client })
    }
}

#[tonic::async_trait]
impl CoordinatorApi for GrpcCoordinator {
    async fn request_task(&self) -> Result<Assignment, RpcError> {
        // Clients are cheap to clone and share the underlying channel.
        let response = self
            .client
            .clone()
            .request_task(RequestTaskRequest {})
            .await?;
        Ok(response.into_inner().into())
    }

    async fn report_success(&self, task_id: &str, job: &Job) -> Result<(), RpcError> {
        let request = ReportSuccessRequest {
            task_id: task_id.to_string(),
            job: Some(job.clone().into()),
        };
        self.client.clone().report_success(request).await?;
        Ok(())
    }

    async fn is_done(&self) -> Result<bool, RpcError> {
        let response = self.client.clone().is_done(IsDoneRequest {}).await?;
        Ok(response.into_inner().done)
    }
}
