use anyhow::Result;
use tracing::debug;

//
// Import gRPC stubs/definitions.
//
use common::rpc::coordinator::{StatusRequest, StatusResponse};
use common::rpc::CoordinatorClient;

pub async fn status(address: String) -> Result<()> {
    debug!("querying coordinator at {}", address);
    let mut client = CoordinatorClient::connect(address).await?;
    let response = client.status(StatusRequest {}).await?;

    println!("[Status]");
    for line in render_status(&response.into_inner()) {
        println!("{}", line);
    }

    Ok(())
}

fn render_status(status: &StatusResponse) -> Vec<String> {
    vec![
        format!("phase:   {}", status.phase),
        format!("maps:    {}/{} confirmed", status.maps_done, status.map_total),
        format!(
            "reduces: {}/{} confirmed",
            status.reduces_done, status.shard_count
        ),
        format!("tasks:   {} pending, {} leased", status.pending, status.leased),
    ]
}
