//! Backend liveness check.

use warranty_app::api::WarrantyApiClient;
use warranty_app::error::AppError;

/// Print `ok` or `unhealthy` for the configured backend.
#[allow(clippy::print_stdout)]
pub async fn check(client: &WarrantyApiClient) -> Result<(), AppError> {
    let healthy = client.health().await?;
    tracing::debug!(base_url = %client.base_url(), healthy, "Health check");
    println!("{}", if healthy { "ok" } else { "unhealthy" });
    Ok(())
}
