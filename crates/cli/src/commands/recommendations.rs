//! Product recommendations.

use warranty_app::api::WarrantyApiClient;
use warranty_app::error::AppError;
use warranty_app::identity::IdentityAssigner;
use warranty_app::session::Session;
use warranty_app::storage::KeyValueStore;

/// Print recommended products for the account.
#[allow(clippy::print_stdout)]
pub async fn list<S: KeyValueStore>(
    assigner: &IdentityAssigner<S>,
    client: &WarrantyApiClient,
    external_id: &str,
) -> Result<(), AppError> {
    let session = Session::establish(assigner, external_id).await?;
    let recommendations = client.fetch_recommendations(&session).await?;

    if recommendations.is_empty() {
        println!("no recommendations yet");
        return Ok(());
    }
    for rec in &recommendations {
        match rec.similarity_score {
            Some(score) => println!("{} [{}] {score:.2}", rec.title(), rec.icon()),
            None => println!("{} [{}]", rec.title(), rec.icon()),
        }
    }
    Ok(())
}
