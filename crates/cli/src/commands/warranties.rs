//! Warranty listing and submission.
//!
//! # Environment Variables
//!
//! - `WARRANTY_API_URL` - Backend base URL
//! - `WARRANTY_EXPIRING_DAYS` - Expiring horizon used for classification

use warranty_app::api::WarrantyApiClient;
use warranty_app::error::AppError;
use warranty_app::identity::IdentityAssigner;
use warranty_app::session::Session;
use warranty_app::storage::KeyValueStore;
use warranty_core::{StatusPolicy, WarrantyDraft, WarrantyStatus};

use super::classify::today;

/// Fetch the account's warranties and print each with its status, followed
/// by a per-status summary.
#[allow(clippy::print_stdout)]
pub async fn list<S: KeyValueStore>(
    assigner: &IdentityAssigner<S>,
    client: &WarrantyApiClient,
    external_id: &str,
    policy: &StatusPolicy,
) -> Result<(), AppError> {
    let session = Session::establish(assigner, external_id).await?;
    let listing = client.fetch_warranties(&session).await?;
    let now = today();

    for (warranty, result) in listing.classified(now, policy) {
        println!(
            "{:<24} {:<16} {:<9} {:>3}%  {}",
            warranty.product(),
            warranty.brand.as_deref().unwrap_or("-"),
            result.status,
            result.progress.percent(),
            result.remaining(),
        );
    }

    let breakdown = listing.breakdown(now, policy);
    println!();
    for status in WarrantyStatus::ALL {
        println!(
            "{status:<9} {:>4}  ({:.0}%)",
            breakdown.count(status),
            breakdown.share(status) * 100.0
        );
    }
    if listing.rejected > 0 {
        println!("skipped {} invalid record(s)", listing.rejected);
    }
    Ok(())
}

/// Validate a warranty form and submit it for the account.
pub async fn add<S: KeyValueStore>(
    assigner: &IdentityAssigner<S>,
    client: &WarrantyApiClient,
    external_id: &str,
    draft: &WarrantyDraft,
) -> Result<(), AppError> {
    // Validate before touching storage so a bad form creates no identity
    let warranty = draft.validate()?;
    let session = Session::establish(assigner, external_id).await?;
    client.submit_warranty(&session, &warranty).await?;
    Ok(())
}
