//! Account key commands.
//!
//! # Usage
//!
//! ```bash
//! wt identity assign 9f2c1b7e
//! wt identity show 9f2c1b7e
//! ```
//!
//! # Environment Variables
//!
//! - `WARRANTY_STORE` - JSON file path or `sqlite:` URL holding the mappings

use warranty_app::error::AppError;
use warranty_app::identity::IdentityAssigner;
use warranty_app::storage::KeyValueStore;

/// Resolve the account key for `external_id`, creating it on first use.
#[allow(clippy::print_stdout)]
pub async fn assign<S: KeyValueStore>(
    assigner: &IdentityAssigner<S>,
    external_id: &str,
) -> Result<(), AppError> {
    let key = assigner.assign_local_key(external_id).await?;
    println!("{key}");
    Ok(())
}

/// Print the stored account key, or `unassigned`.
#[allow(clippy::print_stdout)]
pub async fn show<S: KeyValueStore>(
    assigner: &IdentityAssigner<S>,
    external_id: &str,
) -> Result<(), AppError> {
    match assigner.lookup(external_id).await? {
        Some(key) => println!("{key}"),
        None => println!("unassigned"),
    }
    Ok(())
}
