//! Authenticated session.
//!
//! A [`Session`] is created once the external provider has authenticated a
//! principal and its account key is known. It is passed explicitly to
//! anything that needs the account key; there is no ambient "current user".

use warranty_core::{AccountIdentity, ExternalId, LocalAccountKey};

use crate::error;
use crate::identity::{IdentityAssigner, IdentityError};
use crate::storage::KeyValueStore;

/// The signed-in account on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: AccountIdentity,
}

impl Session {
    /// Resolve `external_id` to its account key and open a session.
    ///
    /// On failure no session exists, so the caller can simply retry.
    ///
    /// # Errors
    ///
    /// Propagates any [`IdentityError`] from assignment.
    pub async fn establish<S: KeyValueStore>(
        assigner: &IdentityAssigner<S>,
        external_id: &str,
    ) -> Result<Self, IdentityError> {
        let external_id = ExternalId::parse(external_id)?;
        let identity = assigner.assign(&external_id).await?;
        error::set_sentry_user(&identity.account_key);
        Ok(Self { identity })
    }

    /// Open a session from an identity resolved elsewhere.
    #[must_use]
    pub const fn from_identity(identity: AccountIdentity) -> Self {
        Self { identity }
    }

    /// Identifier issued by the external auth provider.
    #[must_use]
    pub const fn external_id(&self) -> &ExternalId {
        &self.identity.external_id
    }

    /// Key used against backend services.
    #[must_use]
    pub const fn account_key(&self) -> LocalAccountKey {
        self.identity.account_key
    }

    /// The full identity pairing.
    #[must_use]
    pub const fn identity(&self) -> &AccountIdentity {
        &self.identity
    }

    /// Sign out. The stored account key is kept for the next sign-in.
    pub fn end(self) {
        tracing::info!(account_key = %self.identity.account_key, "Session ended");
        error::clear_sentry_user();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::IdentityConfig;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_establish_assigns_key() {
        let assigner = IdentityAssigner::new(MemoryStore::new(), IdentityConfig::default());
        let session = Session::establish(&assigner, "uidA").await.unwrap();

        assert_eq!(session.external_id().as_str(), "uidA");
        assert_eq!(
            assigner.lookup("uidA").await.unwrap(),
            Some(session.account_key())
        );
    }

    #[tokio::test]
    async fn test_key_survives_sign_out() {
        let assigner = IdentityAssigner::new(MemoryStore::new(), IdentityConfig::default());
        let first = Session::establish(&assigner, "uidA").await.unwrap();
        let key = first.account_key();
        first.end();

        let second = Session::establish(&assigner, "uidA").await.unwrap();
        assert_eq!(second.account_key(), key);
    }

    #[tokio::test]
    async fn test_establish_rejects_empty_id() {
        let assigner = IdentityAssigner::new(MemoryStore::new(), IdentityConfig::default());
        let err = Session::establish(&assigner, "").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidInput(_)));
    }
}
