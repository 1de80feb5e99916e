//! Local account key assignment.
//!
//! Maps an external identifier to a numeric [`LocalAccountKey`] persisted in
//! local storage. The first call for an identifier draws a random key from
//! the configured [`KeySpace`](warranty_core::KeySpace) and stores it; every
//! later call returns the stored value unchanged.
//!
//! # Storage layout
//!
//! - `user_id_<externalId>` -> decimal account key
//! - `account_key_owner_<key>` -> external id holding that key
//!
//! The second entry is a claim: a drawn key that another identifier already
//! claims is redrawn instead of being shared. Mappings written before claims
//! existed are claimed on the first allocation, so their keys are never
//! drawn for a newcomer.
//!
//! # Concurrency
//!
//! Lookup and write for one identifier run under a per-identifier async
//! mutex, so concurrent first calls generate exactly one key. Drawing and
//! claiming a key runs under a single allocation lock shared by all
//! identifiers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use warranty_core::{AccountIdentity, ExternalId, ExternalIdError, LocalAccountKey};

use crate::config::IdentityConfig;
use crate::storage::{KeyValueStore, StorageError};

/// Storage key prefix for the external id -> account key mapping.
pub const USER_ID_KEY_PREFIX: &str = "user_id_";

/// Storage key prefix for the account key -> external id claim.
pub const KEY_OWNER_PREFIX: &str = "account_key_owner_";

/// Errors that can occur while assigning an account key.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The external id is empty or malformed. Nothing was written.
    #[error("invalid external id: {0}")]
    InvalidInput(#[from] ExternalIdError),

    /// Local storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The stored value is not an integer.
    #[error("stored account key for {external_id} is not a number: {value:?}")]
    CorruptEntry {
        /// Identifier whose entry is corrupt.
        external_id: String,
        /// The raw stored value.
        value: String,
    },

    /// Every drawn key was already claimed by another identifier.
    #[error("no unclaimed account key found after {attempts} attempts")]
    KeySpaceExhausted {
        /// Number of keys drawn.
        attempts: u32,
    },
}

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Assigns and remembers local account keys.
pub struct IdentityAssigner<S> {
    store: S,
    config: IdentityConfig,
    rng: Mutex<StdRng>,
    locks: LockMap,
    /// Held while drawing and claiming; `true` once existing mappings are claimed.
    allocation: AsyncMutex<bool>,
}

impl<S> std::fmt::Debug for IdentityAssigner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityAssigner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> IdentityAssigner<S> {
    /// Create an assigner over `store`, seeding its generator from the OS.
    pub fn new(store: S, config: IdentityConfig) -> Self {
        Self::with_rng(store, config, StdRng::from_os_rng())
    }

    /// Create an assigner with an explicit random generator.
    pub fn with_rng(store: S, config: IdentityConfig, rng: StdRng) -> Self {
        Self {
            store,
            config,
            rng: Mutex::new(rng),
            locks: Mutex::new(HashMap::new()),
            allocation: AsyncMutex::new(false),
        }
    }

    /// Get a reference to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the assignment settings.
    #[must_use]
    pub const fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Return the account key for `external_id`, creating one on first use.
    ///
    /// # Errors
    ///
    /// - `IdentityError::InvalidInput` for an empty identifier
    /// - `IdentityError::Storage` if local storage fails
    /// - `IdentityError::CorruptEntry` if the stored value is not a number
    /// - `IdentityError::KeySpaceExhausted` if no free key could be drawn
    pub async fn assign_local_key(&self, external_id: &str) -> Result<LocalAccountKey, IdentityError> {
        let external_id = ExternalId::parse(external_id)?;
        Ok(self.assign(&external_id).await?.account_key)
    }

    /// Return the identity for an already-parsed external id, creating the
    /// account key on first use.
    ///
    /// # Errors
    ///
    /// Same as [`Self::assign_local_key`], minus input validation.
    pub async fn assign(&self, external_id: &ExternalId) -> Result<AccountIdentity, IdentityError> {
        let _held = KeyLock::acquire(&self.locks, external_id.as_str()).await;

        let account_key = match self.read(external_id).await? {
            Some(existing) => {
                tracing::debug!(
                    external_id = %external_id,
                    account_key = %existing,
                    "Existing account key"
                );
                existing
            }
            None => {
                let generated = self.allocate(external_id).await?;
                self.store
                    .set(&user_key(external_id.as_str()), &generated.to_string())
                    .await?;
                tracing::info!(
                    external_id = %external_id,
                    account_key = %generated,
                    "Assigned new account key"
                );
                generated
            }
        };

        Ok(AccountIdentity::new(external_id.clone(), account_key))
    }

    /// Return the stored account key without creating one.
    ///
    /// # Errors
    ///
    /// - `IdentityError::InvalidInput` for an empty identifier
    /// - `IdentityError::Storage` if local storage fails
    /// - `IdentityError::CorruptEntry` if the stored value is not a number
    pub async fn lookup(&self, external_id: &str) -> Result<Option<LocalAccountKey>, IdentityError> {
        let external_id = ExternalId::parse(external_id)?;
        self.read(&external_id).await
    }

    async fn read(&self, external_id: &ExternalId) -> Result<Option<LocalAccountKey>, IdentityError> {
        let Some(raw) = self.store.get(&user_key(external_id.as_str())).await? else {
            return Ok(None);
        };
        raw.parse::<LocalAccountKey>()
            .map(Some)
            .map_err(|_| IdentityError::CorruptEntry {
                external_id: external_id.to_string(),
                value: raw,
            })
    }

    /// Draw keys until one is unclaimed (or already ours) and claim it.
    async fn allocate(&self, external_id: &ExternalId) -> Result<LocalAccountKey, IdentityError> {
        let mut claimed_existing = self.allocation.lock().await;
        if !*claimed_existing {
            self.claim_existing_mappings().await?;
            *claimed_existing = true;
        }

        for attempt in 1..=self.config.max_attempts {
            let candidate = self.draw();
            let claim = owner_key(candidate);

            match self.store.get(&claim).await? {
                Some(owner) if owner != external_id.as_str() => {
                    tracing::debug!(
                        attempt,
                        account_key = %candidate,
                        "Account key already claimed, redrawing"
                    );
                }
                _ => {
                    self.store.set(&claim, external_id.as_str()).await?;
                    return Ok(candidate);
                }
            }
        }

        tracing::info!(
            attempts = self.config.max_attempts,
            key_space_size = self.config.key_space.len(),
            "Account key space exhausted"
        );
        Err(IdentityError::KeySpaceExhausted {
            attempts: self.config.max_attempts,
        })
    }

    /// Write a claim for every stored mapping that lacks one.
    async fn claim_existing_mappings(&self) -> Result<(), IdentityError> {
        for (storage_key, raw) in self.store.scan_prefix(USER_ID_KEY_PREFIX).await? {
            let Some(external_id) = storage_key.strip_prefix(USER_ID_KEY_PREFIX) else {
                continue;
            };
            let Ok(account_key) = raw.parse::<LocalAccountKey>() else {
                tracing::debug!(external_id, value = %raw, "Skipping corrupt mapping");
                continue;
            };

            let claim = owner_key(account_key);
            match self.store.get(&claim).await? {
                None => {
                    self.store.set(&claim, external_id).await?;
                    tracing::info!(external_id, account_key = %account_key, "Claimed existing account key");
                }
                Some(owner) if owner != external_id => {
                    tracing::warn!(
                        external_id,
                        owner = %owner,
                        account_key = %account_key,
                        "Account key mapped to two identifiers"
                    );
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn draw(&self) -> LocalAccountKey {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        LocalAccountKey::new(rng.random_range(self.config.key_space.range()))
    }
}

/// Storage key holding the account key for `external_id`.
#[must_use]
pub fn user_key(external_id: &str) -> String {
    format!("{USER_ID_KEY_PREFIX}{external_id}")
}

/// Storage key holding the owner of `key`.
#[must_use]
pub fn owner_key(key: LocalAccountKey) -> String {
    format!("{KEY_OWNER_PREFIX}{key}")
}

/// Held per-identifier lock; the map entry is dropped once nobody holds or
/// waits on it.
struct KeyLock<'a> {
    locks: &'a LockMap,
    key: String,
    lock: Option<Arc<AsyncMutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> KeyLock<'a> {
    async fn acquire(locks: &'a LockMap, key: &str) -> KeyLock<'a> {
        let lock = {
            let mut map = locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(key.to_owned()).or_default())
        };
        // Declared before the wait so a cancelled wait releases its handle first
        let mut held = Self {
            locks,
            key: key.to_owned(),
            lock: Some(Arc::clone(&lock)),
            guard: None,
        };
        let wait = lock.lock_owned();
        held.guard = Some(wait.await);
        held
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Release our handles under the map lock; afterwards only the map and
        // other holders or waiters reference the mutex.
        drop(self.guard.take());
        drop(self.lock.take());
        if map
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.key);
        }
    }
}
