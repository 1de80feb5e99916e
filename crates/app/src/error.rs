//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for callers that drive several
//! components (the CLI, the UI layer) and helpers that keep the Sentry scope
//! in step with the signed-in account.
//!
//! Only `ERROR` and `WARN` records become Sentry events, so rejected user
//! input is logged at `INFO` and lands as a breadcrumb.

use sentry::integrations::tracing::EventFilter;
use thiserror::Error;
use tracing::{Level, Metadata};
use warranty_core::{LocalAccountKey, WarrantyError};

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::storage::StorageError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage failed outside identity assignment.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Account key assignment failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Warranty data was invalid.
    #[error("Invalid warranty: {0}")]
    Warranty(#[from] WarrantyError),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),
}

impl AppError {
    /// Whether the error reflects an environment fault rather than bad
    /// user input. Only these are reported to Sentry.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Api(_) => true,
            Self::Identity(err) => !matches!(err, IdentityError::InvalidInput(_)),
            Self::Config(_) | Self::Warranty(_) => false,
        }
    }

    /// Level [`capture`] logs this error at.
    #[must_use]
    pub const fn log_level(&self) -> Level {
        if self.is_internal() {
            Level::ERROR
        } else {
            Level::INFO
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Log an error and, if it is internal, capture it to Sentry.
pub fn capture(err: &AppError) {
    if err.log_level() == Level::ERROR {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Operation failed"
        );
    } else {
        tracing::info!(error = %err, "Operation rejected");
    }
}

/// How the Sentry tracing layer treats records at `level`.
#[must_use]
pub fn event_filter_for(level: &Level) -> EventFilter {
    match *level {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        Level::TRACE => EventFilter::Ignore,
    }
}

/// Event filter for `sentry::integrations::tracing::layer`.
#[must_use]
pub fn sentry_event_filter(metadata: &Metadata<'_>) -> EventFilter {
    event_filter_for(metadata.level())
}

/// Set the Sentry user context from an account key.
///
/// Call this after the account key is resolved to associate errors with users.
pub fn set_sentry_user(account_key: &LocalAccountKey) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_key.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use warranty_core::ExternalIdError;

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Warranty(WarrantyError::EmptyProduct);
        assert_eq!(err.to_string(), "Invalid warranty: product name cannot be empty");

        let err = AppError::Identity(IdentityError::KeySpaceExhausted { attempts: 4 });
        assert_eq!(
            err.to_string(),
            "Identity error: no unclaimed account key found after 4 attempts"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(!AppError::Identity(IdentityError::InvalidInput(ExternalIdError::Empty)).is_internal());
        assert!(AppError::Identity(IdentityError::KeySpaceExhausted { attempts: 1 }).is_internal());
        assert!(AppError::Storage(StorageError::Io(std::io::Error::other("x"))).is_internal());
        assert!(!AppError::Warranty(WarrantyError::EmptyProduct).is_internal());
    }

    #[test]
    fn test_only_internal_errors_become_sentry_events() {
        let errors = [
            AppError::Identity(IdentityError::InvalidInput(ExternalIdError::Empty)),
            AppError::Warranty(WarrantyError::EmptyProduct),
            AppError::Config(ConfigError::InvalidEnvVar(
                "WT_HORIZON_DAYS".to_owned(),
                "soon".to_owned(),
            )),
            AppError::Identity(IdentityError::KeySpaceExhausted { attempts: 1 }),
            AppError::Storage(StorageError::Io(std::io::Error::other("x"))),
        ];
        for err in &errors {
            let is_event = event_filter_for(&err.log_level()).bits() == EventFilter::Event.bits();
            assert_eq!(is_event, err.is_internal(), "{err}");
        }
    }

    #[test]
    fn test_event_filter_levels() {
        assert!(event_filter_for(&Level::WARN).bits() == EventFilter::Event.bits());
        assert!(event_filter_for(&Level::INFO).bits() == EventFilter::Breadcrumb.bits());
        assert!(event_filter_for(&Level::TRACE).bits() == EventFilter::Ignore.bits());
    }
}
