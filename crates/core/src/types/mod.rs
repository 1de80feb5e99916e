//! Core types for Warranty Tracker.
//!
//! This module provides type-safe wrappers for the warranty domain.

pub mod account;
pub mod breakdown;
pub mod id;
pub mod status;
pub mod warranty;

pub use account::{AccountIdentity, ExternalId, ExternalIdError, KeySpace, KeySpaceError};
pub use breakdown::StatusBreakdown;
pub use id::*;
pub use status::{
    Classification, Progress, ProgressBand, RemainingTime, StatusPolicy, WarrantyStatus, classify,
};
pub use warranty::{DATE_FORMAT, Warranty, WarrantyDraft, WarrantyError, parse_form_date};
