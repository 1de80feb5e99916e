//! Warranty Tracker Core - Shared types library.
//!
//! This crate provides common types used across all Warranty Tracker components:
//! - `app` - Device-side library (storage, identity assignment, backend client)
//! - `cli` - Command-line tools wrapping the app library
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no storage
//! access, no HTTP clients. Status classification takes the current date as
//! an argument so it stays deterministic.
//!
//! # Modules
//!
//! - [`types`] - Account identity, warranty records, status classification

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
