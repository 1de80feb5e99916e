//! Warranty Tracker device library.
//!
//! Everything the client side needs beyond the pure rules in
//! `warranty-core`: durable local storage, account key assignment, the
//! signed-in session, and the backend client.
//!
//! # Modules
//!
//! - [`storage`] - Key-value stores (memory, JSON file, `SQLite`)
//! - [`identity`] - Maps external auth ids to stable local account keys
//! - [`session`] - The signed-in account, passed explicitly
//! - [`api`] - Warranty backend HTTP client
//! - [`config`] - Environment configuration
//! - [`error`] - Unified error type and Sentry helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod storage;
