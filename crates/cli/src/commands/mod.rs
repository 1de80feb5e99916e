//! Subcommand implementations.

pub mod classify;
pub mod health;
pub mod identity;
pub mod recommendations;
pub mod warranties;
