// src/permissions/mod.rs
//!
//! Access grants
//!
//! A grant is created when the user picks a document or a tree. It is valid
//! for the rest of the process either way; asking the host to persist it is
//! what keeps it usable after a restart.
//!

mod store;
mod types;
#[cfg(test)]
mod tests;

pub use store::PermissionStore;
pub use types::{Grant, GrantFlags};
