//! # Shoreline
//!
//! A terminal console for analytics workspaces, usable both as a binary and
//! as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! shoreline = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shoreline::auth::{LocalIdentity, SessionStore};
//! use shoreline::store::SqliteStore;
//! use shoreline::types::Principal;
//! use shoreline::workspace::MembershipResolver;
//!
//! let store = Arc::new(SqliteStore::new("./data/shoreline.db")?);
//! store.initialize()?;
//!
//! let identity = Arc::new(LocalIdentity::signed_in(Principal::new("user-1"), "token"));
//! let session = SessionStore::new(identity);
//! let resolver = MembershipResolver::new(store);
//! let _follower = resolver.follow(&session);
//!
//! let memberships = resolver.wait_until_loaded().await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod api;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod observe;
pub mod render;
pub mod store;
pub mod types;
pub mod workspace;
