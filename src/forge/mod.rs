//! forge
//!
//! Abstraction for remote forges (GitHub v1).
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for interacting with remote
//! hosting services. Callers obtain a provider through [`ForgeSession`]
//! rather than constructing implementations directly: the session owns
//! detection, authentication, and caching, so there is exactly one
//! provider per repository root and one token per process.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`remote`]: Remote URL parsing and provider classification
//! - [`session`]: Provider detection, auth, and caching
//! - [`github`]: GitHub implementation using REST and GraphQL APIs
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forgeline::forge::{ForgeSession, PrListState};
//! use forgeline::process::TokioRunner;
//!
//! let session = ForgeSession::with_runner(Arc::new(TokioRunner::new()));
//!
//! // Detect the provider for a repo (cached after the first call)
//! let forge = session.detect("/path/to/repo").await?;
//!
//! let prs = forge.list_pull_requests(PrListState::Open).await?;
//! for pr in prs {
//!     println!("#{} {}", pr.number, pr.title);
//! }
//! ```

pub mod github;
pub mod mock;
mod remote;
mod session;
mod traits;

pub use remote::{parse_remote_url, ForgeKind, RemoteInfo};
pub use session::{
    api_base_for_host, AuthTokenSource, ForgeSession, GhAuthSource, GitRemoteLookup, RemoteLookup,
};
pub use traits::*;
