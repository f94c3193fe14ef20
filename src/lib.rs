//! Forgeline - forge operations for GitHub pull requests from the terminal
//!
//! Forgeline is a single-binary tool for reading and reviewing pull
//! requests: listing PRs, inspecting review threads and check runs, and
//! posting comments and verdicts.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to forge)
//! - [`forge`] - Forge abstraction, detection, and the GitHub provider
//! - [`http`] - curl-backed HTTP transport
//! - [`process`] - Single interface for spawning external processes
//! - [`config`] - Configuration schema and loading
//!
//! # Correctness Invariants
//!
//! Forgeline maintains the following invariants:
//!
//! 1. All external processes are spawned through one runner with a timeout
//! 2. Provider detection runs at most once per repository root
//! 3. The auth token is fetched at most once per process
//! 4. Detection failures are never cached

pub mod cli;
pub mod config;
pub mod forge;
pub mod http;
pub mod process;
