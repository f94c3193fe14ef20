//! forge::remote
//!
//! Remote URL parsing and provider classification.
//!
//! # Design
//!
//! A git remote URL is reduced to a [`RemoteInfo`] by trying four shapes in
//! a fixed order and taking the first match:
//!
//! 1. `scheme://host/owner/repo` (https or http)
//! 2. `user@host:owner/repo` (SSH shorthand)
//! 3. `ssh://user@host/owner/repo`
//! 4. `ssh://host/owner/repo`
//!
//! A trailing `.git` suffix and trailing whitespace are stripped first.
//! The matched host is then classified by substring: a host containing
//! `github` anywhere is GitHub; any other host is unrecognized and parsing
//! returns `None`. Absence is not an error; callers distinguish "could not
//! parse" from other failures by the missing result.
//!
//! Self-hosted GitLab/Gitea remotes are therefore never recognized even
//! though their URLs match a shape. That is a known limitation of the
//! substring classification, kept until another provider is implemented.

use std::fmt;

/// Forge providers this crate can classify.
///
/// Only GitHub is implemented today; the enum exists so the session's
/// "unsupported provider" branch stays in place for the next provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeKind {
    /// GitHub, including GitHub Enterprise hosts.
    Github,
}

impl ForgeKind {
    /// Provider name as used in messages and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeKind::Github => "github",
        }
    }
}

impl fmt::Display for ForgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parsed remote descriptor.
///
/// Derived once per detection and consumed immediately to construct a
/// provider; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Classified provider.
    pub kind: ForgeKind,
    /// Remote host, e.g. `github.com` or `github.corp.com`.
    pub host: String,
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name, `.git` suffix stripped.
    pub repo: String,
}

/// Parse a git remote URL into a [`RemoteInfo`].
///
/// # Returns
///
/// `Some(RemoteInfo)` when the URL matches a recognized shape AND its host
/// classifies as a known provider; `None` otherwise.
///
/// # Example
///
/// ```
/// use forgeline::forge::{parse_remote_url, ForgeKind};
///
/// let info = parse_remote_url("git@github.com:acme/widgets.git").unwrap();
/// assert_eq!(info.kind, ForgeKind::Github);
/// assert_eq!(info.owner, "acme");
/// assert_eq!(info.repo, "widgets");
/// assert_eq!(info.host, "github.com");
/// ```
pub fn parse_remote_url(url: &str) -> Option<RemoteInfo> {
    let url = url.trim_end();
    let url = url.strip_suffix(".git").unwrap_or(url);

    let (host, owner, repo) = split_http(url)
        .or_else(|| split_scp(url))
        .or_else(|| split_ssh_with_user(url))
        .or_else(|| split_ssh(url))?;

    let kind = classify_host(&host)?;
    Some(RemoteInfo {
        kind,
        host,
        owner,
        repo,
    })
}

/// Classify a host by substring. Unknown hosts yield `None`.
fn classify_host(host: &str) -> Option<ForgeKind> {
    if host.contains("github") {
        Some(ForgeKind::Github)
    } else {
        None
    }
}

/// Shape 1: `http(s)://host/owner/repo`.
fn split_http(url: &str) -> Option<(String, String, String)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    split_host_owner_repo(rest)
}

/// Shape 2: `user@host:owner/repo`.
fn split_scp(url: &str) -> Option<(String, String, String)> {
    // A scheme marker means this is not the SCP shorthand.
    if url.contains("://") {
        return None;
    }
    let (_user, rest) = url.split_once('@')?;
    let (host, path) = rest.split_once(':')?;
    let (owner, repo) = split_owner_repo(path)?;
    non_empty(host)?;
    Some((host.to_string(), owner, repo))
}

/// Shape 3: `ssh://user@host/owner/repo`.
fn split_ssh_with_user(url: &str) -> Option<(String, String, String)> {
    let rest = url.strip_prefix("ssh://")?;
    let (_user, rest) = rest.split_once('@')?;
    split_host_owner_repo(rest)
}

/// Shape 4: `ssh://host/owner/repo` (no user).
fn split_ssh(url: &str) -> Option<(String, String, String)> {
    let rest = url.strip_prefix("ssh://")?;
    if rest.contains('@') {
        return None;
    }
    split_host_owner_repo(rest)
}

/// Split `host/owner/repo` into its three segments.
fn split_host_owner_repo(rest: &str) -> Option<(String, String, String)> {
    let (host, path) = rest.split_once('/')?;
    let (owner, repo) = split_owner_repo(path)?;
    non_empty(host)?;
    Some((host.to_string(), owner, repo))
}

/// Split `owner/repo`, requiring exactly two non-empty segments.
fn split_owner_repo(path: &str) -> Option<(String, String)> {
    let (owner, repo) = path.split_once('/')?;
    if repo.contains('/') {
        return None;
    }
    non_empty(owner)?;
    non_empty(repo)?;
    Some((owner.to_string(), repo.to_string()))
}

fn non_empty(s: &str) -> Option<()> {
    if s.is_empty() {
        None
    } else {
        Some(())
    }
}
