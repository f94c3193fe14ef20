//! forge::traits
//!
//! Forge trait definition and shared request/response types.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O
//! (performed, in production, by an external `curl` process). All methods
//! return `Result<_, ForgeError>`; every error's `Display` is written to be
//! shown to an end user without further wrapping, which is why the auth
//! variants carry actionable hints.

use async_trait::async_trait;
use thiserror::Error;

use crate::http::HttpError;
use crate::process::ProcessError;

/// Errors from forge detection and forge API operations.
///
/// Surfaced as descriptive strings through `Display`; never panicked or
/// thrown across an async boundary.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// The repository has no remote named `origin`.
    #[error("No 'origin' remote found")]
    NoOriginRemote,

    /// The remote URL matched none of the recognized shapes, or its host
    /// classified as no known provider.
    #[error("Could not parse remote URL: {0}")]
    UnparseableRemote(String),

    /// The URL parsed to a provider this crate does not implement.
    ///
    /// Currently unreachable (the parser only ever produces GitHub) but
    /// kept for the next provider.
    #[error("Unsupported forge provider: {0}")]
    UnsupportedProvider(String),

    /// Token retrieval failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The API rejected the request.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Authentication failed at the API (invalid or expired token,
    /// insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// Transport failure from the HTTP layer (timeout, curl failure,
    /// malformed response).
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The external collaborator process could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Errors from auth-token retrieval.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token-printing CLI exited non-zero.
    #[error("gh auth token failed (exit {code}). Is gh CLI installed and authenticated?")]
    CommandFailed {
        /// The CLI's exit code
        code: i32,
    },

    /// The CLI exited zero but printed nothing usable.
    #[error("gh auth token produced no output")]
    EmptyToken,

    /// The CLI could not be run at all.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// PR state filter for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrListState {
    /// Open PRs only (the porcelain's default view)
    #[default]
    Open,
    /// Closed and merged PRs
    Closed,
    /// Everything
    All,
}

impl PrListState {
    /// Value for the list endpoint's `state` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            PrListState::Open => "open",
            PrListState::Closed => "closed",
            PrListState::All => "all",
        }
    }
}

/// PR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    /// Open and awaiting review/merge
    Open,
    /// Closed without being merged
    Closed,
    /// Merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// One row of a PR listing.
#[derive(Debug, Clone)]
pub struct PullRequestSummary {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author login
    pub author: String,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Web URL
    pub url: String,
    /// Last-update timestamp as reported by the API
    pub updated_at: String,
}

/// Full pull request details.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body, absent when empty
    pub body: Option<String>,
    /// PR state
    pub state: PrState,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Author login
    pub author: String,
    /// Head branch name
    pub head: String,
    /// Head commit SHA (used for review comments and check lookups)
    pub head_sha: String,
    /// Base branch name
    pub base: String,
    /// Web URL
    pub url: String,
}

/// One review comment.
#[derive(Debug, Clone)]
pub struct ReviewComment {
    /// Numeric comment id (REST id / GraphQL databaseId)
    pub id: u64,
    /// Author login
    pub author: String,
    /// Comment body
    pub body: String,
    /// Creation timestamp as reported by the API
    pub created_at: String,
}

/// A review thread anchored to a diff location.
#[derive(Debug, Clone)]
pub struct ReviewThread {
    /// Opaque thread id
    pub id: String,
    /// Whether the thread is resolved
    pub is_resolved: bool,
    /// Whether the anchored diff is outdated
    pub is_outdated: bool,
    /// Anchored file path, absent for file-level threads
    pub path: Option<String>,
    /// Anchored line, absent for outdated or file-level threads
    pub line: Option<u64>,
    /// Comments in the thread, oldest first
    pub comments: Vec<ReviewComment>,
}

/// Which side of the diff a comment anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSide {
    /// The old version of the file
    Left,
    /// The new version of the file
    #[default]
    Right,
}

impl CommentSide {
    /// Value for the comment endpoint's `side` field.
    pub fn api_value(&self) -> &'static str {
        match self {
            CommentSide::Left => "LEFT",
            CommentSide::Right => "RIGHT",
        }
    }
}

/// Draft for a new review comment.
#[derive(Debug, Clone)]
pub struct ReviewCommentDraft {
    /// File path the comment anchors to
    pub path: String,
    /// Line in the diff
    pub line: u64,
    /// Diff side
    pub side: CommentSide,
    /// Commit the comment anchors to (normally the PR head SHA)
    pub commit_sha: String,
    /// Comment body
    pub body: String,
}

/// Review verdict for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// Approve the PR
    Approve,
    /// Request changes
    RequestChanges,
    /// Comment without an explicit verdict
    Comment,
}

impl ReviewVerdict {
    /// Value for the review endpoint's `event` field.
    pub fn api_value(&self) -> &'static str {
        match self {
            ReviewVerdict::Approve => "APPROVE",
            ReviewVerdict::RequestChanges => "REQUEST_CHANGES",
            ReviewVerdict::Comment => "COMMENT",
        }
    }
}

impl std::fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewVerdict::Approve => write!(f, "approve"),
            ReviewVerdict::RequestChanges => write!(f, "request-changes"),
            ReviewVerdict::Comment => write!(f, "comment"),
        }
    }
}

/// CI check-run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Queued, not started
    Queued,
    /// Running
    InProgress,
    /// Finished (see the conclusion)
    Completed,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Queued => write!(f, "queued"),
            CheckStatus::InProgress => write!(f, "in progress"),
            CheckStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One CI check run on a commit.
#[derive(Debug, Clone)]
pub struct CheckRun {
    /// Check name as shown in the PR checks tab
    pub name: String,
    /// Current status
    pub status: CheckStatus,
    /// Conclusion string for completed runs (`success`, `failure`, ...)
    pub conclusion: Option<String>,
    /// Link to the check's details page
    pub details_url: Option<String>,
}

/// The Forge trait: the capability surface consumed by the porcelain layer.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Example
///
/// ```ignore
/// use forgeline::forge::{Forge, PrListState};
///
/// async fn show_open(forge: &dyn Forge) -> Result<(), ForgeError> {
///     for pr in forge.list_pull_requests(PrListState::Open).await? {
///         println!("#{} {}", pr.number, pr.title);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Forge: Send + Sync {
    /// Forge name, e.g. "github".
    fn name(&self) -> &'static str;

    /// Repository owner this forge is bound to.
    fn owner(&self) -> &str;

    /// Repository name this forge is bound to.
    fn repo(&self) -> &str;

    /// List pull requests, most recently updated first.
    async fn list_pull_requests(
        &self,
        state: PrListState,
    ) -> Result<Vec<PullRequestSummary>, ForgeError>;

    /// Get one pull request by number.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the PR doesn't exist
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ForgeError>;

    /// List review threads on a pull request.
    async fn list_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>, ForgeError>;

    /// Create a new review comment anchored to a diff location.
    async fn create_review_comment(
        &self,
        number: u64,
        draft: ReviewCommentDraft,
    ) -> Result<ReviewComment, ForgeError>;

    /// Reply to an existing review comment, extending its thread.
    async fn reply_to_review_comment(
        &self,
        number: u64,
        comment_id: u64,
        body: &str,
    ) -> Result<ReviewComment, ForgeError>;

    /// Submit a review with a verdict and optional body.
    async fn submit_review(
        &self,
        number: u64,
        verdict: ReviewVerdict,
        body: Option<&str>,
    ) -> Result<(), ForgeError>;

    /// List CI check runs for a commit or ref.
    async fn list_check_runs(&self, git_ref: &str) -> Result<Vec<CheckRun>, ForgeError>;

    /// Login of the authenticated user.
    async fn viewer_login(&self) -> Result<String, ForgeError>;
}
