//! forge::mock
//!
//! In-memory [`Forge`] for tests. Scripted data in, recorded calls out.
//! No process spawning, no network.
//!
//! # Example
//!
//! ```
//! use forgeline::forge::mock::MockForge;
//! use forgeline::forge::{Forge, PrListState};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new("acme", "widgets").with_viewer("octocat");
//!
//! assert_eq!(forge.viewer_login().await.unwrap(), "octocat");
//! assert!(forge.list_pull_requests(PrListState::Open).await.unwrap().is_empty());
//! assert_eq!(forge.calls(), ["viewer_login", "list_pull_requests:open"]);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{
    CheckRun, Forge, ForgeError, PrListState, PullRequest, PullRequestSummary, ReviewComment,
    ReviewCommentDraft, ReviewThread, ReviewVerdict,
};

/// Scripted forge. Construct with [`MockForge::new`], seed data with the
/// `with_*` builders, then hand it to the code under test as a
/// `dyn Forge`.
pub struct MockForge {
    owner: String,
    repo: String,
    summaries: Vec<PullRequestSummary>,
    pulls: HashMap<u64, PullRequest>,
    threads: HashMap<u64, Vec<ReviewThread>>,
    checks: HashMap<String, Vec<CheckRun>>,
    viewer: String,
    failure: Option<ForgeError>,
    calls: Mutex<Vec<String>>,
}

impl MockForge {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            summaries: Vec::new(),
            pulls: HashMap::new(),
            threads: HashMap::new(),
            checks: HashMap::new(),
            viewer: "octocat".to_string(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_summaries(mut self, summaries: Vec<PullRequestSummary>) -> Self {
        self.summaries = summaries;
        self
    }

    pub fn with_pull(mut self, pr: PullRequest) -> Self {
        self.pulls.insert(pr.number, pr);
        self
    }

    pub fn with_threads(mut self, number: u64, threads: Vec<ReviewThread>) -> Self {
        self.threads.insert(number, threads);
        self
    }

    pub fn with_checks(mut self, git_ref: impl Into<String>, checks: Vec<CheckRun>) -> Self {
        self.checks.insert(git_ref.into(), checks);
        self
    }

    pub fn with_viewer(mut self, login: impl Into<String>) -> Self {
        self.viewer = login.into();
        self
    }

    /// Make every operation fail with the given error.
    pub fn with_failure(mut self, err: ForgeError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Names of the operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, op: &str) -> Result<(), ForgeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op.to_string());
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    async fn list_pull_requests(
        &self,
        state: PrListState,
    ) -> Result<Vec<PullRequestSummary>, ForgeError> {
        self.record(&format!("list_pull_requests:{}", state.query_value()))?;
        Ok(self.summaries.clone())
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.record(&format!("get_pull_request:{number}"))?;
        self.pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("pull request #{number}")))
    }

    async fn list_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>, ForgeError> {
        self.record(&format!("list_review_threads:{number}"))?;
        Ok(self.threads.get(&number).cloned().unwrap_or_default())
    }

    async fn create_review_comment(
        &self,
        number: u64,
        draft: ReviewCommentDraft,
    ) -> Result<ReviewComment, ForgeError> {
        self.record(&format!("create_review_comment:{number}"))?;
        Ok(ReviewComment {
            id: 1,
            author: self.viewer.clone(),
            body: draft.body,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        })
    }

    async fn reply_to_review_comment(
        &self,
        number: u64,
        comment_id: u64,
        body: &str,
    ) -> Result<ReviewComment, ForgeError> {
        self.record(&format!("reply_to_review_comment:{number}:{comment_id}"))?;
        Ok(ReviewComment {
            id: comment_id + 1,
            author: self.viewer.clone(),
            body: body.to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        })
    }

    async fn submit_review(
        &self,
        number: u64,
        verdict: ReviewVerdict,
        _body: Option<&str>,
    ) -> Result<(), ForgeError> {
        self.record(&format!("submit_review:{number}:{}", verdict.api_value()))?;
        Ok(())
    }

    async fn list_check_runs(&self, git_ref: &str) -> Result<Vec<CheckRun>, ForgeError> {
        self.record(&format!("list_check_runs:{git_ref}"))?;
        Ok(self.checks.get(git_ref).cloned().unwrap_or_default())
    }

    async fn viewer_login(&self) -> Result<String, ForgeError> {
        self.record("viewer_login")?;
        Ok(self.viewer.clone())
    }
}
