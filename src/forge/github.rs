//! forge::github
//!
//! GitHub forge implementation using REST and GraphQL APIs.
//!
//! # Design
//!
//! Implements the [`Forge`] trait for GitHub. It uses:
//! - REST for PR listing/details, review comments, review submission, and
//!   check runs
//! - GraphQL for review threads and the viewer identity (neither has a
//!   usable REST shape)
//!
//! All transport goes through [`CurlClient`], so every operation here is
//! testable with scripted process output and none of it depends on a
//! network stack.
//!
//! # Authentication
//!
//! The forge holds a bearer token handed to it at construction by the
//! session. The token never appears in `Debug` output or logs.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::remote::RemoteInfo;
use super::traits::{
    CheckRun, CheckStatus, Forge, ForgeError, PrListState, PrState, PullRequest,
    PullRequestSummary, ReviewComment, ReviewCommentDraft, ReviewThread, ReviewVerdict,
};
use crate::http::{CurlClient, HttpRequest, HttpResponse};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "forgeline";

/// Page size for list endpoints.
const PER_PAGE: u32 = 100;

/// GitHub forge bound to one repository.
pub struct GithubForge {
    client: CurlClient,
    owner: String,
    repo: String,
    host: String,
    api_base: String,
    graphql_url: String,
    token: String,
}

// Custom Debug to keep the token out of logs and error output.
impl std::fmt::Debug for GithubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubForge")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("host", &self.host)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GithubForge {
    /// Create a forge from a parsed remote, an API base URL, and a token.
    pub fn new(
        client: CurlClient,
        info: &RemoteInfo,
        api_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let api_base = api_base.into();
        let graphql_url = graphql_url_for_host(&info.host);
        Self {
            client,
            owner: info.owner.clone(),
            repo: info.repo.clone(),
            host: info.host.clone(),
            api_base,
            graphql_url,
            token: token.into(),
        }
    }

    /// The API base URL this forge talks to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The remote host this forge was detected from.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Attach the common API headers to a request.
    fn with_headers(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT_VALUE)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Execute a request and deserialize a successful JSON response.
    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: HttpRequest,
    ) -> Result<T, ForgeError> {
        let response = self.client.execute(&self.with_headers(request)).await?;
        if response.is_success() {
            let status = response.status;
            serde_json::from_str(&response.body).map_err(|e| ForgeError::ApiError {
                status,
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::map_error(&response))
        }
    }

    /// Execute a request where only the status matters.
    async fn send_expect_success(&self, request: HttpRequest) -> Result<(), ForgeError> {
        let response = self.client.execute(&self.with_headers(request)).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(Self::map_error(&response))
        }
    }

    /// Map a non-2xx response to a typed error.
    fn map_error(response: &HttpResponse) -> ForgeError {
        let message = response
            .json
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();

        match response.status {
            401 => ForgeError::AuthFailed("Invalid or expired token".into()),
            403 => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            404 => ForgeError::NotFound(message),
            429 => ForgeError::RateLimited,
            status if status >= 500 => ForgeError::ApiError {
                status,
                message: format!("GitHub server error: {}", message),
            },
            status => ForgeError::ApiError { status, message },
        }
    }

    /// Execute a GraphQL query and extract `data`.
    async fn graphql<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ForgeError> {
        let payload = json!({ "query": query, "variables": variables });
        let request = HttpRequest::post(&self.graphql_url).json(&payload);
        let envelope: GraphQlEnvelope<T> = self.send_json(request).await?;

        if let Some(errors) = envelope.errors {
            if let Some(first) = errors.first() {
                return Err(ForgeError::ApiError {
                    status: 200,
                    message: first.message.clone(),
                });
            }
        }
        envelope.data.ok_or_else(|| ForgeError::ApiError {
            status: 200,
            message: "GraphQL response carried no data".into(),
        })
    }
}

#[async_trait]
impl Forge for GithubForge {
    fn name(&self) -> &'static str {
        "github"
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
        let url = format!(
            "{}?state={}&sort=updated&direction=desc&per_page={}",
            self.repo_url("pulls"),
            state.query_value(),
            PER_PAGE
        );
        debug!(owner = %self.owner, repo = %self.repo, "listing pull requests");
        let items: Vec<GithubPullRequestListItem> = self.send_json(HttpRequest::get(url)).await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(&format!("pulls/{}", number));
        let pr: GithubPullRequest = self.send_json(HttpRequest::get(url)).await?;
        Ok(pr.into())
    }

    async fn list_review_threads(&self, number: u64) -> Result<Vec<ReviewThread>, ForgeError> {
        let query = r#"query($owner: String!, $name: String!, $number: Int!) {
            repository(owner: $owner, name: $name) {
                pullRequest(number: $number) {
                    reviewThreads(first: 100) {
                        nodes {
                            id
                            isResolved
                            isOutdated
                            path
                            line
                            comments(first: 100) {
                                nodes {
                                    databaseId
                                    author { login }
                                    body
                                    createdAt
                                }
                            }
                        }
                    }
                }
            }
        }"#;
        let variables = json!({
            "owner": self.owner,
            "name": self.repo,
            "number": number,
        });

        let data: ReviewThreadsData = self.graphql(query, variables).await?;
        let pull_request = data
            .repository
            .and_then(|r| r.pull_request)
            .ok_or_else(|| ForgeError::NotFound(format!("pull request #{}", number)))?;

        Ok(pull_request
            .review_threads
            .nodes
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn create_review_comment(
        &self,
        number: u64,
        draft: ReviewCommentDraft,
    ) -> Result<ReviewComment, ForgeError> {
        let url = self.repo_url(&format!("pulls/{}/comments", number));
        let payload = json!({
            "body": draft.body,
            "commit_id": draft.commit_sha,
            "path": draft.path,
            "line": draft.line,
            "side": draft.side.api_value(),
        });
        let comment: GithubReviewComment = self
            .send_json(HttpRequest::post(url).json(&payload))
            .await?;
        Ok(comment.into())
    }

    async fn reply_to_review_comment(
        &self,
        number: u64,
        comment_id: u64,
        body: &str,
    ) -> Result<ReviewComment, ForgeError> {
        let url = self.repo_url(&format!("pulls/{}/comments/{}/replies", number, comment_id));
        let payload = json!({ "body": body });
        let comment: GithubReviewComment = self
            .send_json(HttpRequest::post(url).json(&payload))
            .await?;
        Ok(comment.into())
    }

    async fn submit_review(
        &self,
        number: u64,
        verdict: ReviewVerdict,
        body: Option<&str>,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(&format!("pulls/{}/reviews", number));
        let mut payload = json!({ "event": verdict.api_value() });
        if let Some(body) = body {
            payload["body"] = json!(body);
        }
        self.send_expect_success(HttpRequest::post(url).json(&payload))
            .await
    }

    async fn list_check_runs(&self, git_ref: &str) -> Result<Vec<CheckRun>, ForgeError> {
        let url = format!(
            "{}?per_page={}",
            self.repo_url(&format!("commits/{}/check-runs", git_ref)),
            PER_PAGE
        );
        let listing: GithubCheckRunList = self.send_json(HttpRequest::get(url)).await?;
        Ok(listing.check_runs.into_iter().map(Into::into).collect())
    }

    async fn viewer_login(&self) -> Result<String, ForgeError> {
        let data: ViewerData = self.graphql("query { viewer { login } }", json!({})).await?;
        Ok(data.viewer.login)
    }
}

/// GraphQL endpoint for a host: github.com uses the api subdomain, GitHub
/// Enterprise serves GraphQL under `/api/graphql`.
fn graphql_url_for_host(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com/graphql".to_string()
    } else {
        format!("https://{}/api/graphql", host)
    }
}

// --------------------------------------------------------------------------
// API Response Types
// --------------------------------------------------------------------------

/// GitHub user reference.
#[derive(Deserialize)]
struct GithubUser {
    login: String,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GithubRef {
    #[serde(rename = "ref")]
    ref_name: String,
    #[serde(default)]
    sha: String,
}

/// Full PR response.
#[derive(Deserialize)]
struct GithubPullRequest {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    draft: bool,
    user: GithubUser,
    head: GithubRef,
    base: GithubRef,
    html_url: String,
    merged: Option<bool>,
}

impl From<GithubPullRequest> for PullRequest {
    fn from(pr: GithubPullRequest) -> Self {
        let state = if pr.merged.unwrap_or(false) {
            PrState::Merged
        } else if pr.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        };

        PullRequest {
            number: pr.number,
            title: pr.title,
            body: pr.body.filter(|b| !b.is_empty()),
            state,
            is_draft: pr.draft,
            author: pr.user.login,
            head: pr.head.ref_name,
            head_sha: pr.head.sha,
            base: pr.base.ref_name,
            url: pr.html_url,
        }
    }
}

/// PR list item (subset of the full PR to avoid parsing unused fields).
#[derive(Deserialize)]
struct GithubPullRequestListItem {
    number: u64,
    title: String,
    user: GithubUser,
    draft: bool,
    head: GithubRef,
    base: GithubRef,
    html_url: String,
    updated_at: String,
}

impl From<GithubPullRequestListItem> for PullRequestSummary {
    fn from(item: GithubPullRequestListItem) -> Self {
        PullRequestSummary {
            number: item.number,
            title: item.title,
            author: item.user.login,
            head: item.head.ref_name,
            base: item.base.ref_name,
            is_draft: item.draft,
            url: item.html_url,
            updated_at: item.updated_at,
        }
    }
}

/// Review comment response.
#[derive(Deserialize)]
struct GithubReviewComment {
    id: u64,
    user: GithubUser,
    body: String,
    created_at: String,
}

impl From<GithubReviewComment> for ReviewComment {
    fn from(c: GithubReviewComment) -> Self {
        ReviewComment {
            id: c.id,
            author: c.user.login,
            body: c.body,
            created_at: c.created_at,
        }
    }
}

/// Check-run listing response.
#[derive(Deserialize)]
struct GithubCheckRunList {
    check_runs: Vec<GithubCheckRun>,
}

/// One check run.
#[derive(Deserialize)]
struct GithubCheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
    details_url: Option<String>,
}

impl From<GithubCheckRun> for CheckRun {
    fn from(run: GithubCheckRun) -> Self {
        let status = match run.status.as_str() {
            "queued" => CheckStatus::Queued,
            "in_progress" => CheckStatus::InProgress,
            _ => CheckStatus::Completed,
        };
        CheckRun {
            name: run.name,
            status,
            conclusion: run.conclusion,
            details_url: run.details_url,
        }
    }
}

/// GraphQL response wrapper.
#[derive(Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

/// GraphQL error format.
#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// `viewer { login }` response.
#[derive(Deserialize)]
struct ViewerData {
    viewer: GithubUser,
}

/// Review threads query response.
#[derive(Deserialize)]
struct ReviewThreadsData {
    repository: Option<ThreadsRepository>,
}

#[derive(Deserialize)]
struct ThreadsRepository {
    #[serde(rename = "pullRequest")]
    pull_request: Option<ThreadsPullRequest>,
}

#[derive(Deserialize)]
struct ThreadsPullRequest {
    #[serde(rename = "reviewThreads")]
    review_threads: ThreadNodes,
}

#[derive(Deserialize)]
struct ThreadNodes {
    nodes: Vec<GraphQlReviewThread>,
}

#[derive(Deserialize)]
struct GraphQlReviewThread {
    id: String,
    #[serde(rename = "isResolved")]
    is_resolved: bool,
    #[serde(rename = "isOutdated")]
    is_outdated: bool,
    path: Option<String>,
    line: Option<u64>,
    comments: CommentNodes,
}

#[derive(Deserialize)]
struct CommentNodes {
    nodes: Vec<GraphQlComment>,
}

#[derive(Deserialize)]
struct GraphQlComment {
    #[serde(rename = "databaseId")]
    database_id: Option<u64>,
    author: Option<GithubUser>,
    body: String,
    #[serde(rename = "createdAt")]
    created_at: String,
}

impl From<GraphQlReviewThread> for ReviewThread {
    fn from(thread: GraphQlReviewThread) -> Self {
        ReviewThread {
            id: thread.id,
            is_resolved: thread.is_resolved,
            is_outdated: thread.is_outdated,
            path: thread.path,
            line: thread.line,
            comments: thread
                .comments
                .nodes
                .into_iter()
                .map(|c| ReviewComment {
                    id: c.database_id.unwrap_or_default(),
                    // Deleted accounts come back as a null author.
                    author: c.author.map(|a| a.login).unwrap_or_else(|| "ghost".into()),
                    body: c.body,
                    created_at: c.created_at,
                })
                .collect(),
        }
    }
}
