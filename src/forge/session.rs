//! forge::session
//!
//! Provider detection and process-wide caching.
//!
//! # Design
//!
//! [`ForgeSession`] is the explicit owner of all forge state: detected
//! providers keyed by repository root, one cached auth token, and one
//! cached viewer login (one authenticated identity per process). It is
//! constructed once at startup and shared via `Arc`; there are no module
//! globals.
//!
//! Detection is a short state machine per repository root:
//! `Undetected → Detecting → Detected(provider)` or `→ Failed(error)`.
//! Failures are not cached; a later call retries from scratch. Concurrent
//! `detect` calls for the same root are collapsed into a single external
//! sequence by a per-key in-flight guard, so the remote lookup and auth
//! CLI run at most once per root.
//!
//! # Collaborators
//!
//! Two external operations are injected as traits so tests can script them:
//!
//! - [`RemoteLookup`]: "what is the `origin` remote URL of this repo?"
//!   (production: `git -C <root> remote get-url origin`)
//! - [`AuthTokenSource`]: "print a bearer token" (production:
//!   `gh auth token`)
//!
//! Auth success is gated strictly on exit code 0: a token printed on
//! stdout by a process that exits non-zero is rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::github::GithubForge;
use super::remote::{parse_remote_url, ForgeKind};
use super::traits::{AuthError, Forge, ForgeError};
use crate::http::CurlClient;
use crate::process::{ProcessError, ProcessRunner};

/// Timeout for the short-lived `git`/`gh` helper invocations.
const TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for resolving a repository's `origin` remote URL.
#[async_trait]
pub trait RemoteLookup: Send + Sync {
    /// Return the URL of the `origin` remote, or `None` when the repository
    /// has no such remote.
    async fn origin_url(&self, repo_root: &Path) -> Result<Option<String>, ProcessError>;
}

/// Trait for obtaining a bearer token from the environment.
#[async_trait]
pub trait AuthTokenSource: Send + Sync {
    /// Return a bearer token.
    async fn token(&self) -> Result<String, AuthError>;
}

/// Production [`RemoteLookup`] that shells out to `git`.
pub struct GitRemoteLookup {
    runner: Arc<dyn ProcessRunner>,
    git_bin: String,
}

impl GitRemoteLookup {
    /// Create a lookup that invokes `git` from `PATH`.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_git_bin(runner, "git")
    }

    /// Create a lookup that invokes a specific binary.
    pub fn with_git_bin(runner: Arc<dyn ProcessRunner>, git_bin: impl Into<String>) -> Self {
        Self {
            runner,
            git_bin: git_bin.into(),
        }
    }
}

#[async_trait]
impl RemoteLookup for GitRemoteLookup {
    async fn origin_url(&self, repo_root: &Path) -> Result<Option<String>, ProcessError> {
        let args = vec![
            "-C".to_string(),
            repo_root.display().to_string(),
            "remote".to_string(),
            "get-url".to_string(),
            "origin".to_string(),
        ];
        let output = self.runner.run(&self.git_bin, &args, TOOL_TIMEOUT).await?;
        if !output.success() {
            // Non-zero exit means "no such remote", not a transport error.
            return Ok(None);
        }
        Ok(output.stdout_lines().first().cloned())
    }
}

/// Production [`AuthTokenSource`] that shells out to the `gh` CLI.
pub struct GhAuthSource {
    runner: Arc<dyn ProcessRunner>,
    gh_bin: String,
}

impl GhAuthSource {
    /// Create a source that invokes `gh` from `PATH`.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_gh_bin(runner, "gh")
    }

    /// Create a source that invokes a specific binary.
    pub fn with_gh_bin(runner: Arc<dyn ProcessRunner>, gh_bin: impl Into<String>) -> Self {
        Self {
            runner,
            gh_bin: gh_bin.into(),
        }
    }
}

#[async_trait]
impl AuthTokenSource for GhAuthSource {
    async fn token(&self) -> Result<String, AuthError> {
        let args = vec!["auth".to_string(), "token".to_string()];
        let output = self.runner.run(&self.gh_bin, &args, TOOL_TIMEOUT).await?;

        // Success requires exit code 0; a token on stdout from a process
        // that then exits non-zero is not a token.
        if !output.success() {
            return Err(AuthError::CommandFailed {
                code: output.exit_code,
            });
        }

        output
            .stdout_lines()
            .iter()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim_end().to_string())
            .ok_or(AuthError::EmptyToken)
    }
}

/// Compute the REST API base URL for a host.
///
/// `github.com` uses the api subdomain; any other GitHub host is assumed
/// to be GitHub Enterprise, which serves REST under `/api/v3`.
pub fn api_base_for_host(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{}/api/v3", host)
    }
}

/// Process-wide forge state: detected providers, auth token, viewer login.
pub struct ForgeSession {
    remotes: Arc<dyn RemoteLookup>,
    auth: Arc<dyn AuthTokenSource>,
    http: CurlClient,
    providers: Mutex<HashMap<PathBuf, Arc<GithubForge>>>,
    token: tokio::sync::Mutex<Option<String>>,
    viewer: tokio::sync::Mutex<Option<String>>,
    detect_flights: tokio::sync::Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for ForgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .providers
            .lock()
            .map(|p| p.len())
            .unwrap_or_default();
        f.debug_struct("ForgeSession")
            .field("cached_providers", &cached)
            .finish()
    }
}

impl ForgeSession {
    /// Create a session with injected collaborators.
    pub fn new(
        remotes: Arc<dyn RemoteLookup>,
        auth: Arc<dyn AuthTokenSource>,
        http: CurlClient,
    ) -> Self {
        Self {
            remotes,
            auth,
            http,
            providers: Mutex::new(HashMap::new()),
            token: tokio::sync::Mutex::new(None),
            viewer: tokio::sync::Mutex::new(None),
            detect_flights: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Create a production session where all collaborators go through the
    /// given process runner.
    pub fn with_runner(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(
            Arc::new(GitRemoteLookup::new(runner.clone())),
            Arc::new(GhAuthSource::new(runner.clone())),
            CurlClient::new(runner),
        )
    }

    /// Detect the forge provider for a repository root.
    ///
    /// Cache hits return immediately with no external calls. Cache misses
    /// run the full sequence: remote lookup, URL parse, provider check,
    /// token retrieval, provider construction. The constructed provider is
    /// cached; failures are not.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::NoOriginRemote`] when the repo has no `origin`
    /// - [`ForgeError::UnparseableRemote`] when no URL shape matches
    /// - [`ForgeError::UnsupportedProvider`] for recognized non-GitHub hosts
    /// - [`ForgeError::Auth`] when token retrieval fails
    pub async fn detect(&self, repo_root: impl AsRef<Path>) -> Result<Arc<GithubForge>, ForgeError> {
        let root = repo_root.as_ref().to_path_buf();

        if let Some(provider) = self.get(&root) {
            return Ok(provider);
        }

        // Per-key in-flight guard: concurrent callers for the same root
        // wait on one detection instead of issuing duplicate external calls.
        let flight = {
            let mut flights = self.detect_flights.lock().await;
            flights.entry(root.clone()).or_default().clone()
        };
        let _guard = flight.lock().await;

        // Another caller may have finished while this one waited.
        if let Some(provider) = self.get(&root) {
            return Ok(provider);
        }

        let result = self.detect_uncached(&root).await;

        let mut flights = self.detect_flights.lock().await;
        flights.remove(&root);
        result
    }

    async fn detect_uncached(&self, root: &Path) -> Result<Arc<GithubForge>, ForgeError> {
        debug!(root = %root.display(), "detecting forge provider");

        let url = self
            .remotes
            .origin_url(root)
            .await?
            .ok_or(ForgeError::NoOriginRemote)?;
        let url = url.trim_end().to_string();

        let info = parse_remote_url(&url)
            .ok_or_else(|| ForgeError::UnparseableRemote(url.clone()))?;

        // Unreachable today (the parser only produces GitHub), kept for the
        // next provider.
        if info.kind != ForgeKind::Github {
            return Err(ForgeError::UnsupportedProvider(info.kind.to_string()));
        }

        let token = self.auth_token().await?;
        let api_base = api_base_for_host(&info.host);
        let provider = Arc::new(GithubForge::new(self.http.clone(), &info, api_base, token));

        self.providers
            .lock()
            .expect("provider cache lock poisoned")
            .insert(root.to_path_buf(), provider.clone());

        debug!(
            owner = %info.owner,
            repo = %info.repo,
            host = %info.host,
            "forge provider detected"
        );
        Ok(provider)
    }

    /// Synchronous cache lookup. No side effects, no error path: absence is
    /// a `None`, not a failure.
    pub fn get(&self, repo_root: impl AsRef<Path>) -> Option<Arc<GithubForge>> {
        self.providers
            .lock()
            .expect("provider cache lock poisoned")
            .get(repo_root.as_ref())
            .cloned()
    }

    /// Return the cached auth token, fetching it on first use.
    ///
    /// The cache lock is held across the fetch, so concurrent first calls
    /// trigger a single invocation of the underlying source.
    pub async fn auth_token(&self) -> Result<String, ForgeError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.auth.token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Return the cached viewer login, asking the provider on first use.
    pub async fn viewer_login(&self, provider: &dyn Forge) -> Result<String, ForgeError> {
        let mut slot = self.viewer.lock().await;
        if let Some(login) = slot.as_ref() {
            return Ok(login.clone());
        }
        let login = provider.viewer_login().await?;
        *slot = Some(login.clone());
        Ok(login)
    }

    /// Reset all caches: providers, auth token, viewer login.
    ///
    /// Exists for test isolation; production code has no reason to call it.
    pub async fn clear_cache(&self) {
        self.providers
            .lock()
            .expect("provider cache lock poisoned")
            .clear();
        *self.token.lock().await = None;
        *self.viewer.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeRunner;
    use crate::process::ProcessOutput;

    fn session(runner: &Arc<FakeRunner>) -> ForgeSession {
        ForgeSession::with_runner(runner.clone() as Arc<dyn ProcessRunner>)
    }

    mod api_base {
        use super::*;

        #[test]
        fn public_github() {
            assert_eq!(api_base_for_host("github.com"), "https://api.github.com");
        }

        #[test]
        fn enterprise_host() {
            assert_eq!(
                api_base_for_host("github.corp.com"),
                "https://github.corp.com/api/v3"
            );
        }
    }

    mod git_remote_lookup {
        use super::*;

        #[tokio::test]
        async fn returns_first_stdout_line() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue(
                "git",
                ProcessOutput::ok(["https://github.com/acme/widgets", ""]),
            );

            let lookup = GitRemoteLookup::new(runner.clone());
            let url = lookup.origin_url(Path::new("/repo")).await.unwrap();
            assert_eq!(url.as_deref(), Some("https://github.com/acme/widgets"));

            let args = runner.first_args("git").unwrap();
            assert_eq!(args, ["-C", "/repo", "remote", "get-url", "origin"]);
        }

        #[tokio::test]
        async fn nonzero_exit_means_no_remote() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::failed(2, ["error: No such remote"]));

            let lookup = GitRemoteLookup::new(runner);
            let url = lookup.origin_url(Path::new("/repo")).await.unwrap();
            assert!(url.is_none());
        }
    }

    mod gh_auth_source {
        use super::*;

        #[tokio::test]
        async fn takes_first_nonblank_line_trimmed() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("gh", ProcessOutput::ok(["", "tok_123  ", ""]));

            let source = GhAuthSource::new(runner.clone());
            assert_eq!(source.token().await.unwrap(), "tok_123");

            let args = runner.first_args("gh").unwrap();
            assert_eq!(args, ["auth", "token"]);
        }

        #[tokio::test]
        async fn nonzero_exit_fails_with_hint() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("gh", ProcessOutput::failed(4, ["not logged in"]));

            let err = GhAuthSource::new(runner).token().await.unwrap_err();
            assert_eq!(
                err.to_string(),
                "gh auth token failed (exit 4). Is gh CLI installed and authenticated?"
            );
        }

        #[tokio::test]
        async fn token_on_stdout_with_nonzero_exit_is_rejected() {
            // Stdout alone is not success; the exit code decides.
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue(
                "gh",
                ProcessOutput {
                    exit_code: 1,
                    stdout: vec!["tok_123".to_string()],
                    stderr: vec!["unrelated failure".to_string()],
                },
            );

            let err = GhAuthSource::new(runner).token().await.unwrap_err();
            assert!(matches!(err, AuthError::CommandFailed { code: 1 }));
        }

        #[tokio::test]
        async fn blank_output_is_rejected() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("gh", ProcessOutput::ok(["", ""]));

            let err = GhAuthSource::new(runner).token().await.unwrap_err();
            assert!(matches!(err, AuthError::EmptyToken));
        }
    }

    mod detect {
        use super::*;

        #[tokio::test]
        async fn end_to_end_public_github() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

            let session = session(&runner);
            let provider = session.detect("/repo").await.unwrap();

            assert_eq!(provider.owner(), "acme");
            assert_eq!(provider.repo(), "widgets");
            assert_eq!(provider.api_base(), "https://api.github.com");
        }

        #[tokio::test]
        async fn enterprise_host_gets_v3_api_base() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue(
                "git",
                ProcessOutput::ok(["git@github.corp.com:acme/widgets.git"]),
            );
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

            let session = session(&runner);
            let provider = session.detect("/repo").await.unwrap();
            assert_eq!(provider.api_base(), "https://github.corp.com/api/v3");
        }

        #[tokio::test]
        async fn missing_origin_remote() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::failed(2, ["error: No such remote"]));

            let session = session(&runner);
            let err = session.detect("/repo").await.unwrap_err();
            assert_eq!(err.to_string(), "No 'origin' remote found");
            assert!(session.get("/repo").is_none());
        }

        #[tokio::test]
        async fn unrecognized_host_reports_the_url() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue(
                "git",
                ProcessOutput::ok(["https://git.corp.internal/acme/widgets"]),
            );

            let session = session(&runner);
            let err = session.detect("/repo").await.unwrap_err();
            assert_eq!(
                err.to_string(),
                "Could not parse remote URL: https://git.corp.internal/acme/widgets"
            );
        }

        #[tokio::test]
        async fn second_detect_hits_the_cache() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

            let session = session(&runner);
            session.detect("/repo").await.unwrap();
            session.detect("/repo").await.unwrap();

            assert_eq!(runner.call_count("git"), 1);
            assert_eq!(runner.call_count("gh"), 1);
        }

        #[tokio::test]
        async fn failed_detection_is_not_cached() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::failed(2, ["error: No such remote"]));
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

            let session = session(&runner);
            assert!(session.detect("/repo").await.is_err());

            let provider = session.detect("/repo").await.unwrap();
            assert_eq!(provider.owner(), "acme");
            assert_eq!(runner.call_count("git"), 2);
        }

        #[tokio::test]
        async fn concurrent_detects_share_one_flight() {
            let runner = Arc::new(FakeRunner::new());
            // Exactly one scripted reply per tool: a duplicated external
            // sequence would hit the unscripted-call failure.
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

            let session = Arc::new(session(&runner));
            let a = session.clone();
            let b = session.clone();
            let (ra, rb) = tokio::join!(a.detect("/repo"), b.detect("/repo"));

            assert!(ra.is_ok());
            assert!(rb.is_ok());
            assert_eq!(runner.call_count("git"), 1);
            assert_eq!(runner.call_count("gh"), 1);
        }

        #[tokio::test]
        async fn distinct_roots_detect_independently() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/gears"]));

            let session = session(&runner);
            let first = session.detect("/repo-a").await.unwrap();
            let second = session.detect("/repo-b").await.unwrap();

            assert_eq!(first.repo(), "widgets");
            assert_eq!(second.repo(), "gears");
            // Token is fetched once and shared across repositories.
            assert_eq!(runner.call_count("gh"), 1);
        }
    }

    mod caches {
        use super::*;

        #[tokio::test]
        async fn auth_token_is_fetched_once() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

            let session = session(&runner);
            assert_eq!(session.auth_token().await.unwrap(), "tok_123");
            assert_eq!(session.auth_token().await.unwrap(), "tok_123");
            assert_eq!(runner.call_count("gh"), 1);
        }

        #[tokio::test]
        async fn clear_cache_retriggers_the_full_sequence() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));
            runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
            runner.enqueue("gh", ProcessOutput::ok(["tok_456"]));

            let session = session(&runner);
            session.detect("/repo").await.unwrap();
            session.clear_cache().await;
            assert!(session.get("/repo").is_none());

            session.detect("/repo").await.unwrap();
            assert_eq!(runner.call_count("git"), 2);
            assert_eq!(runner.call_count("gh"), 2);
        }
    }
}
