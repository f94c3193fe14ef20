//! http
//!
//! Asynchronous HTTP client backed by an external `curl` process.
//!
//! # Design
//!
//! One [`HttpRequest`] maps to exactly one process invocation. The process
//! is asked (via a `-w` write-out directive) to append the numeric HTTP
//! status code on its own line after the response body, so a completed
//! request is parsed from stdout alone: all lines but the last form the
//! body, the last line is the status.
//!
//! The spawning primitive is the [`ProcessRunner`] seam, so the whole layer
//! is testable with [`crate::process::fake::FakeRunner`]: scripted stdout,
//! stderr and exit codes, no network.
//!
//! # Error Contract
//!
//! Exactly one of `Ok(HttpResponse)` / `Err(HttpError)` is produced per
//! request. A response body that fails to parse as JSON is NOT an error:
//! [`HttpResponse::json`] is simply `None` and the raw body stays available.
//!
//! # Example
//!
//! ```ignore
//! use forgeline::http::{CurlClient, HttpRequest};
//!
//! let client = CurlClient::new(runner);
//! let request = HttpRequest::get("https://api.github.com/zen")
//!     .header("User-Agent", "forgeline");
//! let response = client.execute(&request).await?;
//! println!("{}: {}", response.status, response.body);
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::process::{ProcessError, ProcessOutput, ProcessRunner, TIMEOUT_EXIT_CODE};

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// curl's own exit code for `--max-time` expiry (CURLE_OPERATION_TIMEDOUT).
const CURL_TIMEOUT_EXIT_CODE: i32 = 28;

/// Specification of one HTTP request.
///
/// Immutable once handed to [`CurlClient::execute`]; one spec maps to one
/// process invocation. Headers are kept as an ordered vector so the built
/// argument list is deterministic, but callers must not rely on any
/// particular header ordering semantics at the protocol level.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method, uppercase by convention.
    pub method: String,
    /// Header name/value pairs, one `-H` argument pair each.
    pub headers: Vec<(String, String)>,
    /// Optional request payload.
    pub body: Option<String>,
    /// Timeout handed to the process via `--max-time`.
    pub timeout_seconds: u64,
}

impl HttpRequest {
    /// Create a request with an explicit method.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: Vec::new(),
            body: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request payload.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a serialized JSON payload plus its content type.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(value.to_string())
    }

    /// Override the default timeout.
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// A completed HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code parsed from the trailing stdout line.
    pub status: u16,
    /// All stdout lines except the last, joined by newline.
    pub body: String,
    /// Parsed body; present only when the body is non-empty valid JSON.
    pub json: Option<serde_json::Value>,
}

impl HttpResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Errors from request execution.
///
/// Every variant's `Display` is suitable for showing to an end user as-is.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The process hit its timeout (sentinel exit code or curl's own 28).
    #[error("Request timed out")]
    TimedOut,

    /// The process exited non-zero for a reason other than timeout.
    #[error("{program} failed (exit {code}): {stderr}")]
    ProcessFailed {
        /// The HTTP-performing program
        program: String,
        /// Its exit code
        code: i32,
        /// Captured stderr, joined by newline
        stderr: String,
    },

    /// The trailing stdout line did not parse as an integer status code.
    #[error("Failed to parse HTTP status code: {0}")]
    MalformedStatus(String),

    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,

    /// The process could not be run at all.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// HTTP client that delegates each request to an external `curl` process.
#[derive(Clone)]
pub struct CurlClient {
    runner: Arc<dyn ProcessRunner>,
    curl_bin: String,
    timeout_seconds: u64,
}

impl std::fmt::Debug for CurlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurlClient")
            .field("curl_bin", &self.curl_bin)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl CurlClient {
    /// Create a client that invokes `curl` from `PATH`.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::with_curl_bin(runner, "curl")
    }

    /// Create a client that invokes a specific binary.
    pub fn with_curl_bin(runner: Arc<dyn ProcessRunner>, curl_bin: impl Into<String>) -> Self {
        Self {
            runner,
            curl_bin: curl_bin.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the default timeout applied to requests that keep
    /// [`DEFAULT_TIMEOUT_SECS`].
    pub fn with_default_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Effective timeout for one request.
    fn effective_timeout(&self, request: &HttpRequest) -> u64 {
        if request.timeout_seconds == DEFAULT_TIMEOUT_SECS {
            self.timeout_seconds
        } else {
            request.timeout_seconds
        }
    }

    /// Build the argument vector for one request.
    ///
    /// Layout: silent + error-surfacing flags, the status write-out, the
    /// method, the timeout, one `-H` pair per header in vector order, an
    /// optional `-d` payload, and the URL last.
    fn build_args(request: &HttpRequest, timeout_seconds: u64) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            "-S".to_string(),
            "-w".to_string(),
            "\n%{http_code}".to_string(),
            "-X".to_string(),
            request.method.clone(),
            "--max-time".to_string(),
            timeout_seconds.to_string(),
        ];
        for (name, value) in &request.headers {
            args.push("-H".to_string());
            args.push(format!("{}: {}", name, value));
        }
        if let Some(body) = &request.body {
            args.push("-d".to_string());
            args.push(body.clone());
        }
        args.push(request.url.clone());
        args
    }

    /// Interpret a completed process invocation as an HTTP result.
    fn interpret(&self, output: ProcessOutput) -> Result<HttpResponse, HttpError> {
        if output.exit_code == TIMEOUT_EXIT_CODE || output.exit_code == CURL_TIMEOUT_EXIT_CODE {
            return Err(HttpError::TimedOut);
        }
        if output.exit_code != 0 {
            return Err(HttpError::ProcessFailed {
                program: self.curl_bin.clone(),
                code: output.exit_code,
                stderr: output.stderr_lines().join("\n"),
            });
        }

        let lines = output.stdout_lines();
        let (status_line, body_lines) = match lines.split_last() {
            Some(split) => split,
            None => return Err(HttpError::MalformedStatus(String::new())),
        };
        let status: u16 = status_line
            .trim()
            .parse()
            .map_err(|_| HttpError::MalformedStatus(status_line.clone()))?;

        let body = body_lines.join("\n");
        let json = if body.is_empty() {
            None
        } else {
            // Non-JSON bodies are tolerated; callers get the raw text.
            serde_json::from_str(&body).ok()
        };

        Ok(HttpResponse { status, body, json })
    }

    /// Execute one request to completion.
    ///
    /// The future resolves on the runtime, never inline on the caller's
    /// stack, so code sequenced after the `await` always runs after code
    /// sequenced before it.
    ///
    /// # Errors
    ///
    /// See [`HttpError`]; exactly one of success/error is produced.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let timeout_seconds = self.effective_timeout(request);
        let args = Self::build_args(request, timeout_seconds);
        debug!(method = %request.method, url = %request.url, "dispatching request");

        // curl enforces --max-time itself; the runner deadline is a backstop
        // one second later, and maps a kill to the timeout sentinel.
        let deadline = Duration::from_secs(timeout_seconds.saturating_add(1));
        let output = self.runner.run(&self.curl_bin, &args, deadline).await?;
        self.interpret(output)
    }

    /// Start a request on the runtime and return a cancellable handle.
    pub fn spawn(&self, request: HttpRequest) -> RequestHandle {
        let token = CancellationToken::new();
        let child_token = token.clone();
        let client = self.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = child_token.cancelled() => {
                    // Dropping the execute future kills the child via the
                    // runner's kill-on-drop contract.
                    Err(HttpError::Cancelled)
                }
                result = client.execute(&request) => result,
            }
        });

        RequestHandle { token, task }
    }
}

/// Handle to an in-flight request started with [`CurlClient::spawn`].
#[derive(Debug)]
pub struct RequestHandle {
    token: CancellationToken,
    task: tokio::task::JoinHandle<Result<HttpResponse, HttpError>>,
}

impl RequestHandle {
    /// Request cancellation.
    ///
    /// Best-effort and idempotent: cancelling twice, or cancelling after the
    /// request already completed, is a silent no-op. A request that reached
    /// a terminal state before cancellation was observed still delivers its
    /// normal result through [`join`].
    ///
    /// [`join`]: RequestHandle::join
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Await the request's outcome. Yields exactly once.
    pub async fn join(self) -> Result<HttpResponse, HttpError> {
        match self.task.await {
            Ok(result) => result,
            // The task is only ever aborted through cancellation.
            Err(_) => Err(HttpError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeRunner;

    fn client(runner: &Arc<FakeRunner>) -> CurlClient {
        CurlClient::new(runner.clone() as Arc<dyn ProcessRunner>)
    }

    mod build_args {
        use super::*;

        #[test]
        fn minimal_get() {
            let request = HttpRequest::get("https://example.com/x");
            let args = CurlClient::build_args(&request, 30);
            assert_eq!(
                args,
                vec![
                    "-s",
                    "-S",
                    "-w",
                    "\n%{http_code}",
                    "-X",
                    "GET",
                    "--max-time",
                    "30",
                    "https://example.com/x",
                ]
            );
        }

        #[test]
        fn headers_become_h_pairs_in_order() {
            let request = HttpRequest::get("https://example.com")
                .header("Accept", "application/json")
                .header("User-Agent", "forgeline");
            let args = CurlClient::build_args(&request, 30);
            let accept = args.iter().position(|a| a == "Accept: application/json");
            let agent = args.iter().position(|a| a == "User-Agent: forgeline");
            assert!(accept.is_some() && agent.is_some());
            assert!(accept < agent);
            assert_eq!(args.iter().filter(|a| *a == "-H").count(), 2);
        }

        #[test]
        fn body_becomes_d_argument() {
            let request = HttpRequest::post("https://example.com").body("{\"a\":1}");
            let args = CurlClient::build_args(&request, 30);
            let d = args.iter().position(|a| a == "-d").unwrap();
            assert_eq!(args[d + 1], "{\"a\":1}");
        }

        #[test]
        fn url_is_last() {
            let request = HttpRequest::post("https://example.com/end").body("x");
            let args = CurlClient::build_args(&request, 30);
            assert_eq!(args.last().unwrap(), "https://example.com/end");
        }

        #[test]
        fn explicit_timeout_overrides_default() {
            let request = HttpRequest::get("https://example.com").timeout_seconds(5);
            let args = CurlClient::build_args(&request, 5);
            let pos = args.iter().position(|a| a == "--max-time").unwrap();
            assert_eq!(args[pos + 1], "5");
        }
    }

    mod execute {
        use super::*;

        #[tokio::test]
        async fn parses_status_and_body() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["hello", "world", "200"]));

            let response = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap();

            assert_eq!(response.status, 200);
            assert_eq!(response.body, "hello\nworld");
            assert!(response.is_success());
        }

        #[tokio::test]
        async fn strips_trailing_blank_line_before_parsing() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["body", "204", ""]));

            let response = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap();

            assert_eq!(response.status, 204);
            assert_eq!(response.body, "body");
        }

        #[tokio::test]
        async fn json_body_is_parsed() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["{\"id\": 7}", "200"]));

            let response = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap();

            assert_eq!(response.json, Some(serde_json::json!({"id": 7})));
        }

        #[tokio::test]
        async fn non_json_body_is_not_an_error() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["<html>oops</html>", "502"]));

            let response = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap();

            assert_eq!(response.status, 502);
            assert_eq!(response.body, "<html>oops</html>");
            assert!(response.json.is_none());
        }

        #[tokio::test]
        async fn empty_body_yields_no_json() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["", "204"]));

            let response = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap();

            assert_eq!(response.status, 204);
            assert_eq!(response.body, "");
            assert!(response.json.is_none());
        }

        #[tokio::test]
        async fn timeout_sentinel_maps_to_timed_out() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue(
                "curl",
                ProcessOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: vec!["partial".to_string()],
                    stderr: vec!["noise".to_string()],
                },
            );

            let err = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap_err();

            assert_eq!(err.to_string(), "Request timed out");
        }

        #[tokio::test]
        async fn curl_own_timeout_code_maps_to_timed_out() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::failed(28, ["operation timed out"]));

            let err = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap_err();

            assert!(matches!(err, HttpError::TimedOut));
        }

        #[tokio::test]
        async fn nonzero_exit_includes_stderr() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue(
                "curl",
                ProcessOutput::failed(6, ["could not resolve host", "example.invalid"]),
            );

            let err = client(&runner)
                .execute(&HttpRequest::get("https://example.invalid"))
                .await
                .unwrap_err();

            assert_eq!(
                err.to_string(),
                "curl failed (exit 6): could not resolve host\nexample.invalid"
            );
        }

        #[tokio::test]
        async fn unparseable_status_line_is_reported() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["body", "not-a-code"]));

            let err = client(&runner)
                .execute(&HttpRequest::get("https://example.com"))
                .await
                .unwrap_err();

            assert_eq!(
                err.to_string(),
                "Failed to parse HTTP status code: not-a-code"
            );
        }

        #[tokio::test]
        async fn passes_argv_through_the_runner() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["200"]));

            let request = HttpRequest::post("https://api.example.com/things")
                .header("Authorization", "Bearer tok")
                .body("{}");
            client(&runner).execute(&request).await.unwrap();

            let args = runner.first_args("curl").unwrap();
            assert_eq!(args.last().unwrap(), "https://api.example.com/things");
            assert!(args.contains(&"-X".to_string()));
            assert!(args.contains(&"POST".to_string()));
            assert!(args.contains(&"Authorization: Bearer tok".to_string()));
        }
    }

    mod cancellation {
        use super::*;

        #[tokio::test]
        async fn cancel_in_flight_yields_cancelled() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue_delayed(
                "curl",
                ProcessOutput::ok(["200"]),
                Duration::from_secs(30),
            );

            let handle = client(&runner).spawn(HttpRequest::get("https://example.com"));
            handle.cancel();

            let err = handle.join().await.unwrap_err();
            assert!(matches!(err, HttpError::Cancelled));
        }

        #[tokio::test]
        async fn cancel_after_completion_is_a_noop() {
            let runner = Arc::new(FakeRunner::new());
            runner.enqueue("curl", ProcessOutput::ok(["done", "200"]));

            let handle = client(&runner).spawn(HttpRequest::get("https://example.com"));
            // Let the request finish before cancelling.
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
            handle.cancel();

            let response = handle.join().await.unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.body, "done");
        }
    }
}
