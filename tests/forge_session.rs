//! Integration tests for session-driven forge access.
//!
//! Every external process (`git`, `gh`, `curl`) is scripted through the
//! fake runner, so these tests exercise the full chain from detection to
//! an API response without touching the network.

use std::sync::Arc;

use serde_json::json;

use forgeline::forge::{Forge, ForgeSession, PrListState};
use forgeline::process::fake::FakeRunner;
use forgeline::process::{ProcessOutput, ProcessRunner};

fn session_over(runner: &Arc<FakeRunner>) -> ForgeSession {
    ForgeSession::with_runner(runner.clone() as Arc<dyn ProcessRunner>)
}

/// Script a curl invocation returning `body` with the given HTTP status.
/// curl is invoked with `-w "\n%{http_code}"`, so the status arrives as
/// the final stdout line.
fn curl_reply(runner: &FakeRunner, body: serde_json::Value, status: u16) {
    let mut stdout: Vec<String> = body.to_string().split('\n').map(str::to_string).collect();
    stdout.push(status.to_string());
    runner.enqueue(
        "curl",
        ProcessOutput {
            exit_code: 0,
            stdout,
            stderr: Vec::new(),
        },
    );
}

mod detection {
    use super::*;

    #[tokio::test]
    async fn public_github_remote_yields_public_api() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
        runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

        let session = session_over(&runner);
        let forge = session.detect("/repo").await.unwrap();

        assert_eq!(forge.owner(), "acme");
        assert_eq!(forge.repo(), "widgets");
        assert_eq!(forge.api_base(), "https://api.github.com");
    }

    #[tokio::test]
    async fn enterprise_remote_yields_v3_api() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue(
            "git",
            ProcessOutput::ok(["git@github.corp.com:acme/widgets.git"]),
        );
        runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));

        let session = session_over(&runner);
        let forge = session.detect("/repo").await.unwrap();
        assert_eq!(forge.api_base(), "https://github.corp.com/api/v3");
    }

    #[tokio::test]
    async fn unrecognized_host_fails_with_the_url() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue(
            "git",
            ProcessOutput::ok(["https://git.corp.internal/acme/widgets"]),
        );

        let session = session_over(&runner);
        let err = session.detect("/repo").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not parse remote URL: https://git.corp.internal/acme/widgets"
        );
    }

    #[tokio::test]
    async fn missing_remote_fails_without_consulting_gh() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue("git", ProcessOutput::failed(2, ["error: No such remote"]));

        let session = session_over(&runner);
        let err = session.detect("/repo").await.unwrap_err();
        assert_eq!(err.to_string(), "No 'origin' remote found");
        assert_eq!(runner.call_count("gh"), 0);
    }

    #[tokio::test]
    async fn auth_failure_surfaces_the_exit_code() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
        runner.enqueue("gh", ProcessOutput::failed(4, ["not logged in"]));

        let session = session_over(&runner);
        let err = session.detect("/repo").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "gh auth token failed (exit 4). Is gh CLI installed and authenticated?"
        );
    }
}

mod api_flow {
    use super::*;

    #[tokio::test]
    async fn detect_then_list_pull_requests() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
        runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));
        curl_reply(
            &runner,
            json!([{
                "number": 7,
                "title": "Add widget",
                "draft": false,
                "user": {"login": "octocat"},
                "head": {"ref": "feature"},
                "base": {"ref": "main"},
                "html_url": "https://github.com/acme/widgets/pull/7",
                "updated_at": "2024-01-01T00:00:00Z"
            }]),
            200,
        );

        let session = session_over(&runner);
        let forge = session.detect("/repo").await.unwrap();
        let prs = forge.list_pull_requests(PrListState::Open).await.unwrap();

        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].number, 7);
        assert_eq!(prs[0].author, "octocat");

        // The request carried the detected token and hit the public API.
        let args = runner.first_args("curl").unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("Authorization: Bearer tok_123"));
        assert!(args
            .last()
            .unwrap()
            .starts_with("https://api.github.com/repos/acme/widgets/pulls"));
    }

    #[tokio::test]
    async fn expired_token_maps_to_auth_failure() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
        runner.enqueue("gh", ProcessOutput::ok(["tok_expired"]));
        curl_reply(&runner, json!({"message": "Bad credentials"}), 401);

        let session = session_over(&runner);
        let forge = session.detect("/repo").await.unwrap();
        let err = forge
            .list_pull_requests(PrListState::Open)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn viewer_login_is_cached_on_the_session() {
        let runner = Arc::new(FakeRunner::new());
        runner.enqueue("git", ProcessOutput::ok(["https://github.com/acme/widgets"]));
        runner.enqueue("gh", ProcessOutput::ok(["tok_123"]));
        curl_reply(&runner, json!({"data": {"viewer": {"login": "octocat"}}}), 200);

        let session = session_over(&runner);
        let forge = session.detect("/repo").await.unwrap();

        let first = session.viewer_login(forge.as_ref()).await.unwrap();
        let second = session.viewer_login(forge.as_ref()).await.unwrap();
        assert_eq!(first, "octocat");
        assert_eq!(second, "octocat");
        assert_eq!(runner.call_count("curl"), 1);
    }
}
