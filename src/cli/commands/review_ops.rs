//! cli::commands::review_ops
//!
//! Review mutations: start a thread, reply to a comment, submit a verdict.
//!
//! # Design
//!
//! `comment` targets a diff line, which requires the head commit SHA of the
//! pull request. The handler fetches the PR first so callers only supply
//! the number, path, and line.

use anyhow::Result;

use crate::cli::args::SideArg;
use crate::cli::Context;
use crate::forge::{CommentSide, Forge, ReviewCommentDraft, ReviewVerdict};

/// Run the comment command.
pub async fn comment(
    ctx: &Context,
    number: u64,
    path: &str,
    line: u64,
    side: SideArg,
    body: &str,
) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let pr = forge.get_pull_request(number).await?;

    let draft = ReviewCommentDraft {
        path: path.to_string(),
        line,
        side: match side {
            SideArg::Left => CommentSide::Left,
            SideArg::Right => CommentSide::Right,
        },
        commit_sha: pr.head_sha.clone(),
        body: body.to_string(),
    };

    let created = forge.create_review_comment(number, draft).await?;
    println!("Comment {} created on {}:{}.", created.id, path, line);
    Ok(())
}

/// Run the reply command.
pub async fn reply(ctx: &Context, number: u64, comment_id: u64, body: &str) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let created = forge
        .reply_to_review_comment(number, comment_id, body)
        .await?;
    println!("Reply {} posted.", created.id);
    Ok(())
}

/// Run the review command.
pub async fn review(
    ctx: &Context,
    number: u64,
    verdict: ReviewVerdict,
    body: Option<&str>,
) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    forge.submit_review(number, verdict, body).await?;
    println!("Review submitted: {verdict}.");
    Ok(())
}
