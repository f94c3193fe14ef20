//! cli::commands::pr
//!
//! Show one pull request.

use anyhow::Result;

use crate::cli::Context;
use crate::forge::Forge;

/// Run the pr command.
pub async fn pr(ctx: &Context, number: u64) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let pr = forge.get_pull_request(number).await?;

    let draft = if pr.is_draft { " (draft)" } else { "" };
    println!("#{} {}{}", pr.number, pr.title, draft);
    println!("state:  {}", pr.state);
    println!("author: @{}", pr.author);
    println!("head:   {} ({})", pr.head, pr.head_sha);
    println!("base:   {}", pr.base);
    println!("url:    {}", pr.url);
    if let Some(body) = &pr.body {
        if !body.is_empty() {
            println!();
            println!("{body}");
        }
    }
    Ok(())
}
