//! cli::commands::prs
//!
//! List pull requests.

use anyhow::Result;

use crate::cli::Context;
use crate::forge::{Forge, PrListState};

/// Run the prs command.
pub async fn prs(ctx: &Context, state: PrListState) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let prs = forge.list_pull_requests(state).await?;

    if prs.is_empty() {
        println!("No pull requests.");
        return Ok(());
    }

    for pr in prs {
        let draft = if pr.is_draft { " [draft]" } else { "" };
        println!(
            "#{:<5} {}{}  ({} -> {}, @{})",
            pr.number, pr.title, draft, pr.head, pr.base, pr.author
        );
    }
    Ok(())
}
