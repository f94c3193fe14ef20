//! cli::commands::threads
//!
//! List review threads on a pull request.
//!
//! Resolved threads are hidden unless `--all` is passed.

use anyhow::Result;

use crate::cli::Context;
use crate::forge::Forge;

/// Run the threads command.
pub async fn threads(ctx: &Context, number: u64, all: bool) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let threads = forge.list_review_threads(number).await?;

    let shown: Vec<_> = threads
        .iter()
        .filter(|t| all || !t.is_resolved)
        .collect();

    if shown.is_empty() {
        println!("No review threads.");
        return Ok(());
    }

    for thread in shown {
        let mut flags = Vec::new();
        if thread.is_resolved {
            flags.push("resolved");
        }
        if thread.is_outdated {
            flags.push("outdated");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };

        let location = match (&thread.path, thread.line) {
            (Some(path), Some(line)) => format!("{path}:{line}"),
            (Some(path), None) => path.clone(),
            (None, _) => "(file-level)".to_string(),
        };
        println!("{location}{suffix}");

        for comment in &thread.comments {
            println!("  @{} ({}):", comment.author, comment.id);
            for line in comment.body.lines() {
                println!("    {line}");
            }
        }
        println!();
    }
    Ok(())
}
