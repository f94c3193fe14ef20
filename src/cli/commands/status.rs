//! cli::commands::status
//!
//! Show the detected forge for the current repository.

use anyhow::Result;

use crate::cli::Context;
use crate::forge::Forge;

/// Run the status command.
pub async fn status(ctx: &Context) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;

    println!("forge:  {}", forge.name());
    println!("repo:   {}/{}", forge.owner(), forge.repo());
    println!("api:    {}", forge.api_base());

    let login = ctx.session.viewer_login(forge.as_ref()).await?;
    println!("user:   @{login}");
    Ok(())
}
