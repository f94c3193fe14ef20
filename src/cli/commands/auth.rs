//! cli::commands::auth
//!
//! Show the authenticated user.

use anyhow::Result;

use crate::cli::Context;
use crate::forge::Forge;

/// Run the auth-status command.
pub async fn auth_status(ctx: &Context) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let login = ctx.session.viewer_login(forge.as_ref()).await?;
    println!("Authenticated as @{login} on {}.", forge.name());
    Ok(())
}
