//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Obtains a provider through the session (detection is cached)
//! 2. Calls the forge operation
//! 3. Formats and displays output
//!
//! Handlers print core error messages as-is; the exact wording of
//! detection and transport failures is part of the user interface.

mod auth;
mod checks;
mod pr;
mod prs;
mod review_ops;
mod status;
mod threads;

pub use auth::auth_status;
pub use checks::checks;
pub use pr::pr;
pub use prs::prs;
pub use review_ops::{comment, reply, review};
pub use status::status;
pub use threads::threads;

use anyhow::Result;

use super::args::Command;
use super::Context;

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status => status::status(ctx).await,
        Command::Prs { state } => prs::prs(ctx, state.into()).await,
        Command::Pr { number } => pr::pr(ctx, number).await,
        Command::Threads { number, all } => threads::threads(ctx, number, all).await,
        Command::Checks { number } => checks::checks(ctx, number).await,
        Command::Comment {
            number,
            path,
            line,
            side,
            body,
        } => review_ops::comment(ctx, number, &path, line, side, &body).await,
        Command::Reply {
            number,
            comment_id,
            body,
        } => review_ops::reply(ctx, number, comment_id, &body).await,
        Command::Review {
            number,
            verdict,
            body,
        } => review_ops::review(ctx, number, verdict.into(), body.as_deref()).await,
        Command::AuthStatus => auth::auth_status(ctx).await,
    }
}
