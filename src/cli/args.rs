//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--config <path>`: Use a specific config file

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::forge::{PrListState, ReviewVerdict};

/// Forgeline - forge operations for GitHub pull requests from the terminal
#[derive(Parser, Debug)]
#[command(name = "fl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if fl was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Use a specific config file instead of the standard locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Pull request state filter, as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum StateArg {
    #[default]
    Open,
    Closed,
    All,
}

impl From<StateArg> for PrListState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Open => PrListState::Open,
            StateArg::Closed => PrListState::Closed,
            StateArg::All => PrListState::All,
        }
    }
}

/// Review verdict, as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum VerdictArg {
    Approve,
    RequestChanges,
    Comment,
}

impl From<VerdictArg> for ReviewVerdict {
    fn from(arg: VerdictArg) -> Self {
        match arg {
            VerdictArg::Approve => ReviewVerdict::Approve,
            VerdictArg::RequestChanges => ReviewVerdict::RequestChanges,
            VerdictArg::Comment => ReviewVerdict::Comment,
        }
    }
}

/// Comment side, as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum SideArg {
    Left,
    #[default]
    Right,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the detected forge for the current repository
    Status,

    /// List pull requests
    Prs {
        /// Filter by state
        #[arg(long, value_enum, default_value_t = StateArg::Open)]
        state: StateArg,
    },

    /// Show one pull request
    Pr {
        /// Pull request number
        number: u64,
    },

    /// List review threads on a pull request
    Threads {
        /// Pull request number
        number: u64,

        /// Include resolved threads
        #[arg(long)]
        all: bool,
    },

    /// List check runs for a pull request's head commit
    Checks {
        /// Pull request number
        number: u64,
    },

    /// Start a new review thread on a diff line
    Comment {
        /// Pull request number
        number: u64,

        /// File path within the repository
        #[arg(long)]
        path: String,

        /// Line number in the diff
        #[arg(long)]
        line: u64,

        /// Diff side the line belongs to
        #[arg(long, value_enum, default_value_t = SideArg::Right)]
        side: SideArg,

        /// Comment body
        #[arg(long)]
        body: String,
    },

    /// Reply to an existing review comment
    Reply {
        /// Pull request number
        number: u64,

        /// Comment to reply to
        #[arg(long)]
        comment_id: u64,

        /// Reply body
        #[arg(long)]
        body: String,
    },

    /// Submit a review verdict
    Review {
        /// Pull request number
        number: u64,

        /// Verdict to submit
        #[arg(value_enum)]
        verdict: VerdictArg,

        /// Optional review body
        #[arg(long)]
        body: Option<String>,
    },

    /// Show the authenticated user
    AuthStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_prs_with_state() {
        let cli = Cli::try_parse_from(["fl", "prs", "--state", "all"]).unwrap();
        match cli.command {
            Command::Prs { state } => assert!(matches!(state, StateArg::All)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_comment_with_defaults() {
        let cli = Cli::try_parse_from([
            "fl", "comment", "42", "--path", "src/lib.rs", "--line", "10", "--body", "hm",
        ])
        .unwrap();
        match cli.command {
            Command::Comment { number, side, .. } => {
                assert_eq!(number, 42);
                assert!(matches!(side, SideArg::Right));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn review_requires_a_verdict() {
        assert!(Cli::try_parse_from(["fl", "review", "42"]).is_err());
    }
}
