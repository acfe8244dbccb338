// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use clap::{Args, Parser};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "commitsmith")]
#[command(version)]
#[command(about = "LLM-assisted Conventional Commits and semantic version bumps", long_about = None)]
pub struct Cli {
    /// LLM provider (openai, ollama)
    #[arg(short, long, env = "COMMITSMITH_PROVIDER")]
    pub provider: Option<String>,

    /// Model name
    #[arg(short, long, env = "COMMITSMITH_MODEL")]
    pub model: Option<String>,

    /// Commit without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print the message only, don't commit
    #[arg(long)]
    pub dry_run: bool,

    /// Send diffs even when they look like they contain credentials
    #[arg(long)]
    pub allow_secrets: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Recommend and optionally apply the next semantic version
    Version(VersionArgs),
    /// Initialize config file
    Init,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Bump the major version instead of asking the model
    #[arg(long, conflicts_with_all = ["minor", "patch"])]
    pub major: bool,

    /// Bump the minor version instead of asking the model
    #[arg(long, conflicts_with = "patch")]
    pub minor: bool,

    /// Bump the patch version instead of asking the model
    #[arg(long)]
    pub patch: bool,

    /// Pre-release to attach (alphaN, betaN, rcN)
    #[arg(long, value_name = "PRE")]
    pub pre: Option<String>,

    /// Rewrite version files, commit and tag
    #[arg(long)]
    pub apply: bool,

    /// Sign the version commit and tag
    #[arg(long)]
    pub sign: bool,
}

impl VersionArgs {
    /// True when the bump is given on the command line and no model call is needed.
    pub fn is_explicit(&self) -> bool {
        self.major || self.minor || self.patch || self.pre.is_some()
    }
}
