// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::borrow::Cow;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use dialoguer::{Confirm, Editor, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Commands, VersionArgs};
use crate::config::Config;
use crate::domain::{BumpKind, PreRelease};
use crate::error::{Error, Result};
use crate::services::git::GitService;
use crate::services::llm;
use crate::services::workflow::Workflow;

const REVIEW_ACTIONS: &[&str] = &["Commit", "Edit", "Regenerate", "Cancel"];

pub struct App {
    cli: Cli,
    config: Config,
    cancel_token: CancellationToken,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = Config::load(&cli)?;
        debug!(
            provider = %config.provider,
            model = %config.model,
            base_url = %config.base_url(),
            max_retries = config.max_retries,
            "config loaded"
        );
        Ok(Self {
            cli,
            config,
            cancel_token: CancellationToken::new(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let cancel = self.cancel_token.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            cancel.cancel();
        });

        match self.cli.command {
            Some(Commands::Version(ref args)) => self.run_version(args).await,
            Some(Commands::Init) => {
                let path = Config::create_default()?;
                println!("Created config: {}", path.display());
                Ok(())
            }
            Some(Commands::Config) => {
                self.show_config();
                Ok(())
            }
            Some(Commands::Completions { shell }) => {
                let mut cmd = <Cli as clap::CommandFactory>::command();
                clap_complete::generate(shell, &mut cmd, "commitsmith", &mut std::io::stdout());
                Ok(())
            }
            None => self.generate_commit().await,
        }
    }

    async fn workflow(&self) -> Result<Workflow> {
        let repo = Arc::new(GitService::discover().await?);
        let provider = llm::create_provider(&self.config)?;
        Workflow::new(&self.config, provider, repo)
    }

    async fn generate_commit(&self) -> Result<()> {
        let mut workflow = self.workflow().await?;
        let interactive = is_interactive();

        loop {
            let spinner = self.spinner(format!(
                "Generating with {} ({})...",
                self.config.provider, self.config.model
            ));
            let result = workflow.generate_commit_message(&self.cancel_token).await;
            spinner.finish_and_clear();

            match result.map_err(|e| self.interrupted(e)) {
                Ok(_) => {}
                Err(Error::NoChanges) => {
                    self.print_info("No changes to commit");
                    return Ok(());
                }
                Err(e @ Error::LlmGenFailed { .. }) if interactive && !self.cli.yes && !self.cli.dry_run => {
                    self.print_warning(&e.to_string());
                }
                Err(e) => return Err(e),
            }

            let message = workflow.workflow_state().message.clone();

            if self.cli.dry_run {
                println!("{message}");
                return Ok(());
            }

            if self.cli.yes {
                workflow.commit().await?;
                eprintln!("{} Committed!", style("✓").green().bold());
                return Ok(());
            }

            if !interactive {
                self.print_warning("Not a terminal. Use --yes to commit from scripts.");
                println!("{message}");
                return Ok(());
            }

            if self.review(&mut workflow).await? {
                return Ok(());
            }
        }
    }

    /// Review loop. `Ok(true)` when committed, `Ok(false)` to regenerate.
    async fn review(&self, workflow: &mut Workflow) -> Result<bool> {
        loop {
            let state = workflow.workflow_state();
            eprintln!();
            if state.message.is_empty() {
                eprintln!("{}", style("(no message)").dim());
            } else {
                eprintln!("{}", style(&state.message).green());
            }
            for file in &state.files {
                eprintln!("  {}", style(file.display()).dim());
            }
            if let Some(ref err) = state.last_error {
                self.print_warning(err);
            }
            eprintln!();

            let choice = Select::new()
                .with_prompt("What next?")
                .items(REVIEW_ACTIONS)
                .default(0)
                .interact()?;

            match choice {
                0 => {
                    if !workflow.workflow_state().can_commit {
                        self.print_warning("Message is not valid yet, edit or regenerate it");
                        continue;
                    }
                    workflow.commit().await?;
                    eprintln!("{} Committed!", style("✓").green().bold());
                    return Ok(true);
                }
                1 => {
                    let current = workflow.workflow_state().message.clone();
                    if let Some(text) = Editor::new().edit(&current)? {
                        workflow.set_manual_message(&text);
                    }
                }
                2 => return Ok(false),
                _ => return Err(Error::Cancelled),
            }
        }
    }

    async fn run_version(&self, args: &VersionArgs) -> Result<()> {
        let mut workflow = self.workflow().await?;

        if args.is_explicit() {
            let kind = if args.major {
                BumpKind::Major
            } else if args.minor {
                BumpKind::Minor
            } else if args.patch {
                BumpKind::Patch
            } else {
                BumpKind::None
            };
            let pre = args.pre.as_deref().map(PreRelease::parse).transpose()?;
            workflow.propose_version_change(kind, pre).await?;
        } else {
            let spinner = self.spinner("Analyzing changes for a version bump...");
            let result = workflow.analyze_version_change(&self.cancel_token).await;
            spinner.finish_and_clear();
            result.map_err(|e| self.interrupted(e))?;
        }

        let Some(proposal) = workflow.version_proposal() else {
            return Err(Error::Input("no version proposal".into()));
        };

        let pre = proposal.pre.as_ref().map(|p| format!(", {p}")).unwrap_or_default();
        eprintln!(
            "{} {} → {} ({}{})",
            style("version:").cyan(),
            proposal.current,
            style(&proposal.proposed).green().bold(),
            proposal.kind,
            pre
        );

        if self.cli.dry_run || !args.apply {
            println!("{}", proposal.proposed);
            if !args.apply {
                self.print_info("Run with --apply to update files, commit and tag");
            }
            return Ok(());
        }

        if !self.cli.yes {
            if !is_interactive() {
                self.print_warning("Not a terminal. Use --yes to apply from scripts.");
                return Ok(());
            }
            let confirm = Confirm::new()
                .with_prompt(format!("Apply version {}?", proposal.proposed))
                .default(true)
                .interact()?;
            if !confirm {
                return Err(Error::Cancelled);
            }
        }

        let report = workflow
            .apply_version_change(&self.cancel_token)
            .await
            .map_err(|e| self.interrupted(e))?;

        if report.is_noop() {
            self.print_info("Version change already applied, nothing to do");
            return Ok(());
        }
        for file in &report.files_updated {
            eprintln!("  {} {}", style("updated").dim(), file.display());
        }
        if report.committed {
            eprintln!("{} Committed version bump", style("✓").green().bold());
        }
        if report.tagged {
            eprintln!("{} Tagged release", style("✓").green().bold());
        }
        Ok(())
    }

    fn show_config(&self) {
        let c = &self.config;
        println!("Provider: {}", c.provider);
        println!("Model: {}", c.model);
        println!("Base URL: {}", c.base_url());
        println!(
            "API key: {}",
            if c.api_key.as_deref().is_some_and(|k| !k.is_empty()) { "configured" } else { "not set" }
        );
        println!("Timeout: {}s (generation {}s)", c.timeout_secs, c.generation_timeout_secs);
        println!("Max retries: {}", c.max_retries);
        println!("Temperature: {}", c.temperature);
        println!("Max diff lines: {}", c.max_diff_lines);
        println!("Ignore: {}", c.ignore.join(", "));
        println!("Use gitignore: {}", c.use_gitignore);
        println!("Sign: {}", c.sign);
        println!();
        println!("[version]");
        println!("  file: {}", c.version.file);
        println!("  files: {}", c.version.files.join(", "));
        println!();
        println!("[functions]");
        for name in c.functions.keys() {
            println!("  {name}");
        }
    }

    /// Cancellation inside the core surfaces as a timeout; after Ctrl+C it is an abort.
    fn interrupted(&self, e: Error) -> Error {
        if self.cancel_token.is_cancelled() && matches!(e, Error::Timeout(_)) {
            Error::Cancelled
        } else {
            e
        }
    }

    // ─── Output Helpers ───

    fn spinner(&self, msg: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = if std::io::stderr().is_terminal() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn print_info(&self, msg: &str) {
        eprintln!("{} {}", style("info:").cyan(), msg);
    }

    fn print_warning(&self, msg: &str) {
        eprintln!("{} {}", style("warning:").yellow().bold(), msg);
    }
}

fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stdin().is_terminal()
}
