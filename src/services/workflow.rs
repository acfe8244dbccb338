// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;
use std::sync::Arc;

use semver::Version;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::domain::{BumpKind, PreRelease, Suggestion, VersionProposal};
use crate::error::{Error, Result};
use crate::services::generator::CommitGenerator;
use crate::services::git::Repository;
use crate::services::llm::LlmProvider;
use crate::services::registry::FunctionRegistry;
use crate::services::summarizer::ChangeSummarizer;
use crate::services::validator::CommitValidator;
use crate::services::version::{ApplyReport, VersionAnalyzer};

/// Snapshot for interactive refinement of a commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub message: String,
    pub files: Vec<PathBuf>,
    pub last_error: Option<String>,
    pub can_commit: bool,
}

/// The operations a front end drives: commit-message generation with manual override,
/// and version analysis, proposal and application.
pub struct Workflow {
    repo: Arc<dyn Repository>,
    summarizer: ChangeSummarizer,
    generator: CommitGenerator,
    analyzer: VersionAnalyzer,
    validator: CommitValidator,
    sign: bool,
    state: WorkflowState,
}

impl Workflow {
    /// Fails with a config error when any required function spec is missing or incomplete.
    pub fn new(
        config: &Config,
        provider: Arc<dyn LlmProvider>,
        repo: Arc<dyn Repository>,
    ) -> Result<Self> {
        let registry = Arc::new(FunctionRegistry::new(&config.functions)?);

        Ok(Self {
            repo,
            summarizer: ChangeSummarizer::new(Arc::clone(&provider), Arc::clone(&registry), config)?,
            generator: CommitGenerator::new(Arc::clone(&provider), Arc::clone(&registry), config),
            analyzer: VersionAnalyzer::new(provider, registry, config),
            validator: CommitValidator::new(config.preferred_body_length),
            sign: config.sign,
            state: WorkflowState::default(),
        })
    }

    /// Summarize the working tree and produce a validated message for it.
    pub async fn generate_commit_message(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(String, Vec<PathBuf>)> {
        match self.try_generate(cancel).await {
            Ok((message, files)) => {
                self.state = WorkflowState {
                    message: message.clone(),
                    files: files.clone(),
                    last_error: None,
                    can_commit: true,
                };
                Ok((message, files))
            }
            Err(e) => {
                // A rejected candidate is still a starting point for editing
                self.state.message = match e {
                    Error::LlmGenFailed { ref last_message, .. } => last_message.clone(),
                    _ => String::new(),
                };
                self.state.last_error = Some(e.to_string());
                self.state.can_commit = false;
                Err(e)
            }
        }
    }

    async fn try_generate(&mut self, cancel: &CancellationToken) -> Result<(String, Vec<PathBuf>)> {
        let changes = self.summarizer.summarize(self.repo.as_ref(), cancel).await?;
        self.state.files = changes.paths();
        let message = self.generator.generate(&changes, cancel).await?;
        Ok((message, changes.paths()))
    }

    pub fn workflow_state(&self) -> &WorkflowState {
        &self.state
    }

    /// Replace the message with user text. It is validated but kept either way.
    pub fn set_manual_message(&mut self, text: &str) {
        let message = text.trim().to_string();
        let diagnosis = self.validator.diagnose(&message);

        self.state.can_commit = diagnosis.is_empty() && !self.state.files.is_empty();
        self.state.last_error = (!diagnosis.is_empty()).then_some(diagnosis);
        self.state.message = message;
    }

    /// Commit the current message over the summarized files.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.state.can_commit {
            return Err(Error::Validate(
                self.state
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "no commit message has been generated".into()),
            ));
        }

        self.repo
            .commit(&self.state.message, &self.state.files, self.sign)
            .await?;
        info!(files = self.state.files.len(), "committed");
        self.state = WorkflowState::default();
        Ok(())
    }

    /// Ask the model for the next version and hold it as the current proposal.
    pub async fn analyze_version_change(&mut self, cancel: &CancellationToken) -> Result<Version> {
        let proposal = self
            .analyzer
            .analyze(self.repo.as_ref(), &self.summarizer, cancel)
            .await?;
        Ok(proposal.proposed)
    }

    /// Override the proposal with an explicit bump kind and optional pre-release.
    pub async fn propose_version_change(
        &mut self,
        kind: BumpKind,
        pre: Option<PreRelease>,
    ) -> Result<Version> {
        let proposal = self
            .analyzer
            .propose(self.repo.as_ref(), Suggestion::new(kind, pre))
            .await?;
        Ok(proposal.proposed)
    }

    pub fn version_proposal(&self) -> Option<&VersionProposal> {
        self.analyzer.proposal()
    }

    pub fn clear_version_proposal(&mut self) {
        self.analyzer.clear();
    }

    /// Apply the held proposal. Steps that already happened are skipped.
    pub async fn apply_version_change(&mut self, cancel: &CancellationToken) -> Result<ApplyReport> {
        self.analyzer.apply(self.repo.as_ref(), cancel).await
    }
}
