// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{ChangeSet, ToolInput};
use crate::error::{Error, Result};
use crate::services::llm::{self, LlmProvider};
use crate::services::registry::{FunctionRegistry, GENERATE_COMMIT_MESSAGE, RETRY_COMMIT_MESSAGE};
use crate::services::sanitizer::CommitSanitizer;
use crate::services::summarizer;
use crate::services::validator::CommitValidator;

/// Bounded generate, clean, validate loop that feeds each rejection back to the model.
pub struct CommitGenerator {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<FunctionRegistry>,
    validator: CommitValidator,
    attempts: usize,
    timeout: Duration,
}

impl CommitGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<FunctionRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            registry,
            validator: CommitValidator::new(config.preferred_body_length),
            attempts: config.attempts(),
            timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }

    /// Produce a validated commit message for `changes`.
    pub async fn generate(&self, changes: &ChangeSet, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("before generation"));
        }
        if changes.is_empty() {
            return Err(Error::NoChanges);
        }

        let summary = summarizer::aggregate(changes);
        debug!(%summary, "aggregate summary");

        tokio::time::timeout(self.timeout, self.run(&summary, &changes.branch, cancel))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "commit message generation exceeded {}s",
                    self.timeout.as_secs()
                ))
            })?
    }

    async fn run(&self, summary: &str, branch: &str, cancel: &CancellationToken) -> Result<String> {
        let primary = self.registry.get(GENERATE_COMMIT_MESSAGE)?;
        let retry = self.registry.get(RETRY_COMMIT_MESSAGE)?;

        let base = ToolInput::new()
            .with("summary", summary)
            .with("branch", branch);

        let mut previous = String::new();
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            if cancel.is_cancelled() {
                return Err(Error::cancelled(&format!("before attempt {attempt}")));
            }

            let (spec, input) = if attempt == 1 {
                (primary, base.clone())
            } else {
                let mut input = base.clone();
                input.insert("previous", previous.as_str());
                input.insert("error", last_error.as_str());
                (retry, retry.restrict(&input))
            };

            debug!(attempt, function = %spec.name, "requesting commit message");
            let raw = llm::invoke(self.provider.as_ref(), spec, &input, cancel).await?;
            let message = CommitSanitizer::clean(&raw);

            let diagnosis = self.validator.diagnose(&message);
            if diagnosis.is_empty() {
                info!(attempt, "commit message accepted");
                return Ok(message);
            }

            warn!(attempt, %message, %diagnosis, "commit message rejected");
            previous = message;
            last_error = diagnosis;
        }

        Err(Error::LlmGenFailed {
            attempts: self.attempts,
            last_error,
            last_message: previous,
        })
    }
}
