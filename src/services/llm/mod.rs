// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod extract;
pub mod openai;
pub mod rate_limit;

use crate::config::Config;
use crate::domain::{FunctionSpec, ToolInput};
use crate::error::{Error, Result};
use crate::services::template;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One chat-completions round trip offering `functions` as tools.
    /// Returns the extracted assistant payload.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        functions: &[FunctionSpec],
        cancel: CancellationToken,
    ) -> Result<String>;

    fn name(&self) -> &str;
}

pub fn create_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    if !config.provider.is_openai_compatible() {
        return Err(Error::Config(format!(
            "provider '{}' is not OpenAI-compatible",
            config.provider
        )));
    }
    Ok(Arc::new(openai::OpenAiProvider::new(config)))
}

/// Check `input` against `spec`, render both prompts and call the provider with `spec`
/// as the only offered function.
pub async fn invoke(
    provider: &dyn LlmProvider,
    spec: &FunctionSpec,
    input: &ToolInput,
    cancel: &CancellationToken,
) -> Result<String> {
    let missing = spec.missing_inputs(input);
    if !missing.is_empty() {
        return Err(Error::Template(format!(
            "function '{}' is missing required input(s): {}",
            spec.name,
            missing.join(", ")
        )));
    }

    let system = template::render(&spec.system, input)?;
    let user = template::render(&spec.user, input)?;

    debug!(
        function = %spec.name,
        provider = provider.name(),
        user_chars = user.len(),
        "invoking function"
    );

    provider
        .generate(&system, &user, std::slice::from_ref(spec), cancel.clone())
        .await
}

/// Sleep for `duration` unless cancelled first.
pub(crate) async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
    context: &str,
) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::cancelled(context)),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
