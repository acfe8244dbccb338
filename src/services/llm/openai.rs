// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::extract::{self, ChatResponse};
use super::rate_limit::{self, RateLimitBudget};
use super::{LlmProvider, sleep_or_cancel};
use crate::config::Config;
use crate::domain::{FunctionSpec, Parameters};
use crate::error::{Error, Result};

/// Wait applied to a 429 that carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    temperature: f32,
    timeout_secs: u64,
    budget: Arc<RateLimitBudget>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct Tool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolFunction<'a>,
}

#[derive(Serialize)]
struct ToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Parameters,
}

impl<'a> From<&'a FunctionSpec> for Tool<'a> {
    fn from(spec: &'a FunctionSpec) -> Self {
        Self {
            kind: "function",
            function: ToolFunction {
                name: &spec.name,
                description: &spec.description,
                parameters: &spec.parameters,
            },
        }
    }
}

impl OpenAiProvider {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            budget: Arc::new(RateLimitBudget::new()),
        }
    }

    /// Rate-limit state shared by every call made through this provider.
    pub fn budget(&self) -> Arc<RateLimitBudget> {
        Arc::clone(&self.budget)
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(format!("request timed out after {}s", self.timeout_secs))
        } else {
            Error::Llm(format!("request failed: {e}"))
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        functions: &[FunctionSpec],
        cancel: CancellationToken,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let tools: Vec<Tool<'_>> = functions.iter().map(Tool::from).collect();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            temperature: self.temperature,
        };

        loop {
            if cancel.is_cancelled() {
                return Err(Error::cancelled("before request"));
            }

            if let Some(wait) = self.budget.wait_duration() {
                debug!(wait_ms = wait.as_millis() as u64, "rate limit budget exhausted, waiting");
                sleep_or_cancel(wait, &cancel, "waiting for rate limit reset").await?;
            }

            let mut builder = self.client.post(&url).json(&request);
            if let Some(ref key) = self.api_key {
                builder = builder.bearer_auth(key.expose_secret());
            }

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::cancelled("request in flight")),
                sent = builder.send() => sent.map_err(|e| self.map_send_error(e))?,
            };

            self.budget.update(response.headers());
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = rate_limit::retry_after(response.headers()).unwrap_or(DEFAULT_RETRY_AFTER);
                warn!(wait_secs = wait.as_secs(), "rate limited (429), retrying same request");
                sleep_or_cancel(wait, &cancel, "waiting for Retry-After").await?;
                continue;
            }

            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::cancelled("reading response")),
                text = response.text() => text.map_err(|e| self.map_send_error(e))?,
            };

            if !status.is_success() {
                let message = serde_json::from_str::<ChatResponse>(&body)
                    .ok()
                    .and_then(|r| r.error)
                    .map(|e| e.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(body);
                return Err(Error::LlmStatus {
                    status: status.as_u16(),
                    body: message,
                });
            }

            let parsed: ChatResponse = serde_json::from_str(&body)
                .map_err(|e| Error::Llm(format!("invalid response format: {e}")))?;

            if let Some(error) = parsed.error {
                return Err(Error::LlmStatus {
                    status: status.as_u16(),
                    body: error.message,
                });
            }

            return extract::extract(&parsed);
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}
