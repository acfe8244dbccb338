// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use serde::Deserialize;

use crate::error::{Error, Result};

/// Preambles some models put in front of an otherwise clean answer.
const PREAMBLES: &[&str] = &["Here's a summary:", "Summary:", "Response:", "Result:"];

/// Envelope fields unwrapped from a JSON payload, in priority order.
const ENVELOPE_FIELDS: &[&str] = &["summary", "message", "content"];

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Legacy single function call
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
}

/// Pull the assistant payload out of a decoded chat response.
pub fn extract(response: &ChatResponse) -> Result<String> {
    let Some(choice) = response.choices.first() else {
        return Err(Error::Llm("no choices".into()));
    };
    let message = &choice.message;

    let call = message
        .tool_calls
        .as_deref()
        .and_then(|calls| calls.first())
        .map(|call| &call.function)
        .or(message.function_call.as_ref());

    let raw = if let Some(call) = call {
        call.arguments.clone()
    } else {
        match message.content.as_deref().map(str::trim) {
            Some(content) if !content.is_empty() => clean_content(content),
            _ => return Err(Error::Llm("empty response".into())),
        }
    };

    Ok(unwrap_envelope(&raw))
}

fn clean_content(content: &str) -> String {
    let mut text = strip_fence(content.trim()).to_string();

    for preamble in PREAMBLES {
        if let Some(rest) = text.strip_prefix(preamble) {
            text = rest.trim_start().to_string();
        }
    }

    text.replace('`', "").trim().to_string()
}

/// Drop a surrounding ``` fence, including its language tag.
fn strip_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    match inner.find('\n') {
        Some(newline) if !inner[..newline].contains(' ') => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}

/// Return the first non-empty `summary`, `message` or `content` string of a JSON object,
/// or `raw` unchanged.
pub fn unwrap_envelope(raw: &str) -> String {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw.trim())
    else {
        return raw.to_string();
    };

    ENVELOPE_FIELDS
        .iter()
        .filter_map(|field| map.get(*field).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string())
}
