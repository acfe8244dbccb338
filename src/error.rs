// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(commitsmith::config::error),
        help("Run `commitsmith config` to inspect the effective configuration")
    )]
    Config(String),

    #[error("Invalid input: {0}")]
    #[diagnostic(code(commitsmith::input::invalid))]
    Input(String),

    #[error("No changes found")]
    #[diagnostic(
        code(commitsmith::git::no_changes),
        help("Only files outside the ignore patterns are summarized")
    )]
    NoChanges,

    #[error("LLM error: {0}")]
    #[diagnostic(code(commitsmith::llm::error))]
    Llm(String),

    #[error("LLM returned HTTP {status}: {body}")]
    #[diagnostic(code(commitsmith::llm::status))]
    LlmStatus { status: u16, body: String },

    #[error("No valid commit message after {attempts} attempt(s): {last_error}")]
    #[diagnostic(
        code(commitsmith::llm::generation_failed),
        help("Edit the message manually or raise max_retries")
    )]
    LlmGenFailed {
        attempts: usize,
        last_error: String,
        /// The last rejected candidate, kept for manual editing
        last_message: String,
    },

    #[error("Template error: {0}")]
    #[diagnostic(code(commitsmith::template::error))]
    Template(String),

    #[error("Validation failed: {0}")]
    #[diagnostic(code(commitsmith::validate::error))]
    Validate(String),

    #[error("Timed out: {0}")]
    #[diagnostic(code(commitsmith::timeout))]
    Timeout(String),

    #[error("Git error: {0}")]
    #[diagnostic(code(commitsmith::git::error))]
    Git(String),

    #[error("Merge in progress")]
    #[diagnostic(
        code(commitsmith::git::merge),
        help("Complete or abort the merge: git merge --abort")
    )]
    MergeInProgress,

    #[error("Potential secrets detected: {patterns:?}")]
    #[diagnostic(
        code(commitsmith::safety::secrets),
        help("Remove the secret or set allow_secrets = true")
    )]
    SecretsDetected { patterns: Vec<String> },

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),
}

impl Error {
    /// Stable machine-readable code, identical to the diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "commitsmith::config::error",
            Error::Input(_) => "commitsmith::input::invalid",
            Error::NoChanges => "commitsmith::git::no_changes",
            Error::Llm(_) => "commitsmith::llm::error",
            Error::LlmStatus { .. } => "commitsmith::llm::status",
            Error::LlmGenFailed { .. } => "commitsmith::llm::generation_failed",
            Error::Template(_) => "commitsmith::template::error",
            Error::Validate(_) => "commitsmith::validate::error",
            Error::Timeout(_) => "commitsmith::timeout",
            Error::Git(_) | Error::MergeInProgress => "commitsmith::git::error",
            Error::SecretsDetected { .. } => "commitsmith::safety::secrets",
            Error::Cancelled => "commitsmith::cancelled",
            Error::Io(_) => "commitsmith::io",
            Error::Dialog(_) => "commitsmith::dialog",
        }
    }

    /// `code: message: context: cause`, for logs and non-interactive output.
    pub fn composed(&self) -> String {
        format!("{}: {}", self.code(), self)
    }

    pub(crate) fn cancelled(context: &str) -> Self {
        Error::Timeout(format!("cancelled: {context}"))
    }
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Dialog(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
