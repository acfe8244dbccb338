// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::domain::CommitType;

pub const MAX_HEADER_LENGTH: usize = 72;

static SCOPE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());

static DESCRIPTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][-a-z0-9 ]*[a-z0-9]$").unwrap());

/// Why a commit message was rejected. The `Display` text is fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("empty message")]
    Empty,

    #[error("missing colon separator")]
    MissingColon,

    #[error("header too long ({0} chars, max {max})", max = MAX_HEADER_LENGTH)]
    HeaderTooLong(usize),

    #[error("invalid type '{0}', must be one of: {types}", types = CommitType::ALL.join(", "))]
    InvalidType(String),

    #[error("malformed scope - missing closing parenthesis")]
    UnclosedScope,

    #[error("empty scope")]
    EmptyScope,

    #[error("scope must be lowercase letters, digits and hyphens, starting with a letter: '{0}'")]
    InvalidScope(String),

    #[error("must have exactly one space after colon")]
    SpaceAfterColon,

    #[error("description ends with period")]
    TrailingPeriod,

    #[error("description must be lowercase")]
    UppercaseDescription,

    #[error(
        "description must start with lowercase letter and contain only lowercase letters, digits, spaces and hyphens"
    )]
    InvalidDescription,

    #[error("must have blank line after header")]
    MissingBlankLine,
}

/// Conventional Commits header check plus body layout rules.
#[derive(Debug, Clone)]
pub struct CommitValidator {
    preferred_body_length: usize,
}

impl Default for CommitValidator {
    fn default() -> Self {
        Self::new(72)
    }
}

impl CommitValidator {
    pub fn new(preferred_body_length: usize) -> Self {
        Self {
            preferred_body_length,
        }
    }

    /// Empty string when valid, otherwise the reason.
    pub fn diagnose(&self, message: &str) -> String {
        match self.check(message) {
            Ok(()) => String::new(),
            Err(v) => v.to_string(),
        }
    }

    pub fn check(&self, message: &str) -> Result<(), Violation> {
        if message.trim().is_empty() {
            return Err(Violation::Empty);
        }

        let lines: Vec<&str> = message.lines().collect();
        check_header(lines[0])?;

        if lines.len() > 1 {
            if !lines[1].trim().is_empty() {
                return Err(Violation::MissingBlankLine);
            }
            for (index, line) in lines.iter().enumerate().skip(2) {
                let length = line.chars().count();
                if length > self.preferred_body_length {
                    warn!(
                        line = index + 1,
                        length,
                        preferred = self.preferred_body_length,
                        "commit body line exceeds preferred length"
                    );
                }
            }
        }

        Ok(())
    }
}

fn check_header(header: &str) -> Result<(), Violation> {
    let Some(colon) = header.find(':') else {
        return Err(Violation::MissingColon);
    };

    let length = header.chars().count();
    if length > MAX_HEADER_LENGTH {
        return Err(Violation::HeaderTooLong(length));
    }

    let prefix = &header[..colon];
    let commit_type = match prefix.find('(') {
        Some(open) => {
            let Some(scope) = prefix[open + 1..].strip_suffix(')') else {
                return Err(Violation::UnclosedScope);
            };
            if scope.is_empty() {
                return Err(Violation::EmptyScope);
            }
            if !SCOPE_REGEX.is_match(scope) {
                return Err(Violation::InvalidScope(scope.to_string()));
            }
            &prefix[..open]
        }
        None => prefix,
    };

    if CommitType::parse(commit_type).is_none() {
        return Err(Violation::InvalidType(commit_type.to_string()));
    }

    let rest = &header[colon + 1..];
    let Some(description) = rest.strip_prefix(' ') else {
        return Err(Violation::SpaceAfterColon);
    };
    if description.starts_with(char::is_whitespace) {
        return Err(Violation::SpaceAfterColon);
    }

    if description.ends_with('.') {
        return Err(Violation::TrailingPeriod);
    }
    if description.chars().any(char::is_uppercase) {
        return Err(Violation::UppercaseDescription);
    }
    if !DESCRIPTION_REGEX.is_match(description) {
        return Err(Violation::InvalidDescription);
    }

    Ok(())
}
