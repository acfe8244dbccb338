// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use serde::Deserialize;

/// Structured header some models return instead of plain text
#[derive(Debug, Deserialize)]
struct StructuredCommit {
    #[serde(rename = "type")]
    commit_type: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(alias = "description")]
    subject: String,
}

/// Prefixes stripped from the start of a header, compared ASCII case-insensitively.
static PREAMBLE_PATTERNS: &[&str] = &[
    "here's the commit message:",
    "here is the commit message:",
    "here's a commit message:",
    "suggested commit message:",
    "suggested commit:",
    "commit message:",
    "commit:",
];

pub struct CommitSanitizer;

impl CommitSanitizer {
    /// Normalize raw model output into a single candidate header line.
    pub fn clean(raw: &str) -> String {
        if let Some(structured) = Self::try_parse_json(raw) {
            return Self::format_structured(&structured);
        }

        let without_marks: String = raw.chars().filter(|c| *c != '`' && *c != '"').collect();

        let first_line = without_marks
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");

        let mut line = first_line.to_string();
        while let Some(pattern) = PREAMBLE_PATTERNS.iter().find(|p| {
            line.get(..p.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(p))
        }) {
            line = line[pattern.len()..].trim().to_string();
        }

        line.trim().trim_end_matches('.').trim_end().to_string()
    }

    fn try_parse_json(raw: &str) -> Option<StructuredCommit> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    fn format_structured(s: &StructuredCommit) -> String {
        let subject = s.subject.trim().trim_end_matches('.');
        match s.scope.as_deref().map(str::trim).filter(|scope| !scope.is_empty()) {
            Some(scope) => format!("{}({}): {}", s.commit_type.trim(), scope, subject),
            None => format!("{}: {}", s.commit_type.trim(), subject),
        }
    }
}
