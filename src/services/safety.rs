// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::FileDiff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMatch {
    pub pattern_name: String,
    pub file: String,
    pub line: usize,
}

impl std::fmt::Display for SecretMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in {}:{}", self.pattern_name, self.file, self.line)
    }
}

static SECRET_PATTERNS: LazyLock<Vec<(&str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "API Key",
            Regex::new(r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*["']?[a-zA-Z0-9_-]{20,}"#).unwrap(),
        ),
        ("AWS Key", Regex::new(r"AKIA[0-9A-Z]{16}").unwrap()),
        (
            "Private Key",
            Regex::new(r"-----BEGIN .* PRIVATE KEY-----").unwrap(),
        ),
        ("OpenAI Key", Regex::new(r"sk-(proj-)?[a-zA-Z0-9_-]{40,}").unwrap()),
        (
            "Generic Secret",
            Regex::new(r#"(?i)(password|secret|token)\s*[:=]\s*["'][^"']{8,}["']"#).unwrap(),
        ),
        (
            "Connection String",
            Regex::new(r"(?i)(mongodb|postgres|mysql|redis)://[^\s:]+:[^\s@]+@[^\s]+").unwrap(),
        ),
    ]
});

/// Scan the added lines of every diff. Line numbers are 1-based positions in the diff text.
pub fn scan_for_secrets(diffs: &[FileDiff]) -> Vec<SecretMatch> {
    let mut found = Vec::new();

    for file in diffs {
        for (index, line) in file.diff.lines().enumerate() {
            if !line.starts_with('+') || line.starts_with("+++") {
                continue;
            }

            if let Some((name, _)) = SECRET_PATTERNS.iter().find(|(_, re)| re.is_match(line)) {
                found.push(SecretMatch {
                    pattern_name: name.to_string(),
                    file: file.change.path.display().to_string(),
                    line: index + 1,
                });
            }
        }
    }

    found
}
