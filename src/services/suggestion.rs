// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Parse the model's one-line version recommendation.
//!
//! Accepted shapes: a full version (`2.0.0-alpha1`, optional leading `v`), `kind:pre`
//! with an empty side allowed, a bare `major`/`minor`/`patch`, a bare pre-release
//! (`beta2`), or `stable`.

use semver::Version;
use tracing::warn;

use crate::domain::{BumpKind, PreRelease, Suggestion};
use crate::error::{Error, Result};

pub fn parse(input: &str, current: &Version) -> Result<Suggestion> {
    let s = normalize(input);

    if s.is_empty() {
        return Err(Error::Validate("empty version suggestion".into()));
    }

    if s.contains('.') {
        return parse_full(&s, current);
    }

    if let Some((kind, pre)) = s.split_once(':') {
        let kind = match kind {
            "" => BumpKind::None,
            "major" | "minor" | "patch" => BumpKind::parse(kind).unwrap_or_default(),
            other => {
                return Err(Error::Validate(format!(
                    "invalid bump kind '{other}', must be major, minor or patch"
                )));
            }
        };
        return Ok(Suggestion::new(kind, PreRelease::parse_optional(pre)?));
    }

    match s.as_str() {
        "stable" => Ok(Suggestion::default()),
        "major" => Ok(Suggestion::new(BumpKind::Major, None)),
        "minor" => Ok(Suggestion::new(BumpKind::Minor, None)),
        "patch" => Ok(Suggestion::new(BumpKind::Patch, None)),
        other => match PreRelease::parse(other) {
            Ok(pre) => Ok(Suggestion::new(BumpKind::None, Some(pre))),
            Err(_) => Err(Error::Validate(format!(
                "unrecognized version suggestion '{other}'"
            ))),
        },
    }
}

/// First non-empty line, lowercased, without quotes or backticks.
fn normalize(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .trim_matches(|c| c == '`' || c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// A full version is reduced to the component that changed first plus its pre-release.
fn parse_full(s: &str, current: &Version) -> Result<Suggestion> {
    let raw = s.strip_prefix('v').unwrap_or(s);
    let suggested = Version::parse(raw)
        .map_err(|e| Error::Validate(format!("invalid version '{s}': {e}")))?;

    let pre = PreRelease::parse_optional(suggested.pre.as_str())?;

    let base = Version::new(suggested.major, suggested.minor, suggested.patch);
    let current_base = Version::new(current.major, current.minor, current.patch);
    if base < current_base {
        return Err(Error::Validate(format!(
            "suggested version {suggested} is lower than current {current}"
        )));
    }

    let kind = if suggested.major != current.major {
        BumpKind::Major
    } else if suggested.minor != current.minor {
        BumpKind::Minor
    } else if suggested.patch != current.patch {
        BumpKind::Patch
    } else {
        BumpKind::None
    };

    let suggestion = Suggestion::new(kind, pre);
    if let Some(actual) = adjusted(&suggested, &suggestion, current)? {
        warn!(
            %suggested,
            proposed = %actual,
            "suggested version is not a plain increment, proposing the increment instead"
        );
    }
    Ok(suggestion)
}

/// The version `suggestion` really yields on `current`, when it differs from `suggested`.
fn adjusted(
    suggested: &Version,
    suggestion: &Suggestion,
    current: &Version,
) -> Result<Option<Version>> {
    let actual = suggestion.apply_to(current)?;
    Ok((actual != *suggested).then_some(actual))
}
