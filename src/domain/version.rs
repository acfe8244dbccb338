// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::LazyLock;

use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};

use crate::error::{Error, Result};

static PRE_RELEASE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(alpha|beta|rc)\d+$").unwrap());

/// Which semver component to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum BumpKind {
    #[default]
    None,
    Patch,
    Minor,
    Major,
}

impl BumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    /// `major`, `minor`, `patch`; the empty string means no increment.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "patch" => Some(Self::Patch),
            "" | "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for BumpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `alphaN`, `betaN` or `rcN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreRelease(Prerelease);

impl PreRelease {
    pub fn parse(s: &str) -> Result<Self> {
        if !PRE_RELEASE_REGEX.is_match(s) {
            return Err(Error::Validate(format!(
                "invalid pre-release '{s}', must match alphaN, betaN or rcN"
            )));
        }
        Prerelease::new(s)
            .map(Self)
            .map_err(|e| Error::Validate(format!("invalid pre-release '{s}': {e}")))
    }

    /// Empty input means no pre-release.
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        if s.is_empty() {
            Ok(None)
        } else {
            Self::parse(s).map(Some)
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for PreRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed version suggestion: which component to bump and the pre-release to attach.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestion {
    pub kind: BumpKind,
    pub pre: Option<PreRelease>,
}

impl Suggestion {
    pub fn new(kind: BumpKind, pre: Option<PreRelease>) -> Self {
        Self { kind, pre }
    }

    /// Compact single-line form: `minor:beta1`, `major`, `rc2`, `stable`.
    pub fn to_compact(&self) -> String {
        match (self.kind, &self.pre) {
            (BumpKind::None, None) => "stable".into(),
            (BumpKind::None, Some(pre)) => pre.to_string(),
            (kind, None) => kind.to_string(),
            (kind, Some(pre)) => format!("{kind}:{pre}"),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.kind == BumpKind::None && self.pre.is_none()
    }

    /// Version that results from applying this suggestion to `current`.
    ///
    /// A non-empty suggestion always yields a version strictly greater than `current`:
    /// when the increment alone does not get there (a bare pre-release on an equal or
    /// later version), the patch component is bumped as well.
    pub fn apply_to(&self, current: &Version) -> Result<Version> {
        let mut next = match self.kind {
            BumpKind::Major => Version::new(bump(current.major, "major")?, 0, 0),
            BumpKind::Minor => Version::new(current.major, bump(current.minor, "minor")?, 0),
            BumpKind::Patch => {
                Version::new(current.major, current.minor, bump(current.patch, "patch")?)
            }
            BumpKind::None => Version::new(current.major, current.minor, current.patch),
        };
        next.pre = self
            .pre
            .as_ref()
            .map(|p| p.0.clone())
            .unwrap_or(Prerelease::EMPTY);
        next.build = BuildMetadata::EMPTY;

        if !self.is_noop() && next <= *current {
            next.patch = bump(next.patch, "patch")?;
        }
        Ok(next)
    }
}

fn bump(component: u64, name: &str) -> Result<u64> {
    component.checked_add(1).ok_or_else(|| {
        Error::Validate(format!(
            "{name} version component cannot be incremented past {component}"
        ))
    })
}

/// Actions planned for an approved proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionActions {
    pub update_files: bool,
    pub commit: bool,
    pub tag: bool,
    pub sign: bool,
}

impl VersionActions {
    pub fn all(sign: bool) -> Self {
        Self {
            update_files: true,
            commit: true,
            tag: true,
            sign,
        }
    }
}

/// In-flight version change, owned by the analyzer until applied or cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionProposal {
    pub current: Version,
    pub proposed: Version,
    pub kind: BumpKind,
    pub pre: Option<PreRelease>,
    pub actions: VersionActions,
}

impl VersionProposal {
    pub fn new(
        current: Version,
        suggestion: Suggestion,
        actions: VersionActions,
    ) -> Result<Self> {
        let proposed = suggestion.apply_to(&current)?;
        Ok(Self {
            current,
            proposed,
            kind: suggestion.kind,
            pre: suggestion.pre,
            actions,
        })
    }

    pub fn tag_name(&self) -> String {
        format!("v{}", self.proposed)
    }

    pub fn commit_message(&self) -> String {
        format!("chore(version): bump version to {}", self.proposed)
    }
}
