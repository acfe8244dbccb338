// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Untracked,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Untracked => "untracked",
        }
    }

    /// Map a porcelain v1 `XY` code to a status. Index state wins over worktree state.
    pub fn from_porcelain(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let index = chars.next()?;
        let worktree = chars.next().unwrap_or(' ');

        match (index, worktree) {
            ('?', '?') => Some(Self::Untracked),
            ('!', '!') => None,
            ('R', _) | (_, 'R') => Some(Self::Renamed),
            ('C', _) | (_, 'C') => Some(Self::Copied),
            ('A', _) => Some(Self::Added),
            ('D', _) | (_, 'D') => Some(Self::Deleted),
            ('M', _) | (_, 'M') | ('T', _) | (_, 'T') => Some(Self::Modified),
            _ => None,
        }
    }

    /// Whether the whole file is new to the repository.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Added | Self::Copied | Self::Untracked)
    }

    /// Renames and copies carry their source path as a second porcelain entry.
    pub fn has_origin(&self) -> bool {
        matches!(self, Self::Renamed | Self::Copied)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One path reported by the repository status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub status: ChangeStatus,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}

/// A path together with the diff that will be summarized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub change: FileChange,
    pub diff: String,
}

/// Short natural-language phrase for one changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub path: PathBuf,
    pub status: ChangeStatus,
    pub summary: String,
}

/// Per-path summaries in repository status order, labelled with the branch.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub branch: String,
    pub summaries: Vec<FileSummary>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.summaries.iter().map(|s| s.path.clone()).collect()
    }

    /// `path: summary` lines, used as `file_changes` for version analysis.
    pub fn phrases(&self) -> Vec<String> {
        self.summaries
            .iter()
            .map(|s| format!("{}: {}", s.path.display(), s.summary))
            .collect()
    }
}
