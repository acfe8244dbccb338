// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{ChangeStatus, FileChange};
use crate::error::{Error, Result};

pub const NEW_FILE_MARKER: &str = "new file:";
pub const DELETED_FILE_MARKER: &str = "deleted file:";

/// Repository operations the core consumes. `GitService` is the real implementation.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Working-tree paths with changes, in status order.
    async fn status(&self) -> Result<Vec<FileChange>>;

    /// Textual diff for one path. New and deleted files start with
    /// [`NEW_FILE_MARKER`] / [`DELETED_FILE_MARKER`].
    async fn diff(&self, change: &FileChange) -> Result<String>;

    /// Whether the repository's ignore rules match `path`.
    async fn is_ignored(&self, path: &Path) -> Result<bool>;

    async fn current_branch(&self) -> Result<String>;

    async fn tags(&self) -> Result<Vec<String>>;

    /// Commit subjects after `since` (a tag), or the whole history.
    async fn commit_subjects(&self, since: Option<&str>) -> Result<Vec<String>>;

    /// Subject of the HEAD commit, if any.
    async fn head_subject(&self) -> Result<Option<String>>;

    /// Stage `paths` and commit them.
    async fn commit(&self, message: &str, paths: &[PathBuf], sign: bool) -> Result<()>;

    /// Create an annotated tag on HEAD.
    async fn tag(&self, name: &str, message: &str, sign: bool) -> Result<()>;

    /// Working-tree root.
    fn root(&self) -> &Path;
}

pub struct GitService {
    work_dir: PathBuf,
}

impl GitService {
    pub async fn discover() -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Git("Not a git repository".into()));
        }

        let work_dir = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        let service = Self { work_dir };
        service.check_state().await?;
        Ok(service)
    }

    pub fn at(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub async fn check_state(&self) -> Result<()> {
        let merge_head = self.run(&["rev-parse", "--git-path", "MERGE_HEAD"]).await?;
        let merge_head = self.work_dir.join(merge_head.trim());
        if merge_head.exists() {
            return Err(Error::MergeInProgress);
        }
        Ok(())
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(?args, "git");
        Ok(Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await?)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn has_head(&self) -> Result<bool> {
        Ok(self
            .output(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .await?
            .status
            .success())
    }

    async fn new_file_diff(&self, path: &Path) -> Result<String> {
        let full = self.work_dir.join(path);
        let mut diff = format!("{NEW_FILE_MARKER} {}\n", path.display());

        match tokio::fs::read(&full).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    for line in text.lines() {
                        diff.push('+');
                        diff.push_str(line);
                        diff.push('\n');
                    }
                }
                Err(_) => diff.push_str("(binary content)\n"),
            },
            // Staged-then-removed; the index still has it but the tree does not
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(diff)
    }
}

/// Parse `git status --porcelain=v1 -z` output.
pub fn parse_porcelain(output: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut entries = output.split('\0').filter(|e| !e.is_empty());

    while let Some(entry) = entries.next() {
        let (Some(code), Some(path)) = (entry.get(..2), entry.get(3..)) else {
            continue;
        };
        if path.is_empty() {
            continue;
        }

        let Some(status) = ChangeStatus::from_porcelain(code) else {
            continue;
        };
        if status.has_origin() {
            // -z puts the source path in the following entry
            entries.next();
        }
        changes.push(FileChange::new(path, status));
    }

    changes
}

#[async_trait]
impl Repository for GitService {
    async fn status(&self) -> Result<Vec<FileChange>> {
        let out = self
            .run(&["status", "--porcelain=v1", "-z", "--untracked-files=all"])
            .await?;
        Ok(parse_porcelain(&out))
    }

    async fn diff(&self, change: &FileChange) -> Result<String> {
        if change.status == ChangeStatus::Deleted {
            return Ok(format!("{DELETED_FILE_MARKER} {}\n", change.path.display()));
        }
        if change.status.is_new() {
            return self.new_file_diff(&change.path).await;
        }

        let path = change.path.to_string_lossy();
        let base = if self.has_head().await? { "HEAD" } else { "--cached" };
        self.run(&["diff", base, "--no-ext-diff", "--unified=3", "--", &path])
            .await
    }

    async fn is_ignored(&self, path: &Path) -> Result<bool> {
        let path = path.to_string_lossy();
        let output = self
            .output(&["check-ignore", "-q", "--no-index", "--", &path])
            .await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(Error::Git(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }

    async fn current_branch(&self) -> Result<String> {
        let output = self.output(&["symbolic-ref", "--short", "HEAD"]).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Ok("HEAD".into())
        }
    }

    async fn tags(&self) -> Result<Vec<String>> {
        let out = self.run(&["tag", "--list"]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn commit_subjects(&self, since: Option<&str>) -> Result<Vec<String>> {
        if !self.has_head().await? {
            return Ok(Vec::new());
        }

        let range = since.map(|tag| format!("{tag}..HEAD"));
        let mut args = vec!["log", "--format=%s"];
        if let Some(ref range) = range {
            args.push(range);
        }

        let out = self.run(&args).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn head_subject(&self) -> Result<Option<String>> {
        if !self.has_head().await? {
            return Ok(None);
        }
        let out = self.run(&["log", "-1", "--format=%s"]).await?;
        Ok(Some(out.trim().to_string()))
    }

    async fn commit(&self, message: &str, paths: &[PathBuf], sign: bool) -> Result<()> {
        if !paths.is_empty() {
            let paths: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
            let mut args = vec!["add", "-A", "--"];
            args.extend(paths.iter().map(String::as_str));
            self.run(&args).await?;
        }

        let mut args = vec!["commit", "-m", message];
        if sign {
            args.push("-S");
        }
        self.run(&args).await?;
        Ok(())
    }

    async fn tag(&self, name: &str, message: &str, sign: bool) -> Result<()> {
        let flag = if sign { "-s" } else { "-a" };
        self.run(&["tag", flag, name, "-m", message]).await?;
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.work_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_with_rename_and_untracked() {
        let out = " M src/lib.rs\0R  new.rs\0old.rs\0?? notes.txt\0 D gone.rs\0";
        let changes = parse_porcelain(out);
        assert_eq!(
            changes,
            vec![
                FileChange::new("src/lib.rs", ChangeStatus::Modified),
                FileChange::new("new.rs", ChangeStatus::Renamed),
                FileChange::new("notes.txt", ChangeStatus::Untracked),
                FileChange::new("gone.rs", ChangeStatus::Deleted),
            ]
        );
    }

    #[test]
    fn porcelain_copy_consumes_its_source() {
        let changes = parse_porcelain("C  copy.rs\0orig.rs\0 M lib.rs\0");
        assert_eq!(
            changes,
            vec![
                FileChange::new("copy.rs", ChangeStatus::Copied),
                FileChange::new("lib.rs", ChangeStatus::Modified),
            ]
        );
    }

    #[test]
    fn porcelain_tolerates_multibyte_paths() {
        let changes = parse_porcelain("C  copy.rs\0aé.rs\0?? é.txt\0");
        assert_eq!(
            changes,
            vec![
                FileChange::new("copy.rs", ChangeStatus::Copied),
                FileChange::new("é.txt", ChangeStatus::Untracked),
            ]
        );
        // A malformed entry whose code splits a character is skipped
        assert!(parse_porcelain("Mé.rs\0").is_empty());
    }

    #[test]
    fn porcelain_empty() {
        assert!(parse_porcelain("").is_empty());
    }
}
