// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::{ChangeSet, FileDiff, FileSummary, ToolInput};
use crate::error::{Error, Result};
use crate::services::git::{DELETED_FILE_MARKER, NEW_FILE_MARKER, Repository};
use crate::services::llm::{self, LlmProvider};
use crate::services::registry::{FunctionRegistry, GENERATE_FILE_SUMMARY};
use crate::services::safety;

/// Summaries containing any of these go under "Additional changes" without text.
const MINOR_TOKENS: &[&str] = &["only formatting", "minor changes", "various fixes"];

/// Diff after import-block filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredDiff {
    pub diff: String,
    pub significant: bool,
}

/// Per-file summarization over the working tree.
pub struct ChangeSummarizer {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<FunctionRegistry>,
    ignore: GlobSet,
    use_gitignore: bool,
    allow_secrets: bool,
    max_diff_lines: usize,
}

impl ChangeSummarizer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<FunctionRegistry>,
        config: &Config,
    ) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid ignore pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let ignore = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid ignore patterns: {e}")))?;

        Ok(Self {
            provider,
            registry,
            ignore,
            use_gitignore: config.use_gitignore,
            allow_secrets: config.allow_secrets,
            max_diff_lines: config.max_diff_lines,
        })
    }

    /// Summarize every eligible path, in repository status order.
    ///
    /// Diffs are collected and secret-scanned before any of them is sent.
    pub async fn summarize(
        &self,
        repo: &dyn Repository,
        cancel: &CancellationToken,
    ) -> Result<ChangeSet> {
        let branch = repo.current_branch().await?;
        let diffs = self.collect(repo).await?;

        if !self.allow_secrets {
            let found = safety::scan_for_secrets(&diffs);
            if !found.is_empty() {
                return Err(Error::SecretsDetected {
                    patterns: found.iter().map(ToString::to_string).collect(),
                });
            }
        }

        let spec = self.registry.get(GENERATE_FILE_SUMMARY)?;
        let mut summaries = Vec::with_capacity(diffs.len());

        for file in diffs {
            if cancel.is_cancelled() {
                return Err(Error::cancelled("summarizing changes"));
            }

            let filtered = filter_import_blocks(&file.diff);
            let input = ToolInput::new()
                .with("file", file.change.path.display().to_string())
                .with("status", file.change.status.as_str())
                .with("diff", filtered.diff)
                .with("hasSignificantChanges", filtered.significant);

            let raw = llm::invoke(self.provider.as_ref(), spec, &input, cancel).await?;
            let summary = clean_phrase(&raw);
            debug!(path = %file.change.path.display(), %summary, "file summarized");

            summaries.push(FileSummary {
                path: file.change.path,
                status: file.change.status,
                summary,
            });
        }

        info!(branch = %branch, files = summaries.len(), "change set summarized");
        Ok(ChangeSet { branch, summaries })
    }

    async fn collect(&self, repo: &dyn Repository) -> Result<Vec<FileDiff>> {
        let mut diffs = Vec::new();

        for change in repo.status().await? {
            if self.is_ignored(repo, &change.path).await? {
                debug!(path = %change.path.display(), "skipping ignored path");
                continue;
            }
            let diff = repo.diff(&change).await?;
            diffs.push(FileDiff {
                change,
                diff: truncate_lines(&diff, self.max_diff_lines),
            });
        }

        Ok(diffs)
    }

    async fn is_ignored(&self, repo: &dyn Repository, path: &Path) -> Result<bool> {
        if self.ignore.is_match(path) {
            return Ok(true);
        }
        if self.use_gitignore {
            return repo.is_ignored(path).await;
        }
        Ok(false)
    }
}

/// Keep at most `max` lines, noting how many were dropped.
pub fn truncate_lines(diff: &str, max: usize) -> String {
    let total = diff.lines().count();
    if total <= max {
        return diff.to_string();
    }

    let mut out: String = diff.lines().take(max).collect::<Vec<_>>().join("\n");
    let _ = write!(out, "\n... ({} more lines truncated)", total - max);
    out
}

/// Drop unchanged lines inside `import ( ... )` blocks and decide whether the diff
/// carries any significant change.
pub fn filter_import_blocks(diff: &str) -> FilteredDiff {
    let mut kept = Vec::new();
    let mut significant = false;
    let mut in_block = false;

    for line in diff.lines() {
        if line.starts_with(NEW_FILE_MARKER) || line.starts_with(DELETED_FILE_MARKER) {
            significant = true;
            kept.push(line);
            continue;
        }
        if is_header(line) {
            kept.push(line);
            continue;
        }

        let (changed, body) = match line.chars().next() {
            Some('+') | Some('-') => (true, &line[1..]),
            Some(' ') => (false, &line[1..]),
            _ => (false, line),
        };
        let content = body.trim();

        if in_block {
            if content == ")" {
                in_block = false;
                kept.push(line);
            } else if changed {
                if !content.is_empty() {
                    significant = true;
                }
                kept.push(line);
            }
            continue;
        }

        if content == "import (" {
            in_block = true;
        }
        if changed && !content.is_empty() {
            significant = true;
        }
        kept.push(line);
    }

    FilteredDiff {
        diff: kept.join("\n"),
        significant,
    }
}

fn is_header(line: &str) -> bool {
    ["+++", "---", "@@", "diff --git", "index "]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// First non-empty line, unquoted, without a trailing period.
fn clean_phrase(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .trim_matches(|c| c == '"' || c == '`')
        .trim()
        .trim_end_matches('.')
        .to_string()
}

fn is_minor(summary: &str) -> bool {
    let lower = summary.to_lowercase();
    MINOR_TOKENS.iter().any(|token| lower.contains(token))
}

/// Branch-labelled text handed to commit-message generation.
pub fn aggregate(set: &ChangeSet) -> String {
    let mut out = format!("Changes on branch '{}':\n", set.branch);
    let mut minor = Vec::new();

    for file in &set.summaries {
        if is_minor(&file.summary) {
            minor.push(&file.path);
        } else {
            let _ = writeln!(out, "* {}: {}", file.path.display(), file.summary);
        }
    }

    if !minor.is_empty() {
        out.push_str("Additional changes:\n");
        for path in minor {
            let _ = writeln!(out, "* {}", path.display());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_context_lines_are_dropped() {
        let diff = "@@ -1,6 +1,7 @@\n import (\n \t\"fmt\"\n+\t\"os\"\n \t\"strings\"\n )\n func main() {}";
        let filtered = filter_import_blocks(diff);
        assert_eq!(
            filtered.diff,
            "@@ -1,6 +1,7 @@\n import (\n+\t\"os\"\n )\n func main() {}"
        );
        assert!(filtered.significant);
    }

    #[test]
    fn whitespace_only_changes_are_not_significant() {
        let diff = "@@ -1,3 +1,3 @@\n fn a() {}\n-   \n+\n fn b() {}";
        assert!(!filter_import_blocks(diff).significant);
    }

    #[test]
    fn deleted_marker_is_significant() {
        let diff = format!("{DELETED_FILE_MARKER} old.rs\n");
        assert!(filter_import_blocks(&diff).significant);
    }

    #[test]
    fn truncation_keeps_head() {
        let diff = (1..=10).map(|i| format!("+{i}")).collect::<Vec<_>>().join("\n");
        let out = truncate_lines(&diff, 3);
        assert_eq!(out, "+1\n+2\n+3\n... (7 more lines truncated)");
        assert_eq!(truncate_lines("+a\n+b", 3), "+a\n+b");
    }

    #[test]
    fn phrase_cleanup() {
        assert_eq!(clean_phrase("\"add retry loop.\"\nextra"), "add retry loop");
        assert_eq!(clean_phrase("\n  only formatting  \n"), "only formatting");
    }
}
