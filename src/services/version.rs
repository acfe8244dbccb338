// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, VersionConfig};
use crate::domain::{Suggestion, ToolInput, VersionActions, VersionProposal};
use crate::error::{Error, Result};
use crate::services::git::Repository;
use crate::services::llm::{self, LlmProvider};
use crate::services::registry::{ANALYZE_VERSION_BUMP, FunctionRegistry};
use crate::services::suggestion;
use crate::services::summarizer::ChangeSummarizer;

const DEFAULT_VERSION: Version = Version::new(0, 1, 0);

/// Where the current version was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    File(PathBuf),
    Tag(String),
    Default,
}

/// Current version plus the newest release tag, used to bound commit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: Version,
    pub source: VersionSource,
    pub latest_tag: Option<String>,
}

/// What an apply run actually did. All empty/false on a repeated run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub files_updated: Vec<PathBuf>,
    pub committed: bool,
    pub tagged: bool,
}

impl ApplyReport {
    pub fn is_noop(&self) -> bool {
        self.files_updated.is_empty() && !self.committed && !self.tagged
    }
}

/// Owns the in-flight [`VersionProposal`] from analysis until it is applied or cleared.
pub struct VersionAnalyzer {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<FunctionRegistry>,
    settings: VersionConfig,
    timeout: Duration,
    sign: bool,
    proposal: Option<VersionProposal>,
    // Kept so a repeated apply re-checks the same change and finds it done
    applied: Option<VersionProposal>,
}

impl VersionAnalyzer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<FunctionRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            registry,
            settings: config.version.clone(),
            timeout: Duration::from_secs(config.generation_timeout_secs),
            sign: config.sign,
            proposal: None,
            applied: None,
        }
    }

    pub fn proposal(&self) -> Option<&VersionProposal> {
        self.proposal.as_ref()
    }

    /// Forget both the held proposal and the last applied one.
    pub fn clear(&mut self) {
        self.proposal = None;
        self.applied = None;
    }

    /// Version file first, then the highest `v`-prefixed tag, then 0.1.0.
    pub async fn resolve_current(&self, repo: &dyn Repository) -> Result<ResolvedVersion> {
        let latest_tag = highest_version_tag(&repo.tags().await?);

        let path = repo.root().join(&self.settings.file);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match parse_version_token(&content) {
                Some(version) => {
                    debug!(path = %path.display(), %version, "version read from file");
                    return Ok(ResolvedVersion {
                        version,
                        source: VersionSource::File(PathBuf::from(&self.settings.file)),
                        latest_tag: latest_tag.map(|(name, _)| name),
                    });
                }
                None => warn!(path = %path.display(), "version file is not a semantic version"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some((name, version)) = latest_tag {
            debug!(tag = %name, %version, "version read from tag");
            return Ok(ResolvedVersion {
                version,
                source: VersionSource::Tag(name.clone()),
                latest_tag: Some(name),
            });
        }

        debug!(version = %DEFAULT_VERSION, "no version file or tag, using default");
        Ok(ResolvedVersion {
            version: DEFAULT_VERSION,
            source: VersionSource::Default,
            latest_tag: None,
        })
    }

    /// Ask the model for a bump and hold the resulting proposal.
    pub async fn analyze(
        &mut self,
        repo: &dyn Repository,
        summarizer: &ChangeSummarizer,
        cancel: &CancellationToken,
    ) -> Result<VersionProposal> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("before version analysis"));
        }

        let analysis = async {
            let resolved = self.resolve_current(repo).await?;
            let changes = summarizer.summarize(repo, cancel).await?;
            let history = repo.commit_subjects(resolved.latest_tag.as_deref()).await?;

            let input = ToolInput::new()
                .with("current_version", resolved.version.to_string())
                .with("file_changes", or_none(changes.phrases()))
                .with("commit_history", or_none(history))
                .with("breaking_keywords", self.settings.breaking_keywords.clone())
                .with("feature_keywords", self.settings.feature_keywords.clone());

            let spec = self.registry.get(ANALYZE_VERSION_BUMP)?;
            let raw = llm::invoke(self.provider.as_ref(), spec, &input, cancel).await?;
            let suggestion = suggestion::parse(&raw, &resolved.version)?;
            info!(
                current = %resolved.version,
                suggestion = %suggestion.to_compact(),
                "version suggestion"
            );
            Ok::<_, Error>((resolved.version, suggestion))
        };

        let (current, suggestion) = tokio::time::timeout(self.timeout, analysis)
            .await
            .map_err(|_| {
                Error::Timeout(format!("version analysis exceeded {}s", self.timeout.as_secs()))
            })??;

        self.hold(current, suggestion)
    }

    /// Replace the held proposal with an explicit bump from the current version.
    pub async fn propose(
        &mut self,
        repo: &dyn Repository,
        suggestion: Suggestion,
    ) -> Result<VersionProposal> {
        let current = match self.proposal {
            Some(ref held) => held.current.clone(),
            None => self.resolve_current(repo).await?.version,
        };
        self.hold(current, suggestion)
    }

    fn hold(&mut self, current: Version, suggestion: Suggestion) -> Result<VersionProposal> {
        let proposal = VersionProposal::new(current, suggestion, VersionActions::all(self.sign))?;
        self.proposal = Some(proposal.clone());
        Ok(proposal)
    }

    /// Apply the held proposal and release it. With nothing held, the last applied
    /// proposal is run again, which finds every step done and reports nothing.
    pub async fn apply(
        &mut self,
        repo: &dyn Repository,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport> {
        let Some(proposal) = self.proposal.clone().or_else(|| self.applied.clone()) else {
            return Err(Error::Input("no version change has been proposed".into()));
        };
        let report = self.apply_proposal(repo, &proposal, cancel).await?;
        self.proposal = None;
        self.applied = Some(proposal);
        Ok(report)
    }

    /// Rewrite files, commit, tag. Each step is skipped when its result already exists.
    pub async fn apply_proposal(
        &self,
        repo: &dyn Repository,
        proposal: &VersionProposal,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        let actions = proposal.actions;
        let old = proposal.current.to_string();
        let new = proposal.proposed.to_string();

        if actions.update_files {
            report.files_updated = self.rewrite_files(repo, &old, &new).await?;
        }

        if cancel.is_cancelled() {
            return Err(Error::cancelled("before version commit"));
        }

        if actions.commit {
            let message = proposal.commit_message();
            if repo.head_subject().await?.as_deref() == Some(message.as_str()) {
                debug!(%message, "version commit already exists");
            } else if report.files_updated.is_empty() {
                warn!("no files changed, skipping version commit");
            } else {
                repo.commit(&message, &report.files_updated, actions.sign).await?;
                report.committed = true;
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::cancelled("before version tag"));
        }

        if actions.tag {
            let tag = proposal.tag_name();
            if repo.tags().await?.iter().any(|t| *t == tag) {
                debug!(%tag, "tag already exists");
            } else {
                repo.tag(&tag, &format!("Release {new}"), actions.sign).await?;
                report.tagged = true;
            }
        }

        info!(
            version = %new,
            files = report.files_updated.len(),
            committed = report.committed,
            tagged = report.tagged,
            "version change applied"
        );
        Ok(report)
    }

    /// The version file is written outright; other files get `old` replaced by `new`.
    async fn rewrite_files(&self, repo: &dyn Repository, old: &str, new: &str) -> Result<Vec<PathBuf>> {
        let mut updated = Vec::new();

        let mut files = vec![self.settings.file.clone()];
        for file in &self.settings.files {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }

        for file in files {
            let path = repo.root().join(&file);
            let is_version_file = file == self.settings.file;

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => Some(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };

            let rewritten = match (content, is_version_file) {
                (Some(content), true) if content.trim() == new => None,
                (_, true) => Some(format!("{new}\n")),
                (Some(content), false) => replace_version_token(&content, old, new),
                (None, false) => {
                    warn!(path = %path.display(), "version file listed but missing");
                    None
                }
            };

            if let Some(rewritten) = rewritten {
                tokio::fs::write(&path, rewritten).await?;
                debug!(path = %path.display(), "version rewritten");
                updated.push(PathBuf::from(file));
            }
        }

        Ok(updated)
    }
}

fn or_none(items: Vec<String>) -> Vec<String> {
    if items.is_empty() { vec!["(none)".into()] } else { items }
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+')
}

/// Replace standalone occurrences of `old`, optionally `v`-prefixed. `1.0.0` inside
/// `11.0.0` or `1.0.0-rc1` is left alone. `None` when nothing matched.
pub fn replace_version_token(content: &str, old: &str, new: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for (start, _) in content.match_indices(old) {
        let end = start + old.len();
        let head = &content[..start];
        let head = head.strip_suffix('v').unwrap_or(head);
        let before = head.chars().next_back();
        let after = content[end..].chars().next();
        if before.is_some_and(is_version_char) || after.is_some_and(is_version_char) {
            continue;
        }
        out.push_str(&content[last..start]);
        out.push_str(new);
        last = end;
    }

    if last == 0 {
        return None;
    }
    out.push_str(&content[last..]);
    Some(out)
}

/// Parse a version token, tolerating a leading `v` and surrounding whitespace.
pub fn parse_version_token(s: &str) -> Option<Version> {
    let s = s.trim();
    Version::parse(s.strip_prefix('v').unwrap_or(s)).ok()
}

/// Highest `vX.Y.Z[-pre]` tag by semver precedence.
pub fn highest_version_tag(tags: &[String]) -> Option<(String, Version)> {
    tags.iter()
        .filter_map(|tag| {
            let rest = tag.strip_prefix('v')?;
            Version::parse(rest).ok().map(|v| (tag.clone(), v))
        })
        .max_by(|(_, a), (_, b)| a.cmp(b))
}
