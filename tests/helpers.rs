// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use commitsmith::config::Config;
use commitsmith::domain::{FileChange, FunctionSpec};
use commitsmith::error::{Error, Result};
use commitsmith::services::git::Repository;
use commitsmith::services::llm::LlmProvider;

/// One recorded provider call.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Call {
    pub function: String,
    pub system: String,
    pub user: String,
}

/// Answers each function from its own queue of canned responses.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<String>>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, function: &str, responses: &[&str]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(function.to_string())
            .or_default()
            .extend(responses.iter().map(|r| r.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, function: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.function == function)
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        functions: &[FunctionSpec],
        _cancel: CancellationToken,
    ) -> Result<String> {
        let function = functions.first().map(|f| f.name.clone()).unwrap_or_default();
        self.calls.lock().unwrap().push(Call {
            function: function.clone(),
            system: system.to_string(),
            user: user.to_string(),
        });

        self.scripts
            .lock()
            .unwrap()
            .get_mut(&function)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| Error::Llm(format!("no scripted response for {function}")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Commit or tag recorded by [`MemoryRepo`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub message: String,
    pub paths: Vec<PathBuf>,
    pub sign: bool,
}

/// In-memory repository rooted at a real directory so file rewrites can be observed.
pub struct MemoryRepo {
    root: PathBuf,
    branch: String,
    changes: Mutex<Vec<(FileChange, String)>>,
    ignored: Vec<PathBuf>,
    tags: Mutex<Vec<String>>,
    subjects: Mutex<Vec<String>>,
    commits: Mutex<Vec<Recorded>>,
    tag_log: Mutex<Vec<Recorded>>,
}

#[allow(dead_code)]
impl MemoryRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            branch: "main".into(),
            changes: Mutex::new(Vec::new()),
            ignored: Vec::new(),
            tags: Mutex::new(Vec::new()),
            subjects: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            tag_log: Mutex::new(Vec::new()),
        }
    }

    pub fn branch(mut self, name: &str) -> Self {
        self.branch = name.into();
        self
    }

    pub fn change(self, change: FileChange, diff: &str) -> Self {
        self.changes.lock().unwrap().push((change, diff.to_string()));
        self
    }

    pub fn ignored(mut self, path: &str) -> Self {
        self.ignored.push(PathBuf::from(path));
        self
    }

    pub fn tag_names(self, tags: &[&str]) -> Self {
        self.tags
            .lock()
            .unwrap()
            .extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn history(self, subjects: &[&str]) -> Self {
        self.subjects
            .lock()
            .unwrap()
            .extend(subjects.iter().map(|s| s.to_string()));
        self
    }

    pub fn commits(&self) -> Vec<Recorded> {
        self.commits.lock().unwrap().clone()
    }

    pub fn created_tags(&self) -> Vec<Recorded> {
        self.tag_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn status(&self) -> Result<Vec<FileChange>> {
        Ok(self
            .changes
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn diff(&self, change: &FileChange) -> Result<String> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| c.path == change.path)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| Error::Git(format!("unknown path {}", change.path.display())))
    }

    async fn is_ignored(&self, path: &Path) -> Result<bool> {
        Ok(self.ignored.iter().any(|p| p == path))
    }

    async fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    async fn tags(&self) -> Result<Vec<String>> {
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn commit_subjects(&self, _since: Option<&str>) -> Result<Vec<String>> {
        Ok(self.subjects.lock().unwrap().clone())
    }

    async fn head_subject(&self) -> Result<Option<String>> {
        Ok(self.subjects.lock().unwrap().first().cloned())
    }

    async fn commit(&self, message: &str, paths: &[PathBuf], sign: bool) -> Result<()> {
        // Newest first, like `git log`
        self.subjects.lock().unwrap().insert(0, message.to_string());
        self.commits.lock().unwrap().push(Recorded {
            message: message.to_string(),
            paths: paths.to_vec(),
            sign,
        });
        Ok(())
    }

    async fn tag(&self, name: &str, message: &str, sign: bool) -> Result<()> {
        self.tags.lock().unwrap().push(name.to_string());
        self.tag_log.lock().unwrap().push(Recorded {
            message: format!("{name}: {message}"),
            paths: Vec::new(),
            sign,
        });
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// Defaults with short timeouts and no ignore patterns.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        timeout_secs: 5,
        generation_timeout_secs: 30,
        ignore: Vec::new(),
        ..Config::default()
    }
}
