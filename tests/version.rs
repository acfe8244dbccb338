// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

mod helpers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;
use semver::Version;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use commitsmith::config::{Config, default_functions};
use commitsmith::domain::{BumpKind, ChangeStatus, FileChange, PreRelease, Suggestion};
use commitsmith::error::Error;
use commitsmith::services::registry::{ANALYZE_VERSION_BUMP, FunctionRegistry, GENERATE_FILE_SUMMARY};
use commitsmith::services::suggestion;
use commitsmith::services::summarizer::ChangeSummarizer;
use commitsmith::services::version::{VersionAnalyzer, VersionSource};
use commitsmith::services::workflow::Workflow;
use helpers::{MemoryRepo, ScriptedProvider, test_config};

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn analyzer(provider: &Arc<ScriptedProvider>, config: &Config) -> VersionAnalyzer {
    let registry = Arc::new(FunctionRegistry::new(&default_functions()).unwrap());
    VersionAnalyzer::new(provider.clone(), registry, config)
}

fn summarizer(provider: &Arc<ScriptedProvider>, config: &Config) -> ChangeSummarizer {
    let registry = Arc::new(FunctionRegistry::new(&default_functions()).unwrap());
    ChangeSummarizer::new(provider.clone(), registry, config).unwrap()
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn compact_suggestion_from_the_model() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "VERSION", "0.1.0\n");

    let provider = Arc::new(
        ScriptedProvider::new()
            .on(GENERATE_FILE_SUMMARY, &["add retry loop"])
            .on(ANALYZE_VERSION_BUMP, &["minor:beta1"]),
    );
    let repo = MemoryRepo::new(dir.path())
        .change(FileChange::new("src/lib.rs", ChangeStatus::Modified), "+fn retry() {}\n")
        .history(&["feat: add retry loop", "fix: close handle"]);
    let config = test_config();

    let mut analyzer = analyzer(&provider, &config);
    let proposal = analyzer
        .analyze(&repo, &summarizer(&provider, &config), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(proposal.current, v("0.1.0"));
    assert_eq!(proposal.kind, BumpKind::Minor);
    assert_eq!(proposal.pre.as_ref().map(PreRelease::as_str), Some("beta1"));
    assert_eq!(proposal.proposed, v("0.2.0-beta1"));
    assert_eq!(analyzer.proposal(), Some(&proposal));

    let call = &provider.calls_to(ANALYZE_VERSION_BUMP)[0];
    assert!(call.user.contains("Current version: 0.1.0"));
    assert!(call.user.contains("src/lib.rs: add retry loop"));
    assert!(call.user.contains("fix: close handle"));
    assert!(call.user.contains("breaking"));
}

#[tokio::test]
async fn full_version_suggestion_derives_kind() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .on(GENERATE_FILE_SUMMARY, &["remove legacy api"])
            .on(ANALYZE_VERSION_BUMP, &["`2.0.0-alpha1`"]),
    );
    let repo = MemoryRepo::new(dir.path())
        .change(FileChange::new("src/api.rs", ChangeStatus::Modified), "-pub fn old() {}\n")
        .tag_names(&["v1.4.2", "v1.3.0"]);
    let config = test_config();

    let mut analyzer = analyzer(&provider, &config);
    let proposal = analyzer
        .analyze(&repo, &summarizer(&provider, &config), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(proposal.current, v("1.4.2"));
    assert_eq!(proposal.kind, BumpKind::Major);
    assert_eq!(proposal.pre.as_ref().map(PreRelease::as_str), Some("alpha1"));
    assert_eq!(proposal.proposed, v("2.0.0-alpha1"));
}

#[tokio::test]
async fn unparseable_suggestion_is_a_validation_error() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new()
            .on(GENERATE_FILE_SUMMARY, &["add x"])
            .on(ANALYZE_VERSION_BUMP, &["somewhere between minor and major"]),
    );
    let repo = MemoryRepo::new(dir.path())
        .change(FileChange::new("a.txt", ChangeStatus::Modified), "+x\n");
    let config = test_config();

    let mut analyzer = analyzer(&provider, &config);
    let err = analyzer
        .analyze(&repo, &summarizer(&provider, &config), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validate(_)));
    assert!(analyzer.proposal().is_none());
}

#[tokio::test]
async fn analysis_without_changes_still_asks() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new().on(ANALYZE_VERSION_BUMP, &["patch"]));
    let repo = MemoryRepo::new(dir.path());
    let config = test_config();

    let mut analyzer = analyzer(&provider, &config);
    let proposal = analyzer
        .analyze(&repo, &summarizer(&provider, &config), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(proposal.proposed, v("0.1.1"));
    assert!(provider.calls()[0].user.contains("(none)"));
}

// ─── Current version resolution ──────────────────────────────────────────────

#[tokio::test]
async fn resolve_prefers_file_then_tag_then_default() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    let analyzer = analyzer(&provider, &test_config());

    let repo = MemoryRepo::new(dir.path());
    let resolved = analyzer.resolve_current(&repo).await.unwrap();
    assert_eq!(resolved.version, v("0.1.0"));
    assert_eq!(resolved.source, VersionSource::Default);

    let repo = MemoryRepo::new(dir.path()).tag_names(&["v0.9.0", "v0.10.0", "nightly"]);
    let resolved = analyzer.resolve_current(&repo).await.unwrap();
    assert_eq!(resolved.version, v("0.10.0"));
    assert_eq!(resolved.source, VersionSource::Tag("v0.10.0".into()));

    write(dir.path(), "VERSION", "v1.2.3\n");
    let resolved = analyzer.resolve_current(&repo).await.unwrap();
    assert_eq!(resolved.version, v("1.2.3"));
    assert_eq!(resolved.source, VersionSource::File(PathBuf::from("VERSION")));
    assert_eq!(resolved.latest_tag.as_deref(), Some("v0.10.0"));
}

#[tokio::test]
async fn malformed_version_file_falls_back_to_tags() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "VERSION", "not a version\n");
    let provider = Arc::new(ScriptedProvider::new());
    let analyzer = analyzer(&provider, &test_config());

    let repo = MemoryRepo::new(dir.path()).tag_names(&["v2.0.0"]);
    let resolved = analyzer.resolve_current(&repo).await.unwrap();
    assert_eq!(resolved.version, v("2.0.0"));
}

// ─── Apply ───────────────────────────────────────────────────────────────────

fn versioned_config() -> Config {
    let mut config = test_config();
    config.version.files = vec!["VERSION".into(), "pkg.toml".into(), "missing.txt".into()];
    config
}

#[tokio::test]
async fn apply_rewrites_commits_and_tags() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "VERSION", "0.1.0\n");
    write(dir.path(), "pkg.toml", "name = \"demo\"\nversion = \"0.1.0\"\ndep = \"10.1.0\"\n");

    let provider = Arc::new(ScriptedProvider::new());
    let repo = Arc::new(MemoryRepo::new(dir.path()));
    let mut wf = Workflow::new(&versioned_config(), provider, repo.clone()).unwrap();

    let proposed = wf
        .propose_version_change(BumpKind::Minor, Some(PreRelease::parse("beta1").unwrap()))
        .await
        .unwrap();
    assert_eq!(proposed, v("0.2.0-beta1"));

    let report = wf.apply_version_change(&CancellationToken::new()).await.unwrap();
    assert_eq!(
        report.files_updated,
        vec![PathBuf::from("VERSION"), PathBuf::from("pkg.toml")]
    );
    assert!(report.committed);
    assert!(report.tagged);
    assert!(wf.version_proposal().is_none());

    assert_eq!(read(dir.path(), "VERSION"), "0.2.0-beta1\n");
    assert_eq!(
        read(dir.path(), "pkg.toml"),
        "name = \"demo\"\nversion = \"0.2.0-beta1\"\ndep = \"10.1.0\"\n"
    );

    let commits = repo.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "chore(version): bump version to 0.2.0-beta1");
    assert_eq!(commits[0].paths, report.files_updated);

    let tags = repo.created_tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].message, "v0.2.0-beta1: Release 0.2.0-beta1");
}

#[tokio::test]
async fn apply_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "VERSION", "1.4.2\n");
    write(dir.path(), "pkg.toml", "version = \"1.4.2\"\n");

    let provider = Arc::new(ScriptedProvider::new());
    let repo = MemoryRepo::new(dir.path());
    let mut analyzer = analyzer(&provider, &versioned_config());
    let proposal = analyzer
        .propose(&repo, Suggestion::new(BumpKind::Patch, None))
        .await
        .unwrap();
    let cancel = CancellationToken::new();

    let first = analyzer.apply_proposal(&repo, &proposal, &cancel).await.unwrap();
    assert!(!first.is_noop());
    let version_file = read(dir.path(), "VERSION");
    let pkg = read(dir.path(), "pkg.toml");

    let second = analyzer.apply_proposal(&repo, &proposal, &cancel).await.unwrap();
    assert!(second.is_noop(), "second run did something: {second:?}");
    assert_eq!(read(dir.path(), "VERSION"), version_file);
    assert_eq!(read(dir.path(), "pkg.toml"), pkg);
    assert_eq!(repo.commits().len(), 1);
    assert_eq!(repo.created_tags().len(), 1);
}

#[tokio::test]
async fn repeated_apply_through_the_workflow_is_a_noop() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "VERSION", "1.4.2\n");

    let provider = Arc::new(ScriptedProvider::new());
    let repo = Arc::new(MemoryRepo::new(dir.path()));
    let mut wf = Workflow::new(&test_config(), provider, repo.clone()).unwrap();
    let cancel = CancellationToken::new();

    wf.propose_version_change(BumpKind::Patch, None).await.unwrap();
    let first = wf.apply_version_change(&cancel).await.unwrap();
    assert_eq!(first.files_updated, vec![PathBuf::from("VERSION")]);
    assert!(first.committed);
    assert!(first.tagged);

    let second = wf.apply_version_change(&cancel).await.unwrap();
    assert!(second.is_noop(), "second run did something: {second:?}");
    assert_eq!(read(dir.path(), "VERSION"), "1.4.3\n");
    assert_eq!(repo.commits().len(), 1);
    assert_eq!(repo.created_tags().len(), 1);
    assert!(wf.version_proposal().is_none());
}

#[tokio::test]
async fn apply_without_proposal_is_an_error() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    let mut wf = Workflow::new(&test_config(), provider, Arc::new(MemoryRepo::new(dir.path()))).unwrap();

    let err = wf.apply_version_change(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Input(_)));
}

#[tokio::test]
async fn cleared_proposal_cannot_be_applied() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    let repo = Arc::new(MemoryRepo::new(dir.path()));
    let mut wf = Workflow::new(&test_config(), provider, repo.clone()).unwrap();

    wf.propose_version_change(BumpKind::Major, None).await.unwrap();
    wf.clear_version_proposal();
    assert!(wf.version_proposal().is_none());
    assert!(wf.apply_version_change(&CancellationToken::new()).await.is_err());
    assert!(repo.commits().is_empty());
}

#[tokio::test]
async fn override_keeps_the_analyzed_base() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "VERSION", "0.3.0\n");
    let provider = Arc::new(ScriptedProvider::new());
    let repo = MemoryRepo::new(dir.path());
    let mut analyzer = analyzer(&provider, &test_config());

    analyzer.propose(&repo, Suggestion::new(BumpKind::Minor, None)).await.unwrap();
    let overridden = analyzer
        .propose(&repo, Suggestion::new(BumpKind::Patch, None))
        .await
        .unwrap();
    assert_eq!(overridden.current, v("0.3.0"));
    assert_eq!(overridden.proposed, v("0.3.1"));
}

// ─── Properties ──────────────────────────────────────────────────────────────

fn kind_strategy() -> impl Strategy<Value = BumpKind> {
    prop_oneof![
        Just(BumpKind::None),
        Just(BumpKind::Patch),
        Just(BumpKind::Minor),
        Just(BumpKind::Major),
    ]
}

fn pre_strategy() -> impl Strategy<Value = Option<PreRelease>> {
    prop::option::of(
        (prop_oneof![Just("alpha"), Just("beta"), Just("rc")], 0u32..100)
            .prop_map(|(label, n)| PreRelease::parse(&format!("{label}{n}")).unwrap()),
    )
}

fn version_strategy() -> impl Strategy<Value = Version> {
    (0u64..20, 0u64..20, 0u64..20, pre_strategy()).prop_map(|(major, minor, patch, pre)| {
        let mut version = Version::new(major, minor, patch);
        if let Some(pre) = pre {
            version.pre = semver::Prerelease::new(pre.as_str()).unwrap();
        }
        version
    })
}

proptest! {
    #[test]
    fn compact_form_parses_back(kind in kind_strategy(), pre in pre_strategy(), current in version_strategy()) {
        let suggestion = Suggestion::new(kind, pre);
        let parsed = suggestion::parse(&suggestion.to_compact(), &current).unwrap();
        prop_assert_eq!(parsed, suggestion);
    }

    #[test]
    fn proposals_always_move_forward(kind in kind_strategy(), pre in pre_strategy(), current in version_strategy()) {
        let suggestion = Suggestion::new(kind, pre);
        prop_assume!(!suggestion.is_noop());
        prop_assert!(suggestion.apply_to(&current).unwrap() > current);
    }
}
