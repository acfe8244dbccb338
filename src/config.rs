// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands};
use crate::domain::FunctionSpec;
use crate::error::{Error, Result};

/// Built-in function specs. Overridable per key under `[functions.<name>]`.
const BUILTIN_FUNCTIONS: &str = include_str!("functions.toml");

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    /// Ollama's OpenAI-compatible endpoint (`/v1`)
    Ollama,
    Anthropic,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, Self::Anthropic)
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(Error::Config(format!(
                "unknown provider '{other}' (expected openai or ollama)"
            ))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Version detection and application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Plain file holding the current version (default: VERSION)
    #[serde(default = "default_version_file")]
    pub file: String,

    /// Files whose version token is rewritten on apply
    #[serde(default = "default_version_files")]
    pub files: Vec<String>,

    #[serde(default = "default_breaking_keywords")]
    pub breaking_keywords: Vec<String>,

    #[serde(default = "default_feature_keywords")]
    pub feature_keywords: Vec<String>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            file: default_version_file(),
            files: default_version_files(),
            breaking_keywords: default_breaking_keywords(),
            feature_keywords: default_feature_keywords(),
        }
    }
}

fn default_version_file() -> String {
    "VERSION".into()
}
fn default_version_files() -> Vec<String> {
    vec!["VERSION".into()]
}
fn default_breaking_keywords() -> Vec<String> {
    ["breaking", "remove", "rename", "incompatible", "drop support", "migrate"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_feature_keywords() -> Vec<String> {
    ["add", "feature", "introduce", "support", "implement", "new"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the chat-completions API; provider default when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token. Omitted from requests when empty.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds (default 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Deadline for one whole generation, retries included (default 300)
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Attempts in the commit message retry loop; values below 1 count as 1
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// LLM temperature (0.0-2.0, default 0.2)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-file diff lines sent for summarization
    #[serde(default = "default_max_diff_lines")]
    pub max_diff_lines: usize,

    /// Body lines longer than this are reported, never rejected
    #[serde(default = "default_preferred_body_length")]
    pub preferred_body_length: usize,

    /// Glob patterns never summarized
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Also honor the repository's ignore rules
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Send diffs even when they look like they contain credentials
    #[serde(default)]
    pub allow_secrets: bool,

    /// Sign commits and tags
    #[serde(default)]
    pub sign: bool,

    #[serde(default)]
    pub version: VersionConfig,

    #[serde(default = "default_functions")]
    pub functions: BTreeMap<String, FunctionSpec>,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_generation_timeout_secs() -> u64 {
    300
}
fn default_max_retries() -> usize {
    3
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_diff_lines() -> usize {
    400
}
fn default_preferred_body_length() -> usize {
    72
}
fn default_ignore() -> Vec<String> {
    [
        "**/*.lock",
        "**/package-lock.json",
        "**/pnpm-lock.yaml",
        "**/go.sum",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_true() -> bool {
    true
}

/// Parse a `[name] = FunctionSpec` table.
pub fn parse_functions(source: &str) -> Result<BTreeMap<String, FunctionSpec>> {
    toml::from_str(source).map_err(|e| Error::Config(format!("invalid function specs: {e}")))
}

/// The built-in specs, or a `Config` error if the bundled file does not parse.
pub fn builtin_functions() -> Result<BTreeMap<String, FunctionSpec>> {
    parse_functions(BUILTIN_FUNCTIONS)
}

/// Serde and `Default` fallback. `Config::load` checks `builtin_functions` first,
/// so an empty map never reaches the registry from the CLI.
pub fn default_functions() -> BTreeMap<String, FunctionSpec> {
    builtin_functions().unwrap_or_default()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
            max_diff_lines: default_max_diff_lines(),
            preferred_body_length: default_preferred_body_length(),
            ignore: default_ignore(),
            use_gitignore: true,
            allow_secrets: false,
            sign: false,
            version: VersionConfig::default(),
            functions: default_functions(),
        }
    }
}

impl Config {
    /// Load with priority: CLI > ENV > user config > project config > defaults
    pub fn load(cli: &Cli) -> Result<Self> {
        builtin_functions()?;

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Project-level config (.commitsmith.toml in the working directory)
        if let Ok(cwd) = std::env::current_dir() {
            let project_config = cwd.join(".commitsmith.toml");
            if project_config.exists() {
                figment = figment.merge(Toml::file(&project_config));
            }
        }

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            figment = figment.merge(Toml::file(&path));
        }

        // COMMITSMITH_MODEL, COMMITSMITH_VERSION__FILE, ...
        figment = figment.merge(Env::prefixed("COMMITSMITH_").split("__"));

        let mut config: Config = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        if config.api_key.is_none() && config.provider == Provider::OpenAI {
            config.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        config.apply_cli(cli)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "commitsmith").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Layer command-line flags over the loaded config.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<()> {
        if let Some(ref p) = cli.provider {
            self.provider = p.parse()?;
        }
        if let Some(ref m) = cli.model {
            self.model = m.clone();
        }
        if cli.allow_secrets {
            self.allow_secrets = true;
        }
        if let Some(Commands::Version(ref args)) = cli.command
            && args.sign
        {
            self.sign = true;
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Retry-loop attempts with the floor of one applied.
    pub fn attempts(&self) -> usize {
        self.max_retries.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.provider.is_openai_compatible() {
            return Err(Error::Config(format!(
                "provider '{}' is not OpenAI-compatible",
                self.provider
            )));
        }

        if self.model.trim().is_empty() {
            return Err(Error::Config("model cannot be empty".into()));
        }

        let base_url = self.base_url();
        match url::Url::parse(&base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(_) => {
                return Err(Error::Config(format!(
                    "base_url must start with http:// or https://, got '{base_url}'"
                )));
            }
            Err(e) => {
                return Err(Error::Config(format!("invalid base_url '{base_url}': {e}")));
            }
        }

        if !(1..=3600).contains(&self.timeout_secs) {
            return Err(Error::Config(format!(
                "timeout_secs must be 1–3600, got {}",
                self.timeout_secs
            )));
        }

        if !(1..=7200).contains(&self.generation_timeout_secs) {
            return Err(Error::Config(format!(
                "generation_timeout_secs must be 1–7200, got {}",
                self.generation_timeout_secs
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be 0.0–2.0, got {}",
                self.temperature
            )));
        }

        if !(10..=10_000).contains(&self.max_diff_lines) {
            return Err(Error::Config(format!(
                "max_diff_lines must be 10–10000, got {}",
                self.max_diff_lines
            )));
        }

        if self.preferred_body_length < 20 {
            return Err(Error::Config(format!(
                "preferred_body_length must be at least 20, got {}",
                self.preferred_body_length
            )));
        }

        if self.version.file.trim().is_empty() {
            return Err(Error::Config("version.file cannot be empty".into()));
        }

        Ok(())
    }

    /// Create default config file with secure permissions
    pub fn create_default() -> Result<PathBuf> {
        let Some(dir) = Self::config_dir() else {
            return Err(Error::Config("Cannot determine config directory".into()));
        };

        fs::create_dir_all(&dir)?;

        let path = dir.join("config.toml");
        let content = r#"# commitsmith configuration

# LLM provider: openai, ollama (both via the OpenAI-compatible API)
provider = "openai"

# Model name
model = "gpt-4o-mini"

# Chat-completions base URL (defaults per provider)
# base_url = "https://api.openai.com/v1"

# Falls back to OPENAI_API_KEY
# api_key = ""

# Per-request and per-generation timeouts in seconds
timeout_secs = 60
generation_timeout_secs = 300

# Attempts for a valid commit message
max_retries = 3

# Glob patterns that are never summarized
ignore = ["**/*.lock", "**/package-lock.json", "**/pnpm-lock.yaml", "**/go.sum"]

# Honor .gitignore and friends
use_gitignore = true

# Sign version commits and tags
sign = false

[version]
file = "VERSION"
files = ["VERSION"]

# Prompts and schemas can be overridden per function, e.g.
# [functions.retry_commit_message]
# system = "..."
"#;

        fs::write(&path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(path)
    }
}
