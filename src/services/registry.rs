// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::{BTreeMap, HashMap};

use crate::domain::FunctionSpec;
use crate::error::{Error, Result};
use crate::services::template;

pub const GENERATE_FILE_SUMMARY: &str = "generate_file_summary";
pub const GENERATE_COMMIT_MESSAGE: &str = "generate_commit_message";
pub const RETRY_COMMIT_MESSAGE: &str = "retry_commit_message";
pub const ANALYZE_VERSION_BUMP: &str = "analyze_version_bump";

pub const REQUIRED_FUNCTIONS: &[&str] = &[
    GENERATE_FILE_SUMMARY,
    GENERATE_COMMIT_MESSAGE,
    RETRY_COMMIT_MESSAGE,
    ANALYZE_VERSION_BUMP,
];

/// Inputs every `retry_commit_message` spec must declare.
pub const RETRY_FEEDBACK_INPUTS: &[&str] = &["previous", "error"];

/// Read-only lookup over the configured function specs, validated once at load.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    specs: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new(specs: &BTreeMap<String, FunctionSpec>) -> Result<Self> {
        let mut map = HashMap::with_capacity(specs.len());

        for (key, spec) in specs {
            let mut spec = spec.clone();
            if spec.name.is_empty() {
                spec.name = key.clone();
            }
            Self::check(&spec)?;
            map.insert(key.clone(), spec);
        }

        for name in REQUIRED_FUNCTIONS {
            if !map.contains_key(*name) {
                return Err(Error::Config(format!("missing function spec '{name}'")));
            }
        }

        // Retry attempts always feed back the rejected message and its diagnosis
        if let Some(retry) = map.get(RETRY_COMMIT_MESSAGE) {
            for key in RETRY_FEEDBACK_INPUTS {
                if !retry.declares(key) {
                    return Err(Error::Config(format!(
                        "function '{RETRY_COMMIT_MESSAGE}' must declare input '{key}'"
                    )));
                }
            }
        }

        Ok(Self { specs: map })
    }

    pub fn get(&self, name: &str) -> Result<&FunctionSpec> {
        self.specs
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown function '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn check(spec: &FunctionSpec) -> Result<()> {
        let name = &spec.name;

        if spec.system.trim().is_empty() {
            return Err(Error::Config(format!("function '{name}' has an empty system prompt")));
        }
        if spec.user.trim().is_empty() {
            return Err(Error::Config(format!("function '{name}' has an empty user prompt")));
        }
        if spec.parameters.kind != "object" {
            return Err(Error::Config(format!(
                "function '{name}' parameters must be of type object, got '{}'",
                spec.parameters.kind
            )));
        }
        for required in &spec.parameters.required {
            if !spec.declares(required) {
                return Err(Error::Config(format!(
                    "function '{name}' requires undeclared parameter '{required}'"
                )));
            }
        }

        for prompt in [&spec.system, &spec.user] {
            let keys = template::placeholders(prompt)
                .map_err(|e| Error::Config(format!("function '{name}': {e}")))?;
            if let Some(key) = keys.iter().find(|k| !spec.declares(k)) {
                return Err(Error::Config(format!(
                    "function '{name}' prompt references undeclared input '{key}'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_functions;

    #[test]
    fn builtin_specs_are_complete() {
        let registry = FunctionRegistry::new(&default_functions()).unwrap();
        assert_eq!(registry.len(), REQUIRED_FUNCTIONS.len());
        for name in REQUIRED_FUNCTIONS {
            assert_eq!(registry.get(name).unwrap().name, *name);
        }
    }

    #[test]
    fn missing_required_spec_is_a_config_error() {
        let mut specs = default_functions();
        specs.remove(RETRY_COMMIT_MESSAGE);
        let err = FunctionRegistry::new(&specs).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains(RETRY_COMMIT_MESSAGE)));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let mut specs = default_functions();
        specs.get_mut(GENERATE_FILE_SUMMARY).unwrap().system = "  ".into();
        assert!(matches!(
            FunctionRegistry::new(&specs),
            Err(Error::Config(ref m)) if m.contains("system prompt")
        ));
    }

    #[test]
    fn prompt_with_undeclared_placeholder_is_rejected() {
        let mut specs = default_functions();
        specs.get_mut(GENERATE_COMMIT_MESSAGE).unwrap().user = "{{nope}}".into();
        assert!(matches!(
            FunctionRegistry::new(&specs),
            Err(Error::Config(ref m)) if m.contains("nope")
        ));
    }

    #[test]
    fn retry_spec_must_accept_feedback() {
        let mut specs = default_functions();
        let retry = specs.get_mut(RETRY_COMMIT_MESSAGE).unwrap();
        retry.parameters.properties.remove("error");
        retry.parameters.required.retain(|k| k != "error");
        retry.system = "fix".into();
        retry.user = "{{previous}}".into();
        assert!(matches!(
            FunctionRegistry::new(&specs),
            Err(Error::Config(ref m)) if m.contains("'error'")
        ));
    }

    #[test]
    fn unknown_lookup_fails() {
        let registry = FunctionRegistry::new(&default_functions()).unwrap();
        assert!(registry.get("analyze_file_changes").is_err());
    }
}
