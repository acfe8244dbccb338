// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ToolInput;

/// Schema for one property of a function's parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,

    /// Element schema when `kind` is `array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Property>>,
}

/// JSON-Schema subset: a top-level object with named properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameters {
    #[serde(rename = "type", default = "default_object")]
    pub kind: String,

    #[serde(default)]
    pub properties: BTreeMap<String, Property>,

    #[serde(default)]
    pub required: Vec<String>,
}

fn default_object() -> String {
    "object".into()
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            kind: default_object(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A named LLM-callable function: schema plus the two prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionSpec {
    /// Filled from the registry key when left empty in configuration
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parameters: Parameters,

    /// System prompt template
    #[serde(default)]
    pub system: String,

    /// User prompt template
    #[serde(default)]
    pub user: String,
}

impl FunctionSpec {
    pub fn declares(&self, key: &str) -> bool {
        self.parameters.properties.contains_key(key)
    }

    /// Required parameters absent from `input`.
    pub fn missing_inputs<'a>(&'a self, input: &ToolInput) -> Vec<&'a str> {
        self.parameters
            .required
            .iter()
            .filter(|key| !input.contains_key(key))
            .map(String::as_str)
            .collect()
    }

    /// Copy of `input` restricted to the keys this function declares.
    pub fn restrict(&self, input: &ToolInput) -> ToolInput {
        let mut restricted = input.clone();
        restricted.retain(|key, _| self.declares(key));
        restricted
    }
}
