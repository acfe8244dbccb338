// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Strict `{{name}}` interpolation over a [`ToolInput`].
//!
//! A placeholder naming a key that is not supplied is an error, never an empty string.
//! `{{ name }}` and `{{.name}}` are accepted spellings of the same placeholder.

use crate::domain::ToolInput;
use crate::error::{Error, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Key(&'a str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }

        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(Error::Template(format!(
                "unclosed placeholder at byte {}",
                offset + start
            )));
        };

        let raw = after_open[..end].trim();
        let key = raw.strip_prefix('.').unwrap_or(raw);
        if key.is_empty() {
            return Err(Error::Template(format!(
                "empty placeholder at byte {}",
                offset + start
            )));
        }
        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Template(format!("invalid placeholder '{{{{{raw}}}}}'")));
        }
        segments.push(Segment::Key(key));

        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }

    Ok(segments)
}

/// Keys referenced by `template`, in order of first appearance.
pub fn placeholders(template: &str) -> Result<Vec<String>> {
    let mut keys: Vec<String> = Vec::new();
    for segment in parse(template)? {
        if let Segment::Key(key) = segment
            && !keys.iter().any(|k| k == key)
        {
            keys.push(key.to_string());
        }
    }
    Ok(keys)
}

pub fn render(template: &str, input: &ToolInput) -> Result<String> {
    let mut out = String::with_capacity(template.len());

    for segment in parse(template)? {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Key(key) => {
                let value = input
                    .get(key)
                    .ok_or_else(|| Error::Template(format!("missing input '{key}'")))?;
                out.push_str(&value.to_string());
            }
        }
    }

    Ok(out)
}
