// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

pub mod generator;
pub mod git;
pub mod llm;
pub mod registry;
pub mod safety;
pub mod sanitizer;
pub mod suggestion;
pub mod summarizer;
pub mod template;
pub mod validator;
pub mod version;
pub mod workflow;
