/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Decoded timer settings and the bracket-grouping convention they arrive in.
//!
//! A settings string is a whitespace-separated list of entries (whitespace
//! inside braces does not separate):
//!
//! ```text
//! changeEvery=6:00S                      key=value        one bare value
//! note={two words}                       key={...}        braced value, may
//!                                                         contain spaces
//! changeAt={6:00E}{18:00E}               key={..}{..}     repeated groups
//!                                                         append values
//! changeAt=6:00E changeAt=18:00E         repeated keys also append
//! ```
//!
//! The same convention applies inside a single list item: top-level
//! `{key=...}` groups are that item's own settings, everything else is its
//! display text (`Bloody Herb {changeAt=6:00E} {changeAt=18:00E}`).  A braced
//! chunk that does not look like `key=` stays in the text untouched.
//!
//! Parsing is deliberately lenient — unknown keys are preserved for other
//! consumers, tokens without `=` are skipped with a debug log — because the
//! strict checks (which keys, how many values, do they parse) belong to rule
//! validation.

use std::collections::BTreeMap;

use tracing::debug;

// ── Settings map ──────────────────────────────────────────────────────────────

/// Ordered key → values map decoded from a settings string.
///
/// `BTreeMap` keeps iteration deterministic; value order and multiplicity
/// within a key follow the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    map: BTreeMap<String, Vec<String>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value to a key.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.map
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// All values for a key, in input order.  Empty slice when absent.
    pub fn values(&self, key: &str) -> &[String] {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Vec<String>>> for Settings {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Settings { map }
    }
}

/// Strict boolean used by flag settings: exactly `true` / `false`,
/// case-insensitive.  Anything else is `None` (the caller rejects it).
pub fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// ── Settings-string parsing ───────────────────────────────────────────────────

/// Decode a whole settings string.
pub fn parse_settings(input: &str) -> Settings {
    let mut settings = Settings::new();
    for token in brace_aware_tokens(input) {
        match split_entry(token) {
            Some((key, value_part)) => append_values(&mut settings, key, value_part),
            None => debug!(token, "ignoring settings token without key="),
        }
    }
    settings
}

/// Decode one raw list item into its display text and embedded settings.
pub fn parse_item_text(raw: &str) -> (String, Settings) {
    let mut settings = Settings::new();
    let mut text = String::new();
    let mut rest = raw;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match matching_brace(after) {
            Some(end) => {
                let content = &after[..end];
                match split_entry(content) {
                    Some((key, value_part)) => append_values(&mut settings, key, value_part),
                    None => {
                        text.push('{');
                        text.push_str(content);
                        text.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // unclosed brace: the rest is literal text
                text.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    text.push_str(rest);

    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (text, settings)
}

/// Split `input` on whitespace at brace depth 0.
fn brace_aware_tokens(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (i, c) in input.char_indices() {
        if c.is_whitespace() && depth == 0 {
            if let Some(s) = start.take() {
                tokens.push(&input[s..i]);
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&input[s..]);
    }
    tokens
}

/// `key=rest` with an alphanumeric/underscore key.
fn split_entry(token: &str) -> Option<(&str, &str)> {
    let eq = token.find('=')?;
    let key = &token[..eq];
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    Some((key, &token[eq + 1..]))
}

/// One bare value, or every `{..}` group as its own value.
fn append_values(settings: &mut Settings, key: &str, value_part: &str) {
    match braced_groups(value_part) {
        Some(groups) => {
            for g in groups {
                settings.insert(key, g);
            }
        }
        None => settings.insert(key, value_part),
    }
}

/// `Some(values)` when the value part is one or more `{..}` groups;
/// an unclosed final group runs to the end of the input.
fn braced_groups(value: &str) -> Option<Vec<&str>> {
    if !value.starts_with('{') {
        return None;
    }
    let mut groups = Vec::new();
    let mut rest = value;
    while let Some(stripped) = rest.strip_prefix('{') {
        match matching_brace(stripped) {
            Some(end) => {
                groups.push(&stripped[..end]);
                rest = &stripped[end + 1..];
            }
            None => {
                groups.push(stripped);
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    Some(groups)
}

/// Byte index of the `}` closing the group whose `{` was just consumed.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
