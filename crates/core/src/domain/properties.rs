// Deposit properties: the flat key/value file carried inside every deposit directory

use serde::{Deserialize, Serialize};

/// File name of the properties file at the root of a deposit directory
pub const PROPERTIES_FILE: &str = "deposit.properties";

pub const KEY_STATE_LABEL: &str = "state.label";
pub const KEY_STATE_DESCRIPTION: &str = "state.description";
pub const KEY_DEPOSITOR: &str = "depositor.userId";
pub const KEY_SWORD_TOKEN: &str = "dataverse.sword-token";
pub const KEY_DOI: &str = "identifier.doi";
pub const KEY_ID_PROTOCOL: &str = "dataverse.id-protocol";
pub const KEY_ID_AUTHORITY: &str = "dataverse.id-authority";
pub const KEY_ID_IDENTIFIER: &str = "dataverse.id-identifier";
pub const KEY_BAG_ID: &str = "dataverse.bag-id";

/// Ordered key/value pairs. Unknown keys survive a parse/render cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositProperties {
    entries: Vec<(String, String)>,
}

impl DepositProperties {
    /// Parse `key=value` / `key: value` lines; `#` and `!` start comments.
    /// Escaped line breaks and backslashes in values are unescaped.
    pub fn parse(content: &str) -> Self {
        let mut props = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split_at = line.find(['=', ':']);
            let (key, value) = match split_at {
                Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
                None => (line, ""),
            };
            if !key.is_empty() {
                props.set(key, unescape(value));
            }
        }
        props
    }

    /// Render back to `key=value` lines in insertion order; line breaks in
    /// values are escaped so every entry stays on one line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('=');
            out.push_str(&escape(value));
            out.push('\n');
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key` if present and not blank
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Overwrite or append every entry of `other`, keeping the order of existing keys
    pub fn merge(&mut self, other: &DepositProperties) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
