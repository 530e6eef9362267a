// bag-info.txt: the package's own descriptive header

use super::error::{DomainError, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub const BAG_INFO_FILE: &str = "bag-info.txt";
pub const ELEMENT_CREATED: &str = "Created";
pub const ELEMENT_IS_VERSION_OF: &str = "Is-Version-Of";

/// Parsed `Key: value` elements. Keys may repeat; order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagInfo {
    elements: Vec<(String, String)>,
}

impl BagInfo {
    /// Parse bag-info content. Lines starting with whitespace continue the previous value.
    pub fn parse(content: &str) -> Self {
        let mut elements: Vec<(String, String)> = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = elements.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                elements.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        Self { elements }
    }

    /// All values of `key` (case-insensitive, as bag-info labels are)
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The single value of `key`; zero or several values is an error
    pub fn single_value(&self, key: &str) -> Result<&str> {
        let values = self.values(key);
        match values.as_slice() {
            [value] => Ok(*value),
            _ => Err(DomainError::Cardinality {
                key: key.to_string(),
                found: values.len(),
            }),
        }
    }

    /// Creation instant; the value must carry an explicit offset
    pub fn created(&self) -> Result<DateTime<FixedOffset>> {
        let raw = self.single_value(ELEMENT_CREATED)?;
        DateTime::parse_from_rfc3339(raw).map_err(|source| DomainError::InvalidTimestamp {
            value: raw.to_string(),
            source,
        })
    }

    /// Predecessor reference; its presence marks the deposit as an update
    pub fn is_version_of(&self) -> Option<&str> {
        self.values(ELEMENT_IS_VERSION_OF)
            .into_iter()
            .find(|v| !v.is_empty())
    }
}
