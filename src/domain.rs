use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// A domain split at its last dot into the label that gets mutated and the
/// extension that never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain {
    label: String,
    extension: String,
}

impl Domain {
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_lowercase();
        let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);

        let (label, extension) = parse_domain(normalized)
            .ok_or_else(|| Error::InvalidDomain(input.trim().to_string()))?;

        if label.is_empty() || extension.is_empty() || !is_hostname(normalized) {
            return Err(Error::InvalidDomain(input.trim().to_string()));
        }

        Ok(Self { label, extension })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

// Letters (including internationalized ones), digits and hyphens in
// non-empty dot-separated labels.
fn is_hostname(input: &str) -> bool {
    input
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-'))
}

fn parse_domain(input: &str) -> Option<(String, String)> {
    let dot_pos = input.rfind('.')?;
    Some((input[..dot_pos].to_string(), input[dot_pos + 1..].to_string()))
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.label, self.extension)
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Domain {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
