//! Wildcard permission grants held by a principal.
//!
//! A grant is written `domain:action:instance`. Each part is either `*` or a
//! comma-separated list of accepted values; parts left off the end behave as
//! `*`, so `case:view` grants viewing every case and a bare `*` grants
//! everything.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GrantPart {
    Any,
    OneOf(Vec<String>),
}

impl GrantPart {
    fn accepts(&self, text: Option<&str>) -> bool {
        match (self, text) {
            (GrantPart::Any, _) => true,
            (GrantPart::OneOf(values), Some(text)) => values.iter().any(|v| v == text),
            (GrantPart::OneOf(_), None) => false,
        }
    }
}

/// A parsed grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Grant {
    raw: String,
    parts: Vec<GrantPart>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    #[error("invalid grant '{0}': empty part")]
    EmptyPart(String),
}

impl Grant {
    pub fn parse(raw: impl Into<String>) -> Result<Self, GrantError> {
        let raw = raw.into();

        let mut parts = Vec::new();
        for part in raw.split(':') {
            let part = part.trim();
            if part == "*" {
                parts.push(GrantPart::Any);
                continue;
            }

            let values: Vec<String> = part.split(',').map(|v| v.trim().to_string()).collect();
            if values.iter().any(String::is_empty) {
                return Err(GrantError::EmptyPart(raw));
            }
            parts.push(GrantPart::OneOf(values));
        }

        Ok(Self { raw, parts })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_wildcard(&self) -> bool {
        self.parts.iter().all(|p| *p == GrantPart::Any)
    }

    /// Does this grant allow `action` in `domain` on the given instance?
    ///
    /// `instance` is `None` for values that have no textual form; only a
    /// wildcard instance part covers those.
    pub fn implies(&self, domain: &str, action: &str, instance: Option<&str>) -> bool {
        let requested = [Some(domain), Some(action), instance];

        for (i, part) in self.parts.iter().enumerate() {
            let text = match requested.get(i) {
                Some(text) => *text,
                // Parts beyond the request must not narrow it.
                None => return part == &GrantPart::Any,
            };
            if !part.accepts(text) {
                return false;
            }
        }

        true
    }

    /// Does this grant cover `domain:action` for at least one instance?
    pub fn covers_action(&self, domain: &str, action: &str) -> bool {
        let requested = [domain, action];
        self.parts
            .iter()
            .zip(requested)
            .all(|(part, text)| part.accepts(Some(text)))
    }
}

impl core::fmt::Display for Grant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl core::str::FromStr for Grant {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Grant {
    type Error = GrantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Grant> for String {
    fn from(value: Grant) -> Self {
        value.raw
    }
}
