use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A declarative permission requirement of the form `domain:action:selector`.
///
/// The selector is a path expression whose first segment is the *binding
/// identifier*: the name under which the checked argument or result is exposed
/// to the evaluator (e.g. `case:view:c.county` binds the value as `c` and reads
/// `.county` off it).
///
/// Expressions are parsed once, when a method's requirements are registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionExpression {
    raw: Cow<'static, str>,
    action_at: usize,
    selector_at: usize,
    binding_len: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedPermissionError {
    #[error("malformed permission '{raw}': expected 'domain:action:selector'")]
    MissingSegments { raw: String },

    #[error("malformed permission '{raw}': empty {segment} segment")]
    EmptySegment { raw: String, segment: &'static str },

    #[error("malformed permission '{raw}': selector must start with an identifier")]
    InvalidBinding { raw: String },

    #[error("malformed permission '{raw}': {reason}")]
    InvalidSelector { raw: String, reason: String },

    #[error("malformed permission '{raw}': selector binds '{found}' but the target is registered as '{expected}'")]
    BindingMismatch {
        raw: String,
        expected: String,
        found: String,
    },
}

impl PermissionExpression {
    pub fn parse(raw: impl Into<Cow<'static, str>>) -> Result<Self, MalformedPermissionError> {
        let raw = raw.into();

        let mut parts = raw.splitn(3, ':');
        let (Some(domain), Some(action), Some(selector)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(MalformedPermissionError::MissingSegments { raw: raw.to_string() });
        };

        for (segment, text) in [("domain", domain), ("action", action), ("selector", selector)] {
            if text.trim().is_empty() {
                return Err(MalformedPermissionError::EmptySegment {
                    raw: raw.to_string(),
                    segment,
                });
            }
        }

        let binding_len = selector
            .find(['.', '*'])
            .unwrap_or(selector.len());
        if !is_identifier(&selector[..binding_len]) {
            return Err(MalformedPermissionError::InvalidBinding { raw: raw.to_string() });
        }

        let action_at = domain.len() + 1;
        let selector_at = action_at + action.len() + 1;

        Ok(Self {
            raw,
            action_at,
            selector_at,
            binding_len,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn domain(&self) -> &str {
        &self.raw[..self.action_at - 1]
    }

    pub fn action(&self) -> &str {
        &self.raw[self.action_at..self.selector_at - 1]
    }

    /// The full selector, binding identifier included.
    pub fn selector(&self) -> &str {
        &self.raw[self.selector_at..]
    }

    /// The identifier the checked value is bound under.
    pub fn binding(&self) -> &str {
        &self.selector()[..self.binding_len]
    }

    /// The selector with its binding identifier removed (e.g. `.county`).
    pub fn selector_path(&self) -> &str {
        &self.selector()[self.binding_len..]
    }

    /// `domain:action`, the part of the expression named in denials.
    pub fn permission_name(&self) -> &str {
        &self.raw[..self.selector_at - 1]
    }
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl core::fmt::Display for PermissionExpression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl core::str::FromStr for PermissionExpression {
    type Err = MalformedPermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_string())
    }
}

impl TryFrom<String> for PermissionExpression {
    type Error = MalformedPermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PermissionExpression> for String {
    fn from(value: PermissionExpression) -> Self {
        value.raw.into_owned()
    }
}
