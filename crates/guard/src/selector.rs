//! Selector path sublanguage.
//!
//! ```text
//! selector := ident step*
//! step     := "." ident          field access (projects over lists)
//!           | "*." ident         spread field access (list required)
//!           | ".flatten()"       recursive flatten (list required)
//! ```
//!
//! Selectors are compiled once from a [`PermissionExpression`] and then
//! interpreted against bound values. The interpreter only ever reads the value
//! it is given.

use std::borrow::Cow;

use warden_auth::{MalformedPermissionError, PermissionExpression};
use warden_core::Value;

use crate::error::EvaluationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Field(String),
    Spread(String),
    Flatten,
}

/// A compiled selector: binding identifier plus the steps applied to the
/// value bound under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    binding: String,
    steps: Vec<Step>,
}

impl Selector {
    pub fn compile(permission: &PermissionExpression) -> Result<Self, MalformedPermissionError> {
        let invalid = |reason: String| MalformedPermissionError::InvalidSelector {
            raw: permission.as_str().to_string(),
            reason,
        };

        let mut steps = Vec::new();
        let mut rest = permission.selector_path();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("*.") {
                let (name, after) = take_identifier(after)
                    .ok_or_else(|| invalid(format!("expected a field name after '*.' in '{rest}'")))?;
                steps.push(Step::Spread(name.to_string()));
                rest = after;
            } else if let Some(after) = rest.strip_prefix('.') {
                let (name, after) = take_identifier(after)
                    .ok_or_else(|| invalid(format!("expected a field name after '.' in '{rest}'")))?;
                match after.strip_prefix("()") {
                    Some(after) if name == "flatten" => {
                        steps.push(Step::Flatten);
                        rest = after;
                    }
                    Some(_) => return Err(invalid(format!("unsupported call '{name}()'"))),
                    None => {
                        steps.push(Step::Field(name.to_string()));
                        rest = after;
                    }
                }
            } else {
                return Err(invalid(format!("unexpected input '{rest}'")));
            }
        }

        Ok(Self {
            source: permission.selector().to_string(),
            binding: permission.binding().to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn binding(&self) -> &str {
        &self.binding
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Apply the steps to a value bound under [`Self::binding`].
    pub(crate) fn resolve<'a>(&self, root: &'a Value) -> Result<Cow<'a, Value>, EvaluationError> {
        let mut current = Cow::Borrowed(root);
        for step in &self.steps {
            current = match current {
                Cow::Borrowed(value) => self.apply(step, value)?,
                Cow::Owned(value) => Cow::Owned(self.apply(step, &value)?.into_owned()),
            };
        }
        Ok(current)
    }

    fn apply<'a>(&self, step: &Step, value: &'a Value) -> Result<Cow<'a, Value>, EvaluationError> {
        match step {
            Step::Field(name) => self.field(name, value),
            Step::Spread(name) => match value {
                Value::List(_) => self.field(name, value),
                other => Err(self.wrong_shape("spread over", other)),
            },
            Step::Flatten => match value {
                Value::List(items) => {
                    let mut flat = Vec::new();
                    flatten_into(items, &mut flat);
                    Ok(Cow::Owned(Value::List(flat)))
                }
                other => Err(self.wrong_shape("flatten", other)),
            },
        }
    }

    /// Field access. On a list, the access is projected over every element.
    fn field<'a>(&self, name: &str, value: &'a Value) -> Result<Cow<'a, Value>, EvaluationError> {
        match value {
            Value::Record(fields) => fields
                .get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| EvaluationError::MissingField {
                    selector: self.source.clone(),
                    field: name.to_string(),
                }),
            Value::List(items) => {
                let projected = items
                    .iter()
                    .map(|item| self.field(name, item).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Cow::Owned(Value::List(projected)))
            }
            Value::Null => Err(EvaluationError::NullTraversal {
                selector: self.source.clone(),
                field: name.to_string(),
            }),
            other => Err(self.wrong_shape("read a field of", other)),
        }
    }

    fn wrong_shape(&self, operation: &'static str, value: &Value) -> EvaluationError {
        EvaluationError::WrongShape {
            selector: self.source.clone(),
            operation,
            kind: value.kind(),
        }
    }
}

pub(crate) fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(nested) => flatten_into(nested, out),
            other => out.push(other.clone()),
        }
    }
}

fn take_identifier(input: &str) -> Option<(&str, &str)> {
    let end = input
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(input.len(), |(i, _)| i);
    let name = &input[..end];
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok.then(|| (name, &input[end..]))
}
