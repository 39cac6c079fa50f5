//! Secured-object view over a bound value.

use crate::Value;

/// How a bound value takes part in a permission check.
///
/// A list is checked as a collection (and may be narrowed); anything else is
/// checked as a single scalar and is never modified.
#[derive(Debug)]
pub enum SecuredObject<'a> {
    Scalar(&'a Value),
    Collection(&'a mut Vec<Value>),
}

impl<'a> SecuredObject<'a> {
    pub fn classify(value: &'a mut Value) -> Self {
        match value {
            Value::List(items) => SecuredObject::Collection(items),
            other => SecuredObject::Scalar(other),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, SecuredObject::Collection(_))
    }
}
