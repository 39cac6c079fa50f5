//! Path/projection evaluator.
//!
//! Three operations, all pure functions of their inputs apart from
//! [`filter_in_place`], which only ever removes elements:
//!
//! - [`evaluate_scalar`] resolves a selector against one bound value and
//!   flattens the result.
//! - [`project_over_collection`] rebinds the selector's identifier to each
//!   element of a collection and collects the distinct results.
//! - [`filter_in_place`] drops elements whose projection is not retained.

use std::collections::BTreeMap;

use warden_auth::CandidateSet;
use warden_core::Value;

use crate::error::EvaluationError;
use crate::selector::{Selector, flatten_into};

/// Call-scoped bindings from identifier to value.
///
/// Built fresh for every check and dropped with it.
#[derive(Debug, Default)]
pub struct EvaluationContext<'a> {
    bindings: BTreeMap<&'a str, &'a Value>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: &'a str, value: &'a Value) -> Self {
        self.bindings.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.bindings.get(name).copied()
    }

    fn resolve(&self, selector: &Selector) -> Result<Value, EvaluationError> {
        let root = self
            .get(selector.binding())
            .ok_or_else(|| EvaluationError::Unbound {
                selector: selector.as_str().to_string(),
                binding: selector.binding().to_string(),
            })?;
        selector.resolve(root).map(|v| v.into_owned())
    }
}

/// Resolve `selector` in `ctx`; a list result is flattened recursively.
pub fn evaluate_scalar(
    ctx: &EvaluationContext<'_>,
    selector: &Selector,
) -> Result<Vec<Value>, EvaluationError> {
    match ctx.resolve(selector)? {
        Value::List(items) => {
            let mut flat = Vec::with_capacity(items.len());
            flatten_into(&items, &mut flat);
            Ok(flat)
        }
        other => Ok(vec![other]),
    }
}

/// Evaluate `selector` once per element, with the element bound under the
/// selector's identifier, and merge the results into a set.
pub fn project_over_collection(
    selector: &Selector,
    collection: &[Value],
) -> Result<CandidateSet, EvaluationError> {
    collection
        .iter()
        .map(|element| project_element(selector, element))
        .collect()
}

/// Remove every element whose projection is absent from `retained`,
/// preserving the order of the rest. Returns how many were removed.
///
/// Projections are all computed before anything is removed, so an evaluation
/// failure leaves `collection` untouched.
pub fn filter_in_place(
    collection: &mut Vec<Value>,
    selector: &Selector,
    retained: &CandidateSet,
) -> Result<usize, EvaluationError> {
    let keep = collection
        .iter()
        .map(|element| project_element(selector, element).map(|p| retained.contains(&p)))
        .collect::<Result<Vec<bool>, _>>()?;

    let before = collection.len();
    let mut flags = keep.into_iter();
    collection.retain(|_| flags.next().unwrap_or(false));
    Ok(before - collection.len())
}

fn project_element(selector: &Selector, element: &Value) -> Result<Value, EvaluationError> {
    EvaluationContext::new()
        .bind(selector.binding(), element)
        .resolve(selector)
}
