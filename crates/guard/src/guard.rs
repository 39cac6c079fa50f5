//! The authorization guard wrapped around guarded method calls.

use std::sync::Arc;

use warden_auth::{AuthorizationSubject, Target};
use warden_core::{SecuredObject, Value};

use crate::config::{SecurityConfig, SecurityToggle};
use crate::error::{GuardError, InvocationError};
use crate::evaluator::{EvaluationContext, evaluate_scalar, filter_in_place, project_over_collection};
use crate::registry::{MethodId, PolicyRegistry, Requirement};

/// Intercepts guarded calls and enforces their declared requirements.
///
/// The guard is shared between concurrent callers. It holds no per-call
/// state: every check builds its own evaluation context and candidate set.
/// Configuration is resolved before construction; there is no lazy lookup
/// and no permissive fallback.
#[derive(Debug, Clone)]
pub struct Guard {
    registry: Arc<PolicyRegistry>,
    toggle: SecurityToggle,
}

impl Guard {
    pub fn new(registry: impl Into<Arc<PolicyRegistry>>, config: &SecurityConfig) -> Self {
        Self::with_toggle(registry, SecurityToggle::from_config(config))
    }

    /// Build a guard around an existing toggle, e.g. one shared with an admin
    /// endpoint.
    pub fn with_toggle(registry: impl Into<Arc<PolicyRegistry>>, toggle: SecurityToggle) -> Self {
        let registry = registry.into();
        tracing::info!(
            methods = registry.len(),
            enabled = toggle.is_enabled(),
            "authorization guard ready"
        );
        Self { registry, toggle }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn toggle(&self) -> &SecurityToggle {
        &self.toggle
    }

    /// Apply a reloaded configuration.
    pub fn reload(&self, config: &SecurityConfig) {
        let enabled = config.is_enabled();
        let previous = self.toggle.set(enabled);
        if previous != enabled {
            tracing::info!(enabled, "authorization enforcement toggled");
        }
    }

    /// Run `operation` under the requirements registered for `method`.
    ///
    /// Parameter requirements are checked before the operation runs and may
    /// narrow collection arguments in place; the operation sees the narrowed
    /// arguments. Return-value requirements are checked afterwards and may
    /// narrow a collection result. A failure after the operation ran does not
    /// undo its side effects.
    pub fn invoke<S, F, E>(
        &self,
        subject: &S,
        method: &MethodId,
        args: &mut [Option<Value>],
        operation: F,
    ) -> Result<Option<Value>, InvocationError<E>>
    where
        S: AuthorizationSubject + ?Sized,
        F: FnOnce(&mut [Option<Value>]) -> Result<Option<Value>, E>,
    {
        if !self.toggle.is_enabled() {
            tracing::trace!(%method, "authorization disabled, invoking directly");
            return operation(args).map_err(InvocationError::Operation);
        }

        let Some(policy) = self.registry.get(method) else {
            return operation(args).map_err(InvocationError::Operation);
        };

        for param in policy.parameters() {
            let len = args.len();
            let slot = args
                .get_mut(param.index())
                .ok_or_else(|| GuardError::MissingArgument {
                    method: method.clone(),
                    index: param.index(),
                    len,
                })?;
            let Some(value) = slot.as_mut().filter(|v| !v.is_null()) else {
                continue;
            };
            self.check(subject, method, param.requirements(), value)?;
        }

        let mut result = operation(args).map_err(InvocationError::Operation)?;

        if let Some(value) = result.as_mut().filter(|v| !v.is_null())
            && !policy.return_value().is_empty()
        {
            self.check(subject, method, policy.return_value(), value)?;
        }

        Ok(result)
    }

    /// Check `requirements` in order against one bound value, stopping at the
    /// first failure.
    pub fn check<S>(
        &self,
        subject: &S,
        method: &MethodId,
        requirements: &[Requirement],
        value: &mut Value,
    ) -> Result<(), GuardError>
    where
        S: AuthorizationSubject + ?Sized,
    {
        for requirement in requirements {
            let outcome = match SecuredObject::classify(value) {
                SecuredObject::Collection(items) => check_collection(subject, requirement, items),
                SecuredObject::Scalar(value) => check_scalar(subject, requirement, value),
            };

            if let Err(err) = outcome {
                tracing::warn!(
                    %method,
                    permission = %requirement.permission(),
                    error = %err,
                    "authorization check failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

fn check_collection<S>(
    subject: &S,
    requirement: &Requirement,
    items: &mut Vec<Value>,
) -> Result<(), GuardError>
where
    S: AuthorizationSubject + ?Sized,
{
    let selector = requirement.selector();
    let projected = project_over_collection(selector, items)?;
    let before = projected.len();
    let mut candidates = projected.clone();

    subject.check_permission(requirement.permission(), Target::Candidates(&mut candidates))?;

    // Only values that were projected may survive.
    candidates.retain(|v| projected.contains(v));
    if candidates.len() != before {
        let removed = filter_in_place(items, selector, &candidates)?;
        tracing::debug!(
            permission = %requirement.permission(),
            candidates_before = before,
            candidates_after = candidates.len(),
            removed,
            "collection narrowed"
        );
    }
    Ok(())
}

fn check_scalar<S>(subject: &S, requirement: &Requirement, value: &Value) -> Result<(), GuardError>
where
    S: AuthorizationSubject + ?Sized,
{
    let selector = requirement.selector();
    let ctx = EvaluationContext::new().bind(selector.binding(), value);
    let secured = evaluate_scalar(&ctx, selector)?;

    for item in &secured {
        subject.check_permission(requirement.permission(), Target::Value(item))?;
    }
    Ok(())
}
