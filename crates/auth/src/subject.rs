//! Authorization Subject contract and the grant-backed subject.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use warden_core::Value;

use crate::{Grant, PermissionExpression, Principal, PrincipalId, RolePolicy};

/// Access denial raised by a subject.
///
/// Always names the failing `domain:action` so callers can tell it apart from
/// ordinary business errors and report it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("access denied for '{permission}': {reason}")]
pub struct AuthorizationError {
    pub permission: String,
    pub reason: String,
}

impl AuthorizationError {
    pub fn denied(permission: &PermissionExpression, reason: impl Into<String>) -> Self {
        Self {
            permission: permission.permission_name().to_string(),
            reason: reason.into(),
        }
    }
}

/// Distinct projected values handed to a subject for a collection check.
///
/// A subject may only remove values: the set can shrink, never grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet(BTreeSet<Value>);

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.0.remove(value)
    }

    pub fn retain(&mut self, f: impl FnMut(&Value) -> bool) {
        self.0.retain(f);
    }
}

impl FromIterator<Value> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What a permission is being checked against.
#[derive(Debug)]
pub enum Target<'a> {
    /// A single secured value; failure denies the whole call.
    Value(&'a Value),
    /// Values projected from a collection; the subject may narrow them.
    Candidates(&'a mut CandidateSet),
}

/// The collaborator that knows the current principal's grants.
///
/// Implementations return `Ok(())` when the permission holds (optionally after
/// removing unauthorized candidates) and an [`AuthorizationError`] on outright
/// denial. Calls may block; they are never retried.
pub trait AuthorizationSubject {
    fn check_permission(
        &self,
        permission: &PermissionExpression,
        target: Target<'_>,
    ) -> Result<(), AuthorizationError>;
}

impl<S: AuthorizationSubject + ?Sized> AuthorizationSubject for &S {
    fn check_permission(
        &self,
        permission: &PermissionExpression,
        target: Target<'_>,
    ) -> Result<(), AuthorizationError> {
        (**self).check_permission(permission, target)
    }
}

impl<S: AuthorizationSubject + ?Sized> AuthorizationSubject for std::sync::Arc<S> {
    fn check_permission(
        &self,
        permission: &PermissionExpression,
        target: Target<'_>,
    ) -> Result<(), AuthorizationError> {
        (**self).check_permission(permission, target)
    }
}

/// Subject backed by a principal's effective grants.
///
/// - A scalar passes when some grant implies `domain:action:<value>`.
/// - A collection keeps the candidates some grant implies. When no grant
///   covers `domain:action` at all the request is denied outright.
#[derive(Debug, Clone)]
pub struct PrincipalSubject {
    principal_id: PrincipalId,
    grants: Vec<Grant>,
}

impl PrincipalSubject {
    pub fn new(principal: &Principal) -> Self {
        Self::with_policy(principal, &RolePolicy::default())
    }

    pub fn with_policy(principal: &Principal, policy: &RolePolicy) -> Self {
        Self {
            principal_id: principal.principal_id,
            grants: policy.effective_grants(principal),
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    fn matching_grant(&self, permission: &PermissionExpression, value: &Value) -> Option<&Grant> {
        let instance = value.instance_text();
        self.grants.iter().find(|g| {
            g.implies(permission.domain(), permission.action(), instance.as_deref())
        })
    }

    /// Explain the decision for a single value without raising it.
    pub fn explain(&self, permission: &PermissionExpression, value: &Value) -> AccessExplanation {
        let matched = self.matching_grant(permission, value);
        let mut effective_grants: Vec<String> =
            self.grants.iter().map(|g| g.as_str().to_string()).collect();
        effective_grants.sort();

        let reason = match matched {
            Some(g) if g.is_wildcard() => "principal holds the wildcard grant '*'".to_string(),
            Some(g) => format!("granted by '{g}'"),
            None if value.instance_text().is_none() => format!(
                "a {} value only matches a grant with a wildcard instance",
                value.kind()
            ),
            None => format!(
                "no grant implies '{}:{value}'",
                permission.permission_name()
            ),
        };

        AccessExplanation {
            principal_id: self.principal_id,
            permission: permission.permission_name().to_string(),
            instance: value.to_string(),
            granted: matched.is_some(),
            matched_grant: matched.map(|g| g.as_str().to_string()),
            reason,
            effective_grants,
        }
    }
}

impl AuthorizationSubject for PrincipalSubject {
    fn check_permission(
        &self,
        permission: &PermissionExpression,
        target: Target<'_>,
    ) -> Result<(), AuthorizationError> {
        match target {
            Target::Value(value) => {
                if self.matching_grant(permission, value).is_some() {
                    Ok(())
                } else {
                    Err(AuthorizationError::denied(
                        permission,
                        format!("principal {} may not access {value}", self.principal_id),
                    ))
                }
            }
            Target::Candidates(candidates) => {
                let covered = self
                    .grants
                    .iter()
                    .any(|g| g.covers_action(permission.domain(), permission.action()));
                if !covered {
                    return Err(AuthorizationError::denied(
                        permission,
                        format!("principal {} holds no grant for it", self.principal_id),
                    ));
                }

                let before = candidates.len();
                candidates.retain(|value| self.matching_grant(permission, value).is_some());
                if candidates.len() != before {
                    tracing::debug!(
                        principal_id = %self.principal_id,
                        permission = %permission.permission_name(),
                        before,
                        after = candidates.len(),
                        "narrowed candidate set"
                    );
                }
                Ok(())
            }
        }
    }
}

/// Audit view of a single-value decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub principal_id: PrincipalId,
    pub permission: String,
    pub instance: String,
    pub granted: bool,
    pub matched_grant: Option<String>,
    pub reason: String,
    pub effective_grants: Vec<String>,
}
