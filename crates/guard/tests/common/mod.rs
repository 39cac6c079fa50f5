#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use warden_auth::{
    AuthorizationError, AuthorizationSubject, Grant, PermissionExpression, Principal, PrincipalId,
    PrincipalSubject, Target,
};
use warden_core::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: u32,
    pub county: String,
}

pub fn case(id: u32, county: &str) -> Case {
    Case {
        id,
        county: county.to_string(),
    }
}

pub fn value_of<T: Serialize>(value: &T) -> Value {
    Value::from_serialize(value).expect("test values serialize")
}

pub fn principal_with(grants: &[&str]) -> Principal {
    grants.iter().fold(Principal::new(PrincipalId::new()), |p, g| {
        p.with_grant(Grant::parse(*g).expect("valid test grant"))
    })
}

/// Wraps a subject and counts how often it is consulted.
pub struct Counting<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S> Counting<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<S: AuthorizationSubject> AuthorizationSubject for Counting<S> {
    fn check_permission(
        &self,
        permission: &PermissionExpression,
        target: Target<'_>,
    ) -> Result<(), AuthorizationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.check_permission(permission, target)
    }
}

pub fn granting(grants: &[&str]) -> Counting<PrincipalSubject> {
    Counting::new(PrincipalSubject::new(&principal_with(grants)))
}

pub fn init_logging() {
    warden_observability::init_with("warden_guard=debug", warden_observability::LogFormat::Pretty);
}
