use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Grant, Principal};

/// Role identifier.
///
/// Roles are opaque strings at this layer; what they grant is decided by a
/// [`RolePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → grants mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePolicy {
    roles: HashMap<Role, Vec<Grant>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: Role, grant: Grant) -> Self {
        self.roles.entry(role).or_default().push(grant);
        self
    }

    pub fn grants_for(&self, role: &Role) -> &[Grant] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or_default()
    }

    /// Explicit grants of the principal followed by those of each of its roles.
    /// Unknown roles contribute nothing.
    pub fn effective_grants(&self, principal: &Principal) -> Vec<Grant> {
        let mut grants = principal.grants.clone();
        for role in &principal.roles {
            for grant in self.grants_for(role) {
                if !grants.contains(grant) {
                    grants.push(grant.clone());
                }
            }
        }
        grants
    }
}
