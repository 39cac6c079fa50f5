//! `warden-auth`: permission expressions, grants and the subject contract.
//!
//! This crate knows nothing about how checked values are located inside a
//! call; it only decides whether a principal may act on a value.

pub mod grant;
pub mod permission;
pub mod principal;
pub mod roles;
pub mod subject;

pub use grant::{Grant, GrantError};
pub use permission::{MalformedPermissionError, PermissionExpression};
pub use principal::{Principal, PrincipalId};
pub use roles::{Role, RolePolicy};
pub use subject::{
    AccessExplanation, AuthorizationError, AuthorizationSubject, CandidateSet, PrincipalSubject,
    Target,
};
