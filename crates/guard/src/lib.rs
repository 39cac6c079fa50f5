//! `warden-guard`: attribute-based authorization around method calls.
//!
//! A [`Guard`] looks up the requirements a [`PolicyRegistry`] holds for a
//! method, evaluates each requirement's selector against the call's
//! arguments (before the call) and result (after it), and asks an
//! [`AuthorizationSubject`](warden_auth::AuthorizationSubject) to decide.
//! Scalar checks are all-or-nothing; collection checks may narrow the
//! collection to what the subject allows.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod registry;
pub mod selector;

pub use config::{SecurityConfig, SecurityToggle};
pub use error::{ConfigError, EvaluationError, GuardError, InvocationError, RegistryError};
pub use evaluator::{EvaluationContext, evaluate_scalar, filter_in_place, project_over_collection};
pub use guard::Guard;
pub use registry::{MethodId, MethodPolicy, ParameterPolicy, PolicyRegistry, Requirement, TargetSlot};
pub use selector::{Selector, Step};
