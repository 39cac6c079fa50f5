//! `warden-core`: value model shared by the authorization crates.
//!
//! This crate contains no policy logic: only the dynamic values that checked
//! arguments and results are exposed as, and their secured-object view.

pub mod error;
pub mod secured;
pub mod value;

pub use error::{ValueError, ValueResult};
pub use secured::SecuredObject;
pub use value::Value;
