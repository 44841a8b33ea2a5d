//! Store module
//!
//! The identity-scoped task cache and the binding that keeps it in step
//! with the signed-in identity.

mod binding;
mod task_store;

pub use binding::IdentityBinding;
pub use task_store::{StoreEvent, StorePhase, TaskSnapshot, TaskStore};
