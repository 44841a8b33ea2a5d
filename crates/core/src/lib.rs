//! Core library for tasksync
//!
//! This crate contains the task synchronization layer:
//! - The task model and its mapping onto the remote collection
//! - Remote collection clients (hosted REST and in-memory)
//! - The identity-scoped task store and its identity binding
//! - Derived views (search, statistics, calendar)

pub mod config;
pub mod error;
mod http;
pub mod identity;
pub mod store;
pub mod task;
pub mod translation;
pub mod view;

pub use config::SyncConfig;
pub use error::{Error, ErrorKind};
pub use identity::{AuthClient, Identity, IdentityProvider, SessionIdentity};
pub use store::{IdentityBinding, StoreEvent, StorePhase, TaskSnapshot, TaskStore};
pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

pub type Result<T> = std::result::Result<T, Error>;
