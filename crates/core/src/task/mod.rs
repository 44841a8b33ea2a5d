//! Task module
//!
//! The task entity, its mapping onto remote rows, and the remote collections
//! the task store talks to.

mod mapping;
mod memory_remote;
mod model;
mod remote;
mod rest_remote;

pub use mapping::*;
pub use memory_remote::{HeldCall, InMemoryTaskRemote};
pub use model::*;
pub use remote::TaskRemote;
pub use rest_remote::RestTaskRemote;
