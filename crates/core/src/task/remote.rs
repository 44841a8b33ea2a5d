//! Remote collection trait
//!
//! Defines the interface the task store uses to reach the persistent
//! collection. Implementations are trusted: whatever they return is the
//! canonical record.

use async_trait::async_trait;

use super::mapping::{NewTaskRow, TaskPatchRow, TaskRow};
use crate::Result;

/// Owner-scoped access to the remote task collection
#[async_trait]
pub trait TaskRemote: Send + Sync {
    /// All rows owned by `owner_id`, newest `created_at` first
    async fn list(&self, owner_id: &str) -> Result<Vec<TaskRow>>;

    /// Insert a row; the remote assigns `id`, `created_at` and `updated_at`
    async fn insert(&self, row: NewTaskRow) -> Result<TaskRow>;

    /// Apply a patch to a row owned by `owner_id`, refreshing `updated_at`
    async fn update(&self, owner_id: &str, id: &str, patch: TaskPatchRow) -> Result<TaskRow>;

    /// Delete a row owned by `owner_id`
    async fn delete(&self, owner_id: &str, id: &str) -> Result<()>;
}
