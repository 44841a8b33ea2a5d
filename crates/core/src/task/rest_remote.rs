//! REST client for the hosted task collection
//!
//! Talks to a PostgREST-style endpoint at `{api_url}/rest/v1/{table}`.
//! Requests carry the signed-in identity's access token so the service can
//! enforce row ownership on its side.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::mapping::{NewTaskRow, TaskPatchRow, TaskRow};
use super::remote::TaskRemote;
use crate::config::SyncConfig;
use crate::error::Error;
use crate::http::{auth_headers, build_client, check_status, transport};
use crate::identity::IdentityProvider;
use crate::Result;

/// Patch body, optionally carrying the client's modification time
#[derive(Serialize)]
struct PatchBody<'a> {
    #[serde(flatten)]
    patch: &'a TaskPatchRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

/// The single row a filtered write answered with
///
/// PostgREST answers a write that matched nothing with an empty array, so an
/// id that is missing or owned by someone else comes back as NotFound.
fn matched_row(rows: Vec<TaskRow>, id: &str) -> Result<TaskRow> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(format!("Task {}", id)))
}

pub struct RestTaskRemote {
    client: Client,
    config: SyncConfig,
    identity: Arc<dyn IdentityProvider>,
}

impl RestTaskRemote {
    pub fn new(config: SyncConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_client(&config)?,
            config,
            identity,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.base_url(), self.config.table)
    }

    fn list_url(&self, owner_id: &str) -> String {
        format!(
            "{}?select=*&user_id=eq.{}&order=created_at.desc",
            self.table_url(),
            urlencoding::encode(owner_id)
        )
    }

    fn row_url(&self, owner_id: &str, id: &str) -> String {
        format!(
            "{}?id=eq.{}&user_id=eq.{}",
            self.table_url(),
            urlencoding::encode(id),
            urlencoding::encode(owner_id)
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let token = self
            .identity
            .current_identity()
            .and_then(|identity| identity.access_token);
        auth_headers(&self.config.api_key, token.as_deref())
    }

    fn patch_body<'a>(&self, patch: &'a TaskPatchRow) -> PatchBody<'a> {
        let updated_at = self
            .config
            .stamp_updated_at
            .then(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        PatchBody { patch, updated_at }
    }
}

#[async_trait]
impl TaskRemote for RestTaskRemote {
    async fn list(&self, owner_id: &str) -> Result<Vec<TaskRow>> {
        debug!("Listing tasks for {}", owner_id);
        let resp = self
            .client
            .get(self.list_url(owner_id))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| transport("List tasks", e))?;

        check_status(resp, "List tasks")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading task list", e))
    }

    async fn insert(&self, row: NewTaskRow) -> Result<TaskRow> {
        debug!("Inserting task for {}", row.user_id);
        let resp = self
            .client
            .post(self.table_url())
            .headers(self.headers()?)
            .header("Prefer", "return=representation")
            .json(&[&row])
            .send()
            .await
            .map_err(|e| transport("Insert task", e))?;

        let rows: Vec<TaskRow> = check_status(resp, "Insert task")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading inserted task", e))?;
        rows.into_iter().next().ok_or_else(|| {
            warn!("Insert returned no rows");
            Error::Transport("Insert task returned no row".into())
        })
    }

    async fn update(&self, owner_id: &str, id: &str, patch: TaskPatchRow) -> Result<TaskRow> {
        debug!("Updating task {}", id);
        let resp = self
            .client
            .patch(self.row_url(owner_id, id))
            .headers(self.headers()?)
            .header("Prefer", "return=representation")
            .json(&self.patch_body(&patch))
            .send()
            .await
            .map_err(|e| transport("Update task", e))?;

        let rows: Vec<TaskRow> = check_status(resp, "Update task")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading updated task", e))?;
        matched_row(rows, id)
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        debug!("Deleting task {}", id);
        let resp = self
            .client
            .delete(self.row_url(owner_id, id))
            .headers(self.headers()?)
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| transport("Delete task", e))?;

        let rows: Vec<TaskRow> = check_status(resp, "Delete task")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading deleted task", e))?;
        matched_row(rows, id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, SessionIdentity};
    use crate::task::{TaskPriority, TaskStatus};
    use reqwest::header::AUTHORIZATION;

    fn remote(session: &SessionIdentity) -> RestTaskRemote {
        remote_with(SyncConfig::new("https://db.example.test/", "anon"), session)
    }

    fn remote_with(config: SyncConfig, session: &SessionIdentity) -> RestTaskRemote {
        RestTaskRemote::new(config, Arc::new(session.clone())).unwrap()
    }

    #[test]
    fn test_urls() {
        let remote = remote(&SessionIdentity::new());
        assert_eq!(remote.table_url(), "https://db.example.test/rest/v1/tasks");
        assert_eq!(
            remote.list_url("u 1"),
            "https://db.example.test/rest/v1/tasks?select=*&user_id=eq.u%201&order=created_at.desc"
        );
        assert_eq!(
            remote.row_url("u1", "t1"),
            "https://db.example.test/rest/v1/tasks?id=eq.t1&user_id=eq.u1"
        );
    }

    #[test]
    fn test_headers_follow_session() {
        let session = SessionIdentity::new();
        let remote = remote(&session);
        assert_eq!(remote.headers().unwrap()[AUTHORIZATION], "Bearer anon");

        session.set(Some(Identity::new("u1").with_access_token("jwt")));
        assert_eq!(remote.headers().unwrap()[AUTHORIZATION], "Bearer jwt");
    }

    #[test]
    fn test_patch_body_leaves_updated_at_to_the_backend() {
        let patch = TaskPatchRow {
            status: Some(TaskStatus::Completed),
            ..TaskPatchRow::default()
        };
        let remote = remote(&SessionIdentity::new());
        assert_eq!(
            serde_json::to_value(remote.patch_body(&patch)).unwrap(),
            serde_json::json!({ "status": "completed" })
        );
    }

    #[test]
    fn test_patch_body_stamps_when_configured() {
        let patch = TaskPatchRow {
            title: Some("Renamed".into()),
            ..TaskPatchRow::default()
        };
        let mut config = SyncConfig::new("https://db.example.test", "anon");
        config.stamp_updated_at = true;
        let remote = remote_with(config, &SessionIdentity::new());

        let body = serde_json::to_value(remote.patch_body(&patch)).unwrap();
        assert_eq!(body["title"], "Renamed");
        let stamp = body["updated_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_write_matching_no_row_is_not_found() {
        assert!(matches!(
            matched_row(Vec::new(), "t1"),
            Err(Error::NotFound(msg)) if msg.contains("t1")
        ));

        let row = TaskRow {
            id: "t1".into(),
            user_id: "u1".into(),
            title: "Buy milk".into(),
            notes: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            due_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(matched_row(vec![row.clone()], "t1").unwrap(), row);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = RestTaskRemote::new(SyncConfig::default(), Arc::new(SessionIdentity::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
