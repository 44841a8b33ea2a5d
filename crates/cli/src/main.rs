//! Headless tasksync client
//!
//! Signs in, loads the signed-in user's tasks and prints them together with
//! the dashboard statistics.
//!
//! Usage: `tasksync [--json] [SEARCH...]`; several search words are joined
//! with spaces.
//!
//! Connection settings come from `TASKSYNC_CONFIG` (a JSON file) or the
//! `TASKSYNC_*` variables. Credentials come from `TASKSYNC_ACCESS_TOKEN`, or
//! from `TASKSYNC_EMAIL` and `TASKSYNC_PASSWORD`.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasksync_core::task::RestTaskRemote;
use tasksync_core::view::{compute_stats, filter_by_search};
use tasksync_core::{AuthClient, IdentityBinding, SessionIdentity, SyncConfig, TaskStore};

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    json: bool,
    search: String,
}

fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut words = Vec::new();
    for arg in args {
        if arg == "--json" {
            parsed.json = true;
        } else if arg.starts_with("--") {
            bail!("Unknown option {}", arg);
        } else {
            words.push(arg);
        }
    }
    parsed.search = words.join(" ");
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasksync=info,tasksync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Args { json, search } = parse_args(std::env::args().skip(1))?;

    let config = match std::env::var("TASKSYNC_CONFIG") {
        Ok(path) => SyncConfig::load(&path)
            .await
            .with_context(|| format!("Loading {}", path))?,
        Err(_) => SyncConfig::from_env(),
    };
    config.validate()?;
    tracing::info!("Using backend {}", config.base_url());

    let session = SessionIdentity::new();
    let auth = AuthClient::new(config.clone(), session.clone())?;
    if let Ok(token) = std::env::var("TASKSYNC_ACCESS_TOKEN") {
        auth.restore(&token).context("Restoring session")?;
    } else {
        let (Ok(email), Ok(password)) = (
            std::env::var("TASKSYNC_EMAIL"),
            std::env::var("TASKSYNC_PASSWORD"),
        ) else {
            bail!("Set TASKSYNC_ACCESS_TOKEN, or TASKSYNC_EMAIL and TASKSYNC_PASSWORD");
        };
        auth.sign_in(&email, &password).await.context("Signing in")?;
    }

    let remote = Arc::new(RestTaskRemote::new(config, Arc::new(session.clone()))?);
    let store = TaskStore::new(remote, Arc::new(session.clone()));
    let _binding = IdentityBinding::start(store.clone()).await;

    let snapshot = store.snapshot().await;
    if let Some(error) = &snapshot.error {
        bail!("Failed to load tasks: {}", error);
    }

    let visible = filter_by_search(&snapshot.tasks, &search);
    let stats = compute_stats(&snapshot.tasks);

    if json {
        let out = serde_json::json!({ "tasks": visible, "stats": stats });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for task in &visible {
        let mark = if task.is_completed() { "x" } else { " " };
        let due = task
            .due_date
            .map(|d| format!("  (due {})", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        println!("[{}] {:<8} {}{}", mark, task.priority.as_str(), task.title, due);
    }
    println!(
        "\n{} shown of {} | {} completed | {} pending | {}% done",
        visible.len(),
        stats.total,
        stats.completed,
        stats.pending,
        stats.completion_rate
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_search_words_are_joined() {
        let parsed = parse_args(args(&["buy", "--json", "milk"])).unwrap();
        assert_eq!(
            parsed,
            Args {
                json: true,
                search: "buy milk".into(),
            }
        );
    }

    #[test]
    fn test_no_args() {
        assert_eq!(parse_args(args(&[])).unwrap(), Args::default());
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        assert!(parse_args(args(&["--verbose"])).is_err());
    }
}
