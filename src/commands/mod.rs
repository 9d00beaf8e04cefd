/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `settings`: show, change, export, import and reset settings; probe the backend
- `services`: service catalog, uploads and upload status
- `sessions`: chat sessions and agent questions

Every handler works on an [`AppContext`] assembled once per invocation from
the persisted store.
*/

use crate::chat::{ChatService, ChatSessionStore};
use crate::client::{ApiClient, ClientEnvironment};
use crate::error::Result;
use crate::probe::{ConnectionState, ConnectionStatus, HttpProbe};
use crate::settings_store::{SettingsLoad, SettingsStore};
use crate::storage::{KeyValueStore, SledStore};
use colored::{ColoredString, Colorize};
use std::path::Path;
use std::sync::Arc;

pub mod services;
pub mod sessions;
pub mod settings;

/// Shared state for one CLI invocation
pub struct AppContext {
    pub settings: SettingsStore,
    pub sessions: ChatSessionStore,
    pub client: ApiClient,
    pub chat: ChatService,
}

impl AppContext {
    /// Open the persisted store and wire up the client layer
    ///
    /// `data_dir` overrides the platform data directory. Persisted settings
    /// are loaded but no probe is started; `test-connection` probes
    /// explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the HTTP client
    /// cannot be built.
    pub fn open(data_dir: Option<&Path>) -> Result<Self> {
        let storage: Arc<dyn KeyValueStore> = match data_dir {
            Some(dir) => Arc::new(SledStore::new(dir.join("store"))?),
            None => Arc::new(SledStore::open_default()?),
        };
        Self::with_storage(storage, ClientEnvironment::from_env())
    }

    /// Assemble the context over an already opened store.
    pub fn with_storage(storage: Arc<dyn KeyValueStore>, env: ClientEnvironment) -> Result<Self> {
        let settings = SettingsStore::new(storage.clone(), Arc::new(HttpProbe::new()));
        if let SettingsLoad::Defaulted(reason) = settings.load() {
            eprintln!("{}", format!("Warning: {}", reason).yellow());
        }

        let client = ApiClient::new(settings.subscribe_settings(), env.clone())?;
        let sessions = ChatSessionStore::open(storage);
        let chat = ChatService::new(&env);

        Ok(Self {
            settings,
            sessions,
            client,
            chat,
        })
    }
}

/// Colored badge for a connection state.
pub fn status_badge(state: ConnectionState) -> ColoredString {
    let label = state.to_string().to_uppercase();
    match state {
        ConnectionState::Connected => label.green().bold(),
        ConnectionState::Connecting => label.yellow().bold(),
        ConnectionState::Error => label.red().bold(),
        ConnectionState::Disconnected => label.dimmed(),
    }
}

/// Print a connection status the way the status indicator shows it.
pub fn print_status(status: &ConnectionStatus) {
    println!("Connection: {}", status_badge(status.status));
    if let Some(response_time) = status.response_time {
        println!("  Response time: {}ms", response_time);
    }
    if let Some(checked) = status.last_checked {
        println!("  Last checked:  {}", checked.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(message) = &status.error_message {
        println!("  {}", message.red());
    }
}

/// Shorten `text` to `max` characters for table cells.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long title", 10), "a rathe...");
    }

    #[test]
    fn test_context_over_memory_store() {
        let ctx = AppContext::with_storage(
            Arc::new(MemoryStore::new()),
            ClientEnvironment::default(),
        )
        .unwrap();
        assert!(ctx.sessions.is_empty());
        assert_eq!(ctx.client.base_url(), "http://localhost:8000");
        assert_eq!(ctx.chat.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_status_badge_labels() {
        assert!(status_badge(ConnectionState::Connected)
            .to_string()
            .contains("CONNECTED"));
        assert!(status_badge(ConnectionState::Error).to_string().contains("ERROR"));
    }
}
