//! Man-O-Man - API service explorer client library
//!
//! This library provides the client layer of the Man-O-Man dashboard:
//! settings persistence, a configurable HTTP client, connectivity probing
//! and chat session storage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `config`: Application settings, partial updates and validation
//! - `storage`: Durable key-value slots backing settings and sessions
//! - `client`: HTTP client with base URL resolution, auth headers, proxy
//!   routing and retry
//! - `probe`: Connectivity probe and connection status model
//! - `settings_store`: Owner of settings and connection status
//! - `chat`: Chat session store and agent endpoint calls
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use manoman::storage::SledStore;
//! use manoman::{ApiClient, ClientEnvironment, HttpProbe, SettingsStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SettingsStore::new(
//!         Arc::new(SledStore::open_default()?),
//!         Arc::new(HttpProbe::new()),
//!     );
//!     store.initialize().await;
//!
//!     let client = ApiClient::new(store.subscribe_settings(), ClientEnvironment::from_env())?;
//!     let services = client.get_services().await?;
//!     println!("{} services", services.len());
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod probe;
pub mod settings_store;
pub mod storage;

// Re-export commonly used types
pub use chat::{ChatService, ChatSession, ChatSessionStore, Message};
pub use client::{ApiClient, ClientEnvironment, RequestOptions};
pub use config::{ApplicationSettings, SettingsPatch};
pub use error::{ClientResult, ManomanError, Result};
pub use probe::{ConnectionProbe, ConnectionState, ConnectionStatus, HttpProbe};
pub use settings_store::{SettingsLoad, SettingsStore, UpdateEffect};
