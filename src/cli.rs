//! Command-line interface definition for Man-O-Man
//!
//! This module defines the CLI structure using clap's derive API. The CLI
//! drives the same public operations the dashboard calls: settings
//! management, connection testing, service browsing, uploads and chat.

use crate::chat::Strategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Man-O-Man - API service explorer client
#[derive(Parser, Debug, Clone)]
#[command(name = "manoman")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding persisted settings and chat sessions
    #[arg(long, env = "MANOMAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Man-O-Man
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// View or change application settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Probe the configured backend and show the connection status
    TestConnection,

    /// Browse services discovered from uploaded API specifications
    Services {
        #[command(subcommand)]
        command: ServicesCommand,
    },

    /// Upload an API specification file
    Upload {
        /// Path to the specification (JSON or YAML)
        file: PathBuf,
    },

    /// Show the processing status of an upload
    UploadStatus {
        /// Upload identifier returned by `upload`
        id: String,
    },

    /// Manage chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Ask the agent a question within a chat session
    Ask {
        /// Session to append the exchange to
        session_id: String,

        /// Question text
        message: String,

        /// Agent strategy (direct, react)
        #[arg(short, long, default_value = "direct")]
        strategy: Strategy,

        /// Scope the question to a service
        #[arg(long)]
        service: Option<String>,
    },

    /// Clear the agent's conversation memory on the backend
    ClearMemory,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Change one setting by its camelCase name
    Set {
        /// Setting name, e.g. apiRootUrl or maxRetries
        field: String,

        /// New value; parsed as JSON when possible, else taken as a string
        value: String,
    },

    /// Print the settings as pretty JSON
    Export,

    /// Replace the settings with an exported JSON file
    Import {
        /// Path to the exported settings
        file: PathBuf,
    },

    /// Restore the default settings
    Reset,
}

/// Service catalog subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ServicesCommand {
    /// List all services
    List,

    /// Show one service
    Get {
        /// Service name
        name: String,
    },
}

/// Chat session subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionsCommand {
    /// List sessions, most recently active first
    List,

    /// Create an empty session
    Create {
        /// Session title
        #[arg(short, long)]
        title: Option<String>,

        /// Scope the session to a service
        #[arg(long)]
        service: Option<String>,
    },

    /// Rename a session
    Rename {
        /// Session identifier
        id: String,

        /// New title
        title: String,
    },

    /// Delete a session
    Delete {
        /// Session identifier
        id: String,
    },

    /// Print a session and its messages
    Show {
        /// Session identifier
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
