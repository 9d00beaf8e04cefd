//! Man-O-Man - API service explorer client
//!
//! Main entry point for the `manoman` command-line client.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use manoman::cli::{Cli, Commands};
use manoman::commands::{self, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    if let Some(dir) = &cli.data_dir {
        tracing::debug!("Using data directory: {}", dir.display());
    }
    let ctx = AppContext::open(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Settings { command } => {
            commands::settings::handle_settings(&ctx, command).await?;
        }
        Commands::TestConnection => {
            commands::settings::test_connection(&ctx).await?;
        }
        Commands::Services { command } => {
            commands::services::handle_services(&ctx, command).await?;
        }
        Commands::Upload { file } => {
            tracing::info!("Uploading API specification {}", file.display());
            commands::services::upload(&ctx, &file).await?;
        }
        Commands::UploadStatus { id } => {
            commands::services::upload_status(&ctx, &id).await?;
        }
        Commands::Sessions { command } => {
            commands::sessions::handle_sessions(&ctx, command)?;
        }
        Commands::Ask {
            session_id,
            message,
            strategy,
            service,
        } => {
            commands::sessions::ask(&ctx, &session_id, &message, strategy, service).await?;
        }
        Commands::ClearMemory => {
            commands::sessions::clear_memory(&ctx).await?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "manoman=debug" } else { "manoman=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
