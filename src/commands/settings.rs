use super::{print_status, AppContext};
use crate::cli::SettingsCommand;
use crate::config::SettingsPatch;
use crate::error::{ManomanError, Result};
use crate::settings_store::UpdateEffect;
use colored::Colorize;
use prettytable::{format, Table};
use serde_json::Value as JsonValue;

/// Settings whose values are masked when shown.
const SECRET_FIELDS: &[&str] = &["authorizationKey", "csrfToken"];

/// Handle settings commands
pub async fn handle_settings(ctx: &AppContext, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => show_settings(ctx)?,
        SettingsCommand::Set { field, value } => {
            let patch = SettingsPatch::from_key_value(&field, &value)?;
            let effect = ctx.settings.apply_update(&patch).await?;
            println!("{}", format!("Updated {}", field).green());
            if effect == UpdateEffect::ProbeConnection {
                print_status(&ctx.settings.connection_status());
            }
        }
        SettingsCommand::Export => {
            println!("{}", ctx.settings.export_settings()?);
        }
        SettingsCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            if !ctx.settings.import_settings(&text).await {
                return Err(ManomanError::Config(format!(
                    "Invalid settings file: {}",
                    file.display()
                ))
                .into());
            }
            println!("{}", "Settings imported".green());
            print_status(&ctx.settings.connection_status());
        }
        SettingsCommand::Reset => {
            ctx.settings.reset_to_defaults();
            println!("{}", "Settings reset to defaults".green());
        }
    }

    Ok(())
}

/// Probe the backend and print the resulting status.
pub async fn test_connection(ctx: &AppContext) -> Result<()> {
    let settings = ctx.settings.settings();
    let target = if settings.use_proxy {
        format!("{} (via proxy {})", settings.api_root_url, settings.proxy_url)
    } else {
        settings.api_root_url.clone()
    };
    println!("Testing {}{} ...", target, settings.test_endpoint);

    let status = ctx.settings.test_connection().await;
    print_status(&status);
    Ok(())
}

fn show_settings(ctx: &AppContext) -> Result<()> {
    let JsonValue::Object(fields) = serde_json::to_value(ctx.settings.settings())? else {
        return Ok(());
    };

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Setting".bold(), "Value".bold()]);

    for (name, value) in fields {
        table.add_row(prettytable::row![name.cyan(), display_value(&name, &value)]);
    }

    println!("\nSettings:");
    table.printstd();
    println!();
    Ok(())
}

fn display_value(name: &str, value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) if s.is_empty() => "-".to_string(),
        JsonValue::String(_) if SECRET_FIELDS.contains(&name) => "********".to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
