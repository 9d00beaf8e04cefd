use super::{truncate, AppContext};
use crate::cli::ServicesCommand;
use crate::client::ServiceSummary;
use crate::error::Result;
use colored::Colorize;
use prettytable::{format, Table};
use std::path::Path;

/// Handle service catalog commands
pub async fn handle_services(ctx: &AppContext, command: ServicesCommand) -> Result<()> {
    match command {
        ServicesCommand::List => {
            let services = ctx.client.get_services().await?;
            if services.is_empty() {
                println!("{}", "No services found. Upload an API specification first.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "Service".bold(),
                "Endpoints".bold(),
                "Confidence".bold(),
                "Review".bold(),
                "Description".bold()
            ]);

            for service in &services {
                let review = if service.needs_review {
                    "needed".yellow()
                } else {
                    "ok".green()
                };
                table.add_row(prettytable::row![
                    service.service_name.cyan(),
                    service.endpoint_count,
                    format!("{:.0}%", service.confidence_score * 100.0),
                    review,
                    truncate(&service.suggested_description, 50)
                ]);
            }

            println!("\nServices ({}):", services.len());
            table.printstd();
            println!();
        }
        ServicesCommand::Get { name } => match ctx.client.get_service(&name).await {
            Some(service) => print_service(&service),
            None => println!("{}", format!("Service not found: {}", name).yellow()),
        },
    }

    Ok(())
}

/// Upload a specification file and print the upload id.
pub async fn upload(ctx: &AppContext, file: &Path) -> Result<()> {
    let response = ctx.client.upload_api_spec(file).await?;
    println!("{}", format!("Uploaded {}", file.display()).green());
    println!("Upload ID: {}", response.upload_id.cyan());
    println!(
        "Use {} to follow processing.",
        format!("manoman upload-status {}", response.upload_id).cyan()
    );
    Ok(())
}

/// Print the processing status of an upload.
pub async fn upload_status(ctx: &AppContext, upload_id: &str) -> Result<()> {
    let status = ctx.client.get_upload_status(upload_id).await?;
    println!("Upload {}: {}", upload_id.cyan(), status.status.bold());
    if let Some(progress) = status.progress {
        println!("  Progress: {:.0}%", progress);
    }
    if let Some(error) = &status.error {
        println!("  {}", error.red());
    }
    Ok(())
}

fn print_service(service: &ServiceSummary) {
    println!("{}", service.service_name.cyan().bold());
    println!("  Endpoints:   {}", service.endpoint_count);
    println!("  Confidence:  {:.0}%", service.confidence_score * 100.0);
    println!("  Needs review: {}", service.needs_review);
    if !service.suggested_description.is_empty() {
        println!("  {}", service.suggested_description);
    }
    if !service.keywords.is_empty() {
        println!("  Keywords:    {}", service.keywords.join(", "));
    }
    if !service.synonyms.is_empty() {
        println!("  Synonyms:    {}", service.synonyms.join(", "));
    }
}
