use super::{truncate, AppContext};
use crate::chat::types::{session_title_for, title_from_query};
use crate::chat::{ChatSession, Message, Role, ServiceContext, Strategy};
use crate::cli::SessionsCommand;
use crate::error::Result;
use anyhow::anyhow;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle chat session commands
pub fn handle_sessions(ctx: &AppContext, command: SessionsCommand) -> Result<()> {
    let store = &ctx.sessions;

    match command {
        SessionsCommand::List => {
            let sessions = store.get_all_sessions();
            if sessions.is_empty() {
                println!("{}", "No chat sessions found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Service".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            for session in sessions {
                let service = session
                    .service_context
                    .as_ref()
                    .and_then(|c| c.service_name.clone())
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(prettytable::row![
                    session.id.cyan(),
                    truncate(&session.title, 40),
                    service,
                    session.messages.len(),
                    session.updated_at.format("%Y-%m-%d %H:%M").to_string()
                ]);
            }

            println!("\nChat Sessions:");
            table.printstd();
            println!();
        }
        SessionsCommand::Create { title, service } => {
            let context = service.map(ServiceContext::for_service);
            let title = title.unwrap_or_else(|| session_title_for(context.as_ref()));
            let session = store.create_session(Some(&title), context);
            println!("{}", format!("Created session \"{}\"", session.title).green());
            println!("Session ID: {}", session.id.cyan());
        }
        SessionsCommand::Rename { id, title } => {
            if store.update_session_title(&id, &title) {
                println!("{}", format!("Renamed session {}", id).green());
            } else {
                println!("{}", format!("No session with id {}", id).yellow());
            }
        }
        SessionsCommand::Delete { id } => {
            if store.delete_session(&id) {
                println!("{}", format!("Deleted session {}", id).green());
            } else {
                println!("{}", format!("No session with id {}", id).yellow());
            }
        }
        SessionsCommand::Show { id } => {
            let session = store
                .get_session(&id)
                .ok_or_else(|| anyhow!("Session not found: {}", id))?;
            print_session(&session);
        }
    }

    Ok(())
}

/// Ask the agent within a session and record both sides of the exchange
///
/// The user message is stored before the request, so it is part of the
/// history the agent sees. A failed request leaves the user message in
/// place. The first exchange renames the session after the question.
pub async fn ask(
    ctx: &AppContext,
    session_id: &str,
    message: &str,
    strategy: Strategy,
    service: Option<String>,
) -> Result<()> {
    let session = ctx
        .sessions
        .get_session(session_id)
        .ok_or_else(|| anyhow!("Session not found: {}", session_id))?;
    let context = service
        .map(ServiceContext::for_service)
        .or(session.service_context);
    let first_exchange = session.messages.is_empty();

    let mut user_message = Message::user(message);
    if let Some(context) = &context {
        user_message = user_message.with_context(context.clone());
    }
    ctx.sessions.add_message(session_id, user_message);

    let response = ctx
        .chat
        .send_message(&ctx.sessions, message, session_id, context.clone(), strategy)
        .await?;

    let mut reply = Message::from_agent_response(&response);
    if let Some(context) = context {
        reply = reply.with_context(context);
    }
    print_message(&reply);
    ctx.sessions.add_message(session_id, reply);

    if first_exchange {
        ctx.sessions
            .update_session_title(session_id, &title_from_query(message));
    }
    Ok(())
}

/// Clear the agent's backend memory.
pub async fn clear_memory(ctx: &AppContext) -> Result<()> {
    ctx.chat.clear_memory().await?;
    println!("{}", "Agent memory cleared".green());
    Ok(())
}

fn print_session(session: &ChatSession) {
    println!("{} {}", session.title.bold(), format!("({})", session.id).dimmed());
    println!(
        "Created {}  Updated {}",
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.updated_at.format("%Y-%m-%d %H:%M")
    );
    println!();
    for message in &session.messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let author = match message.role {
        Role::User => "you".cyan().bold(),
        Role::Assistant => "agent".green().bold(),
    };
    println!(
        "[{}] {}: {}",
        message.timestamp.format("%H:%M:%S"),
        author,
        message.content
    );

    for step in message.reasoning.iter().flatten() {
        println!(
            "    {} {}: {} -> {}",
            format!("step {}", step.step).dimmed(),
            step.thought,
            step.action,
            step.observation.as_deref().unwrap_or("-")
        );
    }
    for source in message.sources.iter().flatten() {
        println!("    {} {}", "source:".dimmed(), source.title);
    }
}
