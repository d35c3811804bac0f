//! Status Command
//!
//! Show one session in detail, or list all sessions.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{Result, SessionId};
use crate::workflow::SessionCheckpoint;

pub fn run(ctx: &CommandContext, session: Option<&str>, format: &str) -> Result<()> {
    let json_output = format == "json";
    match session {
        Some(id) => show_session(ctx, &SessionId::parse(id)?, json_output),
        None => list_sessions(ctx, json_output),
    }
}

fn show_session(ctx: &CommandContext, id: &SessionId, json_output: bool) -> Result<()> {
    let checkpoint = ctx.store.load(id)?;

    if json_output {
        let status = serde_json::json!({
            "session_id": checkpoint.session_id,
            "topic": checkpoint.state.topic,
            "title": checkpoint.state.title,
            "stage": checkpoint.stage,
            "status": checkpoint.status,
            "revision": checkpoint.revision,
            "sections": checkpoint.state.sections.len(),
            "completed_sections": checkpoint.state.completed_names().len(),
            "awaiting_review": checkpoint.pending_interrupt.is_some(),
            "last_error": checkpoint.last_error,
            "updated_at": checkpoint.updated_at,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_session(ctx, &checkpoint);
    Ok(())
}

fn print_session(ctx: &CommandContext, checkpoint: &SessionCheckpoint) {
    let output = Output::new();
    let state = &checkpoint.state;

    output.header(&format!("Session {}", checkpoint.session_id));
    println!("Topic:    {}", state.topic);
    if !state.title.is_empty() {
        println!("Title:    {}", state.title);
    }
    println!("Stage:    {}", checkpoint.stage);
    println!("Status:   {}", checkpoint.status);
    println!("Revision: {}", checkpoint.revision);
    println!("Updated:  {}", checkpoint.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if !state.sections.is_empty() {
        output.section("Sections");
        let done = state.completed_names();
        for section in &state.sections {
            let mark = if done.contains(section.name.as_str()) {
                "✓"
            } else {
                " "
            };
            let research = if section.research { " (research)" } else { "" };
            println!("  [{}] {}{}", mark, section.name, research);
        }
    }

    if checkpoint.pending_interrupt.is_some() {
        output.info("Waiting for outline review");
    }
    if let Some(error) = &checkpoint.last_error {
        output.error(&format!("Last error: {}", error));
    }
    if state.document.is_some() {
        output.success(&format!(
            "Document: {}",
            ctx.document_path(&checkpoint.session_id).display()
        ));
    }
}

fn list_sessions(ctx: &CommandContext, json_output: bool) -> Result<()> {
    let sessions = ctx.store.list()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    let output = Output::new();
    if sessions.is_empty() {
        output.info("No sessions. Run 'deepscribe start \"<topic>\"' to begin.");
        return Ok(());
    }

    output.header("Sessions");
    for summary in sessions {
        println!(
            "  {}  {:<10} {:<22} {}",
            summary.session_id,
            summary.status.as_str(),
            summary.stage.as_str(),
            summary.topic
        );
        if let Some(error) = summary.last_error {
            println!("      └─ {}", error);
        }
    }
    Ok(())
}
