//! Discard Command
//!
//! Deletes stored sessions and, optionally, their written documents.

use std::fs;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{Result, SessionId};
use crate::workflow::SessionStatus;

/// Discard one session
pub fn run(ctx: &CommandContext, session: &str, remove_document: bool) -> Result<()> {
    let output = Output::new();
    let id = SessionId::parse(session)?;

    if ctx.store.delete(&id)? {
        output.success(&format!("Discarded session {}", id));
    } else {
        output.warning(&format!("No session {}", id));
    }

    if remove_document {
        let path = ctx.document_path(&id);
        if path.exists() {
            fs::remove_file(&path)?;
            output.success(&format!("Removed {}", path.display()));
        }
    }
    Ok(())
}

/// Discard every session that is not completed
pub fn discard_incomplete(ctx: &CommandContext) -> Result<()> {
    let output = Output::new();
    let mut removed = 0;

    for summary in ctx.store.list()? {
        if summary.status != SessionStatus::Completed && ctx.store.delete(&summary.session_id)? {
            removed += 1;
        }
    }

    if removed > 0 {
        output.success(&format!("Discarded {} incomplete sessions", removed));
    } else {
        output.info("No incomplete sessions");
    }
    Ok(())
}
