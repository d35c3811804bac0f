//! Run Commands
//!
//! Start, resume, and continue sessions.
//!
//! Usage:
//!   deepscribe start "<topic>" [--session ID] [--interactive]
//!   deepscribe resume <session> (--approve | --feedback "<text>") [--interactive]
//!   deepscribe continue <session> [--interactive]

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, persist_outcome};
use crate::types::{Result, ScribeError, SessionId};
use crate::workflow::{Engine, ResumeValue, RunOutcome};

pub async fn start(
    ctx: &CommandContext,
    topic: &str,
    session: Option<String>,
    interactive: bool,
) -> Result<()> {
    let session_id = session.as_deref().map(SessionId::parse).transpose()?;
    let engine = ctx.engine()?;
    let outcome = engine.start(session_id, topic).await?;
    finish(ctx, &engine, outcome, interactive).await
}

pub async fn resume(
    ctx: &CommandContext,
    session: &str,
    approve: bool,
    feedback: Option<String>,
    interactive: bool,
) -> Result<()> {
    let value = match (approve, feedback) {
        (true, _) => ResumeValue::Approve,
        (false, Some(text)) => ResumeValue::from_text(&text)?,
        (false, None) => {
            return Err(ScribeError::protocol(
                "resume needs --approve or --feedback",
            ));
        }
    };

    let engine = ctx.engine()?;
    let outcome = engine.resume(&SessionId::parse(session)?, value).await?;
    finish(ctx, &engine, outcome, interactive).await
}

pub async fn continue_run(ctx: &CommandContext, session: &str, interactive: bool) -> Result<()> {
    let engine = ctx.engine()?;
    let outcome = engine.continue_run(&SessionId::parse(session)?).await?;
    finish(ctx, &engine, outcome, interactive).await
}

/// Report the outcome; in interactive mode keep answering review prompts
/// until the session completes
async fn finish(
    ctx: &CommandContext,
    engine: &Engine,
    mut outcome: RunOutcome,
    interactive: bool,
) -> Result<()> {
    let output = Output::new();
    loop {
        match &outcome {
            RunOutcome::Completed { session_id, .. } => {
                if let Some(path) = persist_outcome(&ctx.config.output.dir, &outcome)? {
                    output.success(&format!(
                        "Session {} completed: {}",
                        session_id,
                        path.display()
                    ));
                }
                return Ok(());
            }
            RunOutcome::Suspended { session_id, prompt } if interactive => {
                let answer = output.ask(prompt)?;
                let value = match ResumeValue::from_text(&answer) {
                    Ok(value) => value,
                    Err(e) => {
                        output.warning(&e.to_string());
                        continue;
                    }
                };
                outcome = engine.resume(session_id, value).await?;
            }
            RunOutcome::Suspended { session_id, prompt } => {
                output.section("Outline review");
                println!("{}", prompt);
                output.info(&format!(
                    "Session {} is waiting for review. Run 'deepscribe resume {} --approve' or '--feedback \"...\"'",
                    session_id, session_id
                ));
                return Ok(());
            }
        }
    }
}
