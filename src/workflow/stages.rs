//! Stage bodies.
//!
//! Each function advances [`WorkflowState`] for one stage. The executor owns
//! the stage pointer, persistence, and suspension.

use tracing::{info, instrument, warn};

use super::compile::{compile_document, research_digest};
use super::context::WorkflowContext;
use super::fanout::fan_out;
use super::prompts;
use super::responses::{EditorFeedback, Outline, Queries};
use super::section::run_section;
use super::state::WorkflowState;
use crate::constants::research::PLANNING_TOKENS_PER_SOURCE;
use crate::search::format_sources;
use crate::types::{CompletedSection, CompletionKind, Result, Section};

/// Queries from the topic, searched and formatted as planning context
#[instrument(skip_all)]
pub async fn initial_research(ctx: &WorkflowContext, state: &mut WorkflowState) -> Result<()> {
    let count = ctx.research.number_of_queries;
    let system =
        prompts::research_queries_system(&state.topic, &ctx.research.report_structure, count);

    let queries = ctx
        .structured::<Queries>(
            &ctx.planner,
            "research_queries",
            &system,
            prompts::RESEARCH_QUERIES_REQUEST,
            &prompts::queries_schema(),
        )
        .await?
        .limited(count);
    info!(?queries, "Generated research queries");

    let results = ctx.search.search(&queries).await?;
    state.source_context = format_sources(&results, PLANNING_TOKENS_PER_SOURCE, false);
    Ok(())
}

/// Title and ordered sections; consumes pending feedback
#[instrument(skip_all, fields(revision = state.outline_revision + 1))]
pub async fn generate_outline(ctx: &WorkflowContext, state: &mut WorkflowState) -> Result<()> {
    let user = prompts::outline_user(
        &state.topic,
        &ctx.research.report_structure,
        &state.source_context,
        state.pending_feedback.as_deref(),
    );

    let user = user.as_str();
    // Validation runs inside the retried call so an unusable outline is re-requested
    let (title, sections) = ctx
        .retry
        .run("outline", || async move {
            let outline: Outline = ctx
                .structured(
                    &ctx.planner,
                    "outline",
                    prompts::OUTLINE_SYSTEM,
                    user,
                    &prompts::outline_schema(),
                )
                .await?;
            outline.into_sections()
        })
        .await?;

    info!(
        title = %title,
        sections = sections.len(),
        researched = sections.iter().filter(|s| s.research).count(),
        "Outline generated"
    );
    state.set_outline(title, sections);
    state.pending_feedback = None;
    Ok(())
}

/// One research sub-workflow per outstanding researched section
#[instrument(skip_all)]
pub async fn research_sections(ctx: &WorkflowContext, state: &mut WorkflowState) -> Result<()> {
    let pending = state.outstanding(|s| s.research);
    let report = fan_out(
        "section_research",
        pending,
        ctx.research.max_section_concurrency,
        |section| run_section(ctx, section),
    )
    .await;

    state.completed_sections.extend(report.completed.iter().cloned());
    match report.into_first_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Build the research digest; optionally collect editor notes
#[instrument(skip_all)]
pub async fn aggregate_sections(ctx: &WorkflowContext, state: &mut WorkflowState) -> Result<()> {
    state.research_digest = research_digest(state);
    state.editor_feedback = None;

    if ctx.research.editor_review && !state.research_digest.is_empty() {
        let system = prompts::editor_review_system(&state.title, &state.research_digest);
        match ctx
            .structured::<EditorFeedback>(
                &ctx.writer,
                "editor_review",
                &system,
                prompts::EDITOR_REQUEST,
                &prompts::editor_feedback_schema(),
            )
            .await
        {
            Ok(feedback) => state.editor_feedback = feedback.render(),
            Err(e) => warn!(error = %e, "Editor review failed, continuing without it"),
        }
    }
    Ok(())
}

/// One write-only task per outstanding non-researched section
#[instrument(skip_all)]
pub async fn write_final_sections(
    ctx: &WorkflowContext,
    state: &mut WorkflowState,
) -> Result<()> {
    let pending = state.outstanding(|s| !s.research);
    let context = final_context(state);
    let context = context.as_str();
    let report = fan_out(
        "final_sections",
        pending,
        ctx.research.max_section_concurrency,
        |section| write_final_section(ctx, section, context),
    )
    .await;

    state.completed_sections.extend(report.completed.iter().cloned());
    match report.into_first_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn final_context(state: &WorkflowState) -> String {
    match &state.editor_feedback {
        Some(notes) => format!(
            "{}\n<Editor feedback>\n{}\n</Editor feedback>\n",
            state.research_digest, notes
        ),
        None => state.research_digest.clone(),
    }
}

#[instrument(skip_all, fields(section = %section.name))]
async fn write_final_section(
    ctx: &WorkflowContext,
    mut section: Section,
    context: &str,
) -> Result<CompletedSection> {
    let system = prompts::final_writer_system(&section.name, &section.description, context);
    section.content = ctx
        .text(&ctx.writer, "final_section_write", &system, prompts::FINAL_WRITER_REQUEST)
        .await?;
    Ok(CompletedSection {
        section,
        completion: CompletionKind::Unresearched,
        search_rounds: 0,
    })
}

/// Head asset for the title; failures leave the document without one
#[instrument(skip_all)]
pub async fn generate_asset(ctx: &WorkflowContext, state: &mut WorkflowState) -> Result<()> {
    state.head_asset = match ctx.assets.head_asset(&state.title, &state.topic).await {
        Ok(asset) => asset,
        Err(e) => {
            warn!(error = %e, "Asset generation failed, compiling without head asset");
            None
        }
    };
    Ok(())
}

pub fn compile(state: &mut WorkflowState) -> Result<()> {
    let document = compile_document(state)?;
    info!(chars = document.len(), "Document compiled");
    state.document = Some(document);
    Ok(())
}
