//! Section Sub-Workflow
//!
//! Iterative research loop for one `research = true` section:
//!
//! ```text
//! GenerateQueries → Search → WriteAndGrade ─┬─ pass or depth reached → done
//!                      ▲                    │
//!                      └── follow-up queries┘
//! ```
//!
//! The task owns its [`SectionSubState`] and publishes only the finished
//! [`CompletedSection`]. Search, query generation, and grading failures
//! degrade the current round instead of failing the section.

use tracing::{debug, info, instrument, warn};

use super::context::WorkflowContext;
use super::prompts;
use super::responses::{Queries, SectionFeedback};
use crate::search::format_sources;
use crate::types::{CompletedSection, CompletionKind, Result, ScribeError, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionStep {
    GenerateQueries,
    Search,
    WriteAndGrade,
    Done(CompletionKind),
}

/// Private state of one section task; discarded at fan-in
#[derive(Debug, Clone)]
pub struct SectionSubState {
    pub section: Section,
    /// Completed search rounds
    pub iteration: u32,
    pub queries: Vec<String>,
    /// Formatted sources from the latest round
    pub context: String,
}

impl SectionSubState {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            iteration: 0,
            queries: Vec::new(),
            context: String::new(),
        }
    }
}

/// Run the research loop for `section` until it passes grading or the
/// configured depth is reached.
#[instrument(skip_all, fields(section = %section.name))]
pub async fn run_section(ctx: &WorkflowContext, section: Section) -> Result<CompletedSection> {
    let max_depth = ctx.research.max_search_depth;
    let mut sub = SectionSubState::new(section);
    let mut step = SectionStep::GenerateQueries;

    loop {
        step = match step {
            SectionStep::GenerateQueries => {
                sub.queries = generate_queries(ctx, &sub.section).await;
                SectionStep::Search
            }
            SectionStep::Search => {
                search_round(ctx, &mut sub).await;
                SectionStep::WriteAndGrade
            }
            SectionStep::WriteAndGrade => {
                let feedback = write_and_grade(ctx, &mut sub).await?;
                if feedback.passed() {
                    SectionStep::Done(CompletionKind::Passed)
                } else if sub.iteration >= max_depth {
                    SectionStep::Done(CompletionKind::DepthExhausted)
                } else {
                    if !feedback.follow_up_queries.is_empty() {
                        sub.queries = feedback.follow_up_queries;
                        sub.queries.truncate(ctx.research.number_of_queries);
                    }
                    SectionStep::Search
                }
            }
            SectionStep::Done(completion) => {
                info!(
                    completion = completion.as_str(),
                    rounds = sub.iteration,
                    sources = sub.section.sources.len(),
                    "Section complete"
                );
                return Ok(CompletedSection {
                    section: sub.section,
                    completion,
                    search_rounds: sub.iteration,
                });
            }
        };
    }
}

/// Planner queries for the section, falling back to its description
async fn generate_queries(ctx: &WorkflowContext, section: &Section) -> Vec<String> {
    let count = ctx.research.number_of_queries;
    let system = prompts::section_queries_system(&section.description, count);

    let generated = ctx
        .structured::<Queries>(
            &ctx.planner,
            "section_queries",
            &system,
            prompts::SECTION_QUERIES_REQUEST,
            &prompts::queries_schema(),
        )
        .await;

    let queries = match generated {
        Ok(queries) => queries.limited(count),
        Err(e) => {
            warn!(error = %e, "Query generation failed, searching by description");
            Vec::new()
        }
    };

    if queries.is_empty() {
        let fallback = if section.description.trim().is_empty() {
            section.name.clone()
        } else {
            section.description.clone()
        };
        vec![fallback]
    } else {
        queries
    }
}

/// One search round. Failure leaves an empty context for this round.
async fn search_round(ctx: &WorkflowContext, sub: &mut SectionSubState) {
    match ctx.search.search(&sub.queries).await {
        Ok(results) => {
            sub.context = format_sources(
                &results,
                ctx.source_format.max_tokens_per_source,
                ctx.source_format.include_raw_content,
            );
            sub.section
                .merge_sources(results.iter().map(|r| r.source()));
        }
        Err(e) => {
            warn!(error = %e, round = sub.iteration + 1, "Section search failed");
            sub.context.clear();
        }
    }
    sub.iteration += 1;
    debug!(round = sub.iteration, queries = ?sub.queries, "Search round done");
}

/// Write (synthesizing previous content) and grade.
///
/// A failed write keeps the previous content unless the failure is fatal.
/// A failed grade counts as "fail" without follow-up queries.
async fn write_and_grade(
    ctx: &WorkflowContext,
    sub: &mut SectionSubState,
) -> Result<SectionFeedback> {
    let system = prompts::section_writer_system(
        &sub.section.description,
        &sub.section.content,
        &sub.context,
        &ctx.research.writing_guidelines,
    );

    match ctx
        .text(&ctx.writer, "section_write", &system, prompts::SECTION_WRITER_REQUEST)
        .await
    {
        Ok(content) => sub.section.content = content,
        Err(e @ ScribeError::Fatal { .. }) => return Err(e),
        Err(e) => warn!(error = %e, "Section write failed, keeping previous content"),
    }

    let grader = prompts::section_grader_system(&sub.section.description, &sub.section.content);
    let feedback = ctx
        .structured::<SectionFeedback>(
            &ctx.writer,
            "section_grade",
            &grader,
            prompts::GRADER_REQUEST,
            &prompts::feedback_schema(),
        )
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Section grading failed, treating as fail");
            SectionFeedback::failed()
        });

    debug!(passed = feedback.passed(), follow_ups = feedback.follow_up_queries.len(), "Graded");
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{Call, ScriptedProvider, context_with, hit};
    use serde_json::json;
    use std::sync::Arc;

    fn researched() -> Section {
        Section::new(1, "Ownership", "Rust ownership rules", true)
    }

    #[tokio::test]
    async fn test_depth_bound_with_failing_grader() {
        let planner = Arc::new(ScriptedProvider::new(|_| Ok(json!({"queries": ["q1"]}))));
        let writer = Arc::new(ScriptedProvider::new(|call: &Call| {
            if call.schema_title.as_deref() == Some("Feedback") {
                Ok(json!({"grade": "fail", "follow_up_queries": ["deeper"]}))
            } else {
                Ok(json!("draft"))
            }
        }));
        let (ctx, search) = context_with(planner, writer.clone(), 3, vec![
            ("q1", vec![hit("A", "https://a.example/")]),
            ("deeper", vec![hit("B", "https://b.example/")]),
        ]);

        let done = run_section(&ctx, researched()).await.unwrap();

        assert_eq!(done.completion, CompletionKind::DepthExhausted);
        assert_eq!(done.search_rounds, 3);
        assert_eq!(search.queries_seen(), vec!["q1", "deeper", "deeper"]);
        assert_eq!(done.section.sources.len(), 2);
        assert_eq!(writer.calls_with_user(prompts::SECTION_WRITER_REQUEST), 3);
    }

    #[tokio::test]
    async fn test_follow_up_queries_capped_at_query_count() {
        let planner = Arc::new(ScriptedProvider::new(|_| Ok(json!({"queries": ["q1", "q2"]}))));
        let writer = Arc::new(ScriptedProvider::new(|call: &Call| {
            if call.schema_title.as_deref() == Some("Feedback") {
                Ok(json!({
                    "grade": "fail",
                    "follow_up_queries": ["f1", "f2", "f3", "f4", "f5", "f6"]
                }))
            } else {
                Ok(json!("draft"))
            }
        }));
        let (mut ctx, search) = context_with(planner, writer, 2, vec![]);
        ctx.research.number_of_queries = 2;

        run_section(&ctx, researched()).await.unwrap();

        let mut seen = search.queries_seen();
        seen[..2].sort();
        seen[2..].sort();
        assert_eq!(seen, vec!["q1", "q2", "f1", "f2"]);
    }

    #[tokio::test]
    async fn test_pass_stops_early() {
        let planner = Arc::new(ScriptedProvider::new(|_| Ok(json!({"queries": ["q1"]}))));
        let writer = Arc::new(ScriptedProvider::new(|call: &Call| {
            if call.schema_title.is_some() {
                Ok(json!({"grade": "pass", "follow_up_queries": []}))
            } else {
                Ok(json!("final text"))
            }
        }));
        let (ctx, _) = context_with(planner, writer, 5, vec![]);

        let done = run_section(&ctx, researched()).await.unwrap();
        assert_eq!(done.completion, CompletionKind::Passed);
        assert_eq!(done.search_rounds, 1);
        assert_eq!(done.section.content, "final text");
    }

    #[tokio::test]
    async fn test_query_failure_falls_back_to_description() {
        let planner = Arc::new(ScriptedProvider::new(|_| {
            Err(crate::types::LlmError::new(crate::types::ErrorCategory::Auth, "denied").into())
        }));
        let writer = Arc::new(ScriptedProvider::new(|call: &Call| {
            if call.schema_title.is_some() {
                Ok(json!({"grade": "pass", "follow_up_queries": []}))
            } else {
                Ok(json!("text"))
            }
        }));
        let (ctx, search) = context_with(planner, writer, 2, vec![]);

        run_section(&ctx, researched()).await.unwrap();
        assert_eq!(search.queries_seen(), vec!["Rust ownership rules"]);
    }

    #[tokio::test]
    async fn test_grader_failure_reuses_queries() {
        let planner = Arc::new(ScriptedProvider::new(|_| Ok(json!({"queries": ["q1"]}))));
        let writer = Arc::new(ScriptedProvider::new(|call: &Call| {
            if call.schema_title.is_some() {
                Ok(json!("not json at all"))
            } else {
                Ok(json!("text"))
            }
        }));
        let (ctx, search) = context_with(planner, writer, 2, vec![]);

        let done = run_section(&ctx, researched()).await.unwrap();
        assert_eq!(done.completion, CompletionKind::DepthExhausted);
        assert_eq!(search.queries_seen(), vec!["q1", "q1"]);
    }

    #[tokio::test]
    async fn test_fatal_write_propagates() {
        let planner = Arc::new(ScriptedProvider::new(|_| Ok(json!({"queries": ["q1"]}))));
        let writer = Arc::new(ScriptedProvider::new(|_| {
            Err(crate::types::LlmError::new(crate::types::ErrorCategory::Auth, "bad key").into())
        }));
        let (ctx, _) = context_with(planner, writer, 2, vec![]);

        let err = run_section(&ctx, researched()).await.unwrap_err();
        assert!(matches!(err, ScribeError::Fatal { .. }));
    }
}
