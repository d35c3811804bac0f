//! Generation Prompts
//!
//! System prompts, user requests, and output schemas for every generation
//! call the workflow makes. The planner model handles query generation and
//! outlining. The writer model handles section writing, grading, and review.

use serde_json::{Value, json};

// =============================================================================
// User Requests
// =============================================================================

pub const RESEARCH_QUERIES_REQUEST: &str = "Generate search queries on the provided topic.";
pub const SECTION_QUERIES_REQUEST: &str = "Generate search queries for the provided section.";
pub const OUTLINE_REQUEST: &str = "Generate the article outline.";
pub const SECTION_WRITER_REQUEST: &str =
    "Generate a section of the article based on the provided sources.";
pub const GRADER_REQUEST: &str =
    "Grade the article and consider follow-up questions for missing information:";
pub const EDITOR_REQUEST: &str = "Generate a feedback on the draft of the article";
pub const FINAL_WRITER_REQUEST: &str =
    "Generate a section of an article based on the provided sources.";

// =============================================================================
// System Prompts
// =============================================================================

/// Initial research: queries that inform outline planning
pub fn research_queries_system(topic: &str, report_structure: &str, count: usize) -> String {
    format!(
        r#"You are an expert technical writer, helping to structure an article content on the topic: "{topic}"

<instructions>
{report_structure}
</instructions>

Your task is to generate {count} search queries that will help gather comprehensive information for planning the article sections.

The queries should:
1. Be relevant to the topic
2. Help satisfy the requirements specified in instructions.

Make the queries detailed but specific enough to find high-quality, relevant sources while covering the breadth needed for the article structure."#
    )
}

pub const OUTLINE_SYSTEM: &str = r#"You are an expert technical writer tasked to plan an article outline for a topic.

<instructions>
1. Create a clear, engaging title for the article
2. Generate a list of sections for the article.
3. Design a logical progression of sections with descriptive headings
4. Each section should have the fields:
    - name: Concise, descriptive section heading, unique within the article
    - section_number: Sequential integer for ordering
    - description: Brief summary of section content (2-3 sentences)
    - research: Boolean value (true/false) indicating if web research is needed
5. Introduction and conclusion will not require research because they can distill information from other parts of the article.
6. If a feedback is provided, use it to improve the outline or the title.
7. Return the title and sections as a valid JSON object without any additional text.
</instructions>
"#;

pub fn outline_user(
    topic: &str,
    report_structure: &str,
    context: &str,
    feedback: Option<&str>,
) -> String {
    let feedback = feedback
        .map(|f| {
            format!(
                "<Feedback>\nHere is some feedback on article structure from user review:{}\n</Feedback>",
                f
            )
        })
        .unwrap_or_default();

    format!(
        r#"{OUTLINE_REQUEST}

The topic of the article is:
<topic>
{topic}
</topic>

<article organization>
{report_structure}
</article organization>

Use this context to plan the sections of the article:
<Context>
{context}
</Context>

<feedback>
{feedback}
</feedback>
"#
    )
}

pub fn section_queries_system(section_description: &str, count: usize) -> String {
    format!(
        r#"You are an expert technical writer crafting targeted web search queries that will gather comprehensive information for writing a technical article section.

<Section topic>
{section_description}
</Section topic>

<Task>
When generating {count} search queries, ensure they:
1. Cover different aspects of the topic (e.g., core features, real-world applications, technical architecture)
2. Include specific technical terms related to the topic
3. Target recent information by including year markers where relevant
4. Look for comparisons or differentiators from similar technologies/approaches
5. Search for both official documentation and practical implementation examples

Your queries should be:
- Specific enough to avoid generic results
- Technical enough to capture detailed implementation information
- Diverse enough to cover all aspects of the section plan
- Focused on authoritative sources (documentation, technical blogs, academic papers)
</Task>"#
    )
}

pub fn section_writer_system(
    section_description: &str,
    existing_content: &str,
    context: &str,
    writing_guidelines: &str,
) -> String {
    format!(
        r#"You are an expert technical writer crafting one section of a technical article.

<Section topic>
{section_description}
</Section topic>

<Existing section content (if populated)>
{existing_content}
</Existing section content>

<Source material>
{context}
</Source material>

<Guidelines for writing>
1. If the existing section content is not populated, write a new section from scratch.
2. If the existing section content is populated, write a new section that synthesizes the existing section content with the new information.
</Guidelines for writing>

<Length and style>
- Do not include a section title
- No marketing language
- Technical focus
- Write in simple, clear language
- Use short paragraphs (2-3 sentences max)
- Only use ONE structural element IF it helps clarify your point:
  * Either a focused table comparing 2-3 key items (using Markdown table syntax)
  * Or a short list (3-5 items) using proper Markdown list syntax
- End with ### Sources that references the above source material formatted as:
  * `- Title : URL`
{writing_guidelines}
</Length and style>

<Quality checks>
- Careful use of only ONE structural element (table or list) and only if it helps clarify your point
- One specific example / case study
- No preamble prior to creating the section content
- Sources cited at end
</Quality checks>
"#
    )
}

pub fn section_grader_system(section_description: &str, content: &str) -> String {
    format!(
        r#"Review a section of an article relative to the specified topic:

<section topic>
{section_description}
</section topic>

<section content>
{content}
</section content>

<task>
Evaluate whether the section adequately covers the topic by checking technical accuracy and depth.

If the section fails any criteria, generate specific follow-up search queries to gather missing information.
</task>"#
    )
}

pub fn editor_review_system(title: &str, draft: &str) -> String {
    format!(
        r#"You are an expert editor tasked to review all the sections of the article. Focus on identifying:
- Potential repetitions: If the same concept is repeated in different sections without adding value, then the subsequent sections should avoid the repetition.
- Concepts or explanations which are incomplete: if so, you must provide a feedback to cover the missing information
- Explanations which are unnecessarily overcomplicated
- Acronyms which have not been explained

This review must consider the article as a whole. Read all sections before writing any feedback.
Relate every feedback to a specific section. Keep each feedback clear and concise so the writer can apply it.

If you don't have any feedback, return an empty list.

Article Title: {title}

<Sections>
{draft}
</Sections>
"#
    )
}

pub fn final_writer_system(section_name: &str, section_description: &str, context: &str) -> String {
    format!(
        r#"You are an expert technical writer crafting a section that synthesizes information from the rest of the article.

<Section title>
{section_name}
</Section title>

<Section description>
{section_description}
</Section description>

<Available article content>
{context}
</Available article content>

<Task>
For Introduction:
- Do not include a section title
- 50-100 word limit
- Focus on the core motivation for the article in 1-2 paragraphs
- Include NO structural elements (no lists or tables)
- No sources section needed

For Conclusion/Summary:
- Do not include a section title
- 100-150 word limit
- For comparative articles include a focused comparison table using Markdown table syntax
- Otherwise use at most ONE structural element (table or short list) IF it distills the article
- End with specific next steps or implications
- No sources section needed

Writing approach:
- Use concrete details over general statements
- Make every word count
- Focus on your single most important point
</Task>

<Quality Checks>
- Do not include any title or Markdown element starting with # or ##
- Markdown format
- Do not include word count or any preamble in your response
</Quality Checks>"#
    )
}

// =============================================================================
// Output Schemas
// =============================================================================

pub fn queries_schema() -> Value {
    json!({
        "title": "Queries",
        "type": "object",
        "required": ["queries"],
        "properties": {
            "queries": {
                "type": "array",
                "items": {"type": "string"},
                "description": "List of search queries."
            }
        }
    })
}

pub fn outline_schema() -> Value {
    json!({
        "title": "Outline",
        "type": "object",
        "required": ["title", "sections"],
        "properties": {
            "title": {"type": "string", "description": "Title of the article."},
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "description", "research"],
                    "properties": {
                        "section_number": {"type": "integer"},
                        "name": {"type": "string"},
                        "description": {"type": "string"},
                        "research": {"type": "boolean"}
                    }
                }
            }
        }
    })
}

pub fn feedback_schema() -> Value {
    json!({
        "title": "Feedback",
        "type": "object",
        "required": ["grade", "follow_up_queries"],
        "properties": {
            "grade": {
                "type": "string",
                "enum": ["pass", "fail"],
                "description": "Whether the section meets requirements ('pass') or needs revision ('fail')."
            },
            "follow_up_queries": {
                "type": "array",
                "items": {"type": "string"},
                "description": "List of follow-up search queries."
            }
        }
    })
}

pub fn editor_feedback_schema() -> Value {
    json!({
        "title": "EditorFeedback",
        "type": "object",
        "required": ["feedbacks"],
        "properties": {
            "feedbacks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["feedback", "section_number", "section_title"],
                    "properties": {
                        "feedback": {"type": "string"},
                        "section_number": {"type": "integer"},
                        "section_title": {"type": "string"}
                    }
                }
            }
        }
    })
}
