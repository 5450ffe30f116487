//! Research workflow prompt templates
//!
//! One template per stage that talks to the generation backend. Every
//! template asks for a bare JSON object (except the final report) and
//! every reply still goes through [`crate::extract`].

use chrono::Utc;

const ANALYZE_TEMPLATE: &str = r#"You are a meticulous research assistant. Today's date is {date}.

Analyze this research query:

QUERY: {query}

Determine:
1. main_topic: the primary subject of the query.
2. specific_request: the precise question or information sought.
3. info_type: facts, opinions, news, analysis, comparison, or similar.
4. time_sensitive: true if the answer depends on current, fast-changing information.
5. key_entities: the central products, organizations, people or concepts.
6. subjective_criteria: terms that need judgment, such as "best" or "reliable".
7. depth_required: "low" for discrete facts, "medium" for explained context, "high" for multi-source analysis or comparison.
8. regional_context: any geographic or domain focus, or null.
9. search_queries: {max_search_queries} distinct search engine queries covering different angles of the request. Do not repeat the query verbatim and avoid near-duplicates or single-word queries.
10. requires_web_scraping: true when snippets are unlikely to be enough (subjective, comparative or in-depth questions).

Respond ONLY with a JSON object:
{
    "main_topic": "topic",
    "specific_request": "what is being asked",
    "info_type": "facts/opinions/news/analysis/comparison",
    "time_sensitive": true,
    "key_entities": ["entity"],
    "subjective_criteria": ["criterion"],
    "depth_required": "low/medium/high",
    "regional_context": null,
    "search_queries": ["query"],
    "requires_web_scraping": false
}"#;

const PLAN_TEMPLATE: &str = r#"You are a research strategist. Create a research plan for this analyzed query.

QUERY ANALYSIS: {analysis}

Decide:
1. Which search to run first: web search, news search, or both in parallel.
2. What information to look for in the results.
3. Which kinds of sources to prioritize.

Respond ONLY with a JSON object:
{
    "search_approach": "web_search" or "news_search" or "parallel_search",
    "priority_info": ["info"],
    "source_priorities": ["academic", "news", "general"],
    "search_refinement_needed": false
}"#;

const EVALUATE_TEMPLATE: &str = r#"You are a research analyst deciding whether search results answer a query.

ORIGINAL QUERY: {query}
ANALYZED QUERY: {analysis}
RESEARCH PLAN: {plan}

Search result snippets:
{snippets}

Guidelines:
1. List every information requirement in the query.
2. Judge whether the snippets give detailed information for each requirement.
3. Subjective assessments and comparisons rarely fit in a snippet; full pages are usually needed.
4. Plain facts may be answered by snippets alone.
5. When unsure, recommend scraping.

Decide whether the snippets suffice, which URLs to scrape (at most {max_urls}) if they do not, and whether the search strategy must be refined because the results are unhelpful.

Respond ONLY with a JSON object:
{
    "requirements": [{"aspect": "requirement", "sufficient": false, "reason": "why"}],
    "snippets_sufficient": false,
    "urls_to_scrape": ["url"],
    "refine_search": false,
    "reasoning": "short explanation"
}"#;

const HIGH_SCRUTINY_NOTE: &str = r#"

IMPORTANT: this query is subjective or needs detailed analysis. Snippets seldom carry the justification, comparison and context required, so keep a very high bar before calling them sufficient."#;

const SYNTHESIZE_TEMPLATE: &str = r#"You are a research analyst synthesizing information for a query.

QUERY: {query}

ANALYZED QUERY: {analysis}

INFORMATION CONTEXT:
{context}

{limitations}

{fallback_notice}

Synthesize the key findings. Only include facts supported by the sources above and cite them with their labels, e.g. [Web 3] or [News 1].
{subjective_guidance}
Respond ONLY with a JSON object:
{
    "key_topics": [
        {
            "topic": "topic name",
            "key_findings": ["finding with source reference [Web 1]"],
            "confidence": "high/medium/low",
            "supporting_evidence": "brief explanation"
        }
    ],
    "information_gaps": ["missing information"],
    "source_assessment": "quality and reliability of the sources",
    "recommendations": ["recommendation"],
    "confidence_summary": {"overall": "high/medium/low", "reasoning": "why"}
}"#;

const SUBJECTIVE_GUIDANCE: &str = r#"
This query involves subjective assessment of: {criteria}
For these elements, state a confidence level for each judgment, point out where sources disagree, explain the criteria you applied, and acknowledge the limits of any definitive statement.
"#;

const COMPILE_TEMPLATE: &str = r#"You are a professional research analyst writing a final report.

ORIGINAL QUERY: {query}

ANALYZED QUERY: {analysis}

SYNTHESIZED INFORMATION:
{synthesis}

{limitations}

Write a comprehensive report answering the original query. Use an objective tone and clear sections, give confidence levels, acknowledge gaps, offer recommendations where appropriate, include a short methodology section, and organize content by topic.

Format the report as Markdown. Start with a title and an introduction summarizing the query and approach."#;

/// Prompt templates for the research workflow
pub struct ResearchPrompts;

impl ResearchPrompts {
    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    pub fn analyze(query: &str, max_search_queries: usize) -> String {
        PromptBuilder::new(ANALYZE_TEMPLATE)
            .with("date", Self::current_date())
            .with("max_search_queries", max_search_queries.to_string())
            .with("query", query)
            .build()
    }

    pub fn plan(analysis_json: &str) -> String {
        PromptBuilder::new(PLAN_TEMPLATE)
            .with("analysis", analysis_json)
            .build()
    }

    pub fn evaluate(
        query: &str,
        analysis_json: &str,
        plan_json: &str,
        snippets_json: &str,
        max_urls: usize,
        high_scrutiny: bool,
    ) -> String {
        let mut prompt = PromptBuilder::new(EVALUATE_TEMPLATE)
            .with("query", query)
            .with("analysis", analysis_json)
            .with("plan", plan_json)
            .with("max_urls", max_urls.to_string())
            .with("snippets", snippets_json)
            .build();
        if high_scrutiny {
            prompt.push_str(HIGH_SCRUTINY_NOTE);
        }
        prompt
    }

    pub fn synthesize(
        query: &str,
        analysis_json: &str,
        context: &str,
        limitations: &str,
        fallback_notice: &str,
        subjective_criteria: &[String],
    ) -> String {
        let guidance = if subjective_criteria.is_empty() {
            String::new()
        } else {
            PromptBuilder::new(SUBJECTIVE_GUIDANCE)
                .with("criteria", subjective_criteria.join(", "))
                .build()
        };

        PromptBuilder::new(SYNTHESIZE_TEMPLATE)
            .with("query", query)
            .with("analysis", analysis_json)
            .with("limitations", limitations)
            .with("fallback_notice", fallback_notice)
            .with("subjective_guidance", guidance)
            .with("context", context)
            .build()
    }

    pub fn compile(query: &str, analysis_json: &str, synthesis_json: &str, limitations: &str) -> String {
        PromptBuilder::new(COMPILE_TEMPLATE)
            .with("query", query)
            .with("analysis", analysis_json)
            .with("limitations", limitations)
            .with("synthesis", synthesis_json)
            .build()
    }

    /// Instruction handed to the scraper for each page
    pub fn scrape_instruction(query: &str) -> String {
        format!("Extract key insights relevant to the query: {}", query)
    }
}

/// Prompt builder for dynamic template substitution
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute a placeholder with a value
    ///
    /// Placeholders are formatted as `{name}`. A later substitution also
    /// rewrites matching placeholders inside earlier values, so insert the
    /// largest free-text value last.
    pub fn with(mut self, name: &str, value: impl AsRef<str>) -> Self {
        let placeholder = format!("{{{}}}", name);
        self.template = self.template.replace(&placeholder, value.as_ref());
        self
    }

    pub fn build(self) -> String {
        self.template
    }
}
