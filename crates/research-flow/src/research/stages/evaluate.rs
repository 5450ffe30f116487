use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{to_prompt_json, StageContext};
use crate::error::ResearchError;
use crate::extract::extract_or;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{AnalyzedQuery, ErrorEntry, ResearchState, ResearchUpdate, Stage};

/// Lexical markers of subjective or comparative queries
const SUBJECTIVE_MARKERS: &[&str] = &[
    "best",
    "good",
    "great",
    "better",
    "worst",
    "minimal",
    "excellent",
    "quality",
    "experience",
    "reliable",
    "recommended",
    "should",
    "worth",
    "comparison",
];

/// `info_type` values that call for detailed analysis
const ANALYTIC_INFO_TYPES: &[&str] = &["opinion", "comparison", "analysis"];

/// Web and news hits in one shape for the evaluation prompt
#[derive(Debug, Serialize)]
struct Snippet<'a> {
    source: &'static str,
    title: &'a str,
    snippet: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Evaluation {
    snippets_sufficient: bool,
    urls_to_scrape: Vec<String>,
    refine_search: bool,
    reasoning: String,
}

impl Evaluation {
    /// Verdict used when the reply cannot be parsed: search again.
    fn unparseable() -> Self {
        Self {
            refine_search: true,
            ..Default::default()
        }
    }
}

/// Whether snippets should be distrusted for this query.
pub fn is_high_scrutiny(query: &str, analysis: Option<&AnalyzedQuery>) -> bool {
    let query = query.to_lowercase();
    let subjective = SUBJECTIVE_MARKERS.iter().any(|m| query.contains(m));

    let info_type = analysis
        .map(|a| a.info_type.to_lowercase())
        .unwrap_or_default();
    let analytic = ANALYTIC_INFO_TYPES.iter().any(|t| info_type.contains(t));

    subjective || analytic
}

fn collect_snippets(state: &ResearchState) -> Vec<Snippet<'_>> {
    let web = state.web_results.iter().map(|r| Snippet {
        source: "web",
        title: &r.title,
        snippet: &r.snippet,
        url: &r.url,
        date: None,
        publisher: None,
    });
    let news = state.news_results.iter().map(|a| Snippet {
        source: "news",
        title: &a.title,
        snippet: &a.summary,
        url: &a.url,
        date: Some(a.date.as_str()),
        publisher: Some(a.source.as_str()),
    });
    web.chain(news).collect()
}

fn first_urls(snippets: &[Snippet<'_>], count: usize) -> Vec<String> {
    snippets
        .iter()
        .filter(|s| !s.url.is_empty())
        .take(count)
        .map(|s| s.url.to_string())
        .collect()
}

/// Decide whether snippets suffice and which URLs to scrape.
pub async fn evaluate_results_and_select_urls(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    let config = &ctx.config;
    let snippets = collect_snippets(state);

    info!(snippets = snippets.len(), "Evaluating search results");

    if snippets.is_empty() {
        warn!("No search results to evaluate, refinement needed");
        return Ok(ResearchUpdate {
            next_node: Some(Stage::Plan),
            urls_to_scrape: Some(Vec::new()),
            ..Default::default()
        }
        .with_error(ErrorEntry::search("No search results found")));
    }

    let high_scrutiny = is_high_scrutiny(&state.original_query, state.analyzed_query.as_ref());

    let prompt = ResearchPrompts::evaluate(
        &state.original_query,
        &to_prompt_json(&state.analyzed_query),
        &to_prompt_json(&state.research_plan),
        &to_prompt_json(&snippets),
        config.max_urls_to_scrape,
        high_scrutiny,
    );
    let reply = ctx.generate(Stage::Evaluate, &prompt).await?;
    let evaluation: Evaluation = extract_or(&reply, Stage::Evaluate.name(), Evaluation::unparseable);

    info!(
        sufficient = evaluation.snippets_sufficient,
        urls = evaluation.urls_to_scrape.len(),
        refine = evaluation.refine_search,
        reasoning = %evaluation.reasoning,
        "Evaluation complete"
    );

    let mut sufficient = evaluation.snippets_sufficient;
    let mut urls: Vec<String> = evaluation
        .urls_to_scrape
        .into_iter()
        .filter(|u| !u.trim().is_empty())
        .collect();

    if high_scrutiny && sufficient && urls.is_empty() {
        let substantive = snippets
            .iter()
            .filter(|s| s.snippet.chars().count() > config.substantive_snippet_chars)
            .count();
        if substantive < config.min_substantive_snippets {
            warn!(
                substantive,
                "Subjective query marked sufficient without substantial evidence, scraping instead"
            );
            sufficient = false;
            urls = first_urls(&snippets, config.fallback_scrape_count);
        }
    }

    let next_node = if evaluation.refine_search {
        info!("Search refinement needed");
        Stage::Plan
    } else if sufficient {
        info!("Snippets are sufficient, proceeding to synthesis");
        Stage::Synthesize
    } else if !urls.is_empty() {
        Stage::Scrape
    } else {
        warn!("Snippets insufficient but no URLs selected, selecting some automatically");
        urls = first_urls(&snippets, config.fallback_scrape_count);
        if urls.is_empty() {
            warn!("No URLs available, defaulting to synthesis");
            Stage::Synthesize
        } else {
            Stage::Scrape
        }
    };

    urls.truncate(config.max_urls_to_scrape);
    info!(next = %next_node, urls = urls.len(), "Evaluation routed");

    Ok(ResearchUpdate {
        next_node: Some(next_node),
        urls_to_scrape: Some(urls),
        ..Default::default()
    })
}
