use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::{to_prompt_json, StageContext};
use crate::error::ResearchError;
use crate::extract::extract_object;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{
    AnalyzedQuery, ConfidenceSummary, KeyTopic, ResearchState, ResearchUpdate, Stage, Synthesis,
};

/// Web or news hit count that counts as substantial evidence without scraping
const SUBSTANTIAL_RESULT_COUNT: usize = 5;

const FALLBACK_NOTICE: &str = "NOTE: This synthesis is being performed with limited information after exhausting search attempts. The results may be incomplete or less reliable.";

fn truncate_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Render the labelled evidence bundle handed to the backend.
fn build_context(state: &ResearchState, scraped_cap: usize) -> String {
    let mut lines = Vec::new();

    if !state.web_results.is_empty() {
        lines.push("WEB SEARCH RESULTS:".to_string());
        for (i, result) in state.web_results.iter().enumerate() {
            lines.push(format!("[Web {}] Title: {}", i + 1, result.title));
            lines.push(format!("    URL: {}", result.url));
            lines.push(format!("    Snippet: {}", result.snippet));
            lines.push(String::new());
        }
    }

    if !state.news_results.is_empty() {
        lines.push("NEWS SEARCH RESULTS:".to_string());
        for (i, article) in state.news_results.iter().enumerate() {
            lines.push(format!("[News {}] Title: {}", i + 1, article.title));
            lines.push(format!("    URL: {}", article.url));
            lines.push(format!("    Date: {}", article.date));
            lines.push(format!("    Source: {}", article.source));
            lines.push(format!("    Summary: {}", article.summary));
            lines.push(String::new());
        }
    }

    if !state.scraped_content.is_empty() {
        lines.push("SCRAPED WEB CONTENT:".to_string());
        for (i, (url, content)) in state.scraped_content.iter().enumerate() {
            lines.push(format!("[Scraped {}] URL: {}", i + 1, url));
            lines.push(format!("Content: {}", truncate_chars(content, scraped_cap)));
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn limitation_warnings(state: &ResearchState, analysis: &AnalyzedQuery) -> Vec<String> {
    let has_scraped = !state.scraped_content.is_empty();
    let has_substantial = has_scraped
        || state.web_results.len() >= SUBSTANTIAL_RESULT_COUNT
        || state.news_results.len() >= SUBSTANTIAL_RESULT_COUNT;

    let mut warnings = Vec::new();
    if analysis.requires_web_scraping && !has_scraped {
        warnings.push(
            "WARNING: This query required in-depth content analysis, but no full web content was available."
                .to_string(),
        );
    }
    if !analysis.subjective_criteria.is_empty() && !has_scraped {
        warnings.push(format!(
            "WARNING: This query involves subjective assessment of [{}], which typically requires detailed content analysis.",
            analysis.subjective_criteria.join(", ")
        ));
    }
    if analysis.is_high_depth() && !has_substantial {
        warnings.push(
            "WARNING: This query requires high-depth information, but the available data may be insufficient."
                .to_string(),
        );
    }
    warnings
}

fn no_data_synthesis(query: &str) -> Synthesis {
    Synthesis {
        key_topics: vec![KeyTopic {
            topic: query.to_string(),
            key_findings: vec!["No relevant information found after exhaustive search.".to_string()],
            confidence: "low".to_string(),
            supporting_evidence: String::new(),
        }],
        information_gaps: vec!["No search results or page content were available.".to_string()],
        source_assessment: "No sources were available.".to_string(),
        recommendations: Vec::new(),
        confidence_summary: ConfidenceSummary {
            overall: "low".to_string(),
            reasoning: "No information was available to synthesize.".to_string(),
        },
    }
}

fn failed_synthesis(query: &str, reason: &str) -> Synthesis {
    Synthesis {
        key_topics: vec![KeyTopic {
            topic: query.to_string(),
            key_findings: vec!["Error synthesizing information.".to_string()],
            confidence: "low".to_string(),
            supporting_evidence: "Processing error occurred during synthesis.".to_string(),
        }],
        information_gaps: vec!["Complete synthesis unavailable due to processing error.".to_string()],
        source_assessment: "Unable to assess sources due to processing error.".to_string(),
        recommendations: Vec::new(),
        confidence_summary: ConfidenceSummary {
            overall: "low".to_string(),
            reasoning: format!("Error during information processing: {}", reason),
        },
    }
}

/// Take `key` from the reply, or `None` if it is absent or mistyped.
fn field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = key, error = %e, "Synthesis field has unexpected shape");
            None
        }
    }
}

/// Build a complete synthesis, backfilling every missing field.
fn backfill(query: &str, mut map: Map<String, Value>) -> Synthesis {
    let confidence_summary = match map.remove("confidence_summary") {
        None => ConfidenceSummary {
            overall: "low".to_string(),
            reasoning: "Confidence assessment unavailable due to data formatting issues.".to_string(),
        },
        Some(Value::Object(summary)) => ConfidenceSummary {
            overall: summary
                .get("overall")
                .and_then(Value::as_str)
                .unwrap_or("low")
                .to_string(),
            reasoning: summary
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        Some(other) => ConfidenceSummary {
            overall: "low".to_string(),
            reasoning: format!("Original confidence data was malformed: {}", other),
        },
    };

    Synthesis {
        key_topics: field(&mut map, "key_topics").unwrap_or_else(|| {
            vec![KeyTopic {
                topic: query.to_string(),
                key_findings: vec!["Information extracted but not properly formatted.".to_string()],
                confidence: "low".to_string(),
                supporting_evidence: "Data structure error in synthesis process.".to_string(),
            }]
        }),
        information_gaps: field(&mut map, "information_gaps").unwrap_or_else(|| {
            vec!["Information gaps not identified due to formatting issues.".to_string()]
        }),
        source_assessment: field(&mut map, "source_assessment").unwrap_or_else(|| {
            "Source assessment unavailable due to data formatting issues.".to_string()
        }),
        recommendations: field(&mut map, "recommendations").unwrap_or_default(),
        confidence_summary,
    }
}

/// Synthesize the gathered evidence into one structured record.
pub async fn extract_and_synthesize_information(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    let query = &state.original_query;
    info!("Synthesizing information");

    if state.web_results.is_empty() && state.news_results.is_empty() && state.scraped_content.is_empty() {
        warn!("No information available to synthesize");
        return Ok(ResearchUpdate {
            synthesized_information: vec![no_data_synthesis(query)],
            ..Default::default()
        });
    }

    let analysis = state
        .analyzed_query
        .clone()
        .unwrap_or_else(|| AnalyzedQuery::fallback(query));
    let is_fallback = state.reached_max_research();
    if is_fallback {
        warn!("Synthesizing with limited information after exhausting search iterations");
    }
    if (analysis.is_high_depth() || !analysis.subjective_criteria.is_empty())
        && state.scraped_content.is_empty()
        && !is_fallback
    {
        warn!("Query needs depth or subjective judgement but no scraped content is available");
    }

    let prompt = ResearchPrompts::synthesize(
        query,
        &to_prompt_json(&analysis),
        &build_context(state, ctx.config.scraped_content_cap),
        &limitation_warnings(state, &analysis).join("\n"),
        if is_fallback { FALLBACK_NOTICE } else { "" },
        &analysis.subjective_criteria,
    );
    let reply = ctx.generate(Stage::Synthesize, &prompt).await?;

    let synthesis = match extract_object(&reply) {
        Ok(map) => {
            info!("Information synthesis complete");
            backfill(query, map)
        }
        Err(e) => {
            error!(error = %e, "Failed to parse synthesis reply");
            failed_synthesis(query, &e.to_string())
        }
    };

    Ok(ResearchUpdate {
        synthesized_information: vec![synthesis],
        ..Default::default()
    })
}
