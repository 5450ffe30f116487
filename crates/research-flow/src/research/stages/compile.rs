use tracing::{info, warn};

use super::{to_prompt_json, StageContext};
use crate::error::ResearchError;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{AnalyzedQuery, ResearchState, ResearchUpdate, Stage};

/// Fixed header placed above the generated report.
pub fn report_header(query: &str) -> String {
    format!("RESEARCH REPORT\nQuery: {}\n{}\n\n", query, "=".repeat(50))
}

fn limitation_flags(state: &ResearchState) -> Vec<&'static str> {
    let default_analysis = AnalyzedQuery::default();
    let analysis = state.analyzed_query.as_ref().unwrap_or(&default_analysis);

    let mut flags = Vec::new();
    if state.reached_max_research() {
        flags.push("Research was limited by maximum iteration constraints");
    }
    let needs_depth = analysis.is_high_depth()
        || !analysis.subjective_criteria.is_empty()
        || analysis.requires_web_scraping;
    if needs_depth && state.scraped_content.is_empty() {
        flags.push("Research depth may be insufficient for this type of query");
    }
    flags
}

fn limitations_notice(flags: &[&str]) -> String {
    if flags.is_empty() {
        return String::new();
    }
    format!(
        "IMPORTANT RESEARCH LIMITATIONS:\n- {}\n\nPlease clearly acknowledge these limitations in your report.",
        flags.join("\n- ")
    )
}

/// Write the final report from the first synthesis record.
pub async fn compile_final_report(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    info!("Compiling final report");

    let flags = limitation_flags(state);
    if !flags.is_empty() {
        warn!(?flags, "Report carries research limitations");
    }

    let synthesis = state
        .synthesized_information
        .first()
        .map(to_prompt_json)
        .unwrap_or_else(|| "{}".to_string());

    let prompt = ResearchPrompts::compile(
        &state.original_query,
        &to_prompt_json(&state.analyzed_query),
        &synthesis,
        &limitations_notice(&flags),
    );
    let body = ctx.generate(Stage::Compile, &prompt).await?;

    Ok(ResearchUpdate {
        final_report: Some(format!("{}{}", report_header(&state.original_query), body)),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationLimits;
    use crate::research::stages::testing::*;
    use std::sync::Arc;

    #[test]
    fn test_report_header() {
        assert_eq!(
            report_header("q"),
            format!("RESEARCH REPORT\nQuery: q\n{}\n\n", "=".repeat(50))
        );
    }

    #[test]
    fn test_limitations_notice_format() {
        assert_eq!(limitations_notice(&[]), "");
        assert_eq!(
            limitations_notice(&["a", "b"]),
            "IMPORTANT RESEARCH LIMITATIONS:\n- a\n- b\n\nPlease clearly acknowledge these limitations in your report."
        );
    }

    #[test]
    fn test_limitation_flags() {
        let mut state = ResearchState::new("q", IterationLimits::default());
        assert!(limitation_flags(&state).is_empty());

        state.analyzed_query = Some(AnalyzedQuery {
            requires_web_scraping: true,
            ..Default::default()
        });
        state.iteration_count.total_research = 8;
        assert_eq!(limitation_flags(&state).len(), 2);

        state.scraped_content.insert("https://a".into(), "x".into());
        assert_eq!(
            limitation_flags(&state),
            vec!["Research was limited by maximum iteration constraints"]
        );
    }

    #[tokio::test]
    async fn test_report_prefixed_with_header() {
        let llm = Arc::new(ScriptedLlm::new(["# Findings\nTokio wins."]));
        let ctx = context(llm.clone());
        let mut state = ResearchState::new("rust runtimes", IterationLimits::default());
        state.iteration_count.total_research = 8;

        let update = compile_final_report(&ctx, &state).await.unwrap();
        let report = update.final_report.unwrap();
        assert!(report.starts_with("RESEARCH REPORT\nQuery: rust runtimes\n====="));
        assert!(report.ends_with("# Findings\nTokio wins."));

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("IMPORTANT RESEARCH LIMITATIONS:"));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let ctx = context(Arc::new(ScriptedLlm::failing("down")));
        let state = ResearchState::new("q", IterationLimits::default());
        assert!(compile_final_report(&ctx, &state).await.is_err());
    }
}
