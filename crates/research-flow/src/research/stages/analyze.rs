use tracing::info;

use super::StageContext;
use crate::error::ResearchError;
use crate::extract::extract_or;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{
    AnalyzedQuery, IterationCounters, ResearchState, ResearchUpdate, Stage,
};

/// Break the query into topic, intent, depth and search queries, and
/// initialize the iteration counters for the run.
pub async fn analyze_query(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    let query = state.original_query.as_str();
    info!(query = %query, "Analyzing query");

    let prompt = ResearchPrompts::analyze(query, ctx.config.max_search_queries);
    let reply = ctx.generate(Stage::Analyze, &prompt).await?;

    let mut analysis: AnalyzedQuery =
        extract_or(&reply, Stage::Analyze.name(), || AnalyzedQuery::fallback(query));
    analysis.search_queries.retain(|q| !q.trim().is_empty());

    let search_queries = if analysis.search_queries.is_empty() {
        vec![query.to_string()]
    } else {
        analysis.search_queries.clone()
    };

    info!(
        main_topic = %analysis.main_topic,
        info_type = %analysis.info_type,
        depth = %analysis.depth_required,
        queries = search_queries.len(),
        "Query analysis complete"
    );

    Ok(ResearchUpdate {
        analyzed_query: Some(analysis),
        search_queries: Some(search_queries),
        iteration_count: Some(IterationCounters::default()),
        max_iterations: Some(ctx.config.max_iterations),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationLimits;
    use crate::research::stages::testing::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_analyze_parses_reply() {
        let reply = r#"```json
        {
            "main_topic": "laptops",
            "specific_request": "best laptop for rust development",
            "info_type": "comparison",
            "time_sensitive": false,
            "key_entities": ["laptop", "rust"],
            "subjective_criteria": ["best"],
            "depth_required": "high",
            "regional_context": null,
            "search_queries": ["rust dev laptop review", "compile speed laptops", ""],
            "requires_web_scraping": true
        }
        ```"#;
        let llm = Arc::new(ScriptedLlm::new([reply]));
        let ctx = context(llm.clone());
        let state = ResearchState::new("best laptop for rust", IterationLimits::default());

        let update = analyze_query(&ctx, &state).await.unwrap();
        let analysis = update.analyzed_query.unwrap();

        assert_eq!(analysis.info_type, "comparison");
        assert!(analysis.is_high_depth());
        assert_eq!(
            update.search_queries.unwrap(),
            vec!["rust dev laptop review", "compile speed laptops"]
        );
        assert_eq!(update.iteration_count, Some(IterationCounters::default()));
        assert_eq!(update.max_iterations, Some(ctx.config.max_iterations));
        assert!(update.error_log.is_empty());
        assert!(llm.prompts.lock().unwrap()[0].contains("best laptop for rust"));
    }

    #[tokio::test]
    async fn test_analyze_fallback_on_garbage() {
        let llm = Arc::new(ScriptedLlm::new(["I cannot help with that."]));
        let ctx = context(llm);
        let state = ResearchState::new("solid state batteries", IterationLimits::default());

        let update = analyze_query(&ctx, &state).await.unwrap();
        assert_eq!(
            update.analyzed_query,
            Some(AnalyzedQuery::fallback("solid state batteries"))
        );
        assert_eq!(update.search_queries.unwrap(), vec!["solid state batteries"]);
    }

    #[tokio::test]
    async fn test_analyze_empty_query_list_uses_original() {
        let llm = Arc::new(ScriptedLlm::new([r#"{"main_topic": "x", "search_queries": []}"#]));
        let ctx = context(llm);
        let state = ResearchState::new("x", IterationLimits::default());

        let update = analyze_query(&ctx, &state).await.unwrap();
        assert_eq!(update.search_queries.unwrap(), vec!["x"]);
    }
}
