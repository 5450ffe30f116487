use tracing::info;

use super::StageContext;
use crate::error::ResearchError;
use crate::research::state::{ResearchState, ResearchUpdate};

const TIME_SENSITIVE_DAYS_BACK: u32 = 3;
const DEFAULT_DAYS_BACK: u32 = 30;

/// Run up to `max_search_queries` web searches, concatenating results.
pub async fn execute_web_search(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    let queries: Vec<String> = state
        .effective_queries()
        .into_iter()
        .take(ctx.config.max_search_queries)
        .collect();

    info!(queries = queries.len(), "Executing web search");

    let mut web_results = Vec::new();
    for (i, query) in queries.iter().enumerate() {
        info!(index = i + 1, total = queries.len(), query = %query, "Web search");
        web_results.extend(ctx.web_search.search(query).await);
    }

    info!(
        results = web_results.len(),
        queries = queries.len(),
        "Web search complete"
    );

    Ok(ResearchUpdate {
        web_results,
        ..Default::default()
    })
}

/// Run a news search for every query; time-sensitive queries look back
/// three days, others thirty.
pub async fn execute_news_search(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    let time_sensitive = state
        .analyzed_query
        .as_ref()
        .map(|a| a.time_sensitive)
        .unwrap_or(false);
    let days_back = if time_sensitive {
        TIME_SENSITIVE_DAYS_BACK
    } else {
        DEFAULT_DAYS_BACK
    };

    let queries = state.effective_queries();
    info!(queries = queries.len(), days_back, "Executing news search");

    let mut news_results = Vec::new();
    for query in &queries {
        news_results.extend(ctx.news_search.search_news(query, days_back).await);
    }

    info!(results = news_results.len(), "News search complete");

    Ok(ResearchUpdate {
        news_results,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationLimits;
    use crate::research::stages::testing::*;
    use crate::research::state::AnalyzedQuery;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_web_search_caps_queries() {
        let web = FixedWeb {
            results: vec![web_result("https://a", "s")],
            ..Default::default()
        };
        let mut ctx = context_with(
            Arc::new(ScriptedLlm::default()),
            web,
            FixedNews::default(),
            MapScraper::default(),
        );
        ctx.config.max_search_queries = 2;

        let mut state = ResearchState::new("q", IterationLimits::default());
        state.search_queries = vec!["one".into(), "two".into(), "three".into()];

        let update = execute_web_search(&ctx, &state).await.unwrap();
        assert_eq!(update.web_results.len(), 2);
        assert!(update.news_results.is_empty());
    }

    #[tokio::test]
    async fn test_web_search_falls_back_to_original_query() {
        let web = Arc::new(FixedWeb::default());
        let ctx = StageContext {
            web_search: web.clone(),
            ..context(Arc::new(ScriptedLlm::default()))
        };
        let state = ResearchState::new("original", IterationLimits::default());

        execute_web_search(&ctx, &state).await.unwrap();
        assert_eq!(*web.queries.lock().unwrap(), vec!["original"]);
    }

    #[tokio::test]
    async fn test_news_days_back_follows_time_sensitivity() {
        let news = Arc::new(FixedNews {
            articles: vec![news_article("https://n")],
            ..Default::default()
        });
        let ctx = StageContext {
            news_search: news.clone(),
            ..context(Arc::new(ScriptedLlm::default()))
        };

        let mut state = ResearchState::new("q", IterationLimits::default());
        state.search_queries = vec!["a".into(), "b".into()];
        let update = execute_news_search(&ctx, &state).await.unwrap();
        assert_eq!(update.news_results.len(), 2);

        state.analyzed_query = Some(AnalyzedQuery {
            time_sensitive: true,
            ..AnalyzedQuery::fallback("q")
        });
        execute_news_search(&ctx, &state).await.unwrap();

        let calls = news.calls.lock().unwrap();
        assert_eq!(calls[0], ("a".to_string(), 30));
        assert_eq!(calls[1], ("b".to_string(), 30));
        assert_eq!(calls[2], ("a".to_string(), 3));
    }
}
