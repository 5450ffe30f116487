use std::collections::BTreeMap;
use tracing::{error, info, warn};

use super::StageContext;
use crate::error::ResearchError;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{ErrorEntry, ResearchState, ResearchUpdate};
use crate::tools::ScrapeError;

/// Scrape each selected URL in order; one URL failing never stops the rest.
pub async fn scrape_websites(ctx: &StageContext, state: &ResearchState) -> Result<ResearchUpdate, ResearchError> {
    let urls = &state.urls_to_scrape;
    info!(urls = urls.len(), "Scraping websites");

    let mut update = ResearchUpdate::default();
    if urls.is_empty() {
        return Ok(update);
    }

    let session = match ctx.scraper.session().await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to start scraping session");
            return Ok(update.with_error(ErrorEntry::scrape(None, e.to_string())));
        }
    };

    let instruction = ResearchPrompts::scrape_instruction(&state.original_query);
    let mut scraped = BTreeMap::new();

    for url in urls {
        info!(url = %url, "Scraping");
        let outcome = session
            .scrape(url, &instruction)
            .await
            .and_then(|page| page.into_content().ok_or(ScrapeError::EmptyContent));

        match outcome {
            Ok(content) => {
                info!(url = %url, chars = content.len(), "Scraped page");
                scraped.insert(url.clone(), content);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Scrape failed");
                update.error_log.push(ErrorEntry::scrape(Some(url.as_str()), e.to_string()));
            }
        }
    }

    update.scraped_content = scraped;
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationLimits;
    use crate::research::stages::testing::*;
    use crate::research::state::ErrorKind;
    use crate::tools::ScrapedPage;
    use std::sync::Arc;

    fn page(text: &str) -> Result<ScrapedPage, ScrapeError> {
        Ok(ScrapedPage {
            extracted: None,
            text: Some(text.to_string()),
        })
    }

    fn state_for(urls: &[&str]) -> ResearchState {
        let mut state = ResearchState::new("rust", IterationLimits::default());
        state.urls_to_scrape = urls.iter().map(|u| u.to_string()).collect();
        state
    }

    fn ctx_with(scraper: MapScraper) -> StageContext {
        context_with(
            Arc::new(ScriptedLlm::default()),
            FixedWeb::default(),
            FixedNews::default(),
            scraper,
        )
    }

    #[tokio::test]
    async fn test_middle_failure_does_not_stop_loop() {
        let mut scraper = MapScraper::default();
        scraper.pages.insert("https://a".into(), page("alpha"));
        scraper.pages.insert("https://b".into(), Err(ScrapeError::Status(503)));
        scraper.pages.insert("https://c".into(), page("gamma"));
        let attempts = scraper.attempts.clone();

        let ctx = ctx_with(scraper);
        let update = scrape_websites(&ctx, &state_for(&["https://a", "https://b", "https://c"]))
            .await
            .unwrap();

        assert_eq!(*attempts.lock().unwrap(), vec!["https://a", "https://b", "https://c"]);
        assert_eq!(update.scraped_content.len(), 2);
        assert_eq!(update.scraped_content["https://a"], "alpha");
        assert_eq!(update.scraped_content["https://c"], "gamma");
        assert_eq!(update.error_log.len(), 1);
        assert_eq!(update.error_log[0].kind, ErrorKind::ScrapeError);
        assert_eq!(update.error_log[0].url.as_deref(), Some("https://b"));
    }

    #[tokio::test]
    async fn test_extracted_content_preferred() {
        let mut scraper = MapScraper::default();
        scraper.pages.insert(
            "https://a".into(),
            Ok(ScrapedPage {
                extracted: Some("insights".into()),
                text: Some("raw".into()),
            }),
        );
        let update = scrape_websites(&ctx_with(scraper), &state_for(&["https://a"]))
            .await
            .unwrap();
        assert_eq!(update.scraped_content["https://a"], "insights");
    }

    #[tokio::test]
    async fn test_empty_page_recorded() {
        let mut scraper = MapScraper::default();
        scraper.pages.insert("https://a".into(), Ok(ScrapedPage::default()));
        let update = scrape_websites(&ctx_with(scraper), &state_for(&["https://a"]))
            .await
            .unwrap();
        assert!(update.scraped_content.is_empty());
        assert_eq!(update.error_log[0].message, "Failed to extract content");
    }

    #[tokio::test]
    async fn test_unavailable_scraper_logs_one_error() {
        let scraper = MapScraper {
            unavailable: true,
            ..Default::default()
        };
        let attempts = scraper.attempts.clone();
        let update = scrape_websites(&ctx_with(scraper), &state_for(&["https://a", "https://b"]))
            .await
            .unwrap();
        assert!(attempts.lock().unwrap().is_empty());
        assert_eq!(update.error_log.len(), 1);
        assert_eq!(update.error_log[0].url, None);
    }

    #[tokio::test]
    async fn test_no_urls_is_noop() {
        let update = scrape_websites(&ctx_with(MapScraper::default()), &state_for(&[]))
            .await
            .unwrap();
        assert!(update.scraped_content.is_empty());
        assert!(update.error_log.is_empty());
    }
}
