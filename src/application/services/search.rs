//! Search fan-out over the external search collaborator.
//!
//! Queries run one after another with a pause in between, results are
//! merged by URL and ranked against the query's classification.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::application::services::cache::TieredCache;
use crate::config::SearchSettings;
use crate::domain::{Classification, SearchResult};
use crate::infrastructure::traits::SearchProvider;

const RESULTS_PER_QUERY: usize = 6;
const OFFICIAL_SUFFIX: &str = ".go.jp";
const TITLE_WORDS: &[&str] = &[
    "application", "permit", "license", "procedure", "申請", "許可", "手続き",
];

pub struct SearchService {
    provider: Arc<dyn SearchProvider>,
    cache: Arc<TieredCache>,
    settings: SearchSettings,
    ttl_secs: u64,
}

impl SearchService {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        cache: Arc<TieredCache>,
        settings: SearchSettings,
        ttl_secs: u64,
    ) -> Self {
        Self {
            provider,
            cache,
            settings,
            ttl_secs,
        }
    }

    /// Ranked results for `query`. Never fails and never returns nothing:
    /// an empty aggregate becomes a single guidance placeholder.
    #[instrument(level = "debug", skip(self, classification))]
    pub fn search(&self, query: &str, classification: &Classification) -> Vec<SearchResult> {
        let key = format!("search:{query}");
        if let Some(cached) = self.cache.get::<Vec<SearchResult>>(&key) {
            debug!("cache hit for search '{query}'");
            return cached;
        }

        let mut queries: Vec<String> = classification
            .search_queries
            .iter()
            .take(self.settings.max_queries)
            .cloned()
            .collect();
        queries.push(format!("{query} site:go.jp"));

        let mut all = Vec::new();
        for (i, q) in queries.iter().enumerate() {
            if i > 0 && self.settings.delay_ms > 0 {
                thread::sleep(Duration::from_millis(self.settings.delay_ms));
            }
            match self.provider.search(q, RESULTS_PER_QUERY) {
                Ok(results) => {
                    debug!("'{q}': {} results", results.len());
                    all.extend(results);
                }
                Err(e) => warn!("search for '{q}' failed, treating as empty: {e}"),
            }
        }

        if all.is_empty() {
            debug!("no search results for '{query}', using placeholder");
            return vec![placeholder(query)];
        }

        let ranked: Vec<SearchResult> = rank(all, classification)
            .into_iter()
            .take(self.settings.max_results)
            .collect();
        if let Err(e) = self.cache.set(&key, &ranked, self.ttl_secs) {
            warn!("could not cache search results: {e}");
        }
        ranked
    }
}

/// Drop repeated URLs (first wins) and order by relevance, ties stable.
pub fn rank(results: Vec<SearchResult>, classification: &Classification) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut unique: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect();
    unique.sort_by_cached_key(|r| Reverse(relevance(r, classification)));
    unique
}

pub fn relevance(result: &SearchResult, classification: &Classification) -> u32 {
    let text = format!("{} {}", result.title, result.description).to_lowercase();
    let title = result.title.to_lowercase();

    let procedures = classification
        .related_procedures
        .iter()
        .filter(|p| text.contains(&p.to_lowercase()))
        .count() as u32;
    let keywords = classification
        .expanded_keywords
        .iter()
        .filter(|k| text.contains(&k.to_lowercase()))
        .count() as u32;

    let mut score = procedures * 10 + keywords * 5;
    if result.url.contains(OFFICIAL_SUFFIX) {
        score += 15;
    }
    if TITLE_WORDS.iter().any(|w| title.contains(w)) {
        score += 8;
    }
    score
}

fn placeholder(query: &str) -> SearchResult {
    SearchResult {
        title: format!("{query}: guide from the relevant ministry"),
        url: "https://www.e-gov.go.jp/".to_string(),
        description: format!(
            "Procedures related to {query}: required documents, application flow and fees."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classify;

    fn result(title: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: url.into(),
            description: String::new(),
        }
    }

    #[test]
    fn given_duplicates_when_ranking_then_official_permit_pages_first() {
        let c = classify("open a restaurant");
        let results = vec![
            result("Blog post", "https://blog.example.com/a"),
            result("Food business license application", "https://www.mhlw.go.jp/x"),
            result("Blog post again", "https://blog.example.com/a"),
        ];

        let ranked = rank(results, &c);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].url, "https://www.mhlw.go.jp/x");
    }
}
