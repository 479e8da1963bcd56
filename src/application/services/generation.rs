//! Generation orchestrator.
//!
//! Tries each strategy once, most detailed first. An attempt succeeds when
//! the response contains an object that passes the static structure check;
//! anything else moves on to the next strategy. When all are spent the
//! deterministic synthetic tree is returned, so a caller always gets a tree.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::application::services::cache::TieredCache;
use crate::application::ApplicationResult;
use crate::domain::synthetic::synthetic_tree_for;
use crate::domain::{
    parse_payload, validate_and_fix, validate_structure, Classification, DomainError,
    DomainResult, Node, SearchResult,
};
use crate::infrastructure::traits::{GenerationBudget, TextGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDetail {
    /// Full context: classification, search results, deep structure.
    Rich,
    /// Result titles only, shallower tree.
    Simplified,
    /// Query and shape rules, nothing else.
    Minimal,
}

/// One generation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: &'static str,
    pub budget: GenerationBudget,
    pub detail: PromptDetail,
}

pub const RICH: Strategy = Strategy {
    name: "rich",
    budget: GenerationBudget {
        max_output_tokens: 8192,
        temperature: 0.7,
    },
    detail: PromptDetail::Rich,
};

pub const SIMPLIFIED: Strategy = Strategy {
    name: "simplified",
    budget: GenerationBudget {
        max_output_tokens: 4096,
        temperature: 0.4,
    },
    detail: PromptDetail::Simplified,
};

pub const MINIMAL: Strategy = Strategy {
    name: "minimal",
    budget: GenerationBudget {
        max_output_tokens: 2048,
        temperature: 0.1,
    },
    detail: PromptDetail::Minimal,
};

impl Strategy {
    pub fn named(name: &str) -> DomainResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "rich" => Ok(RICH),
            "simplified" => Ok(SIMPLIFIED),
            "minimal" => Ok(MINIMAL),
            other => Err(DomainError::UnknownStrategy(other.to_string())),
        }
    }

    /// Resolve an ordered list of names, rejecting unknown ones.
    pub fn resolve(names: &[String]) -> DomainResult<Vec<Self>> {
        names.iter().map(|n| Self::named(n)).collect()
    }

    pub fn build_prompt(
        &self,
        query: &str,
        classification: &Classification,
        results: &[SearchResult],
    ) -> String {
        match self.detail {
            PromptDetail::Rich => rich_prompt(query, classification, results),
            PromptDetail::Simplified => simplified_prompt(query, classification, results),
            PromptDetail::Minimal => minimal_prompt(query),
        }
    }
}

pub fn default_strategies() -> Vec<Strategy> {
    vec![RICH, SIMPLIFIED, MINIMAL]
}

const SHAPE_RULES: &str = r#"Answer with one JSON object and nothing else.
A question node is {"question": "...", "key": "...", "options": ["..."], "children": [...]}.
A result node is {"procedureList": [{"procedure_id": "...", "name": "...", "jurisdiction": "...", "url": "...", "requirements": "...", "deadline": "...", "fee": "..."}]}.
Every question node needs exactly as many children as options: option i leads to child i.
Keys must not repeat along any path from the root."#;

fn rich_prompt(query: &str, c: &Classification, results: &[SearchResult]) -> String {
    let results_json = serde_json::to_string_pretty(results).unwrap_or_default();
    format!(
        "You are an expert on Japanese administrative procedures.\n\
         Build a questionnaire tree that identifies every procedure the user needs.\n\n\
         Query: {query}\n\
         Industry: {}\n\
         Related procedures: {}\n\
         Subcategories: {}\n\
         Keywords: {}\n\n\
         Ask concrete questions with 3 to 5 options each, in plain language, at least 3 levels deep.\n\
         Every related procedure must appear in some leaf.\n\n\
         Search results:\n{results_json}\n\n{SHAPE_RULES}",
        c.industry,
        c.related_procedures.join(", "),
        c.subcategories.join(", "),
        c.expanded_keywords.join(", "),
    )
}

fn simplified_prompt(query: &str, c: &Classification, results: &[SearchResult]) -> String {
    let sources: Vec<String> = results
        .iter()
        .take(5)
        .map(|r| format!("- {} ({})", r.title, r.url))
        .collect();
    format!(
        "Build a short questionnaire tree (2 levels, 2 to 3 options each) for the \
         government procedures needed for: {query}\n\
         Industry: {}\n\
         Related procedures: {}\n\
         Sources:\n{}\n\n{SHAPE_RULES}",
        c.industry,
        c.related_procedures.join(", "),
        sources.join("\n"),
    )
}

fn minimal_prompt(query: &str) -> String {
    format!(
        "List the government procedures needed for: {query}\n\
         Use one question with 2 options, each leading to a result node.\n\n{SHAPE_RULES}"
    )
}

/// Where a returned tree came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "strategy", rename_all = "lowercase")]
pub enum TreeSource {
    Cache,
    Generated(String),
    Synthetic,
}

impl fmt::Display for TreeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeSource::Cache => write!(f, "cache"),
            TreeSource::Generated(name) => write!(f, "generated ({name})"),
            TreeSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTree {
    pub tree: Node,
    pub source: TreeSource,
}

/// Cache key over the query and the exact search context.
pub fn tree_cache_key(query: &str, results: &[SearchResult]) -> String {
    let context = serde_json::to_vec(results).unwrap_or_default();
    format!("tree:{query}:{}", hex::encode(Sha256::digest(&context)))
}

pub struct GenerationService {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<TieredCache>,
    strategies: Vec<Strategy>,
    ttl_secs: u64,
}

impl GenerationService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        cache: Arc<TieredCache>,
        strategies: Vec<Strategy>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            generator,
            cache,
            strategies,
            ttl_secs,
        }
    }

    /// A structurally valid tree for `query` in `results`' context.
    ///
    /// Only a cache fault surfaces as an error; generation failures end in
    /// the synthetic tree.
    #[instrument(level = "debug", skip(self, results, classification), fields(results = results.len()))]
    pub fn generate_tree(
        &self,
        query: &str,
        results: &[SearchResult],
        classification: &Classification,
    ) -> ApplicationResult<GeneratedTree> {
        let key = tree_cache_key(query, results);
        if let Some(tree) = self.cache.get::<Node>(&key) {
            debug!("cache hit for tree '{query}'");
            return Ok(GeneratedTree {
                tree,
                source: TreeSource::Cache,
            });
        }

        for strategy in &self.strategies {
            match self.attempt(strategy, query, results, classification) {
                Ok(tree) => {
                    info!("strategy '{}' produced a valid tree", strategy.name);
                    self.cache.set(&key, &tree, self.ttl_secs)?;
                    return Ok(GeneratedTree {
                        tree,
                        source: TreeSource::Generated(strategy.name.to_string()),
                    });
                }
                Err(reason) => warn!("strategy '{}' failed: {reason}", strategy.name),
            }
        }

        warn!("all {} strategies failed, using synthetic tree", self.strategies.len());
        Ok(GeneratedTree {
            tree: synthetic_tree_for(classification),
            source: TreeSource::Synthetic,
        })
    }

    fn attempt(
        &self,
        strategy: &Strategy,
        query: &str,
        results: &[SearchResult],
        classification: &Classification,
    ) -> Result<Node, String> {
        let prompt = strategy.build_prompt(query, classification, results);
        debug!("strategy '{}': prompt of {} chars", strategy.name, prompt.len());

        let text = self
            .generator
            .generate(&prompt, &strategy.budget)
            .map_err(|e| format!("generator call failed: {e}"))?;
        let raw = parse_payload(&text).map_err(|e| e.to_string())?;

        let report = validate_structure(&raw);
        if !report.is_valid {
            return Err(format!(
                "{} structural errors, first: {}",
                report.errors.len(),
                report.errors.first().map(String::as_str).unwrap_or_default()
            ));
        }
        for warning in &report.warnings {
            debug!("{warning}");
        }

        let outcome = validate_and_fix(&raw);
        if !outcome.fixes.is_empty() {
            warn!(
                "strategy '{}': applied {} fixes to accepted tree",
                strategy.name,
                outcome.fixes.len()
            );
        }
        Ok(outcome.tree)
    }
}
