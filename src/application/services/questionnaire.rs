//! Questionnaire sessions: query in, guided answers, procedures out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::error::ErrorCode;
use crate::application::services::generation::{GenerationService, TreeSource};
use crate::application::services::search::SearchService;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    classify, collect_all, is_likely_administrative, navigate, summarize, Answers, DomainError,
    Navigation, Node, Procedure, Source,
};

const QUERY_SUGGESTIONS: &[&str] = &[
    "Construction business license",
    "Restaurant business permit",
    "Liquor manufacturing license",
    "Company incorporation",
];

/// What the user sees next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Step {
    Question {
        question: String,
        key: String,
        options: Vec<String>,
        #[serde(rename = "allowMultiple", skip_serializing_if = "Option::is_none")]
        allow_multiple: Option<bool>,
        answered: usize,
    },
    Final {
        procedures: Vec<Procedure>,
        #[serde(rename = "relatedProcedures")]
        related_procedures: Vec<Procedure>,
        #[serde(rename = "allProcedures")]
        all_procedures: Vec<Procedure>,
    },
}

impl Step {
    pub fn is_final(&self) -> bool {
        matches!(self, Step::Final { .. })
    }
}

/// One user's walk through one tree. Owns its answers exclusively.
#[derive(Debug, Clone)]
pub struct Session {
    query: String,
    tree: Node,
    source: TreeSource,
    sources: Vec<Source>,
    answers: Answers,
    all_procedures: Vec<Procedure>,
}

impl Session {
    pub fn new(
        query: impl Into<String>,
        tree: Node,
        source: TreeSource,
        sources: Vec<Source>,
    ) -> Self {
        let all_procedures = collect_all(&tree);
        Self {
            query: query.into(),
            tree,
            source,
            sources,
            answers: Answers::new(),
            all_procedures,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn source(&self) -> &TreeSource {
        &self.source
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn all_procedures(&self) -> &[Procedure] {
        &self.all_procedures
    }

    pub fn current_step(&self) -> Step {
        match navigate(&self.tree, &self.answers) {
            Navigation::Question {
                question,
                key,
                options,
                allow_multiple,
            } => Step::Question {
                question,
                key,
                options,
                allow_multiple,
                answered: self.answers.len(),
            },
            Navigation::Final { procedures } => {
                let summary = summarize(&self.tree, &procedures, &self.all_procedures);
                Step::Final {
                    procedures: summary.procedures,
                    related_procedures: summary.related_procedures,
                    all_procedures: summary.all_procedures,
                }
            }
        }
    }

    /// Accept `option` for the current question and advance.
    ///
    /// Options outside the current question are rejected, so the answer
    /// map only ever holds answers that were actually offered.
    pub fn answer(&mut self, option: &str) -> ApplicationResult<Step> {
        let (key, options) = match self.current_step() {
            Step::Question { key, options, .. } => (key, options),
            Step::Final { .. } => {
                return Err(ApplicationError::invalid_request(
                    ErrorCode::InvalidAnswer,
                    "the questionnaire is already complete",
                ))
            }
        };

        if !options.iter().any(|o| o == option) {
            return Err(ApplicationError::InvalidRequest {
                code: ErrorCode::InvalidAnswer,
                message: format!("'{option}' is not an option for '{key}'"),
                suggestions: options,
            });
        }

        if !self.answers.record(key.as_str(), option) {
            warn!("question '{key}' asked again, replacing earlier answer");
            self.answers = std::mem::take(&mut self.answers).with(key.as_str(), option);
        }
        debug!("answered {key} = {option}");
        Ok(self.current_step())
    }
}

/// Starts sessions: validates the query, searches, generates.
pub struct QuestionnaireService {
    search: Arc<SearchService>,
    generation: Arc<GenerationService>,
}

impl QuestionnaireService {
    pub fn new(search: Arc<SearchService>, generation: Arc<GenerationService>) -> Self {
        Self { search, generation }
    }

    /// Reject queries that are empty or clearly not about procedures.
    pub fn validate_query(query: &str) -> ApplicationResult<&str> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::EmptyQuery.into());
        }
        if !is_likely_administrative(query) {
            return Err(ApplicationError::InvalidRequest {
                code: ErrorCode::InvalidQueryType,
                message: "only searches about administrative procedures are supported; \
                          name a procedure or a line of business"
                    .to_string(),
                suggestions: QUERY_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(query)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn start(&self, query: &str) -> ApplicationResult<Session> {
        let query = Self::validate_query(query)?;
        let classification = classify(query);

        let results = self.search.search(query, &classification);
        let generated = self
            .generation
            .generate_tree(query, &results, &classification)?;
        info!("session for '{query}' uses {} tree", generated.source);

        let sources = results.iter().map(Source::from).collect();
        Ok(Session::new(query, generated.tree, generated.source, sources))
    }
}
