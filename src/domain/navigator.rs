//! Stateless navigation through a questionnaire tree.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::entities::{Answers, Node, Procedure, QuestionNode};

/// Where an answer map leads within a tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Navigation {
    /// The next question to put to the user.
    Question {
        question: String,
        key: String,
        options: Vec<String>,
        #[serde(rename = "allowMultiple", skip_serializing_if = "Option::is_none")]
        allow_multiple: Option<bool>,
    },
    /// A leaf was reached.
    Final { procedures: Vec<Procedure> },
}

impl Navigation {
    pub fn is_final(&self) -> bool {
        matches!(self, Navigation::Final { .. })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Navigation::Question { key, .. } => Some(key),
            Navigation::Final { .. } => None,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            Navigation::Question { options, .. } => options,
            Navigation::Final { .. } => &[],
        }
    }
}

/// Follow `answers` from the root until an unanswered question or a leaf.
///
/// Never fails. An answer that matches none of the navigable options
/// re-issues the question it belongs to. A question whose option and
/// child counts disagree is navigated over the common prefix only, leaving
/// the tree untouched.
#[instrument(level = "debug", skip_all, fields(answers = answers.len()))]
pub fn navigate(tree: &Node, answers: &Answers) -> Navigation {
    let mut node = tree;
    let mut depth = 0usize;

    loop {
        let q = match node {
            Node::Result(result) => {
                debug!(depth, "reached {} procedures", result.procedure_list.len());
                return Navigation::Final {
                    procedures: result.procedure_list.clone(),
                };
            }
            Node::Question(q) => q,
        };

        let Some(answer) = answers.get(&q.key) else {
            debug!(depth, key = %q.key, "unanswered");
            return ask(q, &q.options);
        };

        let usable = q.options.len().min(q.children.len());
        if q.options.len() != q.children.len() {
            warn!(
                depth,
                key = %q.key,
                "options count ({}) != children count ({}), navigating first {usable}",
                q.options.len(),
                q.children.len()
            );
        }
        if usable == 0 {
            warn!(depth, key = %q.key, "question has no navigable children");
            return ask(q, &q.options);
        }

        let options = &q.options[..usable];
        let Some(index) = options.iter().position(|o| o == answer) else {
            warn!(depth, key = %q.key, answer, "answer matches no option, asking again");
            return ask(q, options);
        };

        node = &q.children[index];
        depth += 1;
    }
}

fn ask(q: &QuestionNode, options: &[String]) -> Navigation {
    Navigation::Question {
        question: q.question.clone(),
        key: q.key.clone(),
        options: options.to_vec(),
        allow_multiple: q.allow_multiple,
    }
}
