//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One government procedure record.
///
/// `procedure_id` is opaque; it is the identity used for deduplication
/// within a tree. The optional fields are free text and never validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub procedure_id: String,
    pub name: String,
    pub jurisdiction: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
}

impl Procedure {
    pub fn new(
        procedure_id: impl Into<String>,
        name: impl Into<String>,
        jurisdiction: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            procedure_id: procedure_id.into(),
            name: name.into(),
            jurisdiction: jurisdiction.into(),
            url: url.into(),
            requirements: None,
            deadline: None,
            fee: None,
        }
    }
}

/// A branching question. Option `i` leads to `children[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionNode {
    pub question: String,
    pub key: String,
    pub options: Vec<String>,
    pub children: Vec<Node>,
    /// Carried through for presentation only; navigation is single-answer.
    #[serde(
        rename = "allowMultiple",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allow_multiple: Option<bool>,
}

impl QuestionNode {
    pub fn new(
        question: impl Into<String>,
        key: impl Into<String>,
        options: Vec<String>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            question: question.into(),
            key: key.into(),
            options,
            children,
            allow_multiple: None,
        }
    }
}

/// A terminal list of procedures. An empty list is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultNode {
    #[serde(rename = "procedureList")]
    pub procedure_list: Vec<Procedure>,
}

/// Questionnaire tree node: exactly one of the two shapes.
///
/// The `procedureList` marker disambiguates on the wire; it is tried first,
/// so an object carrying both markers reads as a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Result(ResultNode),
    Question(QuestionNode),
}

impl Node {
    pub fn result(procedures: Vec<Procedure>) -> Self {
        Node::Result(ResultNode {
            procedure_list: procedures,
        })
    }

    /// Empty result used wherever a child has to be synthesized.
    pub fn fallback() -> Self {
        Node::Result(ResultNode::default())
    }

    pub fn question(
        question: impl Into<String>,
        key: impl Into<String>,
        options: Vec<String>,
        children: Vec<Node>,
    ) -> Self {
        Node::Question(QuestionNode::new(question, key, options, children))
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Node::Result(_))
    }

    pub fn as_question(&self) -> Option<&QuestionNode> {
        match self {
            Node::Question(q) => Some(q),
            Node::Result(_) => None,
        }
    }
}

/// The accumulated `key -> chosen option` pairs of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<String, String>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer for `key`; an empty string counts as unanswered.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Record an answer. Returns false and leaves the map untouched when
    /// `key` is already answered.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    /// Builder-style insert, mostly for assembling fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Answers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One record returned by the external search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Search result as shown next to a questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<&SearchResult> for Source {
    fn from(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            url: result.url.clone(),
            snippet: result.description.clone(),
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.jurisdiction, self.procedure_id)
    }
}
