//! Tree repairer: turns an untrusted payload into a structurally valid [`Node`].
//!
//! Depth-first, pre-order. Every defect is recorded in `errors` and every
//! corrective action in `fixes`; neither is fatal. The input is never
//! modified, the corrected tree is built fresh.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::entities::{Node, Procedure, QuestionNode, ResultNode};
use crate::domain::validator::{
    child_path, is_node_shape, non_empty_str, QUESTION_MARKER, RESULT_MARKER,
};

pub const GENERIC_QUESTION: &str = "Which of the following applies to you?";
pub const PLACEHOLDER_OPTION: &str = "Continue";
pub const UNNAMED_PROCEDURE: &str = "Unnamed procedure";

/// Corrected tree plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub tree: Node,
    /// True when the input needed no repair.
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub fixes: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate and repair a raw tree payload.
pub fn validate_and_fix(raw: &Value) -> RepairOutcome {
    let mut repairer = Repairer::default();
    let tree = repairer.repair(raw, "root");

    if !repairer.fixes.is_empty() {
        warn!(
            "repaired tree: {} defects, {} fixes",
            repairer.errors.len(),
            repairer.fixes.len()
        );
    }

    RepairOutcome {
        tree,
        is_valid: repairer.errors.is_empty(),
        errors: repairer.errors,
        fixes: repairer.fixes,
        warnings: repairer.warnings,
    }
}

/// Repair an already typed tree.
///
/// A typed tree can still break invariants (mismatched counts, blank keys).
/// If it cannot even be serialized, it is returned unmodified with a
/// single diagnostic.
pub fn validate_and_fix_node(tree: &Node) -> RepairOutcome {
    match serde_json::to_value(tree) {
        Ok(raw) => validate_and_fix(&raw),
        Err(e) => RepairOutcome {
            tree: tree.clone(),
            is_valid: false,
            errors: vec![format!("tree could not be copied for repair: {e}")],
            fixes: Vec::new(),
            warnings: Vec::new(),
        },
    }
}

#[derive(Default)]
struct Repairer {
    errors: Vec<String>,
    fixes: Vec<String>,
    warnings: Vec<String>,
    keys_on_path: Vec<String>,
}

impl Repairer {
    fn defect(&mut self, error: String, fix: String) {
        debug!("{error} -> {fix}");
        self.errors.push(error);
        self.fixes.push(fix);
    }

    fn repair(&mut self, value: &Value, path: &str) -> Node {
        let Some(obj) = value.as_object() else {
            self.defect(
                format!("{path}: node is not an object"),
                format!("{path}: replaced node with empty result"),
            );
            return Node::fallback();
        };

        if obj.contains_key(RESULT_MARKER) {
            if obj.contains_key(QUESTION_MARKER) {
                self.defect(
                    format!("{path}: node carries both question and procedureList"),
                    format!("{path}: kept procedureList, dropped question fields"),
                );
            }
            return Node::Result(self.repair_result(obj, path));
        }

        Node::Question(self.repair_question(obj, path))
    }

    fn repair_result(&mut self, obj: &Map<String, Value>, path: &str) -> ResultNode {
        let Some(entries) = obj.get(RESULT_MARKER).and_then(Value::as_array) else {
            self.defect(
                format!("{path}: procedureList is not an array"),
                format!("{path}: replaced procedureList with empty list"),
            );
            return ResultNode::default();
        };

        if entries.is_empty() {
            self.warnings.push(format!("{path}: procedureList is empty"));
        }

        let mut procedures = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let entry_path = format!("{path}.procedureList[{i}]");
            match entry.as_object() {
                Some(fields) => procedures.push(self.repair_procedure(fields, &entry_path)),
                None => self.defect(
                    format!("{entry_path}: entry is not an object"),
                    format!("{entry_path}: dropped entry"),
                ),
            }
        }
        ResultNode {
            procedure_list: procedures,
        }
    }

    fn repair_procedure(&mut self, fields: &Map<String, Value>, path: &str) -> Procedure {
        let procedure_id = match scalar_text(fields.get("procedure_id")) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                self.defect(
                    format!("{path}: procedure_id is missing"),
                    format!("{path}: assigned procedure_id '{path}'"),
                );
                path.to_string()
            }
        };

        let name = match scalar_text(fields.get("name")) {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                self.defect(
                    format!("{path}: name is missing"),
                    format!("{path}: substituted name '{UNNAMED_PROCEDURE}'"),
                );
                UNNAMED_PROCEDURE.to_string()
            }
        };

        let mut required = |field: &str| {
            scalar_text(fields.get(field)).unwrap_or_else(|| {
                self.warnings.push(format!("{path}: {field} is missing"));
                String::new()
            })
        };
        let jurisdiction = required("jurisdiction");
        let url = required("url");

        Procedure {
            procedure_id,
            name,
            jurisdiction,
            url,
            requirements: scalar_text(fields.get("requirements")),
            deadline: scalar_text(fields.get("deadline")),
            fee: scalar_text(fields.get("fee")),
        }
    }

    fn repair_question(&mut self, obj: &Map<String, Value>, path: &str) -> QuestionNode {
        let question = match non_empty_str(obj, QUESTION_MARKER) {
            Some(q) => q.to_string(),
            None => {
                self.defect(
                    format!("{path}: question is missing or invalid"),
                    format!("{path}: substituted generic question"),
                );
                GENERIC_QUESTION.to_string()
            }
        };

        let key = match non_empty_str(obj, "key") {
            Some(k) if !self.keys_on_path.iter().any(|seen| seen == k) => k.to_string(),
            Some(k) => {
                let fresh = generated_key();
                self.defect(
                    format!("{path}: key '{k}' already used by an ancestor"),
                    format!("{path}: renamed key to '{fresh}'"),
                );
                fresh
            }
            None => {
                let fresh = generated_key();
                self.defect(
                    format!("{path}: key is missing or invalid"),
                    format!("{path}: generated key '{fresh}'"),
                );
                fresh
            }
        };

        let mut options = self.repair_options(obj.get("options"), path);

        let children: &[Value] = match obj.get("children").and_then(Value::as_array) {
            Some(children) => children.as_slice(),
            None => {
                self.defect(
                    format!("{path}: children array is missing"),
                    format!("{path}: substituted empty children"),
                );
                &[]
            }
        };

        let allow_multiple = obj.get("allowMultiple").and_then(Value::as_bool);

        self.keys_on_path.push(key.clone());
        let children = if options.len() != children.len() {
            self.reconcile_counts(&mut options, children, path)
        } else {
            self.repair_children(children, path)
        };
        self.keys_on_path.pop();

        QuestionNode {
            question,
            key,
            options,
            children,
            allow_multiple,
        }
    }

    fn repair_options(&mut self, raw: Option<&Value>, path: &str) -> Vec<String> {
        let entries = raw.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

        // Option i leads to child i, so every entry keeps its slot.
        let mut options = Vec::with_capacity(entries.len());
        let mut coerced = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                Value::String(s) => options.push(s.clone()),
                Value::Number(_) | Value::Bool(_) => {
                    options.push(entry.to_string());
                    coerced += 1;
                }
                _ => {
                    options.push(format!("Option {}", i + 1));
                    coerced += 1;
                }
            }
        }
        if coerced > 0 {
            self.defect(
                format!("{path}: options contains non-string entries"),
                format!("{path}: relabeled {coerced} option entries in place"),
            );
        }

        if options.is_empty() {
            self.defect(
                format!("{path}: options array is missing or empty"),
                format!("{path}: substituted single placeholder option"),
            );
            options.push(PLACEHOLDER_OPTION.to_string());
        }
        options
    }

    /// Options and children disagree in length. Keep the first valid
    /// children in their original order and cut options to match.
    fn reconcile_counts(
        &mut self,
        options: &mut Vec<String>,
        children: &[Value],
        path: &str,
    ) -> Vec<Node> {
        let error = format!(
            "{path}: options count ({}) != children count ({})",
            options.len(),
            children.len()
        );

        let valid: Vec<(usize, &Value)> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| is_node_shape(child))
            .collect();

        if valid.is_empty() {
            options.truncate(1);
            self.defect(
                error,
                format!("{path}: no valid children, synthesized empty result and kept 1 option"),
            );
            return vec![Node::fallback()];
        }

        let keep = valid.len().min(options.len());
        let before = options.len();
        options.truncate(keep);
        self.defect(
            error,
            format!(
                "{path}: kept {keep} of {} children and {keep} of {before} options",
                children.len()
            ),
        );

        valid
            .into_iter()
            .take(keep)
            .map(|(i, child)| self.repair(child, &child_path(path, i)))
            .collect()
    }

    fn repair_children(&mut self, children: &[Value], path: &str) -> Vec<Node> {
        children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let child_path = child_path(path, i);
                if is_node_shape(child) {
                    self.repair(child, &child_path)
                } else {
                    let what = if child.is_null() {
                        "child node is null or undefined"
                    } else {
                        "child node has no recognizable shape"
                    };
                    self.defect(
                        format!("{child_path}: {what}"),
                        format!("{child_path}: replaced with empty result"),
                    );
                    Node::fallback()
                }
            })
            .collect()
    }
}

/// Strings pass through, numbers and booleans are rendered, anything else is absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn generated_key() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("key_{}", &id[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_non_object_root_when_repairing_then_returns_empty_result() {
        let outcome = validate_and_fix(&json!("not a tree"));

        assert!(!outcome.is_valid);
        assert_eq!(outcome.tree, Node::fallback());
        assert_eq!(outcome.fixes.len(), 1);
    }

    #[test]
    fn given_procedure_without_id_when_repairing_then_assigns_path_id() {
        let raw = json!({"procedureList": [{"name": "Permit", "jurisdiction": "City", "url": "u"}]});

        let outcome = validate_and_fix(&raw);

        let Node::Result(result) = outcome.tree else {
            panic!("expected result node");
        };
        assert_eq!(result.procedure_list[0].procedure_id, "root.procedureList[0]");
        assert!(!outcome.is_valid);
    }

    #[test]
    fn given_numeric_options_when_repairing_then_coerces_to_text() {
        let raw = json!({
            "question": "How many seats?", "key": "seats", "options": [10, "more"],
            "children": [{"procedureList": []}, {"procedureList": []}]
        });

        let outcome = validate_and_fix(&raw);

        let q = outcome.tree.as_question().expect("question");
        assert_eq!(q.options, vec!["10".to_string(), "more".to_string()]);
        assert_eq!(outcome.fixes.len(), 1);
    }
}
