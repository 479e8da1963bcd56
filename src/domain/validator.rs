//! Static structure validator for untrusted tree payloads.
//!
//! Checks only; never modifies. The repairer in [`crate::domain::repair`]
//! is the component that corrects what this module reports.

use serde_json::{Map, Value};

pub(crate) const RESULT_MARKER: &str = "procedureList";
pub(crate) const QUESTION_MARKER: &str = "question";

/// Outcome of a structure check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Structural defects, each prefixed with the node path.
    pub errors: Vec<String>,
    /// Tolerated oddities such as an empty procedure list.
    pub warnings: Vec<String>,
}

/// True if the value looks like either node shape at all.
pub(crate) fn is_node_shape(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key(RESULT_MARKER) || obj.contains_key(QUESTION_MARKER))
        .unwrap_or(false)
}

pub(crate) fn child_path(path: &str, index: usize) -> String {
    format!("{path}.children[{index}]")
}

pub(crate) fn non_empty_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Validate a raw tree payload against the structural invariants.
///
/// Empty procedure lists are reported as warnings and do not invalidate
/// the tree.
pub fn validate_structure(tree: &Value) -> ValidationReport {
    let mut validator = Validator::default();
    validator.visit(tree, "root");
    ValidationReport {
        is_valid: validator.errors.is_empty(),
        errors: validator.errors,
        warnings: validator.warnings,
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<String>,
    warnings: Vec<String>,
    keys_on_path: Vec<String>,
}

impl Validator {
    fn visit(&mut self, node: &Value, path: &str) {
        let Some(obj) = node.as_object() else {
            self.errors.push(format!("{path}: node is not an object"));
            return;
        };

        if obj.contains_key(RESULT_MARKER) {
            if obj.contains_key(QUESTION_MARKER) {
                self.errors
                    .push(format!("{path}: node carries both question and procedureList"));
            }
            self.visit_result(obj, path);
            return;
        }

        self.visit_question(obj, path);
    }

    fn visit_result(&mut self, obj: &Map<String, Value>, path: &str) {
        match obj.get(RESULT_MARKER).and_then(Value::as_array) {
            None => self
                .errors
                .push(format!("{path}: procedureList is not an array")),
            Some(list) if list.is_empty() => {
                self.warnings.push(format!("{path}: procedureList is empty"))
            }
            Some(list) => {
                for (i, entry) in list.iter().enumerate() {
                    if !entry.is_object() {
                        self.errors
                            .push(format!("{path}.procedureList[{i}]: entry is not an object"));
                    }
                }
            }
        }
    }

    fn visit_question(&mut self, obj: &Map<String, Value>, path: &str) {
        if non_empty_str(obj, QUESTION_MARKER).is_none() {
            self.errors
                .push(format!("{path}: question is missing or invalid"));
        }

        let key = non_empty_str(obj, "key");
        match key {
            None => self.errors.push(format!("{path}: key is missing or invalid")),
            Some(k) if self.keys_on_path.iter().any(|seen| seen == k) => self
                .errors
                .push(format!("{path}: key '{k}' already used by an ancestor")),
            Some(_) => {}
        }

        let options = obj.get("options").and_then(Value::as_array);
        match options {
            Some(opts) if !opts.is_empty() => {
                if opts.iter().any(|o| !o.is_string()) {
                    self.errors
                        .push(format!("{path}: options contains non-string entries"));
                }
            }
            _ => self
                .errors
                .push(format!("{path}: options array is missing or empty")),
        }

        let Some(children) = obj.get("children").and_then(Value::as_array) else {
            self.errors.push(format!("{path}: children array is missing"));
            return;
        };

        if let Some(opts) = options {
            if opts.len() != children.len() {
                self.errors.push(format!(
                    "{path}: options count ({}) != children count ({})",
                    opts.len(),
                    children.len()
                ));
            }
        }

        if let Some(k) = key {
            self.keys_on_path.push(k.to_string());
        }
        for (i, child) in children.iter().enumerate() {
            let child_path = child_path(path, i);
            if child.is_null() {
                self.errors
                    .push(format!("{child_path}: child node is null or undefined"));
            } else {
                self.visit(child, &child_path);
            }
        }
        if key.is_some() {
            self.keys_on_path.pop();
        }
    }
}
