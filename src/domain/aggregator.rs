//! Procedure aggregation over whole trees.

use std::collections::HashSet;

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::entities::{Node, Procedure};

/// Depth at which [`compute_max_depth`] stops descending.
pub const MAX_DEPTH_CEILING: usize = 20;

/// Every procedure reachable from `tree`, deduplicated by `procedure_id`.
///
/// Depth-first, children in order; the first occurrence of an id wins.
pub fn collect_all(tree: &Node) -> Vec<Procedure> {
    let mut collected = Vec::new();
    gather(tree, &mut collected);
    let total = collected.len();

    let unique: Vec<Procedure> = collected
        .into_iter()
        .unique_by(|p| p.procedure_id.clone())
        .collect();
    debug!("collected {total} procedures, {} unique", unique.len());
    unique
}

fn gather(node: &Node, out: &mut Vec<Procedure>) {
    match node {
        Node::Result(result) => out.extend(result.procedure_list.iter().cloned()),
        Node::Question(q) => {
            for child in &q.children {
                gather(child, out);
            }
        }
    }
}

/// Longest root-to-leaf edge count, capped at [`MAX_DEPTH_CEILING`].
pub fn compute_max_depth(tree: &Node) -> usize {
    compute_max_depth_with_ceiling(tree, MAX_DEPTH_CEILING)
}

/// Longest root-to-leaf edge count, capped at `ceiling`.
///
/// A lone leaf has depth 0. Descent stops at `ceiling`, so the result never
/// exceeds it however deep the input is.
pub fn compute_max_depth_with_ceiling(tree: &Node, ceiling: usize) -> usize {
    fn depth_of(node: &Node, current: usize, ceiling: usize) -> usize {
        if current >= ceiling {
            return ceiling;
        }
        match node {
            Node::Result(_) => current,
            Node::Question(q) => q
                .children
                .iter()
                .map(|child| depth_of(child, current + 1, ceiling))
                .max()
                .unwrap_or(current),
        }
    }

    let depth = depth_of(tree, 0, ceiling);
    if depth == ceiling {
        warn!("depth calculation reached the ceiling of {ceiling}");
    }
    depth
}

/// Procedures in `all` whose id is not among `selected`.
pub fn related_procedures(all: &[Procedure], selected: &[Procedure]) -> Vec<Procedure> {
    let selected_ids: HashSet<&str> = selected.iter().map(|p| p.procedure_id.as_str()).collect();
    all.iter()
        .filter(|p| !selected_ids.contains(p.procedure_id.as_str()))
        .cloned()
        .collect()
}

/// Hand-authored procedures shown when a tree yields nothing related.
pub fn generic_procedures() -> Vec<Procedure> {
    vec![
        Procedure {
            procedure_id: "fallback_1".into(),
            name: "Food sanitation supervisor notification".into(),
            jurisdiction: "Public health center".into(),
            url: "https://www.mhlw.go.jp/".into(),
            requirements: Some("Food sanitation supervisor certificate".into()),
            deadline: Some("Before opening".into()),
            fee: Some("Free".into()),
        },
        Procedure {
            procedure_id: "fallback_2".into(),
            name: "Fire prevention manager appointment".into(),
            jurisdiction: "Fire department".into(),
            url: "https://www.fdma.go.jp/".into(),
            requirements: Some("Fire prevention manager certificate, appointment form".into()),
            deadline: Some("Within 7 days of opening".into()),
            fee: Some("Free".into()),
        },
        Procedure {
            procedure_id: "fallback_3".into(),
            name: "Labor insurance enrollment".into(),
            jurisdiction: "Labor standards inspection office / Hello Work".into(),
            url: "https://www.mhlw.go.jp/".into(),
            requirements: Some("Employee roster, wage ledger".into()),
            deadline: Some("When the first employee is hired".into()),
            fee: Some("Premium as a share of wages".into()),
        },
    ]
}

/// Everything shown alongside a final answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureSummary {
    pub procedures: Vec<Procedure>,
    pub related_procedures: Vec<Procedure>,
    pub all_procedures: Vec<Procedure>,
}

/// Assemble the final procedure sets for `selected`.
///
/// `known_all` is the set collected when the session started; if it is
/// empty the tree is walked again. If nothing related remains, the generic
/// procedures stand in so the user is never left without context.
pub fn summarize(tree: &Node, selected: &[Procedure], known_all: &[Procedure]) -> ProcedureSummary {
    let all = if known_all.is_empty() {
        debug!("no procedures known up front, collecting from tree again");
        collect_all(tree)
    } else {
        known_all.to_vec()
    };

    let mut related = related_procedures(&all, selected);
    if related.is_empty() && !selected.is_empty() {
        debug!("no related procedures in tree, using generic set");
        related = related_procedures(&generic_procedures(), selected);
    }

    ProcedureSummary {
        procedures: selected.to_vec(),
        related_procedures: related,
        all_procedures: all,
    }
}
