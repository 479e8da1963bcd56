//! Procedure collection, depth bounds and final summaries.

use procguide::domain::aggregator::compute_max_depth_with_ceiling;
use procguide::domain::{
    collect_all, compute_max_depth, generic_procedures, related_procedures, summarize, Node,
    Procedure, MAX_DEPTH_CEILING,
};

fn proc(id: &str) -> Procedure {
    Procedure::new(id, format!("Procedure {id}"), "City hall", "")
}

fn ids(list: &[Procedure]) -> Vec<&str> {
    list.iter().map(|p| p.procedure_id.as_str()).collect()
}

/// Three levels, P1 appearing at two leaves.
fn three_level_tree() -> Node {
    Node::question(
        "A?",
        "a",
        vec!["x".into(), "y".into()],
        vec![
            Node::question(
                "B?",
                "b",
                vec!["x".into(), "y".into()],
                vec![Node::result(vec![proc("P1")]), Node::result(vec![proc("P2")])],
            ),
            Node::question(
                "C?",
                "c",
                vec!["x".into()],
                vec![Node::result(vec![proc("P1")])],
            ),
        ],
    )
}

fn chain(depth: usize) -> Node {
    (0..depth).fold(Node::result(vec![proc("DEEP")]), |child, i| {
        Node::question(format!("Q{i}?"), format!("k{i}"), vec!["go".into()], vec![child])
    })
}

#[test]
fn given_repeated_procedure_when_collecting_then_first_seen_order() {
    let all = collect_all(&three_level_tree());

    assert_eq!(ids(&all), vec!["P1", "P2"]);
}

#[test]
fn given_shared_id_when_collecting_then_exactly_one_entry() {
    let tree = Node::question(
        "A?",
        "a",
        vec!["x".into(), "y".into()],
        vec![Node::result(vec![proc("X")]), Node::result(vec![proc("X")])],
    );

    let all = collect_all(&tree);

    assert_eq!(all.iter().filter(|p| p.procedure_id == "X").count(), 1);
}

#[test]
fn given_deep_chain_when_computing_depth_then_capped_at_ceiling() {
    let deep = chain(50);

    assert_eq!(compute_max_depth(&deep), MAX_DEPTH_CEILING);
    assert_eq!(compute_max_depth_with_ceiling(&deep, 5), 5);
    assert_eq!(collect_all(&deep).len(), 1);
}

#[test]
fn given_shallow_tree_when_computing_depth_then_exact() {
    assert_eq!(compute_max_depth(&three_level_tree()), 2);
    assert_eq!(compute_max_depth(&Node::fallback()), 0);
}

#[test]
fn given_selection_when_computing_related_then_set_difference() {
    let all = vec![proc("P1"), proc("P2"), proc("P3")];

    let related = related_procedures(&all, &[proc("P2")]);

    assert_eq!(ids(&related), vec!["P1", "P3"]);
}

#[test]
fn given_everything_selected_when_summarizing_then_generic_procedures_stand_in() {
    let tree = Node::result(vec![proc("P1")]);

    let summary = summarize(&tree, &[proc("P1")], &[]);

    assert_eq!(ids(&summary.all_procedures), vec!["P1"]);
    assert_eq!(summary.related_procedures.len(), generic_procedures().len());
}

#[test]
fn given_known_procedures_when_summarizing_then_tree_not_needed() {
    let known = vec![proc("P1"), proc("P2")];

    let summary = summarize(&Node::fallback(), &[proc("P1")], &known);

    assert_eq!(ids(&summary.related_procedures), vec!["P2"]);
    assert_eq!(summary.all_procedures, known);
}
