//! Tree-shaped terminal rendering of questionnaire trees

use termtree::Tree;

use crate::domain::{Node, Procedure};

pub trait ToTreeString {
    fn to_tree_string(&self) -> Tree<String>;
}

impl ToTreeString for Node {
    fn to_tree_string(&self) -> Tree<String> {
        match self {
            Node::Result(result) => result_tree("procedures".to_string(), &result.procedure_list),
            Node::Question(q) => {
                let root = format!("{} [{}]", q.question, q.key);
                // options and children are paired by position; extras on either side show as-is
                let leaves = q.children.iter().enumerate().map(|(i, child)| {
                    let edge = q
                        .options
                        .get(i)
                        .map(String::as_str)
                        .unwrap_or("(no option)");
                    label_subtree(edge, child.to_tree_string())
                });
                let dangling = q
                    .options
                    .iter()
                    .skip(q.children.len())
                    .map(|o| Tree::new(format!("{o} -> (missing)")));
                Tree::new(root).with_leaves(leaves.chain(dangling))
            }
        }
    }
}

fn result_tree(label: String, procedures: &[Procedure]) -> Tree<String> {
    let leaves = procedures
        .iter()
        .map(|p| format!("{} ({})", p.name, p.procedure_id));
    Tree::new(format!("{label}: {}", procedures.len())).with_leaves(leaves)
}

/// Prefix the subtree root with the option that leads to it.
fn label_subtree(edge: &str, mut subtree: Tree<String>) -> Tree<String> {
    subtree.root = format!("{edge} -> {}", subtree.root);
    subtree
}
