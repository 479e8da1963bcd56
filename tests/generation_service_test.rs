//! Strategy fallback, payload extraction and caching of generated trees.

mod common;

use std::io;
use std::sync::Arc;

use common::{result, ScriptedGenerator, VALID_TREE};
use procguide::application::services::generation::{MINIMAL, RICH, SIMPLIFIED};
use procguide::application::services::{
    default_strategies, tree_cache_key, GenerationService, TieredCache, TreeSource,
};
use procguide::domain::{classify, collect_all, validate_and_fix_node, Classification};
use procguide::util::testing;

fn service(generator: Arc<ScriptedGenerator>) -> (GenerationService, Arc<TieredCache>) {
    let cache = Arc::new(TieredCache::new(10));
    let service = GenerationService::new(generator, cache.clone(), default_strategies(), 1800);
    (service, cache)
}

fn restaurant() -> Classification {
    classify("restaurant business permit")
}

#[test]
fn given_malformed_then_valid_response_when_generating_then_second_strategy_wins() {
    testing::init_test_setup();
    // Arrange
    let reply = format!("Here is the tree:\n```json\n{VALID_TREE}\n```\nGood luck!");
    let generator = Arc::new(ScriptedGenerator::replying(&["I cannot help with that.", reply.as_str()]));
    let (service, _) = service(generator.clone());

    // Act
    let generated = service
        .generate_tree("restaurant business permit", &[], &restaurant())
        .unwrap();

    // Assert
    assert_eq!(generated.source, TreeSource::Generated("simplified".into()));
    assert_eq!(generator.calls(), 2);
    let budgets = generator.budgets.lock().clone();
    assert_eq!(budgets, vec![RICH.budget, SIMPLIFIED.budget]);
    assert_eq!(collect_all(&generated.tree).len(), 3);
}

#[test]
fn given_every_strategy_fails_when_generating_then_synthetic_tree_uncached() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(io::Error::new(io::ErrorKind::TimedOut, "slow")),
        Ok("{\"question\": \"Q?\", \"key\": \"k\", \"options\": [\"a\", \"b\"], \"children\": []}".into()),
        Ok("no object here".into()),
    ]));
    let (service, cache) = service(generator.clone());

    let generated = service.generate_tree("restaurant permit", &[], &restaurant()).unwrap();

    assert_eq!(generated.source, TreeSource::Synthetic);
    assert_eq!(generator.budgets.lock().last(), Some(&MINIMAL.budget));
    assert!(validate_and_fix_node(&generated.tree).is_valid);
    assert!(cache.is_empty());
}

#[test]
fn given_cached_tree_when_generating_again_then_generator_not_called() {
    let generator = Arc::new(ScriptedGenerator::replying(&[VALID_TREE]));
    let (service, _) = service(generator.clone());
    let context = vec![result("Permit guide", "https://www.example.go.jp/permit")];
    let first = service.generate_tree("restaurant permit", &context, &restaurant()).unwrap();

    let second = service.generate_tree("restaurant permit", &context, &restaurant()).unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(second.source, TreeSource::Cache);
    assert_eq!(second.tree, first.tree);
}

#[test]
fn given_other_search_context_when_generating_then_cache_misses() {
    let generator = Arc::new(ScriptedGenerator::replying(&[VALID_TREE, VALID_TREE]));
    let (service, _) = service(generator.clone());
    let a = vec![result("A", "https://a.go.jp")];
    let b = vec![result("B", "https://b.go.jp")];

    service.generate_tree("restaurant permit", &a, &restaurant()).unwrap();
    service.generate_tree("restaurant permit", &b, &restaurant()).unwrap();

    assert_eq!(generator.calls(), 2);
    assert_ne!(tree_cache_key("q", &a), tree_cache_key("q", &b));
}

#[test]
fn given_truncated_response_when_generating_then_braces_completed() {
    let truncated =
        r#"{"question": "Q?", "key": "k", "options": ["a"], "children": [{"procedureList": []}"#;
    let generator = Arc::new(ScriptedGenerator::replying(&[truncated]));
    let (service, _) = service(generator);

    let generated = service.generate_tree("restaurant permit", &[], &restaurant()).unwrap();

    assert_eq!(generated.source, TreeSource::Generated("rich".into()));
    let q = generated.tree.as_question().unwrap();
    assert_eq!(q.key, "k");
    assert_eq!(q.children.len(), 1);
}
