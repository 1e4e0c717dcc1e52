use brrtree::{
    Constraints, DerivedConstraints, Node, NodeKind, StrategyConstrainer, Tree, TreeConfig,
};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing_util::CapturedLogs;

fn version(v: &str) -> Constraints {
    [("version".to_string(), v.to_string())].into()
}

fn versioned_tree(config: TreeConfig) -> Tree<&'static str> {
    let mut tree = Tree::with_options(
        Some(Method::GET),
        Arc::new(StrategyConstrainer::new()),
        config,
    );
    let pets = tree
        .add_child(tree.root(), Node::new("pets", NodeKind::Static))
        .unwrap();
    tree.add_handler(pets, Some("list"), Vec::new(), (), Constraints::new())
        .unwrap();
    tree.add_handler(pets, Some("list_v2"), Vec::new(), (), version("2.0.0"))
        .unwrap();
    tree
}

#[test]
fn test_registration_and_compile_are_logged() {
    let logs = CapturedLogs::default();
    logs.capture("brrtree=debug", || {
        let tree = versioned_tree(TreeConfig::default());
        let pets = tree.find_by_label(tree.root(), "pets").unwrap();
        let derived = DerivedConstraints::new().with("version", "2.0.0");
        assert_eq!(
            tree.get_matching_handler(pets, &derived).map(|e| e.handler),
            Some("list_v2")
        );
    });

    let added = logs.with_message("Child node added");
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["level"], "DEBUG");
    assert_eq!(added[0]["fields"]["prefix"], "pets");
    assert_eq!(added[0]["fields"]["kind"], "static");

    let registered = logs.with_message("Handler registered");
    assert_eq!(registered.len(), 2);
    assert_eq!(registered[1]["fields"]["constrained"], true);
    assert_eq!(registered[1]["fields"]["handlers"], 2);

    let compiled: Vec<_> = logs
        .events()
        .into_iter()
        .filter(|e| {
            e["fields"]["message"] == "Constraint matcher compiled"
                || e["fields"]["message"] == "Slow constraint matcher compilation detected"
        })
        .collect();
    assert_eq!(compiled.len(), 1);
    assert_eq!(compiled[0]["fields"]["handlers"], 2);
    assert_eq!(compiled[0]["fields"]["constraints"], 1);
}

#[test]
fn test_slow_compile_is_warned() {
    let config = TreeConfig {
        slow_compile_threshold: Duration::ZERO,
        ..TreeConfig::default()
    };
    let logs = CapturedLogs::default();
    logs.capture("brrtree=warn", || {
        versioned_tree(config).precompile();
    });

    let slow = logs.with_message("Slow constraint matcher compilation detected");
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0]["level"], "WARN");
    assert!(logs.with_message("Child node added").is_empty());
}

#[test]
fn test_precompile_summary_and_quiet_hot_path() {
    let logs = CapturedLogs::default();
    logs.capture("brrtree=debug", || {
        let tree = versioned_tree(TreeConfig::default());
        assert_eq!(tree.precompile(), 1);

        let summary = logs.with_message("Constraint matchers precompiled");
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0]["level"], "INFO");
        assert_eq!(summary[0]["fields"]["compiled_nodes"], 1);

        logs.clear();
        let root = tree.root();
        let derived = DerivedConstraints::new().with("version", "2.x").requiring_match();
        for _ in 0..10 {
            let pets = tree.find_matching_child(root, &derived, "pets").unwrap();
            assert!(tree.get_matching_handler(pets, &derived).is_some());
        }
    });

    // matching only traces, and compiled matchers are reused
    assert!(logs.events().is_empty());
}
