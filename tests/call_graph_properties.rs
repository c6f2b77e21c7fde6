//! End-to-end call-graph properties (C7, §8 scenario 6) driven through the
//! public [`Engine`] facade rather than by constructing a [`FileIndex`] by
//! hand — these exercise the same path a real consumer calling
//! `get_call_graph()` after indexing source files would.

use coderef::Engine;

/// A function nobody calls and that calls nothing itself is still its own
/// one-node tree and its own entry point.
#[test]
fn isolated_function_is_a_singleton_entry_point() {
    let engine = Engine::new();
    engine.update_file("a.rs", "fn lonely() {}\n");

    let index = engine.get_index_single_file("a.rs").unwrap();
    let lonely = index.defs.iter().find(|d| d.name.as_ref() == "lonely").unwrap();

    let graph = engine.get_call_graph();
    assert!(graph.is_entry_point(&lonely.id));
    assert_eq!(graph.tree_size(&lonely.id), 1);
    assert!(graph.node(&lonely.id).unwrap().enclosed_calls.is_empty());
}

/// A chain of three calls (`main -> step_one -> step_two`) has exactly one
/// entry point, a tree size of 3 rooted at `main`, and a tree size of 1 at
/// the leaf.
#[test]
fn linear_call_chain_has_a_single_entry_point_and_cumulative_tree_size() {
    let engine = Engine::new();
    engine.update_file(
        "a.rs",
        "fn main() {\n    step_one();\n}\n\nfn step_one() {\n    step_two();\n}\n\nfn step_two() {}\n",
    );

    let index = engine.get_index_single_file("a.rs").unwrap();
    let main = index.defs.iter().find(|d| d.name.as_ref() == "main").unwrap();
    let step_one = index.defs.iter().find(|d| d.name.as_ref() == "step_one").unwrap();
    let step_two = index.defs.iter().find(|d| d.name.as_ref() == "step_two").unwrap();

    let graph = engine.get_call_graph();
    assert_eq!(graph.entry_points(), &[main.id.clone()]);
    assert!(!graph.is_entry_point(&step_one.id));
    assert!(!graph.is_entry_point(&step_two.id));

    assert_eq!(graph.tree_size(&main.id), 3);
    assert_eq!(graph.tree_size(&step_one.id), 2);
    assert_eq!(graph.tree_size(&step_two.id), 1);
}

/// Two functions that call each other directly form a 2-cycle: both report
/// tree size 2 (the cycle's back-edge contributes 0) and neither has zero
/// inbound edges, so neither is an entry point.
#[test]
fn mutually_recursive_functions_form_a_cycle_with_no_entry_point() {
    let engine = Engine::new();
    engine.update_file(
        "a.rs",
        "fn ping() {\n    pong();\n}\n\nfn pong() {\n    ping();\n}\n",
    );

    let index = engine.get_index_single_file("a.rs").unwrap();
    let ping = index.defs.iter().find(|d| d.name.as_ref() == "ping").unwrap();
    let pong = index.defs.iter().find(|d| d.name.as_ref() == "pong").unwrap();

    let graph = engine.get_call_graph();
    assert!(!graph.is_entry_point(&ping.id));
    assert!(!graph.is_entry_point(&pong.id));
    assert_eq!(graph.tree_size(&ping.id), 2);
    assert_eq!(graph.tree_size(&pong.id), 2);
}

/// A call to a name that never resolves (no definition anywhere in the
/// project) still records the attempt on the caller's node, with an empty
/// `resolved_targets` list, rather than silently dropping it.
#[test]
fn unresolved_call_is_recorded_with_no_resolved_targets() {
    let engine = Engine::new();
    engine.update_file("a.py", "def start():\n    never_defined()\n");

    let index = engine.get_index_single_file("a.py").unwrap();
    let start = index.defs.iter().find(|d| d.name.as_ref() == "start").unwrap();

    let graph = engine.get_call_graph();
    let node = graph.node(&start.id).unwrap();
    let call = node
        .enclosed_calls
        .iter()
        .find(|c| c.callee_name.as_ref() == "never_defined")
        .expect("call attempt recorded even though unresolved");
    assert!(call.resolved_targets.is_empty());
    assert!(graph.is_entry_point(&start.id));
    assert_eq!(graph.tree_size(&start.id), 1);
}
