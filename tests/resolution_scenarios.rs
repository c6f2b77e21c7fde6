//! End-to-end resolution scenarios driven through the public [`Engine`]
//! facade, one per cross-file/cross-construct pattern the resolver and
//! receiver walker are expected to bind correctly.

use coderef::resolver::ResolutionRank;
use coderef::{Engine, UnresolvedCategory};

fn only_resolution(outcomes: &[coderef::ResolutionOutcome], idx: usize) -> &coderef::resolver::Resolution {
    let outcome = &outcomes[idx];
    assert_eq!(outcome.resolutions.len(), 1, "expected exactly one resolution candidate");
    &outcome.resolutions[0]
}

/// A named import used directly as a call receiver: `import { Foo } from
/// './a'; Foo.bar();` binds `Foo` to the class definition in `a.ts`, and a
/// call through it resolves to `Foo`'s method without needing an
/// intervening local variable (see
/// `typescript_instance_property_chain_resolves_via_declared_type_hint` for
/// the multi-step property-chain case).
#[test]
fn typescript_named_import_method_call_resolves_across_files() {
    let engine = Engine::new();
    engine.update_file("a.ts", "export class Foo {\n  bar() {\n    return 1;\n  }\n}\n");
    engine.update_file(
        "b.ts",
        "import { Foo } from './a';\n\nfunction run() {\n  Foo.bar();\n}\n",
    );

    let project = engine.project();
    let refs = project.references("b.ts");
    let call_idx = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("bar")))
        .expect("bar() call reference present");

    let resolutions = project.resolutions("b.ts");
    let resolution = only_resolution(&resolutions, call_idx);
    let target = resolution.symbol().expect("resolves to a concrete symbol");

    let foo_bar = engine
        .get_index_single_file("a.ts")
        .unwrap()
        .defs
        .iter()
        .find(|d| d.name.as_ref() == "bar")
        .unwrap()
        .id
        .clone();
    assert_eq!(target, &foo_bar);

    let call_graph = engine.get_call_graph();
    assert_eq!(call_graph.node(&foo_bar).unwrap().name.as_ref(), "bar");
    assert!(!call_graph.is_entry_point(&foo_bar));
    let inbound = call_graph
        .nodes()
        .values()
        .flat_map(|n| &n.enclosed_calls)
        .filter(|c| c.resolved_targets.contains(&foo_bar))
        .count();
    assert_eq!(inbound, 1);
}

/// A TS class property's declared type annotation (`private db: Database;`)
/// carries the same kind of type hint Python infers from a constructor
/// assignment, so a multi-step chain through it (`this.db.query()`)
/// resolves past its first segment instead of dead-ending as external.
#[test]
fn typescript_instance_property_chain_resolves_via_declared_type_hint() {
    let engine = Engine::new();
    engine.update_file(
        "database.ts",
        "export class Database {\n  query() {\n    return 1;\n  }\n}\n",
    );
    engine.update_file(
        "service.ts",
        "import { Database } from './database';\n\nclass Service {\n  private db: Database;\n  run() {\n    return this.db.query();\n  }\n}\n",
    );

    let project = engine.project();
    let refs = project.references("service.ts");
    let call_idx = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("query")))
        .expect("this.db.query() call reference present");

    let resolutions = project.resolutions("service.ts");
    let resolution = only_resolution(&resolutions, call_idx);

    let query_id = engine
        .get_index_single_file("database.ts")
        .unwrap()
        .defs
        .iter()
        .find(|d| d.name.as_ref() == "query")
        .unwrap()
        .id
        .clone();
    assert_eq!(resolution.symbol(), Some(&query_id));
}

/// A bare TS variable constructed with `new Database()` carries the same
/// type hint a declared property annotation would, so a chained call right
/// after construction resolves without an intervening class.
#[test]
fn typescript_constructed_variable_chain_resolves_via_constructor_type_inference() {
    let engine = Engine::new();
    engine.update_file(
        "database.ts",
        "export class Database {\n  query() {\n    return 1;\n  }\n}\n",
    );
    engine.update_file(
        "service.ts",
        "import { Database } from './database';\n\nfunction run() {\n  const db = new Database();\n  return db.query();\n}\n",
    );

    let project = engine.project();
    let refs = project.references("service.ts");
    let call_idx = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("query")))
        .expect("db.query() call reference present");

    let resolutions = project.resolutions("service.ts");
    let resolution = only_resolution(&resolutions, call_idx);

    let query_id = engine
        .get_index_single_file("database.ts")
        .unwrap()
        .defs
        .iter()
        .find(|d| d.name.as_ref() == "query")
        .unwrap()
        .id
        .clone();
    assert_eq!(resolution.symbol(), Some(&query_id));
}

/// A Python instance attribute assigned from a bare constructor call
/// (`self.conn = Database()`) carries enough of a type hint that a later
/// `self.conn.execute()` resolves through `Database`'s own method table.
#[test]
fn python_instance_attribute_chain_resolves_via_constructor_type_inference() {
    let engine = Engine::new();
    engine.update_file(
        "db.py",
        "class Database:\n    def execute(self):\n        return 1\n",
    );
    engine.update_file(
        "service.py",
        "from db import Database\n\nclass Service:\n    def __init__(self):\n        self.conn = Database()\n\n    def run(self):\n        return self.conn.execute()\n",
    );

    let project = engine.project();
    let refs = project.references("service.py");
    let call_idx = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("execute")))
        .expect("self.conn.execute() call reference present");

    let resolutions = project.resolutions("service.py");
    let resolution = only_resolution(&resolutions, call_idx);
    assert_eq!(resolution.rank, ResolutionRank::NamespaceMember);

    let execute_id = engine
        .get_index_single_file("db.py")
        .unwrap()
        .defs
        .iter()
        .find(|d| d.name.as_ref() == "execute")
        .unwrap()
        .id
        .clone();
    assert_eq!(resolution.symbol(), Some(&execute_id));
}

/// A Rust `use` tree nesting a bare `self` alongside a renamed leaf
/// (`use m::{self, g as h};`) binds both `m::g` (via the qualified path)
/// and `h` (via the renamed import) to the same definition.
#[test]
fn rust_nested_use_tree_self_and_alias_resolve_to_the_same_callee() {
    let engine = Engine::new();
    let src = "mod m {\n    pub fn g() {}\n}\n\nuse m::{self, g as h};\n\nfn main() {\n    h();\n    m::g();\n}\n";
    engine.update_file("lib.rs", src);

    let index = engine.get_index_single_file("lib.rs").unwrap();
    let g = index.defs.iter().find(|d| d.name.as_ref() == "g").unwrap();
    assert_eq!(g.id.qualified_name(), "m::g");

    let project = engine.project();
    let refs = project.references("lib.rs");
    let h_call = refs.iter().position(|r| r.name.as_ref() == "h").expect("h() call present");
    let qualified_call = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("g")))
        .expect("m::g() call present");

    let resolutions = project.resolutions("lib.rs");
    let via_alias = only_resolution(&resolutions, h_call).symbol().cloned();
    let via_path = only_resolution(&resolutions, qualified_call).symbol().cloned();
    assert!(via_alias.is_some());
    assert_eq!(via_alias, via_path);
    assert_eq!(via_alias.as_ref(), Some(&g.id));
}

/// `from pkg import module` where `module` names a submodule file rather
/// than an export of `pkg/__init__.py` rebinds the binding to a namespace
/// handle onto that submodule, so `module.run()` still resolves.
#[test]
fn python_submodule_import_rebind_resolves_through_the_submodule() {
    let engine = Engine::new();
    engine.update_file("pkg/__init__.py", "");
    engine.update_file("pkg/module.py", "def run():\n    return 1\n");
    engine.update_file(
        "main.py",
        "from pkg import module\n\ndef start():\n    return module.run()\n",
    );

    let project = engine.project();
    let refs = project.references("main.py");
    let call_idx = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("run")))
        .expect("module.run() call present");

    let resolutions = project.resolutions("main.py");
    let resolution = only_resolution(&resolutions, call_idx);
    let run_id = engine
        .get_index_single_file("pkg/module.py")
        .unwrap()
        .defs
        .iter()
        .find(|d| d.name.as_ref() == "run")
        .unwrap()
        .id
        .clone();
    assert_eq!(resolution.symbol(), Some(&run_id));
}

/// A `self`-attribute call with no constructor-inferred type hint at all
/// (assigned from something other than a bare constructor call) breaks the
/// receiver chain as `External` rather than guessing a class.
#[test]
fn python_self_attribute_without_type_hint_is_unresolved_external() {
    let engine = Engine::new();
    engine.update_file(
        "service.py",
        "class Service:\n    def __init__(self, conn):\n        self.conn = conn\n\n    def run(self):\n        return self.conn.execute()\n",
    );

    let project = engine.project();
    let refs = project.references("service.py");
    let call_idx = refs
        .iter()
        .position(|r| r.receiver_chain.as_ref().is_some_and(|c| c.method_name() == Some("execute")))
        .expect("self.conn.execute() call reference present");

    let resolutions = project.resolutions("service.py");
    let outcome = &resolutions[call_idx];
    assert!(!outcome.is_resolved());
    assert_eq!(outcome.category, Some(UnresolvedCategory::External));
}
