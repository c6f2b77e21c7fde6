//! C1 language profile for Python (§4.1).

use crate::exports::Export;
use crate::file_index::FileIndexBuilder;
use crate::imports::{Import, ImportBindingSpec, ImportKind};
use crate::parsing::{node_location, node_text, CompiledQuery, Language, LanguageProfile};
use crate::reference::{ReceiverChain, ReceiverHead, Reference, ReferenceKind};
use crate::symbol::{Definition, DefinitionKind};
use crate::types::{Location, Visibility};
use std::path::Path;
use tree_sitter::{Node, Parser, Query};

const QUERY_SOURCE: &str = r#"
(function_definition name: (identifier) @name) @definition.function
(function_definition body: (block) @scope.function)
(class_definition name: (identifier) @name) @definition.class
(class_definition body: (block) @scope.class)
(import_statement) @import.named
(import_from_statement) @import.named
(assignment left: (attribute) @lhs) @assignment.property
(assignment left: (identifier) right: (call)) @definition.variable
(call) @reference.call
(attribute) @reference.member
(list_comprehension) @scope.comprehension
(dictionary_comprehension) @scope.comprehension
(set_comprehension) @scope.comprehension
(generator_expression) @scope.comprehension
(except_clause) @scope.catch
"#;

pub struct PythonProfile {
    queries: Vec<CompiledQuery>,
}

impl PythonProfile {
    pub fn new() -> Self {
        let language = tree_sitter_python::LANGUAGE.into();
        let query = Query::new(&language, QUERY_SOURCE).expect("python query set must compile");
        Self {
            queries: vec![CompiledQuery { name: "python", query }],
        }
    }
}

impl Default for PythonProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageProfile for PythonProfile {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, source: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into()).ok()?;
        parser.parse(source, None)
    }

    fn queries(&self) -> &[CompiledQuery] {
        &self.queries
    }

    fn handle_capture(&self, capture_name: &str, node: Node, source: &str, builder: &mut FileIndexBuilder) {
        match capture_name {
            "definition.function" => handle_function(node, source, builder),
            "definition.class" => handle_class(node, source, builder),
            "import.named" => match node.kind() {
                "import_statement" => handle_import(node, source, builder),
                "import_from_statement" => handle_import_from(node, source, builder),
                _ => {}
            },
            "assignment.property" => handle_property_assignment(node, source, builder),
            "definition.variable" => handle_variable_definition(node, source, builder),
            "reference.call" => handle_call(node, source, builder),
            "reference.member" => handle_member(node, source, builder),
            _ => {}
        }
    }

    fn receiver_chain(&self, node: Node, source: &str) -> Option<ReceiverChain> {
        flatten_attribute(node, source)
    }

    fn signature_text(&self, def_node: Node, source: &str) -> Option<Box<str>> {
        let end = def_node
            .child_by_field_name("body")
            .map(|b| b.start_byte())
            .unwrap_or_else(|| def_node.end_byte());
        source.get(def_node.start_byte()..end).map(|s| s.trim().into())
    }

    fn docstring(&self, def_node: Node, source: &str) -> Option<Box<str>> {
        let body = def_node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string_node = first.named_child(0)?;
        if string_node.kind() != "string" {
            return None;
        }
        let text = node_text(string_node, source);
        let trimmed = text
            .trim_start_matches("r")
            .trim_start_matches("\"\"\"")
            .trim_start_matches("'''")
            .trim_start_matches('"')
            .trim_start_matches('\'')
            .trim_end_matches("\"\"\"")
            .trim_end_matches("'''")
            .trim_end_matches('"')
            .trim_end_matches('\'')
            .trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.into())
        }
    }

    fn is_test_file(&self, path: &Path) -> bool {
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with("test_") || s.ends_with("_test"))
    }
}

fn is_method(node: Node) -> bool {
    node.parent()
        .and_then(|block| block.parent())
        .is_some_and(|p| p.kind() == "class_definition")
}

fn decorators_of(node: Node, source: &str) -> Vec<String> {
    let Some(parent) = node.parent() else { return Vec::new() };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut cursor = parent.walk();
    for child in parent.children(&mut cursor) {
        if child.kind() == "decorator" {
            out.push(node_text(child, source).to_string());
        }
    }
    out
}

fn python_visibility(name: &str) -> Visibility {
    if name.starts_with("__") && name.ends_with("__") {
        Visibility::Public
    } else if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn handle_function(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let owner = builder.current_class();
    let method = is_method(node);

    let kind = if !method {
        DefinitionKind::Function
    } else if name == "__init__" {
        DefinitionKind::Constructor
    } else {
        DefinitionKind::Method
    };

    let qualified_name = match &owner {
        Some(owner) => format!("{}#{}", owner.qualified_name(), name),
        None => name.to_string(),
    };

    let location = node_location(builder.file_path(), node);
    let decorators = decorators_of(node, source);
    let is_static = decorators.iter().any(|d| d.contains("staticmethod") || d.contains("classmethod"));

    let mut def = Definition::new(
        builder.file_path().clone(),
        &qualified_name,
        name,
        kind,
        location.clone(),
        builder.current_scope(),
    )
    .with_enclosing_range(location)
    .with_visibility(python_visibility(name));

    let module_level_export = owner.is_none() && matches!(python_visibility(name), Visibility::Public);
    if let Some(owner) = owner {
        def = def.with_owner_class(owner);
    }
    if is_static {
        def = def.static_member();
    }
    if module_level_export {
        def = def.exported();
    }

    let id = builder.push_definition(def);
    if module_level_export {
        builder.push_export(Export::local(name, id));
    }
}

/// The first base-class name out of `class X(Y, Metaclass=Z):`'s argument
/// list, skipping keyword arguments (`metaclass=...`) since those aren't
/// inheritance. `object` is kept as-is; C6 simply won't find a class by that
/// name and treats the chain as ended.
fn base_class_name<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    let args = node.child_by_field_name("superclasses")?;
    let mut cursor = args.walk();
    for arg in args.children(&mut cursor) {
        if arg.kind() == "identifier" {
            return Some(node_text(arg, source));
        }
    }
    None
}

fn handle_class(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let location = node_location(builder.file_path(), node);

    let mut def = Definition::new(
        builder.file_path().clone(),
        name,
        name,
        DefinitionKind::Class,
        location.clone(),
        builder.current_scope(),
    )
    .with_enclosing_range(location)
    .with_visibility(python_visibility(name));
    let module_level_export = builder.current_class().is_none() && matches!(python_visibility(name), Visibility::Public);
    if module_level_export {
        def = def.exported();
    }
    if let Some(superclass) = base_class_name(node, source) {
        def = def.with_superclass(superclass);
    }

    let id = builder.push_definition(def);
    builder.register_type(name, id.clone());
    if module_level_export {
        builder.push_export(Export::local(name, id.clone()));
    }
    builder.push_class(id);
}

fn handle_import(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let location = node_location(builder.file_path(), node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let path = node_text(child, source);
                let local_name = path.split('.').next().unwrap_or(path);
                let import = Import::new(path, ImportKind::Namespace, location.clone())
                    .with_binding(ImportBindingSpec::named(local_name));
                builder.push_import(import);
            }
            "aliased_import" => {
                let Some(name_node) = child.child_by_field_name("name") else { continue };
                let Some(alias_node) = child.child_by_field_name("alias") else { continue };
                let path = node_text(name_node, source);
                let alias = node_text(alias_node, source);
                let import = Import::new(path, ImportKind::Namespace, location.clone())
                    .with_binding(ImportBindingSpec::renamed(path, alias));
                builder.push_import(import);
            }
            _ => {}
        }
    }
}

fn handle_import_from(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let module = node_text(module_node, source);
    let location = node_location(builder.file_path(), node);
    let mut cursor = node.walk();
    let mut bindings = Vec::new();
    let mut is_wildcard = false;

    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" if child != module_node => {
                bindings.push(ImportBindingSpec::named(node_text(child, source)));
            }
            "aliased_import" => {
                let Some(name_node) = child.child_by_field_name("name") else { continue };
                let Some(alias_node) = child.child_by_field_name("alias") else { continue };
                bindings.push(ImportBindingSpec::renamed(
                    node_text(name_node, source),
                    node_text(alias_node, source),
                ));
            }
            "wildcard_import" => is_wildcard = true,
            _ => {}
        }
    }

    if is_wildcard {
        builder.push_import(Import::new(module, ImportKind::WildcardReexport, location));
        return;
    }

    // `from pkg import sub` is written identically whether `sub` is a name
    // defined in `pkg/__init__.py` or a submodule file `pkg/sub.py`; §4.1
    // says the latter must behave like a namespace import so `sub.f()`
    // resolves through the submodule's own exports. The binding is emitted
    // as a plain named import here; C5/C6 re-classify it as a namespace
    // handle once the registry can see whether `pkg/sub.py` actually exists.
    let mut import = Import::new(module, ImportKind::Named, location);
    for binding in bindings {
        import = import.with_binding(binding);
    }
    builder.push_import(import);
}

fn handle_property_assignment(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(lhs) = node.child_by_field_name("left") else {
        return;
    };
    if lhs.kind() != "attribute" {
        return;
    }
    let Some(object) = lhs.child_by_field_name("object") else {
        return;
    };
    let object_text = node_text(object, source);
    if object_text != "self" && object_text != "cls" {
        return;
    }
    let Some(attr) = lhs.child_by_field_name("attribute") else {
        return;
    };
    let name = node_text(attr, source);
    let Some(owner) = builder.current_class() else {
        return;
    };

    let qualified_name = format!("{}#{}", owner.qualified_name(), name);
    let location = node_location(builder.file_path(), lhs);
    let mut def = Definition::new(
        builder.file_path().clone(),
        &qualified_name,
        name,
        DefinitionKind::Property,
        location,
        builder.current_scope(),
    )
    .with_owner_class(owner);
    if let Some(hint) = constructor_type_hint(node, source) {
        def = def.with_type_hint(hint);
    }
    builder.push_definition(def);
}

/// §4.6 "for `x = Foo(...)` in any scope, the variable definition records
/// the same [type]" — handles the non-attribute, non-`self` case.
fn handle_variable_definition(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(lhs) = node.child_by_field_name("left") else {
        return;
    };
    if lhs.kind() != "identifier" {
        return;
    }
    let name = node_text(lhs, source);
    let location = node_location(builder.file_path(), lhs);
    let mut def = Definition::new(
        builder.file_path().clone(),
        name,
        name,
        DefinitionKind::Variable,
        location,
        builder.current_scope(),
    );
    if let Some(hint) = constructor_type_hint(node, source) {
        def = def.with_type_hint(hint);
    }
    builder.push_definition(def);
}

/// If `assignment`'s RHS is a bare `Name(...)` call, the class being
/// constructed is a usable type hint for the LHS (§4.6).
fn constructor_type_hint<'a>(assignment: Node, source: &'a str) -> Option<&'a str> {
    let rhs = assignment.child_by_field_name("right")?;
    if rhs.kind() != "call" {
        return None;
    }
    let func = rhs.child_by_field_name("function")?;
    if func.kind() == "identifier" {
        Some(node_text(func, source))
    } else {
        None
    }
}

fn handle_call(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(func) = node.child_by_field_name("function") else {
        return;
    };
    let arity = node
        .child_by_field_name("arguments")
        .map(|a| a.named_child_count() as u32)
        .unwrap_or(0);
    let location = node_location(builder.file_path(), node);

    match func.kind() {
        "identifier" => {
            let name = node_text(func, source);
            let is_construction = name.chars().next().is_some_and(|c| c.is_uppercase());
            let mut r = Reference::new(location, name, builder.current_scope(), ReferenceKind::Call)
                .with_call_arity(arity);
            if is_construction {
                r = r.constructed();
            }
            builder.push_reference(r);
        }
        "attribute" => {
            if let Some(chain) = flatten_attribute(func, source) {
                let name = chain.method_name().unwrap_or("").to_string();
                let r = Reference::new(location, name, builder.current_scope(), ReferenceKind::Call)
                    .with_receiver_chain(chain)
                    .with_call_arity(arity);
                builder.push_reference(r);
            }
        }
        _ => {}
    }
}

fn handle_member(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    if let Some(parent) = node.parent() {
        if parent.kind() == "call" && parent.child_by_field_name("function") == Some(node) {
            return;
        }
        if parent.kind() == "assignment" && parent.child_by_field_name("left") == Some(node) {
            return;
        }
    }
    let Some(chain) = flatten_attribute(node, source) else {
        return;
    };
    let name = chain.method_name().unwrap_or("").to_string();
    let location = node_location(builder.file_path(), node);
    let r = Reference::new(location, name, builder.current_scope(), ReferenceKind::MemberAccess)
        .with_receiver_chain(chain);
    builder.push_reference(r);
}

fn flatten_attribute(node: Node, source: &str) -> Option<ReceiverChain> {
    let mut segments: Vec<Box<str>> = Vec::new();
    collect_attribute_chain(node, source, &mut segments);
    if segments.is_empty() {
        return None;
    }
    let head = match segments.first().map(|s| s.as_ref()) {
        Some("self") => ReceiverHead::SelfKeyword,
        Some("cls") => ReceiverHead::Cls,
        _ => ReceiverHead::Identifier,
    };
    Some(ReceiverChain::new(head, segments))
}

fn collect_attribute_chain(node: Node, source: &str, out: &mut Vec<Box<str>>) {
    match node.kind() {
        "attribute" => {
            if let Some(object) = node.child_by_field_name("object") {
                collect_attribute_chain(object, source, out);
            }
            if let Some(attr) = node.child_by_field_name("attribute") {
                out.push(node_text(attr, source).into());
            }
        }
        "identifier" => out.push(node_text(node, source).into()),
        "call" => {
            if let Some(func) = node.child_by_field_name("function") {
                collect_attribute_chain(func, source, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::SingleFileIndexer;

    #[test]
    fn class_and_method_are_indexed_with_owner() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "class Db:\n    def __init__(self):\n        self.conn = None\n    def query(self):\n        return self.conn\n";
        let index = indexer.index("db.py", Language::Python, src);
        let class = index.defs.iter().find(|d| d.name.as_ref() == "Db").unwrap();
        let ctor = index.defs.iter().find(|d| d.name.as_ref() == "__init__").unwrap();
        assert_eq!(ctor.kind, DefinitionKind::Constructor);
        assert_eq!(ctor.data.owner_class.as_ref(), Some(&class.id));
        let prop = index.defs.iter().find(|d| d.name.as_ref() == "conn").unwrap();
        assert_eq!(prop.kind, DefinitionKind::Property);
    }

    #[test]
    fn from_import_with_alias_is_captured() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let index = indexer.index("a.py", Language::Python, "from os import path as p\n");
        assert_eq!(index.imports.len(), 1);
        assert_eq!(index.imports[0].source_module.as_ref(), "os");
        assert_eq!(index.imports[0].bindings[0].local_name.as_ref(), "p");
    }

    #[test]
    fn uppercase_call_is_treated_as_construction() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let index = indexer.index("a.py", Language::Python, "db = Database()\n");
        let r = index.refs.iter().find(|r| r.name.as_ref() == "Database").unwrap();
        assert!(r.is_construction);
    }
}
