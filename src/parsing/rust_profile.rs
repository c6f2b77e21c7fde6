//! C1 language profile for Rust (§4.1).
//!
//! One wrinkle the other profiles don't have: an `impl` block isn't a
//! definition of anything, it's a reopening of a struct/enum/trait already
//! declared elsewhere in the file. Methods inside it are attributed back to
//! that type by name through [`FileIndexBuilder::lookup_type`], so multiple
//! `impl` blocks for the same struct land in one `member_index` entry the
//! way the teacher's single flat symbol table would have seen them anyway.

use crate::file_index::FileIndexBuilder;
use crate::imports::{Import, ImportBindingSpec, ImportKind};
use crate::parsing::{node_location, node_text, CompiledQuery, Language, LanguageProfile};
use crate::reference::{ReceiverChain, ReceiverHead, Reference, ReferenceKind};
use crate::symbol::{Definition, DefinitionKind};
use crate::types::{Location, Visibility};
use std::path::Path;
use tree_sitter::{Node, Parser, Query};

const QUERY_SOURCE: &str = r#"
(function_item name: (identifier) @name) @definition.function
(function_signature_item name: (identifier) @name) @definition.function
(struct_item name: (type_identifier) @name) @definition.class
(enum_item name: (type_identifier) @name) @definition.class
(trait_item name: (type_identifier) @name) @definition.interface
(impl_item) @definition.impl
(field_declaration name: (field_identifier) @name) @definition.property
(enum_variant name: (identifier) @name) @definition.property
(function_item body: (block) @scope.function)
(mod_item name: (identifier) @name body: (declaration_list)) @definition.module
(mod_item name: (identifier) @name !body) @import.module
(use_declaration) @import.named
(call_expression) @reference.call
(field_expression) @reference.member
"#;

pub struct RustProfile {
    queries: Vec<CompiledQuery>,
}

impl RustProfile {
    pub fn new() -> Self {
        let language = tree_sitter_rust::LANGUAGE.into();
        let query = Query::new(&language, QUERY_SOURCE).expect("rust query set must compile");
        Self {
            queries: vec![CompiledQuery {
                name: "rust",
                query,
            }],
        }
    }
}

impl Default for RustProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageProfile for RustProfile {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn parse(&self, source: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).ok()?;
        parser.parse(source, None)
    }

    fn queries(&self) -> &[CompiledQuery] {
        &self.queries
    }

    fn handle_capture(&self, capture_name: &str, node: Node, source: &str, builder: &mut FileIndexBuilder) {
        match capture_name {
            "definition.function" => handle_function(node, source, builder),
            "definition.class" | "definition.interface" => handle_type_decl(capture_name, node, source, builder),
            "definition.impl" => handle_impl(node, source, builder),
            "definition.property" => handle_member(node, source, builder),
            "definition.module" => handle_mod_inline(node, source, builder),
            "import.module" => handle_mod_decl(node, source, builder),
            "import.named" => handle_use(node, source, builder),
            "reference.call" => handle_call(node, source, builder),
            "reference.member" => handle_field_access(node, source, builder),
            _ => {}
        }
    }

    fn receiver_chain(&self, node: Node, source: &str) -> Option<ReceiverChain> {
        flatten_field_expression(node, source)
    }

    fn signature_text(&self, def_node: Node, source: &str) -> Option<Box<str>> {
        let end = def_node
            .child_by_field_name("body")
            .map(|b| b.start_byte())
            .unwrap_or_else(|| def_node.end_byte());
        source
            .get(def_node.start_byte()..end)
            .map(|s| s.trim().into())
    }

    fn docstring(&self, def_node: Node, source: &str) -> Option<Box<str>> {
        extract_doc_comments(def_node, source).map(|s| s.into())
    }

    fn is_test_file(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "tests")
            || path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with("test_") || s == "tests")
    }
}

fn handle_function(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let is_method = node
        .parent()
        .and_then(|p| p.parent())
        .is_some_and(|gp| matches!(gp.kind(), "impl_item" | "trait_item"));

    let owner = builder.current_class();
    let qualified_name = qualify_free_name(builder, &owner, name);

    let location = node_location(builder.file_path(), node);
    let kind = if is_method { DefinitionKind::Method } else { DefinitionKind::Function };
    let visibility = rust_visibility(node);

    let mut def = Definition::new(
        builder.file_path().clone(),
        &qualified_name,
        name,
        kind,
        location.clone(),
        builder.current_scope(),
    )
    .with_enclosing_range(location)
    .with_visibility(visibility);

    if let Some(owner) = owner {
        def = def.with_owner_class(owner);
    }
    if matches!(visibility, Visibility::Public) {
        def = def.exported();
    }

    builder.push_definition(def);
}

fn handle_type_decl(capture_name: &str, node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let kind = match (capture_name, node.kind()) {
        (_, "enum_item") => DefinitionKind::Enum,
        ("definition.interface", _) => DefinitionKind::Interface,
        _ => DefinitionKind::Class,
    };
    let location = node_location(builder.file_path(), node);
    let visibility = rust_visibility(node);
    let qualified_name = qualify_free_name(builder, &None, name);

    let mut def = Definition::new(
        builder.file_path().clone(),
        &qualified_name,
        name,
        kind,
        location.clone(),
        builder.current_scope(),
    )
    .with_enclosing_range(location)
    .with_visibility(visibility);
    if matches!(visibility, Visibility::Public) {
        def = def.exported();
    }

    let id = builder.push_definition(def);
    builder.register_type(name, id.clone());
    builder.push_class(id);
}

/// §4.1 Rust: an inline `mod m { ... }` qualifies its free items as
/// `m::item` the way a class qualifies its methods as `Class#method`, so
/// `m::g()` calls and `m::g` crate paths resolve the same item (§8 scenario 3).
fn qualify_free_name(builder: &FileIndexBuilder, owner: &Option<crate::types::SymbolId>, name: &str) -> String {
    if let Some(owner) = owner {
        return format!("{}#{}", owner.qualified_name(), name);
    }
    match builder.namespace_prefix() {
        Some(prefix) => format!("{prefix}::{name}"),
        None => name.to_string(),
    }
}

/// `mod m { ... }` with an inline body: push `m` onto the namespace stack so
/// every free item declared inside gets qualified `m::item`. The module
/// itself is not a definition the data model has a kind for (§3 lists no
/// bare "module" kind); only its qualifying effect on children matters.
fn handle_mod_inline(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    builder.push_namespace(name);
}

/// `mod foo;` with no body: `foo`'s definitions live in a sibling file
/// (`foo.rs` or `foo/mod.rs`). Recorded as a namespace import so C5/C6 can
/// redirect `foo::bar()` to that file once the registry resolves the path.
fn handle_mod_decl(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let location = node_location(builder.file_path(), node);
    let import = Import::new(name, ImportKind::Namespace, location)
        .with_binding(ImportBindingSpec::named(name));
    builder.push_import(import);
}

fn handle_impl(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(type_node) = node.child_by_field_name("type") else {
        return;
    };
    let Some(type_name) = innermost_type_name(type_node, source) else {
        return;
    };
    if let Some(owner) = builder.lookup_type(type_name) {
        builder.push_class(owner);
    }
}

/// `impl Foo` and `impl<'a> Foo<'a>` both resolve to the bare type name;
/// walk past `generic_type`/`reference_type` wrappers to find the base
/// `type_identifier`.
fn innermost_type_name<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    if node.kind() == "type_identifier" {
        return Some(node_text(node, source));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(name) = innermost_type_name(child, source) {
            return Some(name);
        }
    }
    None
}

fn handle_member(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let owner = builder.current_class();
    let qualified_name = match &owner {
        Some(owner) => format!("{}#{}", owner.qualified_name(), name),
        None => name.to_string(),
    };
    let location = node_location(builder.file_path(), node);
    let mut def = Definition::new(
        builder.file_path().clone(),
        &qualified_name,
        name,
        DefinitionKind::Property,
        location,
        builder.current_scope(),
    );
    if let Some(owner) = owner {
        def = def.with_owner_class(owner);
    }
    // A field's declared type is a static hint enum variants don't carry
    // (`enum_variant` has no `type` field) — `field_declaration` does, and
    // since Rust is statically typed there is no need to infer this from an
    // assignment the way the dynamic-language profiles do (§4.6).
    if let Some(type_node) = node.child_by_field_name("type") {
        if let Some(type_name) = innermost_type_name(type_node, source) {
            def = def.with_type_hint(type_name);
        }
    }
    builder.push_definition(def);
}

fn rust_visibility(node: Node) -> Visibility {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "visibility_modifier" {
            return Visibility::Public;
        }
        if !matches!(child.kind(), "line_comment" | "block_comment" | "attribute_item") {
            break;
        }
    }
    Visibility::Private
}

fn handle_use(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let location = node_location(builder.file_path(), node);
    walk_use_tree(node, source, String::new(), &location, builder);
}

/// Walks a `use` declaration's tree. `node` may itself already be a leaf
/// path segment (a bare identifier/`self`/`super`/`crate` sitting directly
/// inside a `use_list`) or a structural node whose children carry the path
/// segments, an aliasing clause, a wildcard, or a nested brace list — the
/// grammar doesn't wrap every list item in a uniform node kind, so both
/// shapes are handled explicitly rather than assuming one.
fn walk_use_tree(node: Node, source: &str, prefix: String, location: &Location, builder: &mut FileIndexBuilder) {
    match node.kind() {
        "self" if !prefix.is_empty() => {
            // `use a::b::{self, ...}` binds the module path itself to its
            // own last segment (`b`), not to the literal text "self".
            let local_name = prefix.rsplit("::").next().unwrap_or(&prefix).to_string();
            emit_namespace_import(prefix, local_name, location, builder);
            return;
        }
        "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
            let mut path = prefix;
            let segment = node_text(node, source);
            if !path.is_empty() {
                path.push_str("::");
            }
            path.push_str(segment);
            emit_import(path, None, false, location, builder);
            return;
        }
        "use_wildcard" => {
            emit_import(prefix, None, true, location, builder);
            return;
        }
        "use_as_clause" => {
            if let (Some(path_node), Some(alias_node)) =
                (node.child_by_field_name("path"), node.child_by_field_name("alias"))
            {
                let mut path = prefix;
                let segment = node_text(path_node, source);
                if !path.is_empty() {
                    path.push_str("::");
                }
                path.push_str(segment);
                let alias = node_text(alias_node, source);
                emit_import(path, Some(alias), false, location, builder);
            }
            return;
        }
        "scoped_use_list" => {
            let mut path = prefix;
            if let Some(path_node) = node.child_by_field_name("path") {
                let segment = node_text(path_node, source);
                if !path.is_empty() {
                    path.push_str("::");
                }
                path.push_str(segment);
            }
            if let Some(list) = node.child_by_field_name("list") {
                for item in list.children(&mut list.walk()) {
                    if matches!(item.kind(), "," | "{" | "}") {
                        continue;
                    }
                    walk_use_tree(item, source, path.clone(), location, builder);
                }
            }
            return;
        }
        _ => {}
    }

    let mut path = prefix.clone();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
                let segment = node_text(child, source);
                if !path.is_empty() {
                    path.push_str("::");
                }
                path.push_str(segment);
            }
            "use_as_clause" | "use_wildcard" | "scoped_use_list" => {
                walk_use_tree(child, source, path.clone(), location, builder);
                return;
            }
            "use_list" => {
                for item in child.children(&mut child.walk()) {
                    if matches!(item.kind(), "," | "{" | "}") {
                        continue;
                    }
                    walk_use_tree(item, source, path.clone(), location, builder);
                }
                return;
            }
            _ => {}
        }
    }
    if !path.is_empty() && path != prefix {
        emit_import(path, None, false, location, builder);
    }
}

/// Emit the namespace-handle import a bare `self` inside a `use a::b::{self, ...}`
/// list produces: `b` becomes a local name bound to the module `a::b`.
fn emit_namespace_import(path: String, local_name: String, location: &Location, builder: &mut FileIndexBuilder) {
    let binding = ImportBindingSpec::named(local_name);
    push_import_with_binding_defs(path, ImportKind::Namespace, vec![binding], location, builder);
}

fn emit_import(path: String, alias: Option<&str>, is_glob: bool, location: &Location, builder: &mut FileIndexBuilder) {
    let local_name = alias
        .map(|a| a.to_string())
        .unwrap_or_else(|| path.rsplit("::").next().unwrap_or(&path).to_string());
    let kind = if is_glob { ImportKind::WildcardReexport } else { ImportKind::Named };
    let bindings = if is_glob {
        Vec::new()
    } else {
        vec![match alias {
            Some(_) => ImportBindingSpec::renamed(path.rsplit("::").next().unwrap_or(&path), local_name),
            None => ImportBindingSpec::named(local_name),
        }]
    };
    push_import_with_binding_defs(path, kind, bindings, location, builder);
}

/// Assembles an `Import` from its module path, kind and bindings and pushes
/// it. `FileIndexBuilder::push_import` emits the §3-required
/// `import_binding` definition for each binding in the module's root scope.
fn push_import_with_binding_defs(
    path: String,
    kind: ImportKind,
    bindings: Vec<ImportBindingSpec>,
    location: &Location,
    builder: &mut FileIndexBuilder,
) {
    let mut import = Import::new(path, kind, location.clone());
    for binding in bindings {
        import = import.with_binding(binding);
    }
    builder.push_import(import);
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
            let r = Reference::new(location, name, builder.current_scope(), ReferenceKind::Call)
                .with_call_arity(arity);
            builder.push_reference(r);
        }
        "field_expression" => {
            if let Some(chain) = flatten_field_expression(func, source) {
                let name = chain.method_name().unwrap_or("").to_string();
                let r = Reference::new(location, name, builder.current_scope(), ReferenceKind::Call)
                    .with_receiver_chain(chain)
                    .with_call_arity(arity);
                builder.push_reference(r);
            }
        }
        "scoped_identifier" => {
            let text = node_text(func, source);
            let segments: Vec<Box<str>> = text.split("::").map(Box::from).collect();
            let name = segments.last().cloned().unwrap_or_else(|| text.into());
            let head = match segments.first().map(|s| s.as_ref()) {
                Some("crate") => ReceiverHead::Crate,
                Some("Self") => ReceiverHead::SelfKeyword,
                _ => ReceiverHead::Identifier,
            };
            let is_construction = name.as_ref() == "new";
            let mut r = Reference::new(location, name, builder.current_scope(), ReferenceKind::Call)
                .with_receiver_chain(ReceiverChain::new(head, segments))
                .with_call_arity(arity);
            if is_construction {
                r = r.constructed();
            }
            builder.push_reference(r);
        }
        _ => {}
    }
}

fn handle_field_access(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    // Parent call_expressions already emit a `reference.call`; only emit a
    // plain member access here when this field_expression is not itself the
    // `function` of a surrounding call (avoids double-counting `a.b()`).
    if let Some(parent) = node.parent() {
        if parent.kind() == "call_expression" && parent.child_by_field_name("function") == Some(node) {
            return;
        }
    }
    let Some(chain) = flatten_field_expression(node, source) else {
        return;
    };
    let name = chain.method_name().unwrap_or("").to_string();
    let location = node_location(builder.file_path(), node);
    let r = Reference::new(location, name, builder.current_scope(), ReferenceKind::MemberAccess)
        .with_receiver_chain(chain);
    builder.push_reference(r);
}

fn flatten_field_expression(node: Node, source: &str) -> Option<ReceiverChain> {
    let mut segments: Vec<Box<str>> = Vec::new();
    collect_field_chain(node, source, &mut segments);
    if segments.is_empty() {
        return None;
    }
    let head = match segments.first().map(|s| s.as_ref()) {
        Some("self") => ReceiverHead::SelfKeyword,
        Some("Self") => ReceiverHead::SelfKeyword,
        Some("super") => ReceiverHead::Super,
        Some("crate") => ReceiverHead::Crate,
        _ => ReceiverHead::Identifier,
    };
    Some(ReceiverChain::new(head, segments))
}

fn collect_field_chain(node: Node, source: &str, out: &mut Vec<Box<str>>) {
    match node.kind() {
        "field_expression" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_field_chain(value, source, out);
            }
            if let Some(field) = node.child_by_field_name("field") {
                out.push(node_text(field, source).into());
            }
        }
        "identifier" | "self" | "super" | "crate" => {
            out.push(node_text(node, source).into());
        }
        "call_expression" => {
            if let Some(func) = node.child_by_field_name("function") {
                collect_field_chain(func, source, out);
            }
        }
        _ => {}
    }
}

fn extract_doc_comments(node: Node, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        match sibling.kind() {
            "line_comment" => {
                let text = node_text(sibling, source);
                if text.starts_with("///") && !text.starts_with("////") {
                    lines.push(text.trim_start_matches("///").trim().to_string());
                } else {
                    break;
                }
            }
            "block_comment" => {
                let text = node_text(sibling, source);
                if text.starts_with("/**") && !text.starts_with("/***") && text != "/**/" {
                    lines.push(text.trim_start_matches("/**").trim_end_matches("*/").trim().to_string());
                } else {
                    break;
                }
            }
            "attribute_item" => {}
            _ => break,
        }
        current = sibling.prev_sibling();
    }
    if lines.is_empty() {
        None
    } else {
        lines.reverse();
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::SingleFileIndexer;

    #[test]
    fn function_and_struct_are_indexed() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "pub struct Db { conn: i32 }\n\nimpl Db {\n    pub fn query(&self) -> i32 { self.conn }\n}\n";
        let index = indexer.index("db.rs", Language::Rust, src);
        let class = index.defs.iter().find(|d| d.name.as_ref() == "Db").expect("struct indexed");
        let method = index.defs.iter().find(|d| d.name.as_ref() == "query").expect("method indexed");
        assert_eq!(method.data.owner_class.as_ref(), Some(&class.id));
        assert_eq!(method.kind, DefinitionKind::Method);
    }

    #[test]
    fn use_declaration_produces_an_import() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "use std::collections::HashMap;\nfn main() {}\n";
        let index = indexer.index("main.rs", Language::Rust, src);
        assert_eq!(index.imports.len(), 1);
        assert_eq!(index.imports[0].source_module.as_ref(), "std::collections::HashMap");
    }

    #[test]
    fn self_field_call_produces_a_receiver_chain() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "struct Db;\nimpl Db {\n    fn run(&self) { self.pool.exec(); }\n}\n";
        let index = indexer.index("db.rs", Language::Rust, src);
        let call = index
            .refs
            .iter()
            .find(|r| r.name.as_ref() == "exec")
            .expect("call reference present");
        let chain = call.receiver_chain.as_ref().expect("receiver chain present");
        assert_eq!(chain.head, ReceiverHead::SelfKeyword);
        assert_eq!(chain.method_name(), Some("exec"));
    }
}
