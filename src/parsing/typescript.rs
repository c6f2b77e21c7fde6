//! C1 language profile shared by TypeScript and JavaScript (§4.1).
//!
//! The two grammars agree on almost everything this profile cares about;
//! the handful of TS-only constructs (`interface`, `type` aliases) are
//! appended to the query set only when [`Language::TypeScript`] is selected,
//! so a plain JS file never compiles a pattern its grammar can't match.

use crate::file_index::FileIndexBuilder;
use crate::imports::{Import, ImportBindingSpec, ImportKind};
use crate::exports::Export;
use crate::parsing::{node_location, node_text, CompiledQuery, Language, LanguageProfile};
use crate::reference::{ReceiverChain, ReceiverHead, Reference, ReferenceKind};
use crate::symbol::{Definition, DefinitionKind};
use crate::types::Visibility;
use std::path::Path;
use tree_sitter::{Node, Parser, Query};

const SHARED_QUERY_SOURCE: &str = r#"
(function_declaration name: (identifier) @name) @definition.function
(generator_function_declaration name: (identifier) @name) @definition.function
(variable_declarator name: (identifier) @name value: (arrow_function)) @definition.function
(variable_declarator name: (identifier) @name value: (function_expression)) @definition.function
(class_declaration name: (identifier) @name) @definition.class
(class_declaration body: (class_body) @scope.class)
(method_definition name: (property_identifier) @name) @definition.function
(function_declaration body: (statement_block) @scope.function)
(function_expression body: (statement_block) @scope.function)
(arrow_function body: (statement_block) @scope.function)
(method_definition body: (statement_block) @scope.function)
(field_definition name: (property_identifier) @name) @definition.property
(variable_declarator name: (identifier) @name value: (new_expression)) @definition.variable
(import_statement) @import.named
(export_statement) @export.named
(call_expression) @reference.call
(member_expression) @reference.member
(catch_clause) @scope.catch
(for_in_statement) @scope.for
"#;

const TS_EXTRA_QUERY_SOURCE: &str = r#"
(interface_declaration name: (type_identifier) @name) @definition.interface
(type_alias_declaration name: (type_identifier) @name) @definition.type_alias
(public_field_definition name: (property_identifier) @name) @definition.property
"#;

pub struct TypeScriptProfile {
    language: Language,
    queries: Vec<CompiledQuery>,
}

impl TypeScriptProfile {
    pub fn new(language: Language) -> Self {
        let mut source = SHARED_QUERY_SOURCE.to_string();
        if language == Language::TypeScript {
            source.push_str(TS_EXTRA_QUERY_SOURCE);
        }

        let query = if language == Language::TypeScript {
            let grammar = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
            Query::new(&grammar, &source).expect("typescript query set must compile")
        } else {
            let grammar = tree_sitter_javascript::LANGUAGE.into();
            Query::new(&grammar, &source).expect("javascript query set must compile")
        };

        Self {
            language,
            queries: vec![CompiledQuery { name: "typescript_family", query }],
        }
    }
}

impl LanguageProfile for TypeScriptProfile {
    fn language(&self) -> Language {
        self.language
    }

    fn parse(&self, source: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        if self.language == Language::TypeScript {
            parser.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()).ok()?;
        } else {
            parser.set_language(&tree_sitter_javascript::LANGUAGE.into()).ok()?;
        }
        parser.parse(source, None)
    }

    fn queries(&self) -> &[CompiledQuery] {
        &self.queries
    }

    fn handle_capture(&self, capture_name: &str, node: Node, source: &str, builder: &mut FileIndexBuilder) {
        match capture_name {
            "definition.function" => handle_function(node, source, builder),
            "definition.class" => handle_class(node, source, builder),
            "definition.interface" => handle_interface(node, source, builder),
            "definition.type_alias" => handle_type_alias(node, source, builder),
            "definition.property" => handle_property(node, source, builder),
            "definition.variable" => handle_variable_definition(node, source, builder),
            "import.named" => handle_import(node, source, builder),
            "export.named" => handle_export(node, source, builder),
            "reference.call" => handle_call(node, source, builder),
            "reference.member" => handle_member(node, source, builder),
            _ => {}
        }
    }

    fn receiver_chain(&self, node: Node, source: &str) -> Option<ReceiverChain> {
        flatten_member_expression(node, source)
    }

    fn signature_text(&self, def_node: Node, source: &str) -> Option<Box<str>> {
        let end = def_node
            .child_by_field_name("body")
            .map(|b| b.start_byte())
            .unwrap_or_else(|| def_node.end_byte());
        source.get(def_node.start_byte()..end).map(|s| s.trim().into())
    }

    fn docstring(&self, def_node: Node, source: &str) -> Option<Box<str>> {
        let mut sibling = def_node.prev_sibling();
        // A variable_declarator's doc comment sits before the enclosing
        // lexical_declaration, not before the declarator itself.
        if let Some(parent) = def_node.parent() {
            if parent.kind() == "variable_declarator" {
                sibling = parent.parent().and_then(|d| d.prev_sibling());
            }
        }
        let comment = sibling?;
        if comment.kind() != "comment" {
            return None;
        }
        let text = node_text(comment, source);
        if !text.starts_with("/**") {
            return None;
        }
        let cleaned: Vec<&str> = text
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .lines()
            .map(|l| l.trim().trim_start_matches('*').trim())
            .filter(|l| !l.is_empty())
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.join("\n").into())
        }
    }

    fn is_test_file(&self, path: &Path) -> bool {
        path.file_stem().and_then(|s| s.to_str()).is_some_and(|s| {
            s.ends_with(".test") || s.ends_with(".spec") || s == "test" || s == "tests"
        }) || path.components().any(|c| c.as_os_str() == "__tests__")
    }
}

fn is_method(node: Node) -> bool {
    node.parent().is_some_and(|p| p.kind() == "class_body")
}

/// True if `node` (a declaration) sits directly under an `export_statement`,
/// walking up through the `variable_declarator` -> `lexical_declaration`
/// chain a `const foo = ...` export goes through.
fn is_exported_decl(node: Node) -> bool {
    let mut cur = Some(node);
    for _ in 0..4 {
        let Some(n) = cur else { break };
        if n.kind() == "export_statement" {
            return true;
        }
        cur = n.parent();
    }
    false
}

fn ts_visibility(node: Node, source: &str) -> Visibility {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match node_text(child, source) {
            "private" => return Visibility::Private,
            "protected" => return Visibility::Protected,
            "public" => return Visibility::Public,
            _ => {}
        }
    }
    Visibility::Public
}

fn handle_function(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let def_node = node;
    let method = is_method(def_node);
    let owner = builder.current_class();

    let kind = if !method {
        DefinitionKind::Function
    } else if name == "constructor" {
        DefinitionKind::Constructor
    } else {
        DefinitionKind::Method
    };

    let qualified_name = match &owner {
        Some(owner) => format!("{}#{}", owner.qualified_name(), name),
        None => name.to_string(),
    };

    let location = node_location(builder.file_path(), def_node);
    let is_static = method
        && def_node
            .children(&mut def_node.walk())
            .any(|c| node_text(c, source) == "static");

    let mut def = Definition::new(
        builder.file_path().clone(),
        &qualified_name,
        name,
        kind,
        location.clone(),
        builder.current_scope(),
    )
    .with_enclosing_range(location)
    .with_visibility(ts_visibility(def_node, source));

    let exported = !method && is_exported_decl(def_node);
    if exported {
        def = def.exported();
    }
    if let Some(owner) = owner {
        def = def.with_owner_class(owner);
    }
    if is_static {
        def = def.static_member();
    }

    let id = builder.push_definition(def);
    if exported {
        builder.push_export(Export::local(name, id));
    }
}

/// A `class X extends Y` (and, for TS, `implements`-only classes have no
/// heritage at all) superclass name, read directly off the node rather than
/// via a second query pattern so the same `class_declaration` never matches
/// `definition.class` twice. `class_heritage` is a plain child, not a named
/// field, on this grammar.
fn extends_superclass<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let mut heritage_cursor = child.walk();
        for clause in child.children(&mut heritage_cursor) {
            if clause.kind() == "extends_clause" {
                let mut clause_cursor = clause.walk();
                for value in clause.children(&mut clause_cursor) {
                    if value.kind() == "identifier" || value.kind() == "member_expression" {
                        return Some(node_text(value, source));
                    }
                }
            }
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
    .with_visibility(Visibility::Public);
    let exported = is_exported_decl(node);
    if exported {
        def = def.exported();
    }
    if let Some(superclass) = extends_superclass(node, source) {
        def = def.with_superclass(superclass);
    }

    let id = builder.push_definition(def);
    builder.register_type(name, id.clone());
    if exported {
        builder.push_export(Export::local(name, id.clone()));
    }
    builder.push_class(id);
}

fn handle_interface(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let location = node_location(builder.file_path(), node);
    let mut def = Definition::new(
        builder.file_path().clone(),
        name,
        name,
        DefinitionKind::Interface,
        location.clone(),
        builder.current_scope(),
    )
    .with_enclosing_range(location)
    .with_visibility(Visibility::Public);
    let exported = is_exported_decl(node);
    if exported {
        def = def.exported();
    }
    let id = builder.push_definition(def);
    if exported {
        builder.push_export(Export::local(name, id));
    }
}

fn handle_type_alias(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let location = node_location(builder.file_path(), node);
    let mut def = Definition::new(
        builder.file_path().clone(),
        name,
        name,
        DefinitionKind::TypeAlias,
        location,
        builder.current_scope(),
    )
    .with_visibility(Visibility::Public);
    let exported = is_exported_decl(node);
    if exported {
        def = def.exported();
    }
    let id = builder.push_definition(def);
    if exported {
        builder.push_export(Export::local(name, id));
    }
}

fn handle_property(node: Node, source: &str, builder: &mut FileIndexBuilder) {
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
    )
    .with_visibility(ts_visibility(node, source));
    if let Some(owner) = owner {
        def = def.with_owner_class(owner);
    }
    // §4.6 step 2: a property's type hint comes from its declared annotation
    // (`private db: Database;`) where present, else from a constructor
    // assignment on the same declaration (`private db = new Database();`),
    // mirroring python.rs's `constructor_type_hint` for the dynamic case.
    let hint = node
        .child_by_field_name("type")
        .and_then(|t| ts_innermost_type_name(t, source))
        .or_else(|| ts_constructor_type_hint(node, source));
    if let Some(hint) = hint {
        def = def.with_type_hint(hint);
    }
    builder.push_definition(def);
}

/// §4.6 step 1: `const db = new Database();` carries enough of a type hint
/// from its constructor call that a later `db.query()` can resolve through
/// `Database`'s own method table, the same way python.rs's
/// `handle_variable_definition`/`constructor_type_hint` infers from
/// `x = Foo(...)`.
fn handle_variable_definition(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    let location = node_location(builder.file_path(), node);
    let mut def = Definition::new(
        builder.file_path().clone(),
        name,
        name,
        DefinitionKind::Variable,
        location,
        builder.current_scope(),
    );
    if let Some(hint) = ts_constructor_type_hint(node, source) {
        def = def.with_type_hint(hint);
    }
    builder.push_definition(def);
}

/// If `declarator`'s value (or a `field_definition`'s initializer) is a bare
/// `new Name(...)`, the class being constructed is a usable type hint.
fn ts_constructor_type_hint<'a>(declarator: Node, source: &'a str) -> Option<&'a str> {
    let value = declarator.child_by_field_name("value")?;
    if value.kind() != "new_expression" {
        return None;
    }
    let constructor = value.child_by_field_name("constructor")?;
    if constructor.kind() == "identifier" {
        Some(node_text(constructor, source))
    } else {
        None
    }
}

/// Walk a type-annotation node down to the base type name, the way
/// rust_profile.rs's `innermost_type_name` walks past `generic_type`/
/// `reference_type` wrappers — `Database`, `Array<Database>`, and
/// `ns.Database` all resolve to their outermost `type_identifier`.
fn ts_innermost_type_name<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    if node.kind() == "type_identifier" {
        return Some(node_text(node, source));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(name) = ts_innermost_type_name(child, source) {
            return Some(name);
        }
    }
    None
}

fn handle_import(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    let Some(source_node) = node.child_by_field_name("source") else {
        return;
    };
    let module = module_string(source_node, source);
    let location = node_location(builder.file_path(), node);
    let Some(clause) = node.child_by_field_name("import_clause") else {
        builder.push_import(Import::new(module, ImportKind::SideEffect, location));
        return;
    };

    let mut import: Option<Import> = None;
    let mut cursor = clause.walk();
    for part in std::iter::once(clause).chain(clause.children(&mut cursor)) {
        match part.kind() {
            "identifier" => {
                let name = node_text(part, source);
                import = Some(
                    import
                        .unwrap_or_else(|| Import::new(module.clone(), ImportKind::Default, location.clone()))
                        .with_binding(ImportBindingSpec::named(name)),
                );
            }
            "namespace_import" => {
                if let Some(ident) = part.named_child(0) {
                    let name = node_text(ident, source);
                    import = Some(
                        Import::new(module.clone(), ImportKind::Namespace, location.clone())
                            .with_binding(ImportBindingSpec::named(name)),
                    );
                }
            }
            "named_imports" => {
                let mut named = import
                    .take()
                    .map(|i| Import::new(i.source_module, ImportKind::Named, location.clone()))
                    .unwrap_or_else(|| Import::new(module.clone(), ImportKind::Named, location.clone()));
                let mut spec_cursor = part.walk();
                for spec in part.children(&mut spec_cursor) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name_node) = spec.child_by_field_name("name") else { continue };
                    let imported = node_text(name_node, source);
                    let binding = match spec.child_by_field_name("alias") {
                        Some(alias) => ImportBindingSpec::renamed(imported, node_text(alias, source)),
                        None => ImportBindingSpec::named(imported),
                    };
                    named = named.with_binding(binding);
                }
                import = Some(named);
            }
            _ => {}
        }
    }

    builder.push_import(import.unwrap_or_else(|| Import::new(module, ImportKind::SideEffect, location)));
}

fn handle_export(node: Node, source: &str, builder: &mut FileIndexBuilder) {
    if let Some(source_node) = node.child_by_field_name("source") {
        let module = module_string(source_node, source);
        if let Some(clause) = node.child_by_field_name("export_clause") {
            let mut cursor = clause.walk();
            for spec in clause.children(&mut cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let Some(name_node) = spec.child_by_field_name("name") else { continue };
                let exported_name = spec
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, source))
                    .unwrap_or_else(|| node_text(name_node, source));
                builder.push_export(Export::reexport(exported_name, module.clone()));
            }
        } else {
            // `export * from './mod'`
            builder.push_export(Export::reexport("*", module));
        }
        return;
    }

    if let Some(clause) = node.child_by_field_name("export_clause") {
        let mut cursor = clause.walk();
        for spec in clause.children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else { continue };
            let local = node_text(name_node, source);
            let exported_name = spec
                .child_by_field_name("alias")
                .map(|a| node_text(a, source))
                .unwrap_or(local);
            if let Some(id) = builder.lookup_type(local) {
                builder.push_export(Export::local(exported_name, id));
            }
        }
    }
}

fn module_string(source_node: Node, source: &str) -> Box<str> {
    let text = node_text(source_node, source);
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').into()
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
        "member_expression" => {
            if let Some(chain) = flatten_member_expression(func, source) {
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
        if parent.kind() == "call_expression" && parent.child_by_field_name("function") == Some(node) {
            return;
        }
    }
    let Some(chain) = flatten_member_expression(node, source) else {
        return;
    };
    let name = chain.method_name().unwrap_or("").to_string();
    let location = node_location(builder.file_path(), node);
    let r = Reference::new(location, name, builder.current_scope(), ReferenceKind::MemberAccess)
        .with_receiver_chain(chain);
    builder.push_reference(r);
}

fn flatten_member_expression(node: Node, source: &str) -> Option<ReceiverChain> {
    let mut segments: Vec<Box<str>> = Vec::new();
    collect_member_chain(node, source, &mut segments);
    if segments.is_empty() {
        return None;
    }
    let head = match segments.first().map(|s| s.as_ref()) {
        Some("this") => ReceiverHead::This,
        Some("super") => ReceiverHead::Super,
        _ => ReceiverHead::Identifier,
    };
    Some(ReceiverChain::new(head, segments))
}

fn collect_member_chain(node: Node, source: &str, out: &mut Vec<Box<str>>) {
    match node.kind() {
        "member_expression" => {
            if let Some(object) = node.child_by_field_name("object") {
                collect_member_chain(object, source, out);
            }
            if let Some(prop) = node.child_by_field_name("property") {
                out.push(node_text(prop, source).into());
            }
        }
        "identifier" | "this" | "super" => out.push(node_text(node, source).into()),
        "call_expression" => {
            if let Some(func) = node.child_by_field_name("function") {
                collect_member_chain(func, source, out);
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
    fn class_method_is_indexed_with_owner() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "class Db {\n  constructor() { this.pool = null; }\n  query() { return this.pool.exec(); }\n}\n";
        let index = indexer.index("db.ts", Language::TypeScript, src);
        let class = index.defs.iter().find(|d| d.name.as_ref() == "Db").unwrap();
        let ctor = index.defs.iter().find(|d| d.kind == DefinitionKind::Constructor).unwrap();
        assert_eq!(ctor.data.owner_class.as_ref(), Some(&class.id));
        let method = index.defs.iter().find(|d| d.name.as_ref() == "query").unwrap();
        assert_eq!(method.data.owner_class.as_ref(), Some(&class.id));
    }

    #[test]
    fn named_import_is_captured() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let index = indexer.index("a.ts", Language::TypeScript, "import { Foo, Bar as Baz } from './mod';\n");
        assert_eq!(index.imports.len(), 1);
        assert_eq!(index.imports[0].bindings.len(), 2);
        assert_eq!(index.imports[0].source_module.as_ref(), "./mod");
    }

    #[test]
    fn interface_is_indexed_in_typescript_only() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let index = indexer.index("a.ts", Language::TypeScript, "interface Point { x: number; y: number; }\n");
        assert!(index.defs.iter().any(|d| d.kind == DefinitionKind::Interface));
    }

    #[test]
    fn declared_property_type_is_recorded_as_a_type_hint() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "class Service {\n  private db: Database;\n  run() { return this.db.query(); }\n}\n";
        let index = indexer.index("a.ts", Language::TypeScript, src);
        let db = index.defs.iter().find(|d| d.name.as_ref() == "db").unwrap();
        assert_eq!(db.kind, DefinitionKind::Property);
        assert_eq!(db.data.type_hint_name.as_deref(), Some("Database"));
    }

    #[test]
    fn constructed_variable_records_a_type_hint() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "const db = new Database();\ndb.query();\n";
        let index = indexer.index("a.ts", Language::TypeScript, src);
        let db = index.defs.iter().find(|d| d.name.as_ref() == "db").unwrap();
        assert_eq!(db.kind, DefinitionKind::Variable);
        assert_eq!(db.data.type_hint_name.as_deref(), Some("Database"));
    }
}
