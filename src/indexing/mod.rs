//! C3: single-file indexing. Runs a language profile's queries over a parsed
//! tree and replays every capture, in tree order, against a
//! [`FileIndexBuilder`] — the only place scope nesting and definition/class
//! context are tracked during that replay.

mod scope_builder;

use crate::file_index::{Diagnostic, DiagnosticKind, FileIndex, FileIndexBuilder};
use crate::parsing::{node_location, profile_for, CaptureSchema, Language, LanguageProfile};
use crate::types::{file_path, FilePath, Location};
use std::collections::HashMap;
use tree_sitter::{Node, QueryCursor};

/// Indexes one file's source into a [`FileIndex`] (§4.3).
pub struct SingleFileIndexer {
    max_file_size_bytes: usize,
}

impl SingleFileIndexer {
    pub fn new(max_file_size_bytes: usize) -> Self {
        Self { max_file_size_bytes }
    }

    pub fn index(&self, path: impl AsRef<str>, language: Language, source: &str) -> FileIndex {
        let path: FilePath = file_path(path);
        let profile = profile_for(language);

        let Some(tree) = profile.parse(source) else {
            let mut builder = FileIndexBuilder::new(
                path.clone(),
                language,
                source,
                Location::new(path.clone(), 1, 0, 1, 0),
            );
            builder.mark_partial();
            builder.push_diagnostic(Diagnostic::new(
                DiagnosticKind::ParseError,
                "tree-sitter returned no tree for this file",
            ));
            return builder.finish();
        };

        let root = tree.root_node();
        let root_range = node_location(&path, root);
        let mut builder = FileIndexBuilder::new(path.clone(), language, source, root_range);

        if root.has_error() {
            builder.mark_partial();
            builder.push_diagnostic(Diagnostic::new(
                DiagnosticKind::PartialParse,
                "tree-sitter recovered from one or more syntax errors",
            ));
        }

        if source.len() > self.max_file_size_bytes {
            builder.mark_partial();
            builder.push_diagnostic(Diagnostic::new(
                DiagnosticKind::FileSizeExceeded,
                format!(
                    "{} bytes exceeds the {} byte indexing limit; indexed best-effort",
                    source.len(),
                    self.max_file_size_bytes
                ),
            ));
        }

        let captures = collect_captures(profile.as_ref(), root, source);
        walk(root, profile.as_ref(), &captures, source, &mut builder);

        builder.finish()
    }
}

/// Run every named query once and bucket captures by the id of the node they
/// landed on, preserving each query's own internal ordering.
fn collect_captures<'tree>(
    profile: &dyn LanguageProfile,
    root: Node<'tree>,
    source: &str,
) -> HashMap<usize, Vec<(Box<str>, Node<'tree>)>> {
    let mut by_node: HashMap<usize, Vec<(Box<str>, Node<'tree>)>> = HashMap::new();
    let mut cursor = QueryCursor::new();

    for compiled in profile.queries() {
        let names = compiled.query.capture_names();
        let matches = cursor.matches(&compiled.query, root, source.as_bytes());
        for m in matches {
            for capture in m.captures {
                let name = names[capture.index as usize];
                by_node
                    .entry(capture.node.id())
                    .or_default()
                    .push((name.into(), capture.node));
            }
        }
    }

    by_node
}

/// Pre-order walk of the whole tree. At each node, captures landing on it are
/// replayed against `builder` before descending into its children; scope and
/// class context opened while processing a node are torn down again once its
/// whole subtree has been visited, so nesting always matches the tree's own
/// nesting regardless of query match order.
fn walk(
    node: Node,
    profile: &dyn LanguageProfile,
    captures: &HashMap<usize, Vec<(Box<str>, Node)>>,
    source: &str,
    builder: &mut FileIndexBuilder,
) {
    let prev_scope = builder.current_scope();
    let prev_class_len = builder.class_stack_len();
    let prev_namespace_len = builder.namespace_stack_len();

    if let Some(hits) = captures.get(&node.id()) {
        for (name, cap_node) in hits {
            match CaptureSchema::parse(name) {
                Some(CaptureSchema::Scope(sub)) => {
                    let kind = scope_builder::scope_kind_from_capture(&sub);
                    let range = node_location(builder.file_path(), *cap_node);
                    let parent = builder.current_scope();
                    let opened = builder.open_scope(kind, parent, range);
                    builder.set_current_scope(opened);
                }
                Some(_) => profile.handle_capture(name, *cap_node, source, builder),
                None => {}
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, profile, captures, source, builder);
    }

    builder.set_current_scope(prev_scope);
    builder.truncate_class_stack(prev_class_len);
    builder.truncate_namespace_stack(prev_namespace_len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_a_simple_rust_function() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let index = indexer.index("a.rs", Language::Rust, "fn add(a: i32, b: i32) -> i32 { a + b }");
        assert!(!index.partial);
        assert!(index.defs.iter().any(|d| d.name.as_ref() == "add"));
    }

    #[test]
    fn indexes_a_simple_python_class_with_a_method() {
        let indexer = SingleFileIndexer::new(32 * 1024);
        let src = "class Db:\n    def query(self):\n        return 1\n";
        let index = indexer.index("a.py", Language::Python, src);
        assert!(index.defs.iter().any(|d| d.name.as_ref() == "Db"));
        assert!(index.defs.iter().any(|d| d.name.as_ref() == "query"));
        let class_id = index.defs.iter().find(|d| d.name.as_ref() == "Db").unwrap().id.clone();
        assert!(index.member_index.get(&class_id).is_some());
    }

    #[test]
    fn oversized_source_is_marked_partial_but_still_indexed() {
        let indexer = SingleFileIndexer::new(8);
        let index = indexer.index("a.rs", Language::Rust, "fn add() -> i32 { 1 }");
        assert!(index.partial);
        assert!(index.defs.iter().any(|d| d.name.as_ref() == "add"));
    }
}
