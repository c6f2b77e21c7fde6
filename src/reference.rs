//! References: uses of a name (§3 "Reference").

use crate::types::{Location, ScopeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Read,
    Write,
    Call,
    TypeRef,
    MemberAccess,
}

/// Classifies the head of a receiver chain (`a.b.c()` -> head `a`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiverHead {
    SelfKeyword,
    This,
    Cls,
    Super,
    Crate,
    Identifier,
}

/// Ordered identifier chain on the left of a call, e.g. `self.db.query()`
/// flattens to `["self", "db", "query"]` with `head = SelfKeyword`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverChain {
    pub head: ReceiverHead,
    /// Full chain including the head and the final invoked name.
    pub segments: Vec<Box<str>>,
}

impl ReceiverChain {
    pub fn new(head: ReceiverHead, segments: Vec<Box<str>>) -> Self {
        Self { head, segments }
    }

    /// Attribute steps strictly between the head and the final invoked name.
    pub fn middle_steps(&self) -> &[Box<str>] {
        if self.segments.len() <= 2 {
            &[]
        } else {
            &self.segments[1..self.segments.len() - 1]
        }
    }

    /// The name being invoked (the last segment).
    pub fn method_name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub location: Location,
    pub name: Box<str>,
    pub scope_id: ScopeId,
    pub kind: ReferenceKind,
    pub receiver_chain: Option<ReceiverChain>,
    pub call_arity: Option<u32>,
    pub is_construction: bool,
    /// The symbol-qualified-name of the callable this reference is passed
    /// into as an argument, if it is itself a bare identifier used as a
    /// callback (§3 `is_callback_arg_to?`).
    pub is_callback_arg_to: Option<Box<str>>,
    pub call_arg_index: Option<u32>,
}

impl Reference {
    pub fn new(location: Location, name: impl Into<Box<str>>, scope_id: ScopeId, kind: ReferenceKind) -> Self {
        Self {
            location,
            name: name.into(),
            scope_id,
            kind,
            receiver_chain: None,
            call_arity: None,
            is_construction: false,
            is_callback_arg_to: None,
            call_arg_index: None,
        }
    }

    pub fn with_receiver_chain(mut self, chain: ReceiverChain) -> Self {
        self.receiver_chain = Some(chain);
        self
    }

    pub fn with_call_arity(mut self, arity: u32) -> Self {
        self.call_arity = Some(arity);
        self
    }

    pub fn constructed(mut self) -> Self {
        self.is_construction = true;
        self
    }

    pub fn as_callback_arg_to(mut self, callee: impl Into<Box<str>>, index: u32) -> Self {
        self.is_callback_arg_to = Some(callee.into());
        self.call_arg_index = Some(index);
        self
    }
}

/// Category attached to a reference that resolved to zero candidates
/// (§4.5 "Unresolved references", §7 `UnresolvedReference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnresolvedCategory {
    /// No binding found anywhere in scope, imports, or the registry.
    Unbound,
    /// Resolution reached a boundary this engine does not cross (e.g. a
    /// wildcard import's opaque membership, or an un-typed receiver chain).
    External,
    /// Multiple equally-ranked candidates were found (e.g. declaration
    /// merging, overloaded `impl` methods).
    Ambiguous,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::file_path;

    fn seg(s: &str) -> Box<str> {
        s.into()
    }

    #[test]
    fn receiver_chain_middle_steps_and_method_name() {
        let chain = ReceiverChain::new(
            ReceiverHead::SelfKeyword,
            vec![seg("self"), seg("db"), seg("query")],
        );
        assert_eq!(chain.method_name(), Some("query"));
        assert_eq!(chain.middle_steps(), &[seg("db")]);
    }

    #[test]
    fn receiver_chain_with_no_middle_steps() {
        let chain = ReceiverChain::new(ReceiverHead::Identifier, vec![seg("obj"), seg("method")]);
        assert!(chain.middle_steps().is_empty());
        assert_eq!(chain.method_name(), Some("method"));
    }

    #[test]
    fn reference_builder_sets_call_metadata() {
        let loc = Location::new(file_path("a.js"), 1, 0, 1, 5);
        let r = Reference::new(loc, "foo", ScopeId(0), ReferenceKind::Call)
            .with_call_arity(2)
            .as_callback_arg_to("bar", 0);
        assert_eq!(r.call_arity, Some(2));
        assert_eq!(r.is_callback_arg_to.as_deref(), Some("bar"));
        assert_eq!(r.call_arg_index, Some(0));
    }
}
