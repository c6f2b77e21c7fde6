//! The capture-name schema (§4.1): every tree-sitter query capture a
//! language profile defines must use one of these prefixes so the
//! generic pipeline can tell what kind of event a handler is about to
//! emit without knowing anything about the grammar.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSchema {
    Definition(Box<str>),
    Reference(Box<str>),
    Scope(Box<str>),
    Import(Box<str>),
    Export(Box<str>),
    AssignmentProperty,
    CallbackArg,
}

impl CaptureSchema {
    /// Parse a capture name like `definition.function` or `scope.class`
    /// into its schema category and sub-kind.
    pub fn parse(capture_name: &str) -> Option<Self> {
        let (prefix, rest) = capture_name.split_once('.')?;
        match prefix {
            "definition" => Some(Self::Definition(rest.into())),
            "reference" => Some(Self::Reference(rest.into())),
            "scope" => Some(Self::Scope(rest.into())),
            "import" => Some(Self::Import(rest.into())),
            "export" => Some(Self::Export(rest.into())),
            _ if capture_name == "assignment.property" => Some(Self::AssignmentProperty),
            _ if capture_name == "callback.arg" => Some(Self::CallbackArg),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_schema_prefix() {
        assert_eq!(
            CaptureSchema::parse("definition.function"),
            Some(CaptureSchema::Definition("function".into()))
        );
        assert_eq!(
            CaptureSchema::parse("reference.call"),
            Some(CaptureSchema::Reference("call".into()))
        );
        assert_eq!(
            CaptureSchema::parse("scope.class"),
            Some(CaptureSchema::Scope("class".into()))
        );
        assert_eq!(
            CaptureSchema::parse("import.named"),
            Some(CaptureSchema::Import("named".into()))
        );
        assert_eq!(
            CaptureSchema::parse("export.default"),
            Some(CaptureSchema::Export("default".into()))
        );
        assert_eq!(
            CaptureSchema::parse("assignment.property"),
            Some(CaptureSchema::AssignmentProperty)
        );
        assert_eq!(CaptureSchema::parse("callback.arg"), Some(CaptureSchema::CallbackArg));
        assert_eq!(CaptureSchema::parse("nonsense"), None);
    }
}
