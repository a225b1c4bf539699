//! Java-subset syntax model.
//!
//! Just enough structure for the rewrites in [`crate::transform`]: balanced
//! token trees, top-level type declarations, and class members split into
//! fields, methods and opaque blocks. Method bodies stay token trees.

mod lexer;
mod parser;
mod printer;
mod tree;

pub use lexer::{Token, TokenKind};
pub use parser::parse_unit;
pub use tree::{
    CompilationUnit, Delim, ElementKind, FieldDecl, Group, Member, MethodDecl, Param, TokenTree,
    TypeDecl, is_keyword, is_primitive,
};

pub(crate) use parser::track_angles;

/// Why a unit could not be turned into a model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated character literal")]
    UnterminatedChar,

    #[error("unterminated text block")]
    UnterminatedTextBlock,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unclosed '{0}'")]
    Unclosed(char),

    #[error("unexpected '{0}'")]
    UnexpectedClose(char),

    #[error("expected '{expected}', found '{found}'")]
    Mismatched { expected: char, found: char },

    #[error("expected a type declaration")]
    ExpectedTypeDecl,

    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),
}

/// A structured parse failure for one virtual unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{unit}:{line}: {kind}")]
pub struct ParseError {
    /// Virtual file name of the failing unit.
    pub unit: String,
    pub line: u32,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(unit: impl Into<String>, line: u32, kind: ParseErrorKind) -> Self {
        Self {
            unit: unit.into(),
            line,
            kind,
        }
    }
}

/// Parsed form of one or more units, processed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    units: Vec<CompilationUnit>,
}

impl Model {
    /// Assemble a model, rejecting top-level type names declared twice.
    pub fn from_units(units: Vec<CompilationUnit>) -> Result<Self, ParseError> {
        let mut seen = std::collections::HashSet::new();
        for unit in &units {
            for decl in &unit.types {
                if !seen.insert(decl.name.as_str()) {
                    return Err(ParseError::new(
                        &unit.name,
                        0,
                        ParseErrorKind::DuplicateType(decl.name.clone()),
                    ));
                }
            }
        }
        Ok(Self { units })
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    /// Top-level declarations of the given kind, in unit order.
    pub fn elements_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &TypeDecl> {
        self.units
            .iter()
            .flat_map(|u| &u.types)
            .filter(move |t| t.kind == kind)
    }

    /// Mutable top-level class declarations.
    pub fn classes_mut(&mut self) -> impl Iterator<Item = &mut TypeDecl> {
        self.units
            .iter_mut()
            .flat_map(|u| &mut u.types)
            .filter(|t| t.kind == ElementKind::Class)
    }
}

impl TypeDecl {
    /// Render this declaration back to source text.
    pub fn to_source(&self) -> String {
        printer::render_type(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_types_rejected() {
        let a = parse_unit("a.java", "class Same {}").unwrap();
        let b = parse_unit("b.java", "class Same {}").unwrap();

        let err = Model::from_units(vec![a, b]).unwrap_err();
        assert_eq!(err.unit, "b.java");
        assert_eq!(err.kind, ParseErrorKind::DuplicateType("Same".into()));
    }

    #[test]
    fn test_elements_of_kind() {
        let unit = parse_unit("a.java", "class A {} interface I {} class B {}").unwrap();
        let model = Model::from_units(vec![unit]).unwrap();

        let names: Vec<_> = model
            .elements_of_kind(ElementKind::Class)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_rendered_class_reparses() {
        let src = "class A { int f(int x) { while (x > 0) { x--; } return x; } }";
        let unit = parse_unit("a.java", src).unwrap();
        let rendered = unit.types[0].to_source();

        let again = parse_unit("a.java", &rendered).unwrap();
        assert_eq!(again.types[0].to_source(), rendered);
    }
}
