//! Token trees and the declaration model built on top of them.

use super::lexer::{Token, TokenKind};

/// Delimiter of a token group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    Paren,
    Bracket,
    Brace,
}

impl Delim {
    pub fn open(self) -> char {
        match self {
            Delim::Paren => '(',
            Delim::Bracket => '[',
            Delim::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Delim::Paren => ')',
            Delim::Bracket => ']',
            Delim::Brace => '}',
        }
    }
}

/// A balanced group of token trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub delim: Delim,
    pub trees: Vec<TokenTree>,
}

/// Either a single token or a delimited group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenTree {
    Token(Token),
    Group(Group),
}

impl TokenTree {
    pub fn ident(text: impl Into<String>) -> Self {
        TokenTree::Token(Token::new(TokenKind::Ident, text))
    }

    pub fn punct(text: impl Into<String>) -> Self {
        TokenTree::Token(Token::new(TokenKind::Punct, text))
    }

    pub fn number(text: impl Into<String>) -> Self {
        TokenTree::Token(Token::new(TokenKind::Number, text))
    }

    /// A string literal with the given (unescaped, quote-free) contents.
    pub fn string(contents: &str) -> Self {
        TokenTree::Token(Token::new(TokenKind::Str, format!("\"{contents}\"")))
    }

    pub fn group(delim: Delim, trees: Vec<TokenTree>) -> Self {
        TokenTree::Group(Group { delim, trees })
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            TokenTree::Token(t) => Some(t),
            TokenTree::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            TokenTree::Group(g) => Some(g),
            TokenTree::Token(_) => None,
        }
    }

    /// Identifier text, if this is an identifier or keyword.
    pub fn ident_text(&self) -> Option<&str> {
        self.as_token()
            .filter(|t| t.is_ident())
            .map(|t| t.text.as_str())
    }

    /// True for an identifier that is not a reserved word.
    pub fn is_name(&self) -> bool {
        self.ident_text().is_some_and(|s| !is_keyword(s))
    }

    pub fn is_ident(&self, s: &str) -> bool {
        self.ident_text() == Some(s)
    }

    pub fn is_punct(&self, s: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_punct(s))
    }

    pub fn is_group(&self, delim: Delim) -> bool {
        self.as_group().is_some_and(|g| g.delim == delim)
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null", "var", "yield",
    "record",
];

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "var",
];

/// Reserved words and literals; never renamed.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Primitive type names (and `var`), which may start a declaration.
pub fn is_primitive(s: &str) -> bool {
    PRIMITIVES.contains(&s)
}

/// Kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Class,
    Interface,
    Enum,
    Record,
}

impl ElementKind {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "class" => Some(ElementKind::Class),
            "interface" => Some(ElementKind::Interface),
            "enum" => Some(ElementKind::Enum),
            "record" => Some(ElementKind::Record),
            _ => None,
        }
    }
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Virtual file name.
    pub name: String,
    /// `package` and `import` statements.
    pub preamble: Vec<TokenTree>,
    pub types: Vec<TypeDecl>,
}

/// A top-level type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub kind: ElementKind,
    pub name: String,
    /// Everything before the body: annotations, modifiers, keyword, name,
    /// type parameters, `extends`/`implements`.
    pub header: Vec<TokenTree>,
    pub members: Vec<Member>,
}

/// A member of a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    /// Static or instance initializer block, including its modifiers.
    Initializer(Vec<TokenTree>),
    /// Nested type declaration, kept verbatim.
    Nested(Vec<TokenTree>),
    /// Anything else (stray semicolons, enum constants, record bodies).
    Opaque(Vec<TokenTree>),
}

/// A field declaration, possibly declaring several names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Declaration without the terminating semicolon.
    pub trees: Vec<TokenTree>,
    pub names: Vec<String>,
}

/// A method or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    /// Annotations, modifiers, type parameters, return type and name.
    pub head: Vec<TokenTree>,
    pub params: Vec<Param>,
    /// `throws` clause or annotation `default` value.
    pub tail: Vec<TokenTree>,
    /// Body statements; `None` for abstract and native methods.
    pub body: Option<Vec<TokenTree>>,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Annotations, modifiers and type.
    pub ty: Vec<TokenTree>,
    pub name: String,
    /// Array brackets written after the name.
    pub dims: Vec<TokenTree>,
}

impl TypeDecl {
    /// Mutable access to every method declared directly in this type.
    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut MethodDecl> {
        self.members.iter_mut().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    /// Names of all fields declared directly in this type.
    pub fn field_names(&self) -> Vec<String> {
        self.members
            .iter()
            .filter_map(|m| match m {
                Member::Field(field) => Some(field.names.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
