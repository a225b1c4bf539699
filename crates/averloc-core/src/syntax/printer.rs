//! Pretty printer: renders declarations back to source text.
//!
//! Output is normalized (one statement per line, four-space indent) and
//! always re-tokenizes to the same token sequence.

use super::parser::track_angles;
use super::tree::{Delim, Member, MethodDecl, TokenTree, TypeDecl, is_keyword};

const INDENT: &str = "    ";

/// A closed type-argument list spaces like the type name it belongs to.
const TYPE_NAME: &str = "T";

/// Render a type declaration.
pub fn render_type(decl: &TypeDecl) -> String {
    let mut p = Printer::default();
    p.inline(&decl.header);
    p.atom("{");
    p.newline();
    p.level += 1;
    for member in &decl.members {
        p.member(member);
    }
    p.newline();
    p.level -= 1;
    p.atom("}");
    p.newline();
    p.out
}

#[derive(Default)]
struct Printer {
    out: String,
    line: String,
    prev: Option<String>,
    level: usize,
    /// Suppress the space before the next atom.
    glue: bool,
}

impl Printer {
    fn atom(&mut self, text: &str) {
        if let Some(prev) = &self.prev {
            if !self.glue && space_between(prev, text) {
                self.line.push(' ');
            }
        }
        self.line.push_str(text);
        self.prev = Some(text.to_string());
        self.glue = false;
    }

    /// Angle bracket of a type-argument list: binds to its neighbours.
    fn angle(&mut self, text: &str) {
        if text == "<" {
            if self.prev.as_deref().is_some_and(is_keyword) {
                self.line.push(' ');
            }
            self.line.push_str(text);
            self.prev = Some(text.to_string());
            self.glue = true;
        } else {
            self.line.push_str(text);
            self.prev = Some(TYPE_NAME.to_string());
            self.glue = false;
        }
    }

    fn newline(&mut self) {
        if self.line.is_empty() {
            return;
        }
        for _ in 0..self.level {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&self.line);
        self.out.push('\n');
        self.line.clear();
        self.prev = None;
        self.glue = false;
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Field(field) => {
                self.inline(&field.trees);
                self.atom(";");
                self.newline();
            }
            Member::Method(method) => self.method(method),
            Member::Initializer(trees) | Member::Nested(trees) | Member::Opaque(trees) => {
                self.stmts(trees);
                self.newline();
            }
        }
    }

    fn method(&mut self, method: &MethodDecl) {
        self.inline(&method.head);
        self.atom("(");
        for (i, param) in method.params.iter().enumerate() {
            if i > 0 {
                self.atom(",");
            }
            self.inline(&param.ty);
            self.atom(&param.name);
            self.inline(&param.dims);
        }
        self.atom(")");
        self.inline(&method.tail);

        match &method.body {
            Some(body) => self.block(body),
            None => self.atom(";"),
        }
        self.newline();
    }

    fn block(&mut self, trees: &[TokenTree]) {
        self.atom("{");
        self.newline();
        self.level += 1;
        self.stmts(trees);
        self.newline();
        self.level -= 1;
        self.atom("}");
    }

    fn stmts(&mut self, trees: &[TokenTree]) {
        let angles = generic_angles(trees);
        for (i, tree) in trees.iter().enumerate() {
            match tree {
                TokenTree::Group(g) if g.delim == Delim::Brace && is_block(trees, i) => {
                    self.block(&g.trees);
                    if !continues_line(trees.get(i + 1)) {
                        self.newline();
                    }
                }
                TokenTree::Token(t) if t.is_punct(";") => {
                    self.atom(";");
                    self.newline();
                }
                TokenTree::Token(t) if t.is_punct(":") && self.in_switch_label() => {
                    self.atom(":");
                    self.newline();
                }
                _ => self.inline_tree(tree, angles[i]),
            }
        }
    }

    fn in_switch_label(&self) -> bool {
        self.line.starts_with("case ") || self.line == "default"
    }

    fn inline(&mut self, trees: &[TokenTree]) {
        let angles = generic_angles(trees);
        for (tree, generic) in trees.iter().zip(angles) {
            self.inline_tree(tree, generic);
        }
    }

    fn inline_tree(&mut self, tree: &TokenTree, generic: bool) {
        match tree {
            TokenTree::Token(t) if generic => self.angle(&t.text),
            TokenTree::Token(t) => self.atom(&t.text),
            TokenTree::Group(g) => {
                self.atom(&g.delim.open().to_string());
                self.inline(&g.trees);
                self.atom(&g.delim.close().to_string());
            }
        }
    }
}

fn is_angle(tree: &TokenTree) -> bool {
    ["<", ">", ">>", ">>>"].iter().any(|a| tree.is_punct(a))
}

fn is_type_arg_part(tree: &TokenTree) -> bool {
    tree.ident_text().is_some()
        || [".", ",", "?", "&"].iter().any(|p| tree.is_punct(p))
        || tree.as_group().is_some_and(|g| g.delim == Delim::Bracket && g.trees.is_empty())
}

/// Marks the angle brackets in `trees` that delimit type arguments rather
/// than compare values.
fn generic_angles(trees: &[TokenTree]) -> Vec<bool> {
    let mut marks = vec![false; trees.len()];
    let mut i = 0;

    while i < trees.len() {
        let opens = trees[i].is_punct("<")
            && (i == 0 || trees[i - 1].ident_text().is_some() || trees[i - 1].is_punct("."));
        if let Some(end) = opens.then(|| generic_end(trees, i)).flatten() {
            for (mark, tree) in marks[i..=end].iter_mut().zip(&trees[i..=end]) {
                *mark = is_angle(tree);
            }
            i = end + 1;
        } else {
            i += 1;
        }
    }

    marks
}

fn generic_end(trees: &[TokenTree], open: usize) -> Option<usize> {
    let mut depth = 0;
    for (j, tree) in trees.iter().enumerate().skip(open) {
        if is_angle(tree) {
            depth = track_angles(depth, tree);
            if depth == 0 {
                return Some(j);
            }
        } else if !is_type_arg_part(tree) {
            return None;
        }
    }
    None
}

/// A brace group is laid out as a block unless it is an array initializer.
fn is_block(trees: &[TokenTree], i: usize) -> bool {
    match i.checked_sub(1).and_then(|j| trees.get(j)) {
        None => true,
        Some(prev) => !(prev.is_punct("=") || prev.is_punct(",") || prev.is_group(Delim::Bracket)),
    }
}

fn continues_line(next: Option<&TokenTree>) -> bool {
    next.is_some_and(|t| {
        [";", ")", ",", "."].iter().any(|p| t.is_punct(p))
            || ["else", "catch", "finally", "while"].iter().any(|k| t.is_ident(k))
    })
}

fn is_word(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn space_between(prev: &str, next: &str) -> bool {
    match (prev, next) {
        (_, ")" | "]" | ";" | "," | "." | "..." | "::") => false,
        ("(" | "[" | "." | "@" | "::" | "!" | "~", _) => false,
        (p, "(") => !(is_word(p) && (!is_keyword(p) || p == "this" || p == "super")),
        (p, "[") => !(is_word(p) || p == "]" || p == ")"),
        (p, "++" | "--") => !(is_word(p) || p == ")" || p == "]"),
        ("++" | "--", n) => !is_word(n),
        _ => true,
    }
}
