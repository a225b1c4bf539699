//! Rewrites that insert statements into method bodies.

use super::{Placeholders, explicit_ctor_call, method_bodies};
use crate::syntax::{Delim, TokenTree, TypeDecl};

/// `if (false) { int <ph> = 0; }` at the start of every body.
pub(super) fn add_dead_code(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let mut changed = false;
    for body in method_bodies(decl) {
        let dead = vec![
            TokenTree::ident("if"),
            TokenTree::group(Delim::Paren, vec![TokenTree::ident("false")]),
            TokenTree::group(
                Delim::Brace,
                vec![
                    TokenTree::ident("int"),
                    TokenTree::ident(names.next()),
                    TokenTree::punct("="),
                    TokenTree::number("0"),
                    TokenTree::punct(";"),
                ],
            ),
        ];
        insert_at_start(body, dead);
        changed = true;
    }
    changed
}

/// `System.out.println("<ph>");` at the start of every body.
pub(super) fn insert_print_statements(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let mut changed = false;
    for body in method_bodies(decl) {
        let print = vec![
            TokenTree::ident("System"),
            TokenTree::punct("."),
            TokenTree::ident("out"),
            TokenTree::punct("."),
            TokenTree::ident("println"),
            TokenTree::group(Delim::Paren, vec![TokenTree::string(&names.next())]),
            TokenTree::punct(";"),
        ];
        insert_at_start(body, print);
        changed = true;
    }
    changed
}

/// Wrap every body in `try { .. } catch (Exception <ph>) { throw <ph>; }`.
///
/// An explicit constructor call stays in front of the `try`.
pub(super) fn wrap_try_catch(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let mut changed = false;
    for body in method_bodies(decl) {
        let keep = explicit_ctor_call(body);
        let inner = body.split_off(keep);
        let caught = names.next();

        body.extend([
            TokenTree::ident("try"),
            TokenTree::group(Delim::Brace, inner),
            TokenTree::ident("catch"),
            TokenTree::group(
                Delim::Paren,
                vec![TokenTree::ident("Exception"), TokenTree::ident(caught.as_str())],
            ),
            TokenTree::group(
                Delim::Brace,
                vec![
                    TokenTree::ident("throw"),
                    TokenTree::ident(caught),
                    TokenTree::punct(";"),
                ],
            ),
        ]);
        changed = true;
    }
    changed
}

fn insert_at_start(body: &mut Vec<TokenTree>, stmt: Vec<TokenTree>) {
    let at = explicit_ctor_call(body);
    body.splice(at..at, stmt);
}
