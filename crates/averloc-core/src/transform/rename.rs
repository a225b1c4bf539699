//! Renaming rewrites for fields, locals and parameters.
//!
//! Bodies are token trees rather than a resolved AST, so scoping is
//! approximated: a use is any identifier that is not a member access and not
//! a call. A field whose name is also declared as a parameter or local in a
//! method is only renamed there when written `this.<name>`.

use super::Placeholders;
use crate::syntax::{Delim, Member, TokenTree, TypeDecl, is_primitive, track_angles};
use indexmap::{IndexMap, IndexSet};

pub(super) fn rename_fields(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let fields = decl.field_names();
    if fields.is_empty() {
        return false;
    }
    let map: IndexMap<String, String> = fields.into_iter().map(|f| (f, names.next())).collect();
    let unshadowed = IndexSet::new();

    for member in &mut decl.members {
        match member {
            Member::Field(field) => {
                rename_in(&mut field.trees, &map, Scope::Field { shadowed: &unshadowed });
                for name in &mut field.names {
                    if let Some(new) = map.get(name) {
                        *name = new.clone();
                    }
                }
            }
            Member::Method(method) => {
                let Some(body) = method.body.as_mut() else {
                    continue;
                };
                let mut shadowed = local_declarations(body);
                shadowed.extend(method.params.iter().map(|p| p.name.clone()));
                rename_in(body, &map, Scope::Field { shadowed: &shadowed });
            }
            Member::Initializer(trees) => {
                let shadowed = local_declarations(trees);
                rename_in(trees, &map, Scope::Field { shadowed: &shadowed });
            }
            Member::Nested(_) | Member::Opaque(_) => {}
        }
    }

    true
}

pub(super) fn rename_locals(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let mut changed = false;

    for member in &mut decl.members {
        let trees = match member {
            Member::Method(method) => match method.body.as_mut() {
                Some(body) => body,
                None => continue,
            },
            Member::Initializer(trees) => trees,
            _ => continue,
        };

        let locals = local_declarations(trees);
        if locals.is_empty() {
            continue;
        }
        let map: IndexMap<String, String> = locals.into_iter().map(|l| (l, names.next())).collect();
        rename_in(trees, &map, Scope::Plain);
        changed = true;
    }

    changed
}

pub(super) fn rename_parameters(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let mut changed = false;

    for method in decl.methods_mut() {
        if method.params.is_empty() {
            continue;
        }
        let map: IndexMap<String, String> = method
            .params
            .iter()
            .map(|p| (p.name.clone(), names.next()))
            .collect();

        for param in &mut method.params {
            if let Some(new) = map.get(&param.name) {
                param.name = new.clone();
            }
        }
        if let Some(body) = method.body.as_mut() {
            rename_in(body, &map, Scope::Plain);
        }
        changed = true;
    }

    changed
}

#[derive(Clone, Copy)]
enum Scope<'a> {
    /// Every unqualified use is renamed.
    Plain,
    /// Unqualified uses and `this.<name>`; names in `shadowed` only in the
    /// qualified form.
    Field { shadowed: &'a IndexSet<String> },
}

fn rename_in(trees: &mut [TokenTree], map: &IndexMap<String, String>, scope: Scope<'_>) {
    let hits: Vec<(usize, String)> = (0..trees.len())
        .filter_map(|i| {
            let name = trees[i].ident_text()?;
            let new = map.get(name)?;
            renames_at(trees, i, name, scope).then(|| (i, new.clone()))
        })
        .collect();

    for (i, new) in hits {
        if let TokenTree::Token(token) = &mut trees[i] {
            token.text = new;
        }
    }

    for tree in trees.iter_mut() {
        if let TokenTree::Group(group) = tree {
            rename_in(&mut group.trees, map, scope);
        }
    }
}

fn renames_at(trees: &[TokenTree], i: usize, name: &str, scope: Scope<'_>) -> bool {
    if trees.get(i + 1).is_some_and(|t| t.is_group(Delim::Paren)) {
        return false;
    }

    let prev = i.checked_sub(1).map(|j| &trees[j]);
    let qualified = prev.is_some_and(|p| p.is_punct(".") || p.is_punct("::") || p.is_punct("@"));

    match scope {
        Scope::Plain => !qualified,
        Scope::Field { .. } if qualified => {
            i >= 2 && trees[i - 1].is_punct(".") && trees[i - 2].is_ident("this")
        }
        Scope::Field { shadowed } => !shadowed.contains(name),
    }
}

/// Names of local variables declared anywhere in `trees`, in order.
///
/// Covers declaration statements (including several declarators), `for`
/// headers, resources, catch parameters, pattern bindings and lambda
/// parameters.
pub(crate) fn local_declarations(trees: &[TokenTree]) -> IndexSet<String> {
    let mut names = IndexSet::new();
    collect_locals(trees, &mut names);
    names
}

fn collect_locals(trees: &[TokenTree], names: &mut IndexSet<String>) {
    for (i, tree) in trees.iter().enumerate() {
        match tree {
            TokenTree::Group(group) => {
                if group.delim == Delim::Paren && is_arrow(trees.get(i + 1)) {
                    names.extend(untyped_lambda_params(&group.trees));
                }
                collect_locals(&group.trees, names);
            }
            TokenTree::Token(token) => {
                if !tree.is_name() {
                    continue;
                }
                if is_arrow(trees.get(i + 1)) {
                    if !in_case_label(trees, i) {
                        names.insert(token.text.clone());
                    }
                } else if declares_local(trees, i) {
                    names.insert(token.text.clone());
                    names.extend(more_declarators(trees, i));
                }
            }
        }
    }
}

fn is_arrow(tree: Option<&TokenTree>) -> bool {
    tree.is_some_and(|t| t.is_punct("->"))
}

/// `(a, b) -> ..`: only bare names, typed parameters are found as declarations.
fn untyped_lambda_params(trees: &[TokenTree]) -> Vec<String> {
    let bare = trees.iter().all(|t| t.is_name() || t.is_punct(","));
    if !bare {
        return Vec::new();
    }
    trees
        .iter()
        .filter(|t| t.is_name())
        .filter_map(TokenTree::ident_text)
        .map(str::to_string)
        .collect()
}

fn in_case_label(trees: &[TokenTree], i: usize) -> bool {
    for tree in trees[..i].iter().rev() {
        if tree.is_punct(";") || tree.is_group(Delim::Brace) {
            return false;
        }
        if tree.is_ident("case") {
            return true;
        }
    }
    false
}

fn ends_declarator(next: Option<&TokenTree>) -> bool {
    match next {
        None => true,
        Some(t) => t.is_group(Delim::Bracket) || ["=", ";", ","].iter().any(|p| t.is_punct(p)),
    }
}

/// True if the name at `i` is declared by a `Type name` pattern that starts
/// a statement (or a parameter, resource or pattern binding).
fn declares_local(trees: &[TokenTree], i: usize) -> bool {
    let next = trees.get(i + 1);
    if !(ends_declarator(next) || next.is_some_and(|t| t.is_punct(":"))) {
        return false;
    }
    match type_start(trees, i) {
        Some(start) => starts_declaration(trees, start),
        None => false,
    }
}

fn closing_angles(tree: &TokenTree) -> Option<usize> {
    match tree.as_token()?.text.as_str() {
        ">" => Some(1),
        ">>" => Some(2),
        ">>>" => Some(3),
        _ => None,
    }
}

fn is_type_part(tree: &TokenTree) -> bool {
    tree.is_name()
        || tree.ident_text().is_some_and(is_primitive)
        || tree.is_group(Delim::Bracket)
        || [".", ",", "?", "&"].iter().any(|p| tree.is_punct(p))
        || tree.is_ident("extends")
        || tree.is_ident("super")
}

/// Index where the type in front of the name at `name_at` begins.
fn type_start(trees: &[TokenTree], name_at: usize) -> Option<usize> {
    let mut j = name_at.checked_sub(1)?;

    while trees[j].is_group(Delim::Bracket) {
        if !trees[j].as_group()?.trees.is_empty() {
            return None;
        }
        j = j.checked_sub(1)?;
    }

    if let Some(mut depth) = closing_angles(&trees[j]) {
        loop {
            j = j.checked_sub(1)?;
            let tree = &trees[j];
            if tree.is_punct("<") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            } else if let Some(more) = closing_angles(tree) {
                depth += more;
            } else if !is_type_part(tree) {
                return None;
            }
        }
        j = j.checked_sub(1)?;
    }

    let tree = &trees[j];
    if tree.ident_text().is_some_and(is_primitive) {
        return Some(j);
    }
    if !tree.is_name() {
        return None;
    }
    while j >= 2 && trees[j - 1].is_punct(".") && trees[j - 2].is_name() {
        j -= 2;
    }
    Some(j)
}

/// Whatever precedes the type must end a statement or open a declaration
/// context. Modifiers and annotations are skipped.
fn starts_declaration(trees: &[TokenTree], start: usize) -> bool {
    let mut k = start;
    loop {
        let Some(prev) = k.checked_sub(1).map(|p| &trees[p]) else {
            return true;
        };
        if prev.is_ident("final") {
            k -= 1;
            continue;
        }
        if prev.is_name() && k >= 2 && trees[k - 2].is_punct("@") {
            k -= 2;
            continue;
        }
        if prev.is_group(Delim::Paren) && k >= 3 && trees[k - 2].is_name() && trees[k - 3].is_punct("@") {
            k -= 3;
            continue;
        }
        return prev.is_group(Delim::Brace)
            || [";", ":", ",", "|"].iter().any(|p| prev.is_punct(p))
            || prev.is_ident("instanceof");
    }
}

/// Further declarators after the first: `int a = 1, b, c[] = {};`.
fn more_declarators(trees: &[TokenTree], first: usize) -> Vec<String> {
    let mut names = Vec::new();
    let mut angle = 0usize;
    let mut j = first + 1;

    while let Some(tree) = trees.get(j) {
        if tree.is_punct(";") || tree.is_punct(":") {
            break;
        }
        if tree.is_punct(",") && angle == 0 {
            match trees.get(j + 1) {
                Some(next) if next.is_name() && ends_declarator(trees.get(j + 2)) => {
                    names.extend(next.ident_text().map(str::to_string));
                }
                _ => break,
            }
            j += 2;
            continue;
        }
        angle = track_angles(angle, tree);
        j += 1;
    }

    names
}
