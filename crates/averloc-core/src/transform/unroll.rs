//! Unroll `while` loops by one iteration.

use super::TransformError;
use crate::syntax::{Delim, Member, TokenTree, TypeDecl};

const NAME: &str = "UnrollWhiles";

/// `while (c) { B }` becomes `while (c) { B if (!(c)) { break; } B }`.
///
/// Only loops with a braced body are rewritten. Loops inside nested loops are
/// unrolled before their parent duplicates them.
pub(super) fn unroll_whiles(decl: &mut TypeDecl) -> Result<bool, TransformError> {
    let element = decl.name.clone();
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
        changed |= unroll_in(trees, &element)?;
    }

    Ok(changed)
}

fn unroll_in(trees: &mut [TokenTree], element: &str) -> Result<bool, TransformError> {
    let mut changed = false;

    for tree in trees.iter_mut() {
        if let TokenTree::Group(group) = tree {
            changed |= unroll_in(&mut group.trees, element)?;
        }
    }

    for i in 0..trees.len() {
        if !is_braced_while(trees, i) {
            continue;
        }
        if is_labeled(trees, i) {
            return Err(TransformError::Unsupported {
                transform: NAME,
                element: element.to_string(),
                reason: "labeled while loop".to_string(),
            });
        }

        let cond = match &trees[i + 1] {
            TokenTree::Group(g) => g.trees.clone(),
            TokenTree::Token(_) => continue,
        };
        if let TokenTree::Group(body) = &mut trees[i + 2] {
            let once = body.trees.clone();
            let exit = [
                TokenTree::ident("if"),
                TokenTree::group(
                    Delim::Paren,
                    vec![TokenTree::punct("!"), TokenTree::group(Delim::Paren, cond)],
                ),
                TokenTree::group(
                    Delim::Brace,
                    vec![TokenTree::ident("break"), TokenTree::punct(";")],
                ),
            ];
            body.trees.extend(exit);
            body.trees.extend(once);
            changed = true;
        }
    }

    Ok(changed)
}

/// `while` followed by a condition and a block. The trailing `while` of a
/// `do` loop is followed by `;` instead.
fn is_braced_while(trees: &[TokenTree], i: usize) -> bool {
    trees[i].is_ident("while")
        && trees.get(i + 1).is_some_and(|t| t.is_group(Delim::Paren))
        && trees.get(i + 2).is_some_and(|t| t.is_group(Delim::Brace))
}

fn is_labeled(trees: &[TokenTree], i: usize) -> bool {
    if i < 2 || !trees[i - 1].is_punct(":") || !trees[i - 2].is_name() {
        return false;
    }
    // `case X: while ..` is a switch label, not a loop label.
    !(i >= 3 && trees[i - 3].is_ident("case"))
}
