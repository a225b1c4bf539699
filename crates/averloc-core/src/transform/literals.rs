//! Boolean literal replacement.

use super::Placeholders;
use crate::syntax::{Delim, Member, TokenTree, TypeDecl};

/// `true` becomes `("<ph>" == "<ph>")` and `false` becomes `("<ph>" != "<ph>")`.
///
/// Applies to method bodies, initializer blocks and field initializers.
/// Annotation arguments must stay constant and are left alone.
pub(super) fn replace_true_false(decl: &mut TypeDecl, names: &mut Placeholders) -> bool {
    let mut changed = false;

    for member in &mut decl.members {
        let trees = match member {
            Member::Field(field) => &mut field.trees,
            Member::Method(method) => match method.body.as_mut() {
                Some(body) => body,
                None => continue,
            },
            Member::Initializer(trees) => trees,
            Member::Nested(_) | Member::Opaque(_) => continue,
        };
        changed |= replace_in(trees, names);
    }

    changed
}

fn replace_in(trees: &mut [TokenTree], names: &mut Placeholders) -> bool {
    let mut changed = false;

    for i in 0..trees.len() {
        if is_annotation_args(trees, i) {
            continue;
        }

        let op = if trees[i].is_ident("true") {
            "=="
        } else if trees[i].is_ident("false") {
            "!="
        } else {
            if let TokenTree::Group(group) = &mut trees[i] {
                changed |= replace_in(&mut group.trees, names);
            }
            continue;
        };

        let ph = names.next();
        trees[i] = TokenTree::group(
            Delim::Paren,
            vec![TokenTree::string(&ph), TokenTree::punct(op), TokenTree::string(&ph)],
        );
        changed = true;
    }

    changed
}

fn is_annotation_args(trees: &[TokenTree], i: usize) -> bool {
    trees[i].is_group(Delim::Paren) && i >= 2 && trees[i - 1].is_name() && trees[i - 2].is_punct("@")
}

#[cfg(test)]
mod tests {
    use crate::syntax::parse_unit;
    use crate::transform::TransformKind;

    fn rewrite(src: &str) -> (bool, String) {
        let mut unit = parse_unit("t.java", src).unwrap();
        let decl = &mut unit.types[0];
        let changed = TransformKind::ReplaceTrueFalse.rewrite(decl, 3).unwrap();
        (changed, decl.to_source())
    }

    #[test]
    fn test_replace_literals() {
        let (changed, out) = rewrite(
            "class A { boolean on = true; boolean f(boolean x) { if (x) { return false; } return g(true); } }",
        );
        assert!(changed);
        assert!(out.contains("boolean on = (\"REPLACEME3_0\" == \"REPLACEME3_0\");"), "{out}");
        assert!(out.contains("return (\"REPLACEME3_1\" != \"REPLACEME3_1\");"), "{out}");
        assert!(out.contains("return g((\"REPLACEME3_2\" == \"REPLACEME3_2\"));"), "{out}");
        assert!(!out.contains("true"), "{out}");
    }

    #[test]
    fn test_annotation_arguments_kept() {
        let (changed, out) = rewrite("class A { @Flag(enabled = true) int x; void f() {} }");
        assert!(!changed);
        assert!(out.contains("@Flag(enabled = true) int x;"), "{out}");
    }

    #[test]
    fn test_identifiers_containing_true_untouched() {
        let (changed, _) = rewrite("class A { int f() { return trueCount + isTrue; } }");
        assert!(!changed);
    }
}
