//! Token-tree construction and declaration parsing.

use super::lexer::{self, Token};
use super::tree::{
    CompilationUnit, Delim, ElementKind, FieldDecl, Group, Member, MethodDecl, Param, TokenTree,
    TypeDecl,
};
use super::{ParseError, ParseErrorKind};

/// Parse one source file into a compilation unit.
pub fn parse_unit(name: &str, src: &str) -> Result<CompilationUnit, ParseError> {
    let tokens = lexer::tokenize(src).map_err(|e| ParseError::new(name, e.line, e.kind))?;
    let trees = build_trees(tokens).map_err(|(line, kind)| ParseError::new(name, line, kind))?;

    let mut preamble = Vec::new();
    let mut types = Vec::new();
    let mut current: Vec<TokenTree> = Vec::new();
    let mut current_line = 1;

    for (tree, line) in trees {
        if current.is_empty() {
            current_line = line;
        }

        if tree.is_punct(";") {
            let starts_preamble = current
                .first()
                .is_some_and(|t| t.is_ident("package") || t.is_ident("import"));
            if starts_preamble {
                preamble.append(&mut current);
                preamble.push(tree);
            } else if !current.is_empty() {
                return Err(ParseError::new(name, current_line, ParseErrorKind::ExpectedTypeDecl));
            }
            continue;
        }

        let is_body = tree.is_group(Delim::Brace);
        current.push(tree);

        if is_body {
            let decl = parse_type(std::mem::take(&mut current))
                .ok_or_else(|| ParseError::new(name, current_line, ParseErrorKind::ExpectedTypeDecl))?;
            types.push(decl);
        }
    }

    if !current.is_empty() {
        return Err(ParseError::new(name, current_line, ParseErrorKind::ExpectedTypeDecl));
    }

    Ok(CompilationUnit {
        name: name.to_string(),
        preamble,
        types,
    })
}

/// Group a flat token stream into balanced trees.
///
/// Returns each top-level tree with the line it starts on.
fn build_trees(tokens: Vec<Token>) -> Result<Vec<(TokenTree, u32)>, (u32, ParseErrorKind)> {
    // Stack of open groups: (delim, opening line, children).
    let mut stack: Vec<(Delim, u32, Vec<TokenTree>)> = Vec::new();
    let mut top: Vec<(TokenTree, u32)> = Vec::new();

    for token in tokens {
        let line = token.line;
        let opened = match token.text.as_str() {
            "(" if token.kind == lexer::TokenKind::Punct => Some(Delim::Paren),
            "[" if token.kind == lexer::TokenKind::Punct => Some(Delim::Bracket),
            "{" if token.kind == lexer::TokenKind::Punct => Some(Delim::Brace),
            _ => None,
        };
        if let Some(delim) = opened {
            stack.push((delim, line, Vec::new()));
            continue;
        }

        let closed = match token.text.as_str() {
            ")" | "]" | "}" if token.kind == lexer::TokenKind::Punct => token.text.chars().next(),
            _ => None,
        };

        let tree = if let Some(close) = closed {
            let Some((delim, open_line, trees)) = stack.pop() else {
                return Err((line, ParseErrorKind::UnexpectedClose(close)));
            };
            if delim.close() != close {
                return Err((
                    line,
                    ParseErrorKind::Mismatched {
                        expected: delim.close(),
                        found: close,
                    },
                ));
            }
            (TokenTree::Group(Group { delim, trees }), open_line)
        } else {
            (TokenTree::Token(token), line)
        };

        match stack.last_mut() {
            Some((_, _, children)) => children.push(tree.0),
            None => top.push(tree),
        }
    }

    if let Some((delim, line, _)) = stack.pop() {
        return Err((line, ParseErrorKind::Unclosed(delim.open())));
    }

    Ok(top)
}

/// Parse a type declaration whose last tree is its body.
fn parse_type(mut trees: Vec<TokenTree>) -> Option<TypeDecl> {
    let TokenTree::Group(body) = trees.pop()? else {
        return None;
    };

    let (kind, name) = trees.windows(2).find_map(|pair| {
        let kind = ElementKind::from_keyword(pair[0].ident_text()?)?;
        Some((kind, pair[1].ident_text()?.to_string()))
    })?;

    let members = match kind {
        ElementKind::Class => split_members(body.trees),
        _ => vec![Member::Opaque(body.trees)],
    };

    Some(TypeDecl {
        kind,
        name,
        header: trees,
        members,
    })
}

/// Split a class body into members.
pub(crate) fn split_members(trees: Vec<TokenTree>) -> Vec<Member> {
    let mut members = Vec::new();
    let mut current: Vec<TokenTree> = Vec::new();

    for tree in trees {
        if tree.is_punct(";") {
            if current.is_empty() {
                members.push(Member::Opaque(vec![tree]));
            } else {
                members.push(classify_terminated(std::mem::take(&mut current)));
            }
            continue;
        }

        let is_brace = tree.is_group(Delim::Brace);
        current.push(tree);

        if is_brace && !has_top_level_assign(&current) {
            members.push(classify_braced(std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        members.push(Member::Opaque(current));
    }

    members
}

fn has_top_level_assign(trees: &[TokenTree]) -> bool {
    trees.iter().any(|t| t.is_punct("="))
}

fn declares_type(trees: &[TokenTree]) -> bool {
    trees.iter().enumerate().any(|(i, t)| {
        t.ident_text().and_then(ElementKind::from_keyword).is_some()
            && trees.get(i + 1).is_some_and(TokenTree::is_name)
    })
}

/// Index of the parameter list of a method header, if the trees look like one.
///
/// Parentheses that belong to annotations are skipped.
fn find_params(trees: &[TokenTree]) -> Option<usize> {
    for (i, tree) in trees.iter().enumerate() {
        if tree.is_punct("=") {
            return None;
        }
        if !tree.is_group(Delim::Paren) || i == 0 {
            continue;
        }
        if trees[i - 1].is_name() && !is_annotation_name(trees, i - 1) {
            return Some(i);
        }
    }
    None
}

/// True if the identifier at `idx` is (the last segment of) an annotation name.
fn is_annotation_name(trees: &[TokenTree], mut idx: usize) -> bool {
    loop {
        if idx == 0 {
            return false;
        }
        let prev = &trees[idx - 1];
        if prev.is_punct("@") {
            return true;
        }
        if prev.is_punct(".") && idx >= 2 && trees[idx - 2].is_name() {
            idx -= 2;
            continue;
        }
        return false;
    }
}

fn classify_terminated(mut trees: Vec<TokenTree>) -> Member {
    if let Some(p) = find_params(&trees) {
        return Member::Method(method_from(trees, p, None));
    }

    let names = declarator_names(&trees);
    if names.is_empty() {
        trees.push(TokenTree::punct(";"));
        Member::Opaque(trees)
    } else {
        Member::Field(FieldDecl { trees, names })
    }
}

fn classify_braced(mut trees: Vec<TokenTree>) -> Member {
    if declares_type(&trees[..trees.len() - 1]) {
        return Member::Nested(trees);
    }

    match find_params(&trees) {
        Some(p) => {
            let body = match trees.pop() {
                Some(TokenTree::Group(g)) => g.trees,
                _ => Vec::new(),
            };
            Member::Method(method_from(trees, p, Some(body)))
        }
        None => Member::Initializer(trees),
    }
}

fn method_from(mut head: Vec<TokenTree>, params_at: usize, body: Option<Vec<TokenTree>>) -> MethodDecl {
    let tail = head.split_off(params_at + 1);
    let params = match head.pop() {
        Some(TokenTree::Group(g)) => parse_params(g.trees),
        _ => Vec::new(),
    };
    let name = head
        .last()
        .and_then(TokenTree::ident_text)
        .unwrap_or_default()
        .to_string();

    MethodDecl {
        name,
        head,
        params,
        tail,
        body,
    }
}

fn parse_params(trees: Vec<TokenTree>) -> Vec<Param> {
    let mut params = Vec::new();
    let mut current = Vec::new();

    // Commas inside generic arguments do not separate parameters.
    let mut angle = 0usize;
    for tree in trees {
        if tree.is_punct(",") && angle == 0 {
            params.extend(param_from(std::mem::take(&mut current)));
            continue;
        }
        angle = track_angles(angle, &tree);
        current.push(tree);
    }
    params.extend(param_from(current));

    params
}

fn param_from(mut trees: Vec<TokenTree>) -> Option<Param> {
    let mut dims = Vec::new();
    while trees.last().is_some_and(|t| t.is_group(Delim::Bracket)) {
        dims.insert(0, trees.pop()?);
    }
    let name = trees.pop()?.ident_text()?.to_string();
    Some(Param {
        ty: trees,
        name,
        dims,
    })
}

/// Update generic-argument nesting depth for one tree.
pub(crate) fn track_angles(depth: usize, tree: &TokenTree) -> usize {
    match tree.as_token().map(|t| t.text.as_str()) {
        Some("<") => depth + 1,
        Some(">") => depth.saturating_sub(1),
        Some(">>") => depth.saturating_sub(2),
        Some(">>>") => depth.saturating_sub(3),
        _ => depth,
    }
}

/// Names declared by a field declaration (`int a = 1, b[], c;`).
fn declarator_names(trees: &[TokenTree]) -> Vec<String> {
    let mut names = Vec::new();
    let mut last: Option<&str> = None;
    let mut in_init = false;
    let mut angle = 0usize;

    for tree in trees {
        if in_init {
            if tree.is_punct(",") {
                in_init = false;
            }
            continue;
        }

        if tree.is_name() {
            last = tree.ident_text();
        } else if tree.is_punct("=") && angle == 0 {
            names.extend(last.take().map(str::to_string));
            in_init = true;
        } else if tree.is_punct(",") && angle == 0 {
            names.extend(last.take().map(str::to_string));
        } else {
            angle = track_angles(angle, tree);
        }
    }

    if !in_init {
        names.extend(last.map(str::to_string));
    }

    names
}
