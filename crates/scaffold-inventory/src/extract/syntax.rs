//! Shared tree-sitter helpers

use tree_sitter::{Language as Grammar, Node, Parser, Tree};

use crate::error::ExtractError;

/// Parse `source`, rejecting trees that contain error or missing nodes
pub(crate) fn parse(source: &str, grammar: &Grammar) -> Result<Tree, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| ExtractError::ParserInit(e.to_string()))?;
    let tree = parser.parse(source, None).ok_or(ExtractError::NoTree)?;
    if tree.root_node().has_error() {
        let line = first_error(tree.root_node()).map_or(1, |n| line(n));
        return Err(ExtractError::Syntax { line });
    }
    Ok(tree)
}

fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut kids = children(node);
            kids.reverse();
            stack.extend(kids);
        }
    }
    None
}

/// Source text of a node
pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// Text of a named field, if present
pub(crate) fn field_text<'s>(node: Node<'_>, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| text(n, source))
}

/// 1-based start line
pub(crate) fn line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// All children, named and anonymous
pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children only
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Whether a node has an anonymous child token of the given kind (`async`, `static`)
pub(crate) fn has_token(node: Node<'_>, token: &str) -> bool {
    children(node).iter().any(|c| !c.is_named() && c.kind() == token)
}

/// Pre-order descendants of `root`, not descending into nodes for which
/// `is_scope` holds (nested functions, classes, lambdas). `root` itself is
/// not returned.
pub(crate) fn body_nodes<'t>(root: Node<'t>, is_scope: impl Fn(&str) -> bool) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = children(root);
    stack.reverse();
    while let Some(node) = stack.pop() {
        out.push(node);
        if is_scope(node.kind()) {
            continue;
        }
        let mut kids = children(node);
        kids.reverse();
        stack.extend(kids);
    }
    out
}

/// Strip one pair of matching quotes from a string literal
pub(crate) fn unquote(literal: &str) -> &str {
    let trimmed = literal.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = trimmed.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    trimmed
}

/// Push unless already present
pub(crate) fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_variants() {
        assert_eq!(unquote("'./db'"), "./db");
        assert_eq!(unquote("\"fs\""), "fs");
        assert_eq!(unquote("`x`"), "x");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn syntax_errors_report_a_line() {
        let grammar: Grammar = tree_sitter_python::LANGUAGE.into();
        let err = parse("def ok():\n    return 1\n\ndef broken(:\n", &grammar).unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { line } if line >= 4));
        assert!(parse("x = 1\n", &grammar).is_ok());
    }
}
