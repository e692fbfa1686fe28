// Copyright (C) Brian G. Milnes 2025

//! Tree traversal utilities for analyzing call sites
//!
//! Provides common functions for walking and querying the syntax tree

pub mod ast_utils {
    use rowan::{TextRange, WalkEvent};

    use crate::syntax::syntax::{SyntaxKind, SyntaxNode, SyntaxToken};

    /// Find all nodes of a specific kind in the syntax tree
    pub fn find_nodes(root: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
        find_nodes_where(root, |node| node.kind() == kind)
    }

    /// Find all nodes matching a predicate
    pub fn find_nodes_where<F>(root: &SyntaxNode, predicate: F) -> Vec<SyntaxNode>
    where
        F: Fn(&SyntaxNode) -> bool,
    {
        let mut results = Vec::new();

        for event in root.preorder() {
            if let WalkEvent::Enter(node) = event {
                if predicate(&node) {
                    results.push(node);
                }
            }
        }

        results
    }

    /// Innermost node of `kind` whose range is exactly `range`
    pub fn find_node_at_range(root: &SyntaxNode, kind: SyntaxKind, range: TextRange) -> Option<SyntaxNode> {
        find_nodes_where(root, |node| node.kind() == kind && node.text_range() == range)
            .into_iter()
            .last()
    }

    /// Direct child tokens of a specific kind
    pub fn child_tokens(node: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxToken> {
        node.children_with_tokens()
            .filter_map(|element| element.into_token())
            .filter(|token| token.kind() == kind)
            .collect()
    }

    /// Get all child nodes of a specific kind
    pub fn children_of_kind(node: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
        node.children().filter(|child| child.kind() == kind).collect()
    }

    /// First child node that is an expression
    pub fn first_expression_child(node: &SyntaxNode) -> Option<SyntaxNode> {
        node.children().find(|child| child.kind().is_expression())
    }

    /// Trivia tokens at the start of a node, markers excluded
    pub fn leading_trivia(node: &SyntaxNode) -> Vec<SyntaxToken> {
        node.children_with_tokens()
            .map_while(|element| element.into_token().filter(|token| token.kind().is_trivia()))
            .filter(|token| token.kind() != SyntaxKind::MARKER)
            .collect()
    }

    /// Trivia tokens at the end of a node, markers excluded
    pub fn trailing_trivia(node: &SyntaxNode) -> Vec<SyntaxToken> {
        let mut tokens: Vec<SyntaxToken> = node
            .children_with_tokens()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map_while(|element| element.into_token().filter(|token| token.kind().is_trivia()))
            .filter(|token| token.kind() != SyntaxKind::MARKER)
            .collect();
        tokens.reverse();
        tokens
    }

    /// Indentation of the line a statement starts on
    ///
    /// Taken from the nearest enclosing statement's leading whitespace,
    /// so a sub-expression reports the indentation of its statement.
    pub fn indentation_of(node: &SyntaxNode) -> String {
        let statement = node.ancestors().find(|ancestor| ancestor.kind().is_statement());

        let Some(statement) = statement else {
            return String::new();
        };

        let trivia: String = leading_trivia(&statement)
            .iter()
            .map(|token| token.text().to_string())
            .collect();

        match trivia.rfind('\n') {
            Some(newline) => trivia[newline + 1..].to_string(),
            None => trivia.chars().take_while(|c| *c == ' ' || *c == '\t').collect(),
        }
    }
}
