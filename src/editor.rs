// Copyright (C) Brian G. Milnes 2025

//! Document editor over immutable green trees
//!
//! Collects node and token replacements against one red tree and
//! materializes them as a single new green root.

pub mod editor {
    use std::collections::HashMap;

    use rowan::{GreenNode, GreenToken, NodeOrToken, TextRange};

    use crate::snapshot::snapshot::{DocumentId, Snapshot};
    use crate::syntax::syntax::{to_green, GreenElement, SyntaxElement, SyntaxNode, SyntaxToken};

    pub struct DocumentEditor {
        root: SyntaxNode,
        edits: HashMap<SyntaxElement, GreenElement>,
    }

    impl DocumentEditor {
        /// `root` must be the root of the tree every later edit points into
        pub fn new(root: SyntaxNode) -> Self {
            DocumentEditor {
                root,
                edits: HashMap::new(),
            }
        }

        pub fn root(&self) -> &SyntaxNode {
            &self.root
        }

        pub fn replace_node(&mut self, old: &SyntaxNode, new: GreenNode) {
            self.edits.insert(NodeOrToken::Node(old.clone()), NodeOrToken::Node(new));
        }

        /// Replace a token's text, keeping its kind
        pub fn replace_token(&mut self, old: &SyntaxToken, text: &str) {
            let kind = old.green().kind();
            self.edits
                .insert(NodeOrToken::Token(old.clone()), NodeOrToken::Token(GreenToken::new(kind, text)));
        }

        pub fn has_edits(&self) -> bool {
            !self.edits.is_empty()
        }

        /// New green root with every recorded edit applied
        pub fn changed_root(&self) -> GreenNode {
            rebuild(&self.root, &self.edits)
        }

        /// Next snapshot with this document replaced
        pub fn changed_snapshot(&self, snapshot: &Snapshot, document: DocumentId) -> Snapshot {
            snapshot.with_document_root(document, self.changed_root())
        }
    }

    fn element_range(element: &SyntaxElement) -> TextRange {
        match element {
            NodeOrToken::Node(node) => node.text_range(),
            NodeOrToken::Token(token) => token.text_range(),
        }
    }

    fn rebuild(node: &SyntaxNode, edits: &HashMap<SyntaxElement, GreenElement>) -> GreenNode {
        if let Some(NodeOrToken::Node(replacement)) = edits.get(&NodeOrToken::Node(node.clone())) {
            return replacement.clone();
        }

        let range = node.text_range();
        if !edits.keys().any(|edited| range.contains_range(element_range(edited))) {
            return node.green().into_owned();
        }

        let children: Vec<GreenElement> = node
            .children_with_tokens()
            .map(|child| match edits.get(&child) {
                Some(replacement) => replacement.clone(),
                None => match &child {
                    NodeOrToken::Node(inner) => NodeOrToken::Node(rebuild(inner, edits)),
                    NodeOrToken::Token(_) => to_green(&child),
                },
            })
            .collect();

        GreenNode::new(node.green().kind(), children)
    }
}
