// Copyright (C) Brian G. Milnes 2025

//! Markers that survive tree generations
//!
//! A marker is a `MARKER` token placed as the first child of a node.
//! Rendering skips it and the binder treats it as trivia, so the only
//! thing it changes is that the node can be found again by value.

pub mod marker {
    use std::sync::atomic::{AtomicU64, Ordering};

    use rowan::GreenNode;

    use crate::editor::editor::DocumentEditor;
    use crate::snapshot::snapshot::{DocumentId, Snapshot};
    use crate::syntax::syntax::{green_node, green_token, to_green, SyntaxKind, SyntaxNode};

    static NEXT_MARKER: AtomicU64 = AtomicU64::new(1);

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Marker(u64);

    impl Marker {
        /// A marker no other call in this process has been handed
        pub fn fresh() -> Self {
            Marker(NEXT_MARKER.fetch_add(1, Ordering::Relaxed))
        }

        fn token_text(&self) -> String {
            format!("/*marker:{}*/", self.0)
        }

        /// Green copy of `node` carrying this marker
        pub fn attach(&self, node: &SyntaxNode) -> GreenNode {
            let mut children = vec![green_token(SyntaxKind::MARKER, &self.token_text())];
            children.extend(node.children_with_tokens().map(|child| to_green(&child)));
            green_node(node.kind(), children)
        }

        /// The node carrying this marker in `root`'s tree
        pub fn find(&self, root: &SyntaxNode) -> Option<SyntaxNode> {
            let text = self.token_text();
            root.descendants_with_tokens()
                .filter_map(|element| element.into_token())
                .find(|token| token.kind() == SyntaxKind::MARKER && token.text() == text)
                .and_then(|token| token.parent())
        }

        /// Commit a snapshot in which `node` carries this marker
        pub fn mark(&self, snapshot: &Snapshot, document: DocumentId, root: &SyntaxNode, node: &SyntaxNode) -> Snapshot {
            let mut editor = DocumentEditor::new(root.clone());
            editor.replace_node(node, self.attach(node));
            editor.changed_snapshot(snapshot, document)
        }
    }

    impl std::fmt::Display for Marker {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "marker#{}", self.0)
        }
    }
}
