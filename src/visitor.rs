// Copyright (C) Brian G. Milnes 2025

//! Visitor collecting call expressions from a syntax tree

pub mod visitor {
    use rowan::WalkEvent;

    use crate::syntax::syntax::{SyntaxKind, SyntaxNode};

    /// Collects every call expression in preorder
    pub struct CallSiteVisitor {
        pub calls: Vec<SyntaxNode>,
    }

    impl CallSiteVisitor {
        pub fn new() -> Self {
            CallSiteVisitor { calls: Vec::new() }
        }

        /// Visit a syntax node and its descendants
        pub fn visit(&mut self, node: &SyntaxNode) {
            for event in node.preorder() {
                match event {
                    WalkEvent::Enter(node) if node.kind() == SyntaxKind::CALL_EXPR => self.calls.push(node),
                    WalkEvent::Enter(_) | WalkEvent::Leave(_) => {}
                }
            }
        }
    }

    impl Default for CallSiteVisitor {
        fn default() -> Self {
            Self::new()
        }
    }
}
