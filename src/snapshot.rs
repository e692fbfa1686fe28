// Copyright (C) Brian G. Milnes 2025

//! Immutable program snapshots
//!
//! A snapshot is the whole analyzed program at one point in time. Edits
//! never mutate a snapshot; they build the next one and share every
//! untouched document with the previous generation.

pub mod snapshot {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use rowan::GreenNode;
    use serde::{Deserialize, Serialize};

    use crate::syntax::syntax::{render, SyntaxKind, SyntaxNode};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct DocumentId(pub u32);

    impl std::fmt::Display for DocumentId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "doc#{}", self.0)
        }
    }

    #[derive(Debug, Clone)]
    pub struct Document {
        id: DocumentId,
        name: String,
        root: GreenNode,
    }

    impl Document {
        pub fn new(id: DocumentId, name: &str, root: GreenNode) -> Self {
            Document {
                id,
                name: name.to_string(),
                root,
            }
        }

        pub fn id(&self) -> DocumentId {
            self.id
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        pub fn green(&self) -> &GreenNode {
            &self.root
        }

        /// A fresh red tree over this document's green root
        pub fn syntax(&self) -> SyntaxNode {
            SyntaxNode::new_root(self.root.clone())
        }

        pub fn text(&self) -> String {
            render(&self.syntax())
        }

        /// Generated sources are recognized by file suffix or an auto-generated header comment
        pub fn is_generated(&self, suffixes: &[String]) -> bool {
            let name = self.name.to_ascii_lowercase();
            if suffixes.iter().any(|suffix| name.ends_with(&suffix.to_ascii_lowercase())) {
                return true;
            }

            self.syntax()
                .descendants_with_tokens()
                .filter_map(|element| element.into_token())
                .take_while(|token| token.kind().is_trivia())
                .any(|token| token.kind() == SyntaxKind::COMMENT && token.text().contains("<auto-generated"))
        }
    }

    #[derive(Debug)]
    struct SnapshotData {
        version: u64,
        documents: BTreeMap<DocumentId, Document>,
    }

    /// One immutable version of the program
    #[derive(Debug, Clone)]
    pub struct Snapshot {
        inner: Arc<SnapshotData>,
    }

    impl Snapshot {
        pub fn new(documents: Vec<Document>) -> Self {
            Snapshot {
                inner: Arc::new(SnapshotData {
                    version: 0,
                    documents: documents.into_iter().map(|doc| (doc.id, doc)).collect(),
                }),
            }
        }

        /// Generation counter, incremented by every edit
        pub fn version(&self) -> u64 {
            self.inner.version
        }

        pub fn document(&self, id: DocumentId) -> Option<&Document> {
            self.inner.documents.get(&id)
        }

        pub fn documents(&self) -> impl Iterator<Item = &Document> {
            self.inner.documents.values()
        }

        pub fn document_ids(&self) -> Vec<DocumentId> {
            self.inner.documents.keys().copied().collect()
        }

        /// Next generation with one document's root replaced
        ///
        /// Unknown ids add a new unnamed document.
        pub fn with_document_root(&self, id: DocumentId, root: GreenNode) -> Snapshot {
            let mut documents = self.inner.documents.clone();
            let name = documents.get(&id).map(|doc| doc.name.clone()).unwrap_or_default();
            documents.insert(id, Document { id, name, root });

            Snapshot {
                inner: Arc::new(SnapshotData {
                    version: self.inner.version + 1,
                    documents,
                }),
            }
        }

        /// True when both handles are the same generation object
        pub fn ptr_eq(&self, other: &Snapshot) -> bool {
            Arc::ptr_eq(&self.inner, &other.inner)
        }
    }
}
