// Copyright (C) Brian G. Milnes 2025

//! Semantic model seen by the detector and the rewrite engine
//!
//! The host type-checks the program; this module only fixes the shape of
//! what it hands back. Operations are resolved per call and are valid
//! only for the snapshot whose tree they were resolved against.

pub mod semantics {
    use anyhow::Result;
    use rowan::TextSize;

    use crate::snapshot::snapshot::{DocumentId, Snapshot};
    use crate::syntax::syntax::SyntaxNode;

    /// Opaque host identity of a symbol within one snapshot
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymbolId(pub u64);

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub enum TypeSymbol {
        Named {
            namespace: Option<String>,
            name: String,
            type_arguments: Vec<TypeSymbol>,
            /// Language alias such as `string` for `System.String`
            keyword: Option<String>,
        },
        Array(Box<TypeSymbol>),
        TypeParameter(String),
    }

    impl TypeSymbol {
        pub fn named(namespace: &str, name: &str) -> Self {
            Self::generic(namespace, name, Vec::new())
        }

        pub fn generic(namespace: &str, name: &str, type_arguments: Vec<TypeSymbol>) -> Self {
            TypeSymbol::Named {
                namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
                name: name.to_string(),
                type_arguments,
                keyword: None,
            }
        }

        pub fn keyword(namespace: &str, name: &str, keyword: &str) -> Self {
            TypeSymbol::Named {
                namespace: Some(namespace.to_string()),
                name: name.to_string(),
                type_arguments: Vec::new(),
                keyword: Some(keyword.to_string()),
            }
        }

        pub fn array(element: TypeSymbol) -> Self {
            TypeSymbol::Array(Box::new(element))
        }

        pub fn type_parameter(name: &str) -> Self {
            TypeSymbol::TypeParameter(name.to_string())
        }

        /// Element type of arrays and single-argument generic collections
        pub fn element_type(&self) -> Option<&TypeSymbol> {
            match self {
                TypeSymbol::Array(element) => Some(element),
                TypeSymbol::Named { type_arguments, .. } if type_arguments.len() == 1 => type_arguments.first(),
                _ => None,
            }
        }

        pub fn type_arguments(&self) -> &[TypeSymbol] {
            match self {
                TypeSymbol::Named { type_arguments, .. } => type_arguments,
                _ => &[],
            }
        }

        /// Replace type parameter `name` with `with`, recursively
        pub fn substitute(&self, name: &str, with: &TypeSymbol) -> TypeSymbol {
            match self {
                TypeSymbol::TypeParameter(param) if param == name => with.clone(),
                TypeSymbol::Named { namespace, name: type_name, type_arguments, keyword } => TypeSymbol::Named {
                    namespace: namespace.clone(),
                    name: type_name.clone(),
                    type_arguments: type_arguments.iter().map(|arg| arg.substitute(name, with)).collect(),
                    keyword: keyword.clone(),
                },
                TypeSymbol::Array(element) => TypeSymbol::Array(Box::new(element.substitute(name, with))),
                other => other.clone(),
            }
        }

        /// Shortest spelling that names this type given the namespaces in scope
        pub fn minimal_display(&self, visible_namespaces: &[String]) -> String {
            match self {
                TypeSymbol::Named { keyword: Some(keyword), .. } => keyword.clone(),
                TypeSymbol::Named { namespace, name, type_arguments, keyword: None } => {
                    let mut text = match namespace {
                        Some(ns) if !visible_namespaces.iter().any(|visible| visible == ns) => format!("{ns}.{name}"),
                        _ => name.clone(),
                    };
                    if !type_arguments.is_empty() {
                        let args: Vec<String> = type_arguments
                            .iter()
                            .map(|arg| arg.minimal_display(visible_namespaces))
                            .collect();
                        text.push('<');
                        text.push_str(&args.join(", "));
                        text.push('>');
                    }
                    text
                }
                TypeSymbol::Array(element) => format!("{}[]", element.minimal_display(visible_namespaces)),
                TypeSymbol::TypeParameter(name) => name.clone(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ParameterSymbol {
        pub id: SymbolId,
        pub name: String,
        pub ty: TypeSymbol,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MethodSymbol {
        pub name: String,
        pub is_extension: bool,
        pub type_parameters: Vec<String>,
        pub parameters: Vec<ParameterSymbol>,
    }

    /// A resolved call expression
    #[derive(Debug, Clone)]
    pub struct Invocation {
        pub syntax: SyntaxNode,
        pub target: MethodSymbol,
        /// For extension calls the receiver is the first argument
        pub arguments: Vec<Argument>,
    }

    #[derive(Debug, Clone)]
    pub struct Argument {
        pub syntax: SyntaxNode,
        pub value: Operation,
    }

    /// Creation of a callback value
    #[derive(Debug, Clone)]
    pub struct DelegateCreation {
        pub syntax: SyntaxNode,
        pub target: DelegateTarget,
    }

    #[derive(Debug, Clone)]
    pub enum DelegateTarget {
        AnonymousFunction(AnonymousFunction),
        MethodReference(MethodSymbol),
    }

    #[derive(Debug, Clone)]
    pub struct AnonymousFunction {
        pub syntax: SyntaxNode,
        pub parameters: Vec<ParameterSymbol>,
        pub returns_void: bool,
        /// An expression node or a `BLOCK`
        pub body: SyntaxNode,
    }

    #[derive(Debug, Clone)]
    pub enum Operation {
        Invocation(Invocation),
        DelegateCreation(DelegateCreation),
        Other { syntax: SyntaxNode },
    }

    impl Operation {
        pub fn syntax(&self) -> &SyntaxNode {
            match self {
                Operation::Invocation(invocation) => &invocation.syntax,
                Operation::DelegateCreation(creation) => &creation.syntax,
                Operation::Other { syntax } => syntax,
            }
        }
    }

    /// Type-checked view of one document in one snapshot
    pub trait SemanticModel {
        /// Root of the tree this model was bound against
        fn root(&self) -> SyntaxNode;

        /// Resolved operation for a node of `root()`'s tree
        fn operation(&self, node: &SyntaxNode) -> Option<Operation>;

        /// Namespaces whose members can be named unqualified at `position`
        fn visible_namespaces(&self, position: TextSize) -> Vec<String>;

        fn minimal_display_string(&self, ty: &TypeSymbol, position: TextSize) -> String {
            ty.minimal_display(&self.visible_namespaces(position))
        }
    }

    /// Host facility producing semantic models
    pub trait SemanticHost: Sync {
        fn semantic_model<'a>(&'a self, snapshot: &Snapshot, document: DocumentId) -> Result<Box<dyn SemanticModel + 'a>>;
    }

    /// Host whole-program rename
    ///
    /// Rewrites the declaration and every reference of `symbol` across all
    /// documents of `snapshot` and returns the next snapshot.
    pub trait RenameService: Sync {
        fn rename_symbol(&self, snapshot: &Snapshot, symbol: &ParameterSymbol, new_name: &str) -> Result<Snapshot>;
    }
}
