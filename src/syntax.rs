// Copyright (C) Brian G. Milnes 2025

//! Syntax kinds and rowan glue for the analyzed language
//!
//! The analyzed language is C#-shaped: statements, member calls, lambdas
//! and `foreach` loops. Trees are rowan green trees so that every edit
//! produces a new immutable root.

pub mod syntax {
    use rowan::{GreenNode, GreenToken, NodeOrToken};

    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[repr(u16)]
    pub enum SyntaxKind {
        // Trivia
        WHITESPACE = 0,
        COMMENT,
        MARKER,

        // Tokens
        IDENT,
        INT_NUMBER,
        STRING,
        FOREACH_KW,
        IN_KW,
        USING_KW,
        L_PAREN,
        R_PAREN,
        L_BRACE,
        R_BRACE,
        L_ANGLE,
        R_ANGLE,
        L_BRACK,
        R_BRACK,
        DOT,
        COMMA,
        SEMICOLON,
        FAT_ARROW,
        QUESTION,
        ERROR,

        // Nodes
        SOURCE_FILE,
        USING_DIRECTIVE,
        BLOCK,
        EXPR_STMT,
        FOREACH_STMT,
        CALL_EXPR,
        MEMBER_EXPR,
        NAME_EXPR,
        LITERAL,
        LAMBDA_EXPR,
        PARAM_LIST,
        PARAM,
        ARG_LIST,
        TYPE,
    }

    use SyntaxKind::*;

    impl SyntaxKind {
        const ALL: [SyntaxKind; 37] = [
            WHITESPACE, COMMENT, MARKER, IDENT, INT_NUMBER, STRING, FOREACH_KW, IN_KW, USING_KW,
            L_PAREN, R_PAREN, L_BRACE, R_BRACE, L_ANGLE, R_ANGLE, L_BRACK, R_BRACK, DOT, COMMA,
            SEMICOLON, FAT_ARROW, QUESTION, ERROR, SOURCE_FILE, USING_DIRECTIVE, BLOCK, EXPR_STMT,
            FOREACH_STMT, CALL_EXPR, MEMBER_EXPR, NAME_EXPR, LITERAL, LAMBDA_EXPR, PARAM_LIST,
            PARAM, ARG_LIST, TYPE,
        ];

        /// Unknown raw kinds map to `ERROR`
        pub fn from_raw(raw: u16) -> SyntaxKind {
            Self::ALL.get(raw as usize).copied().unwrap_or(ERROR)
        }

        /// Whitespace, comments and markers: tokens with no meaning to the binder
        pub fn is_trivia(self) -> bool {
            matches!(self, WHITESPACE | COMMENT | MARKER)
        }

        pub fn is_statement(self) -> bool {
            matches!(self, BLOCK | EXPR_STMT | FOREACH_STMT)
        }

        pub fn is_expression(self) -> bool {
            matches!(self, CALL_EXPR | MEMBER_EXPR | NAME_EXPR | LITERAL | LAMBDA_EXPR)
        }

        /// Keyword kind for an identifier-shaped word, if it is one
        pub fn from_keyword(word: &str) -> Option<SyntaxKind> {
            match word {
                "foreach" => Some(FOREACH_KW),
                "in" => Some(IN_KW),
                "using" => Some(USING_KW),
                _ => None,
            }
        }
    }

    impl From<SyntaxKind> for rowan::SyntaxKind {
        fn from(kind: SyntaxKind) -> Self {
            rowan::SyntaxKind(kind as u16)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum Lang {}

    impl rowan::Language for Lang {
        type Kind = SyntaxKind;

        fn kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
            SyntaxKind::from_raw(raw.0)
        }

        fn kind_to_raw(kind: SyntaxKind) -> rowan::SyntaxKind {
            kind.into()
        }
    }

    pub type SyntaxNode = rowan::SyntaxNode<Lang>;
    pub type SyntaxToken = rowan::SyntaxToken<Lang>;
    pub type SyntaxElement = rowan::SyntaxElement<Lang>;
    pub type GreenElement = NodeOrToken<GreenNode, GreenToken>;

    pub fn green_token(kind: SyntaxKind, text: &str) -> GreenElement {
        NodeOrToken::Token(GreenToken::new(kind.into(), text))
    }

    pub fn green_node(kind: SyntaxKind, children: Vec<GreenElement>) -> GreenNode {
        GreenNode::new(kind.into(), children)
    }

    /// Owned green copy of a red element
    pub fn to_green(element: &SyntaxElement) -> GreenElement {
        match element {
            NodeOrToken::Node(node) => NodeOrToken::Node(node.green().into_owned()),
            NodeOrToken::Token(token) => NodeOrToken::Token(token.green().to_owned()),
        }
    }

    /// Source text of a node with markers left out
    pub fn render(node: &SyntaxNode) -> String {
        node.descendants_with_tokens()
            .filter_map(|element| element.into_token())
            .filter(|token| token.kind() != MARKER)
            .map(|token| token.text().to_string())
            .collect()
    }
}
