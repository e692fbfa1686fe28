// Copyright (C) Brian G. Milnes 2025

//! Green-tree factory for synthesized statements

pub mod factory {
    use anyhow::{bail, Result};
    use rowan::{GreenNode, NodeOrToken};

    use crate::ast_utils::ast_utils::{leading_trivia, trailing_trivia};
    use crate::syntax::syntax::{
        green_node, green_token, to_green, GreenElement, SyntaxElement, SyntaxKind, SyntaxNode,
    };

    /// Green copy of `node` without trivia or markers at either edge
    pub fn trimmed(node: &SyntaxNode) -> GreenNode {
        let children: Vec<_> = node.children_with_tokens().collect();
        let is_edge_trivia = |element: &SyntaxElement| match element {
            NodeOrToken::Token(token) => token.kind().is_trivia(),
            NodeOrToken::Node(_) => false,
        };

        let start = children.iter().position(|child| !is_edge_trivia(child)).unwrap_or(children.len());
        let end = children
            .iter()
            .rposition(|child| !is_edge_trivia(child))
            .map_or(start, |last| last + 1);

        let kept: Vec<GreenElement> = children[start..end.max(start)].iter().map(to_green).collect();
        green_node(node.kind(), kept)
    }

    /// Parse a display string such as `Dictionary<string, List<int>>[]` into a `TYPE` node
    pub fn parse_type_name(text: &str) -> Result<GreenNode> {
        let tokens = lex_type_name(text)?;
        let mut parser = TypeParser { tokens, pos: 0 };
        let node = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != parser.tokens.len() {
            bail!("Unexpected trailing input in type name '{text}'");
        }
        Ok(node)
    }

    fn lex_type_name(text: &str) -> Result<Vec<(SyntaxKind, String)>> {
        let mut tokens = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let kind = match c {
                '<' => SyntaxKind::L_ANGLE,
                '>' => SyntaxKind::R_ANGLE,
                '[' => SyntaxKind::L_BRACK,
                ']' => SyntaxKind::R_BRACK,
                ',' => SyntaxKind::COMMA,
                '.' => SyntaxKind::DOT,
                '?' => SyntaxKind::QUESTION,
                c if c.is_whitespace() => {
                    let mut end = start + c.len_utf8();
                    while let Some(&(next, n)) = chars.peek() {
                        if !n.is_whitespace() {
                            break;
                        }
                        end = next + n.len_utf8();
                        chars.next();
                    }
                    tokens.push((SyntaxKind::WHITESPACE, text[start..end].to_string()));
                    continue;
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut end = start + c.len_utf8();
                    while let Some(&(next, n)) = chars.peek() {
                        if !(n.is_alphanumeric() || n == '_') {
                            break;
                        }
                        end = next + n.len_utf8();
                        chars.next();
                    }
                    tokens.push((SyntaxKind::IDENT, text[start..end].to_string()));
                    continue;
                }
                other => bail!("Unexpected character '{other}' in type name '{text}'"),
            };
            tokens.push((kind, c.to_string()));
        }

        Ok(tokens)
    }

    struct TypeParser {
        tokens: Vec<(SyntaxKind, String)>,
        pos: usize,
    }

    impl TypeParser {
        fn skip_whitespace(&mut self) {
            while self.tokens.get(self.pos).is_some_and(|(kind, _)| *kind == SyntaxKind::WHITESPACE) {
                self.pos += 1;
            }
        }

        fn peek(&self) -> Option<SyntaxKind> {
            self.tokens.get(self.pos).map(|(kind, _)| *kind)
        }

        fn bump_into(&mut self, children: &mut Vec<GreenElement>) {
            if let Some((kind, text)) = self.tokens.get(self.pos) {
                children.push(green_token(*kind, text));
                self.pos += 1;
            }
        }

        /// Whitespace kept inside the type so `a, b` renders as written
        fn bump_whitespace_into(&mut self, children: &mut Vec<GreenElement>) {
            while self.peek() == Some(SyntaxKind::WHITESPACE) {
                self.bump_into(children);
            }
        }

        fn expect(&mut self, kind: SyntaxKind, children: &mut Vec<GreenElement>) -> Result<()> {
            if self.peek() != Some(kind) {
                bail!("Expected {kind:?} in type name");
            }
            self.bump_into(children);
            Ok(())
        }

        fn parse_type(&mut self) -> Result<GreenNode> {
            let mut children = Vec::new();
            self.skip_whitespace();
            self.expect(SyntaxKind::IDENT, &mut children)?;

            while self.peek() == Some(SyntaxKind::DOT) {
                self.bump_into(&mut children);
                self.expect(SyntaxKind::IDENT, &mut children)?;
            }

            if self.peek() == Some(SyntaxKind::L_ANGLE) {
                self.bump_into(&mut children);
                children.push(NodeOrToken::Node(self.parse_type()?));
                while self.peek() == Some(SyntaxKind::COMMA) {
                    self.bump_into(&mut children);
                    self.bump_whitespace_into(&mut children);
                    children.push(NodeOrToken::Node(self.parse_type()?));
                }
                self.expect(SyntaxKind::R_ANGLE, &mut children)?;
            }

            loop {
                match self.peek() {
                    Some(SyntaxKind::QUESTION) => self.bump_into(&mut children),
                    Some(SyntaxKind::L_BRACK) => {
                        self.bump_into(&mut children);
                        while self.peek() == Some(SyntaxKind::COMMA) {
                            self.bump_into(&mut children);
                        }
                        self.expect(SyntaxKind::R_BRACK, &mut children)?;
                    }
                    _ => break,
                }
            }

            Ok(green_node(SyntaxKind::TYPE, children))
        }
    }

    /// Loop body as a block
    ///
    /// A `BLOCK` body is reused with its edge trivia dropped; an expression
    /// body becomes `{ <expr>; }` laid out one level deeper than `indent`.
    /// Anything else is rejected.
    pub fn block_body(body: &SyntaxNode, indent: &str, indent_unit: &str) -> Result<GreenNode> {
        let kind = body.kind();
        if kind == SyntaxKind::BLOCK {
            return Ok(trimmed(body));
        }
        if !kind.is_expression() {
            bail!("Callback body is neither an expression nor a block: {kind:?}");
        }

        let statement = green_node(
            SyntaxKind::EXPR_STMT,
            vec![
                green_token(SyntaxKind::WHITESPACE, &format!("\n{indent}{indent_unit}")),
                NodeOrToken::Node(trimmed(body)),
                green_token(SyntaxKind::SEMICOLON, ";"),
            ],
        );

        Ok(green_node(
            SyntaxKind::BLOCK,
            vec![
                green_token(SyntaxKind::L_BRACE, "{"),
                NodeOrToken::Node(statement),
                green_token(SyntaxKind::WHITESPACE, &format!("\n{indent}")),
                green_token(SyntaxKind::R_BRACE, "}"),
            ],
        ))
    }

    /// `foreach (<element_type> <name> in <source>)` followed by `body` on its own line
    pub fn foreach_statement(
        element_type: GreenNode,
        name: &str,
        source: GreenNode,
        body: GreenNode,
        indent: &str,
    ) -> GreenNode {
        green_node(
            SyntaxKind::FOREACH_STMT,
            vec![
                green_token(SyntaxKind::FOREACH_KW, "foreach"),
                green_token(SyntaxKind::WHITESPACE, " "),
                green_token(SyntaxKind::L_PAREN, "("),
                NodeOrToken::Node(element_type),
                green_token(SyntaxKind::WHITESPACE, " "),
                green_token(SyntaxKind::IDENT, name),
                green_token(SyntaxKind::WHITESPACE, " "),
                green_token(SyntaxKind::IN_KW, "in"),
                green_token(SyntaxKind::WHITESPACE, " "),
                NodeOrToken::Node(source),
                green_token(SyntaxKind::R_PAREN, ")"),
                green_token(SyntaxKind::WHITESPACE, &format!("\n{indent}")),
                NodeOrToken::Node(body),
            ],
        )
    }

    /// `new` with the leading and trailing trivia of `old` around it
    pub fn with_trivia_from(new: GreenNode, old: &SyntaxNode) -> GreenNode {
        let mut children: Vec<GreenElement> = leading_trivia(old)
            .into_iter()
            .map(|token| NodeOrToken::Token(token.green().to_owned()))
            .collect();
        children.extend(new.children().map(|child| match child {
            NodeOrToken::Node(node) => NodeOrToken::Node(node.to_owned()),
            NodeOrToken::Token(token) => NodeOrToken::Token(token.to_owned()),
        }));
        children.extend(
            trailing_trivia(old)
                .into_iter()
                .map(|token| NodeOrToken::Token(token.green().to_owned())),
        );
        green_node(SyntaxKind::from_raw(new.kind().0), children)
    }
}
