// Copyright (C) Brian G. Milnes 2025

//! Common test utilities for integration tests
//!
//! A small parser for the analyzed language and a fixture host that binds
//! calls against a fixed table of locals and methods.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use rowan::{GreenNode, GreenNodeBuilder, TextSize};

use loopify::ast_utils::ast_utils::{child_tokens, children_of_kind, first_expression_child, find_nodes};
use loopify::{
    render, AnonymousFunction, Argument, CancellationToken, DelegateCreation, DelegateTarget, Document,
    DocumentEditor, DocumentId, Invocation, MethodSymbol, Operation, ParameterSymbol, RenameService,
    SemanticHost, SemanticModel, Snapshot, SymbolId, SyntaxKind, SyntaxNode, SyntaxToken, TypeSymbol,
};

// ---------------------------------------------------------------------------
// Lexer and parser
// ---------------------------------------------------------------------------

fn lex(text: &str) -> Vec<(SyntaxKind, &str)> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos] as char;

        let kind = if c.is_ascii_whitespace() {
            while pos < bytes.len() && (bytes[pos] as char).is_ascii_whitespace() {
                pos += 1;
            }
            SyntaxKind::WHITESPACE
        } else if text[pos..].starts_with("//") {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            SyntaxKind::COMMENT
        } else if text[pos..].starts_with("/*") {
            pos = text[pos + 2..].find("*/").map_or(bytes.len(), |end| pos + 2 + end + 2);
            SyntaxKind::COMMENT
        } else if c.is_ascii_alphabetic() || c == '_' {
            while pos < bytes.len() && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            SyntaxKind::from_keyword(&text[start..pos]).unwrap_or(SyntaxKind::IDENT)
        } else if c.is_ascii_digit() {
            while pos < bytes.len() && (bytes[pos] as char).is_ascii_digit() {
                pos += 1;
            }
            SyntaxKind::INT_NUMBER
        } else if c == '"' {
            pos += 1;
            while pos < bytes.len() && bytes[pos] != b'"' {
                pos += 1;
            }
            pos = (pos + 1).min(bytes.len());
            SyntaxKind::STRING
        } else if text[pos..].starts_with("=>") {
            pos += 2;
            SyntaxKind::FAT_ARROW
        } else {
            pos += 1;
            match c {
                '(' => SyntaxKind::L_PAREN,
                ')' => SyntaxKind::R_PAREN,
                '{' => SyntaxKind::L_BRACE,
                '}' => SyntaxKind::R_BRACE,
                '<' => SyntaxKind::L_ANGLE,
                '>' => SyntaxKind::R_ANGLE,
                '[' => SyntaxKind::L_BRACK,
                ']' => SyntaxKind::R_BRACK,
                '.' => SyntaxKind::DOT,
                ',' => SyntaxKind::COMMA,
                ';' => SyntaxKind::SEMICOLON,
                '?' => SyntaxKind::QUESTION,
                _ => SyntaxKind::ERROR,
            }
        };

        tokens.push((kind, &text[start..pos]));
    }

    tokens
}

struct Parser<'t> {
    tokens: Vec<(SyntaxKind, &'t str)>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
}

impl<'t> Parser<'t> {
    /// Index of the nth significant token from the cursor
    fn nth_index(&self, n: usize) -> Option<usize> {
        (self.pos..self.tokens.len())
            .filter(|&i| !self.tokens[i].0.is_trivia())
            .nth(n)
    }

    fn nth(&self, n: usize) -> Option<SyntaxKind> {
        self.nth_index(n).map(|i| self.tokens[i].0)
    }

    fn current(&self) -> Option<SyntaxKind> {
        self.nth(0)
    }

    fn eat_trivia(&mut self) {
        while let Some(&(kind, text)) = self.tokens.get(self.pos) {
            if !kind.is_trivia() {
                break;
            }
            self.builder.token(kind.into(), text);
            self.pos += 1;
        }
    }

    /// A comment on the same line as the token just consumed
    fn eat_trailing_comment(&mut self) {
        let comment = match self.tokens.get(self.pos) {
            Some(&(SyntaxKind::WHITESPACE, text)) if !text.contains('\n') => self.pos + 1,
            _ => self.pos,
        };
        if self.tokens.get(comment).map(|token| token.0) != Some(SyntaxKind::COMMENT) {
            return;
        }
        while self.pos <= comment {
            let (kind, text) = self.tokens[self.pos];
            self.builder.token(kind.into(), text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        self.eat_trivia();
        if let Some(&(kind, text)) = self.tokens.get(self.pos) {
            self.builder.token(kind.into(), text);
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> Result<()> {
        if self.current() != Some(kind) {
            bail!("Expected {kind:?}, found {:?}", self.current());
        }
        self.bump();
        Ok(())
    }

    fn parse_file(mut self) -> Result<GreenNode> {
        self.builder.start_node(SyntaxKind::SOURCE_FILE.into());
        while let Some(kind) = self.current() {
            if kind == SyntaxKind::USING_KW {
                self.parse_using()?;
            } else {
                self.parse_statement()?;
            }
        }
        self.eat_trivia();
        self.builder.finish_node();
        Ok(self.builder.finish())
    }

    fn parse_using(&mut self) -> Result<()> {
        self.builder.start_node(SyntaxKind::USING_DIRECTIVE.into());
        self.eat_trivia();
        self.bump();
        self.expect(SyntaxKind::IDENT)?;
        while self.current() == Some(SyntaxKind::DOT) {
            self.bump();
            self.expect(SyntaxKind::IDENT)?;
        }
        self.expect(SyntaxKind::SEMICOLON)?;
        self.builder.finish_node();
        Ok(())
    }

    /// Leading trivia and a same-line trailing comment belong to the statement
    fn parse_statement(&mut self) -> Result<()> {
        let kind = match self.current() {
            Some(SyntaxKind::L_BRACE) => SyntaxKind::BLOCK,
            Some(SyntaxKind::FOREACH_KW) => SyntaxKind::FOREACH_STMT,
            _ => SyntaxKind::EXPR_STMT,
        };

        self.builder.start_node(kind.into());
        self.eat_trivia();
        match kind {
            SyntaxKind::BLOCK => {
                self.expect(SyntaxKind::L_BRACE)?;
                while !matches!(self.current(), Some(SyntaxKind::R_BRACE) | None) {
                    self.parse_statement()?;
                }
                self.expect(SyntaxKind::R_BRACE)?;
            }
            SyntaxKind::FOREACH_STMT => {
                self.bump();
                self.expect(SyntaxKind::L_PAREN)?;
                self.parse_type()?;
                self.expect(SyntaxKind::IDENT)?;
                self.expect(SyntaxKind::IN_KW)?;
                self.parse_expr()?;
                self.expect(SyntaxKind::R_PAREN)?;
                self.parse_statement()?;
            }
            _ => {
                self.parse_expr()?;
                self.expect(SyntaxKind::SEMICOLON)?;
                self.eat_trailing_comment();
            }
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<()> {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_primary()?;

        loop {
            match self.current() {
                Some(SyntaxKind::DOT) => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::MEMBER_EXPR.into());
                    self.bump();
                    self.expect(SyntaxKind::IDENT)?;
                    self.builder.finish_node();
                }
                Some(SyntaxKind::L_PAREN) => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::CALL_EXPR.into());
                    self.parse_args()?;
                    self.builder.finish_node();
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn is_lambda_head(&self) -> bool {
        let mut depth = 0usize;
        let mut n = 0;
        while let Some(kind) = self.nth(n) {
            match kind {
                SyntaxKind::L_PAREN => depth += 1,
                SyntaxKind::R_PAREN => {
                    depth -= 1;
                    if depth == 0 {
                        return self.nth(n + 1) == Some(SyntaxKind::FAT_ARROW);
                    }
                }
                _ => {}
            }
            n += 1;
        }
        false
    }

    fn parse_primary(&mut self) -> Result<()> {
        match (self.current(), self.nth(1)) {
            (Some(SyntaxKind::IDENT), Some(SyntaxKind::FAT_ARROW)) => {
                self.builder.start_node(SyntaxKind::LAMBDA_EXPR.into());
                self.builder.start_node(SyntaxKind::PARAM.into());
                self.bump();
                self.builder.finish_node();
                self.bump();
                self.parse_lambda_body()?;
                self.builder.finish_node();
            }
            (Some(SyntaxKind::L_PAREN), _) if self.is_lambda_head() => {
                self.builder.start_node(SyntaxKind::LAMBDA_EXPR.into());
                self.parse_params()?;
                self.expect(SyntaxKind::FAT_ARROW)?;
                self.parse_lambda_body()?;
                self.builder.finish_node();
            }
            (Some(SyntaxKind::IDENT), _) => {
                self.builder.start_node(SyntaxKind::NAME_EXPR.into());
                self.bump();
                self.builder.finish_node();
            }
            (Some(SyntaxKind::STRING | SyntaxKind::INT_NUMBER), _) => {
                self.builder.start_node(SyntaxKind::LITERAL.into());
                self.bump();
                self.builder.finish_node();
            }
            (other, _) => bail!("Unexpected token {other:?}"),
        }
        Ok(())
    }

    fn parse_lambda_body(&mut self) -> Result<()> {
        if self.current() == Some(SyntaxKind::L_BRACE) {
            self.parse_statement()
        } else {
            self.parse_expr()
        }
    }

    fn parse_params(&mut self) -> Result<()> {
        self.builder.start_node(SyntaxKind::PARAM_LIST.into());
        self.expect(SyntaxKind::L_PAREN)?;
        if self.current() != Some(SyntaxKind::R_PAREN) {
            self.parse_param()?;
            while self.current() == Some(SyntaxKind::COMMA) {
                self.bump();
                self.parse_param()?;
            }
        }
        self.expect(SyntaxKind::R_PAREN)?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_param(&mut self) -> Result<()> {
        self.eat_trivia();
        self.builder.start_node(SyntaxKind::PARAM.into());
        let typed = matches!(
            self.nth(1),
            Some(SyntaxKind::IDENT | SyntaxKind::L_ANGLE | SyntaxKind::L_BRACK | SyntaxKind::DOT | SyntaxKind::QUESTION)
        );
        if typed {
            self.parse_type()?;
        }
        self.expect(SyntaxKind::IDENT)?;
        self.builder.finish_node();
        Ok(())
    }

    fn parse_type(&mut self) -> Result<()> {
        self.eat_trivia();
        self.builder.start_node(SyntaxKind::TYPE.into());
        self.expect(SyntaxKind::IDENT)?;
        while self.current() == Some(SyntaxKind::DOT) {
            self.bump();
            self.expect(SyntaxKind::IDENT)?;
        }
        if self.current() == Some(SyntaxKind::L_ANGLE) {
            self.bump();
            self.parse_type()?;
            while self.current() == Some(SyntaxKind::COMMA) {
                self.bump();
                self.parse_type()?;
            }
            self.expect(SyntaxKind::R_ANGLE)?;
        }
        while self.current() == Some(SyntaxKind::L_BRACK) {
            self.bump();
            self.expect(SyntaxKind::R_BRACK)?;
        }
        if self.current() == Some(SyntaxKind::QUESTION) {
            self.bump();
        }
        self.builder.finish_node();
        Ok(())
    }

    fn parse_args(&mut self) -> Result<()> {
        self.builder.start_node(SyntaxKind::ARG_LIST.into());
        self.expect(SyntaxKind::L_PAREN)?;
        if self.current() != Some(SyntaxKind::R_PAREN) {
            self.parse_expr()?;
            while self.current() == Some(SyntaxKind::COMMA) {
                self.bump();
                self.parse_expr()?;
            }
        }
        self.expect(SyntaxKind::R_PAREN)?;
        self.builder.finish_node();
        Ok(())
    }
}

/// Parse fixture source into a green tree
pub fn parse(text: &str) -> Result<GreenNode> {
    let parser = Parser {
        tokens: lex(text),
        pos: 0,
        builder: GreenNodeBuilder::new(),
    };
    parser.parse_file()
}

pub fn parse_syntax(text: &str) -> SyntaxNode {
    SyntaxNode::new_root(parse(text).expect("fixture parses"))
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

pub fn snapshot_of(text: &str) -> (Snapshot, DocumentId) {
    let id = DocumentId(1);
    let snapshot = Snapshot::new(vec![Document::new(id, "Provider.cs", parse(text).expect("fixture parses"))]);
    (snapshot, id)
}

pub fn snapshot_of_many(documents: &[(&str, &str)]) -> Snapshot {
    Snapshot::new(
        documents
            .iter()
            .enumerate()
            .map(|(i, (name, text))| {
                Document::new(DocumentId(i as u32 + 1), name, parse(text).expect("fixture parses"))
            })
            .collect(),
    )
}

pub fn document_text(snapshot: &Snapshot, id: DocumentId) -> String {
    snapshot.document(id).expect("document exists").text()
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

pub fn string_type() -> TypeSymbol {
    TypeSymbol::keyword("System", "String", "string")
}

pub fn int_type() -> TypeSymbol {
    TypeSymbol::keyword("System", "Int32", "int")
}

pub fn bool_type() -> TypeSymbol {
    TypeSymbol::keyword("System", "Boolean", "bool")
}

pub fn t() -> TypeSymbol {
    TypeSymbol::type_parameter("T")
}

pub fn enumerable(element: TypeSymbol) -> TypeSymbol {
    TypeSymbol::generic("System.Collections.Generic", "IEnumerable", vec![element])
}

pub fn list_of(element: TypeSymbol) -> TypeSymbol {
    TypeSymbol::generic("System.Collections.Generic", "List", vec![element])
}

pub fn action(arguments: Vec<TypeSymbol>) -> TypeSymbol {
    TypeSymbol::generic("System", "Action", arguments)
}

pub fn func(arguments: Vec<TypeSymbol>) -> TypeSymbol {
    TypeSymbol::generic("System", "Func", arguments)
}

pub fn order_type() -> TypeSymbol {
    TypeSymbol::named("Company.Models", "Order")
}

pub fn method(name: &str, is_extension: bool, type_parameters: &[&str], parameters: Vec<(&str, TypeSymbol)>) -> MethodSymbol {
    MethodSymbol {
        name: name.to_string(),
        is_extension,
        type_parameters: type_parameters.iter().map(|p| p.to_string()).collect(),
        parameters: parameters
            .into_iter()
            .map(|(name, ty)| ParameterSymbol {
                id: SymbolId(0),
                name: name.to_string(),
                ty,
            })
            .collect(),
    }
}

/// `static void ForEach<T>(this IEnumerable<T> source, Action<T> action)`
pub fn foreach_extension() -> MethodSymbol {
    method("ForEach", true, &["T"], vec![("source", enumerable(t())), ("action", action(vec![t()]))])
}

// ---------------------------------------------------------------------------
// Fixture host
// ---------------------------------------------------------------------------

pub struct FixtureHost {
    pub locals: HashMap<String, TypeSymbol>,
    pub type_names: HashMap<String, TypeSymbol>,
    pub extension_methods: Vec<MethodSymbol>,
    pub static_methods: Vec<MethodSymbol>,
    /// Instance methods keyed by the receiver type's simple name
    pub instance_methods: Vec<(String, MethodSymbol)>,
    pub renames: AtomicUsize,
}

impl FixtureHost {
    /// Locals `values: string[]`, `list: List<string>`, `numbers: int[]`,
    /// `orders: IEnumerable<Order>`, `pairs: IEnumerable<KeyValuePair<string, int>>`
    /// and the `ForEach` extension method
    pub fn standard() -> Self {
        let mut locals = HashMap::new();
        locals.insert("values".to_string(), TypeSymbol::array(string_type()));
        locals.insert("list".to_string(), list_of(string_type()));
        locals.insert("numbers".to_string(), TypeSymbol::array(int_type()));
        locals.insert("orders".to_string(), enumerable(order_type()));
        locals.insert(
            "pairs".to_string(),
            enumerable(TypeSymbol::generic(
                "System.Collections.Generic",
                "KeyValuePair",
                vec![string_type(), int_type()],
            )),
        );

        let mut type_names = HashMap::new();
        type_names.insert("string".to_string(), string_type());
        type_names.insert("int".to_string(), int_type());
        type_names.insert("object".to_string(), TypeSymbol::keyword("System", "Object", "object"));

        FixtureHost {
            locals,
            type_names,
            extension_methods: vec![foreach_extension()],
            static_methods: vec![method("Log", false, &[], vec![("value", TypeSymbol::keyword("System", "Object", "object"))])],
            instance_methods: vec![
                ("List".to_string(), method("Add", false, &[], vec![("item", t())])),
                ("List".to_string(), method("ForEach", false, &[], vec![("action", action(vec![t()]))])),
            ],
            renames: AtomicUsize::new(0),
        }
    }

    /// Standard locals with `extension` as the only extension method
    pub fn with_extension(extension: MethodSymbol) -> Self {
        FixtureHost {
            extension_methods: vec![extension],
            ..Self::standard()
        }
    }

    pub fn rename_count(&self) -> usize {
        self.renames.load(Ordering::SeqCst)
    }

    fn instance_method(&self, receiver: &TypeSymbol, name: &str, arity: usize) -> Option<&MethodSymbol> {
        let TypeSymbol::Named { name: type_name, .. } = receiver else {
            return None;
        };
        self.instance_methods
            .iter()
            .find(|(owner, method)| owner == type_name && method.name == name && method.parameters.len() == arity)
            .map(|(_, method)| method)
    }
}

fn symbol_id(document: DocumentId, offset: TextSize) -> SymbolId {
    SymbolId(((document.0 as u64) << 32) | u32::from(offset) as u64)
}

fn symbol_location(symbol: SymbolId) -> (DocumentId, TextSize) {
    (DocumentId((symbol.0 >> 32) as u32), TextSize::from((symbol.0 & 0xffff_ffff) as u32))
}

/// The body of a lambda: its last child node that is not a parameter
fn lambda_body(lambda: &SyntaxNode) -> Option<SyntaxNode> {
    lambda
        .children()
        .filter(|child| !matches!(child.kind(), SyntaxKind::PARAM | SyntaxKind::PARAM_LIST))
        .last()
}

fn lambda_params(lambda: &SyntaxNode) -> Vec<SyntaxNode> {
    match lambda.children().next() {
        Some(node) if node.kind() == SyntaxKind::PARAM => vec![node],
        Some(node) if node.kind() == SyntaxKind::PARAM_LIST => children_of_kind(&node, SyntaxKind::PARAM),
        _ => Vec::new(),
    }
}

fn param_name(param: &SyntaxNode) -> Option<SyntaxToken> {
    child_tokens(param, SyntaxKind::IDENT).into_iter().last()
}

pub struct FixtureModel<'h> {
    host: &'h FixtureHost,
    document: DocumentId,
    root: SyntaxNode,
}

impl FixtureModel<'_> {
    fn type_of(&self, expr: &SyntaxNode) -> Option<TypeSymbol> {
        if expr.kind() != SyntaxKind::NAME_EXPR {
            return None;
        }
        let name = child_tokens(expr, SyntaxKind::IDENT).into_iter().next()?;
        self.host.locals.get(name.text()).cloned()
    }

    fn resolve_type_name(&self, type_node: &SyntaxNode) -> TypeSymbol {
        let text = render(type_node).trim().to_string();
        self.host
            .type_names
            .get(&text)
            .cloned()
            .unwrap_or_else(|| TypeSymbol::named("", &text))
    }

    fn bind_call(&self, call: &SyntaxNode) -> Option<Invocation> {
        let callee = call.children().next()?;
        let arg_list = call.children().find(|child| child.kind() == SyntaxKind::ARG_LIST)?;
        let args: Vec<SyntaxNode> = arg_list.children().filter(|child| child.kind().is_expression()).collect();

        match callee.kind() {
            SyntaxKind::MEMBER_EXPR => {
                let receiver = first_expression_child(&callee)?;
                let name = child_tokens(&callee, SyntaxKind::IDENT).into_iter().last()?;
                let receiver_ty = self.type_of(&receiver)?;
                let element = receiver_ty.element_type().cloned();

                if let Some(target) = self.host.instance_method(&receiver_ty, name.text(), args.len()) {
                    return Some(Invocation {
                        syntax: call.clone(),
                        target: target.clone(),
                        arguments: self.bind_arguments(&args, target, element.as_ref()),
                    });
                }

                let target = self
                    .host
                    .extension_methods
                    .iter()
                    .find(|method| method.name == name.text() && method.parameters.len() == args.len() + 1)?;
                let mut all_args = vec![receiver];
                all_args.extend(args);
                Some(Invocation {
                    syntax: call.clone(),
                    target: target.clone(),
                    arguments: self.bind_arguments(&all_args, target, element.as_ref()),
                })
            }
            SyntaxKind::NAME_EXPR => {
                let name = child_tokens(&callee, SyntaxKind::IDENT).into_iter().next()?;
                let target = self
                    .host
                    .static_methods
                    .iter()
                    .find(|method| method.name == name.text() && method.parameters.len() == args.len())?;
                let element = args
                    .first()
                    .and_then(|arg| self.type_of(arg))
                    .and_then(|ty| ty.element_type().cloned());
                Some(Invocation {
                    syntax: call.clone(),
                    target: target.clone(),
                    arguments: self.bind_arguments(&args, target, element.as_ref()),
                })
            }
            _ => None,
        }
    }

    fn bind_arguments(&self, args: &[SyntaxNode], target: &MethodSymbol, element: Option<&TypeSymbol>) -> Vec<Argument> {
        args.iter()
            .zip(&target.parameters)
            .map(|(arg, param)| {
                let expected = match (element, target.type_parameters.first()) {
                    (Some(element), Some(type_param)) => param.ty.substitute(type_param, element),
                    (Some(element), None) => param.ty.substitute("T", element),
                    (None, _) => param.ty.clone(),
                };
                Argument {
                    syntax: arg.clone(),
                    value: self.bind_value(arg, &expected),
                }
            })
            .collect()
    }

    fn bind_value(&self, arg: &SyntaxNode, expected: &TypeSymbol) -> Operation {
        match arg.kind() {
            SyntaxKind::LAMBDA_EXPR => match self.bind_lambda(arg, expected) {
                Some(function) => Operation::DelegateCreation(DelegateCreation {
                    syntax: arg.clone(),
                    target: DelegateTarget::AnonymousFunction(function),
                }),
                None => Operation::Other { syntax: arg.clone() },
            },
            SyntaxKind::NAME_EXPR if self.type_of(arg).is_none() => {
                let group = child_tokens(arg, SyntaxKind::IDENT)
                    .into_iter()
                    .next()
                    .and_then(|name| self.host.static_methods.iter().find(|method| method.name == name.text()));
                match group {
                    Some(method) => Operation::DelegateCreation(DelegateCreation {
                        syntax: arg.clone(),
                        target: DelegateTarget::MethodReference(method.clone()),
                    }),
                    None => Operation::Other { syntax: arg.clone() },
                }
            }
            _ => Operation::Other { syntax: arg.clone() },
        }
    }

    fn bind_lambda(&self, lambda: &SyntaxNode, delegate: &TypeSymbol) -> Option<AnonymousFunction> {
        let returns_void = matches!(delegate, TypeSymbol::Named { name, .. } if name == "Action");
        let delegate_args = delegate.type_arguments();

        let parameters = lambda_params(lambda)
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = param_name(param)?;
                let ty = match param.children().find(|child| child.kind() == SyntaxKind::TYPE) {
                    Some(type_node) => self.resolve_type_name(&type_node),
                    None => delegate_args.get(i).cloned().unwrap_or_else(|| TypeSymbol::named("", "?")),
                };
                Some(ParameterSymbol {
                    id: symbol_id(self.document, name.text_range().start()),
                    name: name.text().to_string(),
                    ty,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(AnonymousFunction {
            syntax: lambda.clone(),
            parameters,
            returns_void,
            body: lambda_body(lambda)?,
        })
    }
}

impl SemanticModel for FixtureModel<'_> {
    fn root(&self) -> SyntaxNode {
        self.root.clone()
    }

    fn operation(&self, node: &SyntaxNode) -> Option<Operation> {
        match node.kind() {
            SyntaxKind::CALL_EXPR => self.bind_call(node).map(Operation::Invocation),
            kind if kind.is_expression() => Some(Operation::Other { syntax: node.clone() }),
            _ => None,
        }
    }

    fn visible_namespaces(&self, _position: TextSize) -> Vec<String> {
        find_nodes(&self.root, SyntaxKind::USING_DIRECTIVE)
            .iter()
            .map(|directive| {
                directive
                    .children_with_tokens()
                    .filter_map(|element| element.into_token())
                    .filter(|token| matches!(token.kind(), SyntaxKind::IDENT | SyntaxKind::DOT))
                    .map(|token| token.text().to_string())
                    .collect::<String>()
            })
            .collect()
    }
}

impl SemanticHost for FixtureHost {
    fn semantic_model<'a>(&'a self, snapshot: &Snapshot, document: DocumentId) -> Result<Box<dyn SemanticModel + 'a>> {
        let doc = snapshot
            .document(document)
            .ok_or_else(|| anyhow!("Document {document} not in snapshot"))?;
        Ok(Box::new(FixtureModel {
            host: self,
            document,
            root: doc.syntax(),
        }))
    }
}

/// Whether `name` is redeclared by a lambda between `node` and `outer`
fn is_shadowed(node: &SyntaxNode, outer: &SyntaxNode, name: &str) -> bool {
    node.ancestors()
        .take_while(|ancestor| ancestor != outer)
        .filter(|ancestor| ancestor.kind() == SyntaxKind::LAMBDA_EXPR)
        .any(|lambda| {
            lambda_params(&lambda)
                .iter()
                .filter_map(param_name)
                .any(|token| token.text() == name)
        })
}

impl RenameService for FixtureHost {
    fn rename_symbol(&self, snapshot: &Snapshot, symbol: &ParameterSymbol, new_name: &str) -> Result<Snapshot> {
        self.renames.fetch_add(1, Ordering::SeqCst);

        let (document, offset) = symbol_location(symbol.id);
        let root = snapshot
            .document(document)
            .context("Symbol's document is not in the snapshot")?
            .syntax();

        let declaration = root
            .descendants_with_tokens()
            .filter_map(|element| element.into_token())
            .find(|token| {
                token.kind() == SyntaxKind::IDENT && token.text_range().start() == offset && token.text() == symbol.name
            })
            .context("Symbol declaration not found")?;
        let lambda = declaration
            .parent()
            .and_then(|param| param.ancestors().find(|node| node.kind() == SyntaxKind::LAMBDA_EXPR))
            .context("Symbol is not a lambda parameter")?;
        let body = lambda_body(&lambda).context("Lambda has no body")?;

        let mut editor = DocumentEditor::new(root.clone());
        editor.replace_token(&declaration, new_name);
        for reference in find_nodes(&body, SyntaxKind::NAME_EXPR) {
            let Some(token) = child_tokens(&reference, SyntaxKind::IDENT).into_iter().next() else {
                continue;
            };
            if token.text() == symbol.name && !is_shadowed(&reference, &lambda, &symbol.name) {
                editor.replace_token(&token, new_name);
            }
        }

        Ok(editor.changed_snapshot(snapshot, document))
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles for the rename protocol
// ---------------------------------------------------------------------------

/// Rename facility that always fails
pub struct FailingRenamer;

impl RenameService for FailingRenamer {
    fn rename_symbol(&self, _snapshot: &Snapshot, symbol: &ParameterSymbol, _new_name: &str) -> Result<Snapshot> {
        bail!("no resolvable target for '{}'", symbol.name)
    }
}

/// Rename facility that reports success without changing anything
pub struct NoOpRenamer;

impl RenameService for NoOpRenamer {
    fn rename_symbol(&self, snapshot: &Snapshot, _symbol: &ParameterSymbol, _new_name: &str) -> Result<Snapshot> {
        Ok(snapshot.clone())
    }
}

/// Renames, then reparses every document from text, which drops markers
pub struct ReformattingRenamer<'h>(pub &'h FixtureHost);

impl RenameService for ReformattingRenamer<'_> {
    fn rename_symbol(&self, snapshot: &Snapshot, symbol: &ParameterSymbol, new_name: &str) -> Result<Snapshot> {
        let renamed = self.0.rename_symbol(snapshot, symbol, new_name)?;
        let mut next = renamed.clone();
        for document in renamed.documents() {
            next = next.with_document_root(document.id(), parse(&document.text())?);
        }
        Ok(next)
    }
}

/// Renames, then cancels the token it was given
pub struct CancellingRenamer<'h> {
    pub host: &'h FixtureHost,
    pub cancel: CancellationToken,
}

impl RenameService for CancellingRenamer<'_> {
    fn rename_symbol(&self, snapshot: &Snapshot, symbol: &ParameterSymbol, new_name: &str) -> Result<Snapshot> {
        let renamed = self.host.rename_symbol(snapshot, symbol, new_name)?;
        self.cancel.cancel();
        Ok(renamed)
    }
}

/// Semantic host that cannot bind trees carrying a marker
pub struct MarkerBlindHost<'h>(pub &'h FixtureHost);

struct MarkerBlindModel<'a> {
    inner: Box<dyn SemanticModel + 'a>,
}

impl SemanticModel for MarkerBlindModel<'_> {
    fn root(&self) -> SyntaxNode {
        self.inner.root()
    }

    fn operation(&self, node: &SyntaxNode) -> Option<Operation> {
        let marked = self
            .inner
            .root()
            .descendants_with_tokens()
            .any(|element| element.kind() == SyntaxKind::MARKER);
        if marked {
            return None;
        }
        self.inner.operation(node)
    }

    fn visible_namespaces(&self, position: TextSize) -> Vec<String> {
        self.inner.visible_namespaces(position)
    }
}

impl SemanticHost for MarkerBlindHost<'_> {
    fn semantic_model<'a>(&'a self, snapshot: &Snapshot, document: DocumentId) -> Result<Box<dyn SemanticModel + 'a>> {
        Ok(Box::new(MarkerBlindModel {
            inner: self.0.semantic_model(snapshot, document)?,
        }))
    }
}
