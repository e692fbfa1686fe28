// Copyright (C) Brian G. Milnes 2025

//! Analyzer reporting ForEach call sites that can be native loops

pub mod analyzer {
    use anyhow::Result;
    use rayon::prelude::*;
    use rowan::TextRange;
    use serde::{Deserialize, Serialize};

    use crate::detector::detector::match_for_each;
    use crate::options::options::AnalyzerOptions;
    use crate::semantics::semantics::{Operation, SemanticHost};
    use crate::snapshot::snapshot::{Document, DocumentId, Snapshot};
    use crate::syntax::syntax::render;
    use crate::visitor::visitor::CallSiteVisitor;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Severity {
        Warning,
    }

    /// Fixed metadata of a reported rule
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct DiagnosticDescriptor {
        pub id: &'static str,
        pub title: &'static str,
        pub message: &'static str,
        pub category: &'static str,
        pub severity: Severity,
        pub enabled_by_default: bool,
        pub description: &'static str,
    }

    pub const AN01: DiagnosticDescriptor = DiagnosticDescriptor {
        id: "AN01",
        title: "ForEach can be foreach",
        message: "Using ForEach extension method can be a language foreach loop",
        category: "Performance",
        severity: Severity::Warning,
        enabled_by_default: true,
        description: "Replace an extension method call which allocates a delegate with a language foreach loop.",
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Span {
        pub start: u32,
        pub end: u32,
    }

    impl From<TextRange> for Span {
        fn from(range: TextRange) -> Self {
            Span {
                start: range.start().into(),
                end: range.end().into(),
            }
        }
    }

    impl From<Span> for TextRange {
        fn from(span: Span) -> Self {
            TextRange::new(span.start.into(), span.end.into())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Diagnostic {
        pub id: String,
        pub message: String,
        pub category: String,
        pub severity: Severity,
        pub document: DocumentId,
        pub span: Span,
        /// 1-based
        pub line: u32,
        /// 1-based
        pub column: u32,
    }

    impl Diagnostic {
        pub fn range(&self) -> TextRange {
            self.span.into()
        }
    }

    impl std::fmt::Display for Diagnostic {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "{} ({},{}): [{:?}] {}: {}",
                self.document, self.line, self.column, self.severity, self.id, self.message
            )
        }
    }

    /// Byte offset to line/column conversion for one document
    pub struct LineIndex {
        line_starts: Vec<usize>,
        source: String,
    }

    impl LineIndex {
        pub fn new(source: &str) -> Self {
            let mut line_starts = vec![0];
            for (i, c) in source.char_indices() {
                if c == '\n' {
                    line_starts.push(i + 1);
                }
            }
            LineIndex {
                line_starts,
                source: source.to_string(),
            }
        }

        /// 1-based line and character column
        pub fn line_col(&self, offset: usize) -> (u32, u32) {
            let offset = offset.min(self.source.len());
            let line = self
                .line_starts
                .partition_point(|&start| start <= offset)
                .saturating_sub(1);
            let line_start = self.line_starts.get(line).copied().unwrap_or(0);
            let column = self.source.get(line_start..offset).map_or(0, |text| text.chars().count());
            (line as u32 + 1, column as u32 + 1)
        }
    }

    /// Per-operation callback: one diagnostic when `operation` is a rewritable call
    pub fn analyze_invocation(
        operation: &Operation,
        document: DocumentId,
        lines: &LineIndex,
        options: &AnalyzerOptions,
    ) -> Option<Diagnostic> {
        let found = match_for_each(operation, &options.method_name)?;
        let range = found.call().text_range();
        let (line, column) = lines.line_col(range.start().into());

        Some(Diagnostic {
            id: AN01.id.to_string(),
            message: AN01.message.to_string(),
            category: AN01.category.to_string(),
            severity: AN01.severity,
            document,
            span: range.into(),
            line,
            column,
        })
    }

    /// Analyze one document of `snapshot`
    pub fn analyze_document(
        host: &dyn SemanticHost,
        snapshot: &Snapshot,
        document: &Document,
        options: &AnalyzerOptions,
    ) -> Result<Vec<Diagnostic>> {
        if !options.analyze_generated_code && document.is_generated(&options.generated_file_suffixes) {
            tracing::debug!(document = %document.id(), name = document.name(), "Skipping generated document");
            return Ok(Vec::new());
        }

        let model = host.semantic_model(snapshot, document.id())?;
        let root = model.root();
        let lines = LineIndex::new(&render(&root));

        let mut visitor = CallSiteVisitor::new();
        visitor.visit(&root);

        let diagnostics: Vec<Diagnostic> = visitor
            .calls
            .iter()
            .filter_map(|call| model.operation(call))
            .filter_map(|operation| analyze_invocation(&operation, document.id(), &lines, options))
            .collect();

        tracing::debug!(
            document = %document.id(),
            calls = visitor.calls.len(),
            diagnostics = diagnostics.len(),
            "Analyzed document"
        );

        Ok(diagnostics)
    }

    /// Analyze every document of `snapshot`, in parallel when enabled
    ///
    /// Diagnostics are ordered by document, then by position.
    pub fn analyze(host: &dyn SemanticHost, snapshot: &Snapshot, options: &AnalyzerOptions) -> Result<Vec<Diagnostic>> {
        let documents: Vec<&Document> = snapshot.documents().collect();

        let per_document: Vec<Vec<Diagnostic>> = if options.concurrent_execution {
            documents
                .par_iter()
                .map(|document| analyze_document(host, snapshot, document, options))
                .collect::<Result<_>>()?
        } else {
            documents
                .iter()
                .map(|document| analyze_document(host, snapshot, document, options))
                .collect::<Result<_>>()?
        };

        let mut diagnostics: Vec<Diagnostic> = per_document.into_iter().flatten().collect();
        diagnostics.sort_by_key(|diagnostic| (diagnostic.document, diagnostic.span.start));
        Ok(diagnostics)
    }

    pub fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> Result<String> {
        Ok(serde_json::to_string_pretty(diagnostics)?)
    }
}
