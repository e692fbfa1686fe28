// Copyright (C) Brian G. Milnes 2025

//! Loopify - finds `collection.ForEach(callback)` calls and rewrites them as `foreach` loops
//!
//! The host supplies type-checked snapshots through [`SemanticHost`] and a
//! program-wide rename through [`RenameService`]. The analyzer reports
//! eligible calls; the rewrite engine turns each into a native loop or
//! leaves the snapshot untouched.

pub mod syntax;
pub mod ast_utils;
pub mod snapshot;
pub mod editor;
pub mod marker;
pub mod semantics;
pub mod options;
pub mod detector;
pub mod visitor;
pub mod analyzer;
pub mod factory;
pub mod cancel;
pub mod rewrite;
pub mod fixer;
pub mod logging;

use anyhow::Result;

// Re-export commonly used items
pub use analyzer::analyzer::{analyze, diagnostics_to_json, Diagnostic, DiagnosticDescriptor, Severity, Span, AN01};
pub use cancel::cancel::CancellationToken;
pub use detector::detector::{match_for_each, ForEachMatch};
pub use editor::editor::DocumentEditor;
pub use fixer::fixer::{fix_all, register_code_fixes, CodeAction, FixAllReport, CONVERT_TO_FOREACH};
pub use logging::logging::RunLog;
pub use marker::marker::Marker;
pub use options::options::AnalyzerOptions;
pub use rewrite::rewrite::{Declined, Phase, RewriteEngine};
pub use semantics::semantics::*;
pub use snapshot::snapshot::{Document, DocumentId, Snapshot};
pub use syntax::syntax::{render, Lang, SyntaxKind, SyntaxNode, SyntaxToken};

/// Report every rewritable call in `snapshot`
pub fn review(host: &dyn SemanticHost, snapshot: &Snapshot, options: &AnalyzerOptions) -> Result<Vec<Diagnostic>> {
    options.validate()?;
    analyze(host, snapshot, options)
}

/// Review `snapshot` and apply every offered fix
pub fn fix(
    host: &dyn SemanticHost,
    renamer: &dyn RenameService,
    snapshot: &Snapshot,
    options: &AnalyzerOptions,
    cancel: &CancellationToken,
    log: &mut RunLog,
) -> Result<FixAllReport> {
    let diagnostics = review(host, snapshot, options)?;
    log.log(&format!("Found {} ForEach call site(s)", diagnostics.len()));

    let engine = RewriteEngine::new(host, renamer, options.clone());
    Ok(fix_all(&engine, snapshot, &diagnostics, cancel, log))
}
