// Copyright (C) Brian G. Milnes 2025

//! Code fix offering "Convert to foreach" for reported call sites

pub mod fixer {
    use rowan::TextRange;

    use crate::analyzer::analyzer::{Diagnostic, Span, AN01};
    use crate::ast_utils::ast_utils::find_node_at_range;
    use crate::cancel::cancel::CancellationToken;
    use crate::logging::logging::RunLog;
    use crate::rewrite::rewrite::{Declined, RewriteEngine};
    use crate::snapshot::snapshot::{DocumentId, Snapshot};
    use crate::syntax::syntax::SyntaxKind;

    pub const CONVERT_TO_FOREACH: &str = "Convert to foreach";

    /// One offered fix, bound to a document and call span
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CodeAction {
        pub title: String,
        pub equivalence_key: String,
        pub document: DocumentId,
        pub span: TextRange,
    }

    impl CodeAction {
        /// Apply the fix; a declined rewrite returns `snapshot` unchanged
        pub fn apply(&self, engine: &RewriteEngine<'_>, snapshot: &Snapshot, cancel: &CancellationToken) -> Snapshot {
            engine.convert(snapshot, self.document, self.span, cancel)
        }
    }

    pub fn fixable_diagnostic_ids() -> &'static [&'static str] {
        &[AN01.id]
    }

    /// The fixes offered for `diagnostic`: one, or none when its call is gone
    pub fn register_code_fixes(snapshot: &Snapshot, diagnostic: &Diagnostic) -> Vec<CodeAction> {
        if !fixable_diagnostic_ids().contains(&diagnostic.id.as_str()) {
            return Vec::new();
        }

        let Some(document) = snapshot.document(diagnostic.document) else {
            return Vec::new();
        };

        let span = diagnostic.range();
        if find_node_at_range(&document.syntax(), SyntaxKind::CALL_EXPR, span).is_none() {
            return Vec::new();
        }

        vec![CodeAction {
            title: CONVERT_TO_FOREACH.to_string(),
            equivalence_key: CONVERT_TO_FOREACH.to_string(),
            document: diagnostic.document,
            span,
        }]
    }

    #[derive(Debug, Clone)]
    pub struct FixAllReport {
        pub snapshot: Snapshot,
        pub applied: Vec<Diagnostic>,
        pub declined: Vec<(Diagnostic, Declined)>,
    }

    impl FixAllReport {
        pub fn summary(&self) -> String {
            format!("Applied {} fix(es), declined {}", self.applied.len(), self.declined.len())
        }
    }

    /// Fix every diagnostic in one pass
    ///
    /// Within a document fixes run from the last span to the first so that
    /// earlier spans stay valid. A pending span that encloses an applied one
    /// is stretched by the applied fix's length change, so an outer call
    /// whose callback held a nested call is still found. Each fix succeeds
    /// or declines on its own. Cancellation returns the original snapshot
    /// with nothing applied.
    pub fn fix_all(
        engine: &RewriteEngine<'_>,
        snapshot: &Snapshot,
        diagnostics: &[Diagnostic],
        cancel: &CancellationToken,
        log: &mut RunLog,
    ) -> FixAllReport {
        let mut pending: Vec<(&Diagnostic, Span)> = diagnostics
            .iter()
            .filter(|diagnostic| fixable_diagnostic_ids().contains(&diagnostic.id.as_str()))
            .map(|diagnostic| (diagnostic, diagnostic.span))
            .collect();
        pending.sort_by(|(a, _), (b, _)| a.document.cmp(&b.document).then(b.span.start.cmp(&a.span.start)));

        let mut current = snapshot.clone();
        let mut applied = Vec::new();
        let mut declined = Vec::new();

        for index in 0..pending.len() {
            let (diagnostic, span) = pending[index];
            match engine.try_convert(&current, diagnostic.document, span.into(), cancel) {
                Ok(next) => {
                    log.log_silent(&format!("fixed {diagnostic}"));
                    let delta = document_len(&next, diagnostic.document) - document_len(&current, diagnostic.document);
                    for (other, other_span) in pending.iter_mut().skip(index + 1) {
                        if other.document == diagnostic.document && encloses(*other_span, span) {
                            other_span.end = (i64::from(other_span.end) + delta) as u32;
                        }
                    }
                    current = next;
                    applied.push(diagnostic.clone());
                }
                Err(Declined::Cancelled) => {
                    log.log("Batch fix cancelled; no changes applied");
                    return FixAllReport {
                        snapshot: snapshot.clone(),
                        applied: Vec::new(),
                        declined: diagnostics
                            .iter()
                            .map(|diagnostic| (diagnostic.clone(), Declined::Cancelled))
                            .collect(),
                    };
                }
                Err(reason) => {
                    log.log(&format!("declined {diagnostic}: {reason}"));
                    declined.push((diagnostic.clone(), reason));
                }
            }
        }

        let report = FixAllReport {
            snapshot: current,
            applied,
            declined,
        };
        log.finalize(&report.summary());
        report
    }

    fn encloses(outer: Span, inner: Span) -> bool {
        outer.start <= inner.start && inner.end <= outer.end
    }

    fn document_len(snapshot: &Snapshot, document: DocumentId) -> i64 {
        snapshot
            .document(document)
            .map_or(0, |document| i64::from(u32::from(document.green().text_len())))
    }
}
