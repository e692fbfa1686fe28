// Copyright (C) Brian G. Milnes 2025

//! Rewrite engine turning a matched ForEach call into a foreach loop
//!
//! Every phase starts from a fresh semantic model of the current snapshot;
//! nodes and symbols are never carried from one generation to the next.
//! When the callback parameter is the placeholder, the call's statement is
//! marked, the parameter is renamed program-wide, and the statement is
//! found again by its marker before the loop is synthesized. Any failure
//! on the way declines the whole rewrite.

pub mod rewrite {
    use std::collections::HashSet;

    use rowan::TextRange;

    use crate::ast_utils::ast_utils::{find_node_at_range, first_expression_child, indentation_of};
    use crate::cancel::cancel::CancellationToken;
    use crate::detector::detector::{match_for_each, ForEachMatch};
    use crate::editor::editor::DocumentEditor;
    use crate::factory::factory::{block_body, foreach_statement, parse_type_name, trimmed, with_trivia_from};
    use crate::marker::marker::Marker;
    use crate::options::options::AnalyzerOptions;
    use crate::semantics::semantics::{RenameService, SemanticHost, SemanticModel};
    use crate::snapshot::snapshot::{DocumentId, Snapshot};
    use crate::syntax::syntax::{SyntaxKind, SyntaxNode};

    /// Which snapshot generation a re-resolution ran against
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Phase {
        Initial,
        Marked,
        Renamed,
    }

    /// Why a rewrite was not applied
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Declined {
        DocumentNotFound(DocumentId),
        SemanticModelUnavailable(String),
        CallNotFound,
        NoMatch(Phase),
        MarkerLost(Phase),
        RenameFailed(String),
        PlaceholderNotRenamed,
        MalformedBody(String),
        InvalidTypeName(String),
        Cancelled,
    }

    impl std::fmt::Display for Declined {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Declined::DocumentNotFound(id) => write!(f, "Document {id} is not in the snapshot"),
                Declined::SemanticModelUnavailable(error) => write!(f, "No semantic model: {error}"),
                Declined::CallNotFound => write!(f, "No call expression at the diagnostic span"),
                Declined::NoMatch(phase) => write!(f, "Call no longer matches the ForEach pattern ({phase:?})"),
                Declined::MarkerLost(phase) => write!(f, "Marked call site not found ({phase:?})"),
                Declined::RenameFailed(error) => write!(f, "Rename failed: {error}"),
                Declined::PlaceholderNotRenamed => write!(f, "Parameter does not carry the loop name after rename"),
                Declined::MalformedBody(error) => write!(f, "Malformed callback body: {error}"),
                Declined::InvalidTypeName(error) => write!(f, "Element type cannot be written: {error}"),
                Declined::Cancelled => write!(f, "Rewrite cancelled"),
            }
        }
    }

    impl std::error::Error for Declined {}

    fn ensure_active(cancel: &CancellationToken) -> Result<(), Declined> {
        if cancel.is_cancelled() {
            return Err(Declined::Cancelled);
        }
        Ok(())
    }

    /// The statement a loop replaces: the enclosing expression statement
    /// when the call is its whole expression, otherwise the call itself
    pub fn replacement_target(call: &SyntaxNode) -> SyntaxNode {
        match call.parent() {
            Some(parent)
                if parent.kind() == SyntaxKind::EXPR_STMT
                    && first_expression_child(&parent).as_ref() == Some(call) =>
            {
                parent
            }
            _ => call.clone(),
        }
    }

    /// `base`, or `base1`, `base2`, ... whichever first names nothing in `root`'s tree
    ///
    /// The loop variable must not capture or shadow an identifier the
    /// callback body or its surroundings already use.
    pub fn free_name(base: &str, root: &SyntaxNode) -> String {
        let taken: HashSet<String> = root
            .descendants_with_tokens()
            .filter_map(|element| element.into_token())
            .filter(|token| token.kind() == SyntaxKind::IDENT)
            .map(|token| token.text().to_string())
            .collect();

        if !taken.contains(base) {
            return base.to_string();
        }
        (1u32..)
            .map(|suffix| format!("{base}{suffix}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub struct RewriteEngine<'h> {
        semantics: &'h dyn SemanticHost,
        renamer: &'h dyn RenameService,
        options: AnalyzerOptions,
    }

    impl<'h> RewriteEngine<'h> {
        pub fn new(semantics: &'h dyn SemanticHost, renamer: &'h dyn RenameService, options: AnalyzerOptions) -> Self {
            RewriteEngine {
                semantics,
                renamer,
                options,
            }
        }

        /// Rewrite the call at `call_span`, or return `snapshot` unchanged
        pub fn convert(
            &self,
            snapshot: &Snapshot,
            document: DocumentId,
            call_span: TextRange,
            cancel: &CancellationToken,
        ) -> Snapshot {
            match self.try_convert(snapshot, document, call_span, cancel) {
                Ok(rewritten) => rewritten,
                Err(reason) => {
                    tracing::debug!(document = %document, ?call_span, %reason, "Rewrite declined");
                    snapshot.clone()
                }
            }
        }

        pub fn try_convert(
            &self,
            snapshot: &Snapshot,
            document: DocumentId,
            call_span: TextRange,
            cancel: &CancellationToken,
        ) -> Result<Snapshot, Declined> {
            ensure_active(cancel)?;

            let model = self.model(snapshot, document)?;
            let root = model.root();
            let call = find_node_at_range(&root, SyntaxKind::CALL_EXPR, call_span).ok_or(Declined::CallNotFound)?;
            let found = self.resolve(&*model, &call, Phase::Initial)?;

            if found.parameter.name == self.options.placeholder_name {
                return self.rename_and_rewrite(snapshot, document, &root, &found, cancel);
            }

            ensure_active(cancel)?;
            self.rewrite(snapshot, document, &*model, &found)
        }

        fn rename_and_rewrite(
            &self,
            snapshot: &Snapshot,
            document: DocumentId,
            root: &SyntaxNode,
            found: &ForEachMatch,
            cancel: &CancellationToken,
        ) -> Result<Snapshot, Declined> {
            let loop_name = free_name(&self.options.replacement_name, root);
            let marker = Marker::fresh();
            let target = replacement_target(found.call());
            let marked = marker.mark(snapshot, document, root, &target);
            tracing::debug!(document = %document, %marker, version = marked.version(), "Marked call site");

            ensure_active(cancel)?;
            let marked_model = self.model(&marked, document)?;
            let found = self.relocate(&*marked_model, marker, Phase::Marked)?;

            ensure_active(cancel)?;
            let renamed = self
                .renamer
                .rename_symbol(&marked, &found.parameter, &loop_name)
                .map_err(|error| {
                    tracing::warn!(document = %document, error = %format!("{error:#}"), "Parameter rename failed");
                    Declined::RenameFailed(format!("{error:#}"))
                })?;
            tracing::debug!(
                document = %document,
                new_name = %loop_name,
                version = renamed.version(),
                "Renamed placeholder parameter"
            );

            ensure_active(cancel)?;
            let renamed_model = self.model(&renamed, document)?;
            let found = self.relocate(&*renamed_model, marker, Phase::Renamed)?;
            if found.parameter.name != loop_name {
                return Err(Declined::PlaceholderNotRenamed);
            }

            ensure_active(cancel)?;
            self.rewrite(&renamed, document, &*renamed_model, &found)
        }

        fn model(&self, snapshot: &Snapshot, document: DocumentId) -> Result<Box<dyn SemanticModel + 'h>, Declined> {
            if snapshot.document(document).is_none() {
                return Err(Declined::DocumentNotFound(document));
            }
            self.semantics
                .semantic_model(snapshot, document)
                .map_err(|error| Declined::SemanticModelUnavailable(format!("{error:#}")))
        }

        fn resolve(&self, model: &dyn SemanticModel, call: &SyntaxNode, phase: Phase) -> Result<ForEachMatch, Declined> {
            model
                .operation(call)
                .and_then(|operation| match_for_each(&operation, &self.options.method_name))
                .ok_or(Declined::NoMatch(phase))
        }

        /// Find the marked node in `model`'s tree and match the call it holds
        fn relocate(&self, model: &dyn SemanticModel, marker: Marker, phase: Phase) -> Result<ForEachMatch, Declined> {
            let marked = marker.find(&model.root()).ok_or(Declined::MarkerLost(phase))?;
            let call = if marked.kind() == SyntaxKind::CALL_EXPR {
                marked
            } else {
                first_expression_child(&marked)
                    .filter(|child| child.kind() == SyntaxKind::CALL_EXPR)
                    .ok_or(Declined::MarkerLost(phase))?
            };
            self.resolve(model, &call, phase)
        }

        /// Replace the match's statement with the synthesized loop
        fn rewrite(
            &self,
            snapshot: &Snapshot,
            document: DocumentId,
            model: &dyn SemanticModel,
            found: &ForEachMatch,
        ) -> Result<Snapshot, Declined> {
            let target = replacement_target(found.call());
            let indent = indentation_of(&target);

            let body = block_body(found.body(), &indent, &self.options.indent_unit)
                .map_err(|error| Declined::MalformedBody(error.to_string()))?;

            let position = found.call().text_range().start();
            let type_text = model.minimal_display_string(&found.parameter.ty, position);
            let element_type = parse_type_name(&type_text).map_err(|error| Declined::InvalidTypeName(format!("{error:#}")))?;

            let statement = foreach_statement(element_type, &found.parameter.name, trimmed(&found.source), body, &indent);
            let statement = with_trivia_from(statement, &target);

            let mut editor = DocumentEditor::new(model.root());
            editor.replace_node(&target, statement);
            let rewritten = editor.changed_snapshot(snapshot, document);

            tracing::debug!(
                document = %document,
                element_type = %type_text,
                name = %found.parameter.name,
                version = rewritten.version(),
                "Rewrote ForEach call as foreach loop"
            );
            Ok(rewritten)
        }
    }
}
