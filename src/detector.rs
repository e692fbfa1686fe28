// Copyright (C) Brian G. Milnes 2025

//! Pattern detector for `collection.ForEach(callback)` call sites
//!
//! An ordered chain of guards over a resolved invocation. The first guard
//! that fails ends the check with no match; nothing here reports or errors.

pub mod detector {
    use crate::semantics::semantics::{
        AnonymousFunction, DelegateCreation, DelegateTarget, Invocation, Operation, ParameterSymbol,
    };
    use crate::syntax::syntax::SyntaxNode;

    /// The parts of a matched call site
    #[derive(Debug, Clone)]
    pub struct ForEachMatch {
        pub invocation: Invocation,
        /// Syntax of the iterated collection (first argument)
        pub source: SyntaxNode,
        pub closure: DelegateCreation,
        pub function: AnonymousFunction,
        pub parameter: ParameterSymbol,
    }

    impl ForEachMatch {
        pub fn call(&self) -> &SyntaxNode {
            &self.invocation.syntax
        }

        pub fn body(&self) -> &SyntaxNode {
            &self.function.body
        }
    }

    /// Match `operation` against the ForEach idiom named `method_name`
    pub fn match_for_each(operation: &Operation, method_name: &str) -> Option<ForEachMatch> {
        let Operation::Invocation(invocation) = operation else {
            return None;
        };

        let target = &invocation.target;
        if target.name != method_name {
            return None;
        }
        if !target.is_extension {
            return None;
        }
        if target.type_parameters.len() != 1 || target.parameters.len() != 2 {
            return None;
        }

        let [source, callback] = invocation.arguments.as_slice() else {
            return None;
        };

        let Operation::DelegateCreation(closure) = &callback.value else {
            return None;
        };
        let DelegateTarget::AnonymousFunction(function) = &closure.target else {
            return None;
        };
        if !function.returns_void {
            return None;
        }
        let [parameter] = function.parameters.as_slice() else {
            return None;
        };

        Some(ForEachMatch {
            invocation: invocation.clone(),
            source: source.syntax.clone(),
            closure: closure.clone(),
            function: function.clone(),
            parameter: parameter.clone(),
        })
    }
}
