/*
 * eval_context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation context for template rendering.
//!
//! This module provides [`EvalContext`], which is threaded through all render
//! functions to support:
//!
//! 1. **Diagnostics**: Collect warnings for unresolved variables and partials
//! 2. **State tracking**: Partial nesting depth for recursion protection
//! 3. **Configuration**: Strict mode, where those warnings fail the render

use crate::ast::Span;
use crate::error::{LoadError, TemplateError, TemplateResult};
use crate::loader::ContentLoader;
use crate::options::RenderOptions;
use crate::parser::Tokenizer;

/// Diagnostic code for an undefined variable.
pub const UNDEFINED_VARIABLE: &str = "M-1";

/// Diagnostic code for a partial resource that was not found.
pub const PARTIAL_NOT_FOUND: &str = "M-2";

/// Diagnostic code for a partial resource that could not be read.
pub const PARTIAL_UNREADABLE: &str = "M-3";

/// A warning produced while rendering.
///
/// Strict renders never produce diagnostics: the same conditions are
/// returned as a [`TemplateError`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// One of [`UNDEFINED_VARIABLE`], [`PARTIAL_NOT_FOUND`] or [`PARTIAL_UNREADABLE`].
    pub code: &'static str,
    pub message: String,
    /// Span of the offending tag in the text it was parsed from.
    pub span: Option<Span>,
}

/// Collector for diagnostic messages during template evaluation.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty diagnostic collector.
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Add a warning with its code and source location.
    pub fn warn_with_code(&mut self, code: &'static str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic {
            code,
            message: message.into(),
            span: Some(span),
        });
    }

    /// Get a reference to the collected diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the collector and return the diagnostics in the order they
    /// were produced.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Context for template evaluation.
///
/// Variable bindings are not stored here: they change with every section
/// iteration and are passed alongside as a [`Scope`](crate::context::Scope).
pub struct EvalContext<'a> {
    /// Fetches resource partials.
    pub loader: &'a dyn ContentLoader,

    /// Parses partial text with the including template's delimiters.
    pub(crate) tokenizer: &'a Tokenizer,

    /// Diagnostic collector for warnings.
    pub diagnostics: DiagnosticCollector,

    /// Current partial nesting depth (for recursion protection).
    pub partial_depth: usize,

    /// Maximum partial nesting depth before error.
    pub max_partial_depth: usize,

    /// Strict mode: fail instead of recording a warning.
    pub strict_mode: bool,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(
        loader: &'a dyn ContentLoader,
        tokenizer: &'a Tokenizer,
        options: &RenderOptions,
    ) -> Self {
        Self {
            loader,
            tokenizer,
            diagnostics: DiagnosticCollector::new(),
            partial_depth: 0,
            max_partial_depth: options.max_partial_depth,
            strict_mode: options.strict,
        }
    }

    /// Record a variable that is not in scope.
    ///
    /// The tag is left in the output either way; strict mode fails the render.
    pub fn undefined_variable(&mut self, name: &str, span: Span) -> TemplateResult<()> {
        if self.strict_mode {
            return Err(TemplateError::UndefinedVariable {
                name: name.to_string(),
            });
        }
        self.diagnostics.warn_with_code(
            UNDEFINED_VARIABLE,
            format!("Undefined variable: {}", name),
            span,
        );
        Ok(())
    }

    /// Record a partial whose resource could not be loaded.
    ///
    /// The failure is logged and the tag is dropped; strict mode fails the
    /// render instead.
    pub fn partial_unavailable(
        &mut self,
        name: &str,
        error: LoadError,
        span: Span,
    ) -> TemplateResult<()> {
        tracing::warn!(partial = name, error = %error, "Skipping partial that could not be loaded");
        if self.strict_mode {
            return Err(error.into_template_error(name));
        }
        let code = match error {
            LoadError::NotFound { .. } => PARTIAL_NOT_FOUND,
            LoadError::Io { .. } => PARTIAL_UNREADABLE,
        };
        self.diagnostics
            .warn_with_code(code, format!("Partial '{}' skipped: {}", name, error), span);
        Ok(())
    }

    /// Enter a partial, failing when the nesting limit is reached.
    pub fn enter_partial(&mut self, name: &str) -> TemplateResult<()> {
        if self.partial_depth >= self.max_partial_depth {
            return Err(TemplateError::RecursivePartial {
                name: name.to_string(),
                max_depth: self.max_partial_depth,
            });
        }
        self.partial_depth += 1;
        Ok(())
    }

    /// Leave a partial entered with [`enter_partial`](Self::enter_partial).
    pub fn exit_partial(&mut self) {
        self.partial_depth = self.partial_depth.saturating_sub(1);
    }

    /// Consume the context and return collected diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiters::Delimiters;
    use crate::loader::NullLoader;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(Delimiters::default()).unwrap()
    }

    #[test]
    fn test_diagnostic_collector_new() {
        let collector = DiagnosticCollector::new();
        assert!(collector.diagnostics().is_empty());
    }

    #[test]
    fn test_diagnostic_collector_warn_with_code() {
        let mut collector = DiagnosticCollector::new();
        collector.warn_with_code(PARTIAL_NOT_FOUND, "Partial 'x' skipped", Span::new(0, 5));

        assert_eq!(collector.diagnostics().len(), 1);
        assert_eq!(collector.diagnostics()[0].code, "M-2");
        assert_eq!(collector.diagnostics()[0].span, Some(Span::new(0, 5)));
    }

    #[test]
    fn test_eval_context_new() {
        let tokenizer = tokenizer();
        let ctx = EvalContext::new(&NullLoader, &tokenizer, &RenderOptions::default());

        assert!(!ctx.strict_mode);
        assert_eq!(ctx.partial_depth, 0);
        assert_eq!(ctx.max_partial_depth, 50);
        assert!(ctx.diagnostics.diagnostics().is_empty());
    }

    #[test]
    fn test_undefined_variable_warns_or_fails() {
        let tokenizer = tokenizer();

        let mut ctx = EvalContext::new(&NullLoader, &tokenizer, &RenderOptions::default());
        ctx.undefined_variable("foo", Span::new(0, 7)).unwrap();
        let diagnostics = ctx.into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, UNDEFINED_VARIABLE);

        let strict = RenderOptions::new().with_strict(true);
        let mut ctx = EvalContext::new(&NullLoader, &tokenizer, &strict);
        assert!(matches!(
            ctx.undefined_variable("foo", Span::new(0, 7)),
            Err(TemplateError::UndefinedVariable { .. })
        ));
        assert!(ctx.into_diagnostics().is_empty());
    }

    #[test]
    fn test_partial_unavailable_codes() {
        let tokenizer = tokenizer();
        let mut ctx = EvalContext::new(&NullLoader, &tokenizer, &RenderOptions::default());

        let not_found = LoadError::NotFound {
            identifier: "a".to_string(),
        };
        ctx.partial_unavailable("a", not_found, Span::new(0, 6)).unwrap();

        let unreadable = LoadError::Io {
            identifier: "b".to_string(),
            source: std::io::Error::other("boom"),
        };
        ctx.partial_unavailable("b", unreadable, Span::new(6, 12)).unwrap();

        let codes: Vec<_> = ctx
            .into_diagnostics()
            .into_iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(codes, vec![PARTIAL_NOT_FOUND, PARTIAL_UNREADABLE]);
    }

    #[test]
    fn test_partial_depth_limit() {
        let tokenizer = tokenizer();
        let options = RenderOptions::new().with_max_partial_depth(2);
        let mut ctx = EvalContext::new(&NullLoader, &tokenizer, &options);

        ctx.enter_partial("p").unwrap();
        ctx.enter_partial("p").unwrap();
        assert!(matches!(
            ctx.enter_partial("p"),
            Err(TemplateError::RecursivePartial { max_depth: 2, .. })
        ));

        ctx.exit_partial();
        assert_eq!(ctx.partial_depth, 1);
        ctx.enter_partial("p").unwrap();
    }
}
