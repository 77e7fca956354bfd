/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! Rendering walks the parsed tree once. Partials are handled before the walk
//! of each block: their text is tokenized with the template's delimiters and
//! spliced into the block's token stream, then the blocks are paired again.
//! This lets a partial open or close a section of the including text.
//!
//! Within a block:
//!
//! - sections render their body zero, one or many times, each list element
//!   overlaid on the enclosing scope for its iteration;
//! - inverted sections render their body once when the value is falsy;
//! - variables are replaced by the display string of their value.
//!
//! A partial whose name is unknown in the enclosing scope is kept in the
//! token stream, so it can still be expanded inside a section whose
//! iteration binds the name. Partials that stay unknown render nothing.

use crate::ast::{Section, TemplateNode, Variable};
use crate::context::{ContentSource, Context, Scope, Value};
use crate::error::TemplateResult;
use crate::eval_context::{Diagnostic, EvalContext};
use crate::loader::{ContentLoader, NullLoader};
use crate::options::RenderOptions;
use crate::parser::{Tag, TagKind, Template, Token, parse_tokens};
use std::ops::Range;

/// Output of a render together with the diagnostics collected along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl Template {
    /// Render this template with the given context.
    ///
    /// Partials must be given inline; resource partials are skipped.
    pub fn render(&self, context: &Context) -> TemplateResult<String> {
        self.render_with(context, &NullLoader)
    }

    /// Render this template, fetching resource partials through `loader`.
    pub fn render_with(
        &self,
        context: &Context,
        loader: &dyn ContentLoader,
    ) -> TemplateResult<String> {
        self.render_with_options(context, loader, &RenderOptions::default())
    }

    /// Render this template with explicit options.
    pub fn render_with_options(
        &self,
        context: &Context,
        loader: &dyn ContentLoader,
        options: &RenderOptions,
    ) -> TemplateResult<String> {
        Ok(self.render_report(context, loader, options)?.output)
    }

    /// Render this template and return the collected diagnostics too.
    pub fn render_report(
        &self,
        context: &Context,
        loader: &dyn ContentLoader,
        options: &RenderOptions,
    ) -> TemplateResult<RenderOutput> {
        let mut eval = EvalContext::new(loader, &self.tokenizer, options);
        let scope = Scope::root(context);
        let mut output = String::with_capacity(self.source.len());
        render_block(
            &self.nodes,
            &self.tokens,
            0..self.tokens.len(),
            &scope,
            &mut eval,
            &mut output,
        )?;
        Ok(RenderOutput {
            output,
            diagnostics: eval.into_diagnostics(),
        })
    }
}

/// Render a block given both as parsed nodes and as the token range they
/// were parsed from.
///
/// Blocks without partials render their nodes directly. Otherwise the
/// partials are expanded in `scope` and the resulting tokens parsed again.
fn render_block(
    nodes: &[TemplateNode],
    tokens: &[Token],
    range: Range<usize>,
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    if !nodes.iter().any(TemplateNode::contains_partial) {
        return render_nodes(nodes, tokens, scope, eval, out);
    }
    let mut expanded = Vec::with_capacity(range.len());
    expand_partials(&tokens[range], scope, eval, &mut expanded)?;
    let nodes = parse_tokens(&expanded)?;
    render_nodes(&nodes, &expanded, scope, eval, out)
}

/// Copy `tokens` into `out`, replacing every partial tag bound in `scope` by
/// the tokens of its text. Nested partials are expanded the same way.
fn expand_partials(
    tokens: &[Token],
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut Vec<Token>,
) -> TemplateResult<()> {
    for token in tokens {
        let tag = match token {
            Token::Tag(tag) if tag.kind == TagKind::Partial => tag,
            other => {
                out.push(other.clone());
                continue;
            }
        };
        let Some(value) = scope.lookup(&tag.name) else {
            out.push(token.clone());
            continue;
        };
        let Some(text) = partial_text(tag, value, eval)? else {
            continue;
        };

        eval.enter_partial(&tag.name)?;
        tracing::debug!(
            partial = %tag.name,
            depth = eval.partial_depth,
            "Including partial"
        );
        let inner = eval.tokenizer.tokenize(&text);
        let result = expand_partials(&inner, scope, eval, out);
        eval.exit_partial();
        result?;
    }
    Ok(())
}

/// Text of a bound partial, or `None` when its resource could not be loaded.
fn partial_text(
    tag: &Tag,
    value: &Value,
    eval: &mut EvalContext<'_>,
) -> TemplateResult<Option<String>> {
    match value {
        Value::Source(ContentSource::Resource(identifier)) => match eval.loader.load(identifier) {
            Ok(text) => Ok(Some(text)),
            Err(error) => {
                eval.partial_unavailable(&tag.name, error, tag.span)?;
                Ok(None)
            }
        },
        other => Ok(Some(other.display().into_owned())),
    }
}

fn render_nodes(
    nodes: &[TemplateNode],
    tokens: &[Token],
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    for node in nodes {
        render_node(node, tokens, scope, eval, out)?;
    }
    Ok(())
}

fn render_node(
    node: &TemplateNode,
    tokens: &[Token],
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    match node {
        TemplateNode::Literal(lit) => {
            out.push_str(&lit.text);
            Ok(())
        }
        TemplateNode::Variable(var) => render_variable(var, scope, eval, out),
        TemplateNode::Section(section) => render_section(section, tokens, scope, eval, out),
        TemplateNode::InvertedSection(section) => {
            render_inverted_section(section, tokens, scope, eval, out)
        }
        // Bound partials were expanded before this walk.
        TemplateNode::Partial(_) => Ok(()),
    }
}

/// Replace a variable tag by its value; unknown names stay as written.
fn render_variable(
    var: &Variable,
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    match scope.lookup(&var.name) {
        Some(value) => out.push_str(&value.display()),
        None => {
            eval.undefined_variable(&var.name, var.span)?;
            out.push_str(&var.raw);
        }
    }
    Ok(())
}

fn render_body(
    section: &Section,
    tokens: &[Token],
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    render_block(
        &section.body,
        tokens,
        section.body_tokens.clone(),
        scope,
        eval,
        out,
    )
}

/// Render a section body once per list element, once for any other truthy
/// value, and not at all for falsy or unknown names.
fn render_section(
    section: &Section,
    tokens: &[Token],
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    let Some(value) = scope.lookup(&section.name) else {
        return Ok(());
    };
    match value {
        Value::List(items) => {
            for item in items {
                let child = scope.child(item);
                render_body(section, tokens, &child, eval, out)?;
            }
        }
        Value::Map(ctx) => {
            let child = scope.child(ctx);
            render_body(section, tokens, &child, eval, out)?;
        }
        value if value.is_truthy() => render_body(section, tokens, scope, eval, out)?,
        _ => {}
    }
    Ok(())
}

/// Render an inverted section body once when the name is bound to a falsy
/// value. Unknown names render nothing.
fn render_inverted_section(
    section: &Section,
    tokens: &[Token],
    scope: &Scope<'_>,
    eval: &mut EvalContext<'_>,
    out: &mut String,
) -> TemplateResult<()> {
    match scope.lookup(&section.name) {
        Some(value) if !value.is_truthy() => render_body(section, tokens, scope, eval, out),
        _ => Ok(()),
    }
}
