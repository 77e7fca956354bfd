/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! A parsed template is a list of [`TemplateNode`]s. Sections own their
//! bodies, so nesting is explicit in the tree. Each node records the byte
//! span it was parsed from, relative to the text it came from (the template
//! source, or the text of a partial).

use std::ops::Range;

/// Byte range of a node in its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Literal(Literal),

    /// Variable interpolation: `{{name}}` or `{{user.name}}`
    Variable(Variable),

    /// Section: `{{#name}}...{{/name}}`
    Section(Section),

    /// Inverted section: `{{^name}}...{{/name}}`
    InvertedSection(Section),

    /// Partial inclusion: `{{>name}}`
    Partial(Partial),
}

/// Literal text node.
///
/// Unterminated sections and stray closing tags end up here too, verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub text: String,
    pub span: Span,
}

/// Variable tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Tag name with surrounding whitespace trimmed.
    pub name: String,
    /// The tag exactly as written, emitted when the name is unknown.
    pub raw: String,
    pub span: Span,
}

/// Section or inverted section block.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub body: Vec<TemplateNode>,
    /// Span from the start of the opening tag to the end of the closing tag.
    pub span: Span,
    /// Indices of the body in the token stream the section was parsed from.
    pub(crate) body_tokens: Range<usize>,
}

/// Partial tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    pub name: String,
    pub span: Span,
}

impl TemplateNode {
    /// Source span of this node.
    pub fn span(&self) -> Span {
        match self {
            TemplateNode::Literal(lit) => lit.span,
            TemplateNode::Variable(var) => var.span,
            TemplateNode::Section(section) | TemplateNode::InvertedSection(section) => {
                section.span
            }
            TemplateNode::Partial(partial) => partial.span,
        }
    }

    /// Whether this node is, or contains, a partial tag.
    pub fn contains_partial(&self) -> bool {
        match self {
            TemplateNode::Partial(_) => true,
            TemplateNode::Section(section) | TemplateNode::InvertedSection(section) => {
                section.body.iter().any(TemplateNode::contains_partial)
            }
            TemplateNode::Literal(_) | TemplateNode::Variable(_) => false,
        }
    }
}

/// Append a node, merging adjacent literals into one.
pub(crate) fn push_node(nodes: &mut Vec<TemplateNode>, node: TemplateNode) {
    if let TemplateNode::Literal(lit) = node {
        push_literal(nodes, &lit.text, lit.span);
    } else {
        nodes.push(node);
    }
}

/// Append literal text, extending the previous literal when there is one.
pub(crate) fn push_literal(nodes: &mut Vec<TemplateNode>, text: &str, span: Span) {
    if text.is_empty() {
        return;
    }
    if let Some(TemplateNode::Literal(last)) = nodes.last_mut() {
        last.text.push_str(text);
        last.span = last.span.to(span);
    } else {
        nodes.push(TemplateNode::Literal(Literal {
            text: text.to_string(),
            span,
        }));
    }
}
