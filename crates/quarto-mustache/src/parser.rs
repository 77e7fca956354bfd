/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! Parsing happens in two steps. The [`Tokenizer`] splits the source into
//! literal text and tags using the pattern built by
//! [`Delimiters::tag_pattern`]. The block parser then folds the token stream
//! into a tree, matching every `#`/`^` opening tag with its closing `/` tag.
//!
//! A compiled [`Template`] keeps its token stream next to the tree. Partial
//! text is spliced into the tokens at render time and the blocks are paired
//! again, so a partial can open or close a section of the including text.
//!
//! Text that looks like a tag but is not well formed, opening tags without a
//! closing tag and closing tags without an opening tag are all kept as
//! literal text. Variables inside a block that never closed are kept as
//! written too. The only parse failure is nesting deeper than
//! [`MAX_SECTION_DEPTH`].

use crate::ast::{Partial, Section, Span, TemplateNode, Variable, push_literal, push_node};
use crate::delimiters::Delimiters;
use crate::error::{TemplateError, TemplateResult};
use crate::loader::{read_contents, read_contents_from_path};
use regex::Regex;
use std::io::Read;
use std::path::Path;

/// Deepest section nesting accepted by the parser.
pub const MAX_SECTION_DEPTH: usize = 256;

/// A compiled template ready for rendering.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed template AST.
    pub(crate) nodes: Vec<TemplateNode>,

    /// Token stream the AST was folded from. Section bodies index into it.
    pub(crate) tokens: Vec<Token>,

    /// Tokenizer for these delimiters, reused for partial text at render time.
    pub(crate) tokenizer: Tokenizer,

    /// Source text the template was compiled from.
    pub(crate) source: String,
}

impl Template {
    /// Compile a template using the default `{{`/`}}` delimiters.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        Self::compile_with_delimiters(source, Delimiters::default())
    }

    /// Compile a template using custom delimiters.
    pub fn compile_with_delimiters(source: &str, delimiters: Delimiters) -> TemplateResult<Self> {
        let tokenizer = Tokenizer::new(delimiters)?;
        let tokens = tokenizer.tokenize(source);
        let nodes = parse_tokens(&tokens)?;
        tracing::trace!(
            tokens = tokens.len(),
            nodes = nodes.len(),
            "Compiled template"
        );
        Ok(Template {
            nodes,
            tokens,
            tokenizer,
            source: source.to_string(),
        })
    }

    /// Compile a template read from a byte stream.
    pub fn compile_from_reader(reader: impl Read) -> TemplateResult<Self> {
        let source = read_contents(reader)?;
        Self::compile(&source)
    }

    /// Compile a template read from a file.
    pub fn compile_from_file(path: &Path) -> TemplateResult<Self> {
        let source = read_contents_from_path(path)?;
        Self::compile(&source)
    }

    /// Get the AST nodes of this template.
    ///
    /// Partials appear as [`TemplateNode::Partial`]; the blocks a partial
    /// may open or close are only paired at render time.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Get the template source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the delimiters this template was compiled with.
    pub fn delimiters(&self) -> &Delimiters {
        &self.tokenizer.delimiters
    }
}

/// Kind of a tag, given by its sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Variable,
    Section,
    Inverted,
    Close,
    Partial,
}

impl TagKind {
    fn from_sigil(sigil: Option<&str>) -> Self {
        match sigil {
            Some("#") => TagKind::Section,
            Some("^") => TagKind::Inverted,
            Some("/") => TagKind::Close,
            Some(">") => TagKind::Partial,
            _ => TagKind::Variable,
        }
    }
}

/// A tag as found by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    pub(crate) kind: TagKind,
    pub(crate) name: String,
    /// The tag exactly as written.
    pub(crate) raw: String,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Text(String, Span),
    Tag(Tag),
}

/// Splits template text into literal text and tags.
#[derive(Debug, Clone)]
pub(crate) struct Tokenizer {
    delimiters: Delimiters,
    pattern: Regex,
}

impl Tokenizer {
    pub(crate) fn new(delimiters: Delimiters) -> TemplateResult<Self> {
        let pattern = delimiters.tag_pattern()?;
        Ok(Self {
            delimiters,
            pattern,
        })
    }

    pub(crate) fn tokenize(&self, source: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut last = 0;
        for caps in self.pattern.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            if whole.start() > last {
                tokens.push(Token::Text(
                    source[last..whole.start()].to_string(),
                    Span::new(last, whole.start()),
                ));
            }
            tokens.push(Token::Tag(Tag {
                kind: TagKind::from_sigil(caps.get(1).map(|m| m.as_str())),
                name: name.as_str().to_string(),
                raw: whole.as_str().to_string(),
                span: whole.range().into(),
            }));
            last = whole.end();
        }
        if last < source.len() {
            tokens.push(Token::Text(
                source[last..].to_string(),
                Span::new(last, source.len()),
            ));
        }
        tokens
    }
}

/// A section whose closing tag has not been seen yet.
struct Frame<'t> {
    tag: &'t Tag,
    /// Index of the opening tag in the token stream.
    index: usize,
    children: Vec<TemplateNode>,
}

impl Frame<'_> {
    /// Turn a closed frame into its section node.
    fn close(self, close: &Tag, close_index: usize) -> TemplateNode {
        let section = Section {
            name: self.tag.name.clone(),
            body: self.children,
            span: self.tag.span.to(close.span),
            body_tokens: self.index + 1..close_index,
        };
        if self.tag.kind == TagKind::Inverted {
            TemplateNode::InvertedSection(section)
        } else {
            TemplateNode::Section(section)
        }
    }

    /// Give up on a frame that never closed. The opening tag and the
    /// variables directly inside it become literal text; nested blocks that
    /// did close are kept.
    fn flatten_into(self, nodes: &mut Vec<TemplateNode>) {
        push_literal(nodes, &self.tag.raw, self.tag.span);
        for child in self.children {
            match child {
                TemplateNode::Variable(var) => push_literal(nodes, &var.raw, var.span),
                other => push_node(nodes, other),
            }
        }
    }
}

fn current<'a>(root: &'a mut Vec<TemplateNode>, stack: &'a mut [Frame<'_>]) -> &'a mut Vec<TemplateNode> {
    match stack.last_mut() {
        Some(frame) => &mut frame.children,
        None => root,
    }
}

/// Fold a token stream into a node tree.
pub(crate) fn parse_tokens(tokens: &[Token]) -> TemplateResult<Vec<TemplateNode>> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let tag = match token {
            Token::Text(text, span) => {
                push_literal(current(&mut root, &mut stack), text, *span);
                continue;
            }
            Token::Tag(tag) => tag,
        };
        match tag.kind {
            TagKind::Variable => push_node(
                current(&mut root, &mut stack),
                TemplateNode::Variable(Variable {
                    name: tag.name.clone(),
                    raw: tag.raw.clone(),
                    span: tag.span,
                }),
            ),
            TagKind::Partial => push_node(
                current(&mut root, &mut stack),
                TemplateNode::Partial(Partial {
                    name: tag.name.clone(),
                    span: tag.span,
                }),
            ),
            TagKind::Section | TagKind::Inverted => {
                if stack.len() >= MAX_SECTION_DEPTH {
                    return Err(TemplateError::NestingTooDeep {
                        max_depth: MAX_SECTION_DEPTH,
                    });
                }
                stack.push(Frame {
                    tag,
                    index,
                    children: Vec::new(),
                });
            }
            TagKind::Close => match stack.iter().rposition(|frame| frame.tag.name == tag.name) {
                Some(position) => {
                    // Frames opened after the matching one never closed.
                    while stack.len() > position + 1 {
                        if let Some(frame) = stack.pop() {
                            frame.flatten_into(current(&mut root, &mut stack));
                        }
                    }
                    if let Some(frame) = stack.pop() {
                        let node = frame.close(tag, index);
                        push_node(current(&mut root, &mut stack), node);
                    }
                }
                None => push_literal(current(&mut root, &mut stack), &tag.raw, tag.span),
            },
        }
    }

    while let Some(frame) = stack.pop() {
        frame.flatten_into(current(&mut root, &mut stack));
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<TemplateNode> {
        Template::compile(source).unwrap().nodes
    }

    fn literal_text(node: &TemplateNode) -> &str {
        match node {
            TemplateNode::Literal(Literal { text, .. }) => text,
            other => panic!("Expected Literal node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literal() {
        let nodes = parse("Hello, World!");
        assert_eq!(nodes.len(), 1);
        assert_eq!(literal_text(&nodes[0]), "Hello, World!");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_parse_variable() {
        let nodes = parse("Hi {{ user.name }}!");
        assert_eq!(nodes.len(), 3);
        match &nodes[1] {
            TemplateNode::Variable(var) => {
                assert_eq!(var.name, "user.name");
                assert_eq!(var.raw, "{{ user.name }}");
                assert_eq!(var.span, Span::new(3, 18));
            }
            other => panic!("Expected Variable node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_partial() {
        let nodes = parse("{{ > header }}");
        match &nodes[0] {
            TemplateNode::Partial(partial) => assert_eq!(partial.name, "header"),
            other => panic!("Expected Partial node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_section_with_body() {
        let nodes = parse("{{#items}}- {{name}}{{/items}}");
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            TemplateNode::Section(section) => {
                assert_eq!(section.name, "items");
                assert_eq!(section.span, Span::new(0, 30));
                assert_eq!(section.body.len(), 2);
                assert_eq!(literal_text(&section.body[0]), "- ");
            }
            other => panic!("Expected Section node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inverted_section() {
        let nodes = parse("{{ ^ empty }}none{{ / empty }}");
        match &nodes[0] {
            TemplateNode::InvertedSection(section) => {
                assert_eq!(section.name, "empty");
                assert_eq!(literal_text(&section.body[0]), "none");
            }
            other => panic!("Expected InvertedSection node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_sections() {
        let nodes = parse("{{#out}}{{#in}}x{{/in}}{{^in}}y{{/in}}{{/out}}");
        assert_eq!(nodes.len(), 1);
        let TemplateNode::Section(outer) = &nodes[0] else {
            panic!("Expected Section node");
        };
        assert_eq!(outer.body.len(), 2);
        assert!(matches!(&outer.body[0], TemplateNode::Section(s) if s.name == "in"));
        assert!(matches!(&outer.body[1], TemplateNode::InvertedSection(s) if s.name == "in"));
    }

    #[test]
    fn test_parse_same_name_nesting_closes_innermost() {
        let nodes = parse("{{#a}}1{{#a}}2{{/a}}3{{/a}}");
        assert_eq!(nodes.len(), 1);
        let TemplateNode::Section(outer) = &nodes[0] else {
            panic!("Expected Section node");
        };
        assert_eq!(outer.body.len(), 3);
        assert!(matches!(&outer.body[1], TemplateNode::Section(s) if s.body.len() == 1));
    }

    #[test]
    fn test_parse_adjacent_sections_stay_separate() {
        let nodes = parse("{{#a}}X{{/a}} {{#a}}Y{{/a}}");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], TemplateNode::Section(_)));
        assert_eq!(literal_text(&nodes[1]), " ");
        assert!(matches!(&nodes[2], TemplateNode::Section(_)));
    }

    #[test]
    fn test_parse_mismatched_close_is_literal() {
        let nodes = parse("{{#a}}X{{/b}}");
        assert_eq!(nodes.len(), 1);
        assert_eq!(literal_text(&nodes[0]), "{{#a}}X{{/b}}");
    }

    #[test]
    fn test_parse_stray_close_is_literal() {
        let nodes = parse("a{{/b}}c");
        assert_eq!(nodes.len(), 1);
        assert_eq!(literal_text(&nodes[0]), "a{{/b}}c");
    }

    #[test]
    fn test_parse_unterminated_section_keeps_variables_literal() {
        let nodes = parse("{{#a}}Hi {{name}}");
        assert_eq!(nodes.len(), 1);
        assert_eq!(literal_text(&nodes[0]), "{{#a}}Hi {{name}}");
    }

    #[test]
    fn test_parse_mismatched_block_keeps_variables_literal() {
        let nodes = parse("{{#a}}{{x}}{{/b}}");
        assert_eq!(nodes.len(), 1);
        assert_eq!(literal_text(&nodes[0]), "{{#a}}{{x}}{{/b}}");
    }

    #[test]
    fn test_parse_unterminated_section_keeps_closed_blocks() {
        let nodes = parse("{{x}}{{#a}}{{#b}}{{y}}{{/b}}{{z}}");
        assert_eq!(nodes.len(), 4);
        assert!(matches!(&nodes[0], TemplateNode::Variable(v) if v.name == "x"));
        assert_eq!(literal_text(&nodes[1]), "{{#a}}");
        assert!(matches!(&nodes[2], TemplateNode::Section(s) if s.name == "b"));
        assert_eq!(literal_text(&nodes[3]), "{{z}}");
    }

    #[test]
    fn test_parse_section_body_token_range() {
        let template = Template::compile("a{{#s}}b{{c}}{{/s}}").unwrap();
        let TemplateNode::Section(section) = &template.nodes[1] else {
            panic!("Expected Section node");
        };
        assert_eq!(section.body_tokens, 2..4);
        assert!(matches!(&template.tokens[3], Token::Tag(tag) if tag.name == "c"));
    }

    #[test]
    fn test_parse_nesting_limit() {
        let within = "{{#a}}".repeat(MAX_SECTION_DEPTH) + &"{{/a}}".repeat(MAX_SECTION_DEPTH);
        assert!(Template::compile(&within).is_ok());

        let beyond = "{{#a}}".repeat(MAX_SECTION_DEPTH + 1);
        let err = Template::compile(&beyond).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::NestingTooDeep { max_depth } if max_depth == MAX_SECTION_DEPTH
        ));
    }

    #[test]
    fn test_parse_close_unwinds_unterminated_inner_frame() {
        let nodes = parse("{{#a}}{{#b}}x{{/a}}");
        assert_eq!(nodes.len(), 1);
        let TemplateNode::Section(section) = &nodes[0] else {
            panic!("Expected Section node");
        };
        assert_eq!(section.name, "a");
        assert_eq!(section.body.len(), 1);
        assert_eq!(literal_text(&section.body[0]), "{{#b}}x");
    }

    #[test]
    fn test_parse_malformed_tags_are_literal() {
        let nodes = parse("{{ two words }} {{}} {{#}} {{");
        assert_eq!(nodes.len(), 1);
        assert_eq!(literal_text(&nodes[0]), "{{ two words }} {{}} {{#}} {{");
    }

    #[test]
    fn test_parse_leftmost_tag_wins() {
        let nodes = parse("{{{a}}");
        assert_eq!(nodes.len(), 2);
        assert_eq!(literal_text(&nodes[0]), "{");
        assert!(matches!(&nodes[1], TemplateNode::Variable(v) if v.raw == "{{a}}"));
    }

    #[test]
    fn test_parse_custom_delimiters() {
        let delimiters = Delimiters::new("[[", "]]").unwrap();
        let template = Template::compile_with_delimiters("{{a}} [[#b]][[c]][[/b]]", delimiters)
            .unwrap();
        assert_eq!(template.delimiters().open(), "[[");
        assert_eq!(template.nodes.len(), 2);
        assert_eq!(literal_text(&template.nodes[0]), "{{a}} ");
        assert!(matches!(&template.nodes[1], TemplateNode::Section(s) if s.name == "b"));
    }

    #[test]
    fn test_parse_tags_across_newlines() {
        let nodes = parse("{{#nl}}\n{{line}}\n{{/nl}}");
        let TemplateNode::Section(section) = &nodes[0] else {
            panic!("Expected Section node");
        };
        assert_eq!(section.body.len(), 3);
        assert_eq!(literal_text(&section.body[0]), "\n");
    }

    #[test]
    fn test_compile_from_reader() {
        let template = Template::compile_from_reader("1 {{b}}".as_bytes()).unwrap();
        assert_eq!(template.source(), "1 {{b}}");
        assert_eq!(template.nodes().len(), 2);
    }
}
