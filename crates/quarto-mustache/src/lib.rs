/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Minimal mustache-style template engine for Quarto.
//!
//! Templates contain tags bounded by a configurable delimiter pair
//! (`{{`/`}}` by default). Four tag kinds are supported:
//!
//! - Variable interpolation: `{{name}}` or `{{user.name}}`
//! - Sections: `{{#items}}...{{/items}}`, rendered once per list element,
//!   once for any other truthy value
//! - Inverted sections: `{{^items}}...{{/items}}`, rendered when the value
//!   is `false` or an empty list
//! - Partials: `{{>header}}`, replaced by another template's rendered text
//!
//! Unknown variables are left as written; unknown sections and partials are
//! dropped. Malformed or unterminated tags stay in the output as literal
//! text, and so are the variables inside a block that never closed.
//! Rendering fails only in strict mode, when partials nest deeper than
//! [`RenderOptions::max_partial_depth`] or when sections nest deeper than
//! [`MAX_SECTION_DEPTH`].
//!
//! # Architecture
//!
//! A template is parsed once into a tree of [`TemplateNode`]s and rendered by
//! a single walk over that tree. Section iterations overlay each list element
//! on the enclosing [`Scope`]. Partial text comes either inline from the
//! [`Context`] or from a [`ContentLoader`], and is spliced in before the
//! sections around it are paired, so a partial may open or close a section.
//!
//! # Example
//!
//! ```
//! use quarto_mustache::{Context, Template};
//!
//! let template = Template::compile("{{#items}}{{name}} {{/items}}{{^more}}done{{/more}}")?;
//!
//! let ctx = Context::new()
//!     .with("items", vec![
//!         Context::new().with("name", "a"),
//!         Context::new().with("name", "b"),
//!     ])
//!     .with("more", false);
//!
//! assert_eq!(template.render(&ctx)?, "a b done");
//! # Ok::<(), quarto_mustache::TemplateError>(())
//! ```

pub mod ast;
pub mod context;
pub mod delimiters;
pub mod error;
pub mod eval_context;
pub mod evaluator;
pub mod loader;
pub mod options;
pub mod parser;

// Re-export main types at crate root
pub use ast::{Literal, Partial, Section, Span, TemplateNode, Variable};
pub use context::{ContentSource, Context, Scope, Value};
pub use delimiters::Delimiters;
pub use error::{LoadError, TemplateError, TemplateResult};
pub use eval_context::{Diagnostic, DiagnosticCollector, EvalContext};
pub use evaluator::RenderOutput;
pub use loader::{
    ContentLoader, FileSystemLoader, MemoryLoader, NullLoader, read_contents,
    read_contents_from_path,
};
pub use options::RenderOptions;
pub use parser::{MAX_SECTION_DEPTH, Template};

/// Compile and render `source` with the default delimiters.
pub fn render(source: &str, context: &Context) -> TemplateResult<String> {
    Template::compile(source)?.render(context)
}
