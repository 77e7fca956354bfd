/*
 * delimiters.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag delimiters.
//!
//! Every tag is bounded by an opening and a closing marker, `{{` and `}}` by
//! default. The markers are plain literals; [`Delimiters::tag_pattern`]
//! escapes them before embedding them in the tag regex so that characters
//! such as `[`, `(` or `$` never leak into the pattern syntax.

use crate::error::{TemplateError, TemplateResult};
use regex::Regex;
use serde::Deserialize;

/// Default opening delimiter.
pub const DEFAULT_OPEN: &str = "{{";

/// Default closing delimiter.
pub const DEFAULT_CLOSE: &str = "}}";

/// Characters allowed in a tag name.
const NAME_CLASS: &str = "[A-Za-z0-9_.]";

/// The pair of literal markers bounding every tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDelimiters")]
pub struct Delimiters {
    open: String,
    close: String,
}

#[derive(Deserialize)]
struct RawDelimiters {
    open: String,
    close: String,
}

impl TryFrom<RawDelimiters> for Delimiters {
    type Error = TemplateError;

    fn try_from(raw: RawDelimiters) -> TemplateResult<Self> {
        Delimiters::new(raw.open, raw.close)
    }
}

impl Delimiters {
    /// Create a delimiter pair. Both markers must be non-empty.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> TemplateResult<Self> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(TemplateError::InvalidDelimiters {
                message: format!(
                    "delimiters must be non-empty (open: {:?}, close: {:?})",
                    open, close
                ),
            });
        }
        Ok(Self { open, close })
    }

    /// The opening marker.
    pub fn open(&self) -> &str {
        &self.open
    }

    /// The closing marker.
    pub fn close(&self) -> &str {
        &self.close
    }

    /// The opening marker, escaped for use inside a regular expression.
    pub fn safe_open(&self) -> String {
        regex::escape(&self.open)
    }

    /// The closing marker, escaped for use inside a regular expression.
    pub fn safe_close(&self) -> String {
        regex::escape(&self.close)
    }

    /// Build the pattern recognizing a single tag.
    ///
    /// Capture group 1 is the optional sigil (`#`, `^`, `/` or `>`), group 2
    /// the tag name. Whitespace is allowed around both inside the markers.
    pub fn tag_pattern(&self) -> TemplateResult<Regex> {
        let pattern = format!(
            r"{open}\s*([#^/>])?\s*({name}+)\s*{close}",
            open = self.safe_open(),
            name = NAME_CLASS,
            close = self.safe_close(),
        );
        Ok(Regex::new(&pattern)?)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }
}
