/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render configuration.

use crate::error::TemplateResult;
use serde::Deserialize;

/// Default limit on nested partial inclusion.
pub const DEFAULT_MAX_PARTIAL_DEPTH: usize = 50;

/// Options controlling a render.
///
/// Deserializable from configuration; missing fields take their defaults:
///
/// ```json
/// { "strict": true, "max-partial-depth": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RenderOptions {
    /// Treat undefined variables and unloadable partials as errors instead
    /// of warnings.
    pub strict: bool,

    /// Maximum partial nesting depth before the render fails.
    pub max_partial_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_partial_depth: DEFAULT_MAX_PARTIAL_DEPTH,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the maximum partial nesting depth.
    pub fn with_max_partial_depth(mut self, depth: usize) -> Self {
        self.max_partial_depth = depth;
        self
    }

    /// Parse options from JSON text.
    pub fn from_json_str(text: &str) -> TemplateResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
