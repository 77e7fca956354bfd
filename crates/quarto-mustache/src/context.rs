/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value and context types.
//!
//! A [`Context`] is the ordered name → [`Value`] mapping supplied for one
//! render. Sections iterate over child contexts; each iteration renders
//! against a [`Scope`] that overlays the child on top of the enclosing scope.

use crate::error::{TemplateError, TemplateResult};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;

/// Where the text of a partial comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// The partial text itself.
    Inline(String),

    /// An identifier handed to the [`ContentLoader`](crate::loader::ContentLoader)
    /// at render time (for the filesystem loader, a path).
    Resource(String),
}

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Anything rendered through its string form (strings, numbers, ...).
    Scalar(String),

    /// A boolean value.
    Bool(bool),

    /// Child contexts a section iterates over.
    List(Vec<Context>),

    /// A nested context.
    Map(Context),

    /// The target of a partial tag.
    Source(ContentSource),
}

impl Value {
    /// Create a scalar from anything with a string form.
    pub fn scalar(value: impl fmt::Display) -> Self {
        Value::Scalar(value.to_string())
    }

    /// Create an inline partial source.
    pub fn inline(text: impl Into<String>) -> Self {
        Value::Source(ContentSource::Inline(text.into()))
    }

    /// Create a partial source fetched through the content loader.
    pub fn resource(identifier: impl Into<String>) -> Self {
        Value::Source(ContentSource::Resource(identifier.into()))
    }

    /// Check if this value is "truthy".
    ///
    /// Only `false` and the empty list are falsy. Empty strings, empty maps
    /// and the string `"false"` are all truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Scalar(_) | Value::Map(_) | Value::Source(_) => true,
        }
    }

    /// The string substituted for a variable tag holding this value.
    ///
    /// - Scalar: returned as-is
    /// - Bool: "true" or "false"
    /// - List, Map: ""
    /// - Source: the inline text or the resource identifier
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Value::Scalar(s) => Cow::Borrowed(s),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::List(_) | Value::Map(_) => Cow::Borrowed(""),
            Value::Source(ContentSource::Inline(text)) => Cow::Borrowed(text),
            Value::Source(ContentSource::Resource(id)) => Cow::Borrowed(id),
        }
    }

    /// Get a nested field of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(ctx) => ctx.get(key),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(value.to_string())
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f64);

impl From<Vec<Context>> for Value {
    fn from(value: Vec<Context>) -> Self {
        Value::List(value)
    }
}

impl From<Context> for Value {
    fn from(value: Context) -> Self {
        Value::Map(value)
    }
}

impl From<ContentSource> for Value {
    fn from(value: ContentSource) -> Self {
        Value::Source(value)
    }
}

/// An ordered mapping from tag name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: IndexMap<String, Value>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a value at this level only.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a context from a JSON object.
    ///
    /// Strings and numbers become scalars, booleans stay booleans, objects
    /// become nested maps and `null` entries are skipped. Arrays become
    /// lists: object elements are child contexts and any other element is an
    /// empty child context, so `[1, 2]` still iterates twice.
    pub fn from_json(json: &serde_json::Value) -> TemplateResult<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(context_from_json_map(map)),
            other => Err(TemplateError::InvalidContext {
                message: format!("expected a JSON object, found {}", json_kind(other)),
            }),
        }
    }

    /// Parse JSON text and build a context from it.
    pub fn from_json_str(text: &str) -> TemplateResult<Self> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&json)
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (key, value) in iter {
            ctx.insert(key, value);
        }
        ctx
    }
}

impl TryFrom<serde_json::Value> for Context {
    type Error = TemplateError;

    fn try_from(json: serde_json::Value) -> TemplateResult<Self> {
        Context::from_json(&json)
    }
}

fn context_from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Context {
    map.iter()
        .filter_map(|(key, json)| value_from_json(json).map(|value| (key.as_str(), value)))
        .collect()
}

fn value_from_json(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => Some(Value::Scalar(n.to_string())),
        serde_json::Value::String(s) => Some(Value::Scalar(s.clone())),
        serde_json::Value::Array(items) => Some(Value::List(
            items
                .iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => context_from_json_map(map),
                    _ => Context::new(),
                })
                .collect(),
        )),
        serde_json::Value::Object(map) => Some(Value::Map(context_from_json_map(map))),
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// A chain of contexts used for lookups during rendering.
///
/// The innermost frame is checked first, so keys of a section element shadow
/// keys of the enclosing scope for the duration of that iteration only.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    frame: &'a Context,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// The scope of a top-level render.
    pub fn root(frame: &'a Context) -> Self {
        Self {
            frame,
            parent: None,
        }
    }

    /// Overlay `frame` on top of this scope.
    pub fn child<'b>(&'b self, frame: &'b Context) -> Scope<'b> {
        Scope {
            frame,
            parent: Some(self),
        }
    }

    /// Get a key, checking parent scopes.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.frame
            .get(key)
            .or_else(|| self.parent.and_then(|p| p.get(key)))
    }

    /// Resolve a tag name.
    ///
    /// The name is first looked up verbatim, so a flat key like `user.name`
    /// wins. Otherwise a dotted name walks nested maps: the first segment is
    /// resolved through the scope chain and the rest through map values.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        if let Some(value) = self.get(name) {
            return Some(value);
        }
        if !name.contains('.') {
            return None;
        }

        let mut segments = name.split('.');
        let mut value = self.get(segments.next()?)?;
        for segment in segments {
            value = value.get(segment)?;
        }
        Some(value)
    }
}
