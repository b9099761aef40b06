//! Placeholder substitution into an html shell.
//!
//! A placeholder is `{{name}}`, optionally padded with spaces or tabs inside
//! the braces. Names start with a letter or `_` and may contain letters,
//! digits, `_` and `-`. Anything else, including lone `{{`, is copied
//! through verbatim.

use regex::Regex;
use std::{collections::BTreeMap, fs, io, path::Path, sync::LazyLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template placeholder `{0}` has no value")]
    MissingKey(String),
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[ \t]*([A-Za-z_][A-Za-z0-9_-]*)[ \t]*\}\}").unwrap());

/// An html shell with named placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(Self::new)
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        PLACEHOLDER
            .captures_iter(&self.source)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    }

    /// Replace every placeholder with its value.
    ///
    /// Values are inserted as-is (they are html already). Fails on the first
    /// placeholder without a value.
    pub fn substitute(&self, params: &BTreeMap<String, String>) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = params
                .get(name.as_str())
                .ok_or_else(|| TemplateError::MissingKey(name.as_str().to_owned()))?;

            output.push_str(&self.source[last..whole.start()]);
            output.push_str(value);
            last = whole.end();
        }

        output.push_str(&self.source[last..]);
        Ok(output)
    }
}
