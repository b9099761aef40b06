//! Markdown documents: front-matter splitting and html rendering.
//!
//! Front-matter is an optional block at the very top of a file:
//!
//! ```text
//! ---                 +++
//! title: Hello        title = "Hello"
//! ---                 +++
//! body...             body...
//! ```
//!
//! `---` fences hold YAML, `+++` fences hold TOML. Values are flattened to
//! strings so they can be substituted into the template.

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid YAML front-matter")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML front-matter")]
    Toml(#[from] toml::de::Error),

    #[error("front-matter must be a mapping of keys to values")]
    NotAMapping,
}

/// Front-matter syntax, picked by the fence line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fence {
    Yaml,
    Toml,
}

impl Fence {
    fn from_line(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            _ => None,
        }
    }

    const fn marker(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// A markdown file, read for a single render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub metadata: BTreeMap<String, String>,
    pub body: String,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(path, &text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, DocumentError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let (metadata, body) = match split_front_matter(text) {
            Some((Fence::Yaml, raw, body)) => (parse_yaml(raw)?, body),
            Some((Fence::Toml, raw, body)) => (parse_toml(raw)?, body),
            None => (BTreeMap::new(), text),
        };

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            body: body.to_owned(),
        })
    }

    /// File name without extension, used for the output page name.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn to_html(&self) -> String {
        markdown_to_html(&self.body)
    }
}

/// Split `text` into fence kind, raw front-matter and body.
///
/// Returns `None` when the text does not start with a fence or the fence is
/// never closed.
pub fn split_front_matter(text: &str) -> Option<(Fence, &str, &str)> {
    let first_end = text.find('\n')?;
    let fence = Fence::from_line(&text[..first_end])?;

    let rest = &text[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence.marker() {
            let raw = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((fence, raw, body));
        }
        offset += line.len();
    }

    None
}

fn parse_yaml(raw: &str) -> Result<BTreeMap<String, String>, DocumentError> {
    use serde_yaml::Value;

    match serde_yaml::from_str::<Value>(raw)? {
        Value::Null => Ok(BTreeMap::new()),
        Value::Mapping(map) => Ok(map
            .iter()
            .map(|(k, v)| (yaml_to_string(k), yaml_to_string(v)))
            .collect()),
        _ => Err(DocumentError::NotAMapping),
    }
}

fn yaml_to_string(value: &serde_yaml::Value) -> String {
    use serde_yaml::Value;

    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(seq) => seq.iter().map(yaml_to_string).collect::<Vec<_>>().join(", "),
        Value::Mapping(_) => serde_json::to_string(value).unwrap_or_default(),
        Value::Tagged(tagged) => yaml_to_string(&tagged.value),
    }
}

fn parse_toml(raw: &str) -> Result<BTreeMap<String, String>, DocumentError> {
    let table: toml::Table = toml::from_str(raw)?;
    Ok(table
        .iter()
        .map(|(k, v)| (k.clone(), toml_to_string(v)))
        .collect())
}

fn toml_to_string(value: &toml::Value) -> String {
    use toml::Value;

    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(items) => items.iter().map(toml_to_string).collect::<Vec<_>>().join(", "),
        Value::Table(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Render markdown with a fixed extension set.
///
/// Tables, footnotes, definition lists, strikethrough, autolinks and task
/// lists are enabled; headings get ids; single newlines become `<br>` since
/// the target editors drop soft line breaks. Raw html is kept.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = comrak::Options::default();
    options.extension.table = true;
    options.extension.footnotes = true;
    options.extension.description_lists = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.render.hardbreaks = true;
    options.render.unsafe_ = true;

    comrak::markdown_to_html(markdown, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Document {
        Document::parse(Path::new("notes/post.md"), text).unwrap()
    }

    #[test]
    fn test_yaml_front_matter() {
        let doc = parse("---\ntitle: Hello\ndraft: false\ncount: 3\n---\n# Body\n");
        assert_eq!(doc.metadata["title"], "Hello");
        assert_eq!(doc.metadata["draft"], "false");
        assert_eq!(doc.metadata["count"], "3");
        assert_eq!(doc.body, "# Body\n");
    }

    #[test]
    fn test_yaml_collections() {
        let doc = parse("---\ntags: [rust, web]\nauthor:\n  name: Li\nempty:\n---\nbody");
        assert_eq!(doc.metadata["tags"], "rust, web");
        assert_eq!(doc.metadata["author"], r#"{"name":"Li"}"#);
        assert_eq!(doc.metadata["empty"], "");
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_toml_front_matter() {
        let doc = parse("+++\ntitle = \"Hi\"\nyear = 2024\ntags = [\"a\", \"b\"]\n+++\ntext\n");
        assert_eq!(doc.metadata["title"], "Hi");
        assert_eq!(doc.metadata["year"], "2024");
        assert_eq!(doc.metadata["tags"], "a, b");
        assert_eq!(doc.body, "text\n");
    }

    #[test]
    fn test_no_front_matter() {
        let doc = parse("# Title\n\ntext");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "# Title\n\ntext");
    }

    #[test]
    fn test_unclosed_fence_is_body() {
        let text = "---\ntitle: x\nno closing fence";
        let doc = parse(text);
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, text);
    }

    #[test]
    fn test_empty_front_matter_and_crlf() {
        let doc = parse("---\r\n---\r\nbody");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "body");

        let doc = parse("\u{feff}---\r\ntitle: bom\r\n---\r\nbody");
        assert_eq!(doc.metadata["title"], "bom");
    }

    #[test]
    fn test_front_matter_must_be_mapping() {
        let err = Document::parse(Path::new("a.md"), "---\n- a\n- b\n---\n").unwrap_err();
        assert!(matches!(err, DocumentError::NotAMapping));

        let err = Document::parse(Path::new("a.md"), "---\ntitle: [oops\n---\n").unwrap_err();
        assert!(matches!(err, DocumentError::Yaml(_)));
    }

    #[test]
    fn test_stem() {
        assert_eq!(parse("").stem(), "post");
    }

    #[test]
    fn test_markdown_extensions() {
        let html = markdown_to_html("# Hello\n\nline one\nline two\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("id=\"hello\""), "{html}");
        assert!(html.contains("<br"), "{html}");
        assert!(html.contains("<table>"), "{html}");
        assert!(html.contains("<td>1</td>"), "{html}");
    }

    #[test]
    fn test_markdown_keeps_raw_html_and_code() {
        let html = markdown_to_html("<span class=\"x\">hi</span>\n\n```rust\nfn main() {}\n```\n");
        assert!(html.contains("<span class=\"x\">hi</span>"), "{html}");
        assert!(html.contains("language-rust"), "{html}");
    }
}
