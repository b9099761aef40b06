//! Style/script references and the static files copied next to the pages.

use crate::config::{ConfigError, PubConfig, styles};
use crate::log;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Stylesheet shared by every page rendered with the bundled template.
const BASIC_STYLE: &str = include_str!("../embed/css/_basic.css");
/// highlight.js line-break plugin and copy button wiring.
const MAIN_SCRIPT: &str = include_str!("../embed/js/script.js");

/// A stylesheet or script the pages refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StaticRef {
    /// Nothing to inject.
    #[default]
    None,
    /// An http(s) link used as-is.
    Link(String),
    /// A local file, copied into the output directory.
    File(PathBuf),
    /// A built-in style, written as `<name>.css`.
    Builtin(&'static str),
}

impl StaticRef {
    /// Resolve a `--css` / `--script` value.
    ///
    /// Values starting with `http://` or `https://` are links, anything else
    /// must be an existing file.
    pub fn resolve(value: Option<&str>, kind: &'static str) -> Result<Self, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::None);
        };

        if value.starts_with("http://") || value.starts_with("https://") {
            return Ok(Self::Link(value.to_owned()));
        }

        let path = Path::new(value);
        if !path.is_file() {
            return Err(ConfigError::invalid_path(kind, path, "file does not exist"));
        }
        Ok(Self::File(crate::config::normalize_path(path)))
    }

    /// Resolve a built-in style name.
    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        styles::builtin_style_names()
            .into_iter()
            .find(|style| *style == name)
            .map(Self::Builtin)
            .ok_or_else(|| ConfigError::UnsupportedStyle {
                kind: "style",
                name: name.to_owned(),
                available: styles::builtin_style_names(),
            })
    }

    /// The url pages use to load this reference.
    pub fn href(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Link(url) => Some(url.clone()),
            Self::File(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Builtin(name) => Some(format!("{name}.css")),
        }
    }

    pub fn style_tag(&self) -> String {
        self.href()
            .map(|href| format!(r#"<link href="{}" rel="stylesheet">"#, escape_attr(&href)))
            .unwrap_or_default()
    }

    pub fn script_tag(&self) -> String {
        self.href()
            .map(|href| format!(r#"<script src="{}"></script>"#, escape_attr(&href)))
            .unwrap_or_default()
    }

    /// The file that has to be present in the output directory, if any.
    fn static_file(&self) -> Option<StaticFile> {
        match self {
            Self::None | Self::Link(_) => None,
            Self::File(path) => Some(StaticFile {
                name: self.href()?,
                source: StaticSource::File(path.clone()),
            }),
            Self::Builtin(name) => Some(StaticFile {
                name: format!("{name}.css"),
                source: StaticSource::Embedded(styles::builtin_style(name)?),
            }),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

// ============================================================================
// Static files
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticSource {
    Embedded(&'static str),
    File(PathBuf),
}

/// A support file written into the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub name: String,
    pub source: StaticSource,
}

/// Collect the files the rendered pages depend on.
pub fn static_files(config: &PubConfig) -> Vec<StaticFile> {
    let mut files: Vec<_> = [&config.script, &config.style]
        .into_iter()
        .filter_map(StaticRef::static_file)
        .collect();

    if config.basic_static {
        files.push(StaticFile {
            name: "script.js".into(),
            source: StaticSource::Embedded(MAIN_SCRIPT),
        });
        files.push(StaticFile {
            name: "_basic.css".into(),
            source: StaticSource::Embedded(BASIC_STYLE),
        });
    }

    files
}

/// Write static files into `output`, returning how many were written.
///
/// Files that already live in `output` are left alone.
pub fn copy_static_files(files: &[StaticFile], output: &Path) -> Result<usize> {
    let output_dir = output.canonicalize().unwrap_or_else(|_| output.to_path_buf());
    let mut written = 0;

    for file in files {
        let dest = output_dir.join(&file.name);
        match &file.source {
            StaticSource::Embedded(content) => {
                fs::write(&dest, content)
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
            }
            StaticSource::File(source) => {
                if source.parent() == Some(output_dir.as_path()) {
                    continue;
                }
                fs::copy(source, &dest).with_context(|| {
                    format!("Failed to copy {} to {}", source.display(), dest.display())
                })?;
            }
        }
        log!("static"; "{}", file.name);
        written += 1;
    }

    Ok(written)
}
