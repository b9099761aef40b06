//! Runtime configuration built from the command line.
//!
//! [`PubConfig`] is the single source of settings handed to every component.
//! It is produced by [`PubConfig::from_cli`], which validates all arguments
//! before anything is rendered:
//!
//! | Check                          | Error                              |
//! |--------------------------------|------------------------------------|
//! | `--codestyle` in known set     | [`ConfigError::UnsupportedStyle`]  |
//! | `--style` is a built-in style  | [`ConfigError::UnsupportedStyle`]  |
//! | markdown path exists           | [`ConfigError::InvalidPath`]       |
//! | `--output` is a directory      | [`ConfigError::InvalidPath`]       |
//! | server or `--output` present   | [`ConfigError::Validation`]        |
//! | `--template` is a file         | [`ConfigError::InvalidPath`]       |
//! | custom template if no statics  | [`ConfigError::Validation`]        |
//! | `--css` / `--script` resolve   | [`ConfigError::InvalidPath`]       |

pub mod defaults;
mod error;
pub mod styles;

pub use error::ConfigError;

use crate::cli::Cli;
use crate::render::assets::StaticRef;
use educe::Educe;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Http server settings.
#[derive(Debug, Clone, Educe, Serialize)]
#[educe(Default)]
pub struct ServeConfig {
    /// Start the server (and the watch loop).
    #[educe(Default = true)]
    pub enable: bool,

    #[educe(Default = defaults::port())]
    pub port: u16,

    /// Open the browser once the server is up.
    #[educe(Default = true)]
    pub open_browser: bool,
}

/// Validated settings for one run.
#[derive(Debug, Clone, Educe, Serialize)]
#[educe(Default)]
pub struct PubConfig {
    /// Markdown file or directory (absolute).
    pub content: PathBuf,

    /// Output directory; `None` renders into a temporary directory.
    pub output: Option<PathBuf>,

    /// Custom template; `None` uses the bundled one.
    pub template: Option<PathBuf>,

    pub style: StaticRef,

    pub script: StaticRef,

    #[educe(Default = defaults::code_style())]
    pub code_style: String,

    /// Copy `_basic.css` and `script.js` into the output directory.
    #[educe(Default = true)]
    pub basic_static: bool,

    pub serve: ServeConfig,

    pub debug: bool,

    pub dryrun: bool,
}

impl PubConfig {
    /// Validate command-line arguments into a config.
    ///
    /// Name checks run first so they fail without touching the filesystem.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let code_style = cli
            .codestyle
            .clone()
            .unwrap_or_else(defaults::code_style);
        if !styles::is_code_style(&code_style) {
            return Err(ConfigError::UnsupportedStyle {
                kind: "code style",
                name: code_style,
                available: styles::code_style_names(),
            });
        }

        let builtin = match (&cli.css, &cli.style) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "--style and --css cannot be used together".into(),
                ));
            }
            (Some(_), None) => None,
            (None, style) => Some(StaticRef::builtin(
                style.as_deref().unwrap_or(defaults::STYLE),
            )?),
        };

        let content = cli.mdpath.clone().unwrap_or_else(|| PathBuf::from("."));
        if !(content.is_file() || content.is_dir()) {
            return Err(ConfigError::invalid_path(
                "markdown",
                content,
                "expected a file or a directory",
            ));
        }

        let serve_enabled = !cli.noserver;
        let output = match &cli.output {
            Some(output) if output.exists() && !output.is_dir() => {
                return Err(ConfigError::invalid_path(
                    "output",
                    output,
                    "exists and is not a directory",
                ));
            }
            Some(output) => Some(normalize_path(output)),
            None if !serve_enabled => {
                return Err(ConfigError::Validation(
                    "no --output given: pages would go to a temporary directory that is \
                     removed on exit, so the server cannot be disabled"
                        .into(),
                ));
            }
            None => None,
        };

        let basic_static = !cli.no_basic_static;
        let template = match &cli.template {
            Some(template) if !template.is_file() => {
                return Err(ConfigError::invalid_path("template", template, "file does not exist"));
            }
            Some(template) => Some(normalize_path(template)),
            None if !basic_static => {
                return Err(ConfigError::Validation(
                    "the bundled template needs the basic static files, \
                     --no-basic-static only works with --template"
                        .into(),
                ));
            }
            None => None,
        };

        let style = match builtin {
            Some(style) => style,
            None => StaticRef::resolve(cli.css.as_deref(), "stylesheet")?,
        };
        let script = StaticRef::resolve(cli.script.as_deref(), "script")?;

        Ok(Self {
            content: normalize_path(&content),
            output,
            template,
            style,
            script,
            code_style,
            basic_static,
            serve: ServeConfig {
                enable: serve_enabled,
                port: cli.port.unwrap_or(defaults::PORT),
                open_browser: !cli.quite,
            },
            debug: cli.debug,
            dryrun: cli.dryrun,
        })
    }

    /// Url of the page to open once the server is up.
    ///
    /// Points at the rendered page when a single file is published, at the
    /// directory listing otherwise.
    pub fn page_url(&self) -> String {
        let mut url = format!("http://localhost:{}/", self.serve.port);
        if self.content.is_file()
            && let Some(stem) = self.content.file_stem()
        {
            url.push_str(&urlencoding::encode(&stem.to_string_lossy()));
            url.push_str(".html");
        }
        url
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
