//! Command-line interface definitions.
//!
//! Defines the CLI arguments using clap, plus the merge of default arguments
//! supplied through the `MDPUB_ARGS` environment variable.

use crate::config::defaults::ENV_ARGS;
use clap::{
    Parser,
    error::{ContextKind, ContextValue, ErrorKind},
};
use std::{ffi::OsString, path::PathBuf};
use thiserror::Error;

/// Render markdown files into copy-ready html pages and preview them.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "mdpub", version, about, long_about = None)]
pub struct Cli {
    /// Markdown file or the directory that contains them (default: current directory)
    pub mdpath: Option<PathBuf>,

    /// Output directory (default: a temporary directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Custom html template file
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Custom script, a file path or an http(s) link
    #[arg(long)]
    pub script: Option<String>,

    /// Built-in style name (default: cyan)
    #[arg(long, conflicts_with = "css")]
    pub style: Option<String>,

    /// Custom stylesheet, a file path or an http(s) link
    #[arg(long)]
    pub css: Option<String>,

    /// Code highlight style name (default: github-dark)
    #[arg(long)]
    pub codestyle: Option<String>,

    /// Do not copy the basic static files (_basic.css and script.js)
    #[arg(long = "no-basic-static")]
    pub no_basic_static: bool,

    /// Do not start the http server (requires --output)
    #[arg(long = "noserver", visible_alias = "noserve")]
    pub noserver: bool,

    /// Http server port (default: 8800)
    #[arg(long)]
    pub port: Option<u16>,

    /// Quiet mode, do not open the browser
    #[arg(short = 'q', long = "quite", visible_alias = "quiet")]
    pub quite: bool,

    /// Print debug information
    #[arg(long)]
    pub debug: bool,

    /// Validate the arguments and exit
    #[arg(long)]
    pub dryrun: bool,
}

/// Errors raised while reading default arguments from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvArgsError {
    #[error("unterminated quote in `{0}`")]
    UnterminatedQuote(String),

    #[error("trailing escape in `{0}`")]
    TrailingEscape(String),
}

impl Cli {
    /// Parse process arguments, merged over the defaults found in
    /// `MDPUB_ARGS`.
    ///
    /// Unusable environment arguments are reported and ignored; errors in the
    /// explicit arguments exit through clap as usual.
    pub fn parse_with_env() -> Self {
        let cli = Self::parse();

        let Ok(raw) = std::env::var(ENV_ARGS) else {
            return cli;
        };

        match Self::from_env_str(&raw) {
            Ok(env) => cli.merged_over(env),
            Err(err) => {
                crate::log!("warn"; "ignoring {ENV_ARGS}: {err}");
                cli
            }
        }
    }

    /// Parse a shell-quoted argument string as if it was given on the command line.
    ///
    /// Unknown arguments are dropped with a warning and the rest is kept.
    pub fn from_env_str(raw: &str) -> anyhow::Result<Self> {
        let mut args = split_args(raw)?;

        loop {
            let argv = std::iter::once(OsString::from("mdpub")).chain(args.iter().map(OsString::from));
            let err = match Self::try_parse_from(argv) {
                Ok(cli) => return Ok(cli),
                Err(err) if err.kind() == ErrorKind::UnknownArgument => err,
                Err(err) => return Err(err.into()),
            };

            let Some(pos) = unknown_arg_position(&err, &args) else {
                return Err(err.into());
            };
            let dropped = args.remove(pos);
            crate::log!("warn"; "ignoring unknown argument `{dropped}` in {ENV_ARGS}");
        }
    }

    /// Merge `self` (explicit arguments) over `env` (defaults).
    ///
    /// Values given explicitly win field by field. `--style` and `--css` are
    /// treated as one choice so an explicit one replaces an inherited other.
    pub fn merged_over(self, env: Self) -> Self {
        let style_chosen = self.style.is_some() || self.css.is_some();
        let (style, css) = if style_chosen {
            (self.style, self.css)
        } else {
            (env.style, env.css)
        };

        Self {
            mdpath: self.mdpath.or(env.mdpath),
            output: self.output.or(env.output),
            template: self.template.or(env.template),
            script: self.script.or(env.script),
            style,
            css,
            codestyle: self.codestyle.or(env.codestyle),
            no_basic_static: self.no_basic_static || env.no_basic_static,
            noserver: self.noserver || env.noserver,
            port: self.port.or(env.port),
            quite: self.quite || env.quite,
            debug: self.debug || env.debug,
            dryrun: self.dryrun || env.dryrun,
        }
    }
}

/// Index of the word clap rejected as unknown, matching `--flag=value` too.
fn unknown_arg_position(err: &clap::Error, args: &[String]) -> Option<usize> {
    let Some(ContextValue::String(invalid)) = err.get(ContextKind::InvalidArg) else {
        return None;
    };
    let invalid = invalid.split('=').next().unwrap_or(invalid);
    args.iter().position(|arg| {
        arg == invalid || arg.strip_prefix(invalid).is_some_and(|rest| rest.starts_with('='))
    })
}

/// Split a shell-like argument string into words.
///
/// Supports single quotes (literal), double quotes (with `\"` and `\\`
/// escapes) and backslash escapes outside quotes.
pub fn split_args(raw: &str) -> Result<Vec<String>, EnvArgsError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(EnvArgsError::UnterminatedQuote(raw.to_owned())),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(EnvArgsError::UnterminatedQuote(raw.to_owned())),
                        },
                        Some(c) => current.push(c),
                        None => return Err(EnvArgsError::UnterminatedQuote(raw.to_owned())),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(EnvArgsError::TrailingEscape(raw.to_owned())),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}
