//! mdpub - render markdown into copy-ready html pages and preview them.

mod cli;
mod config;
mod logger;
mod open;
mod render;
mod serve;
mod watch;

use anyhow::{Context, Result, bail};
use cli::Cli;
use config::{PubConfig, defaults};
use render::{
    Renderer,
    assets::{copy_static_files, static_files},
};
use serve::{ServeContext, serve_site};
use std::{
    fs,
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, atomic::AtomicBool},
};
use tempfile::TempDir;
use watch::Watcher;

fn main() -> ExitCode {
    let cli = Cli::parse_with_env();
    debug!(cli.debug; "arguments: {cli:#?}");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.debug {
                eprintln!("Error: {err:?}");
            } else {
                eprintln!("Error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = PubConfig::from_cli(cli)?;
    if config.debug {
        let dump = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        debug!(true; "config: {dump}");
    }
    if config.dryrun {
        log!("dryrun"; "arguments are valid");
        return Ok(());
    }

    // Held until exit; dropping it removes the directory.
    let (output, _temp_dir) = prepare_output(&config)?;
    log!("output"; "{}", output.display());

    let copied = copy_static_files(&static_files(&config), &output)?;
    debug!(config.debug; "copied {copied} static files");

    let mut renderer = Renderer::new(&config, &output)?;
    let report = renderer.render_pass(true)?;
    log!("render"; "rendered {} pages", report.rendered.len());
    for (_, err) in &report.failed {
        log!("error"; "{err}");
    }

    if !config.serve.enable {
        if !report.failed.is_empty() {
            let total = report.failed.len() + report.rendered.len();
            bail!("{} of {total} pages failed to render", report.failed.len());
        }
        return Ok(());
    }

    let (server, addr) = serve::bind(config.serve.port)?;
    let shutdown = Arc::new(AtomicBool::new(false));

    let watcher = Watcher::spawn(renderer, defaults::WATCH_INTERVAL, Arc::clone(&shutdown))?;
    let opener = if config.serve.open_browser {
        Some(
            open::spawn_opener(config.page_url(), defaults::OPEN_DELAY, Arc::clone(&shutdown))
                .context("Failed to spawn browser opener")?,
        )
    } else {
        None
    };

    serve_site(
        server,
        addr,
        ServeContext {
            root: output,
            shutdown,
            watcher: Some(watcher),
            opener,
        },
    )
}

/// Create the output directory, or a temporary one when none was given.
fn prepare_output(config: &PubConfig) -> Result<(PathBuf, Option<TempDir>)> {
    match &config.output {
        Some(output) => {
            fs::create_dir_all(output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            Ok((output.clone(), None))
        }
        None => {
            let temp = tempfile::Builder::new()
                .prefix("mdpub-")
                .tempdir()
                .context("Failed to create temporary output directory")?;
            Ok((temp.path().to_path_buf(), Some(temp)))
        }
    }
}
