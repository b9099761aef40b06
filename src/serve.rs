//! Preview server for the rendered pages.
//!
//! A small static file server built on `tiny_http`:
//!
//! - Static file serving from the output directory
//! - Automatic `index.html` resolution for directories
//! - Directory listing of the rendered pages
//! - Watch loop events logged between requests
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │   Main Thread   │◀────│  Watcher Thread  │     │  Opener Thread   │
//! │  (HTTP Server)  │ mpsc│ (poll + render)  │     │ (sleep + open)   │
//! └────────┬────────┘     └────────┬─────────┘     └────────┬─────────┘
//!          │ Ctrl+C: set shutdown flag, unblock server      │
//!          └──────────── stop + join ───────────────────────┘
//! ```

use crate::{
    log,
    logger::WatchStatus,
    watch::{Watcher, log_event},
};
use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, Cursor},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server, StatusCode};

// ============================================================================
// Constants - HTML Templates
// ============================================================================

/// Directory listing HTML template (embedded at compile time)
const DIRECTORY_TEMPLATE: &str = include_str!("embed/serve/directory.html");

/// Welcome page HTML template (shown when output directory is empty)
const WELCOME_TEMPLATE: &str = include_str!("embed/serve/welcome.html");

/// How long the request loop blocks before checking shutdown and watch events.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("port {0} is already in use, choose another one with --port")]
    PortInUse(u16),

    #[error("failed to start http server on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Everything the request loop runs alongside.
pub struct ServeContext {
    pub root: PathBuf,
    pub shutdown: Arc<AtomicBool>,
    pub watcher: Option<Watcher>,
    pub opener: Option<JoinHandle<()>>,
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Bind the server on all interfaces.
pub fn bind(port: u16) -> Result<(Server, SocketAddr), ServeError> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

    Server::http(addr)
        .map(|server| (server, addr))
        .map_err(|source| {
            let in_use = source
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::AddrInUse);
            if in_use {
                ServeError::PortInUse(port)
            } else {
                ServeError::Bind { addr, source }
            }
        })
}

/// Serve `ctx.root` until Ctrl+C.
///
/// On shutdown the watcher is stopped and the browser opener joined before
/// returning.
pub fn serve_site(server: Server, addr: SocketAddr, ctx: ServeContext) -> Result<()> {
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    let flag = Arc::clone(&ctx.shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://localhost:{}", addr.port());
    log!("serve"; "press Ctrl+C to stop");

    let mut status = WatchStatus::new();
    while !ctx.shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => {
                if let Err(e) = handle_request(request, &ctx.root) {
                    log!("serve"; "request error: {e}");
                    status.detach();
                }
            }
            Ok(None) => {}
            Err(e) => {
                log!("serve"; "{e}");
                status.detach();
            }
        }

        if let Some(watcher) = &ctx.watcher {
            for event in watcher.try_events() {
                log_event(&event, &mut status, &ctx.root);
            }
        }
    }

    log!("serve"; "shutting down...");
    if let Some(watcher) = ctx.watcher {
        watcher.stop();
    }
    if let Some(opener) = ctx.opener {
        opener.join().ok();
    }

    Ok(())
}

// ============================================================================
// Request Handling
// ============================================================================

/// What a request path maps to.
#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    File(PathBuf),
    Listing(String),
    NotFound,
}

fn handle_request(request: Request, root: &Path) -> Result<()> {
    match resolve(root, request.url()) {
        Resolved::File(path) => serve_file(request, &path),
        Resolved::Listing(html) => serve_html(request, html),
        Resolved::NotFound => serve_not_found(request),
    }
}

/// Resolve a request url against the served directory.
///
/// Resolution order:
/// 1. Exact file match → file
/// 2. Directory with index.html → index.html
/// 3. Directory without index.html → listing
/// 4. Nothing found, or a path escaping the root → 404
fn resolve(root: &Path, url: &str) -> Resolved {
    // Strip query string (e.g., ?t=123456) before decoding
    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    let url_path = urlencoding::decode(path_part)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    let request_path = url_path.trim_matches('/');

    let escapes = Path::new(request_path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Resolved::NotFound;
    }

    let local_path = root.join(request_path);

    if local_path.is_file() {
        return Resolved::File(local_path);
    }

    if local_path.is_dir() {
        let index_path = local_path.join("index.html");
        if index_path.is_file() {
            return Resolved::File(index_path);
        }
        if let Ok(listing) = generate_directory_listing(&local_path, request_path) {
            return Resolved::Listing(listing);
        }
    }

    Resolved::NotFound
}

// ============================================================================
// Response Helpers
// ============================================================================

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content)
        .with_header(Header::from_bytes("Content-Type", guess_content_type(path)).unwrap())
        .with_header(Header::from_bytes("Cache-Control", "no-cache").unwrap());

    request.respond(response)?;
    Ok(())
}

fn serve_html(request: Request, content: String) -> Result<()> {
    let response = Response::from_string(content)
        .with_header(Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap());
    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![Header::from_bytes("Content-Type", "text/plain").unwrap()],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Directory Listing
// ============================================================================

/// Generate HTML directory listing.
///
/// Only directories and `.html` files are shown, hidden entries are skipped.
/// Falls back to the welcome page when nothing is visible.
fn generate_directory_listing(dir_path: &Path, request_path: &str) -> io::Result<String> {
    let mut entries: Vec<_> = fs::read_dir(dir_path)?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (!name.starts_with('.') && (is_dir || name.ends_with(".html"))).then_some((name, is_dir))
        })
        .collect();

    if entries.is_empty() {
        return Ok(WELCOME_TEMPLATE
            .replace("{title}", "Welcome")
            .replace("{version}", env!("CARGO_PKG_VERSION")));
    }

    // Directories first, then pages, each by name
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let items: Vec<_> = entries
        .iter()
        .map(|(name, is_dir)| {
            let icon = if *is_dir { "📁" } else { "📄" };
            let encoded = urlencoding::encode(name);
            let href = if request_path.is_empty() {
                format!("/{encoded}")
            } else {
                format!("/{request_path}/{encoded}")
            };
            format!(r#"<li><span class="icon">{icon}</span><a href="{href}">{name}</a></li>"#)
        })
        .collect();

    let parent_link = if request_path.is_empty() {
        String::new()
    } else {
        let parent_path = Path::new(request_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            r#"<li class="parent"><span class="icon">📂</span><a href="/{parent_path}">..</a></li>"#
        )
    };

    #[allow(clippy::literal_string_with_formatting_args)]
    // These are template placeholders, not format args
    Ok(DIRECTORY_TEMPLATE
        .replace("{path}", request_path)
        .replace("{parent_link}", &parent_link)
        .replace("{entries}", &items.join("\n            ")))
}

// ============================================================================
// Tests
// ============================================================================
