//! Polling watch loop for live re-rendering.
//!
//! A background thread owns the [`Renderer`] and runs a render pass every
//! interval. Staleness is decided by the renderer (source and template
//! modification times), so polling needs no filesystem event source.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  WatchEvent   ┌──────────────────┐
//! │  Watcher Thread  │──────────────▶│   Main Thread    │
//! │ sleep ─▶ render  │   (mpsc)      │ log / keep going │
//! └────────┬─────────┘               └──────────────────┘
//!          │ shutdown flag (Ctrl+C)
//!          ▼
//!        exit, joined by `Watcher::stop`
//! ```
//!
//! A pass that takes longer than the interval just delays the next one.
//!
//! Broken documents are retried every pass, but a failure is only reported
//! when its message changes, so a file left broken is reported once.

use crate::{
    log,
    logger::WatchStatus,
    render::{RenderReport, Renderer},
};
use anyhow::{Context, Result};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Granularity of the shutdown check while sleeping.
const SLEEP_STEP: Duration = Duration::from_millis(100);

/// Result of a render pass worth telling the main thread about.
#[derive(Debug)]
pub enum WatchEvent {
    /// At least one page was written.
    Rendered(RenderReport),
    /// Some documents (or the whole pass) failed with a new error; the loop
    /// keeps running.
    Failed(String),
}

/// Handle to the background watch loop.
pub struct Watcher {
    handle: Option<JoinHandle<()>>,
    events: Receiver<WatchEvent>,
    shutdown: Arc<AtomicBool>,
}

impl Watcher {
    /// Move `renderer` into a new thread that re-renders every `interval`.
    pub fn spawn(renderer: Renderer, interval: Duration, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("watch".into())
            .spawn(move || watch_loop(renderer, interval, &flag, &tx))
            .context("Failed to spawn watch thread")?;

        Ok(Self {
            handle: Some(handle),
            events: rx,
            shutdown,
        })
    }

    /// Events produced since the last call, without blocking.
    pub fn try_events(&self) -> impl Iterator<Item = WatchEvent> + '_ {
        self.events.try_iter()
    }

    /// Ask the loop to exit and wait for it.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log!("watch"; "watch thread panicked");
        }
    }
}

fn watch_loop(
    mut renderer: Renderer,
    interval: Duration,
    shutdown: &AtomicBool,
    tx: &Sender<WatchEvent>,
) {
    let mut last_failure = String::new();

    while sleep_unless_shutdown(interval, shutdown) {
        let (rendered, failure) = match renderer.render_pass(false) {
            Ok(report) => {
                let failure = report.failure_summary();
                ((!report.rendered.is_empty()).then_some(report), failure)
            }
            Err(err) => (None, format!("{err:#}")),
        };

        let mut events = Vec::with_capacity(2);
        if let Some(report) = rendered {
            events.push(WatchEvent::Rendered(report));
        }
        if failure != last_failure {
            if !failure.is_empty() {
                events.push(WatchEvent::Failed(failure.clone()));
            }
            last_failure = failure;
        }

        // Receiver gone means the main thread is done with us.
        if events.into_iter().any(|event| tx.send(event).is_err()) {
            break;
        }
    }
}

/// Sleep for `interval` in small steps.
///
/// Returns `false` as soon as shutdown is requested.
fn sleep_unless_shutdown(interval: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_STEP.min(deadline - now));
    }
}

/// Report a watch event on the terminal.
pub fn log_event(event: &WatchEvent, status: &mut WatchStatus, output: &Path) {
    match event {
        WatchEvent::Rendered(report) => {
            let names: Vec<_> = report
                .rendered
                .iter()
                .map(|p| p.strip_prefix(output).unwrap_or(p).display().to_string())
                .collect();
            let reason = if report.template_reloaded { " (template changed)" } else { "" };
            status.success(&format!("rendered{reason}: {}", names.join(", ")));
        }
        WatchEvent::Failed(err) => {
            status.error("render failed, retrying until fixed", err);
            status.detach();
        }
    }
}
