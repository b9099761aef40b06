//! Opening the preview page in the default browser.
//!
//! The opener runs on its own thread so the server can start accepting
//! requests before the browser asks for the page.

use crate::log;
use anyhow::{Context, Result, bail};
use std::{
    process::{Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

const SLEEP_STEP: Duration = Duration::from_millis(50);

/// Launcher command lines, tried in order.
#[cfg(target_os = "macos")]
const LAUNCHERS: &[&[&str]] = &[&["open"]];

#[cfg(target_os = "windows")]
const LAUNCHERS: &[&[&str]] = &[&["cmd", "/C", "start", ""]];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const LAUNCHERS: &[&[&str]] = &[&["xdg-open"], &["gio", "open"], &["sensible-browser"]];

/// Open `url` after `delay`, unless shutdown is requested first.
///
/// Failures are logged, never fatal.
pub fn spawn_opener(
    url: String,
    delay: Duration,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("open".into()).spawn(move || {
        let deadline = Instant::now() + delay;
        while Instant::now() < deadline {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(SLEEP_STEP);
        }

        match open_browser(&url) {
            Ok(()) => log!("open"; "{url}"),
            Err(e) => log!("warn"; "could not open browser: {e:#}"),
        }
    })
}

/// Hand `url` to the first launcher installed on this system.
pub fn open_browser(url: &str) -> Result<()> {
    let launcher = find_launcher(LAUNCHERS)
        .with_context(|| format!("no browser launcher found, open {url} manually"))?;

    let status = Command::new(launcher[0])
        .args(&launcher[1..])
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run `{}`", launcher[0]))?;

    if !status.success() {
        bail!("`{}` exited with {status}", launcher[0]);
    }
    Ok(())
}

fn find_launcher<'a>(candidates: &[&'a [&'a str]]) -> Option<&'a [&'a str]> {
    candidates
        .iter()
        .copied()
        .find(|cmd| cmd.first().is_some_and(|name| which::which(name).is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_launcher_skips_missing() {
        let candidates: &[&[&str]] = &[&["mdpub-no-such-launcher"], &[], &["sh", "-c"]];
        assert_eq!(find_launcher(candidates), Some(&["sh", "-c"][..]));
    }

    #[test]
    fn test_find_launcher_none() {
        let candidates: &[&[&str]] = &[&["mdpub-no-such-launcher"]];
        assert_eq!(find_launcher(candidates), None);
    }

    #[test]
    fn test_opener_respects_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(true));
        let start = Instant::now();
        let handle = spawn_opener(
            "http://localhost:1/".into(),
            Duration::from_secs(30),
            Arc::clone(&shutdown),
        )
        .unwrap();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
