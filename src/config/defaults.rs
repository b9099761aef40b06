//! Default values for configuration fields.

use std::time::Duration;

/// Environment variable holding default command-line arguments.
pub const ENV_ARGS: &str = "MDPUB_ARGS";

/// Built-in style used when neither `--style` nor `--css` is given.
pub const STYLE: &str = "cyan";

/// Code highlight style used when `--codestyle` is not given.
pub const CODE_STYLE: &str = "github-dark";

/// Http server port.
pub const PORT: u16 = 8800;

/// Delay between two polls of the watch loop.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(2);

/// Delay before the browser is opened, giving the server time to start.
pub const OPEN_DELAY: Duration = Duration::from_secs(1);

pub fn port() -> u16 {
    PORT
}

pub fn code_style() -> String {
    CODE_STYLE.into()
}
