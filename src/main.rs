mod clock;
mod config;
mod display;
mod error;
mod extract;
mod logging;
mod model;
mod net;
mod poll;
mod render;
mod runtime;
mod selector;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};

use clock::Shutdown;
use config::parse_args;
use logging::init as init_logging;
use net::HttpTransport;
use poll::PollLoop;
use runtime::{init_terminal, restore_terminal, TerminalClock, TerminalDisplay};
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = parse_args()?;
    let _log_guard = init_logging(&config);
    info!("flightwatch starting");
    debug!("config path: {}", config.config_path.display());
    if !config.ssid.trim().is_empty() {
        let password = if config.password.is_empty() { "no" } else { "with" };
        info!("network ssid: {} ({password} password)", config.ssid);
    }

    let transport = HttpTransport::new(config.request_timeout(), &config.search_base)
        .context("Failed to build HTTP client")?;
    let options = config.loop_options();
    info!("searching {}", options.endpoints.search_url());

    let canvas = options.geometry.canvas();
    let terminal = init_terminal()?;
    let shutdown = Shutdown::new();
    let mut poll = PollLoop::new(
        transport,
        TerminalDisplay::new(terminal, canvas),
        TerminalClock::new(shutdown.clone()),
        shutdown,
        options,
    );
    let res = poll.run();

    restore_terminal(poll.display_mut().terminal_mut())?;
    if let Err(err) = &res {
        error!("poll loop stopped: {err:#}");
    }
    info!("flightwatch stopped");
    res
}
