//! termport - a terminal cell server over a Unix socket
//!
//! termport owns the terminal and lets one client drive it with a line
//! protocol: paint cells, move the cursor, present frames, and receive key,
//! mouse and resize events.
//!
//! # Quick Start
//!
//! ```text
//! termport                       # Listen on /tmp/termport_<pid>.sock
//! termport --socket ./tp.sock    # Listen on a chosen path
//! ```
//!
//! On startup a single line is printed to stdout: `OK <socket path>` once
//! the socket is listening, or `error <reason>` if it could not be set up.
//!
//! # Commands
//!
//! | Command | Reply |
//! |---------|-------|
//! | `change_cell x y ch fg bg` | `OK` |
//! | `print x y fg bg text...` | `OK` |
//! | `get_cell x y` | `OK_CELL x y ch fg bg` |
//! | `width` / `height` | `OK_WIDTH w` / `OK_HEIGHT h` |
//! | `present` / `clear` / `set_cursor x y` | `OK` |
//! | `set_input_mode m` / `set_output_mode m` | `OK` or `ERROR ...` |
//! | `set_clear_attributes fg bg` | `OK` |
//! | `shutdown` | `OK`, then the session ends |

mod config;
mod core;
mod protocol;
mod server;
mod ui;

#[cfg(test)]
mod testing;

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::server::{socket_path, Session, SocketListener};
use crate::ui::{CrosstermBackend, Tty};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the configured log filter
const LOG_ENV: &str = "TERMPORT_LOG";

/// Bootstrap reason for an unreadable `--config` file
const CONFIG_LOAD_FAILED: &str = "config_load_failed";

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    socket: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn print_version() {
    eprintln!("termport {}", VERSION);
}

fn print_help() {
    eprintln!("termport {} - terminal cell server over a Unix socket", VERSION);
    eprintln!();
    eprintln!("Usage: termport [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --socket <PATH>       Listen on PATH instead of <socket_dir>/termport_<pid>.sock");
    eprintln!("  --config <PATH>       Read settings from PATH");
    eprintln!("  -V, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.termport/config.toml");
    eprintln!("Log file:      ~/.termport/termport.log (filter with {})", LOG_ENV);
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--socket" => {
                let path = args.next().ok_or("Missing socket path")?;
                parsed.socket = Some(PathBuf::from(path));
            }
            "--config" => {
                let path = args.next().ok_or("Missing config path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            other => {
                return Err(format!("Unknown argument: {}. Use -h for help.", other));
            }
        }
    }

    Ok(parsed)
}

/// Load the named config file, or the default one. A named file that
/// cannot be used is a bootstrap failure.
fn load_config(path: Option<&Path>) -> Result<Config, &'static str> {
    let Some(path) = path else {
        return Ok(Config::load());
    };
    Config::load_from(path).map_err(|e| {
        eprintln!("Error: {}", e);
        CONFIG_LOAD_FAILED
    })
}

/// Send tracing output to the log file. Logging stays off if the file
/// cannot be opened; stdout carries the bootstrap line only.
fn init_logging(config: &Config) {
    let Some(log_path) = config.log_path() else {
        return;
    };
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Print the single bootstrap line on stdout.
fn announce(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(reason) => {
            announce(&format!("error {}", reason))?;
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!("termport {} starting", VERSION);

    let path = args
        .socket
        .clone()
        .unwrap_or_else(|| socket_path(&config.socket_dir));

    let listener = match SocketListener::bind(&path) {
        Ok(l) => l,
        Err(e) => {
            error!("{}", e);
            announce(&format!("error {}", e.reason()))?;
            std::process::exit(1);
        }
    };
    announce(&format!("OK {}", listener.path().display()))?;

    // The device is opened by the session's backend init, after accept
    let backend = CrosstermBackend::new(Tty::new(&config.tty));

    let result =
        Session::accept(&listener, backend, &config.session()).and_then(|session| session.run());
    drop(listener);

    match result {
        Ok(exit) => {
            info!("termport exiting: {:?}", exit);
            Ok(())
        }
        Err(e) => {
            error!("termport exiting: {}", e);
            std::process::exit(1);
        }
    }
}
