//! Token passing executor.
//!
//! Runs the fixed setup: initiator on port 9001 and responder on port 9002 of the loopback host,
//! ten alternating rounds. Takes no arguments.

use std::io::Write;

use log::Level;
use tokenpass::{launch, LauncherConfig};

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| match record.level() {
            Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{} {}", level, record.args()),
        })
        .init();
}

fn main() {
    init_logger();

    if let Err(err) = launch(LauncherConfig::default()) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
