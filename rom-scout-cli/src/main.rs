//! rom-scout CLI
//!
//! Command-line interface for scraping ROM manifests and identifying ROM
//! files and disc images.

mod cli_types;
mod commands;
mod render;

use std::fs;
use std::io::Write;
use std::sync::Mutex;

use clap::Parser;
use log::LevelFilter;

use cli_types::*;

/// Exit codes: 0 success (including partial), 1 setup/validation error,
/// 2 cancelled.
pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_SETUP: i32 = 1;
pub(crate) const EXIT_CANCELLED: i32 = 2;

// -- Custom logger --

struct CliLogger {
    level: LevelFilter,
    logfile: Option<Mutex<fs::File>>,
}

impl log::Log for CliLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = record.args().to_string();

        // Terminal: warn/error to stderr, info to stdout
        if record.level() <= log::Level::Warn {
            eprintln!("{}", msg);
        } else {
            println!("{}", msg);
        }

        // Logfile: ANSI-stripped
        if let Some(ref file) = self.logfile {
            let stripped = strip_ansi_escapes::strip(&msg);
            let text = String::from_utf8_lossy(&stripped);
            if let Ok(mut guard) = file.lock() {
                let _ = writeln!(guard, "{}", text);
            }
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.logfile {
            if let Ok(mut guard) = file.lock() {
                let _ = guard.flush();
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    let logfile = cli.logfile.map(|p| {
        let file = fs::File::create(&p).unwrap_or_else(|e| {
            eprintln!("Error: could not create logfile {}: {}", p.display(), e);
            std::process::exit(EXIT_SETUP);
        });
        Mutex::new(file)
    });
    let logger = Box::new(CliLogger { level, logfile });
    log::set_boxed_logger(logger).expect("Failed to set logger");
    log::set_max_level(level);

    let code = match cli.command {
        Commands::Scrape(args) => commands::scrape::run_scrape(args),
        Commands::Identify(args) => commands::identify::run_identify(args),
        Commands::Cache { action } => match action {
            CacheAction::Dir => commands::cache::run_cache_dir(),
            CacheAction::Clean => commands::cache::run_cache_clean(),
        },
    };
    std::process::exit(code);
}
