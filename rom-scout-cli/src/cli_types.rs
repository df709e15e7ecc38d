//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use rom_scout_core::Platform;

/// Default media selection, in download order.
const DEFAULT_MEDIA: &str =
    "screenshots,titlescreens,covers,3dboxes,marquees,fanart,videos,physicalmedia,backcovers";

#[derive(Parser)]
#[command(name = "rom-scout")]
#[command(about = "Scrape metadata and media for retro-game ROM collections", long_about = None)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scrape a ROM manifest against the metadata service
    Scrape(ScrapeArgs),

    /// Identify ROM files, archives and disc images
    Identify(IdentifyArgs),

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
pub(crate) struct ScrapeArgs {
    /// System to scrape (name, alias, or numeric service id)
    #[arg(long)]
    pub system: Platform,

    /// Path to the Logiqx XML manifest
    #[arg(long, required_unless_present = "input")]
    pub dat: Option<PathBuf>,

    /// Scrape a ROM directory instead of a manifest (not yet implemented)
    #[arg(long, conflicts_with = "dat")]
    pub input: Option<PathBuf>,

    /// ES-DE gamelist.xml to write/merge
    #[arg(long)]
    pub esde_gamelist: Option<PathBuf>,

    /// ES-DE media directory to populate
    #[arg(long)]
    pub esde_media: Option<PathBuf>,

    /// Media kinds to download
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_MEDIA)]
    pub media: Vec<String>,

    /// Region preference order for names, dates and media
    #[arg(long, value_delimiter = ',', default_value = "us,eu,jp")]
    pub regions: Vec<String>,

    /// Fast hashing: never read archive payloads
    #[arg(long)]
    pub fast: bool,

    /// Slow hashing: decompress archives and hash everything
    #[arg(long, conflicts_with = "fast")]
    pub slow: bool,

    /// Maximum age of cached responses (e.g. 720h, 30m, 45s)
    #[arg(long, default_value = "720h", value_parser = parse_duration)]
    pub cache_age: Duration,

    /// Skip cache reads (still records fresh responses)
    #[arg(long)]
    pub no_cache: bool,

    /// Only use the cache; never write new entries
    #[arg(long, conflicts_with = "no_cache")]
    pub cache_only: bool,

    /// Overwrite existing media files
    #[arg(long)]
    pub overwrite: bool,

    /// Overall HTTP request timeout
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    pub http_timeout: Duration,

    /// Maximum concurrent workers (0 = account limit)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Filter expression deciding which entries need work
    #[arg(long, default_value = "true")]
    pub filter: String,

    /// Report what would be scraped without doing any network work
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Machine-readable JSON output (disables the progress display)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct IdentifyArgs {
    /// Files, archives or directories to identify
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Skip hashing files larger than this many bytes
    #[arg(long)]
    pub max_hash_size: Option<u64>,

    /// Decompress archives and hash everything
    #[arg(long)]
    pub slow: bool,
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Print the cache directory path
    Dir,

    /// Remove all cached responses
    Clean,
}

/// Parse a human duration: one or more `<number><unit>` groups where the
/// unit is d, h, m or s. A bare number means seconds.
pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = 0u64;
    let mut number = String::new();
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u64 = number
            .parse()
            .map_err(|_| format!("invalid duration '{input}'"))?;
        number.clear();
        let unit = match c {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            other => return Err(format!("unknown duration unit '{other}' in '{input}'")),
        };
        total += value * unit;
    }
    if !number.is_empty() {
        return Err(format!("trailing number without unit in '{input}'"));
    }

    Ok(Duration::from_secs(total))
}
