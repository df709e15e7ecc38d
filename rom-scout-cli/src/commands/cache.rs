use std::time::Duration;

use rom_scout_scraper::{CacheMode, ResponseCache};

use crate::{EXIT_OK, EXIT_SETUP};

/// Print the response cache directory.
pub(crate) fn run_cache_dir() -> i32 {
    match ResponseCache::default_dir() {
        Some(dir) => {
            println!("{}", dir.display());
            EXIT_OK
        }
        None => {
            log::error!("Could not determine the user cache directory");
            EXIT_SETUP
        }
    }
}

/// Remove every cached response.
pub(crate) fn run_cache_clean() -> i32 {
    let cache = match ResponseCache::open_default(CacheMode::Normal, Duration::ZERO) {
        Ok(cache) => cache,
        Err(e) => {
            log::error!("Could not open cache: {}", e);
            return EXIT_SETUP;
        }
    };

    match cache.clear() {
        Ok(reclaimed) => {
            log::info!(
                "Removed cached responses from {} ({} KiB reclaimed)",
                cache.dir_path().display(),
                reclaimed / 1024,
            );
            EXIT_OK
        }
        Err(e) => {
            log::error!("Could not clear cache: {}", e);
            EXIT_SETUP
        }
    }
}
