use std::path::PathBuf;
use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tokio_util::sync::CancellationToken;

use rom_scout_core::Region;
use rom_scout_dat::parse_manifest_file;
use rom_scout_frontend::{EsDeGenerator, GamelistEntry, MediaKind, normalize_base_name};
use rom_scout_scraper::progress::update_channel;
use rom_scout_scraper::{
    CacheMode, Credentials, FilterExpr, RateLimiter, ResponseCache, ScrapeConfig, ScrapeResults,
    ScrapedEntry, ScreenScraperClient, Scraper, plan_scrape,
};

use crate::cli_types::ScrapeArgs;
use crate::render::{Renderer, spawn_progress};
use crate::{EXIT_CANCELLED, EXIT_OK, EXIT_SETUP};

/// Hard ceiling on the worker pool.
const MAX_WORKERS: usize = 64;

/// Run the scrape command.
pub(crate) fn run_scrape(args: ScrapeArgs) -> i32 {
    if args.input.is_some() {
        log::error!("--input directories are not implemented yet; use --dat");
        return EXIT_SETUP;
    }
    let Some(ref dat_path) = args.dat else {
        log::error!("--dat is required");
        return EXIT_SETUP;
    };
    if !args.dry_run && args.esde_gamelist.is_none() && args.esde_media.is_none() {
        log::error!("At least one of --esde-gamelist or --esde-media is required (or use --dry-run)");
        return EXIT_SETUP;
    }
    if args.fast || args.slow {
        // Manifest scrapes take hashes from the DAT; these flags govern
        // file hashing and only matter once --input lands.
        log::debug!("hash-mode flags have no effect on manifest scrapes");
    }

    // Parse the filter, media kinds and regions before touching anything
    // slower: these are all validation errors.
    let filter = match FilterExpr::parse(&args.filter) {
        Ok(filter) => filter,
        Err(e) => {
            log::error!("{}", e);
            return EXIT_SETUP;
        }
    };
    let media_kinds = match MediaKind::parse_list(&args.media) {
        Ok(kinds) => kinds,
        Err(e) => {
            log::error!("{}", e);
            return EXIT_SETUP;
        }
    };
    let regions: Vec<Region> = {
        let mut out = Vec::new();
        for code in &args.regions {
            match Region::from_api_code(code) {
                Some(region) => out.push(region),
                None => {
                    log::error!("unknown region '{code}'");
                    return EXIT_SETUP;
                }
            }
        }
        out
    };

    let manifest = match parse_manifest_file(dat_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            log::error!("Could not read manifest {}: {}", dat_path.display(), e);
            return EXIT_SETUP;
        }
    };

    let gamelist_path = args
        .esde_gamelist
        .clone()
        .unwrap_or_else(|| PathBuf::from("gamelist.xml"));
    let media_dir = args
        .esde_media
        .clone()
        .unwrap_or_else(|| PathBuf::from("media"));
    let generator = Arc::new(EsDeGenerator::new(gamelist_path, media_dir, args.overwrite));

    // Dry run: one filter pass, a report, and no network at all.
    if args.dry_run {
        let plan = plan_scrape(&manifest, &filter, &generator, &media_kinds, None);
        if args.json {
            let report = serde_json::json!({
                "total_games": plan.total_games,
                "bios_count": plan.bios_count,
                "would_scrape": plan.would_scrape(),
                "filter": args.filter,
                "filtered_out": plan.filtered_out,
            });
            println!("{}", report);
        } else {
            log::info!("Manifest: {} games ({} BIOS)", plan.total_games, plan.bios_count);
            log::info!("Filter:   {}", args.filter);
            log::info!(
                "Would scrape {} entries ({} filtered out)",
                plan.would_scrape(),
                plan.filtered_out,
            );
        }
        return EXIT_OK;
    }

    // Credentials are only needed once we actually talk to the service.
    let creds = match Credentials::load() {
        Ok(creds) => creds,
        Err(e) => {
            log::error!("{}", e);
            log::error!("Set SCREENSCRAPER_DEVID / SCREENSCRAPER_DEVPASSWORD (and optionally SCREENSCRAPER_SSID / SCREENSCRAPER_SSPASSWORD)");
            return EXIT_SETUP;
        }
    };

    let cache_mode = if args.no_cache {
        CacheMode::NoRead
    } else if args.cache_only {
        CacheMode::ReadOnly
    } else {
        CacheMode::Normal
    };
    let cache = match ResponseCache::open_default(cache_mode, args.cache_age) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            log::error!("Could not open response cache: {}", e);
            return EXIT_SETUP;
        }
    };

    let client = match ScreenScraperClient::new(creds, args.http_timeout.into()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::error!("Could not build HTTP client: {}", e);
            return EXIT_SETUP;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Could not start async runtime: {}", e);
            return EXIT_SETUP;
        }
    };

    runtime.block_on(async move {
        use rom_scout_scraper::MetadataAPI;

        let account = match client.user_info().await {
            Ok(info) => info,
            Err(e) => {
                log::error!("Could not connect to the metadata service: {}", e);
                return EXIT_SETUP;
            }
        };

        let workers = if args.threads == 0 {
            account.max_threads as usize
        } else {
            args.threads.min(account.max_threads as usize)
        }
        .clamp(1, MAX_WORKERS);

        log::info!(
            "{} Connected ({} workers, {}/{} requests used today)",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            workers,
            account.requests_today,
            account.max_requests_per_day,
        );

        let limiter = Arc::new(RateLimiter::new(
            workers,
            account.max_requests_per_minute as usize,
        ));
        let cancel = CancellationToken::new();
        let (updates_tx, updates_rx) = update_channel();

        // Ctrl-C stops scheduling; in-flight entries finish and partial
        // results are written.
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted; draining in-flight work...");
                    cancel.cancel();
                }
            });
        }

        let config = ScrapeConfig {
            system_id: args.system.system_id(),
            media_kinds,
            regions: regions.clone(),
            filter,
            overwrite: args.overwrite,
            workers,
        };
        let scraper = Scraper::new(
            client,
            cache,
            limiter.clone(),
            generator.clone(),
            config,
            updates_tx,
            cancel.clone(),
        );

        let plan = scraper.plan(&manifest);
        log::info!(
            "Scraping {} of {} entries ({} filtered out, {} BIOS)",
            plan.would_scrape(),
            plan.total_games,
            plan.filtered_out,
            plan.bios_count,
        );

        let renderer = if args.json || args.quiet_render() {
            Renderer::Silent
        } else {
            Renderer::Tty
        };
        let progress = spawn_progress(updates_rx, plan.total_candidates, renderer);

        let results = scraper.scrape_planned(&manifest, plan).await;
        drop(scraper); // closes the update channel
        let _ = progress.await;

        // Always write what we have, even after cancellation.
        if args.esde_gamelist.is_some() {
            let entries = gamelist_entries(&results, &regions);
            if !entries.is_empty() {
                match generator.merge_and_write(entries) {
                    Ok(count) => log::info!(
                        "{} gamelist written: {} entries at {}",
                        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                        count,
                        generator.gamelist_path().display(),
                    ),
                    Err(e) => log::warn!("Could not write gamelist: {}", e),
                }
            }
        }

        log_summary(&results, limiter.stats().total_requests);

        if args.json {
            match serde_json::to_string_pretty(&results) {
                Ok(json) => println!("{}", json),
                Err(e) => log::warn!("Could not serialize results: {}", e),
            }
        }

        if cancel.is_cancelled() {
            EXIT_CANCELLED
        } else {
            EXIT_OK
        }
    })
}

impl ScrapeArgs {
    /// The progress bar is pointless when nothing prints at info level.
    fn quiet_render(&self) -> bool {
        log::max_level() < log::LevelFilter::Info
    }
}

/// Convert found entries into gamelist records.
fn gamelist_entries(results: &ScrapeResults, regions: &[Region]) -> Vec<GamelistEntry> {
    results
        .entries
        .iter()
        .filter_map(|entry| to_gamelist_entry(entry, regions))
        .collect()
}

fn to_gamelist_entry(entry: &ScrapedEntry, regions: &[Region]) -> Option<GamelistEntry> {
    let record = entry.metadata.as_ref()?;
    let rom = entry.game.primary_rom()?;

    let media_path = |kind: MediaKind| -> Option<String> {
        entry
            .media
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, path)| path.display().to_string())
    };

    Some(GamelistEntry {
        path: format!("./{}", rom.name),
        name: record
            .name_for_regions(regions)
            .unwrap_or(entry.game.base_name())
            .to_string(),
        desc: record.synopsis_for_language("en").map(str::to_string),
        rating: record.rating,
        release_date: record.date_for_regions(regions).map(str::to_string),
        developer: record.developer.clone(),
        publisher: record.publisher.clone(),
        genre: record.genre_for_language("en").map(str::to_string),
        players: record.players.clone(),
        image: media_path(MediaKind::Screenshot),
        thumbnail: media_path(MediaKind::Cover),
        marquee: media_path(MediaKind::Marquee),
        video: media_path(MediaKind::Video),
        fanart: media_path(MediaKind::Fanart),
    })
}

fn log_summary(results: &ScrapeResults, total_requests: u64) {
    log::info!("");
    log::info!("{}", "Summary:".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {} {} found, {} media files, {} cache hits",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        results.found,
        results.media_downloaded,
        results.cache_hits,
    );
    if results.not_found > 0 {
        log::warn!(
            "  {} {} not found",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            results.not_found,
        );
    }
    if results.filtered_out > 0 {
        log::info!("  {} filtered out", results.filtered_out);
    }
    if results.skipped > 0 {
        log::info!("  {} skipped", results.skipped);
    }
    if results.errored > 0 {
        log::warn!(
            "  {} {} errors",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            results.errored,
        );
        for entry in results.entries.iter().filter(|e| e.error.is_some()) {
            log::warn!(
                "    {} {}: {}",
                "\u{2718}",
                entry.game.name,
                entry.error.as_deref().unwrap_or("unknown error"),
            );
        }
    }
    log::info!("  {} API requests issued", total_requests);

    // The normalized base name keys media files; surface one example so
    // users can verify their frontend picks them up.
    if let Some(entry) = results.entries.iter().find(|e| !e.media.is_empty()) {
        log::info!(
            "  media keyed by base name, e.g. \"{}\"",
            normalize_base_name(&entry.game.name),
        );
    }
}
