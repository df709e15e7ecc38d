use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use rom_scout_core::HashKind;
use rom_scout_ident::{HashMode, IdentifyOptions, identify};

use crate::cli_types::IdentifyArgs;
use crate::{EXIT_OK, EXIT_SETUP};

/// Run the identify command over one or more paths.
pub(crate) fn run_identify(args: IdentifyArgs) -> i32 {
    let mut options = IdentifyOptions::default();
    if args.slow {
        options.hash_mode = HashMode::Slow;
    }
    if let Some(limit) = args.max_hash_size {
        options.max_hash_size = limit;
    }

    let mut results = Vec::new();
    let mut failed = false;

    for path in &args.paths {
        match identify(path, &options) {
            Ok(result) => results.push(result),
            Err(e) => {
                log::error!("{}", e);
                failed = true;
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("Could not serialize results: {}", e);
                return EXIT_SETUP;
            }
        }
    } else {
        for result in &results {
            print_result(result);
        }
    }

    if failed { EXIT_SETUP } else { EXIT_OK }
}

fn print_result(result: &rom_scout_ident::IdentifyResult) {
    log::info!(
        "{}",
        result
            .path
            .display()
            .if_supports_color(Stdout, |t| t.bold()),
    );
    if result.items.is_empty() {
        log::info!("  (no items)");
        return;
    }

    for item in &result.items {
        log::info!("  {} ({} bytes)", item.name, item.size);
        for &kind in HashKind::all() {
            if let Some(digest) = item.hashes.get(&kind) {
                log::info!("    {:<6} {}", kind.name(), digest);
            }
        }
        if let Some(ref facts) = item.facts {
            log::info!(
                "    platform: {}",
                facts.platform().if_supports_color(Stdout, |t| t.cyan()),
            );
            if let Some(title) = facts.title() {
                log::info!("    title:    {}", title);
            }
            if let Some(serial) = facts.serial() {
                log::info!("    serial:   {}", serial);
            }
            if let Some(region) = facts.region() {
                log::info!("    region:   {}", region);
            }
            if let Some(maker) = facts.maker() {
                log::info!("    maker:    {}", maker);
            }
            if let Some(version) = facts.version() {
                log::info!("    version:  {}", version);
            }
            if let Some(disc) = facts.disc_no() {
                log::info!("    disc:     {}", disc);
            }
        }
    }
}
