//! Scrape orchestrator.
//!
//! Enumerates manifest candidates, applies the filter once per entry, and
//! drives a bounded worker pool. Each worker resolves its entry through the
//! single-flight overlay, the disk cache, the rate limiter and the metadata
//! API, downloads the configured media kinds, and reports a terminal update.
//! Cancellation stops scheduling; entries already in flight finish at their
//! next suspension point and partial results are always returned.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use rom_scout_core::Region;
use rom_scout_dat::{Game, Manifest};
use rom_scout_frontend::{EsDeGenerator, MediaKind, normalize_base_name};

use crate::api::{GameRecord, LookupQuery, MediaPayload, MetadataAPI};
use crate::cache::ResponseCache;
use crate::context::FilterContextBuilder;
use crate::error::ScrapeError;
use crate::filter::FilterExpr;
use crate::progress::{EntryOutcome, ScrapeUpdate, UpdateSender};
use crate::rate_limit::RateLimiter;
use crate::single_flight::SingleFlight;

/// Hard ceiling on the worker pool, regardless of account limits.
pub const MAX_WORKERS: usize = 64;

/// Endpoint id used in cache fingerprints for game lookups.
const LOOKUP_ENDPOINT: &str = "jeuInfos";

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Remote system id for the platform being scraped.
    pub system_id: u32,
    /// Media kinds to download, in order.
    pub media_kinds: Vec<MediaKind>,
    /// Region preference order for names, dates and media.
    pub regions: Vec<Region>,
    /// Per-entry admission filter.
    pub filter: FilterExpr,
    /// Overwrite existing media files.
    pub overwrite: bool,
    /// Worker count; clamped to `1..=MAX_WORKERS`.
    pub workers: usize,
}

/// The memoized result of the filter pre-scan. One pass serves both the
/// dry-run report and the actual scrape.
#[derive(Debug, Clone)]
pub struct ScrapePlan {
    pub total_games: usize,
    pub bios_count: usize,
    pub empty_count: usize,
    /// Games eligible for scraping before the filter.
    pub total_candidates: usize,
    pub filtered_out: usize,
    /// Indices into `manifest.games` admitted by the filter.
    pub selected: Vec<usize>,
}

impl ScrapePlan {
    pub fn would_scrape(&self) -> usize {
        self.selected.len()
    }
}

/// Serialized form of a cached lookup; negative results are cached so a
/// missing game is not re-queried within the TTL.
#[derive(Debug, Serialize, Deserialize)]
enum CachedLookup {
    Found(GameRecord),
    NotFound,
}

/// Terminal record for one manifest entry.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedEntry {
    pub game: Game,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GameRecord>,
    pub media: Vec<(MediaKind, PathBuf)>,
    pub status: EntryOutcome,
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate results of a run.
#[derive(Debug, Default, Serialize)]
pub struct ScrapeResults {
    /// Eligible candidates (BIOS and empty entries excluded).
    pub total: usize,
    pub filtered_out: usize,
    pub found: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub errored: usize,
    pub media_downloaded: usize,
    pub cache_hits: usize,
    pub entries: Vec<ScrapedEntry>,
}

/// The orchestrator. Construct once per run.
pub struct Scraper {
    api: Arc<dyn MetadataAPI>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    generator: Arc<EsDeGenerator>,
    config: ScrapeConfig,
    updates: UpdateSender,
    cancel: CancellationToken,
    single_flight: SingleFlight,
}

impl Scraper {
    pub fn new(
        api: Arc<dyn MetadataAPI>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        generator: Arc<EsDeGenerator>,
        config: ScrapeConfig,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            cache,
            limiter,
            generator,
            config,
            updates,
            cancel,
            single_flight: SingleFlight::new(),
        }
    }

    /// Single filter pass over the manifest. BIOS images and entries
    /// without ROMs are never candidates; the filter decides the rest.
    pub fn plan(&self, manifest: &Manifest) -> ScrapePlan {
        plan_scrape(
            manifest,
            &self.config.filter,
            &self.generator,
            &self.config.media_kinds,
            Some(&self.updates),
        )
    }

    /// Run the full scrape: plan, process, aggregate.
    pub async fn scrape(&self, manifest: &Manifest) -> ScrapeResults {
        let plan = self.plan(manifest);
        self.scrape_planned(manifest, plan).await
    }

    /// Run the worker pool over a previously computed plan.
    pub async fn scrape_planned(&self, manifest: &Manifest, plan: ScrapePlan) -> ScrapeResults {
        let workers = self.config.workers.clamp(1, MAX_WORKERS);

        let entries: Vec<WorkerEntry> =
            stream::iter(plan.selected.iter().map(|&index| &manifest.games[index]))
                .map(|game| self.process_entry(game))
                .buffer_unordered(workers)
                .filter_map(|entry| async move { entry })
                .collect()
                .await;

        let mut results = ScrapeResults {
            total: plan.total_candidates,
            filtered_out: plan.filtered_out,
            ..Default::default()
        };
        for entry in &entries {
            match entry.status {
                EntryOutcome::Found => results.found += 1,
                EntryOutcome::NotFound => results.not_found += 1,
                EntryOutcome::Skipped => results.skipped += 1,
                EntryOutcome::Errored => results.errored += 1,
            }
            if entry.cache_hit {
                results.cache_hits += 1;
            }
        }
        results.media_downloaded = entries.iter().map(|e| e.media_count).sum();
        results.entries = entries.into_iter().map(|e| e.into_entry()).collect();
        results
    }

    /// Process one admitted game; `None` means the entry was never
    /// scheduled (cancellation won the race).
    async fn process_entry(&self, game: &Game) -> Option<WorkerEntry> {
        if self.cancel.is_cancelled() {
            return None;
        }

        self.updates.send(ScrapeUpdate::Started {
            name: game.name.clone(),
        });

        let entry = self.scrape_one(game).await;

        self.updates.send(ScrapeUpdate::Completed {
            name: game.name.clone(),
            outcome: entry.status,
            cache_hit: entry.cache_hit,
            media_downloaded: entry.media_count,
            error: entry.error.clone(),
        });

        Some(entry)
    }

    async fn scrape_one(&self, game: &Game) -> WorkerEntry {
        let mut entry = WorkerEntry::new(game.clone());

        let Some(rom) = game.primary_rom() else {
            // Plan already excluded these; belt for direct callers.
            entry.status = EntryOutcome::Skipped;
            return entry;
        };

        let query = LookupQuery {
            system_id: self.config.system_id,
            rom_name: rom.name.clone(),
            rom_size: rom.size,
            crc32: rom.crc32.clone(),
            md5: rom.md5.clone(),
            sha1: rom.sha1.clone(),
            serial: rom.serial.clone().or_else(|| game.serial.clone()),
        };
        let key = ResponseCache::fingerprint(LOOKUP_ENDPOINT, &query.canonical_params());

        // One in-flight request per canonical key across all workers.
        let _guard = self.single_flight.guard(&key).await;

        let record = match self.resolve_lookup(game, &query, &key, &mut entry).await {
            LookupOutcome::Found(record) => record,
            LookupOutcome::Done => return entry,
        };

        self.download_all_media(game, &record, &mut entry).await;
        entry.metadata = Some(record);
        entry
    }

    /// Cache-first lookup. Populates `entry` and returns the record when
    /// the entry should proceed to the media phase.
    async fn resolve_lookup(
        &self,
        game: &Game,
        query: &LookupQuery,
        key: &str,
        entry: &mut WorkerEntry,
    ) -> LookupOutcome {
        if let Some(cached) = self.cache.get(key) {
            match serde_json::from_slice::<CachedLookup>(&cached.bytes) {
                Ok(CachedLookup::Found(record)) => {
                    entry.cache_hit = true;
                    entry.status = EntryOutcome::Found;
                    return LookupOutcome::Found(record);
                }
                Ok(CachedLookup::NotFound) => {
                    entry.cache_hit = true;
                    entry.status = EntryOutcome::NotFound;
                    return LookupOutcome::Done;
                }
                Err(e) => {
                    log::debug!("Corrupt cache entry for {}: {}", game.name, e);
                }
            }
        }

        self.updates.send(ScrapeUpdate::LookingUp {
            name: game.name.clone(),
        });

        let permit = match self.limiter.acquire(&self.cancel).await {
            Ok(permit) => permit,
            Err(_) => {
                entry.status = EntryOutcome::Skipped;
                return LookupOutcome::Done;
            }
        };
        let result = self.api.lookup_game(query).await;
        drop(permit);

        match result {
            Ok(record) => {
                self.store_lookup(key, &CachedLookup::Found(record.clone()));
                entry.status = EntryOutcome::Found;
                LookupOutcome::Found(record)
            }
            Err(ScrapeError::NotFound) => {
                self.store_lookup(key, &CachedLookup::NotFound);
                entry.status = EntryOutcome::NotFound;
                LookupOutcome::Done
            }
            Err(ScrapeError::Cancelled) => {
                entry.status = EntryOutcome::Skipped;
                LookupOutcome::Done
            }
            Err(e) => {
                if e.is_fatal() {
                    // Quota, blacklist, lock, bad credentials: stop the run.
                    self.cancel.cancel();
                }
                entry.status = EntryOutcome::Errored;
                entry.error = Some(e.to_string());
                LookupOutcome::Done
            }
        }
    }

    /// Serialize and store a lookup result. Cache write failures are
    /// logged and the scrape proceeds.
    fn store_lookup(&self, key: &str, lookup: &CachedLookup) {
        match serde_json::to_vec(lookup) {
            Ok(bytes) => {
                if let Err(e) = self.cache.put(key, &bytes, "application/json") {
                    log::warn!("Cache write failed: {e}");
                }
            }
            Err(e) => log::warn!("Cache serialization failed: {e}"),
        }
    }

    /// Download every configured media kind for a found game.
    async fn download_all_media(&self, game: &Game, record: &GameRecord, entry: &mut WorkerEntry) {
        let base_name = normalize_base_name(&game.name);

        for &kind in &self.config.media_kinds {
            if self.cancel.is_cancelled() {
                break;
            }

            let Some(media) = record.media_for(kind, &self.config.regions) else {
                continue;
            };
            let ext = if media.format.is_empty() {
                kind.default_extension()
            } else {
                media.format.as_str()
            };

            // Pre-existing media short-circuits the download; this is a
            // filesystem hit, not a KV cache hit.
            if !self.config.overwrite && self.generator.media_exists(kind, &base_name) {
                entry.media.push((kind, self.generator.media_dest(kind, &base_name, ext)));
                continue;
            }

            self.updates.send(ScrapeUpdate::DownloadingMedia {
                name: game.name.clone(),
                kind,
            });

            let permit = match self.limiter.acquire(&self.cancel).await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let result = self
                .api
                .download_media(self.config.system_id, record.id, media)
                .await;
            drop(permit);

            match result {
                Ok(MediaPayload::Data { bytes, .. }) => {
                    match self.generator.write_media(kind, &base_name, ext, &bytes) {
                        Ok((_, path)) => {
                            entry.media_count += 1;
                            entry.media.push((kind, path));
                        }
                        Err(e) => {
                            entry.status = EntryOutcome::Errored;
                            entry.error = Some(format!("media write failed ({kind}): {e}"));
                        }
                    }
                }
                Ok(MediaPayload::NoMedia) | Ok(MediaPayload::HashUnchanged) => {}
                Err(ScrapeError::Cancelled) => break,
                Err(e) => {
                    if e.is_fatal() {
                        self.cancel.cancel();
                    }
                    entry.status = EntryOutcome::Errored;
                    entry.error = Some(format!("media download failed ({kind}): {e}"));
                }
            }
        }
    }
}

/// The filter pre-scan, usable without a full [`Scraper`] (dry runs need
/// no API client or credentials).
pub fn plan_scrape(
    manifest: &Manifest,
    filter: &FilterExpr,
    generator: &EsDeGenerator,
    media_kinds: &[MediaKind],
    updates: Option<&UpdateSender>,
) -> ScrapePlan {
    let builder = FilterContextBuilder::new(generator, media_kinds.to_vec());

    let mut plan = ScrapePlan {
        total_games: manifest.games.len(),
        bios_count: 0,
        empty_count: 0,
        total_candidates: 0,
        filtered_out: 0,
        selected: Vec::new(),
    };

    for (index, game) in manifest.games.iter().enumerate() {
        if game.is_bios {
            plan.bios_count += 1;
            continue;
        }
        if game.roms.is_empty() {
            plan.empty_count += 1;
            continue;
        }
        plan.total_candidates += 1;

        let ctx = builder.build(&game.name);
        if filter.eval(&ctx) {
            plan.selected.push(index);
        } else {
            plan.filtered_out += 1;
            if let Some(updates) = updates {
                updates.send(ScrapeUpdate::Filtered {
                    name: game.name.clone(),
                });
            }
        }
    }

    plan
}

enum LookupOutcome {
    Found(GameRecord),
    Done,
}

/// Worker-internal entry accumulator.
struct WorkerEntry {
    game: Game,
    metadata: Option<GameRecord>,
    media: Vec<(MediaKind, PathBuf)>,
    media_count: usize,
    status: EntryOutcome,
    cache_hit: bool,
    error: Option<String>,
}

impl WorkerEntry {
    fn new(game: Game) -> Self {
        Self {
            game,
            metadata: None,
            media: Vec::new(),
            media_count: 0,
            status: EntryOutcome::Skipped,
            cache_hit: false,
            error: None,
        }
    }

    fn into_entry(self) -> ScrapedEntry {
        ScrapedEntry {
            game: self.game,
            metadata: self.metadata,
            media: self.media,
            status: self.status,
            cache_hit: self.cache_hit,
            error: self.error,
        }
    }
}

#[cfg(test)]
#[path = "tests/scrape_tests.rs"]
mod tests;
