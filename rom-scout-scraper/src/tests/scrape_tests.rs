use super::*;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{MediaRecord, ServerInfo, UserInfo};
use crate::cache::CacheMode;
use crate::progress::{UpdateReceiver, update_channel};

/// Scripted per-ROM behavior for the fake service.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Found,
    NotFound,
    Quota,
    Transient,
}

/// In-memory metadata service with call counting.
struct FakeApi {
    behaviors: Mutex<HashMap<String, Behavior>>,
    lookups: AtomicUsize,
    media_downloads: AtomicUsize,
    /// Cancel this token after N lookups (drives the cancellation test).
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl FakeApi {
    fn new(behaviors: &[(&str, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(
                behaviors
                    .iter()
                    .map(|(name, b)| (name.to_string(), *b))
                    .collect(),
            ),
            lookups: AtomicUsize::new(0),
            media_downloads: AtomicUsize::new(0),
            cancel_after: Mutex::new(None),
        })
    }

    fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn media_count(&self) -> usize {
        self.media_downloads.load(Ordering::SeqCst)
    }

    fn cancel_after(&self, count: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((count, token));
    }

    fn found_record() -> GameRecord {
        GameRecord {
            id: 42,
            names: vec![crate::api::RegionalValue {
                region: Some("us".into()),
                value: "Found Game".into(),
            }],
            media: vec![MediaRecord {
                kind: "box-2D".into(),
                region: Some("us".into()),
                url: "http://fake/cover.png".into(),
                format: "png".into(),
            }],
            ..Default::default()
        }
    }
}

#[async_trait]
impl MetadataAPI for FakeApi {
    async fn lookup_game(&self, query: &LookupQuery) -> Result<GameRecord, ScrapeError> {
        let count = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = self.cancel_after.lock().unwrap().clone() {
            if count >= after {
                token.cancel();
            }
        }

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&query.rom_name)
            .copied()
            .unwrap_or(Behavior::NotFound);
        match behavior {
            Behavior::Found => Ok(Self::found_record()),
            Behavior::NotFound => Err(ScrapeError::NotFound),
            Behavior::Quota => Err(ScrapeError::QuotaExceeded { used: 100, max: 100 }),
            Behavior::Transient => Err(ScrapeError::transient("flaky backend")),
        }
    }

    async fn download_media(
        &self,
        _system_id: u32,
        _game_id: u64,
        _media: &MediaRecord,
    ) -> Result<MediaPayload, ScrapeError> {
        self.media_downloads.fetch_add(1, Ordering::SeqCst);
        Ok(MediaPayload::Data {
            bytes: b"image-bytes".to_vec(),
            content_type: Some("image/png".into()),
        })
    }

    async fn user_info(&self) -> Result<UserInfo, ScrapeError> {
        Ok(UserInfo {
            max_threads: 4,
            max_requests_per_minute: 1000,
            requests_today: 0,
            max_requests_per_day: 100000,
        })
    }

    async fn server_info(&self) -> Result<ServerInfo, ScrapeError> {
        Ok(ServerInfo {
            api_open: true,
            threads_in_use: None,
        })
    }
}

fn game(name: &str, rom_name: &str, size: u64, crc: &str) -> Game {
    Game {
        name: name.to_string(),
        is_bios: false,
        serial: None,
        header_tag: None,
        roms: vec![rom_scout_dat::Rom {
            name: rom_name.to_string(),
            size,
            crc32: Some(crc.to_string()),
            ..Default::default()
        }],
    }
}

fn bios_game(name: &str) -> Game {
    let mut g = game(name, "bios.bin", 1024, "00000000");
    g.is_bios = true;
    g
}

fn empty_game(name: &str) -> Game {
    Game {
        name: name.to_string(),
        is_bios: false,
        serial: None,
        header_tag: None,
        roms: Vec::new(),
    }
}

fn manifest(games: Vec<Game>) -> Manifest {
    Manifest {
        header: rom_scout_dat::ManifestHeader::default(),
        games,
    }
}

/// Everything a test scrape needs, rooted in one temp dir.
struct Harness {
    _dir: tempfile::TempDir,
    generator: Arc<EsDeGenerator>,
    cache: Arc<ResponseCache>,
    cancel: CancellationToken,
    updates_rx: Option<UpdateReceiver>,
    scraper: Scraper,
}

fn harness(api: Arc<FakeApi>, filter: &str, overwrite: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    harness_at(dir, api, filter, overwrite)
}

fn harness_at(dir: tempfile::TempDir, api: Arc<FakeApi>, filter: &str, overwrite: bool) -> Harness {
    let generator = Arc::new(EsDeGenerator::new(
        dir.path().join("gamelist.xml"),
        dir.path().join("media"),
        overwrite,
    ));
    let cache = Arc::new(
        ResponseCache::open(
            dir.path().join("cache"),
            CacheMode::Normal,
            Duration::from_secs(3600),
        )
        .unwrap(),
    );
    let limiter = Arc::new(RateLimiter::new(4, 100_000));
    let cancel = CancellationToken::new();
    let (updates_tx, updates_rx) = update_channel();

    let config = ScrapeConfig {
        system_id: 1,
        media_kinds: vec![MediaKind::Cover],
        regions: vec![Region::Usa, Region::Europe, Region::Japan],
        filter: FilterExpr::parse(filter).unwrap(),
        overwrite,
        workers: 4,
    };

    let scraper = Scraper::new(
        api,
        cache.clone(),
        limiter,
        generator.clone(),
        config,
        updates_tx,
        cancel.clone(),
    );

    Harness {
        _dir: dir,
        generator,
        cache,
        cancel,
        updates_rx: Some(updates_rx),
        scraper,
    }
}

#[tokio::test]
async fn counters_partition_the_candidates() {
    let api = FakeApi::new(&[
        ("found.md", Behavior::Found),
        ("missing.md", Behavior::NotFound),
    ]);
    let h = harness(api.clone(), "true", false);

    let m = manifest(vec![
        bios_game("[BIOS] Boot ROM"),
        empty_game("Empty Entry"),
        game("Found Game", "found.md", 1024, "aaaaaaaa"),
        game("Missing Game", "missing.md", 2048, "bbbbbbbb"),
    ]);

    let results = h.scraper.scrape(&m).await;
    assert_eq!(results.total, 2, "BIOS and empty entries are not candidates");
    assert_eq!(results.found, 1);
    assert_eq!(results.not_found, 1);
    assert_eq!(results.skipped, 0);
    assert_eq!(results.errored, 0);
    assert_eq!(
        results.found + results.not_found + results.skipped + results.errored
            + results.filtered_out,
        results.total,
    );
    assert_eq!(results.entries.len(), 2);
    assert_eq!(api.lookup_count(), 2);
}

#[tokio::test]
async fn dry_run_plan_reports_candidates() {
    let api = FakeApi::new(&[]);
    let h = harness(api, "true", false);

    let m = manifest(vec![
        bios_game("[BIOS] Boot ROM"),
        game("Game A", "a.md", 1, "aaaaaaaa"),
        game("Game B", "b.md", 2, "bbbbbbbb"),
    ]);

    let plan = h.scraper.plan(&m);
    assert_eq!(plan.total_games, 3);
    assert_eq!(plan.bios_count, 1);
    assert_eq!(plan.would_scrape(), 2);
    assert_eq!(plan.filtered_out, 0);
}

#[tokio::test]
async fn filter_missing_covers_skips_complete_entries() {
    let api = FakeApi::new(&[
        ("a.md", Behavior::Found),
        ("b.md", Behavior::Found),
        ("c.md", Behavior::Found),
    ]);
    let h = harness(api, "missing.covers", false);

    // Catalog knows A and B; only A has a cover on disk.
    h.generator
        .merge_and_write(vec![
            rom_scout_frontend::GamelistEntry {
                path: "./Game A.md".into(),
                name: "Game A".into(),
                ..Default::default()
            },
            rom_scout_frontend::GamelistEntry {
                path: "./Game B.md".into(),
                name: "Game B".into(),
                ..Default::default()
            },
        ])
        .unwrap();
    h.generator
        .write_media(MediaKind::Cover, "game a", "png", b"cover")
        .unwrap();

    let m = manifest(vec![
        game("Game A", "a.md", 1, "aaaaaaaa"),
        game("Game B", "b.md", 2, "bbbbbbbb"),
        game("Game C", "c.md", 3, "cccccccc"),
    ]);

    let plan = h.scraper.plan(&m);
    assert_eq!(plan.filtered_out, 1, "A already has its cover");
    assert_eq!(plan.would_scrape(), 2, "B and C still need work");
}

#[tokio::test]
async fn second_run_hits_the_cache() {
    let api = FakeApi::new(&[("x.md", Behavior::Found)]);
    let dir = tempfile::tempdir().unwrap();
    let m = manifest(vec![game("Game X", "x.md", 1024, "aaaaaaaa")]);

    // First run: one lookup, one media download.
    let h1 = harness_at(dir, api.clone(), "true", false);
    let results = h1.scraper.scrape(&m).await;
    assert_eq!(results.found, 1);
    assert_eq!(results.cache_hits, 0);
    assert_eq!(results.media_downloaded, 1);
    assert_eq!(api.lookup_count(), 1);
    assert_eq!(api.media_count(), 1);

    // Second run over the same cache dir: the lookup is served from disk
    // and the existing media file short-circuits the download.
    let Harness { _dir, scraper, .. } = h1;
    let h2 = harness_at(_dir, api.clone(), "true", false);
    drop(scraper);
    let results = h2.scraper.scrape(&m).await;
    assert_eq!(results.found, 1);
    assert_eq!(results.cache_hits, 1);
    assert_eq!(results.media_downloaded, 0);
    assert_eq!(api.lookup_count(), 1, "no second network lookup");
    assert_eq!(api.media_count(), 1, "no second media download");
}

#[tokio::test]
async fn negative_results_are_cached_within_ttl() {
    let api = FakeApi::new(&[("y.md", Behavior::NotFound)]);
    let dir = tempfile::tempdir().unwrap();
    let m = manifest(vec![game("Game Y", "y.md", 1024, "dddddddd")]);

    let h1 = harness_at(dir, api.clone(), "true", false);
    let results = h1.scraper.scrape(&m).await;
    assert_eq!(results.not_found, 1);
    assert_eq!(api.lookup_count(), 1);
    assert_eq!(h1.cache.entry_count(), 1, "negative result is persisted");

    let Harness { _dir, scraper, .. } = h1;
    drop(scraper);
    let h2 = harness_at(_dir, api.clone(), "true", false);
    let results = h2.scraper.scrape(&m).await;
    assert_eq!(results.not_found, 1);
    assert_eq!(results.cache_hits, 1);
    assert_eq!(api.lookup_count(), 1, "negative result honored from cache");
}

#[tokio::test]
async fn identical_rom_entries_share_one_request() {
    let api = FakeApi::new(&[("dup.md", Behavior::Found)]);
    let h = harness(api.clone(), "true", false);

    // Two manifest entries describing the same dump: identical canonical
    // keys, so the single-flight overlay admits one network call.
    let m = manifest(vec![
        game("Dup One", "dup.md", 1024, "eeeeeeee"),
        game("Dup Two", "dup.md", 1024, "eeeeeeee"),
    ]);

    let results = h.scraper.scrape(&m).await;
    assert_eq!(results.found, 2);
    assert_eq!(api.lookup_count(), 1, "second caller observed the first result");
    assert_eq!(results.cache_hits, 1);
}

#[tokio::test]
async fn fatal_error_aborts_the_run() {
    let api = FakeApi::new(&[
        ("q1.md", Behavior::Quota),
        ("q2.md", Behavior::Quota),
        ("q3.md", Behavior::Quota),
    ]);
    let mut h = harness(api.clone(), "true", false);
    h.scraper.config.workers = 1;

    let m = manifest(vec![
        game("Q1", "q1.md", 1, "aaaaaaaa"),
        game("Q2", "q2.md", 2, "bbbbbbbb"),
        game("Q3", "q3.md", 3, "cccccccc"),
    ]);

    let results = h.scraper.scrape(&m).await;
    assert_eq!(results.errored, 1, "the quota failure is recorded once");
    assert!(h.cancel.is_cancelled(), "fatal errors cancel the run");
    assert!(
        results.entries.len() < 3,
        "remaining entries were never scheduled"
    );
    assert!(api.lookup_count() <= 2);
}

#[tokio::test]
async fn transient_errors_mark_the_entry_errored() {
    let api = FakeApi::new(&[("flaky.md", Behavior::Transient)]);
    let h = harness(api, "true", false);

    let m = manifest(vec![game("Flaky", "flaky.md", 1, "abcdabcd")]);
    let results = h.scraper.scrape(&m).await;
    assert_eq!(results.errored, 1);
    assert!(results.entries[0].error.as_ref().unwrap().contains("flaky"));
    assert!(!h.cancel.is_cancelled());
}

#[tokio::test]
async fn overwrite_true_redownloads_media() {
    let api = FakeApi::new(&[("x.md", Behavior::Found)]);
    let dir = tempfile::tempdir().unwrap();
    let m = manifest(vec![game("Game X", "x.md", 1024, "aaaaaaaa")]);

    let h1 = harness_at(dir, api.clone(), "true", true);
    h1.scraper.scrape(&m).await;
    assert_eq!(api.media_count(), 1);

    let Harness { _dir, scraper, .. } = h1;
    drop(scraper);
    let h2 = harness_at(_dir, api.clone(), "true", true);
    let results = h2.scraper.scrape(&m).await;
    assert_eq!(api.media_count(), 2, "overwrite forces a fresh download");
    assert_eq!(results.media_downloaded, 1);
}

#[tokio::test]
async fn cancellation_preserves_partial_results() {
    let api = FakeApi::new(&[
        ("c1.md", Behavior::Found),
        ("c2.md", Behavior::Found),
        ("c3.md", Behavior::Found),
        ("c4.md", Behavior::Found),
    ]);
    let mut h = harness(api.clone(), "true", false);
    h.scraper.config.workers = 1;
    api.cancel_after(2, h.cancel.clone());

    let m = manifest(vec![
        game("C1", "c1.md", 1, "aaaaaaaa"),
        game("C2", "c2.md", 2, "bbbbbbbb"),
        game("C3", "c3.md", 3, "cccccccc"),
        game("C4", "c4.md", 4, "dddddddd"),
    ]);

    let results = h.scraper.scrape(&m).await;
    // The first two entries completed before the token fired; entries
    // behind them were never scheduled.
    assert!(results.entries.len() >= 2);
    assert!(results.found >= 2);
    assert!(
        results.found + results.not_found + results.skipped + results.errored
            <= results.total
    );
}

#[tokio::test]
async fn updates_reconcile_with_results() {
    let api = FakeApi::new(&[
        ("found.md", Behavior::Found),
        ("missing.md", Behavior::NotFound),
    ]);
    let mut h = harness(api, "true", false);
    let mut rx = h.updates_rx.take().unwrap();

    let m = manifest(vec![
        game("Found Game", "found.md", 1024, "aaaaaaaa"),
        game("Missing Game", "missing.md", 2048, "bbbbbbbb"),
    ]);

    let results = h.scraper.scrape(&m).await;
    drop(h.scraper);

    let mut model = crate::progress::ProgressModel::new();
    while let Some(update) = rx.recv().await {
        model.apply(&update);
    }
    let snap = model.snapshot();
    assert_eq!(snap.found, results.found);
    assert_eq!(snap.not_found, results.not_found);
    assert_eq!(snap.errored, results.errored);
    assert_eq!(snap.media_downloaded, results.media_downloaded);
    assert_eq!(snap.cache_hits, results.cache_hits);
}

#[tokio::test]
async fn media_lands_in_the_fixed_tree() {
    let api = FakeApi::new(&[("x.md", Behavior::Found)]);
    let h = harness(api, "true", false);
    let m = manifest(vec![game("Game X (USA)", "x.md", 1024, "aaaaaaaa")]);

    let results = h.scraper.scrape(&m).await;
    let (kind, path) = &results.entries[0].media[0];
    assert_eq!(*kind, MediaKind::Cover);
    assert!(path.ends_with("covers/game x (usa).png"), "got {path:?}");
    assert_eq!(std::fs::read(path).unwrap(), b"image-bytes");
}
