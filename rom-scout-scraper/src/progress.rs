//! Update stream and progress model.
//!
//! Workers publish two classes of updates: heartbeats (lookup started,
//! media downloading) that may be dropped when the subscriber lags, and
//! terminal events (filtered, completed) that are never dropped because
//! the counters depend on them. They travel on separate channels — a
//! bounded ring for heartbeats, an unbounded queue for terminals.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use rom_scout_frontend::MediaKind;

/// Heartbeat ring capacity.
const HEARTBEAT_CAPACITY: usize = 256;

/// Entries remembered per outcome in the rolling windows.
const WINDOW_SIZE: usize = 10;

/// Terminal outcome of one scraped entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOutcome {
    Found,
    NotFound,
    Skipped,
    Errored,
}

/// Progress events emitted during scraping.
#[derive(Debug, Clone)]
pub enum ScrapeUpdate {
    // -- heartbeats (droppable) --
    /// A worker picked up the entry.
    Started { name: String },
    /// Metadata lookup issued.
    LookingUp { name: String },
    /// A media download is running.
    DownloadingMedia { name: String, kind: MediaKind },

    // -- terminals (never dropped) --
    /// The filter rejected the entry.
    Filtered { name: String },
    /// The entry reached a terminal outcome.
    Completed {
        name: String,
        outcome: EntryOutcome,
        cache_hit: bool,
        media_downloaded: usize,
        error: Option<String>,
    },
}

impl ScrapeUpdate {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Filtered { .. } | Self::Completed { .. })
    }
}

/// Worker-side handle. Cloned into every worker.
#[derive(Clone)]
pub struct UpdateSender {
    heartbeat_tx: mpsc::Sender<ScrapeUpdate>,
    terminal_tx: mpsc::UnboundedSender<ScrapeUpdate>,
}

impl UpdateSender {
    /// Publish an update. Heartbeats are dropped when the ring is full;
    /// terminals always go through.
    pub fn send(&self, update: ScrapeUpdate) {
        if update.is_terminal() {
            let _ = self.terminal_tx.send(update);
        } else {
            // A lagging subscriber loses old ticks, never completions.
            let _ = self.heartbeat_tx.try_send(update);
        }
    }
}

/// Subscriber-side handle.
pub struct UpdateReceiver {
    heartbeat_rx: mpsc::Receiver<ScrapeUpdate>,
    terminal_rx: mpsc::UnboundedReceiver<ScrapeUpdate>,
    heartbeats_closed: bool,
}

impl UpdateReceiver {
    /// Receive the next update, preferring terminals. Returns `None` once
    /// both channels are closed and drained.
    pub async fn recv(&mut self) -> Option<ScrapeUpdate> {
        loop {
            if self.heartbeats_closed {
                return self.terminal_rx.recv().await;
            }
            tokio::select! {
                biased;
                terminal = self.terminal_rx.recv() => {
                    match terminal {
                        Some(update) => return Some(update),
                        None => return self.heartbeat_rx.recv().await,
                    }
                }
                heartbeat = self.heartbeat_rx.recv() => {
                    match heartbeat {
                        Some(update) => return Some(update),
                        // Heartbeats closed; only terminals remain.
                        None => self.heartbeats_closed = true,
                    }
                }
            }
        }
    }

    /// Drain whatever is immediately available without waiting.
    pub fn drain_ready(&mut self) -> Vec<ScrapeUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.terminal_rx.try_recv() {
            updates.push(update);
        }
        while let Ok(update) = self.heartbeat_rx.try_recv() {
            updates.push(update);
        }
        updates
    }
}

/// Create a connected sender/receiver pair.
pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    let (heartbeat_tx, heartbeat_rx) = mpsc::channel(HEARTBEAT_CAPACITY);
    let (terminal_tx, terminal_rx) = mpsc::unbounded_channel();
    (
        UpdateSender {
            heartbeat_tx,
            terminal_tx,
        },
        UpdateReceiver {
            heartbeat_rx,
            terminal_rx,
            heartbeats_closed: false,
        },
    )
}

/// Immutable snapshot handed to renderers.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProgressSnapshot {
    pub filtered_out: usize,
    pub found: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub errored: usize,
    pub cache_hits: usize,
    pub media_downloaded: usize,
    /// Entry currently reported by the newest heartbeat.
    pub current: Option<String>,
    pub recent_found: Vec<String>,
    pub recent_not_found: Vec<String>,
    pub recent_errored: Vec<String>,
}

impl ProgressSnapshot {
    pub fn completed(&self) -> usize {
        self.found + self.not_found + self.skipped + self.errored
    }
}

/// Accumulates updates into counters and rolling windows.
#[derive(Debug, Default)]
pub struct ProgressModel {
    filtered_out: usize,
    found: usize,
    not_found: usize,
    skipped: usize,
    errored: usize,
    cache_hits: usize,
    media_downloaded: usize,
    current: Option<String>,
    recent_found: VecDeque<String>,
    recent_not_found: VecDeque<String>,
    recent_errored: VecDeque<String>,
}

impl ProgressModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one update into the model.
    pub fn apply(&mut self, update: &ScrapeUpdate) {
        match update {
            ScrapeUpdate::Started { name }
            | ScrapeUpdate::LookingUp { name }
            | ScrapeUpdate::DownloadingMedia { name, .. } => {
                self.current = Some(name.clone());
            }
            ScrapeUpdate::Filtered { .. } => self.filtered_out += 1,
            ScrapeUpdate::Completed {
                name,
                outcome,
                cache_hit,
                media_downloaded,
                ..
            } => {
                if *cache_hit {
                    self.cache_hits += 1;
                }
                self.media_downloaded += media_downloaded;
                match outcome {
                    EntryOutcome::Found => {
                        self.found += 1;
                        push_window(&mut self.recent_found, name);
                    }
                    EntryOutcome::NotFound => {
                        self.not_found += 1;
                        push_window(&mut self.recent_not_found, name);
                    }
                    EntryOutcome::Skipped => self.skipped += 1,
                    EntryOutcome::Errored => {
                        self.errored += 1;
                        push_window(&mut self.recent_errored, name);
                    }
                }
            }
        }
    }

    /// Pure snapshot for the renderer.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            filtered_out: self.filtered_out,
            found: self.found,
            not_found: self.not_found,
            skipped: self.skipped,
            errored: self.errored,
            cache_hits: self.cache_hits,
            media_downloaded: self.media_downloaded,
            current: self.current.clone(),
            recent_found: self.recent_found.iter().cloned().collect(),
            recent_not_found: self.recent_not_found.iter().cloned().collect(),
            recent_errored: self.recent_errored.iter().cloned().collect(),
        }
    }
}

fn push_window(window: &mut VecDeque<String>, name: &str) {
    if window.len() == WINDOW_SIZE {
        window.pop_front();
    }
    window.push_back(name.to_string());
}
