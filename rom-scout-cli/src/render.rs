//! Progress rendering.
//!
//! A background task folds the update stream into a [`ProgressModel`] and
//! repaints an indicatif bar from periodic snapshots. JSON runs swap in a
//! silent renderer that still drains the stream so counters stay exact.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use rom_scout_scraper::progress::UpdateReceiver;
use rom_scout_scraper::{ProgressModel, ProgressSnapshot, ScrapeUpdate};

/// How the run should be displayed.
pub(crate) enum Renderer {
    /// Live progress bar on a terminal.
    Tty,
    /// Drain updates without painting anything (JSON / quiet runs).
    Silent,
}

/// Consume the update stream until the workers drop their senders.
/// Returns the final snapshot.
pub(crate) fn spawn_progress(
    mut rx: UpdateReceiver,
    total_candidates: usize,
    renderer: Renderer,
) -> JoinHandle<ProgressSnapshot> {
    tokio::spawn(async move {
        let bar = match renderer {
            Renderer::Tty => {
                let bar = ProgressBar::new(total_candidates as u64);
                bar.set_style(
                    ProgressStyle::with_template(
                        "  {bar:30.cyan/dim} {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                Some(bar)
            }
            Renderer::Silent => None,
        };

        let mut model = ProgressModel::new();
        while let Some(update) = rx.recv().await {
            let terminal = matches!(
                update,
                ScrapeUpdate::Completed { .. } | ScrapeUpdate::Filtered { .. }
            );
            model.apply(&update);

            if let Some(ref bar) = bar {
                if terminal {
                    bar.inc(1);
                }
                let snap = model.snapshot();
                bar.set_message(format!(
                    "found {} / missing {} / errors {}{}",
                    snap.found,
                    snap.not_found,
                    snap.errored,
                    snap.current
                        .as_deref()
                        .map(|name| format!(" — {name}"))
                        .unwrap_or_default(),
                ));
            }
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        model.snapshot()
    })
}
