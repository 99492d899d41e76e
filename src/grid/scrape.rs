use std::collections::HashSet;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::extract::{extract_visible, ScrapeView};
use super::viewport::StallTracker;
use super::{GridSurface, TaskRow};

/// Stop once this many consecutive scrolls produce no content growth.
pub const DEFAULT_STALL_LIMIT: u32 = 3;

/// Hard ceiling on extraction passes. The stall heuristic alone cannot
/// bound a surface whose height metric oscillates while it lazy-loads and
/// unloads rows, so a run that reaches this is cut off and flagged.
pub const DEFAULT_MAX_PASSES: u32 = 500;

#[derive(Debug, Clone, Copy)]
pub struct ScrapeLimits {
    pub stall_limit: u32,
    pub max_passes: u32,
}

impl Default for ScrapeLimits {
    fn default() -> Self {
        Self {
            stall_limit: DEFAULT_STALL_LIMIT,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

/// Outcome of a full grid walk.
#[derive(Debug)]
pub struct GridScrape {
    /// First-seen order, one entry per rowid.
    pub rows: Vec<TaskRow>,
    pub passes: u32,
    /// True when the pass ceiling cut the walk short; the row set is
    /// incomplete and callers must say so instead of passing it off as a
    /// full extraction.
    pub truncated: bool,
}

/// Walk the virtualized grid to exhaustion: extract the materialized rows,
/// merge them into the deduplicated result, scroll, settle, and stop once
/// the content height stalls or the pass ceiling trips.
pub async fn collect_rows<S: GridSurface>(
    surface: &mut S,
    view: ScrapeView,
    limits: ScrapeLimits,
) -> Result<GridScrape> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    let mut seen: HashSet<String> = HashSet::new();
    let mut rows: Vec<TaskRow> = Vec::new();
    let mut tracker = StallTracker::new(limits.stall_limit);
    let mut passes = 0u32;
    let mut truncated = false;

    loop {
        passes += 1;

        let fresh = extract_visible(surface, &mut seen, view).await?;
        if !fresh.is_empty() {
            info!("pass {}: {} new rows", passes, fresh.len());
        }
        rows.extend(fresh);

        pb.set_message(format!("pass {}: {} rows collected", passes, rows.len()));
        pb.tick();

        let metric = surface.scroll_to_end().await?;
        surface.settle().await;

        if tracker.observe(metric) {
            info!(
                "content height stalled at {} for {} scrolls after {} passes; assuming end of list",
                metric,
                tracker.stalled(),
                passes
            );
            break;
        }
        if passes >= limits.max_passes {
            warn!(
                "pass ceiling ({}) reached before the grid settled; result is incomplete",
                limits.max_passes
            );
            truncated = true;
            break;
        }
    }

    pb.finish_and_clear();
    Ok(GridScrape {
        rows,
        passes,
        truncated,
    })
}

/// Project the completed view down to its external ids, first-seen order,
/// one entry per id. Rows with a completion timestamp but no parseable
/// reference are dropped here.
pub fn completed_ids(rows: &[TaskRow]) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for row in rows {
        if row.completed_on.is_none() {
            continue;
        }
        if let Some(id) = &row.external_id {
            if seen.insert(id.clone()) {
                out.push(id.clone());
            }
        }
    }
    out
}

// ── Tests ──
