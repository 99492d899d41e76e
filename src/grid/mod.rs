pub mod extract;
pub mod scrape;
pub mod viewport;

#[cfg(test)]
pub mod sim;

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

/// Placeholder the grid renders in the completion column of unfinished tasks.
pub const COMPLETED_SENTINEL: &str = "--/--/---- --:--";

/// External ticket reference embedded in a task title, e.g. "[ABC-123] Fix thing".
/// Uppercase project codes only.
static EXTERNAL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Z0-9]+-[0-9]+)\]").unwrap());

/// One logical row of the task grid, joined across both panes by rowid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub row_id: String,
    pub title: String,
    pub completed_on: Option<String>,
    pub external_id: Option<String>,
}

/// The rendering surface the extraction loop runs against: a virtualized
/// two-pane grid that materializes only the rows near the viewport and
/// recycles DOM nodes as it scrolls.
///
/// The frozen label pane and the scrollable data pane are correlated
/// strictly by rowid. The panes scroll independently, so positional
/// indexes desynchronize and must never be used for the join.
pub trait GridSurface {
    /// Rowids of the row fragments currently materialized in the data pane.
    /// `None` entries are transient fragments whose id has not stabilized yet.
    async fn visible_row_ids(&self) -> Result<Vec<Option<String>>>;

    /// Completion-cell text for a data-pane row. Bounded read: a missing or
    /// slow cell degrades to `None`, never to an error.
    async fn completed_text(&self, row_id: &str) -> Option<String>;

    /// Title attribute of the label-pane fragment carrying the same rowid,
    /// or `None` while that fragment is not materialized.
    async fn label_title(&self, row_id: &str) -> Option<String>;

    /// Scroll the data viewport toward its end and return the content
    /// height observed after issuing the command. The measurement may lag
    /// async rendering; callers settle before trusting it.
    async fn scroll_to_end(&mut self) -> Result<i64>;

    /// Pause long enough for asynchronous re-rendering to catch up after a
    /// scroll.
    async fn settle(&self);
}

/// Normalize a completion-cell reading. The sentinel (and empty text) mean
/// "not completed" and map to `None`, whatever whitespace surrounds them.
pub fn normalize_completed(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == COMPLETED_SENTINEL {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First external reference found in a title, if any.
pub fn parse_external_id(title: &str) -> Option<String> {
    EXTERNAL_ID_RE.captures(title).map(|c| c[1].to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_maps_to_absent() {
        assert_eq!(normalize_completed("--/--/---- --:--"), None);
        assert_eq!(normalize_completed("  --/--/---- --:--  "), None);
        assert_eq!(normalize_completed("\t--/--/---- --:--\n"), None);
    }

    #[test]
    fn empty_cell_maps_to_absent() {
        assert_eq!(normalize_completed(""), None);
        assert_eq!(normalize_completed("   "), None);
    }

    #[test]
    fn real_timestamp_survives_trimmed() {
        assert_eq!(
            normalize_completed(" 12/03/2024 14:30 ").as_deref(),
            Some("12/03/2024 14:30")
        );
    }

    #[test]
    fn reference_extracted_from_bracketed_title() {
        assert_eq!(parse_external_id("[ABC-123] Fix thing").as_deref(), Some("ABC-123"));
        assert_eq!(parse_external_id("[X9-42] mixed code").as_deref(), Some("X9-42"));
    }

    #[test]
    fn reference_takes_first_match() {
        assert_eq!(
            parse_external_id("[AA-1] dup of [BB-2]").as_deref(),
            Some("AA-1")
        );
    }

    #[test]
    fn unbracketed_title_has_no_reference() {
        assert_eq!(parse_external_id("Fix thing"), None);
        assert_eq!(parse_external_id("ABC-123 without brackets"), None);
    }

    #[test]
    fn lowercase_codes_rejected() {
        assert_eq!(parse_external_id("[abc-123] x"), None);
    }
}
