use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use super::{normalize_completed, parse_external_id, GridSurface, TaskRow};

/// Which rows a scrape records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeView {
    /// Completed rows only. Incomplete rows are classified and consumed
    /// without touching the label pane.
    Done,
    /// Every row, with raw fields. Used for diagnostics and verification
    /// against a reference table.
    All,
}

/// One pass over the currently materialized data-pane rows.
///
/// Returns the rows that became fully classified this pass. A rowid is
/// added to `seen` only once classification finished: a fragment whose
/// rowid has not stabilized, or a row that still needs its label-pane
/// title while that fragment is unmounted, stays unmarked so a later pass
/// picks it up once the virtualizer brings it back through the window.
pub async fn extract_visible<S: GridSurface>(
    surface: &S,
    seen: &mut HashSet<String>,
    view: ScrapeView,
) -> Result<Vec<TaskRow>> {
    let ids = surface.visible_row_ids().await?;
    debug!("{} row fragments materialized", ids.len());

    let mut out = Vec::new();
    for row_id in ids.into_iter().flatten() {
        if seen.contains(&row_id) {
            continue;
        }

        // A missing or slow cell reads as "no value this pass".
        let completed_on = match surface.completed_text(&row_id).await {
            Some(raw) => normalize_completed(&raw),
            None => None,
        };

        if completed_on.is_none() && view == ScrapeView::Done {
            seen.insert(row_id);
            continue;
        }

        // The title must come from the label-pane fragment with the same
        // rowid. Not materialized yet means the row stays unresolved;
        // recording a completed row without its title is worse than
        // waiting a pass.
        let Some(title) = surface.label_title(&row_id).await else {
            continue;
        };

        let external_id = parse_external_id(&title);
        seen.insert(row_id.clone());
        out.push(TaskRow {
            row_id,
            title,
            completed_on,
            external_id,
        });
    }

    Ok(out)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::sim::{SimGrid, SimRow};

    #[tokio::test]
    async fn repeated_passes_over_seen_rows_yield_nothing() {
        let grid = SimGrid::new(
            vec![
                SimRow::new("1", "[AA-1] one", Some("01/01/2024 10:00")),
                SimRow::new("2", "two", None),
            ],
            10,
            vec![100],
        );
        let mut seen = HashSet::new();

        let first = extract_visible(&grid, &mut seen, ScrapeView::All).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = extract_visible(&grid, &mut seen, ScrapeView::All).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn titles_join_by_rowid_not_position() {
        // SimGrid serves the label pane in reverse order; a positional zip
        // would hand row 1 the title of row 2 and vice versa.
        let grid = SimGrid::new(
            vec![
                SimRow::new("1", "[AA-1] first", Some("01/01/2024 10:00")),
                SimRow::new("2", "[BB-2] second", Some("02/01/2024 10:00")),
            ],
            10,
            vec![100],
        );
        let mut seen = HashSet::new();

        let rows = extract_visible(&grid, &mut seen, ScrapeView::Done).await.unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows.iter().find(|r| r.row_id == "1").unwrap();
        let second = rows.iter().find(|r| r.row_id == "2").unwrap();
        assert_eq!(first.title, "[AA-1] first");
        assert_eq!(second.title, "[BB-2] second");
        assert_eq!(first.external_id.as_deref(), Some("AA-1"));
        assert_eq!(second.external_id.as_deref(), Some("BB-2"));
    }

    #[tokio::test]
    async fn done_view_consumes_incomplete_rows_without_label_lookup() {
        let grid = SimGrid::new(
            vec![
                // Label pane never materializes for this row; the done view
                // must not need it.
                SimRow::new("1", "pending work", None).title_from_pass(u32::MAX),
                SimRow::new("2", "[CC-3] done", Some("03/01/2024 09:00")),
            ],
            10,
            vec![100],
        );
        let mut seen = HashSet::new();

        let rows = extract_visible(&grid, &mut seen, ScrapeView::Done).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_id, "2");
        assert!(seen.contains("1"), "incomplete row is classified and consumed");
    }

    #[tokio::test]
    async fn completed_row_without_label_is_retried_not_recorded() {
        let grid = SimGrid::new(
            vec![SimRow::new("1", "[DD-4] late label", Some("04/01/2024 12:00"))
                .title_from_pass(1)],
            10,
            vec![100],
        );
        let mut seen = HashSet::new();

        let first = extract_visible(&grid, &mut seen, ScrapeView::Done).await.unwrap();
        assert!(first.is_empty());
        assert!(!seen.contains("1"), "unresolved row must not be marked seen");
    }

    #[tokio::test]
    async fn transient_fragments_without_rowid_are_skipped() {
        let grid = SimGrid::new(
            vec![
                SimRow::transient(),
                SimRow::new("2", "[EE-5] ok", Some("05/01/2024 08:00")),
            ],
            10,
            vec![100],
        );
        let mut seen = HashSet::new();

        let rows = extract_visible(&grid, &mut seen, ScrapeView::All).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_id, "2");
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn sentinel_completion_normalized_to_absent() {
        let grid = SimGrid::new(
            vec![SimRow::new("1", "waiting", Some("  --/--/---- --:--  "))],
            10,
            vec![100],
        );
        let mut seen = HashSet::new();

        let rows = extract_visible(&grid, &mut seen, ScrapeView::All).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].completed_on, None);
    }
}
