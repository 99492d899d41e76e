//! Reference-table parsing for the `verify` operation: a captured HTML
//! export of the full task grid is the ground truth a live scrape gets
//! diffed against.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::grid::{normalize_completed, TaskRow};

/// Column class of the completion timestamp in the captured export. The
/// live grid assigns these per layout, so the capture and the running app
/// need not agree.
const COMPLETED_COLUMN: &str = "ui-grid-coluiGrid-0008";

static ROWID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"rowid="([^"]+)""#).unwrap());
static TITLE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"title="([^"]*)""#).unwrap());
static COMPLETED_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?s){COMPLETED_COLUMN}.*?__overflow-container[^>]*>\s*([^<]*)<"#
    ))
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureTask {
    pub row_id: String,
    pub title: String,
    pub completed_on: Option<String>,
}

/// Parse the reference table. Left-pane rows give `(rowid, title)`; the
/// body pane gives the completion cell per rowid, joined by key like the
/// live extraction. Titleless rows are skipped, matching what the scraper
/// can ever observe.
pub fn parse_reference_table(html: &str) -> Vec<FixtureTask> {
    let left_start = find_any(
        html,
        &[
            "ui-grid-pinned-container-left",
            "ui-grid-render-container-left",
        ],
    )
    .unwrap_or(0);
    let body_start = html.find("ui-grid-render-container-body").unwrap_or(html.len());

    let (left, body) = if left_start <= body_start {
        (&html[left_start..body_start], &html[body_start..])
    } else {
        (&html[left_start..], &html[body_start..left_start])
    };

    let mut tasks = Vec::new();
    for (row_id, chunk) in rowid_chunks(left) {
        let Some(title) = TITLE_ATTR_RE.captures(chunk).map(|c| c[1].to_string()) else {
            continue;
        };
        tasks.push(FixtureTask {
            completed_on: completed_for(body, &row_id),
            row_id,
            title,
        });
    }
    tasks
}

fn find_any(haystack: &str, needles: &[&str]) -> Option<usize> {
    needles.iter().filter_map(|n| haystack.find(n)).min()
}

/// Split a pane into per-row chunks: each rowid match owns the text up to
/// the next one.
fn rowid_chunks(pane: &str) -> Vec<(String, &str)> {
    let marks: Vec<(String, usize, usize)> = ROWID_RE
        .captures_iter(pane)
        .map(|c| {
            let m = c.get(0).unwrap();
            (c[1].to_string(), m.start(), m.end())
        })
        .collect();

    marks
        .iter()
        .enumerate()
        .map(|(i, (id, _, content_start))| {
            let end = marks.get(i + 1).map(|(_, s, _)| *s).unwrap_or(pane.len());
            (id.clone(), &pane[*content_start..end])
        })
        .collect()
}

fn completed_for(body: &str, row_id: &str) -> Option<String> {
    let marker = format!(r#"rowid="{row_id}""#);
    let at = body.find(&marker)?;
    let rest = &body[at + marker.len()..];
    // Stay inside this row's chunk; the next rowid starts the next row.
    let end = ROWID_RE.find(rest).map(|m| m.start()).unwrap_or(rest.len());
    let cell = COMPLETED_CELL_RE.captures(&rest[..end])?;
    normalize_completed(&cell[1])
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
    pub expected_total: usize,
    pub actual_total: usize,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compare scraped rows against the reference by title set.
pub fn diff_titles(expected: &[FixtureTask], actual: &[TaskRow]) -> VerifyReport {
    let want: HashSet<&str> = expected.iter().map(|t| t.title.as_str()).collect();
    let got: HashSet<&str> = actual.iter().map(|r| r.title.as_str()).collect();

    let mut missing: Vec<String> = want.difference(&got).map(|s| s.to_string()).collect();
    let mut unexpected: Vec<String> = got.difference(&want).map(|s| s.to_string()).collect();
    missing.sort();
    unexpected.sort();

    VerifyReport {
        missing,
        unexpected,
        expected_total: expected.len(),
        actual_total: actual.len(),
    }
}

// ── Tests ──
