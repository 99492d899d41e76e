//! In-memory stand-in for the live grid: a fixed logical table, a sliding
//! visible window, per-pass label-pane availability, and a scripted
//! content-height schedule. Lets the loop tests run without a browser and
//! without real settle delays.

use anyhow::Result;

use super::GridSurface;

pub struct SimRow {
    row_id: Option<String>,
    title: Option<String>,
    /// Extraction pass (0-based) from which the label-pane fragment is
    /// materialized.
    title_from_pass: u32,
    completed: Option<String>,
}

impl SimRow {
    pub fn new(row_id: &str, title: &str, completed: Option<&str>) -> Self {
        Self {
            row_id: Some(row_id.to_string()),
            title: Some(title.to_string()),
            title_from_pass: 0,
            completed: completed.map(str::to_string),
        }
    }

    /// A fragment mid-render whose rowid has not stabilized.
    pub fn transient() -> Self {
        Self {
            row_id: None,
            title: None,
            title_from_pass: 0,
            completed: None,
        }
    }

    pub fn title_from_pass(mut self, pass: u32) -> Self {
        self.title_from_pass = pass;
        self
    }
}

pub struct SimGrid {
    rows: Vec<SimRow>,
    window: usize,
    heights: Vec<i64>,
    /// Scrolls issued so far; doubles as the 0-based extraction pass index.
    pass: u32,
}

impl SimGrid {
    pub fn new(rows: Vec<SimRow>, window: usize, heights: Vec<i64>) -> Self {
        assert!(window >= 1);
        assert!(!heights.is_empty());
        Self {
            rows,
            window,
            heights,
            pass: 0,
        }
    }

    /// Rows currently mounted. The window advances one width per scroll
    /// and pins to the tail once it gets there.
    fn visible(&self) -> &[SimRow] {
        let len = self.rows.len();
        let start = (self.pass as usize * self.window).min(len.saturating_sub(self.window));
        let end = (start + self.window).min(len);
        &self.rows[start..end]
    }

    fn mounted(&self, row_id: &str) -> Option<&SimRow> {
        // Scanned in reverse: the label pane is served in the opposite
        // order from the data pane, so nothing positional can line up.
        self.visible()
            .iter()
            .rev()
            .find(|r| r.row_id.as_deref() == Some(row_id))
    }
}

impl GridSurface for SimGrid {
    async fn visible_row_ids(&self) -> Result<Vec<Option<String>>> {
        Ok(self.visible().iter().map(|r| r.row_id.clone()).collect())
    }

    async fn completed_text(&self, row_id: &str) -> Option<String> {
        self.mounted(row_id).and_then(|r| r.completed.clone())
    }

    async fn label_title(&self, row_id: &str) -> Option<String> {
        self.mounted(row_id)
            .filter(|r| self.pass >= r.title_from_pass)
            .and_then(|r| r.title.clone())
    }

    async fn scroll_to_end(&mut self) -> Result<i64> {
        let idx = (self.pass as usize).min(self.heights.len() - 1);
        self.pass += 1;
        Ok(self.heights[idx])
    }

    async fn settle(&self) {}
}
