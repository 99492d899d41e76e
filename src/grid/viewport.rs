/// Termination heuristic for the scroll loop.
///
/// Content height is an imperfect proxy for "more rows exist": virtualized
/// rendering can hold the height constant while it swaps visible rows, and
/// lazy loading can lag the scroll command. A single non-growing sample is
/// a false-termination hazard, so the tracker only reports exhaustion after
/// `threshold` consecutive stalled measurements.
#[derive(Debug)]
pub struct StallTracker {
    last: Option<i64>,
    stalled: u32,
    threshold: u32,
}

impl StallTracker {
    pub fn new(threshold: u32) -> Self {
        assert!(threshold >= 1, "stall threshold must be at least 1");
        Self {
            last: None,
            stalled: 0,
            threshold,
        }
    }

    /// Feed the metric observed after a scroll. Returns true once the
    /// metric has failed to move for `threshold` consecutive scrolls.
    pub fn observe(&mut self, metric: i64) -> bool {
        match self.last {
            Some(prev) if prev == metric => self.stalled += 1,
            _ => {
                self.stalled = 0;
                self.last = Some(metric);
            }
        }
        self.stalled >= self.threshold
    }

    pub fn stalled(&self) -> u32 {
        self.stalled
    }
}

// ── Tests ──
