//! Display colours for region outlines.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Colours handed out to regions, in order.
pub const REGION_PALETTE: [&str; 10] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe",
];

/// Round-robin cursor over [`REGION_PALETTE`], shared across requests.
///
/// Purely cosmetic: concurrent callers may interleave, so a region's colour
/// is not stable between responses.
#[derive(Debug, Default)]
pub struct ColorCycle {
    cursor: AtomicUsize,
}

impl ColorCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next colour, wrapping after the last.
    pub fn next_color(&self) -> &'static str {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        REGION_PALETTE[idx % REGION_PALETTE.len()]
    }
}
