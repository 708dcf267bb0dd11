//! Result overlay manager — turns recognized (expression, answer) pairs into
//! positioned, independently draggable markup overlays.
//!
//! Reveals are staggered: every item in a batch is scheduled with the same
//! fixed delay, so a multi-item batch becomes visible simultaneously once
//! the delay elapses (the board's historical behavior, kept on purpose).
//! Pending reveals are a drainable queue rather than fire-and-forget timers,
//! so `reset()` cancels anything not yet shown.

use crate::recognition::RecognizedItem;
use egui::{Pos2, pos2, vec2};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Vertical distance between overlays stacked from one anchor.
pub const STACK_OFFSET: f32 = 40.0;

/// Delay between a batch arriving and its overlays appearing.
pub const REVEAL_DELAY: Duration = Duration::from_secs(1);

/// Where overlays land before any run has computed an anchor.
const DEFAULT_ANCHOR: Pos2 = pos2(10.0, 200.0);

/// The result currently driving overlay creation; transient.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedResult {
    pub expression: String,
    pub answer: String,
}

impl GeneratedResult {
    /// Markup handed to the typesetter: `\(\LARGE{expr = answer}\)`.
    pub fn markup(&self) -> String {
        format!("\\(\\LARGE{{{} = {}}}\\)", self.expression, self.answer)
    }
}

/// One rendered, draggable result.  The index in the overlay sequence is its
/// identity for the lifetime of the session.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayItem {
    pub content: String,
    pub pos: Pos2,
}

struct PendingReveal {
    due: Instant,
    result: GeneratedResult,
}

#[derive(Default)]
pub struct OverlayManager {
    items: Vec<OverlayItem>,
    pending: VecDeque<PendingReveal>,
    anchor: Option<Pos2>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.pending.is_empty()
    }

    /// Anchor for the *next* created overlays; seeded by the bounding-box
    /// center of the triggering run, never recomputed per item.
    pub fn set_anchor(&mut self, anchor: Pos2) {
        self.anchor = Some(anchor);
    }

    pub fn anchor(&self) -> Option<Pos2> {
        self.anchor
    }

    /// Queue every item of a response batch for display, all with the same
    /// fixed delay from `now`.  Assignments must already have been applied
    /// by the caller — scheduling is the second pass.
    pub fn schedule_batch(&mut self, batch: &[RecognizedItem], now: Instant) {
        let due = now + REVEAL_DELAY;
        for item in batch {
            self.pending.push_back(PendingReveal {
                due,
                result: GeneratedResult {
                    expression: item.expr.clone(),
                    answer: item.result.clone(),
                },
            });
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Earliest pending due time, for repaint scheduling.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Materialize every reveal that is due at `now`.  Each new overlay is
    /// placed at the anchor, offset 40 units down per overlay already on the
    /// board.  Returns the number of overlays created.
    pub fn reveal_due(&mut self, now: Instant) -> usize {
        let mut created = 0;
        while self.pending.front().map_or(false, |p| p.due <= now) {
            let reveal = match self.pending.pop_front() {
                Some(r) => r,
                None => break,
            };
            let base = self.anchor.unwrap_or(DEFAULT_ANCHOR);
            let pos = base + vec2(0.0, STACK_OFFSET * self.items.len() as f32);
            self.items.push(OverlayItem {
                content: reveal.result.markup(),
                pos,
            });
            created += 1;
        }
        created
    }

    /// Move overlay `index` to `pos` (user drag).  Other overlays and the
    /// anchor are untouched.
    pub fn drag_to(&mut self, index: usize, pos: Pos2) {
        if let Some(item) = self.items.get_mut(index) {
            item.pos = pos;
        }
    }

    /// Back to the Empty state: drops overlays, cancels pending reveals,
    /// forgets the anchor.
    pub fn reset(&mut self) {
        self.items.clear();
        self.pending.clear();
        self.anchor = None;
    }
}
