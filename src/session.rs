//! Session state — the drawing surface, variable bindings, and overlays
//! bundled into one object with a single lifecycle, so a reset is atomic
//! and the whole pipeline is testable without a live window.

use crate::overlay::OverlayManager;
use crate::recognition::RecognizedItem;
use crate::surface::DrawingSurface;
use std::collections::HashMap;
use std::time::Instant;

// ============================================================================
// Variable bindings
// ============================================================================

/// name → value assignments accumulated from recognition responses and
/// replayed into subsequent requests.  Grows monotonically until reset;
/// last assignment for a name wins.
#[derive(Default)]
pub struct VariableBindings {
    vars: HashMap<String, String>,
}

impl VariableBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a binding.
    pub fn assign(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Immutable copy for inclusion in a request body.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.vars.clone()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    pub surface: DrawingSurface,
    pub bindings: VariableBindings,
    pub overlays: OverlayManager,
}

impl Session {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: DrawingSurface::new(width, height),
            bindings: VariableBindings::new(),
            overlays: OverlayManager::new(),
        }
    }

    /// Apply one successful response batch, in two passes:
    /// 1. merge every `assign == true` item into the bindings;
    /// 2. schedule every item (assigned or not) for display.
    ///
    /// The ordering matters: all of a batch's assignments are in place
    /// before any of its overlays can become visible.
    pub fn apply_batch(&mut self, batch: &[RecognizedItem], now: Instant) {
        for item in batch {
            if item.assign {
                self.bindings.assign(&item.expr, &item.result);
            }
        }
        self.overlays.schedule_batch(batch, now);
    }

    /// Clear strokes, bindings, overlays, pending reveals, and the anchor —
    /// back to a fresh session, unconditionally.
    pub fn reset(&mut self) {
        self.surface.clear();
        self.bindings.clear();
        self.overlays.reset();
        crate::log_info!("session reset");
    }
}
