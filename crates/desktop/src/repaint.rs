//! Repaint hook shared by the agent runner and the log relay.

use std::sync::{Arc, OnceLock};

use eframe::egui;
use perch_core::dispatch::{self, Wakeup};

/// Wakeup that asks egui for another frame once `slot` holds the context.
///
/// `request_repaint` takes the context lock, and egui logs while holding that lock during a
/// frame. The request therefore runs on the dispatch waker thread, never on the logging thread.
pub fn repaint_wakeup(slot: Arc<OnceLock<egui::Context>>) -> Wakeup {
    dispatch::deferred(Arc::new(move || {
        if let Some(ctx) = slot.get() {
            ctx.request_repaint();
        }
    }))
}
