//! Perch Desktop: application entry.
//!
//! The log relay is installed before the window opens so startup logging lands in the
//! Logs screen too; the repaint hook is connected once egui hands us a context.

mod app;
mod repaint;

use std::sync::{Arc, OnceLock};

use eframe::egui;
use perch_core::relay::{self, LogRelay};

fn main() -> anyhow::Result<()> {
    let egui_ctx: Arc<OnceLock<egui::Context>> = Arc::new(OnceLock::new());
    let wakeup = repaint::repaint_wakeup(egui_ctx.clone());

    let stderr = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .build();
    let (relay, log_feed) = LogRelay::new(wakeup.clone());
    relay::install(relay.with_echo(Box::new(stderr)))?;
    log::info!("desktop started");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Perch",
        options,
        Box::new(move |cc| {
            let _ = egui_ctx.set(cc.egui_ctx.clone());
            Box::new(app::PerchApp::new(cc, wakeup, log_feed))
        }),
    )
    .map_err(|e| anyhow::anyhow!("desktop failed: {}", e))
}
