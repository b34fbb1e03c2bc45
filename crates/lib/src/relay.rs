//! Log relay: every `log` record in the process, as a line on the UI thread.
//!
//! [`LogRelay`] is a `log::Log` implementation that formats each record and posts it to a
//! [`LogFeed`] drained by the UI thread. Once [`install`]ed it is the process-wide logger
//! for the rest of the process lifetime: every `log::info!` (and friends) anywhere, from any
//! thread, shows up in the log view. That global state is intentional; the relay is the
//! debug console. Lines from one thread arrive in the order that thread logged them.
//!
//! Lines from the UI framework's own crates are posted without firing the wakeup: those crates
//! log on every repaint, and waking for them would keep the event loop spinning.

use std::fmt;

use log::{LevelFilter, Log, Metadata, Record};

use crate::dispatch::{self, Inbox, Outbox, Wakeup};

/// One formatted log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    line: String,
}

impl LogEvent {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Receiving side of the relay, owned by the UI thread.
pub type LogFeed = Inbox<LogEvent>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("a global logger is already installed")]
    AlreadyInstalled(#[from] log::SetLoggerError),
}

/// Log targets (crate roots) whose lines never fire the wakeup.
pub const QUIET_TARGETS: &[&str] = &[
    "eframe",
    "egui",
    "egui_glow",
    "egui_wgpu",
    "egui_winit",
    "egui-winit",
    "winit",
    "glow",
    "glutin",
    "glutin_winit",
    "wgpu",
    "wgpu_core",
    "wgpu_hal",
    "naga",
    "accesskit",
    "accesskit_winit",
    "arboard",
    "calloop",
    "sctk",
    "smithay_client_toolkit",
    "x11rb",
    "zbus",
];

/// `log::Log` sink that republishes records as [`LogEvent`]s. Accepts every level.
pub struct LogRelay {
    outbox: Outbox<LogEvent>,
    echo: Option<Box<dyn Log>>,
    quiet_targets: Vec<String>,
}

impl LogRelay {
    /// Create a relay and the feed the UI thread drains. `wakeup` fires after every line
    /// except those from [`QUIET_TARGETS`].
    pub fn new(wakeup: Wakeup) -> (Self, LogFeed) {
        let (outbox, feed) = dispatch::channel(wakeup);
        let relay = Self {
            outbox,
            echo: None,
            quiet_targets: QUIET_TARGETS.iter().map(|t| t.to_string()).collect(),
        };
        (relay, feed)
    }

    /// Replace the targets whose lines are posted without a wakeup.
    pub fn with_quiet_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quiet_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// True when lines from `target` should wake the UI. `target` matches a quiet entry when it
    /// is that crate or one of its modules.
    pub fn wakes_for(&self, target: &str) -> bool {
        !self.quiet_targets.iter().any(|quiet| {
            target
                .strip_prefix(quiet.as_str())
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
        })
    }

    /// Also forward every record to `echo` (e.g. an `env_logger` writing to stderr).
    /// The echo applies its own filter.
    pub fn with_echo(mut self, echo: Box<dyn Log>) -> Self {
        self.echo = Some(echo);
        self
    }
}

impl Log for LogRelay {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        // Dropped feed (UI gone at shutdown) is not an error worth reporting.
        let event = LogEvent::new(format_record(record));
        if self.wakes_for(record.target()) {
            let _ = self.outbox.post(event);
        } else {
            let _ = self.outbox.post_quiet(event);
        }
        if let Some(ref echo) = self.echo {
            if echo.enabled(record.metadata()) {
                echo.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Some(ref echo) = self.echo {
            echo.flush();
        }
    }
}

/// Register `relay` as the global logger and open the level filter to everything.
/// Fails if any logger was installed before; there is no way to uninstall.
pub fn install(relay: LogRelay) -> Result<(), RelayError> {
    log::set_boxed_logger(Box::new(relay))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}

/// `2024-05-01 09:30:00.123 | INFO  | perch_core::runner - message`
pub fn format_record(record: &Record) -> String {
    format!(
        "{} | {:<5} | {} - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.target(),
        record.args()
    )
}
