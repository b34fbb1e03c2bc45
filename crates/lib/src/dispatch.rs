//! Cross-thread hand-off into the UI thread.
//!
//! Producers (agent workers, the log relay) hold an [`Outbox`] and may post from any
//! thread. The UI thread owns the matching [`Inbox`] and drains it once per frame, so
//! every value is consumed on the thread that owns the display state. After each post
//! the outbox fires a [`Wakeup`] so an idle event loop schedules the next frame.
//!
//! A wakeup may be fired from inside a `log::Log` call, and the logging thread may be the UI
//! thread in the middle of a frame. Hooks that take the event loop's own locks must be wrapped
//! in [`deferred`] so they run on a separate thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Callback that asks the UI event loop to run another frame (e.g. `egui::Context::request_repaint`).
pub type Wakeup = Arc<dyn Fn() + Send + Sync>;

/// Wakeup that does nothing, for hosts that block on the inbox instead of running a frame loop.
pub fn no_wakeup() -> Wakeup {
    Arc::new(|| {})
}

/// Run `wakeup` on a dedicated `ui-waker` thread instead of the caller's.
///
/// Calls are coalesced: any number of fires before the waker thread gets to run collapse into
/// one call of `wakeup`. The thread exits once every clone of the returned hook is dropped.
/// If the thread cannot be spawned the returned hook does nothing.
pub fn deferred(wakeup: Wakeup) -> Wakeup {
    let (tx, rx) = mpsc::channel::<()>();
    let pending = Arc::new(AtomicBool::new(false));
    let waker_pending = pending.clone();
    let spawned = std::thread::Builder::new()
        .name("ui-waker".to_string())
        .spawn(move || {
            while rx.recv().is_ok() {
                waker_pending.store(false, Ordering::SeqCst);
                wakeup();
            }
        });
    if let Err(e) = spawned {
        log::warn!("dispatch: could not start waker thread: {}", e);
        return no_wakeup();
    }
    Arc::new(move || {
        if !pending.swap(true, Ordering::SeqCst) {
            let _ = tx.send(());
        }
    })
}

/// Create a connected outbox/inbox pair.
pub fn channel<T>(wakeup: Wakeup) -> (Outbox<T>, Inbox<T>) {
    let (tx, rx) = mpsc::channel();
    (Outbox { tx, wakeup }, Inbox { rx })
}

/// Sending half. Cheap to clone; safe to use from any thread.
pub struct Outbox<T> {
    tx: mpsc::Sender<T>,
    wakeup: Wakeup,
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wakeup: self.wakeup.clone(),
        }
    }
}

impl<T> Outbox<T> {
    /// Queue a value for the UI thread and wake it. Returns false when the inbox is gone.
    pub fn post(&self, value: T) -> bool {
        if self.tx.send(value).is_err() {
            return false;
        }
        (self.wakeup)();
        true
    }

    /// Queue a value without firing the wakeup. It is picked up on the next frame that runs
    /// for any other reason.
    pub fn post_quiet(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Why a receive returned nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Empty {
    /// Nothing queued yet; producers are still alive.
    Pending,
    /// Every outbox has been dropped and the queue is drained.
    Closed,
}

/// Receiving half. Owned by the UI thread.
pub struct Inbox<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Inbox<T> {
    /// Take the next queued value without blocking.
    pub fn try_next(&self) -> Result<T, Empty> {
        self.rx.try_recv().map_err(|e| match e {
            mpsc::TryRecvError::Empty => Empty::Pending,
            mpsc::TryRecvError::Disconnected => Empty::Closed,
        })
    }

    /// Block until a value arrives, every outbox is dropped, or the timeout elapses.
    pub fn next_timeout(&self, timeout: Duration) -> Result<T, Empty> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => Empty::Pending,
            mpsc::RecvTimeoutError::Disconnected => Empty::Closed,
        })
    }

    /// Block until a value arrives or every outbox is dropped.
    pub fn next_blocking(&self) -> Result<T, Empty> {
        self.rx.recv().map_err(|_| Empty::Closed)
    }

    /// Hand every queued value to `f`, in queue order. Returns how many were handled.
    pub fn drain(&self, mut f: impl FnMut(T)) -> usize {
        let mut n = 0;
        while let Ok(value) = self.rx.try_recv() {
            f(value);
            n += 1;
        }
        n
    }
}
