//! Task runner: one agent call per submission, off the UI thread.
//!
//! Each [`TaskRunner::submit`] spawns a dedicated worker thread that builds its own
//! current-thread tokio runtime, drives [`Agent::run`] to completion, and posts exactly one
//! [`TerminalEvent`] back through a [`dispatch`](crate::dispatch) channel. The thread and its
//! runtime are dropped afterwards; nothing is pooled.
//!
//! A submission is never lost. Agent errors and panics become `Failure`, and if the worker
//! dies before posting anything (spawn failure, runtime failure, unwinding past the catch),
//! the delivery drop guard posts a generic `Failure` instead.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::Agent;
use crate::dispatch::{self, Empty, Inbox, Outbox, Wakeup};

/// Message used when a worker ends without producing a result of its own.
pub const WORKER_LOST: &str = "agent worker stopped before producing a result";

/// One accepted user prompt. Never empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    text: String,
}

impl Submission {
    /// Trim the input; `None` when nothing is left.
    pub fn new(input: &str) -> Option<Self> {
        let text = input.trim();
        if text.is_empty() {
            None
        } else {
            Some(Self {
                text: text.to_string(),
            })
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The single outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Success { text: String },
    Failure { message: String },
}

impl TerminalEvent {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalEvent::Success { .. })
    }
}

/// Spawns one-shot agent workers that report back to the UI thread.
pub struct TaskRunner {
    wakeup: Wakeup,
    spawned: u64,
}

impl TaskRunner {
    /// `wakeup` runs on the worker thread after the terminal event is queued.
    pub fn new(wakeup: Wakeup) -> Self {
        Self { wakeup, spawned: 0 }
    }

    /// Workers started so far.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Run `agent` on `submission` in a fresh worker. The caller must not have another task in
    /// flight against the same agent.
    pub fn submit(&mut self, agent: Arc<dyn Agent>, submission: Submission) -> PendingTask {
        self.spawned += 1;
        let id = self.spawned;
        let (outbox, inbox) = dispatch::channel(self.wakeup.clone());
        let delivery = Delivery::new(id, outbox);

        log::debug!("runner: starting worker {}", id);
        let spawned = std::thread::Builder::new()
            .name(format!("agent-worker-{}", id))
            .spawn(move || run_worker(agent, submission, delivery));
        // On spawn failure the closure (and its Delivery) is dropped, which posts the Failure.
        if let Err(e) = spawned {
            log::error!("runner: failed to spawn worker {}: {}", id, e);
        }

        PendingTask {
            id,
            inbox,
            resolved: false,
        }
    }
}

/// Handle held by the UI thread for the one in-flight submission.
pub struct PendingTask {
    id: u64,
    inbox: Inbox<TerminalEvent>,
    resolved: bool,
}

impl PendingTask {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Non-blocking check. Returns the terminal event once; later calls return `None`.
    pub fn poll(&mut self) -> Option<TerminalEvent> {
        if self.resolved {
            return None;
        }
        let event = match self.inbox.try_next() {
            Ok(event) => event,
            Err(Empty::Pending) => return None,
            Err(Empty::Closed) => lost(),
        };
        self.resolved = true;
        Some(event)
    }

    /// Block the calling thread until the terminal event arrives or `timeout` elapses.
    /// `None` timeout waits indefinitely.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Option<TerminalEvent> {
        if self.resolved {
            return None;
        }
        let received = match timeout {
            Some(t) => self.inbox.next_timeout(t),
            None => self.inbox.next_blocking(),
        };
        let event = match received {
            Ok(event) => event,
            Err(Empty::Pending) => return None,
            Err(Empty::Closed) => lost(),
        };
        self.resolved = true;
        Some(event)
    }
}

fn lost() -> TerminalEvent {
    TerminalEvent::Failure {
        message: WORKER_LOST.to_string(),
    }
}

/// Exactly-once sender for a worker's terminal event.
struct Delivery {
    id: u64,
    outbox: Option<Outbox<TerminalEvent>>,
}

impl Delivery {
    fn new(id: u64, outbox: Outbox<TerminalEvent>) -> Self {
        Self {
            id,
            outbox: Some(outbox),
        }
    }

    fn deliver(mut self, event: TerminalEvent) {
        if let Some(outbox) = self.outbox.take() {
            if !outbox.post(event) {
                log::debug!("runner: worker {} finished after its receiver was dropped", self.id);
            }
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(outbox) = self.outbox.take() {
            log::error!("runner: worker {} ended without a result", self.id);
            outbox.post(lost());
        }
    }
}

fn run_worker(agent: Arc<dyn Agent>, submission: Submission, delivery: Delivery) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("runner: worker {} could not build runtime: {}", delivery.id, e);
            delivery.deliver(TerminalEvent::Failure {
                message: format!("failed to start agent worker: {}", e),
            });
            return;
        }
    };

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(agent.run(submission.text()))
    }));
    let event = match outcome {
        Ok(Ok(text)) => {
            log::debug!("runner: worker {} succeeded", delivery.id);
            TerminalEvent::Success { text }
        }
        Ok(Err(e)) => {
            log::warn!("runner: worker {} failed: {}", delivery.id, e);
            TerminalEvent::Failure {
                message: e.to_string(),
            }
        }
        Err(panic) => {
            let message = format!("agent panicked: {}", panic_message(panic.as_ref()));
            log::error!("runner: worker {}: {}", delivery.id, message);
            TerminalEvent::Failure { message }
        }
    };
    delivery.deliver(event);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread::ThreadId;

    const WAIT: Option<Duration> = Some(Duration::from_secs(5));

    struct Fixed {
        reply: Result<&'static str, &'static str>,
        thread: Mutex<Option<ThreadId>>,
    }

    impl Fixed {
        fn ok(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text),
                thread: Mutex::new(None),
            })
        }

        fn err(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message),
                thread: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Agent for Fixed {
        async fn run(&self, _prompt: &str) -> Result<String, AgentError> {
            *self.thread.lock().unwrap() = Some(std::thread::current().id());
            tokio::task::yield_now().await;
            self.reply
                .map(String::from)
                .map_err(|m| AgentError::Other(m.to_string()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Agent for Panics {
        async fn run(&self, _prompt: &str) -> Result<String, AgentError> {
            panic!("tool exploded");
        }
    }

    fn submission(text: &str) -> Submission {
        Submission::new(text).expect("non-empty")
    }

    #[test]
    fn submission_is_trimmed_and_rejects_blank() {
        assert_eq!(submission("  hello \n").text(), "hello");
        assert!(Submission::new("").is_none());
        assert!(Submission::new(" \t\n ").is_none());
    }

    #[test]
    fn success_is_delivered_once_from_another_thread() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let mut runner = TaskRunner::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let agent = Fixed::ok("hi there");
        let mut task = runner.submit(agent.clone(), submission("hello"));

        let event = task.wait(WAIT).expect("terminal event");
        assert_eq!(
            event,
            TerminalEvent::Success {
                text: "hi there".into()
            }
        );
        // The wakeup fires just after the post, so give the worker a moment to get there.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while wakes.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert_eq!(task.poll(), None);
        assert_eq!(task.wait(Some(Duration::from_millis(20))), None);

        let worker = agent.thread.lock().unwrap().expect("agent ran");
        assert_ne!(worker, std::thread::current().id());
        assert_eq!(runner.spawned(), 1);
    }

    #[test]
    fn agent_error_becomes_failure() {
        let mut runner = TaskRunner::new(dispatch::no_wakeup());
        let mut task = runner.submit(Fixed::err("timeout"), submission("bad"));
        assert_eq!(
            task.wait(WAIT),
            Some(TerminalEvent::Failure {
                message: "timeout".into()
            })
        );
    }

    #[test]
    fn panic_becomes_failure() {
        let mut runner = TaskRunner::new(dispatch::no_wakeup());
        let mut task = runner.submit(Arc::new(Panics), submission("boom"));
        match task.wait(WAIT) {
            Some(TerminalEvent::Failure { message }) => {
                assert!(message.contains("tool exploded"), "{}", message)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn dropped_delivery_posts_generic_failure() {
        let (outbox, inbox) = dispatch::channel(dispatch::no_wakeup());
        drop(Delivery::new(7, outbox));
        let mut task = PendingTask {
            id: 7,
            inbox,
            resolved: false,
        };
        assert_eq!(
            task.poll(),
            Some(TerminalEvent::Failure {
                message: WORKER_LOST.into()
            })
        );
        assert_eq!(task.poll(), None);
    }

    #[test]
    fn each_submit_spawns_a_fresh_worker() {
        let mut runner = TaskRunner::new(dispatch::no_wakeup());
        for i in 1..=3u64 {
            let mut task = runner.submit(Fixed::ok("ok"), submission("again"));
            assert_eq!(task.id(), i);
            assert!(task.wait(WAIT).expect("event").is_success());
        }
        assert_eq!(runner.spawned(), 3);
    }
}
