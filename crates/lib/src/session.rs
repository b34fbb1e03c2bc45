//! Session controller: the Idle/Busy state machine between the input box and the agent.
//!
//! Lives on the UI thread. A submission moves the session to Busy and hands the prompt to the
//! [`TaskRunner`]; the terminal event (picked up by [`SessionController::poll`] or
//! [`SessionController::wait`]) moves it back to Idle. While Busy every submission is refused,
//! which is what keeps the shared agent single-user. Log lines from an attached [`LogFeed`] are
//! routed into the log transcript on the same poll.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::Agent;
use crate::relay::LogFeed;
use crate::runner::{PendingTask, Submission, TaskRunner, TerminalEvent};
use crate::transcript::{ChatEntry, ChatRole, ChatTranscript, LogTranscript};

/// Reserved input that closes the application instead of reaching the agent.
pub const EXIT_COMMAND: &str = "exit";

const GOODBYE: &str = "Goodbye!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Busy,
}

/// Status-bar text, tied to [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Processing,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Ready => "ready",
            Status::Processing => "processing",
        }
    }
}

/// What a call to [`SessionController::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Prompt accepted; a worker is running.
    Started,
    /// Blank input; nothing changed.
    Empty,
    /// A request is already in flight; nothing changed.
    Busy,
    /// The user typed `exit`; the host should close.
    Exit,
}

pub struct SessionController {
    agent: Arc<dyn Agent>,
    runner: TaskRunner,
    state: SessionState,
    pending: Option<PendingTask>,
    chat: ChatTranscript,
    logs: LogTranscript,
    log_feed: Option<LogFeed>,
    exit_requested: bool,
}

impl SessionController {
    pub fn new(agent: Arc<dyn Agent>, runner: TaskRunner) -> Self {
        Self {
            agent,
            runner,
            state: SessionState::Idle,
            pending: None,
            chat: ChatTranscript::new(),
            logs: LogTranscript::new(),
            log_feed: None,
            exit_requested: false,
        }
    }

    /// Route relay lines into the log transcript, keeping at most `max_lines` (0 = unbounded).
    pub fn with_log_feed(mut self, feed: LogFeed, max_lines: usize) -> Self {
        self.log_feed = Some(feed);
        self.logs = LogTranscript::with_cap(max_lines);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> Status {
        match self.state {
            SessionState::Idle => Status::Ready,
            SessionState::Busy => Status::Processing,
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Workers spawned over the session's lifetime.
    pub fn workers_spawned(&self) -> u64 {
        self.runner.spawned()
    }

    pub fn chat(&self) -> &ChatTranscript {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatTranscript {
        &mut self.chat
    }

    pub fn logs(&self) -> &LogTranscript {
        &self.logs
    }

    pub fn logs_mut(&mut self) -> &mut LogTranscript {
        &mut self.logs
    }

    /// Show a system-tagged line (welcome text, notices).
    pub fn announce(&mut self, text: impl Into<String>) {
        self.chat.append(ChatEntry::new(ChatRole::System, text));
    }

    /// Handle one line of user input.
    pub fn submit(&mut self, input: &str) -> SubmitOutcome {
        let Some(submission) = Submission::new(input) else {
            return SubmitOutcome::Empty;
        };
        if self.state == SessionState::Busy {
            log::debug!("session: ignoring input while a request is in flight");
            return SubmitOutcome::Busy;
        }

        self.chat
            .append(ChatEntry::new(ChatRole::User, submission.text()));

        if submission.text().eq_ignore_ascii_case(EXIT_COMMAND) {
            self.announce(GOODBYE);
            self.exit_requested = true;
            log::info!("session: exit requested");
            return SubmitOutcome::Exit;
        }

        self.state = SessionState::Busy;
        log::info!("session: submitting prompt ({} chars)", submission.text().len());
        self.pending = Some(self.runner.submit(self.agent.clone(), submission));
        SubmitOutcome::Started
    }

    /// Drain queued log lines and the pending terminal event, if any. Call once per frame.
    /// Returns true when a request finished during this call.
    pub fn poll(&mut self) -> bool {
        self.pump_logs();
        let event = self.pending.as_mut().and_then(PendingTask::poll);
        match event {
            Some(event) => {
                self.finish(event);
                true
            }
            None => false,
        }
    }

    /// Block until the in-flight request finishes or `timeout` elapses, for hosts without a
    /// frame loop. Returns true when a request finished; false if idle or timed out.
    pub fn wait(&mut self, timeout: Option<Duration>) -> bool {
        let event = self.pending.as_mut().and_then(|task| task.wait(timeout));
        self.pump_logs();
        match event {
            Some(event) => {
                self.finish(event);
                true
            }
            None => false,
        }
    }

    fn pump_logs(&mut self) {
        if let Some(ref feed) = self.log_feed {
            let logs = &mut self.logs;
            feed.drain(|event| logs.append(event));
        }
    }

    fn finish(&mut self, event: TerminalEvent) {
        self.pending = None;
        match event {
            TerminalEvent::Success { text } => {
                self.chat.append(ChatEntry::new(ChatRole::Agent, text));
            }
            TerminalEvent::Failure { message } => {
                self.chat.append(ChatEntry::new(ChatRole::Error, message));
            }
        }
        self.state = SessionState::Idle;
        log::debug!("session: ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use crate::dispatch;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Agent for Echo {
        async fn run(&self, prompt: &str) -> Result<String, AgentError> {
            Ok(format!("echo: {}", prompt))
        }
    }

    fn controller() -> SessionController {
        SessionController::new(Arc::new(Echo), TaskRunner::new(dispatch::no_wakeup()))
    }

    #[test]
    fn starts_idle_and_ready() {
        let s = controller();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.status().label(), "ready");
        assert!(s.input_enabled());
        assert!(s.chat().is_empty());
    }

    #[test]
    fn blank_input_is_inert() {
        let mut s = controller();
        for input in ["", "   ", "\n\t"] {
            assert_eq!(s.submit(input), SubmitOutcome::Empty);
        }
        assert!(s.chat().is_empty());
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.workers_spawned(), 0);
    }

    #[test]
    fn exit_is_case_insensitive_and_skips_runner() {
        for input in ["exit", "  EXIT ", "Exit"] {
            let mut s = controller();
            assert_eq!(s.submit(input), SubmitOutcome::Exit);
            assert!(s.exit_requested());
            assert_eq!(s.state(), SessionState::Idle);
            assert_eq!(s.workers_spawned(), 0);
            assert_eq!(s.chat().last().unwrap().text, "Goodbye!");
        }
    }

    #[test]
    fn exit_must_match_exactly() {
        let mut s = controller();
        assert_eq!(s.submit("exit now"), SubmitOutcome::Started);
        assert!(!s.exit_requested());
        assert!(s.wait(Some(Duration::from_secs(5))));
    }

    #[test]
    fn round_trip_returns_to_idle() {
        let mut s = controller();
        assert_eq!(s.submit("  ping "), SubmitOutcome::Started);
        assert_eq!(s.status(), Status::Processing);
        assert!(!s.input_enabled());

        assert!(s.wait(Some(Duration::from_secs(5))));
        assert_eq!(s.state(), SessionState::Idle);
        let entries: Vec<_> = s.chat().entries().cloned().collect();
        assert_eq!(
            entries,
            vec![
                ChatEntry::new(ChatRole::User, "ping"),
                ChatEntry::new(ChatRole::Agent, "echo: ping"),
            ]
        );
        assert!(!s.poll());
        assert!(!s.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn log_feed_is_routed_on_poll() {
        let (outbox, feed) = dispatch::channel(dispatch::no_wakeup());
        let mut s = controller().with_log_feed(feed, 2);
        for line in ["one", "two", "three"] {
            outbox.post(crate::relay::LogEvent::new(line));
        }
        assert!(!s.poll());
        let lines: Vec<_> = s.logs().entries().map(|e| e.line().to_string()).collect();
        assert_eq!(lines, vec!["two", "three"]);
        assert!(s.logs_mut().take_scroll_request());
    }
}
