//! Display surface models: append-only transcripts with a scroll-to-newest signal.
//!
//! The renderer (egui in the desktop, stdout in the CLI) reads entries and consumes the
//! scroll request; no logic lives here beyond appending and optional retention.

use std::collections::VecDeque;
use std::fmt;

use crate::relay::LogEvent;

/// Who authored a chat entry. Affects presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Agent,
    System,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
}

impl ChatEntry {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

impl fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            ChatRole::User => write!(f, "You: {}", self.text),
            ChatRole::Agent => write!(f, "AI: {}", self.text),
            ChatRole::System => f.write_str(&self.text),
            ChatRole::Error => write!(f, "Error: {}", self.text),
        }
    }
}

/// Ordered list of entries. With a cap, the oldest entries are dropped first.
#[derive(Debug, Clone)]
pub struct Transcript<E> {
    entries: VecDeque<E>,
    cap: Option<usize>,
    scroll_pending: bool,
}

impl<E> Default for Transcript<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Transcript<E> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            cap: None,
            scroll_pending: false,
        }
    }

    /// `0` means unbounded.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap: (cap > 0).then_some(cap),
            ..Self::new()
        }
    }

    pub fn append(&mut self, entry: E) {
        self.entries.push_back(entry);
        if let Some(cap) = self.cap {
            while self.entries.len() > cap {
                self.entries.pop_front();
            }
        }
        self.scroll_pending = true;
    }

    pub fn entries(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&E> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once after each batch of appends; the renderer scrolls to the newest entry.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }
}

pub type ChatTranscript = Transcript<ChatEntry>;
pub type LogTranscript = Transcript<LogEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_requests_scroll_once() {
        let mut chat = ChatTranscript::new();
        assert!(!chat.take_scroll_request());
        chat.append(ChatEntry::new(ChatRole::User, "hello"));
        chat.append(ChatEntry::new(ChatRole::Agent, "hi"));
        assert!(chat.take_scroll_request());
        assert!(!chat.take_scroll_request());
        assert_eq!(chat.len(), 2);
    }

    #[test]
    fn cap_drops_oldest() {
        let mut logs = LogTranscript::with_cap(2);
        for line in ["a", "b", "c"] {
            logs.append(LogEvent::new(line));
        }
        let lines: Vec<_> = logs.entries().map(|e| e.line().to_string()).collect();
        assert_eq!(lines, vec!["b", "c"]);
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let mut logs = LogTranscript::with_cap(0);
        for i in 0..50 {
            logs.append(LogEvent::new(i.to_string()));
        }
        assert_eq!(logs.len(), 50);
    }

    #[test]
    fn entries_render_with_role_prefix() {
        assert_eq!(ChatEntry::new(ChatRole::User, "q").to_string(), "You: q");
        assert_eq!(ChatEntry::new(ChatRole::Agent, "a").to_string(), "AI: a");
        assert_eq!(ChatEntry::new(ChatRole::Error, "timeout").to_string(), "Error: timeout");
        assert_eq!(ChatEntry::new(ChatRole::System, "Goodbye!").to_string(), "Goodbye!");
    }
}
