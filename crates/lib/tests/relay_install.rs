//! Integration test: install the relay as the process-wide logger (its own test binary, so the
//! global install does not leak into other tests) and check lines from several threads arrive
//! in per-thread order on the draining thread.

use perch_core::dispatch;
use perch_core::relay::{self, LogRelay, RelayError};
use perch_core::session::SessionController;
use perch_core::runner::TaskRunner;
use std::collections::HashMap;
use std::sync::Arc;

struct Silent;

#[async_trait::async_trait]
impl perch_core::agent::Agent for Silent {
    async fn run(&self, prompt: &str) -> Result<String, perch_core::agent::AgentError> {
        Ok(prompt.to_string())
    }
}

#[test]
fn installed_relay_feeds_the_log_transcript() {
    let (relay, feed) = LogRelay::new(dispatch::no_wakeup());
    relay::install(relay).expect("first install succeeds");

    let (second, _feed) = LogRelay::new(dispatch::no_wakeup());
    assert!(matches!(
        relay::install(second),
        Err(RelayError::AlreadyInstalled(_))
    ));

    let handles: Vec<_> = (0..3)
        .map(|p| {
            std::thread::spawn(move || {
                for i in 0..100 {
                    log::trace!(target: "producer", "p{} #{}", p, i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut session =
        SessionController::new(Arc::new(Silent), TaskRunner::new(dispatch::no_wakeup()))
            .with_log_feed(feed, 0);
    session.poll();

    let mut per_producer: HashMap<String, Vec<usize>> = HashMap::new();
    for event in session.logs().entries() {
        if !event.line().contains("| producer - ") {
            continue;
        }
        let tail = event.line().rsplit(" - ").next().unwrap();
        let (p, i) = tail.split_once(" #").unwrap();
        per_producer
            .entry(p.to_string())
            .or_default()
            .push(i.parse().unwrap());
    }
    assert_eq!(per_producer.len(), 3);
    for (producer, seq) in per_producer {
        assert_eq!(seq, (0..100).collect::<Vec<_>>(), "{}", producer);
    }
}
