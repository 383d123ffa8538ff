//! Client-side selective get / reply matching (spec.md §4.2.1).
//!
//! `ReplyMatcher` is broker-agnostic: it operates over anything implementing
//! [`TransactionalFetch`], so the algorithm is unit-testable without a live
//! AMQP broker (P7, SPEC_FULL.md §14). The full client submission SDK that
//! would drive this against a real `service-client` queue is out of scope
//! (spec.md §1); only the matching algorithm and its trait boundary live
//! here.

use std::time::Duration;

use async_trait::async_trait;
use scheduler_shared::error::BrokerError;

/// One step of a transactional fetch window: pull the next available
/// message (if any), then either ack it (removing it) or nack-requeue it
/// (leaving it visible for other waiters).
#[async_trait]
pub trait TransactionalFetch: Send + Sync {
    async fn fetch_one(&self) -> Option<(String, serde_json::Value)>;
    async fn ack(&self, message_id: &str);
    async fn nack_requeue(&self, message_id: &str);
}

/// Implements spec.md §4.2.1's contract: (a) at most one message acked per
/// call, (b) unrelated messages are preserved, (c) no starvation given a
/// finite set of in-flight ids.
pub struct ReplyMatcher<'a, T: TransactionalFetch> {
    fetch: &'a T,
}

impl<'a, T: TransactionalFetch> ReplyMatcher<'a, T> {
    pub fn new(fetch: &'a T) -> Self {
        Self { fetch }
    }

    /// Polls until a message with `expected_id` is acked, or until
    /// `max_attempts` windows have been drained with no match
    /// (SPEC_FULL.md §9 decision 4: the poll loop is explicitly bounded
    /// rather than polling forever).
    pub async fn await_reply(
        &self,
        expected_id: &str,
        max_attempts: Option<u32>,
        poll_interval: Duration,
    ) -> Result<serde_json::Value, BrokerError> {
        let mut attempts: u32 = 0;
        loop {
            if let Some(payload) = self.drain_window(expected_id).await {
                return Ok(payload);
            }

            attempts += 1;
            if let Some(max) = max_attempts {
                if attempts >= max {
                    return Err(BrokerError::ReplyTimeout(expected_id.to_string()));
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Drains the current fetch window one message at a time, acking the
    /// match and nacking-requeue everything else. Returns `None` once the
    /// window is exhausted without a match, at which point it is committed.
    async fn drain_window(&self, expected_id: &str) -> Option<serde_json::Value> {
        loop {
            match self.fetch.fetch_one().await {
                None => return None,
                Some((id, payload)) => {
                    if id == expected_id {
                        self.fetch.ack(&id).await;
                        return Some(payload);
                    }
                    self.fetch.nack_requeue(&id).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// A single-pass-per-window in-memory double: `fetch_one` hands out
    /// each message once; a nack re-appends it so the *next* window sees it
    /// again, mirroring a real broker's requeue semantics.
    struct InMemoryQueue {
        inflight: Mutex<VecDeque<(String, serde_json::Value)>>,
        pending_requeue: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl InMemoryQueue {
        fn new(messages: Vec<(&str, serde_json::Value)>) -> Self {
            Self {
                inflight: Mutex::new(
                    messages
                        .into_iter()
                        .map(|(id, v)| (id.to_string(), v))
                        .collect(),
                ),
                pending_requeue: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TransactionalFetch for InMemoryQueue {
        async fn fetch_one(&self) -> Option<(String, serde_json::Value)> {
            let mut inflight = self.inflight.lock().await;
            if inflight.is_empty() {
                let mut requeued = self.pending_requeue.lock().await;
                inflight.extend(requeued.drain(..));
            }
            inflight.pop_front()
        }

        async fn ack(&self, _message_id: &str) {}

        async fn nack_requeue(&self, message_id: &str) {
            let value = {
                let inflight = self.inflight.lock().await;
                inflight
                    .iter()
                    .find(|(id, _)| id == message_id)
                    .map(|(_, v)| v.clone())
            };
            if let Some(value) = value {
                self.pending_requeue
                    .lock()
                    .await
                    .push((message_id.to_string(), value));
            }
        }
    }

    #[tokio::test]
    async fn awaits_b_acking_only_b_and_preserving_a_and_c() {
        let queue = InMemoryQueue::new(vec![
            ("A", serde_json::json!({"which": "A"})),
            ("B", serde_json::json!({"which": "B"})),
            ("C", serde_json::json!({"which": "C"})),
        ]);
        let matcher = ReplyMatcher::new(&queue);

        let result = matcher
            .await_reply("B", Some(1), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"which": "B"}));

        let remaining = queue.pending_requeue.lock().await;
        let ids: Vec<_> = remaining.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn no_match_within_budget_returns_reply_timeout() {
        let queue = InMemoryQueue::new(vec![("A", serde_json::json!({"which": "A"}))]);
        let matcher = ReplyMatcher::new(&queue);

        let err = matcher
            .await_reply("Z", Some(2), Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::ReplyTimeout(id) if id == "Z"));
    }

    #[tokio::test]
    async fn waiter_for_a_after_b_is_served_still_finds_it() {
        let queue = InMemoryQueue::new(vec![
            ("A", serde_json::json!({"which": "A"})),
            ("B", serde_json::json!({"which": "B"})),
        ]);
        let matcher = ReplyMatcher::new(&queue);

        matcher
            .await_reply("B", Some(1), Duration::from_millis(1))
            .await
            .unwrap();
        let result = matcher
            .await_reply("A", Some(2), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"which": "A"}));
    }
}
