//! Mock confirmation ports and audit sinks.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tollgate_approval::{
    ActionDescriptor, AuditRecord, AuditSink, ConfirmationError, ConfirmationPort,
};

/// One scripted reply from a [`ScriptedPort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer yes.
    Approve,
    /// Answer no.
    Reject,
    /// Answer after sleeping (tokio time, so paused clocks apply).
    After(Duration, bool),
    /// Return [`ConfirmationError::Internal`] with this message.
    Fail(String),
    /// Never answer.
    Hang,
    /// Panic inside `confirm`.
    Panic,
}

/// Confirmation port that replays a queue of replies.
///
/// Uses `std::sync::Mutex` so builder methods work without a runtime. Once
/// the queue is empty every further request gets the fallback reply
/// ([`Reply::Reject`] unless changed).
#[derive(Debug, Clone)]
pub struct ScriptedPort {
    name: String,
    replies: Arc<Mutex<VecDeque<Reply>>>,
    fallback: Reply,
    seen: Arc<Mutex<Vec<String>>>,
    available: bool,
}

impl ScriptedPort {
    /// Create a port with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Reply::Reject,
            seen: Arc::new(Mutex::new(Vec::new())),
            available: true,
        }
    }

    /// Set the port name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a reply to the script.
    #[must_use]
    pub fn then(self, reply: Reply) -> Self {
        self.push(reply);
        self
    }

    /// Reply used once the script runs out.
    #[must_use]
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Report the port as unavailable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Append a reply from a shared handle.
    pub fn push(&self, reply: Reply) {
        if let Ok(mut guard) = self.replies.lock() {
            guard.push_back(reply);
        }
    }

    /// Names of the actions this port was asked about, in order.
    #[must_use]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// How many times `confirm` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().map(|g| g.len()).unwrap_or_default()
    }

    fn next_reply(&self) -> Reply {
        self.replies
            .lock()
            .ok()
            .and_then(|mut g| g.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for ScriptedPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfirmationPort for ScriptedPort {
    async fn confirm(&self, action: &ActionDescriptor) -> Result<bool, ConfirmationError> {
        if let Ok(mut guard) = self.seen.lock() {
            guard.push(action.name().to_string());
        }

        match self.next_reply() {
            Reply::Approve => Ok(true),
            Reply::Reject => Ok(false),
            Reply::After(delay, answer) => {
                tokio::time::sleep(delay).await;
                Ok(answer)
            },
            Reply::Fail(message) => Err(ConfirmationError::Internal(message)),
            Reply::Hang => std::future::pending().await,
            Reply::Panic => panic!("scripted panic in confirmation port"),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Port that always gives the same answer and counts requests.
#[derive(Debug, Clone)]
pub struct StaticPort {
    answer: bool,
    calls: Arc<AtomicUsize>,
}

impl StaticPort {
    /// Port that approves everything.
    #[must_use]
    pub fn approving() -> Self {
        Self {
            answer: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Port that rejects everything.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            answer: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `confirm` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationPort for StaticPort {
    async fn confirm(&self, _action: &ActionDescriptor) -> Result<bool, ConfirmationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }

    fn name(&self) -> &str {
        if self.answer { "always-yes" } else { "always-no" }
    }
}

/// Audit sink that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// The most recent record.
    #[must_use]
    pub fn last(&self) -> Option<AuditRecord> {
        self.records.lock().ok().and_then(|g| g.last().cloned())
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|g| g.len()).unwrap_or_default()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: &AuditRecord) {
        if let Ok(mut guard) = self.records.lock() {
            guard.push(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> ActionDescriptor {
        ActionDescriptor::new("delete_file").unwrap()
    }

    #[tokio::test]
    async fn test_scripted_port_replays_in_order() {
        let port = ScriptedPort::new()
            .then(Reply::Approve)
            .then(Reply::Fail("boom".to_string()));

        assert!(port.confirm(&action()).await.unwrap());
        assert!(matches!(
            port.confirm(&action()).await,
            Err(ConfirmationError::Internal(m)) if m == "boom"
        ));
        assert!(!port.confirm(&action()).await.unwrap());
        assert_eq!(port.call_count(), 3);
        assert_eq!(port.seen()[0], "delete_file");
    }

    #[tokio::test]
    async fn test_static_port_counts() {
        let port = StaticPort::rejecting();
        assert!(!port.confirm(&action()).await.unwrap());
        assert_eq!(port.call_count(), 1);
        assert_eq!(port.name(), "always-no");
    }

    #[test]
    fn test_unavailable_flag() {
        assert!(ScriptedPort::new().is_available());
        assert!(!ScriptedPort::new().unavailable().is_available());
    }
}
