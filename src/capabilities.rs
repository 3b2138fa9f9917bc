//! Collaborators the core calls into but never implements itself: id
//! generation, user notifications and export delivery.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::errors::{FlashcardError, Result};

pub trait IdSource: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Predictable ids (`<prefix>-1`, `<prefix>-2`, ...)
#[derive(Debug)]
pub struct SequentialIdSource {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdSource {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIdSource {
    fn new_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Bounded queue of pending notifications, drained by the API
#[derive(Debug)]
pub struct NotificationLog {
    capacity: usize,
    pending: Mutex<VecDeque<String>>,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn drain(&self) -> Vec<String> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, message: &str) {
        tracing::debug!(component = "notifier", "Queued notification: {}", message);
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        if pending.len() == self.capacity {
            pending.pop_front();
        }
        pending.push_back(message.to_string());
    }
}

/// Something handed to the clipboard or file-save collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    ShareLink { deck_name: String, link: String },
    Backup { file_name: String, bytes: Vec<u8> },
}

pub trait ExportSink {
    fn deliver(&self, artifact: ExportArtifact) -> Result<()>;
}

/// Keeps the last delivered artifact in memory
#[derive(Debug, Default)]
pub struct CapturingSink {
    captured: Mutex<Option<ExportArtifact>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Option<ExportArtifact> {
        match self.captured.lock() {
            Ok(mut captured) => captured.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl ExportSink for CapturingSink {
    fn deliver(&self, artifact: ExportArtifact) -> Result<()> {
        let mut captured = self
            .captured
            .lock()
            .map_err(|_| FlashcardError::Storage("export buffer poisoned".to_string()))?;
        *captured = Some(artifact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdSource::new("card");
        assert_eq!(ids.new_id(), "card-1");
        assert_eq!(ids.new_id(), "card-2");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids = UuidIdSource;
        assert_ne!(ids.new_id(), ids.new_id());
    }

    #[test]
    fn test_notification_log_drops_oldest() {
        let log = NotificationLog::new(2);
        log.notify("one");
        log.notify("two");
        log.notify("three");
        assert_eq!(log.drain(), vec!["two".to_string(), "three".to_string()]);
        assert!(log.drain().is_empty());
    }

    #[test]
    fn test_capturing_sink() {
        let sink = CapturingSink::new();
        sink.deliver(ExportArtifact::Backup {
            file_name: "b.json".into(),
            bytes: b"[]".to_vec(),
        })
        .unwrap();
        assert!(matches!(sink.take(), Some(ExportArtifact::Backup { .. })));
        assert!(sink.take().is_none());
    }
}
