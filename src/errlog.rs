//! Bounded diagnostic error log shared by all requests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use serde_json::Value as Json;

/// Entries kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 100;

/// One reported error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// Local time the entry was recorded.
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    /// Client-supplied line number, echoed back as given.
    pub line_no: Option<Json>,
}

/// Mutex-guarded ring buffer of the most recent errors.
#[derive(Debug)]
pub struct ErrorLog {
    entries: Mutex<VecDeque<ErrorEntry>>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ErrorEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry stamped with the current local time, evicting the
    /// oldest entries beyond capacity.
    pub fn record(
        &self,
        kind: impl Into<String>,
        message: impl Into<String>,
        line_no: Option<Json>,
    ) -> ErrorEntry {
        let entry = ErrorEntry {
            timestamp: Local::now().naive_local(),
            kind: kind.into(),
            message: message.into(),
            line_no,
        };
        let mut entries = self.lock();
        entries.push_back(entry.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        entry
    }

    /// Current entries, oldest first.
    pub fn entries(&self) -> Vec<ErrorEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_evicts_oldest() {
        let log = ErrorLog::default();
        for i in 0..150 {
            log.record("client", format!("error {i}"), None);
        }
        let entries = log.entries();
        assert_eq!(entries.len(), DEFAULT_CAPACITY);
        assert_eq!(entries[0].message, "error 50");
        assert_eq!(entries[99].message, "error 149");
    }

    #[test]
    fn test_entry_serialization() {
        let log = ErrorLog::new(4);
        let entry = log.record("evaluation", "boom", Some(Json::from(3)));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "evaluation");
        assert_eq!(json["lineNo"], 3);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_concurrent_writers() {
        let log = Arc::new(ErrorLog::new(10));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.record("client", format!("{t}-{i}"), None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 10);
    }
}
