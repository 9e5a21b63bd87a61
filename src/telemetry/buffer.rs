//! Bounded FIFO of undelivered records

use super::TelemetryRecord;
use std::collections::VecDeque;

/// Holds records that could not be delivered, oldest first
///
/// When full, pushing a new record evicts the oldest one so the most recent
/// readings survive a long outage.
#[derive(Debug, Clone)]
pub struct ReadingBuffer {
    records: VecDeque<TelemetryRecord>,
    capacity: usize,
}

impl ReadingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, returning the record evicted to make room (if any)
    pub fn push(&mut self, record: TelemetryRecord) -> Option<TelemetryRecord> {
        if self.capacity == 0 {
            return Some(record);
        }

        let evicted = if self.records.len() >= self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    /// Oldest buffered record without removing it
    pub fn front(&self) -> Option<&TelemetryRecord> {
        self.records.front()
    }

    /// Remove and return the oldest buffered record
    pub fn pop_front(&mut self) -> Option<TelemetryRecord> {
        self.records.pop_front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.records.iter()
    }
}
