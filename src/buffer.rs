use crate::record::LogRecord;
use std::collections::VecDeque;

/// Ordered queue of records waiting to be delivered.
///
/// Insertion order is capture order. The buffer has no hard capacity: the
/// batch size only decides when [`push`](LogBuffer::push) asks for a flush.
#[derive(Debug)]
pub struct LogBuffer {
    records: VecDeque<LogRecord>,
    batch_size: usize,
}

impl LogBuffer {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            records: VecDeque::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Append a record at the tail.
    ///
    /// Returns `true` when the buffer has reached the batch size and should
    /// be flushed now.
    pub fn push(&mut self, record: LogRecord) -> bool {
        self.records.push_back(record);
        self.records.len() >= self.batch_size
    }

    /// Take the whole content as one batch, leaving the buffer empty.
    pub fn detach(&mut self) -> Vec<LogRecord> {
        self.records.drain(..).collect()
    }

    /// Put a failed batch back in front of anything captured since it was
    /// detached, keeping its original order.
    pub fn requeue_front(&mut self, batch: Vec<LogRecord>) {
        for record in batch.into_iter().rev() {
            self.records.push_front(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogLevel, LogValue};

    fn rec(msg: &str) -> LogRecord {
        LogRecord::capture(LogLevel::Info, vec![LogValue::from(msg)], None)
    }

    fn messages(records: &[LogRecord]) -> Vec<String> {
        records.iter().map(|r| r.message.clone()).collect()
    }

    #[test]
    fn push_signals_threshold_only_when_reached() {
        let mut buffer = LogBuffer::new(3);
        assert!(!buffer.push(rec("a")));
        assert!(!buffer.push(rec("b")));
        assert!(buffer.push(rec("c")));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn detach_empties_and_preserves_order() {
        let mut buffer = LogBuffer::new(10);
        for m in ["1", "2", "3"] {
            buffer.push(rec(m));
        }
        let batch = buffer.detach();
        assert!(buffer.is_empty());
        assert_eq!(messages(&batch), vec!["1", "2", "3"]);
    }

    #[test]
    fn requeue_puts_batch_ahead_of_newer_records() {
        let mut buffer = LogBuffer::new(10);
        buffer.push(rec("a"));
        buffer.push(rec("b"));
        let batch = buffer.detach();
        buffer.push(rec("c"));
        buffer.requeue_front(batch);
        assert_eq!(messages(&buffer.snapshot()), vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let mut buffer = LogBuffer::new(0);
        assert_eq!(buffer.batch_size(), 1);
        assert!(buffer.push(rec("x")));
    }
}
