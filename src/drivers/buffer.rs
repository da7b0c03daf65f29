use std::collections::VecDeque;
use crate::drivers::MonitorError;
use crate::types::Sample;
/// Rolling chart window: a bounded FIFO of samples that evicts the oldest on overflow.
#[derive(Clone, Debug)]
pub struct SessionBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}
impl SessionBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, MonitorError> {
        if capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "buffer capacity must be greater than zero".into(),
            ));
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }
    /// Capacity covering `window_ms` of data polled every `interval_ms`.
    pub fn for_window(window_ms: u64, interval_ms: u64) -> Result<Self, MonitorError> {
        if interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        Self::with_capacity(((window_ms / interval_ms) as usize).max(2))
    }
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// Appends `sample`, evicting from the front past capacity.
    ///
    /// A sample older than the newest one held is rejected and `false` is returned.
    pub fn append(&mut self, sample: Sample) -> bool {
        if let Some(last) = self.samples.back() {
            if sample.time_ms < last.time_ms {
                return false;
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        true
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
    #[cfg(test)]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }
    /// Newest `count` samples, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Sample> {
        self.samples.iter().rev().take(count)
    }
    /// Contiguous copy, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stats::Quality;
    fn at(time_ms: u64) -> Sample {
        Sample {
            time_ms,
            epoch_ms: time_ms as i64,
            raw: time_ms as f64,
            filtered: time_ms as f64,
            frequency_hz: None,
            quality: Quality::Low,
        }
    }
    #[test]
    fn never_exceeds_capacity_and_evicts_fifo() {
        let mut buffer = SessionBuffer::with_capacity(3).unwrap();
        for t in 0..10 {
            assert!(buffer.append(at(t)));
            assert!(buffer.len() <= 3);
        }
        let times: Vec<u64> = buffer.iter().map(|s| s.time_ms).collect();
        assert_eq!(times, vec![7, 8, 9]);
        assert_eq!(buffer.latest().map(|s| s.time_ms), Some(9));
    }
    #[test]
    fn rejects_out_of_order_timestamps() {
        let mut buffer = SessionBuffer::with_capacity(4).unwrap();
        assert!(buffer.append(at(100)));
        assert!(!buffer.append(at(50)));
        assert!(buffer.append(at(100)));
        assert_eq!(buffer.len(), 2);
    }
    #[test]
    fn window_capacity_follows_poll_rate() {
        assert_eq!(SessionBuffer::for_window(3000, 10).unwrap().capacity(), 300);
        assert_eq!(SessionBuffer::for_window(3000, 1000).unwrap().capacity(), 3);
        assert_eq!(SessionBuffer::for_window(100, 1000).unwrap().capacity(), 2);
        assert!(SessionBuffer::for_window(3000, 0).is_err());
        assert!(SessionBuffer::with_capacity(0).is_err());
    }
    #[test]
    fn recent_is_newest_first() {
        let mut buffer = SessionBuffer::with_capacity(10).unwrap();
        for t in [1, 2, 3, 4] {
            buffer.append(at(t));
        }
        let recent: Vec<u64> = buffer.recent(2).map(|s| s.time_ms).collect();
        assert_eq!(recent, vec![4, 3]);
        let snapshot = buffer.snapshot();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(snapshot.len(), 4);
    }
}
