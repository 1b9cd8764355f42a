use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Observer of upload lifecycle events. All methods have no-op defaults;
/// implement what you need. Delivery is best-effort and carries no ordering
/// guarantee across parts.
pub trait UploadSubscriber: Send + Sync {
    fn on_progress(&self, _event: ProgressEvent) {}
    fn on_retry(&self, _event: RetryEvent) {}
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent {
    pub total_bytes: u64,
    pub uploaded_bytes: u64,
}

impl ProgressEvent {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        self.uploaded_bytes as f64 * 100.0 / self.total_bytes as f64
    }
}

#[derive(Debug, Clone)]
pub struct RetryEvent {
    /// Part number the failed request belonged to.
    pub part: u32,
    /// 1-based attempt counter for that chunk.
    pub attempt: u32,
    pub delay: Duration,
    pub reason: String,
}

/// Aggregates byte counts across part workers and fans progress out to
/// subscribers, throttled to at most one event per interval. The final
/// event (all bytes accounted for) is always delivered.
pub(crate) struct ProgressTracker {
    total: u64,
    loaded: AtomicU64,
    interval: Duration,
    last_emit: Mutex<Option<Instant>>,
    subscribers: Vec<Arc<dyn UploadSubscriber>>,
}

impl ProgressTracker {
    pub(crate) fn new(
        total: u64,
        interval: Duration,
        subscribers: Vec<Arc<dyn UploadSubscriber>>,
    ) -> Self {
        Self {
            total,
            loaded: AtomicU64::new(0),
            interval,
            last_emit: Mutex::new(None),
            subscribers,
        }
    }

    pub(crate) fn add(&self, bytes: u64) {
        let loaded = self.loaded.fetch_add(bytes, Ordering::AcqRel) + bytes;
        let done = loaded >= self.total;
        {
            let mut last = self.last_emit.lock().unwrap();
            let due = match *last {
                None => true,
                Some(at) => at.elapsed() >= self.interval,
            };
            if !done && !due {
                return;
            }
            *last = Some(Instant::now());
        }
        self.emit(loaded);
    }

    pub(crate) fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn retry(&self, event: RetryEvent) {
        for subscriber in &self.subscribers {
            subscriber.on_retry(event.clone());
        }
    }

    fn emit(&self, loaded: u64) {
        let event = ProgressEvent {
            total_bytes: self.total,
            uploaded_bytes: loaded.min(self.total),
        };
        for subscriber in &self.subscribers {
            subscriber.on_progress(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<ProgressEvent>>,
        retries: Mutex<Vec<RetryEvent>>,
    }

    impl UploadSubscriber for Recorder {
        fn on_progress(&self, event: ProgressEvent) {
            self.progress.lock().unwrap().push(event);
        }

        fn on_retry(&self, event: RetryEvent) {
            self.retries.lock().unwrap().push(event);
        }
    }

    #[test]
    fn percent_of_empty_upload_is_complete() {
        let event = ProgressEvent {
            total_bytes: 0,
            uploaded_bytes: 0,
        };
        assert_eq!(event.percent(), 100.0);
    }

    #[test]
    fn tracker_reports_final_progress() {
        let recorder = Arc::new(Recorder::default());
        let tracker = ProgressTracker::new(
            100,
            Duration::from_secs(3600),
            vec![recorder.clone()],
        );

        tracker.add(40);
        tracker.add(60);

        let events = recorder.progress.lock().unwrap();
        let last = events.last().expect("no progress delivered");
        assert_eq!(last.uploaded_bytes, 100);
        assert_eq!(last.total_bytes, 100);
    }

    #[test]
    fn tracker_throttles_intermediate_events() {
        let recorder = Arc::new(Recorder::default());
        let tracker = ProgressTracker::new(
            1000,
            Duration::from_secs(3600),
            vec![recorder.clone()],
        );

        // The first add emits, the following intermediate ones are
        // swallowed, the final one always lands.
        for _ in 0..10 {
            tracker.add(100);
        }

        let events = recorder.progress.lock().unwrap();
        assert!(events.len() < 10);
        assert_eq!(events.last().unwrap().uploaded_bytes, 1000);
    }

    #[test]
    fn retry_events_fan_out() {
        let recorder = Arc::new(Recorder::default());
        let tracker =
            ProgressTracker::new(10, Duration::ZERO, vec![recorder.clone()]);
        tracker.retry(RetryEvent {
            part: 2,
            attempt: 1,
            delay: Duration::from_millis(250),
            reason: "connection reset".to_owned(),
        });
        let retries = recorder.retries.lock().unwrap();
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].part, 2);
    }
}
