use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Default progress notification interval.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Lifecycle of one transfer job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Planned,
    DirectInFlight,
    ChunkedInFlight,
    Succeeded,
    Aborted,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted)
    }
}

/// Point-in-time copy of a job's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub state: JobState,
    /// Acknowledged chunks; a direct upload counts as one chunk.
    pub completed: u64,
    pub total: u64,
    /// Bytes of acknowledged chunks.
    pub bytes_done: u64,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            state: JobState::Planned,
            completed: 0,
            total: 0,
            bytes_done: 0,
        }
    }
}

/// Shared view of a job's progress.
///
/// Clones observe the same job. Only the uploader advances it; the counter
/// never decreases during a job and never exceeds `total`, and every update
/// happens under one lock so readers never see a half-applied change.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<RwLock<ProgressSnapshot>>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.inner.read().unwrap()
    }

    pub fn completed(&self) -> u64 {
        self.snapshot().completed
    }

    pub fn total(&self) -> u64 {
        self.snapshot().total
    }

    pub fn state(&self) -> JobState {
        self.snapshot().state
    }

    pub(crate) fn begin_direct(&self) {
        *self.inner.write().unwrap() = ProgressSnapshot {
            state: JobState::DirectInFlight,
            total: 1,
            ..Default::default()
        };
    }

    pub(crate) fn begin_chunked(&self, total: u64) {
        *self.inner.write().unwrap() = ProgressSnapshot {
            state: JobState::ChunkedInFlight,
            total,
            ..Default::default()
        };
    }

    /// Counts one acknowledged chunk of `bytes` and returns the new count.
    pub(crate) fn record_chunk(&self, bytes: u64) -> u64 {
        let mut s = self.inner.write().unwrap();
        if s.completed < s.total {
            s.completed += 1;
            s.bytes_done += bytes;
        }
        s.completed
    }

    pub(crate) fn finish(&self, success: bool) {
        let mut s = self.inner.write().unwrap();
        s.state = if success {
            JobState::Succeeded
        } else {
            JobState::Aborted
        };
    }
}

// ---------------------------------------------------------------------------
// ProgressReporter
// ---------------------------------------------------------------------------

/// What a reporter callback receives on every tick.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub snapshot: ProgressSnapshot,
    pub bytes_per_second: f64,
}

/// Callback invoked with progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Polls a [`ProgressHandle`] on a tokio interval and forwards updates.
///
/// The task ends when the job reaches a terminal state, on
/// [`stop`](Self::stop), or when the reporter is dropped.
pub struct ProgressReporter {
    stop: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl ProgressReporter {
    /// Spawns the polling task. `interval` defaults to 500 ms.
    pub fn start(
        handle: ProgressHandle,
        interval: Option<Duration>,
        callback: ProgressCallback,
    ) -> Self {
        let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();
        let speed = SpeedCalculator::new(None, None);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.unwrap_or(DEFAULT_INTERVAL));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = handle.snapshot();
                        speed.add_sample(snapshot.bytes_done);
                        callback(ProgressUpdate {
                            snapshot,
                            bytes_per_second: speed.bytes_per_second(),
                        });
                        if snapshot.state.is_terminal() {
                            break;
                        }
                    }
                    _ = &mut rx => break,
                }
            }
        });

        Self {
            stop: Mutex::new(Some(tx)),
        }
    }

    /// Stops the polling task.
    pub fn stop(&self) {
        let mut stop = self.stop.lock().unwrap();
        // Dropping the sender signals the task to exit.
        drop(stop.take());
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    /// Cumulative bytes at `timestamp`.
    total: u64,
    timestamp: Instant,
}

/// Estimates throughput from cumulative byte totals over a sliding window.
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

struct SpeedInner {
    samples: Vec<SpeedSample>,
    max_samples: usize,
    window_size: Duration,
}

impl SpeedCalculator {
    /// - `window_size`: time window for the estimate (default 5 s).
    /// - `max_samples`: retained samples (default 100).
    pub fn new(window_size: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: Vec::new(),
                max_samples: max_samples.unwrap_or(100),
                window_size: window_size.unwrap_or(Duration::from_secs(5)),
            }),
        }
    }

    /// Records the cumulative byte count observed now.
    pub fn add_sample(&self, total: u64) {
        self.add_sample_at(total, Instant::now());
    }

    fn add_sample_at(&self, total: u64, now: Instant) {
        let mut s = self.inner.lock().unwrap();
        s.samples.push(SpeedSample {
            total,
            timestamp: now,
        });

        let window = s.window_size;
        s.samples
            .retain(|sample| now.duration_since(sample.timestamp) <= window);

        if s.samples.len() > s.max_samples {
            let excess = s.samples.len() - s.max_samples;
            s.samples.drain(..excess);
        }
    }

    /// Average bytes/second across the window; 0.0 with fewer than two
    /// samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.inner.lock().unwrap();
        let (Some(first), Some(last)) = (s.samples.first(), s.samples.last()) else {
            return 0.0;
        };
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }
        last.total.saturating_sub(first.total) as f64 / elapsed.as_secs_f64()
    }

    /// Time left for `remaining_bytes` at the current rate.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }
}
