//! Per-client token bucket.
//!
//! # Responsibilities
//! - Hold a capped count of permits for a single client
//! - Refill one permit per period from a task owned by the bucket
//! - Stop that task when the bucket is cleared or dropped
//!
//! # Design Decisions
//! - Consumption and refill are serialized through one mutex per bucket
//! - Cancellation is a one-shot signal; dropping the bucket fires it too
//! - The first refill happens one full period after construction

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Length of one refill unit. Refill rates are expressed in these.
pub const REFILL_UNIT: Duration = Duration::from_secs(60);

/// Admission state for one client.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    /// Minutes between refill increments.
    refill_rate: u32,
    tokens: Arc<Mutex<u32>>,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    task: JoinHandle<()>,
}

impl TokenBucket {
    /// Create a full bucket and spawn its refill task.
    ///
    /// Must be called from within a Tokio runtime. A refill rate of zero
    /// is treated as one minute.
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self::spawn(capacity, refill_rate, None)
    }

    /// Like [`TokenBucket::new`], but counts the refill task in `tracker`
    /// for as long as it runs.
    pub(crate) fn tracked(capacity: u32, refill_rate: u32, tracker: Arc<AtomicUsize>) -> Self {
        Self::spawn(capacity, refill_rate, Some(tracker))
    }

    fn spawn(capacity: u32, refill_rate: u32, tracker: Option<Arc<AtomicUsize>>) -> Self {
        let tokens = Arc::new(Mutex::new(capacity));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let period = REFILL_UNIT * refill_rate.max(1);
        let guard = tracker.map(RefillGuard::new);

        let task = tokio::spawn(refill(tokens.clone(), capacity, period, cancel_rx, guard));

        Self {
            capacity,
            refill_rate,
            tokens,
            cancel: Mutex::new(Some(cancel_tx)),
            task,
        }
    }

    /// Take one token if any are left.
    pub fn allow(&self) -> bool {
        let mut tokens = self.tokens.lock().expect("token bucket mutex poisoned");
        if *tokens > 0 {
            *tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Signal the refill task to stop. Later calls do nothing.
    pub fn clear(&self) {
        let sender = self.cancel.lock().expect("token bucket mutex poisoned").take();
        if let Some(tx) = sender {
            let _ = tx.send(());
        }
    }

    /// Current token count.
    pub fn tokens(&self) -> u32 {
        *self.tokens.lock().expect("token bucket mutex poisoned")
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> u32 {
        self.refill_rate
    }

    /// Whether the refill task is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Keeps a shared count of live refill tasks accurate, including tasks
/// dropped before their first poll.
#[derive(Debug)]
struct RefillGuard(Arc<AtomicUsize>);

impl RefillGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RefillGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn refill(
    tokens: Arc<Mutex<u32>>,
    capacity: u32,
    period: Duration,
    mut cancel: oneshot::Receiver<()>,
    _guard: Option<RefillGuard>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Fires on clear() and when the bucket is dropped.
            _ = &mut cancel => break,
            _ = ticker.tick() => {
                let mut tokens = tokens.lock().expect("token bucket mutex poisoned");
                *tokens = tokens.saturating_add(1).min(capacity);
            }
        }
    }
}
