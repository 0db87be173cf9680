//! Registry of known display calibrations
//!
//! The registry is the only shared mutable state of the camera core. The
//! discovery layer swaps the whole record list with [`CalibrationRegistry::replace`];
//! everyone else reads it, subscribes to changes, or waits for the first
//! calibration to show up.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::discovery::CalibrationDiscovery;
use super::record::CalibrationRecord;

/// Default poll cadence for [`CalibrationRegistry::wait_for_any`]: six frames at 60 fps
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest poll interval the wait loop will use
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handle returned by [`CalibrationRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// State of the registry right after a replace, handed to subscribers
#[derive(Debug, Clone)]
pub struct CalibrationSnapshot {
    /// Records in discovery order
    pub records: Arc<Vec<CalibrationRecord>>,
    /// Revision the records belong to
    pub revision: u64,
}

impl CalibrationSnapshot {
    /// Number of records
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Serials in discovery order
    pub fn serials(&self) -> Vec<String> {
        self.records.iter().map(|r| r.serial.clone()).collect()
    }
}

/// Change notification callback
pub type ChangeHandler = Arc<dyn Fn(&CalibrationSnapshot) + Send + Sync>;

/// Returned when a wait was abandoned because its owner was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("calibration wait cancelled")]
pub struct WaitCancelled;

struct Subscriber {
    id: SubscriptionId,
    handler: ChangeHandler,
}

struct RegistryState {
    records: Arc<Vec<CalibrationRecord>>,
    revision: u64,
}

/// Marks the current thread as delivering notifications until dropped.
struct DeliveryGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> DeliveryGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock() = Some(std::thread::current().id());
        Self { slot }
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

/// The set of currently known display calibrations.
///
/// Share it behind an `Arc`. Subscribers are called in subscription order,
/// after the swap has completed, with no registry lock held.
pub struct CalibrationRegistry {
    state: RwLock<RegistryState>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscription: AtomicU64,
    /// Serializes replaces coming from different threads
    delivery_gate: Mutex<()>,
    /// Thread currently running change handlers
    delivering_on: Mutex<Option<ThreadId>>,
    /// Replace requested from inside a handler (release builds only)
    deferred: Mutex<Option<Vec<CalibrationRecord>>>,
    discovery: Mutex<Option<Box<dyn CalibrationDiscovery>>>,
    discovery_finished: AtomicBool,
    changed: Notify,
    poll_interval: Duration,
}

impl Default for CalibrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Create an empty registry that polls discovery at `poll_interval` while waiting
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                records: Arc::new(Vec::new()),
                revision: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            delivery_gate: Mutex::new(()),
            delivering_on: Mutex::new(None),
            deferred: Mutex::new(None),
            discovery: Mutex::new(None),
            discovery_finished: AtomicBool::new(false),
            changed: Notify::new(),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Poll interval used by the wait loop
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    // ───────────────────────────────────────────────────────────────────────
    // Reads
    // ───────────────────────────────────────────────────────────────────────

    /// Number of known calibrations
    pub fn count(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether no calibration is known
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Find a calibration by serial
    pub fn find(&self, serial: &str) -> Option<CalibrationRecord> {
        self.state
            .read()
            .records
            .iter()
            .find(|r| r.serial == serial)
            .cloned()
    }

    /// First calibration in discovery order
    pub fn first(&self) -> Option<CalibrationRecord> {
        self.state.read().records.first().cloned()
    }

    /// All records in discovery order
    pub fn records(&self) -> Arc<Vec<CalibrationRecord>> {
        self.state.read().records.clone()
    }

    /// Serials in discovery order
    pub fn serials(&self) -> Vec<String> {
        self.state.read().records.iter().map(|r| r.serial.clone()).collect()
    }

    /// Revision counter, bumped on every effective replace
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Current records together with their revision
    pub fn snapshot(&self) -> CalibrationSnapshot {
        let state = self.state.read();
        CalibrationSnapshot {
            records: state.records.clone(),
            revision: state.revision,
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ───────────────────────────────────────────────────────────────────────

    /// Register a change handler. Handlers run in subscription order.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CalibrationSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a change handler. Returns false if it was not registered.
    ///
    /// A notification already being delivered still reaches the handler.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Mutation
    // ───────────────────────────────────────────────────────────────────────

    /// Swap the known calibrations for `records`.
    ///
    /// Returns whether anything changed. An element-wise equal list is a
    /// no-op and notifies nobody. Duplicate serials keep their first
    /// occurrence.
    ///
    /// Calling this from inside a change handler is a programming error: it
    /// panics in debug builds, and in release builds the new list is applied
    /// once the current delivery has finished (last write wins).
    pub fn replace(&self, records: Vec<CalibrationRecord>) -> bool {
        let reentrant = *self.delivering_on.lock() == Some(std::thread::current().id());
        debug_assert!(
            !reentrant,
            "CalibrationRegistry::replace called from a change handler"
        );
        if reentrant {
            tracing::warn!("CalibrationRegistry: replace during notification deferred");
            *self.deferred.lock() = Some(records);
            return false;
        }

        let _gate = self.delivery_gate.lock();
        let mut changed = self.swap_and_notify(records);
        loop {
            let next = self.deferred.lock().take();
            match next {
                Some(records) => changed |= self.swap_and_notify(records),
                None => break,
            }
        }
        changed
    }

    /// Forget every calibration (teardown)
    pub fn clear(&self) -> bool {
        self.replace(Vec::new())
    }

    fn swap_and_notify(&self, records: Vec<CalibrationRecord>) -> bool {
        let records = dedup_serials(records);

        let snapshot = {
            let mut state = self.state.write();
            if *state.records == records {
                return false;
            }
            state.records = Arc::new(records);
            state.revision += 1;
            CalibrationSnapshot {
                records: state.records.clone(),
                revision: state.revision,
            }
        };

        tracing::info!(
            count = snapshot.count(),
            revision = snapshot.revision,
            "CalibrationRegistry: calibration set replaced"
        );

        self.changed.notify_waiters();

        let handlers: Vec<ChangeHandler> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| s.handler.clone())
            .collect();

        let _delivery = DeliveryGuard::enter(&self.delivering_on);
        for handler in handlers {
            handler(&snapshot);
        }
        true
    }

    // ───────────────────────────────────────────────────────────────────────
    // Discovery
    // ───────────────────────────────────────────────────────────────────────

    /// Attach the discovery source polled by the wait loop
    pub fn attach_discovery(&self, discovery: Box<dyn CalibrationDiscovery>) {
        self.discovery_finished.store(false, Ordering::SeqCst);
        *self.discovery.lock() = Some(discovery);
    }

    /// Detach the discovery source, if any
    pub fn detach_discovery(&self) -> Option<Box<dyn CalibrationDiscovery>> {
        self.discovery.lock().take()
    }

    /// Signal that no further calibrations are expected
    pub fn mark_discovery_finished(&self) {
        self.discovery_finished.store(true, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    /// Whether discovery has reported that it is done
    pub fn is_discovery_finished(&self) -> bool {
        self.discovery_finished.load(Ordering::SeqCst)
    }

    /// Poll the attached discovery source once and apply what it reports.
    ///
    /// Returns whether the registry changed.
    pub fn poll_discovery(&self) -> bool {
        let (update, finished) = {
            let mut discovery = self.discovery.lock();
            match discovery.as_mut() {
                Some(source) => (source.refresh(), source.is_finished()),
                None => return false,
            }
        };

        let changed = match update {
            Some(records) => self.replace(records),
            None => false,
        };
        if finished {
            self.mark_discovery_finished();
        }
        changed
    }

    // ───────────────────────────────────────────────────────────────────────
    // Waiting
    // ───────────────────────────────────────────────────────────────────────

    /// Wait until at least one calibration is known, discovery finishes, or
    /// `timeout` elapses.
    ///
    /// Yields between polls instead of blocking the thread. Returns whether a
    /// calibration is available; a timeout is a normal `false`.
    pub async fn wait_for_any(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            // Registered before checking so a replace in between still wakes us
            let changed = self.changed.notified();

            self.poll_discovery();
            if self.count() > 0 {
                return true;
            }
            if self.is_discovery_finished() {
                return false;
            }

            tokio::select! {
                _ = changed => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = tokio::time::sleep_until(deadline) => {
                    // Discovery may have completed right before expiry
                    self.poll_discovery();
                    let available = self.count() > 0;
                    tracing::debug!(available, "CalibrationRegistry: wait timed out");
                    return available;
                }
            }
        }
    }

    /// Like [`wait_for_any`](Self::wait_for_any), but abandoned as soon as
    /// `cancel` fires.
    pub async fn wait_for_any_or_cancel(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, WaitCancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WaitCancelled),
            available = self.wait_for_any(timeout) => Ok(available),
        }
    }
}

/// Drop repeated serials, keeping the first occurrence
fn dedup_serials(records: Vec<CalibrationRecord>) -> Vec<CalibrationRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.serial.clone()) {
            unique.push(record);
        } else {
            tracing::warn!("CalibrationRegistry: duplicate serial '{}' ignored", record.serial);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn portrait(serial: &str) -> CalibrationRecord {
        CalibrationRecord::new(serial, 1536, 2048, "Portrait")
    }

    #[test]
    fn test_replace_and_find() {
        let registry = CalibrationRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.replace(vec![portrait("A"), portrait("B")]));
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.find("B").unwrap().serial, "B");
        assert!(registry.find("C").is_none());
        assert_eq!(registry.first().unwrap().serial, "A");
        assert_eq!(registry.serials(), vec!["A", "B"]);
        assert_eq!(registry.revision(), 1);
    }

    #[test]
    fn test_equal_replace_is_noop() {
        let registry = CalibrationRegistry::new();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = fired.clone();
        registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.replace(vec![portrait("A")]));
        assert!(!registry.replace(vec![portrait("A")]));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(registry.revision(), 1);
    }

    #[test]
    fn test_empty_replace_twice_fires_at_most_once() {
        let registry = CalibrationRegistry::new();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = fired.clone();
        registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.replace(Vec::new());
        registry.replace(Vec::new());
        assert!(fired.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn test_duplicate_serials_keep_first() {
        let registry = CalibrationRegistry::new();
        registry.replace(vec![
            portrait("A"),
            CalibrationRecord::new("A", 3840, 2160, "16in"),
            portrait("B"),
        ]);
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.find("A").unwrap().device_type_name, "Portrait");
    }

    #[test]
    fn test_handlers_run_in_order_and_see_new_state() {
        let registry = Arc::new(CalibrationRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = log.clone();
            let observed = registry.clone();
            registry.subscribe(move |snapshot| {
                assert_eq!(observed.count(), snapshot.count());
                assert_eq!(observed.revision(), snapshot.revision);
                log.lock().push(name);
            });
        }

        registry.replace(vec![portrait("A")]);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe() {
        let registry = CalibrationRegistry::new();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = fired.clone();
        let id = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.replace(vec![portrait("A")]);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_clear() {
        let registry = CalibrationRegistry::new();
        registry.replace(vec![portrait("A")]);
        assert!(registry.clear());
        assert!(registry.is_empty());
        assert_eq!(registry.revision(), 2);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "called from a change handler")]
    fn test_reentrant_replace_panics_in_debug() {
        let registry = Arc::new(CalibrationRegistry::new());
        let inner = registry.clone();
        registry.subscribe(move |_| {
            inner.replace(Vec::new());
        });
        registry.replace(vec![portrait("A")]);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_reentrant_replace_deferred_in_release() {
        let registry = Arc::new(CalibrationRegistry::new());
        let inner = registry.clone();
        registry.subscribe(move |snapshot| {
            if snapshot.count() == 1 {
                inner.replace(vec![portrait("A"), portrait("B")]);
            }
        });
        registry.replace(vec![portrait("A")]);
        assert_eq!(registry.count(), 2);
    }

    /// Discovery that reports records after a number of polls
    struct ScriptedDiscovery {
        script: VecDeque<Option<Vec<CalibrationRecord>>>,
        finish_when_done: bool,
    }

    impl CalibrationDiscovery for ScriptedDiscovery {
        fn refresh(&mut self) -> Option<Vec<CalibrationRecord>> {
            self.script.pop_front().flatten()
        }

        fn is_finished(&self) -> bool {
            self.finish_when_done && self.script.is_empty()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_when_nothing_appears() {
        let registry = CalibrationRegistry::new();
        let start = Instant::now();
        let available = registry.wait_for_any(Duration::from_secs(2)).await;
        assert!(!available);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_when_replaced() {
        let registry = Arc::new(CalibrationRegistry::new());
        let writer = registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            writer.replace(vec![portrait("A")]);
        });

        let start = Instant::now();
        assert!(registry.wait_for_any(Duration::from_secs(5)).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_populated() {
        let registry = CalibrationRegistry::new();
        registry.replace(vec![portrait("A")]);
        let start = Instant::now();
        assert!(registry.wait_for_any(Duration::from_secs(5)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_discovery() {
        let registry = CalibrationRegistry::new();
        registry.attach_discovery(Box::new(ScriptedDiscovery {
            script: VecDeque::from(vec![None, None, Some(vec![portrait("A")])]),
            finish_when_done: false,
        }));

        assert!(registry.wait_for_any(Duration::from_secs(5)).await);
        assert_eq!(registry.serials(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sees_discovery_completing_at_deadline() {
        let registry = CalibrationRegistry::with_poll_interval(Duration::from_millis(100));
        // Polls at 0, 100 and 200 ms see nothing; the records arrive after the last poll
        registry.attach_discovery(Box::new(ScriptedDiscovery {
            script: VecDeque::from(vec![None, None, None, Some(vec![portrait("A")])]),
            finish_when_done: false,
        }));

        let start = Instant::now();
        assert!(registry.wait_for_any(Duration::from_millis(250)).await);
        assert_eq!(registry.serials(), vec!["A"]);
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_when_discovery_finishes_empty() {
        let registry = CalibrationRegistry::new();
        registry.attach_discovery(Box::new(ScriptedDiscovery {
            script: VecDeque::from(vec![Some(Vec::new())]),
            finish_when_done: true,
        }));

        let start = Instant::now();
        assert!(!registry.wait_for_any(Duration::from_secs(5)).await);
        assert!(registry.is_discovery_finished());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled() {
        let registry = CalibrationRegistry::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let result = registry
            .wait_for_any_or_cancel(Duration::from_secs(5), &cancel)
            .await;
        assert_eq!(result, Err(WaitCancelled));
    }
}
