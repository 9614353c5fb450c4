//! Trailing-edge debouncer with cancel and flush.
//!
//! Both session persistence and relevance recomputation collapse bursts of
//! triggers into a single execution of the *last* observed arguments. A
//! plain delay is not enough for either caller: teardown needs the pending
//! invocation to run immediately (`flush`), and destructive operations need
//! a guarantee that nothing pending fires afterward (`cancel`).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

type Action<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Inner<T> {
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
}

/// A stateful trailing-edge debouncer holding at most one pending
/// invocation.
///
/// [`schedule`](Debouncer::schedule) stores the latest arguments and
/// restarts the delay window; when the window elapses without another
/// schedule, the action runs once with the most recent arguments. The timer
/// task runs on the ambient tokio runtime.
pub struct Debouncer<T: Send + 'static> {
    delay: Duration,
    action: Action<T>,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Creates a debouncer that invokes `action` after `delay` of quiet.
    pub fn new(delay: Duration, action: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            action: Arc::new(action),
            inner: Arc::new(Mutex::new(Inner {
                pending: None,
                timer: None,
            })),
        }
    }

    /// Schedules an invocation with `value`, coalescing with any pending
    /// one: the previous value is replaced and the delay window restarts.
    pub fn schedule(&self, value: T) {
        let mut inner = self.inner.lock().expect("debouncer lock poisoned");
        inner.pending = Some(value);
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }

        let delay = self.delay;
        let action = Arc::clone(&self.action);
        let shared = Arc::clone(&self.inner);
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Take the value before invoking so a concurrent flush() sees
            // nothing pending once we are committed to running.
            let value = shared.lock().expect("debouncer lock poisoned").pending.take();
            if let Some(value) = value {
                action(value);
            }
        }));
    }

    /// Runs any pending invocation immediately, before returning.
    ///
    /// A no-op when nothing is pending.
    pub fn flush(&self) {
        let value = {
            let mut inner = self.inner.lock().expect("debouncer lock poisoned");
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.pending.take()
        };
        if let Some(value) = value {
            (self.action)(value);
        }
    }

    /// Drops any pending invocation. After this returns, nothing scheduled
    /// earlier can fire.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().expect("debouncer lock poisoned");
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.pending = None;
    }

    /// Whether an invocation is currently pending.
    pub fn has_pending(&self) -> bool {
        self.inner
            .lock()
            .expect("debouncer lock poisoned")
            .pending
            .is_some()
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_debouncer(
        delay_ms: u64,
    ) -> (Debouncer<usize>, Arc<AtomicUsize>, Arc<Mutex<Vec<usize>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let values = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        let values_clone = Arc::clone(&values);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move |value| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            values_clone.lock().unwrap().push(value);
        });
        (debouncer, calls, values)
    }

    #[tokio::test]
    async fn bursts_coalesce_to_last_value() {
        let (debouncer, calls, values) = counting_debouncer(20);

        for i in 0..10 {
            debouncer.schedule(i);
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*values.lock().unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn flush_runs_pending_synchronously() {
        let (debouncer, calls, values) = counting_debouncer(10_000);

        debouncer.schedule(7);
        debouncer.flush();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*values.lock().unwrap(), vec![7]);
        assert!(!debouncer.has_pending());
    }

    #[tokio::test]
    async fn cancel_after_flush_is_noop() {
        let (debouncer, calls, _values) = counting_debouncer(10_000);

        debouncer.schedule(1);
        debouncer.flush();
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_pending_invocation() {
        let (debouncer, calls, _values) = counting_debouncer(20);

        debouncer.schedule(1);
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn schedule_after_flush_starts_fresh_window() {
        let (debouncer, calls, values) = counting_debouncer(20);

        debouncer.schedule(1);
        debouncer.flush();
        debouncer.schedule(2);
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*values.lock().unwrap(), vec![1, 2]);
    }
}
