//! FIFO counting semaphore for bounding in-flight async operations

use crate::error::PipelineError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Counting semaphore with strict FIFO admission
///
/// `acquire` suspends once all slots are taken; `release` hands the freed
/// slot directly to the longest-waiting caller, if any. All internal state
/// mutates synchronously under one lock, with no suspension point held
/// across it.
pub struct Semaphore {
    capacity: usize,
    state: Mutex<State>,
}

struct State {
    active: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl Semaphore {
    /// Create a semaphore admitting at most `capacity` concurrent holders
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::InvalidConcurrency(capacity));
        }
        Ok(Self {
            capacity,
            state: Mutex::new(State {
                active: 0,
                waiters: VecDeque::new(),
            }),
        })
    }

    /// Occupy a slot, suspending until one is free
    pub async fn acquire(&self) {
        let rx = {
            let mut state = self.state.lock().unwrap();
            if state.active < self.capacity && state.waiters.is_empty() {
                state.active += 1;
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        // The releasing task transferred its slot; active stays unchanged
        let _ = rx.await;
    }

    /// Free a slot.
    ///
    /// The longest-waiting suspended caller, if any, takes the slot over;
    /// otherwise the active count drops. A release with no active holders
    /// is a no-op.
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap();
        if state.active == 0 {
            return;
        }
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                return;
            }
            // Waiter gave up before admission; try the next one
        }
        state.active -= 1;
    }

    /// Run `op` while holding a slot.
    ///
    /// The slot is released on every exit path: success, error return, or
    /// the wrapped future being dropped mid-flight.
    pub async fn run<F, T>(&self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        self.acquire().await;
        let _guard = ReleaseGuard { semaphore: self };
        op.await
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.state.lock().unwrap().active
    }
}

struct ReleaseGuard<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = Semaphore::new(0);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidConcurrency(0))
        ));
    }

    #[tokio::test]
    async fn test_acquire_up_to_capacity_does_not_block() {
        let sem = Semaphore::new(3).unwrap();
        sem.acquire().await;
        sem.acquire().await;
        sem.acquire().await;
        assert_eq!(sem.active(), 3);
    }

    #[tokio::test]
    async fn test_release_with_no_holders_is_noop() {
        let sem = Semaphore::new(1).unwrap();
        sem.release();
        assert_eq!(sem.active(), 0);

        // The phantom release must not have opened a second slot
        sem.acquire().await;
        assert_eq!(sem.active(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_capacity() {
        let capacity = 3;
        let sem = Arc::new(Semaphore::new(capacity).unwrap());
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let sem = Arc::clone(&sem);
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                sem.run(async {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    current.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= capacity);
        assert_eq!(sem.active(), 0);
    }

    #[tokio::test]
    async fn test_waiters_are_served_fifo() {
        let sem = Arc::new(Semaphore::new(1).unwrap());
        let order = Arc::new(Mutex::new(Vec::new()));

        // Hold the only slot so every spawned task queues
        sem.acquire().await;

        let mut handles = Vec::new();
        for id in 0..3 {
            let sem = Arc::clone(&sem);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                sem.acquire().await;
                order.lock().unwrap().push(id);
                sem.release();
            }));
            // Let the task reach its acquire before spawning the next one
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }

        sem.release();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_run_releases_on_error() {
        let sem = Semaphore::new(1).unwrap();

        let result: Result<(), &str> = sem.run(async { Err("failed operation") }).await;
        assert!(result.is_err());
        assert_eq!(sem.active(), 0);

        // The slot is usable again
        sem.acquire().await;
        assert_eq!(sem.active(), 1);
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_skipped() {
        let sem = Arc::new(Semaphore::new(1).unwrap());
        sem.acquire().await;

        // Queue a waiter, then drop it before it is admitted
        {
            let mut abandoned = Box::pin(sem.acquire());
            assert!(futures_util::poll!(abandoned.as_mut()).is_pending());
        }

        let live = {
            let sem = Arc::clone(&sem);
            tokio::spawn(async move {
                sem.acquire().await;
                sem.release();
            })
        };
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        // Release must skip the abandoned waiter and admit the live one
        sem.release();
        live.await.unwrap();
        assert_eq!(sem.active(), 0);
    }
}
