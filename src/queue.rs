use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::{collections::VecDeque, future::Future, sync::Arc};
use tokio::{runtime::Handle, sync::Notify};

use crate::error::TagbaseError;

/// A deferred unit of synchronization work.
pub type WorkItem = BoxFuture<'static, Result<(), TagbaseError>>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<WorkItem>,
    processing: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    idle: Notify,
    runtime: Handle,
}

/// FIFO of asynchronous work items drained by at most one worker at a time.
///
/// Items run strictly in arrival order, each awaited to completion before the next starts. An
/// item that errors or panics is logged and the worker moves on.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<QueueInner>,
}

impl SyncQueue {
    pub fn new(runtime: Handle) -> Self {
        SyncQueue {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                runtime,
            }),
        }
    }

    /// A queue whose worker runs on the current tokio runtime.
    pub fn current() -> Result<Self, TagbaseError> {
        let runtime = Handle::try_current()
            .map_err(|e| TagbaseError::Custom(format!("No tokio runtime available: {e}")))?;
        Ok(SyncQueue::new(runtime))
    }

    /// Append `action` and make sure a worker is draining the queue.
    pub fn enqueue<F>(&self, action: F)
    where
        F: Future<Output = Result<(), TagbaseError>> + Send + 'static,
    {
        let start_worker = {
            let mut state = self.inner.state.lock();
            state.pending.push_back(action.boxed());
            if state.processing {
                false
            } else {
                state.processing = true;
                true
            }
        };
        if start_worker {
            let queue = self.clone();
            self.inner.runtime.spawn(queue.drain());
        }
    }

    async fn drain(self) {
        tracing::debug!("[SyncQueue] Worker started");
        loop {
            let next = {
                let mut state = self.inner.state.lock();
                match state.pending.pop_front() {
                    Some(item) => item,
                    None => {
                        state.processing = false;
                        break;
                    }
                }
            };
            match self.inner.runtime.spawn(next).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("[SyncQueue] Work item failed: {}", e),
                Err(e) => {
                    tracing::error!("[SyncQueue] Work item aborted: {}", TagbaseError::from(e))
                }
            }
        }
        tracing::debug!("[SyncQueue] Queue drained, worker exiting");
        self.inner.idle.notify_waiters();
    }

    /// Number of items waiting to start.
    pub fn size(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.state.lock().processing
    }

    /// Drop every item that has not started yet. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = std::mem::take(&mut self.inner.state.lock().pending);
        if !dropped.is_empty() {
            tracing::debug!("[SyncQueue] Dropped {} pending work items", dropped.len());
        }
        dropped.len()
    }

    /// Resolves once the queue is empty and no worker is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.inner.state.lock();
                if !state.processing && state.pending.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use test_log::test;
    use tokio::{sync::oneshot, time::sleep};

    #[test(tokio::test)]
    async fn test_items_run_in_arrival_order() {
        let queue = SyncQueue::current().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5u64 {
            let seen = seen.clone();
            queue.enqueue(async move {
                // Earlier items sleep longer; ordering must still hold.
                sleep(Duration::from_millis(25 - i * 5)).await;
                seen.lock().push(i);
                Ok(())
            });
        }
        queue.wait_idle().await;

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
        assert!(!queue.is_processing());
        assert_eq!(queue.size(), 0);
    }

    #[test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn test_items_never_overlap() {
        let queue = SyncQueue::current().unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            queue.enqueue(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }
        queue.wait_idle().await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    async fn fail() -> Result<(), TagbaseError> {
        Err(TagbaseError::Custom("first item fails".into()))
    }

    async fn explode() -> Result<(), TagbaseError> {
        panic!("second item panics")
    }

    #[test(tokio::test)]
    async fn test_failures_do_not_stop_the_worker() {
        let queue = SyncQueue::current().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        queue.enqueue(fail());
        queue.enqueue(explode());
        let counter = ran.clone();
        queue.enqueue(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        queue.wait_idle().await;

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test(tokio::test)]
    async fn test_clear_drops_unstarted_work() {
        let queue = SyncQueue::current().unwrap();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        queue.enqueue(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok(())
        });
        started_rx.await.unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = ran.clone();
            queue.enqueue(async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(queue.size(), 3);
        assert!(queue.is_processing());

        assert_eq!(queue.clear(), 3);
        assert_eq!(queue.size(), 0);
        release_tx.send(()).unwrap();
        queue.wait_idle().await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(!queue.is_processing());
    }

    #[test(tokio::test)]
    async fn test_wait_idle_on_empty_queue() {
        let queue = SyncQueue::current().unwrap();
        queue.wait_idle().await;
        assert!(!queue.is_processing());
    }

    #[test(tokio::test)]
    async fn test_worker_restarts_after_idle() {
        let queue = SyncQueue::current().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let counter = ran.clone();
            queue.enqueue(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            queue.wait_idle().await;
        }
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }
}
