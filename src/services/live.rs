//! Live query delivery
//!
//! A live query is a subscription that receives a fresh complete snapshot
//! after every relevant mutation, never a delta. Delivery is
//! latest-value-wins over a single-slot watch channel: a snapshot
//! published while a subscriber is still handling the previous one
//! supersedes it; snapshots are never queued.

use std::future::Future;
use tokio::sync::watch;

/// Subscription to an ordered query result that is re-published on every
/// mutation of the underlying store.
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns false once the publishing
    /// store has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Drive `handle` with the current and every subsequent snapshot.
    ///
    /// Latest-value-wins: when a new snapshot arrives while a handler
    /// invocation is still in flight, that invocation is cancelled and
    /// replaced, not awaited to completion. Runs until the publishing
    /// store is dropped.
    pub async fn follow<F, Fut>(mut self, mut handle: F)
    where
        F: FnMut(T) -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        loop {
            let snapshot = self.rx.borrow_and_update().clone();
            tokio::select! {
                _ = handle(snapshot) => {
                    if self.rx.changed().await.is_err() {
                        return;
                    }
                }
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Derive a new live query by applying `map` to every snapshot.
    pub fn map<U, F>(&self, map: F) -> LiveQuery<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + 'static,
    {
        let mut rx = self.rx.clone();
        let initial = map(&rx.borrow());
        let (tx, out) = watch::channel(initial);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let next = map(&rx.borrow());
                if tx.send(next).is_err() {
                    break;
                }
            }
        });

        LiveQuery::new(out)
    }
}
