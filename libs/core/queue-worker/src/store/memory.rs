use super::QueueStore;
use crate::error::WorkerError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// In-memory queue store for tests and local pipelines.
///
/// All lists live behind one async mutex, so every operation (including moves
/// between lists) is atomic with respect to every other. Clones share the same
/// lists, which lets several workers in one process act like separate worker
/// processes against a shared store.
///
/// The store can be switched to an unavailable state to simulate a lost
/// connection: every operation then fails with `StoreUnavailable`.
#[derive(Clone, Default)]
pub struct InMemoryQueueStore {
    lists: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    notify: Arc<Notify>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryQueueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Items of `queue` from head (newest) to tail (next to be consumed)
    pub async fn items(&self, queue: &str) -> Vec<String> {
        self.lists
            .lock()
            .await
            .get(queue)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Simulate the store becoming unreachable (or reachable again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn check_available(&self) -> Result<(), WorkerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(WorkerError::store("in-memory store marked unavailable"));
        }
        Ok(())
    }

    fn move_tail(
        lists: &mut HashMap<String, VecDeque<String>>,
        source: &str,
        dest: &str,
    ) -> Option<String> {
        let item = lists.get_mut(source)?.pop_back()?;
        lists
            .entry(dest.to_string())
            .or_default()
            .push_front(item.clone());
        Some(item)
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn push(&self, queue: &str, item: &str) -> Result<(), WorkerError> {
        self.check_available()?;
        self.lists
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_front(item.to_string());
        self.notify.notify_waiters();
        Ok(())
    }

    async fn blocking_move(
        &self,
        source: &str,
        dest: &str,
        timeout: Duration,
    ) -> Result<Option<String>, WorkerError> {
        let deadline = (!timeout.is_zero()).then(|| tokio::time::Instant::now() + timeout);

        loop {
            // Register interest before looking, so a push in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.check_available()?;
            let moved = Self::move_tail(&mut *self.lists.lock().await, source, dest);
            if let Some(item) = moved {
                self.notify.notify_waiters();
                return Ok(Some(item));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn try_move(&self, source: &str, dest: &str) -> Result<Option<String>, WorkerError> {
        self.check_available()?;
        let moved = Self::move_tail(&mut *self.lists.lock().await, source, dest);
        if moved.is_some() {
            self.notify.notify_waiters();
        }
        Ok(moved)
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>, WorkerError> {
        self.check_available()?;
        Ok(self
            .lists
            .lock()
            .await
            .get_mut(queue)
            .and_then(|list| list.pop_back()))
    }

    async fn remove(&self, queue: &str, item: &str) -> Result<usize, WorkerError> {
        self.check_available()?;
        let mut lists = self.lists.lock().await;
        let Some(list) = lists.get_mut(queue) else {
            return Ok(0);
        };
        match list.iter().position(|entry| entry == item) {
            Some(index) => {
                list.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn transfer(
        &self,
        source: &str,
        item: &str,
        dest: &str,
        replacement: &str,
    ) -> Result<bool, WorkerError> {
        self.check_available()?;
        let mut lists = self.lists.lock().await;

        let index = lists
            .get(source)
            .and_then(|list| list.iter().position(|entry| entry == item));
        let Some(index) = index else {
            return Ok(false);
        };

        if let Some(list) = lists.get_mut(source) {
            list.remove(index);
        }
        lists
            .entry(dest.to_string())
            .or_default()
            .push_front(replacement.to_string());
        drop(lists);

        self.notify.notify_waiters();
        Ok(true)
    }

    async fn len(&self, queue: &str) -> Result<usize, WorkerError> {
        self.check_available()?;
        Ok(self.lists.lock().await.get(queue).map_or(0, VecDeque::len))
    }

    async fn ping(&self) -> Result<(), WorkerError> {
        self.check_available()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
