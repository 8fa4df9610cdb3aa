// Latest-wins commit cell for asynchronous reloads
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Guards a value that is recomputed asynchronously whenever its
/// inputs change. Each reload calls `begin` for a generation tag and
/// `commit`s with it; a commit whose generation has been superseded
/// is dropped silently, so a slow stale reload can never overwrite a
/// newer one's result.
pub struct LatestCell<T> {
    generation: AtomicU64,
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone + Send + Sync + 'static> LatestCell<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            generation: AtomicU64::new(0),
            tx,
        }
    }

    /// Start a new reload, superseding all earlier generations.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `value` if `generation` is still current. Returns
    /// whether the value was applied.
    pub fn commit(&self, generation: u64, value: T) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|slot| {
            if self.generation.load(Ordering::SeqCst) == generation {
                *slot = Some(value);
                applied = true;
            }
            applied
        });
        if !applied {
            tracing::debug!(generation, "discarding stale reload result");
        }
        applied
    }

    pub fn current(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for LatestCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_commit_is_discarded() {
        let cell = LatestCell::new();
        let first = cell.begin();
        let second = cell.begin();

        // The slow first request finishes after the second started.
        assert!(!cell.commit(first, "old"));
        assert_eq!(cell.current(), None);

        assert!(cell.commit(second, "new"));
        assert_eq!(cell.current(), Some("new"));

        // A very late commit of the old generation changes nothing.
        assert!(!cell.commit(first, "old"));
        assert_eq!(cell.current(), Some("new"));
    }

    #[test]
    fn test_generations_increase_monotonically() {
        let cell: LatestCell<u32> = LatestCell::new();
        let a = cell.begin();
        let b = cell.begin();
        let c = cell.begin();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_watchers_see_committed_values() {
        let cell = LatestCell::new();
        let mut rx = cell.watch();
        let generation = cell.begin();
        assert!(cell.commit(generation, 42));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(42));
    }
}
