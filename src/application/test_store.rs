// In-memory LogStore for unit tests
use crate::application::log_store::{LogStore, ValueStream};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Canned-response store with a read counter, per-path failures, and
/// per-path delays for exercising out-of-order fetch completion.
pub struct MockStore {
    values: HashMap<String, Value>,
    failing: HashSet<String>,
    delays_ms: HashMap<String, u64>,
    subscriptions: HashMap<String, Vec<Value>>,
    reads: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            failing: HashSet::new(),
            delays_ms: HashMap::new(),
            subscriptions: HashMap::new(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn with_value(mut self, path: &str, value: Value) -> Self {
        self.values.insert(path.to_string(), value);
        self
    }

    pub fn with_failure(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn with_delay(mut self, path: &str, millis: u64) -> Self {
        self.delays_ms.insert(path.to_string(), millis);
        self
    }

    pub fn with_subscription(mut self, path: &str, values: Vec<Value>) -> Self {
        self.subscriptions.insert(path.to_string(), values);
        self
    }

    pub fn into_store(self) -> Arc<dyn LogStore> {
        Arc::new(self)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for MockStore {
    async fn read(&self, path: &str) -> anyhow::Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(millis) = self.delays_ms.get(path) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        if self.failing.contains(path) {
            anyhow::bail!("simulated read failure for {path}");
        }
        Ok(self.values.get(path).cloned())
    }

    fn subscribe(&self, path: &str) -> ValueStream {
        let values = self.subscriptions.get(path).cloned().unwrap_or_default();
        futures::stream::iter(values.into_iter().map(Ok))
            .chain(futures::stream::pending())
            .boxed()
    }
}
