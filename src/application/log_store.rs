// Read-only port onto the remote hierarchical log store
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// Live subscription stream: the initial value followed by every
/// subsequent change, until the stream is dropped.
pub type ValueStream = BoxStream<'static, anyhow::Result<Value>>;

#[async_trait]
pub trait LogStore: Send + Sync {
    /// Read the subtree at `path`. `None` means the path does not
    /// exist; transport failures surface as errors.
    async fn read(&self, path: &str) -> anyhow::Result<Option<Value>>;

    /// Subscribe to the subtree at `path`.
    fn subscribe(&self, path: &str) -> ValueStream;
}
