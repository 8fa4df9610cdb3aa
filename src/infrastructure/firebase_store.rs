// Realtime-database store client over the REST surface
use crate::application::log_store::{LogStore, ValueStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct FirebaseStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

/// Payload of a `put`/`patch` stream event: the subtree-relative path
/// the update applies at, and the new data.
#[derive(Debug, Deserialize)]
struct StreamUpdate {
    path: String,
    data: Value,
}

impl FirebaseStore {
    pub fn new(base_url: String, auth_token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
            client: reqwest::Client::new(),
        }
    }

    fn build_url(&self, path: &str) -> String {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        let mut url = format!("{}/{}.json", self.base_url, segments.join("/"));
        if let Some(token) = &self.auth_token {
            url.push_str("?auth=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }
}

#[async_trait]
impl LogStore for FirebaseStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        let url = self.build_url(path);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to the store")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Store read failed with status {}: {}", status, body);
        }

        let value = response
            .json::<Value>()
            .await
            .context("Failed to parse store response")?;

        // The REST surface answers `null` for a path that does not
        // exist.
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn subscribe(&self, path: &str) -> ValueStream {
        let url = self.build_url(path);
        let client = self.client.clone();

        async_stream::try_stream! {
            let response = client
                .get(&url)
                .header("Accept", "text/event-stream")
                .send()
                .await
                .context("Failed to open store event stream")?
                .error_for_status()
                .context("Store subscription refused")?;

            let mut cache = Value::Null;
            let mut pending = String::new();
            let mut event_name = String::new();
            let mut event_data = String::new();
            let mut body = response.bytes_stream();

            while let Some(chunk) = body.next().await {
                let chunk = chunk.context("Store event stream failed")?;
                pending.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = pending.find('\n') {
                    let line: String = pending.drain(..=newline).collect();
                    let line = line.trim_end_matches(['\n', '\r']);

                    if line.is_empty() {
                        // Blank line closes the event.
                        if let Some(value) =
                            dispatch_event(&mut cache, &event_name, &event_data)?
                        {
                            yield value;
                        }
                        event_name.clear();
                        event_data.clear();
                    } else if let Some(name) = line.strip_prefix("event:") {
                        event_name = name.trim().to_string();
                    } else if let Some(data) = line.strip_prefix("data:") {
                        if !event_data.is_empty() {
                            event_data.push('\n');
                        }
                        event_data.push_str(data.trim_start());
                    }
                }
            }
        }
        .boxed()
    }
}

/// Apply one server-sent event to the cached subtree. `put` replaces
/// at the event path, `patch` merges object fields; both yield the
/// whole updated subtree, matching the snapshot shape a fresh read
/// would return.
fn dispatch_event(cache: &mut Value, event: &str, data: &str) -> Result<Option<Value>> {
    match event {
        "put" | "patch" => {
            let update: StreamUpdate =
                serde_json::from_str(data).context("Malformed stream event payload")?;
            let Some(slot) = resolve_slot(cache, &update.path) else {
                return Ok(None);
            };
            if event == "put" {
                *slot = update.data;
            } else {
                merge_patch(slot, update.data);
            }
            Ok(Some(cache.clone()))
        }
        "keep-alive" | "" => Ok(None),
        "cancel" => anyhow::bail!("Subscription cancelled by the store"),
        "auth_revoked" => anyhow::bail!("Subscription credentials revoked"),
        other => {
            tracing::debug!(event = other, "ignoring unknown stream event");
            Ok(None)
        }
    }
}

/// Navigate to the value slot at `path`, materializing intermediate
/// objects along the way.
fn resolve_slot<'a>(cache: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = cache;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        current = current
            .as_object_mut()?
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    Some(current)
}

fn merge_patch(slot: &mut Value, data: Value) {
    match (slot, data) {
        (Value::Object(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        (slot, data) => *slot = data,
    }
}
