//! Qdrant REST backend.
//!
//! Talks to the HTTP API (default port 6333):
//!
//! - `GET  /collections/{name}` pre-flight lookup
//! - `PUT  /collections/{name}` creation
//! - `PUT  /collections/{name}/points?wait=true` upsert
//! - `POST /collections/{name}/points/search` nearest neighbours

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::payload::{Payload, PayloadValue};
use crate::{CollectionInfo, SearchHit, VectorStore};

/// Default REST endpoint.
pub const DEFAULT_URL: &str = "http://localhost:6333";

/// Distance metric for new collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclid,
    /// Dot product.
    Dot,
}

/// Qdrant client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Base URL of the REST API.
    pub url: String,
    /// Optional API key sent as `api-key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Metric used when a collection has to be created.
    pub distance: Distance,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            distance: Distance::Cosine,
        }
    }
}

impl QdrantConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        if self.url.trim().is_empty() {
            return Err(StoreError::Config("url cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(StoreError::Config("timeout_secs must be > 0".to_string()));
        }
        base_url(&self.url)?;
        Ok(())
    }
}

/// Parses the server URL. It must be able to carry path segments.
fn base_url(raw: &str) -> StoreResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| StoreError::Config(format!("invalid url '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(StoreError::Config(format!("url '{}' cannot carry a path", raw)));
    }
    Ok(url)
}

/// [`VectorStore`] backed by a Qdrant server.
#[derive(Debug, Clone)]
pub struct QdrantStore {
    http: Client,
    base_url: Url,
    distance: Distance,
}

impl QdrantStore {
    /// Create a client. No request is made until the first call.
    pub fn new(config: &QdrantConfig) -> StoreResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers(config.api_key.as_deref())?)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url(&config.url)?,
            distance: config.distance,
        })
    }

    /// `{base}/collections/{name}/{tail..}` with every segment percent-encoded,
    /// so a name containing `/`, `?` or `#` stays a single segment.
    fn collection_url(&self, name: &str, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("collections")
                .push(name)
                .extend(tail);
        }
        url
    }

    async fn check(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

fn default_headers(api_key: Option<&str>) -> StoreResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
        let value =
            HeaderValue::from_str(key).map_err(|e| StoreError::Config(format!("api key: {e}")))?;
        headers.insert(HeaderName::from_static("api-key"), value);
    }
    Ok(headers)
}

/// Body for `PUT /collections/{name}`.
pub fn create_collection_body(dimension: usize, distance: Distance) -> Value {
    json!({
        "vectors": {
            "size": dimension,
            "distance": distance,
        }
    })
}

/// Body for `PUT /collections/{name}/points`.
pub fn upsert_body(id: Uuid, vector: &[f32], payload: &Payload) -> Value {
    json!({
        "points": [{
            "id": id.to_string(),
            "vector": vector,
            "payload": payload,
        }]
    })
}

/// Extract the vector size from a collection info response.
///
/// Handles the single unnamed vector layout (`params.vectors.size`).
pub fn parse_collection_dimension(body: &Value) -> Option<usize> {
    body.pointer("/result/config/params/vectors/size")
        .and_then(Value::as_u64)
        .map(|v| v as usize)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}

/// Parse a search response body into hits.
///
/// Non-primitive payload values written by other tools are dropped.
pub fn parse_search_response(body: Value) -> StoreResult<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_value(body)?;
    Ok(response
        .result
        .into_iter()
        .map(|entry| {
            let id = match entry.id {
                Value::String(s) => s,
                other => other.to_string(),
            };
            let mut payload = Payload::new();
            for (key, value) in entry.payload.unwrap_or_default() {
                match PayloadValue::from_json(&key, &value) {
                    Ok(v) => {
                        payload.insert(key, v);
                    }
                    Err(e) => tracing::warn!(point = %id, "dropping payload field: {}", e),
                }
            }
            SearchHit {
                id,
                score: entry.score,
                payload,
            }
        })
        .collect())
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn collection_info(&self, name: &str) -> StoreResult<Option<CollectionInfo>> {
        let response = self.http.get(self.collection_url(name, &[])).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = Self::check(response).await?.json().await?;
        let dimension = parse_collection_dimension(&body).ok_or_else(|| StoreError::Api {
            status: 200,
            body: format!("collection '{}' has no single vector size", name),
        })?;
        Ok(Some(CollectionInfo { dimension }))
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> StoreResult<()> {
        let response = self
            .http
            .put(self.collection_url(name, &[]))
            .json(&create_collection_body(dimension, self.distance))
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Uuid,
        vector: Vec<f32>,
        payload: Payload,
    ) -> StoreResult<()> {
        let response = self
            .http
            .put(self.collection_url(collection, &["points"]))
            .query(&[("wait", "true")])
            .json(&upsert_body(id, &vector, &payload))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<SearchHit>> {
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let response = self
            .http
            .post(self.collection_url(collection, &["points", "search"]))
            .json(&body)
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;
        parse_search_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_validates() {
        let config = QdrantConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert!(config.validate().is_ok());
        assert!(QdrantStore::new(&config).is_ok());
    }

    #[test]
    fn test_empty_url_rejected() {
        let config = QdrantConfig {
            url: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_unparseable_url_rejected() {
        let config = QdrantConfig {
            url: "qdrant:6333/x y".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
        let config = QdrantConfig {
            url: "mailto:ops@example.org".to_string(),
            ..Default::default()
        };
        assert!(matches!(QdrantStore::new(&config), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_collection_name_is_one_path_segment() {
        let store = QdrantStore::new(&QdrantConfig {
            url: "http://qdrant:6333/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            store.collection_url("frames", &[]).as_str(),
            "http://qdrant:6333/collections/frames"
        );
        assert_eq!(
            store.collection_url("a/b?c#d", &["points", "search"]).as_str(),
            "http://qdrant:6333/collections/a%2Fb%3Fc%23d/points/search"
        );
    }

    #[test]
    fn test_collection_url_keeps_base_path() {
        let store = QdrantStore::new(&QdrantConfig {
            url: "https://db.example.org/qdrant".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            store.collection_url("frames", &["points"]).as_str(),
            "https://db.example.org/qdrant/collections/frames/points"
        );
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: QdrantConfig =
            serde_json::from_value(json!({"url": "http://qdrant:6333", "api_key": "k"})).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_create_collection_body() {
        assert_eq!(
            create_collection_body(50176, Distance::Cosine),
            json!({"vectors": {"size": 50176, "distance": "Cosine"}})
        );
    }

    #[test]
    fn test_upsert_body_shape() {
        let id = Uuid::nil();
        let mut payload = Payload::new();
        payload.insert("width".into(), 4i64.into());
        let body = upsert_body(id, &[0.5, 0.5], &payload);
        assert_eq!(
            body,
            json!({"points": [{
                "id": "00000000-0000-0000-0000-000000000000",
                "vector": [0.5, 0.5],
                "payload": {"width": 4}
            }]})
        );
    }

    #[test]
    fn test_parse_collection_dimension() {
        let body = json!({"result": {"config": {"params": {"vectors": {"size": 64, "distance": "Cosine"}}}}});
        assert_eq!(parse_collection_dimension(&body), Some(64));
        assert_eq!(parse_collection_dimension(&json!({"result": {}})), None);
    }

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "result": [
                {"id": "a1", "score": 0.9, "payload": {"filename": "a.cbf", "tags": [1]}},
                {"id": 7, "score": 0.5}
            ],
            "status": "ok"
        });
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a1");
        assert_eq!(hits[0].payload.len(), 1);
        assert_eq!(hits[0].payload["filename"], PayloadValue::from("a.cbf"));
        assert_eq!(hits[1].id, "7");
        assert!(hits[1].payload.is_empty());
    }
}
