//! Qdrant vector store over the REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{RagError, Result};
use crate::traits::store::{
    CollectionParams, Distance, Payload, PayloadFilter, Point, ScoredPoint, VectorQuery,
    VectorStore,
};

/// Default address of a local Qdrant server.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Vector store backed by a Qdrant server.
pub struct QdrantStore {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl QdrantStore {
    /// Create a store for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Authenticate with an API key.
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = self.authorized(request).send().await.map_err(|e| {
            warn!(error = %e, action, "Qdrant request failed");
            RagError::VectorStore(Box::new(e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, action, "Qdrant API error");
            return Err(RagError::VectorStore(
                format!("qdrant {} failed ({}): {}", action, status, error_text).into(),
            ));
        }

        Ok(response)
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
        response
            .json::<QdrantResponse<T>>()
            .await
            .map(|r| r.result)
            .map_err(|e| RagError::VectorStore(Box::new(e)))
    }
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

fn distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
        Distance::Dot => "Dot",
        Distance::Euclid => "Euclid",
    }
}

/// Render a filter in Qdrant's JSON shape.
///
/// `AnyOf` becomes a `should` clause with one exact match per value, which
/// Qdrant evaluates as a logical OR.
fn filter_json(filter: &PayloadFilter) -> Value {
    match filter {
        PayloadFilter::AnyOf { key, values } => json!({
            "should": values
                .iter()
                .map(|v| json!({ "key": key, "match": { "value": v } }))
                .collect::<Vec<_>>()
        }),
    }
}

fn point_json(point: &Point) -> Value {
    json!({
        "id": point.id,
        "vector": point.vector,
        "payload": point.payload,
    })
}

fn search_body(query: &VectorQuery) -> Value {
    let mut body = json!({
        "vector": query.vector,
        "limit": query.limit,
        "with_payload": true,
    });
    if let Some(filter) = &query.filter {
        body["filter"] = filter_json(filter);
    }
    body
}

fn point_id(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let request = self
            .http
            .get(self.url(&format!("/collections/{}/exists", collection)));
        let response = self.send(request, "exists").await?;
        Ok(Self::parse::<ExistsResult>(response).await?.exists)
    }

    async fn create_collection(&self, collection: &str, params: &CollectionParams) -> Result<()> {
        let body = json!({
            "vectors": {
                "size": params.vector_size,
                "distance": distance_name(params.distance),
            }
        });
        let request = self
            .http
            .put(self.url(&format!("/collections/{}", collection)))
            .json(&body);
        self.send(request, "create collection").await?;
        debug!(collection, size = params.vector_size, "Created Qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.url(&format!("/collections/{}", collection)));
        self.send(request, "delete collection").await?;
        debug!(collection, "Deleted Qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body = json!({ "points": points.iter().map(point_json).collect::<Vec<_>>() });
        let request = self
            .http
            .put(self.url(&format!("/collections/{}/points", collection)))
            .query(&[("wait", "true")])
            .json(&body);
        self.send(request, "upsert").await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &VectorQuery) -> Result<Vec<ScoredPoint>> {
        let request = self
            .http
            .post(self.url(&format!("/collections/{}/points/search", collection)))
            .json(&search_body(query));
        let response = self.send(request, "search").await?;
        let entries: Vec<SearchEntry> = Self::parse(response).await?;

        Ok(entries
            .into_iter()
            .map(|e| ScoredPoint {
                id: point_id(e.id),
                score: e.score,
                payload: e.payload.unwrap_or_default(),
            })
            .collect())
    }
}
