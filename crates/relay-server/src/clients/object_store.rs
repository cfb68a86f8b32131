//! Object store (document service) facade

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::{HttpBackend, RemoteResult};

/// Document CRUD against a remote object store.
///
/// `db` and `collection` address the container; `id` is the document key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Distinct values of `field` across documents matching `filter`
    async fn get_distinct(
        &self,
        db: &str,
        collection: &str,
        field: &str,
        filter: &Value,
    ) -> RemoteResult<HashSet<String>>;

    async fn insert(&self, db: &str, collection: &str, id: &str, payload: &Value)
        -> RemoteResult<Value>;

    async fn replace(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<Value>;

    async fn get(&self, db: &str, collection: &str, id: &str) -> RemoteResult<Value>;

    async fn delete(&self, db: &str, collection: &str, id: &str) -> RemoteResult<()>;

    async fn query(&self, db: &str, collection: &str, filter: &Value) -> RemoteResult<Vec<Value>>;
}

#[derive(Debug, Deserialize)]
struct DistinctResponse {
    values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    documents: Vec<Value>,
}

/// JSON-over-HTTP object store client
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    backend: HttpBackend,
}

impl HttpObjectStore {
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &HttpBackend {
        &self.backend
    }

    fn collection_url(&self, db: &str, collection: &str, tail: &[&str]) -> String {
        let mut segments = vec!["dbs", db, "colls", collection];
        segments.extend_from_slice(tail);
        self.backend.url(&segments)
    }
}

/// Stringify scalar identifiers; other shapes cannot be document keys
fn identifier_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self, filter), fields(service = %self.backend.service()))]
    async fn get_distinct(
        &self,
        db: &str,
        collection: &str,
        field: &str,
        filter: &Value,
    ) -> RemoteResult<HashSet<String>> {
        let url = self.collection_url(db, collection, &["distinct"]);
        let body = json!({ "field": field, "filter": filter });

        let response = self.backend.send_json(|c| c.post(&url).json(&body)).await?;
        let response = self.backend.decode::<DistinctResponse>(response)?;

        Ok(response.map(|r| r.values.into_iter().filter_map(identifier_string).collect()))
    }

    #[instrument(skip(self, payload), fields(service = %self.backend.service()))]
    async fn insert(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<Value> {
        let url = self.collection_url(db, collection, &["docs"]);
        let body = json!({ "id": id, "document": payload });

        self.backend.send_json(|c| c.post(&url).json(&body)).await
    }

    #[instrument(skip(self, payload), fields(service = %self.backend.service()))]
    async fn replace(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<Value> {
        let url = self.collection_url(db, collection, &["docs", id]);

        self.backend.send_json(|c| c.put(&url).json(payload)).await
    }

    #[instrument(skip(self), fields(service = %self.backend.service()))]
    async fn get(&self, db: &str, collection: &str, id: &str) -> RemoteResult<Value> {
        let url = self.collection_url(db, collection, &["docs", id]);

        self.backend.send_json(|c| c.get(&url)).await
    }

    #[instrument(skip(self), fields(service = %self.backend.service()))]
    async fn delete(&self, db: &str, collection: &str, id: &str) -> RemoteResult<()> {
        let url = self.collection_url(db, collection, &["docs", id]);

        let response = self.backend.send(|c| c.delete(&url)).await?;
        Ok(response.map(|_| ()))
    }

    #[instrument(skip(self, filter), fields(service = %self.backend.service()))]
    async fn query(&self, db: &str, collection: &str, filter: &Value) -> RemoteResult<Vec<Value>> {
        let url = self.collection_url(db, collection, &["query"]);
        let body = json!({ "filter": filter });

        let response = self.backend.send_json(|c| c.post(&url).json(&body)).await?;
        let response = self.backend.decode::<QueryResponse>(response)?;

        Ok(response.map(|r| r.documents))
    }
}
