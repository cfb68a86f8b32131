//! Shared helpers for route tests: in-memory backends and response decoding

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use relay_server::api::{create_router, AppState};
use relay_server::clients::{
    ArchivalReference, BlobStore, Indexer, ObjectStore, RemoteError, RemoteResponse, RemoteResult,
    RulesEngine,
};
use relay_server::config::{Config, ImportConfig};
use relay_server::features::FeatureState;
use relay_server::import::CustomerImporter;

fn not_found(service: &str, what: &str) -> RemoteError {
    RemoteError::Status {
        service: service.to_string(),
        status: 404,
        detail: format!("{what} not found"),
    }
}

/// Documents keyed by (db, collection, id)
#[derive(Default)]
pub struct MemoryObjectStore {
    docs: Mutex<HashMap<(String, String, String), Value>>,
}

impl MemoryObjectStore {
    pub fn seed(&self, db: &str, collection: &str, id: &str, doc: Value) {
        self.docs
            .lock()
            .unwrap()
            .insert((db.into(), collection.into(), id.into()), doc);
    }

    pub fn doc(&self, db: &str, collection: &str, id: &str) -> Option<Value> {
        self.docs
            .lock()
            .unwrap()
            .get(&(db.into(), collection.into(), id.into()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_distinct(
        &self,
        db: &str,
        collection: &str,
        field: &str,
        _filter: &Value,
    ) -> RemoteResult<HashSet<String>> {
        let docs = self.docs.lock().unwrap();
        let values = docs
            .iter()
            .filter(|((d, c, _), _)| d == db && c == collection)
            .filter_map(|(_, doc)| doc.get(field).and_then(Value::as_str).map(str::to_string))
            .collect();
        Ok(RemoteResponse::ok(values))
    }

    async fn insert(&self, db: &str, collection: &str, id: &str, payload: &Value) -> RemoteResult<Value> {
        let key = (db.to_string(), collection.to_string(), id.to_string());
        let mut docs = self.docs.lock().unwrap();
        if docs.contains_key(&key) {
            return Err(RemoteError::Status {
                service: "object-store".into(),
                status: 409,
                detail: format!("document {id} already exists"),
            });
        }
        docs.insert(key, payload.clone());
        Ok(RemoteResponse::created(payload.clone()))
    }

    async fn replace(&self, db: &str, collection: &str, id: &str, payload: &Value) -> RemoteResult<Value> {
        self.seed(db, collection, id, payload.clone());
        Ok(RemoteResponse::ok(payload.clone()))
    }

    async fn get(&self, db: &str, collection: &str, id: &str) -> RemoteResult<Value> {
        self.doc(db, collection, id)
            .map(RemoteResponse::ok)
            .ok_or_else(|| not_found("object-store", "document"))
    }

    async fn delete(&self, db: &str, collection: &str, id: &str) -> RemoteResult<()> {
        self.docs
            .lock()
            .unwrap()
            .remove(&(db.into(), collection.into(), id.into()))
            .map(|_| RemoteResponse::new(204, ()))
            .ok_or_else(|| not_found("object-store", "document"))
    }

    async fn query(&self, db: &str, collection: &str, filter: &Value) -> RemoteResult<Vec<Value>> {
        let docs = self.docs.lock().unwrap();
        let matches = docs
            .iter()
            .filter(|((d, c, _), _)| d == db && c == collection)
            .map(|(_, doc)| doc)
            .filter(|doc| {
                filter
                    .as_object()
                    .map(|f| f.iter().all(|(k, v)| doc.get(k) == Some(v)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(RemoteResponse::ok(matches))
    }
}

/// Blob store that keeps nodes in memory, or fails every create
#[derive(Default)]
pub struct MemoryBlobStore {
    nodes: Mutex<HashMap<String, Vec<u8>>>,
    failure: Option<RemoteError>,
}

impl MemoryBlobStore {
    pub fn failing(err: RemoteError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_node(&self, parent_id: &str, name: &str, content: &[u8]) -> RemoteResult<ArchivalReference> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let node_id = format!("{parent_id}-{name}");
        self.nodes
            .lock()
            .unwrap()
            .insert(node_id.clone(), content.to_vec());
        Ok(RemoteResponse::created(ArchivalReference {
            node_id,
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            location: None,
            size: content.len() as u64,
            checksum: String::new(),
        }))
    }

    async fn get_content(&self, node_id: &str) -> RemoteResult<Vec<u8>> {
        self.nodes
            .lock()
            .unwrap()
            .get(node_id)
            .cloned()
            .map(RemoteResponse::ok)
            .ok_or_else(|| not_found("blob-store", "node"))
    }

    async fn delete_node(&self, node_id: &str) -> RemoteResult<()> {
        self.nodes.lock().unwrap().remove(node_id);
        Ok(RemoteResponse::new(204, ()))
    }
}

/// Rules engine approving facts that carry `"age" >= 18`
pub struct AgeRules;

#[async_trait]
impl RulesEngine for AgeRules {
    async fn evaluate(&self, ruleset: &str, facts: &Value) -> RemoteResult<Value> {
        if ruleset != "adult" {
            return Err(not_found("rules-engine", "rule set"));
        }
        let approved = facts.get("age").and_then(Value::as_u64).unwrap_or(0) >= 18;
        Ok(RemoteResponse::ok(json!({ "approved": approved })))
    }
}

/// Indexer that is always unavailable
pub struct DownIndexer;

#[async_trait]
impl Indexer for DownIndexer {
    async fn index_document(&self, _index: &str, _id: &str, _document: &Value) -> RemoteResult<Value> {
        Err(RemoteError::CircuitOpen {
            service: "indexer".into(),
        })
    }

    async fn search(&self, _index: &str, _query: &Value) -> RemoteResult<Value> {
        Err(RemoteError::Transport {
            service: "indexer".into(),
            message: "connection refused".into(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub object_store: Arc<MemoryObjectStore>,
    pub blob_store: Arc<MemoryBlobStore>,
}

pub fn test_app_with(blob_store: MemoryBlobStore, import: ImportConfig) -> TestApp {
    let object_store = Arc::new(MemoryObjectStore::default());
    let blob_store = Arc::new(blob_store);

    let features = FeatureState {
        object_store: object_store.clone(),
        blob_store: blob_store.clone(),
        rules: Arc::new(AgeRules),
        indexer: Arc::new(DownIndexer),
        importer: CustomerImporter::new(object_store.clone(), blob_store.clone(), import),
    };
    let state = AppState {
        features,
        backends: vec![],
    };

    TestApp {
        router: create_router(state, &Config::default()),
        object_store,
        blob_store,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(MemoryBlobStore::default(), ImportConfig::default())
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn text_request(method: &str, uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "text/csv")
        .body(Body::from(body.into()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
