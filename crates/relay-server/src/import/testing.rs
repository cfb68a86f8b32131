//! In-memory facades for pipeline tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::clients::{
    ArchivalReference, BlobStore, ObjectStore, RemoteError, RemoteResponse, RemoteResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Distinct,
    Insert(String),
    Replace(String),
}

/// Object store holding documents in a map; `get_distinct` reads its keys
#[derive(Default)]
pub struct FakeObjectStore {
    documents: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<StoreCall>>,
    failures: HashMap<String, RemoteError>,
    distinct_failure: Option<RemoteError>,
}

impl FakeObjectStore {
    pub fn with_ids(ids: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut docs = store.documents.lock().unwrap();
            for id in ids {
                docs.insert(id.to_string(), Value::Null);
            }
        }
        store
    }

    /// Writes for `id` fail with `err`
    pub fn failing_on(mut self, id: &str, err: RemoteError) -> Self {
        self.failures.insert(id.to_string(), err);
        self
    }

    pub fn failing_distinct(mut self, err: RemoteError) -> Self {
        self.distinct_failure = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, StoreCall::Distinct))
            .count()
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    fn write(&self, call: StoreCall, id: &str, payload: &Value) -> RemoteResult<Value> {
        self.calls.lock().unwrap().push(call);
        if let Some(err) = self.failures.get(id) {
            return Err(err.clone());
        }
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), payload.clone());
        Ok(RemoteResponse::ok(payload.clone()))
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_distinct(
        &self,
        _db: &str,
        _collection: &str,
        _field: &str,
        _filter: &Value,
    ) -> RemoteResult<HashSet<String>> {
        self.calls.lock().unwrap().push(StoreCall::Distinct);
        if let Some(err) = &self.distinct_failure {
            return Err(err.clone());
        }
        let ids = self.documents.lock().unwrap().keys().cloned().collect();
        Ok(RemoteResponse::ok(ids))
    }

    async fn insert(
        &self,
        _db: &str,
        _collection: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<Value> {
        self.write(StoreCall::Insert(id.to_string()), id, payload)
            .map(|r| RemoteResponse::created(r.body))
    }

    async fn replace(
        &self,
        _db: &str,
        _collection: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<Value> {
        self.write(StoreCall::Replace(id.to_string()), id, payload)
    }

    async fn get(&self, _db: &str, _collection: &str, id: &str) -> RemoteResult<Value> {
        self.document(id).map(RemoteResponse::ok).ok_or_else(|| RemoteError::Status {
            service: "object-store".into(),
            status: 404,
            detail: format!("document {id} not found"),
        })
    }

    async fn delete(&self, _db: &str, _collection: &str, id: &str) -> RemoteResult<()> {
        self.documents.lock().unwrap().remove(id);
        Ok(RemoteResponse::new(204, ()))
    }

    async fn query(&self, _db: &str, _collection: &str, _filter: &Value) -> RemoteResult<Vec<Value>> {
        Ok(RemoteResponse::ok(
            self.documents.lock().unwrap().values().cloned().collect(),
        ))
    }
}

/// Blob store remembering what was archived
#[derive(Default)]
pub struct FakeBlobStore {
    nodes: Mutex<Vec<(String, String, Vec<u8>)>>,
    failure: Option<RemoteError>,
}

impl FakeBlobStore {
    pub fn failing(err: RemoteError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    /// (parent, name, content) of every created node
    pub fn nodes(&self) -> Vec<(String, String, Vec<u8>)> {
        self.nodes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn create_node(
        &self,
        parent_id: &str,
        name: &str,
        content: &[u8],
    ) -> RemoteResult<ArchivalReference> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut nodes = self.nodes.lock().unwrap();
        nodes.push((parent_id.to_string(), name.to_string(), content.to_vec()));
        Ok(RemoteResponse::created(ArchivalReference {
            node_id: format!("node-{}", nodes.len()),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            location: None,
            size: content.len() as u64,
            checksum: String::new(),
        }))
    }

    async fn get_content(&self, node_id: &str) -> RemoteResult<Vec<u8>> {
        let nodes = self.nodes.lock().unwrap();
        let index: usize = node_id
            .trim_start_matches("node-")
            .parse()
            .map_err(|_| RemoteError::Status {
                service: "blob-store".into(),
                status: 404,
                detail: "no such node".into(),
            })?;
        nodes
            .get(index.saturating_sub(1))
            .map(|(_, _, content)| RemoteResponse::ok(content.clone()))
            .ok_or_else(|| RemoteError::Status {
                service: "blob-store".into(),
                status: 404,
                detail: "no such node".into(),
            })
    }

    async fn delete_node(&self, _node_id: &str) -> RemoteResult<()> {
        Ok(RemoteResponse::new(204, ()))
    }
}
