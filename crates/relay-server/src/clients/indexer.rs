//! Search indexer facade

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{HttpBackend, RemoteResult};

#[async_trait]
pub trait Indexer: Send + Sync {
    /// Create or overwrite the document `id` in `index`
    async fn index_document(&self, index: &str, id: &str, document: &Value) -> RemoteResult<Value>;

    /// Run a search query and return the indexer's result document as-is
    async fn search(&self, index: &str, query: &Value) -> RemoteResult<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpIndexer {
    backend: HttpBackend,
}

impl HttpIndexer {
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &HttpBackend {
        &self.backend
    }
}

#[async_trait]
impl Indexer for HttpIndexer {
    #[instrument(skip(self, document), fields(service = %self.backend.service()))]
    async fn index_document(&self, index: &str, id: &str, document: &Value) -> RemoteResult<Value> {
        let url = self.backend.url(&["indexes", index, "docs", id]);
        self.backend.send_json(|c| c.put(&url).json(document)).await
    }

    #[instrument(skip(self, query), fields(service = %self.backend.service()))]
    async fn search(&self, index: &str, query: &Value) -> RemoteResult<Value> {
        let url = self.backend.url(&["indexes", index, "search"]);
        self.backend.send_json(|c| c.post(&url).json(query)).await
    }
}
