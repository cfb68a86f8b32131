//! Blob store facade
//!
//! Stores opaque byte payloads as "nodes" beneath a parent node. Relay uses it
//! to archive import payloads verbatim and to proxy file uploads/downloads.

use async_trait::async_trait;
use relay_common::checksum::{compute_bytes_checksum, verify_checksum};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{HttpBackend, RemoteResponse, RemoteResult};

/// Where a payload ended up in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivalReference {
    pub node_id: String,
    pub name: String,
    pub parent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub size: u64,
    /// SHA-256 of the bytes that were sent
    pub checksum: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create a child node of `parent_id` named `name` holding `content`
    async fn create_node(
        &self,
        parent_id: &str,
        name: &str,
        content: &[u8],
    ) -> RemoteResult<ArchivalReference>;

    async fn get_content(&self, node_id: &str) -> RemoteResult<Vec<u8>>;

    async fn delete_node(&self, node_id: &str) -> RemoteResult<()>;
}

/// Node entry as returned by the blob store
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeEntry {
    id: String,
    name: String,
    parent_id: Option<String>,
    location: Option<String>,
    size: Option<u64>,
    checksum: Option<String>,
}

/// JSON-over-HTTP blob store client
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    backend: HttpBackend,
}

impl HttpBlobStore {
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &HttpBackend {
        &self.backend
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(skip(self, content), fields(service = %self.backend.service(), size = content.len()))]
    async fn create_node(
        &self,
        parent_id: &str,
        name: &str,
        content: &[u8],
    ) -> RemoteResult<ArchivalReference> {
        let url = self.backend.url(&["nodes", parent_id, "children"]);
        let checksum = compute_bytes_checksum(content);

        let response = self
            .backend
            .send_json(|c| {
                c.post(&url)
                    .query(&[("name", name)])
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(content.to_vec())
            })
            .await?;
        let RemoteResponse { status, body } = self.backend.decode::<NodeEntry>(response)?;

        // A store that echoes a digest must agree with what we sent
        if let Some(ref remote) = body.checksum {
            verify_checksum(content, remote)
                .map_err(|e| self.backend.decode_error(e))?;
        }

        debug!(node_id = %body.id, "Blob node created");

        Ok(RemoteResponse::new(
            status,
            ArchivalReference {
                node_id: body.id,
                name: body.name,
                parent_id: body.parent_id.unwrap_or_else(|| parent_id.to_string()),
                location: body.location,
                size: body.size.unwrap_or(content.len() as u64),
                checksum,
            },
        ))
    }

    #[instrument(skip(self), fields(service = %self.backend.service()))]
    async fn get_content(&self, node_id: &str) -> RemoteResult<Vec<u8>> {
        let url = self.backend.url(&["nodes", node_id, "content"]);
        self.backend.send(|c| c.get(&url)).await
    }

    #[instrument(skip(self), fields(service = %self.backend.service()))]
    async fn delete_node(&self, node_id: &str) -> RemoteResult<()> {
        let url = self.backend.url(&["nodes", node_id]);
        let response = self.backend.send(|c| c.delete(&url)).await?;
        Ok(response.map(|_| ()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clients::RemoteError;
    use crate::config::{BackendEndpoint, ResilienceConfig};
    use serde_json::json;
    use wiremock::{
        matchers::{body_bytes, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const PAYLOAD: &[u8] = b"\"1\",\"John\",\"Doe\",24,\"1234 Main St\"\n";

    fn blob_store(server: &MockServer) -> HttpBlobStore {
        let backend = HttpBackend::new(
            "blob-store",
            &BackendEndpoint {
                url: server.uri(),
                api_key: Some("secret".to_string()),
            },
            &ResilienceConfig {
                max_retries: 0,
                ..ResilienceConfig::default()
            },
        )
        .unwrap();
        HttpBlobStore::new(backend)
    }

    #[tokio::test]
    async fn test_create_node_sends_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nodes/imports/children"))
            .and(query_param("name", "customers.csv"))
            .and(header("authorization", "Bearer secret"))
            .and(body_bytes(PAYLOAD))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "node-42",
                "name": "customers.csv",
                "parentId": "imports",
                "location": "/archive/customers.csv"
            })))
            .mount(&server)
            .await;

        let response = blob_store(&server)
            .create_node("imports", "customers.csv", PAYLOAD)
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        let reference = response.body;
        assert_eq!(reference.node_id, "node-42");
        assert_eq!(reference.parent_id, "imports");
        assert_eq!(reference.size, PAYLOAD.len() as u64);
        assert_eq!(
            reference.checksum,
            compute_bytes_checksum(PAYLOAD)
        );
    }

    #[tokio::test]
    async fn test_create_node_rejects_checksum_disagreement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nodes/imports/children"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "node-42",
                "name": "customers.csv",
                "checksum": "00"
            })))
            .mount(&server)
            .await;

        let err = blob_store(&server)
            .create_node("imports", "customers.csv", PAYLOAD)
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_get_content_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nodes/node-42/content"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PAYLOAD))
            .mount(&server)
            .await;

        let response = blob_store(&server).get_content("node-42").await.unwrap();
        assert_eq!(response.body, PAYLOAD);
    }
}
