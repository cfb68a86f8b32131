//! Rules engine facade

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{HttpBackend, RemoteResult};

#[async_trait]
pub trait RulesEngine: Send + Sync {
    /// Evaluate `facts` against the named rule set and return the verdict document
    async fn evaluate(&self, ruleset: &str, facts: &Value) -> RemoteResult<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpRulesEngine {
    backend: HttpBackend,
}

impl HttpRulesEngine {
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &HttpBackend {
        &self.backend
    }
}

#[async_trait]
impl RulesEngine for HttpRulesEngine {
    #[instrument(skip(self, facts), fields(service = %self.backend.service()))]
    async fn evaluate(&self, ruleset: &str, facts: &Value) -> RemoteResult<Value> {
        let url = self.backend.url(&["rulesets", ruleset, "evaluate"]);
        self.backend.send_json(|c| c.post(&url).json(facts)).await
    }
}
