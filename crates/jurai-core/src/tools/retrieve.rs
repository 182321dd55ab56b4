use crate::constants::defaults;
use crate::error::JuraiError;
use crate::tools::traits::{Tool, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// One passage returned by a retrieval backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
    }
}

/// Legal-text retrieval backend: top-`k` passages for a query, best first.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>, JuraiError>;
}

/// In-memory retriever ranking passages by how many distinct query terms
/// they contain. Ties keep corpus order.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    documents: Vec<RetrievedDocument>,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of `{content, metadata}` objects.
    pub fn from_file(path: &Path) -> Result<Self, JuraiError> {
        let raw = std::fs::read_to_string(path)?;
        let documents: Vec<RetrievedDocument> = serde_json::from_str(&raw)?;
        tracing::info!("Loaded {} passages from {}", documents.len(), path.display());
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait::async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>, JuraiError> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, &RetrievedDocument)> = self
            .documents
            .iter()
            .map(|doc| (terms(&doc.content).intersection(&query_terms).count(), doc))
            .filter(|(score, _)| *score > 0)
            .collect();
        // stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, doc)| doc.clone()).collect())
    }
}

/// `naiverag_retrieve`: fetches legal/regulatory passages for the agent.
pub struct RetrieveTool {
    retriever: Arc<dyn Retriever>,
    k: usize,
}

impl RetrieveTool {
    pub const NAME: &'static str = "naiverag_retrieve";

    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            k: defaults::RETRIEVAL_K,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

#[async_trait::async_trait]
impl Tool for RetrieveTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Retrieve legal/regulatory text relevant to the query."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query for legal documents."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> ToolResult {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JuraiError::tool(Self::NAME, "Missing required parameter: query"))?;

        tracing::debug!("Querying for: '{query}'");
        let documents = self
            .retriever
            .retrieve(query, self.k)
            .await
            .map_err(|e| JuraiError::tool(Self::NAME, e.to_string()))?;

        let joined = documents
            .iter()
            .map(|doc| format!("Source: {}\nContent: {}", doc.source(), doc.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Value::String(joined))
    }
}
