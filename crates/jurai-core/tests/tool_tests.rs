use jurai_core::tools::{KeywordRetriever, RetrieveTool, RetrievedDocument, Retriever};
use jurai_core::{JuraiError, Tool, ToolRegistry};
use std::sync::Arc;

fn corpus() -> Vec<RetrievedDocument> {
    vec![
        RetrievedDocument::new(
            "GDPR Article 8: processing the personal data of a child below 16 requires parental consent.",
            "GDPR",
        ),
        RetrievedDocument::new(
            "DSA Article 28: online platforms accessible to minors shall ensure a high level of privacy.",
            "DSA",
        ),
        RetrievedDocument::new("California SB 976 restricts addictive feeds for minors.", "CA SB976"),
    ]
}

#[tokio::test]
async fn test_keyword_retriever_ranks_by_overlap() {
    let retriever = KeywordRetriever::new(corpus());

    let docs = retriever.retrieve("personal data of a child, parental consent", 2).await.unwrap();
    assert_eq!(docs[0].source(), "GDPR");

    let docs = retriever.retrieve("minors privacy platforms", 3).await.unwrap();
    assert_eq!(docs[0].source(), "DSA");
    assert_eq!(docs.len(), 2);

    assert!(retriever.retrieve("zzz", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retrieve_tool_formats_sources() {
    let tool = RetrieveTool::new(Arc::new(KeywordRetriever::new(corpus()))).with_k(1);
    assert_eq!(tool.name(), "naiverag_retrieve");
    assert_eq!(tool.to_definition().parameters["required"][0], "query");

    let out = tool
        .execute(serde_json::json!({"query": "minors feeds California"}))
        .await
        .unwrap();
    let text = out.as_str().unwrap();
    assert!(text.starts_with("Source: CA SB976\nContent: California SB 976"));
    assert!(!text.contains("\n\n"), "k = 1 returns a single passage");
}

#[tokio::test]
async fn test_retrieve_tool_joins_passages_with_blank_line() {
    let tool = RetrieveTool::new(Arc::new(KeywordRetriever::new(corpus())));
    let out = tool
        .execute(serde_json::json!({"query": "Article minors"}))
        .await
        .unwrap();
    assert_eq!(out.as_str().unwrap().matches("Source: ").count(), 3);
    assert!(out.as_str().unwrap().contains("\n\nSource: "));
}

#[tokio::test]
async fn test_retrieve_tool_requires_query() {
    let tool = RetrieveTool::new(Arc::new(KeywordRetriever::default()));
    let err = tool.execute(serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, JuraiError::Tool { .. }));
}

#[tokio::test]
async fn test_document_without_source_is_unknown() {
    let doc: RetrievedDocument = serde_json::from_str(r#"{"content": "Art. 5"}"#).unwrap();
    assert_eq!(doc.source(), "unknown");
}

#[test]
fn test_corpus_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corpus.json");
    std::fs::write(&path, serde_json::to_string(&corpus()).unwrap()).unwrap();

    let retriever = KeywordRetriever::from_file(&path).unwrap();
    assert_eq!(retriever.len(), 3);
}

#[test]
fn test_registry_rejects_duplicate_names() {
    let retriever: Arc<dyn Retriever> = Arc::new(KeywordRetriever::default());
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RetrieveTool::new(retriever.clone()))).unwrap();

    let err = registry.register(Box::new(RetrieveTool::new(retriever))).unwrap_err();
    assert!(matches!(err, JuraiError::Config(_)));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.definitions()[0].name, "naiverag_retrieve");
    assert!(registry.get("naiverag_retrieve").is_some());
    assert!(registry.get("searxng_search").is_none());
}
