//! Build pipeline against the in-memory graph store.

mod common;

use std::sync::Arc;

use common::{HashEmbedder, Reply, ScriptedLlm, RELATIONSHIP_MARKER};
use kgrag_core::extraction::{normalize_id, BuildOptions, ExtractionSchema, GraphBuilder, GraphExtractor};
use kgrag_core::{ErrorKind, GraphDocument, GraphStore, GraphTriple, Node, PropertyValue, VectorIndexConfig};
use kgrag_graph_stores::MemoryGraphStore;

const TEXT: &str = "Steve Jobs founded Apple in California.";
const DIMS: usize = 8;

fn schema() -> ExtractionSchema {
    ExtractionSchema::new(["Person", "Organization", "Location"], ["FOUNDED", "LOCATED_IN"])
}

/// Model that finds Steve Jobs, Apple and California.
fn apple_llm() -> ScriptedLlm {
    ScriptedLlm::new()
        .on(
            RELATIONSHIP_MARKER,
            r#"{"relationships": [{"source": "steve jobs", "target": "Apple", "type": "FOUNDED", "time": "1976"}]}"#,
        )
        .on(&ScriptedLlm::node_marker("Person"), r#"{"nodes": [{"id": "Steve Jobs", "type": "Person"}]}"#)
        .on(&ScriptedLlm::node_marker("Organization"), r#"{"nodes": [{"id": "Apple"}]}"#)
        .on(
            &ScriptedLlm::node_marker("Location"),
            "```json\n{\"nodes\": [{\"id\": \"California\"}]}\n```",
        )
}

fn builder(llm: ScriptedLlm, embedder: HashEmbedder, store: Arc<MemoryGraphStore>) -> GraphBuilder {
    let extractor = GraphExtractor::new(Arc::new(llm), schema());
    GraphBuilder::new(extractor, Arc::new(embedder), store)
}

#[tokio::test]
async fn test_build_from_text() {
    let store = Arc::new(MemoryGraphStore::new());
    let report = builder(apple_llm(), HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(report.sections, 1);
    assert_eq!(report.extracted_nodes, 3);
    assert_eq!(report.merged_nodes, 3);
    assert_eq!(report.valid_relationships, 1);
    assert_eq!(report.written_relationships, 1);
    assert_eq!(report.embedded_nodes, 3);
    assert_eq!(report.dimensions, Some(DIMS));
    assert!(report.index_ready);

    // Endpoints are rewritten to the stored ids
    assert_eq!(
        store.triples().unwrap(),
        vec![GraphTriple::new("Steve Jobs", "FOUNDED", "Apple")]
    );
    let props = store
        .relationship_properties("Steve Jobs", "FOUNDED", "Apple")
        .unwrap()
        .unwrap();
    assert_eq!(props.get("time"), Some(&PropertyValue::String("1976".into())));

    assert_eq!(
        store.node_ids_with_label("Entity").unwrap(),
        vec!["Apple", "California", "Steve Jobs"]
    );
    assert_eq!(store.node_ids_with_label("Person").unwrap(), vec!["Steve Jobs"]);
    let mut keys: Vec<String> = store
        .node_ids_with_label("Entity")
        .unwrap()
        .iter()
        .map(|id| normalize_id(id))
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["apple", "california", "steve jobs"]);

    let props = store.node_properties("Apple").unwrap().unwrap();
    assert_eq!(props.get("name"), Some(&PropertyValue::String("Apple".into())));
    assert_eq!(
        store.vector("Apple", "embedding").unwrap(),
        Some(HashEmbedder::vector("Apple", DIMS))
    );
    assert_eq!(store.vector_index_dimensions("entity_index").await.unwrap(), Some(DIMS));
}

#[tokio::test]
async fn test_build_is_idempotent() {
    let store = Arc::new(MemoryGraphStore::new());
    let builder = builder(apple_llm(), HashEmbedder::new(DIMS), store.clone());
    builder.build_from_text(TEXT).await.unwrap();
    builder.build_from_text(TEXT).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.relationships, 1);
    assert_eq!(stats.embedded_nodes, 3);
}

#[tokio::test]
async fn test_unparseable_type_contributes_nothing() {
    let llm = ScriptedLlm::new()
        .on(&ScriptedLlm::node_marker("Person"), "I could not find any people, sorry.")
        .on(&ScriptedLlm::node_marker("Organization"), r#"{"nodes": [{"id": "Apple"}]}"#)
        .on(&ScriptedLlm::node_marker("Location"), r#"{"nodes": [{"id": "California"}]}"#);
    let store = Arc::new(MemoryGraphStore::new());
    let report = builder(llm, HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(report.merged_nodes, 2);
    assert!(store.node_ids_with_label("Person").unwrap().is_empty());
    assert_eq!(store.node_ids_with_label("Organization").unwrap(), vec!["Apple"]);
}

#[tokio::test]
async fn test_rate_limited_type_is_skipped() {
    let llm = ScriptedLlm::new()
        .on_reply(&ScriptedLlm::node_marker("Location"), Reply::ProviderError)
        .on(&ScriptedLlm::node_marker("Person"), r#"{"nodes": [{"id": "Steve Jobs"}]}"#)
        .on(&ScriptedLlm::node_marker("Organization"), r#"{"nodes": [{"id": "Apple"}]}"#);
    let store = Arc::new(MemoryGraphStore::new());
    let report = builder(llm, HashEmbedder::new(DIMS), store)
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(report.merged_nodes, 2);
}

#[tokio::test]
async fn test_missing_credentials_abort_the_build() {
    let llm = ScriptedLlm::new().on_reply(&ScriptedLlm::node_marker("Person"), Reply::MissingKey);
    let store = Arc::new(MemoryGraphStore::new());
    let err = builder(llm, HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(store.stats().await.unwrap().nodes, 0);
}

#[tokio::test]
async fn test_unreachable_provider_aborts_after_extraction_started() {
    let llm = ScriptedLlm::new()
        .on_reply(RELATIONSHIP_MARKER, Reply::Unreachable)
        .on(&ScriptedLlm::node_marker("Person"), r#"{"nodes": [{"id": "Steve Jobs"}]}"#);
    let store = Arc::new(MemoryGraphStore::new());
    let err = builder(llm, HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(!err.is_item_recoverable());
    assert_eq!(store.stats().await.unwrap().nodes, 0);
}

#[tokio::test]
async fn test_requested_type_overrides_model_type() {
    let llm = ScriptedLlm::new().on(
        &ScriptedLlm::node_marker("Organization"),
        r#"{"nodes": [{"id": "Apple", "type": "Fruit"}]}"#,
    );
    let store = Arc::new(MemoryGraphStore::new());
    builder(llm, HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(store.node_ids_with_label("Organization").unwrap(), vec!["Apple"]);
    assert!(store.node_ids_with_label("Fruit").unwrap().is_empty());
}

#[tokio::test]
async fn test_cross_type_duplicates_merge_first_wins() {
    let llm = ScriptedLlm::new()
        .on(
            &ScriptedLlm::node_marker("Person"),
            r#"{"nodes": [{"id": "Steve Jobs"}, {"id": "Apple"}]}"#,
        )
        .on(&ScriptedLlm::node_marker("Organization"), r#"{"nodes": [{"id": " apple "}]}"#);
    let store = Arc::new(MemoryGraphStore::new());
    let report = builder(llm, HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(report.extracted_nodes, 3);
    assert_eq!(report.merged_nodes, 2);
    assert_eq!(
        store.node_ids_with_label("Person").unwrap(),
        vec!["Apple", "Steve Jobs"]
    );
    assert!(store.node_ids_with_label("Organization").unwrap().is_empty());
}

#[tokio::test]
async fn test_relationship_to_unknown_node_is_dropped() {
    let llm = ScriptedLlm::new()
        .on(
            RELATIONSHIP_MARKER,
            r#"{"relationships": [
                {"source": "Steve Jobs", "target": "Apple", "type": "FOUNDED"},
                {"source": "Steve Wozniak", "target": "Apple", "type": "FOUNDED"},
                {"source": "Apple", "type": "LOCATED_IN"}
            ]}"#,
        )
        .on(&ScriptedLlm::node_marker("Person"), r#"{"nodes": [{"id": "Steve Jobs"}]}"#)
        .on(&ScriptedLlm::node_marker("Organization"), r#"{"nodes": [{"id": "Apple"}]}"#);
    let store = Arc::new(MemoryGraphStore::new());
    let report = builder(llm, HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    // The entry without a target never becomes a relationship
    assert_eq!(report.extracted_relationships, 2);
    assert_eq!(report.valid_relationships, 1);
    assert_eq!(report.dropped_relationships, 1);
    assert_eq!(
        store.triples().unwrap(),
        vec![GraphTriple::new("Steve Jobs", "FOUNDED", "Apple")]
    );
}

#[tokio::test]
async fn test_single_node_skips_relationship_call() {
    let llm = Arc::new(
        ScriptedLlm::new().on(&ScriptedLlm::node_marker("Organization"), r#"{"nodes": [{"id": "Apple"}]}"#),
    );
    let store = Arc::new(MemoryGraphStore::new());
    let extractor = GraphExtractor::new(llm.clone(), schema());
    GraphBuilder::new(extractor, Arc::new(HashEmbedder::new(DIMS)), store)
        .build_from_text(TEXT)
        .await
        .unwrap();

    // One call per node type, none for relationships
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_mismatched_vector_is_dropped() {
    let store = Arc::new(MemoryGraphStore::new());
    let embedder = HashEmbedder::new(DIMS).with_short("California");
    let report = builder(apple_llm(), embedder, store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(report.embedded_nodes, 2);
    assert_eq!(report.dimension_mismatches, 1);
    assert_eq!(report.dimensions, Some(DIMS));
    assert_eq!(store.vector("California", "embedding").unwrap(), None);
    // Still stored, just not searchable
    assert_eq!(store.node_ids_with_label("Location").unwrap(), vec!["California"]);
    assert!(!store.node_ids_with_label("Entity").unwrap().contains(&"California".to_string()));
}

#[tokio::test]
async fn test_embedding_failure_keeps_node() {
    let store = Arc::new(MemoryGraphStore::new());
    let embedder = HashEmbedder::new(DIMS).with_failing("Apple");
    let report = builder(apple_llm(), embedder, store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert_eq!(report.embedding_failures, 1);
    assert_eq!(report.embedded_nodes, 2);
    assert_eq!(report.written_relationships, 1);
    assert!(store.node_properties("Apple").unwrap().is_some());
    assert_eq!(store.vector("Apple", "embedding").unwrap(), None);
}

#[tokio::test]
async fn test_conflicting_index_is_left_alone() {
    let store = Arc::new(MemoryGraphStore::new());
    store
        .create_vector_index(&VectorIndexConfig::default().with_dimensions(16))
        .await
        .unwrap();

    let report = builder(apple_llm(), HashEmbedder::new(DIMS), store.clone())
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert!(!report.index_ready);
    assert_eq!(report.embedded_nodes, 3);
    assert_eq!(store.vector_index_dimensions("entity_index").await.unwrap(), Some(16));
}

#[tokio::test]
async fn test_reset_wipes_previous_graph() {
    let store = Arc::new(MemoryGraphStore::new());
    store
        .add_graph_document(&GraphDocument::new(vec![Node::new("Old Corp", "Organization")], vec![]))
        .await
        .unwrap();
    store
        .create_vector_index(&VectorIndexConfig::default().with_dimensions(16))
        .await
        .unwrap();

    let report = builder(apple_llm(), HashEmbedder::new(DIMS), store.clone())
        .with_options(BuildOptions {
            reset: true,
            ..Default::default()
        })
        .build_from_text(TEXT)
        .await
        .unwrap();

    assert!(report.index_ready);
    assert!(store.node_properties("Old Corp").unwrap().is_none());
    assert_eq!(store.stats().await.unwrap().nodes, 3);
    assert_eq!(store.vector_index_dimensions("entity_index").await.unwrap(), Some(DIMS));
}

#[tokio::test]
async fn test_build_from_document_skips_short_sections() {
    let long = format!("Steve Jobs founded Apple in California. {}", "More history. ".repeat(30));
    let short = format!("Apple has offices. {}", "x".repeat(200));
    let document = format!("### Founding\n{}\n### Offices\n{}\n", long, short);

    let llm = Arc::new(apple_llm());
    let store = Arc::new(MemoryGraphStore::new());
    let extractor = GraphExtractor::new(llm.clone(), schema());
    let report = GraphBuilder::new(extractor, Arc::new(HashEmbedder::new(DIMS)), store.clone())
        .with_options(BuildOptions {
            min_section_chars: 250,
            ..Default::default()
        })
        .build_from_document(&document)
        .await
        .unwrap();

    assert_eq!(report.sections, 1);
    assert_eq!(report.sections_skipped, 1);
    assert_eq!(store.triples().unwrap().len(), 1);

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts
        .iter()
        .all(|messages| messages.last().unwrap().content.contains("SECTION: Founding")));
}
