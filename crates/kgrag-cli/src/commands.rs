use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use kgrag_core::extraction::{
    BuildOptions, ExtractionSchema, GraphBuilder, GraphExtractor, VectorIndexer,
};
use kgrag_core::retrieval::{
    GraphRag, NeighborhoodRetriever, Retriever, Text2CypherRetriever, VectorRetriever,
};
use kgrag_core::{Embedder, GraphStore, KgConfig, Llm};
use kgrag_embeddings::EmbedderFactory;
use kgrag_graph_stores::GraphStoreFactory;
use kgrag_llm::LlmFactory;

use crate::cli::{AskArgs, BuildArgs, EmbedArgs, SetupArgs};

/// Load the config file if given, then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<KgConfig> {
    let config = match path {
        Some(path) => KgConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
            .with_env_overrides(std::env::vars())?,
        None => KgConfig::from_env()?,
    };
    Ok(config)
}

/// Resolve a schema preset name or a schema file path.
pub fn resolve_schema(name_or_path: &str) -> Result<ExtractionSchema> {
    if let Some(schema) = ExtractionSchema::preset(name_or_path) {
        return Ok(schema);
    }
    let path = Path::new(name_or_path);
    if path.exists() {
        return ExtractionSchema::from_file(path)
            .with_context(|| format!("Invalid schema file {}", path.display()));
    }
    bail!(
        "Unknown schema '{}': use a preset (business, case-file) or a schema file",
        name_or_path
    )
}

/// Print a result either as pretty JSON or with the given text renderer.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

async fn connect_store(config: &KgConfig) -> Result<Arc<dyn GraphStore>> {
    let store = GraphStoreFactory::create(config.graph_store.clone()).await?;
    store
        .verify_connectivity()
        .await
        .context("Graph store is not reachable")?;
    Ok(store)
}

fn embedder(config: &KgConfig) -> Result<Arc<dyn Embedder>> {
    Ok(EmbedderFactory::from_config(&config.embedder)?)
}

fn llm(config: &KgConfig) -> Result<Arc<dyn Llm>> {
    Ok(LlmFactory::from_config(&config.llm)?)
}

pub async fn build(config: &KgConfig, args: BuildArgs, json: bool) -> Result<()> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(file)) => std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => bail!("Nothing to build from: pass TEXT or --file"),
    };
    let schema = resolve_schema(&args.schema)?;
    info!(
        nodes = ?schema.node_labels(),
        relationships = ?schema.relationship_names(),
        "Using schema"
    );

    let store = connect_store(config).await?;
    let extractor = GraphExtractor::new(llm(config)?, schema).with_config(config.pipeline.extractor.clone());
    let options = BuildOptions {
        reset: args.reset,
        embed_delay: Duration::from_millis(config.pipeline.embed_delay_ms),
        min_section_chars: config.pipeline.min_section_chars,
        index_name: config.index.name.clone(),
        similarity: config.index.similarity,
    };
    let builder = GraphBuilder::new(extractor, embedder(config)?, store).with_options(options);

    let report = if args.sections {
        builder.build_from_document(&text).await?
    } else {
        builder.build_from_text(&text).await?
    };
    if !report.index_ready {
        warn!("Vector index is not usable; run `kgrag setup --recreate`");
    }

    emit(json, &report, |r| {
        format!(
            "Sections: {} ({} skipped)\n\
             Nodes: {} extracted, {} after merge, {} embedded ({} failed, {} dimension mismatches)\n\
             Relationships: {} extracted, {} valid, {} dropped, {} written\n\
             Index ready: {}",
            r.sections,
            r.sections_skipped,
            r.extracted_nodes,
            r.merged_nodes,
            r.embedded_nodes,
            r.embedding_failures,
            r.dimension_mismatches,
            r.extracted_relationships,
            r.valid_relationships,
            r.dropped_relationships,
            r.written_relationships,
            r.index_ready
        )
    })
}

pub async fn ask(config: &KgConfig, args: AskArgs, json: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let llm = llm(config)?;
    let retriever: Arc<dyn Retriever> = if args.cypher {
        let schema = resolve_schema(&args.schema)?;
        Arc::new(Text2CypherRetriever::new(store, llm.clone(), schema.graph_schema()))
    } else {
        let vector = VectorRetriever::new(store, embedder(config)?, config.index.name.clone())
            .with_return_properties(args.properties);
        if args.no_neighbors {
            Arc::new(vector)
        } else {
            Arc::new(NeighborhoodRetriever::new(vector))
        }
    };

    let answer = GraphRag::new(retriever, llm)
        .search(&args.question, args.top_k, args.show_context || json)
        .await?;

    emit(json, &answer, |a| match &a.context {
        Some(context) if args.show_context => {
            let cypher = context
                .cypher
                .as_ref()
                .map(|c| format!("--- Cypher ---\n{}\n\n", c))
                .unwrap_or_default();
            format!("{}\n\n{}--- Context ---\n{}", a.answer, cypher, context.render())
        }
        _ => a.answer.clone(),
    })
}

pub async fn embed(config: &KgConfig, args: EmbedArgs, json: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let mut index = config.index.clone();
    if let Some(label) = args.label {
        index.label = label;
    }
    if let Some(property) = args.vector_property {
        index.property = property;
    }
    if let Some(name) = args.index {
        index.name = name;
    }

    let report = VectorIndexer::new(embedder(config)?, store)
        .with_delay(Duration::from_millis(config.pipeline.embed_delay_ms))
        .run(&index, &args.text_property)
        .await?;

    emit(json, &report, |r| {
        format!(
            "Pending: {}\nEmbedded: {}\nFailed: {}\nDimension mismatches: {}\nIndex created: {}",
            r.pending, r.embedded, r.failed, r.dimension_mismatches, r.index_created
        )
    })
}

#[derive(Serialize)]
struct SetupReport {
    index: String,
    dimensions: usize,
    recreated: bool,
    constraints: Vec<String>,
}

pub async fn setup(config: &KgConfig, args: SetupArgs, json: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let dimensions = match args.dims {
        Some(dims) => dims,
        None => embedder(config)?.dimension(),
    };
    let index = config.index.clone().with_dimensions(dimensions);

    if args.recreate {
        info!(index = %index.name, "Dropping vector index");
        store.drop_index(&index.name).await?;
    } else if let Some(existing) = store.vector_index_dimensions(&index.name).await? {
        if existing != dimensions {
            error!(
                index = %index.name,
                existing,
                wanted = dimensions,
                "Vector index exists with different dimensions; pass --recreate to replace it"
            );
        }
    }
    store.create_vector_index(&index).await?;

    for label in &args.constraints {
        store.create_unique_constraint(label, "id").await?;
    }

    let report = SetupReport {
        index: index.name.clone(),
        dimensions: store
            .vector_index_dimensions(&index.name)
            .await?
            .unwrap_or(dimensions),
        recreated: args.recreate,
        constraints: args.constraints,
    };
    emit(json, &report, |r| {
        format!(
            "Index {} ready with {} dimensions\nUnique id constraints: {}",
            r.index,
            r.dimensions,
            r.constraints.join(", ")
        )
    })
}

pub async fn reset(config: &KgConfig, drop_index: bool, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete the graph without --yes");
    }
    let store = connect_store(config).await?;
    store.delete_all().await?;
    if drop_index {
        store.drop_index(&config.index.name).await?;
    }
    info!("Graph reset");
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    url: String,
    index: String,
    index_dimensions: Option<usize>,
    #[serde(flatten)]
    stats: kgrag_core::GraphStats,
}

pub async fn status(config: &KgConfig, json: bool) -> Result<()> {
    let store = connect_store(config).await?;
    let report = StatusReport {
        url: config.graph_store.url.clone(),
        index: config.index.name.clone(),
        index_dimensions: store.vector_index_dimensions(&config.index.name).await?,
        stats: store.stats().await?,
    };

    emit(json, &report, |r| {
        let mut out = format!(
            "Graph: {}\nNodes: {} ({} embedded)\nRelationships: {}\nIndex {}: {}",
            r.url,
            r.stats.nodes,
            r.stats.embedded_nodes,
            r.stats.relationships,
            r.index,
            r.index_dimensions
                .map(|d| format!("{} dimensions", d))
                .unwrap_or_else(|| "missing".to_string())
        );
        for (label, count) in &r.stats.nodes_by_label {
            out.push_str(&format!("\n  :{} {}", label, count));
        }
        for (rel_type, count) in &r.stats.relationships_by_type {
            out.push_str(&format!("\n  [{}] {}", rel_type, count));
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_schema_presets() {
        let schema = resolve_schema("business").unwrap();
        assert!(schema.node_labels().contains(&"Organization"));
        assert!(resolve_schema("case-file").unwrap().node_labels().contains(&"Ort"));
        assert!(resolve_schema("does-not-exist").is_err());
    }

    #[test]
    fn test_resolve_schema_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"node_types": [{{"label": "Movie"}}, {{"label": "Person"}}],
                "relationship_types": [{{"name": "ACTED_IN"}}]}}"#
        )
        .unwrap();

        let schema = resolve_schema(file.path().to_str().unwrap()).unwrap();
        assert_eq!(schema.node_labels(), vec!["Movie", "Person"]);
        assert_eq!(schema.relationship_names(), vec!["ACTED_IN"]);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "[index]\nname = \"movie_index\"\ndimensions = 1536\n"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.index.name, "movie_index");
    }
}
