use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kgrag")]
#[command(about = "Build a knowledge graph from text with an LLM and answer questions over it")]
#[command(version)]
pub struct Cli {
    /// Config file (.toml, .json or .yaml); environment variables override it
    #[arg(short = 'C', long, global = true, env = "KGRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract nodes and relationships from text and write them to the graph
    Build(BuildArgs),

    /// Answer a question from the graph
    Ask(AskArgs),

    /// Embed nodes that have no vector yet and ensure their index exists
    Embed(EmbedArgs),

    /// Create the vector index and uniqueness constraints
    Setup(SetupArgs),

    /// Delete every node and relationship
    Reset {
        /// Also drop the vector index
        #[arg(long)]
        drop_index: bool,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show node, relationship and index counts
    Status,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Text to extract from; use --file for documents
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Schema preset (business, case-file) or path to a schema file
    #[arg(short, long, default_value = "business")]
    pub schema: String,

    /// Split the input at markdown headings and extract per section
    #[arg(long)]
    pub sections: bool,

    /// Delete all data and drop the vector index before building
    #[arg(long)]
    pub reset: bool,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question
    pub question: String,

    /// Number of nodes to retrieve
    #[arg(short = 'k', long, default_value = "3")]
    pub top_k: usize,

    /// Retrieve nodes only, without their relationships
    #[arg(long)]
    pub no_neighbors: bool,

    /// Node properties to include in the context (repeatable)
    #[arg(short = 'p', long = "property")]
    pub properties: Vec<String>,

    /// Print the retrieved context along with the answer
    #[arg(long)]
    pub show_context: bool,

    /// Let the LLM write a Cypher query instead of searching the vector index
    #[arg(long, conflicts_with_all = ["no_neighbors", "properties"])]
    pub cypher: bool,

    /// Schema described to the LLM in --cypher mode (preset name or file)
    #[arg(short, long, default_value = "business")]
    pub schema: String,
}

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Label of the nodes to embed (defaults to the configured index label)
    #[arg(short, long)]
    pub label: Option<String>,

    /// Property that receives the vector (defaults to the configured index property)
    #[arg(long)]
    pub vector_property: Option<String>,

    /// Property whose text is embedded
    #[arg(short, long, default_value = "id")]
    pub text_property: String,

    /// Index name (defaults to the configured index name)
    #[arg(short, long)]
    pub index: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Drop the vector index before creating it
    #[arg(long)]
    pub recreate: bool,

    /// Index dimensionality (defaults to the embedder's)
    #[arg(long)]
    pub dims: Option<usize>,

    /// Labels that get a uniqueness constraint on `id` (repeatable)
    #[arg(long = "constraint", default_values_t = ["Person".to_string(), "Organization".to_string()])]
    pub constraints: Vec<String>,
}
