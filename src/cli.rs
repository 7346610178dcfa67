use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base directory holding config.yaml, exports, chunks, and the index
    #[clap(short, long, default_value = ".")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split scraped transcripts into chunked message artifacts
    Chunk {
        /// Directory of transcript .txt files (defaults to the configured
        /// exports directory)
        path: Option<String>,

        /// Grouping window in minutes
        #[clap(short, long)]
        window: Option<i64>,

        /// Skip grouping: one artifact entry per message
        #[clap(long)]
        flat: bool,

        /// Output directory for artifacts
        #[clap(short, long)]
        output: Option<String>,
    },

    /// Build the vector index from chunked artifacts
    Index {
        /// Directory of chunked artifacts
        #[clap(long)]
        chunks: Option<String>,

        /// Embedding model name
        #[clap(short, long)]
        model: Option<String>,

        /// Output path for the index artifact
        #[clap(short, long)]
        output: Option<String>,
    },

    /// Search the indexed archive semantically
    Search {
        /// Query text; omit for an interactive session
        query: Option<String>,

        /// Maximum number of results
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[clap(long)]
        json: bool,

        /// Also show N lines of context around each result
        #[clap(short, long)]
        context: Option<u32>,
    },

    /// Show surrounding lines for a message
    Context {
        /// Source transcript file name (as reported in search results)
        source_file: String,

        /// Line number of the message
        line: u32,

        /// Lines of context on each side
        #[clap(short, long)]
        width: Option<u32>,

        /// Read from segment artifacts instead of the raw transcript
        #[clap(long)]
        segments: bool,
    },
}
