use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use index_core::index::DEFAULT_INDEX_MERGE_SIZE;
use index_core::{Document, Options, SchemaConfig, ScoringSpec, SearchEngine, SuggestionSpec, TermMatchType};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect a prefix-completion term index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchArg {
    Exact,
    Prefix,
}

impl From<MatchArg> for TermMatchType {
    fn from(m: MatchArg) -> Self {
        match m {
            MatchArg::Exact => TermMatchType::ExactOnly,
            MatchArg::Prefix => TermMatchType::Prefix,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index documents from JSON/JSONL files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Schema JSON describing the indexed properties of each type
        #[arg(long)]
        schema: String,
        /// Lite hits buffered before merging into the main index
        #[arg(long, default_value_t = DEFAULT_INDEX_MERGE_SIZE)]
        merge_size: u32,
        /// Merge everything into the main index before persisting
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Print completions for a query prefix
    Suggest {
        #[arg(long)]
        index: String,
        #[arg(long)]
        schema: String,
        #[arg(long)]
        prefix: String,
        #[arg(long, default_value_t = 10)]
        k: i32,
        #[arg(long = "match", value_enum, default_value_t = MatchArg::Prefix)]
        match_type: MatchArg,
        /// Restrict to these namespaces (repeatable)
        #[arg(long)]
        namespace: Vec<String>,
    },
    /// Print the documents matching one term
    Search {
        #[arg(long)]
        index: String,
        #[arg(long)]
        schema: String,
        #[arg(long)]
        term: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long = "match", value_enum, default_value_t = MatchArg::Exact)]
        match_type: MatchArg,
        #[arg(long)]
        namespace: Vec<String>,
    },
    /// Print storage statistics as JSON
    Stats {
        #[arg(long)]
        index: String,
        #[arg(long)]
        schema: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            schema,
            merge_size,
            compact,
        } => build_index(&input, &output, &schema, merge_size, compact),
        Commands::Suggest {
            index,
            schema,
            prefix,
            k,
            match_type,
            namespace,
        } => {
            let engine = open_engine(&index, &schema, DEFAULT_INDEX_MERGE_SIZE)?;
            let spec = SuggestionSpec::new(prefix, k, match_type.into());
            for term in engine.suggest(&spec, namespace.as_slice())? {
                println!("{}\t{}", term.hit_count, term.content);
            }
            Ok(())
        }
        Commands::Search {
            index,
            schema,
            term,
            k,
            match_type,
            namespace,
        } => {
            let engine = open_engine(&index, &schema, DEFAULT_INDEX_MERGE_SIZE)?;
            let results = engine.search(&term, match_type.into(), k, namespace.as_slice(), &ScoringSpec::default())?;
            for r in results {
                println!("{:.4}\t{}\t{}", r.score, r.namespace, r.uri);
            }
            Ok(())
        }
        Commands::Stats { index, schema } => {
            let engine = open_engine(&index, &schema, DEFAULT_INDEX_MERGE_SIZE)?;
            let info = engine.storage_info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}

fn open_engine(index: &str, schema: &str, merge_size: u32) -> Result<SearchEngine> {
    let schema_config = SchemaConfig::from_json_file(Path::new(schema))
        .with_context(|| format!("reading schema {schema}"))?;
    let engine = SearchEngine::open(Options::new(index, merge_size), &schema_config)
        .with_context(|| format!("opening index at {index}"))?;
    Ok(engine)
}

fn build_index(input: &str, output: &str, schema: &str, merge_size: u32, compact: bool) -> Result<()> {
    let input_path = Path::new(input);
    std::fs::create_dir_all(output)?;
    let mut engine = open_engine(output, schema, merge_size)?;

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }

    let mut num_docs = 0usize;
    for file in files {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for doc in docs {
            engine
                .put(&doc)
                .with_context(|| format!("indexing {} from {}", doc.uri, file.display()))?;
            num_docs += 1;
        }
    }
    tracing::info!(num_docs, "ingested documents");

    if compact {
        engine.merge()?;
    }
    engine.persist_to_disk()?;
    let info = engine.storage_info()?;
    tracing::info!(
        output,
        num_lite_terms = info.num_lite_terms,
        num_main_terms = info.num_main_terms,
        index_size = info.index_size,
        "index build complete"
    );
    Ok(())
}

fn read_jsonl(file: &Path) -> Result<Vec<Document>> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        docs.push(serde_json::from_str(&line)?);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<Document>> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Document>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(docs)
}
