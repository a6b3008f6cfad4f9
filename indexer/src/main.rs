use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use search_core::{ingest_page, EngineConfig, IndexBuilder, IndexPaths, Normalizer, Page, SearchEngine, SledStore, Store};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index crawled pages and query the resulting store", long_about = None)]
struct Cli {
    /// Stopword file, one word per line (built-in English list when omitted)
    #[arg(long, global = true)]
    stopwords: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index pages from crawler JSON/JSONL dumps (a file or a directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Index directory
        #[arg(long)]
        output: String,
        /// Engine configuration (JSON); `summary_size` applies to the build
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a query against an existing index
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Engine configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Maximum hits to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let normalizer = match &cli.stopwords {
        Some(path) => Normalizer::from_stopword_file(path).with_context(|| format!("reading {}", path.display()))?,
        None => Normalizer::default(),
    };

    match cli.command {
        Commands::Build { input, output, config } => build_index(&input, &output, load_config(config)?, normalizer),
        Commands::Search { index, config, limit, query } => {
            run_search(&index, load_config(config)?, normalizer, &query, limit)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(&path).with_context(|| format!("reading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn build_index(input: &str, output: &str, config: EngineConfig, normalizer: Normalizer) -> Result<()> {
    let input_path = Path::new(input);
    let store = Arc::new(SledStore::open(&IndexPaths::new(output))?);
    let builder = IndexBuilder::new(Arc::clone(&store), normalizer).with_summary_size(config.summary_size);

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
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files.sort();

    let mut pages = 0usize;
    for file in files {
        let loaded = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for mut page in loaded {
            if page.last_modified.is_none() {
                page.last_modified = Some(now_rfc3339());
            }
            ingest_page(&builder, &page).with_context(|| format!("indexing {}", page.url))?;
            pages += 1;
        }
        tracing::info!(file = %file.display(), pages, "ingested file");
    }

    store.flush()?;
    tracing::info!(pages, documents = store.document_count()?, output, "index build complete");
    Ok(())
}

fn read_jsonl(file: &Path) -> Result<Vec<Page>> {
    let reader = BufReader::new(File::open(file)?);
    let mut pages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        pages.push(serde_json::from_str(&line)?);
    }
    Ok(pages)
}

fn read_json(file: &Path) -> Result<Vec<Page>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let pages: Vec<Page> = match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(serde_json::from_value).collect::<Result<_, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(pages)
}

fn run_search(index: &str, config: EngineConfig, normalizer: Normalizer, query: &str, limit: usize) -> Result<()> {
    let store = Arc::new(SledStore::open(&IndexPaths::new(index))?);
    let engine = SearchEngine::new(Arc::clone(&store), normalizer, config);
    let hits = engine.search_page(query, 0, limit)?;
    if hits.is_empty() {
        println!("no results");
    }
    for (rank, hit) in hits.iter().enumerate() {
        let meta = store.get_document(hit.doc_id)?;
        let (title, url) = meta.map(|m| (m.title, m.url)).unwrap_or_default();
        println!("{:>3}. {:.6}  {}  {}", rank + 1, hit.score, title, url);
    }
    Ok(())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default()
}
