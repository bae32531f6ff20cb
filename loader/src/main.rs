use anyhow::Result;
use clap::{Parser, Subcommand};
use docqa_core::{IndexConfig, NewDocument, RecordStore, RetrievalService, SledStore};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    title: String,
    #[serde(alias = "body")]
    content: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Parser)]
#[command(name = "docqa-loader")]
#[command(about = "Load documents into the record store and query them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import documents from JSON/JSONL files or a directory of them
    Load {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Record store directory
        #[arg(long, default_value = "./docqa.db")]
        db: PathBuf,
        /// Remove existing documents, tags and questions first
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Rank stored documents against a question
    Search {
        #[arg(long, default_value = "./docqa.db")]
        db: PathBuf,
        #[arg(long)]
        question: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        #[arg(long, default_value_t = 0.0)]
        min_score: f32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Load { input, db, clear } => {
            let store = Arc::new(SledStore::open(&db)?);
            let (loaded, indexed) = load(&store, &input, clear)?;
            store.flush()?;
            println!("Loaded {loaded} documents, indexed {indexed}.");
            Ok(())
        }
        Commands::Search { db, question, top_k, min_score } => {
            anyhow::ensure!(top_k >= 1, "--top-k must be at least 1");
            anyhow::ensure!((0.0..=1.0).contains(&min_score), "--min-score must be between 0.0 and 1.0");
            let store: Arc<dyn RecordStore> = Arc::new(SledStore::open(&db)?);
            let service = RetrievalService::new(store, IndexConfig::default());
            let results = service.find_relevant(&question, top_k, min_score)?;
            if results.is_empty() {
                println!("No documents found.");
            }
            for (rank, r) in results.iter().enumerate() {
                println!("{:>2}. [{:.3}] {} (#{})", rank + 1, r.score, r.title, r.document_id);
                println!("    {}", r.content_preview.replace('\n', " "));
            }
            Ok(())
        }
    }
}

/// Import every document under `input`, then rebuild the index.
/// Returns `(documents loaded, documents indexed)`.
fn load(store: &Arc<SledStore>, input: &Path, clear: bool) -> Result<(usize, usize)> {
    if clear {
        tracing::info!("clearing existing records");
        store.clear()?;
    }

    let mut loaded = 0;
    for file in input_files(input) {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for doc in docs {
            ingest_doc(store, doc)?;
            loaded += 1;
        }
    }
    tracing::info!(loaded, tags = store.list_tags()?.len(), "ingested documents");

    let records: Arc<dyn RecordStore> = store.clone();
    let indexed = RetrievalService::new(records, IndexConfig::default()).refresh()?;
    tracing::info!(indexed, "index refreshed");
    Ok((loaded, indexed))
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_jsonl(file: &Path) -> Result<Vec<InputDoc>> {
    let reader = BufReader::new(File::open(file)?);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        docs.push(serde_json::from_str(&line)?);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<InputDoc>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    Ok(match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(serde_json::from_value).collect::<Result<Vec<InputDoc>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    })
}

fn ingest_doc(store: &SledStore, doc: InputDoc) -> Result<()> {
    let mut tags = Vec::with_capacity(doc.tags.len());
    for name in &doc.tags {
        tags.push(store.get_or_create_tag(name)?.id);
    }
    store.create_document(NewDocument { title: doc.title, content: doc.content, date: doc.date, tags })?;
    Ok(())
}
