//! Scout binary — run one document through the orchestration pipeline and
//! print the outcome as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use scout_runtime::callbacks::CallbackBus;
use scout_runtime::pipeline::{Pipeline, PipelineConfig};
use scout_runtime::store::{JsonLearningStore, MemoryOutcomeStore, default_learning_store_path};
use scout_runtime::tools::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Asynchronous test-orchestration runner.
#[derive(Debug, Parser)]
#[command(name = "scout", version, about)]
struct Args {
    /// Path to the source document.
    #[arg(long)]
    doc: PathBuf,

    /// Explicit run id (defaults to the document path).
    #[arg(long)]
    run_id: Option<String>,

    /// Directory for the learning store.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Fixed suite-executor seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let doc_path = args.doc.to_string_lossy().into_owned();

    let pipeline = Pipeline::new(
        PipelineConfig {
            suite_seed: args.seed,
            ..PipelineConfig::default()
        },
        Arc::new(CallbackBus::new()),
        Arc::new(ToolRegistry::builtin()),
        Arc::new(MemoryOutcomeStore::new()),
        Arc::new(JsonLearningStore::new(default_learning_store_path(
            &args.data_dir,
        ))),
    );

    let outcome = pipeline
        .run(&doc_path, args.run_id.as_deref(), &CancellationToken::new())
        .await
        .with_context(|| format!("orchestration failed for {doc_path}"))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
