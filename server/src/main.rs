use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::{EngineConfig, Normalizer};
use server::build_app_with;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Engine configuration (JSON); defaults apply to omitted fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stopword file, one word per line
    #[arg(long)]
    stopwords: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let normalizer = match &args.stopwords {
        Some(path) => Normalizer::from_stopword_file(path)?,
        None => Normalizer::default(),
    };
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app: Router = build_app_with(args.index.clone(), config, normalizer, admin_token)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
