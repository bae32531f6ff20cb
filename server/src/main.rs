use anyhow::Result;
use axum::Router;
use clap::Parser;
use docqa_server::build_app;
use docqa_server::config::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Record store directory
    #[arg(long, default_value = "./docqa.db")]
    db: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = Config::from_env()?;
    let app: Router = build_app(&args.db, &config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let model = if config.llm.use_fake { "fake" } else { config.llm.model.as_str() };
    tracing::info!(%addr, db = %args.db.display(), model, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
