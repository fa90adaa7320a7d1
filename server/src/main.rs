use anyhow::Result;
use axum::Router;
use clap::Parser;
use index_core::index::DEFAULT_INDEX_MERGE_SIZE;
use server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Schema JSON the index was built with
    #[arg(long, default_value = "./schema.json")]
    schema: String,
    /// Lite hits buffered before merging into the main index
    #[arg(long, default_value_t = DEFAULT_INDEX_MERGE_SIZE)]
    merge_size: u32,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(&args.index, &args.schema, args.merge_size)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
