use article_batch::{BatchProcessor, Config};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to a JSON config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path, overrides the config file
    #[arg(long)]
    database: Option<PathBuf>,

    /// API bind address, overrides the config file
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Fail items left `processing` by a crash before starting the worker
    #[arg(long)]
    reclaim_stranded: bool,
}

#[tokio::main]
async fn main() -> article_batch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(database) = args.database {
        config.persistence.database_path = database;
    }
    if let Some(bind) = args.bind {
        config.server.api.bind_address = bind;
    }
    if args.reclaim_stranded {
        config.worker.reclaim_stranded_on_start = true;
    }

    let processor = Arc::new(BatchProcessor::new(config).await?);
    let worker = processor.start_queue_processor();
    let mut api = processor.spawn_api_server();

    info!("article-batch started");
    tokio::select! {
        result = article_batch::run_with_shutdown(&processor) => {
            result?;
            report_api_exit(api.await);
        }
        // The server only returns early when it could not start or crashed
        exited = &mut api => {
            report_api_exit(exited);
            processor.shutdown().await?;
        }
    }

    if let Err(err) = worker.await {
        error!(?err, "queue worker task failed");
    }

    info!("article-batch stopped");
    Ok(())
}

fn report_api_exit(exited: Result<article_batch::Result<()>, tokio::task::JoinError>) {
    match exited {
        Ok(Err(err)) => error!(%err, "API server failed"),
        Err(err) => error!(?err, "API server task failed"),
        Ok(Ok(())) => {}
    }
}
