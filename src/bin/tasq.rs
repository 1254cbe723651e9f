//! tasq CLI: run the queue gateway or poke at queues directly.

use std::sync::Arc;

use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use tasq_rs::config::{Backend, Config};
use tasq_rs::engine::QueueEngine;
use tasq_rs::gateway;
use tasq_rs::store::{PgScoreStore, Store};
use tasq_rs::telemetry::{TelemetryConfig, init_telemetry};
use tracing::info;

#[derive(Parser)]
#[command(name = "tasq", about = "A basic, easy to use task queue service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Listen address, overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,
    },
    /// Add a payload to a queue (or raise its priority)
    Enqueue {
        /// Queue name
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        queue: String,
        /// Payload
        payload: String,
    },
    /// Show the top keys and total count of a queue
    List {
        /// Queue name
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        queue: String,
    },
    /// Consume the highest priority payload of a queue
    Dequeue {
        /// Queue name
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        queue: String,
    },
    /// Apply Postgres migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { bind } => cmd_serve(config, bind).await,
        Command::Migrate => cmd_migrate(&config).await,
        Command::Enqueue { queue, payload } => {
            let engine = connect_engine(&config).await?;
            cmd_enqueue(&engine, &queue, payload.as_bytes()).await
        }
        Command::List { queue } => cmd_list(&connect_engine(&config).await?, &queue).await,
        Command::Dequeue { queue } => cmd_dequeue(&connect_engine(&config).await?, &queue).await,
    }
}

async fn connect_engine(config: &Config) -> anyhow::Result<QueueEngine<Store>> {
    let store = Store::connect(config).await?;
    Ok(QueueEngine::new(store).with_timeout(config.store_timeout))
}

async fn cmd_serve(config: Config, bind: Option<String>) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "tasq".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let engine = connect_engine(&config).await?;
    engine.store().health_check().await?;
    info!(backend = %engine.store().backend(), "score store connected");
    let engine = Arc::new(engine);
    let bind = bind
        .map(|b| tasq_rs::config::normalize_bind_address(&b))
        .unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind).await?;

    gateway::serve(listener, gateway::router(engine), async {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown requested");
    })
    .await?;
    Ok(())
}

async fn cmd_migrate(config: &Config) -> anyhow::Result<()> {
    if config.backend != Backend::Postgres {
        anyhow::bail!(
            "migrations only apply to the postgres backend (STORE_BACKEND={})",
            config.backend
        );
    }
    let store = PgScoreStore::connect(config.postgres_url()?).await?;
    store.migrate().await?;
    println!("Migrations applied.");
    Ok(())
}

async fn cmd_enqueue(
    engine: &QueueEngine<Store>,
    queue: &str,
    payload: &[u8],
) -> anyhow::Result<()> {
    let enqueued = engine.enqueue(queue, payload).await?;
    println!("{}", enqueued.key);
    Ok(())
}

async fn cmd_list(engine: &QueueEngine<Store>, queue: &str) -> anyhow::Result<()> {
    let list = engine.list(queue).await?;

    if list.keys.is_empty() {
        println!("Queue {queue} is empty.");
        return Ok(());
    }

    for key in &list.keys {
        println!("{key}");
    }
    println!("\n{} item(s), showing {}", list.count, list.keys.len());
    Ok(())
}

async fn cmd_dequeue(engine: &QueueEngine<Store>, queue: &str) -> anyhow::Result<()> {
    match engine.dequeue(queue).await {
        Ok(dequeued) => {
            println!("Key:   {}", dequeued.key);
            println!("Data:  {}", dequeued.data());
            Ok(())
        }
        Err(e) if e.is_empty_queue() => {
            println!("Queue {queue} is empty.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
