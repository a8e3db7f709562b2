mod config;

use clap::{Parser, Subcommand};
use config::LecternConfig;
use lectern_agent::RagSystem;
use lectern_gateway::GatewayServer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lectern", about = "Lectern - course materials question answering")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "lectern.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load course documents from a folder
    Ingest {
        /// Folder of course files (defaults to rag.docs_dir)
        path: Option<PathBuf>,
        /// Drop stored courses before loading
        #[arg(long)]
        clear: bool,
    },
    /// List stored courses
    Courses,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = LecternConfig::load(&cli.config).await?;

    let embedder = config.embedding.build()?;
    let model = config.model.clone();

    match cli.command {
        Commands::Serve { host, port } => {
            model.validate()?;
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let rag = RagSystem::from_config(
                model,
                &config.rag,
                embedder,
                config.data_dir.as_deref(),
            )
            .await?;

            if let Some(docs) = &config.rag.docs_dir {
                match rag.add_course_folder(docs, false).await {
                    Ok((courses, chunks)) => {
                        info!(courses, chunks, "Loaded initial course documents");
                    }
                    Err(e) => warn!(error = %e, "Could not load course documents"),
                }
            }

            let app = GatewayServer::build_with_frontend(
                Arc::new(rag),
                config.server.frontend_dir.as_deref(),
            );

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Lectern listening on {}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Ingest { path, clear } => {
            let Some(path) = path.or(config.rag.docs_dir.clone()) else {
                anyhow::bail!("No folder given and rag.docs_dir is not set");
            };
            if config.data_dir.is_none() {
                warn!("data_dir is not set; ingested courses will not be persisted");
            }

            let rag = RagSystem::from_config(
                model,
                &config.rag,
                embedder,
                config.data_dir.as_deref(),
            )
            .await?;
            let (courses, chunks) = rag.add_course_folder(&path, clear).await?;
            println!("Added {courses} course(s) with {chunks} chunk(s)");
        }
        Commands::Courses => {
            let rag = RagSystem::from_config(
                model,
                &config.rag,
                embedder,
                config.data_dir.as_deref(),
            )
            .await?;
            let analytics = rag.course_analytics().await?;
            if analytics.total_courses == 0 {
                println!("No courses stored.");
                println!("Run `lectern ingest <folder>` with data_dir set in lectern.toml");
            } else {
                println!("Stored courses:");
                for title in &analytics.course_titles {
                    println!("  {title}");
                }
                println!("\nTotal: {} course(s)", analytics.total_courses);
            }
        }
    }

    Ok(())
}
