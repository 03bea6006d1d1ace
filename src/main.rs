//! routekit: serve a file-system routed site.
//!
//! ```text
//! routekit.toml ─▶ config ─▶ routes builder ─▶ URL table ─▶ http server
//!                                   ▲                            │
//!                      routes watcher (dev)            dispatcher ─▶ handlers / pages
//! ```
//!
//! The binary serves pages only. Sites with handler modules register them
//! through the library (`StaticModules`) and call `lifecycle::serve`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use routekit::config::{load_config, SiteConfig};
use routekit::handlers::StaticModules;
use routekit::lifecycle::{self, Shutdown};
use routekit::observability::{init_logging, metrics};

const DEFAULT_CONFIG: &str = "routekit.toml";

#[derive(Parser)]
#[command(name = "routekit")]
#[command(about = "File-system routing server", long_about = None)]
struct Cli {
    /// Config file (defaults to ./routekit.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the routes directory
    #[arg(short, long)]
    routes: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site
    Serve {
        /// Rebuild routes when the routes directory changes
        #[arg(short, long)]
        watch: bool,

        /// Override the bind address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the URL table in match order
    Routes,
    /// Print the client route tree as JSON
    ClientRoutes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = read_config(cli.config.as_deref())?;
    if let Some(routes) = cli.routes {
        config.site.routes_dir = routes;
    }

    init_logging(&config.observability);
    let modules = Arc::new(StaticModules::new());

    match cli.command {
        Commands::Serve { watch, bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            tracing::info!(
                bind_address = %config.server.bind_address,
                routes_dir = %config.site.routes_dir.display(),
                prefix = %config.site.prefix,
                "routekit v{} starting",
                env!("CARGO_PKG_VERSION")
            );

            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            let shutdown = Shutdown::new();
            lifecycle::listen_for_signals(shutdown.clone());
            let watch = watch || config.dev.watch;
            lifecycle::serve(config, modules, watch, shutdown).await?;
            tracing::info!("Shutdown complete");
        }
        Commands::Routes => {
            let snapshot = lifecycle::route_source(&config, modules).build()?;
            for entry in snapshot.table.entries() {
                println!("{}", entry);
            }
        }
        Commands::ClientRoutes => {
            let snapshot = lifecycle::route_source(&config, modules).build()?;
            println!("{}", serde_json::to_string_pretty(&snapshot.client)?);
        }
    }

    Ok(())
}

fn read_config(path: Option<&Path>) -> Result<SiteConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(load_config(Path::new(DEFAULT_CONFIG))?),
        None => Ok(SiteConfig::default()),
    }
}
