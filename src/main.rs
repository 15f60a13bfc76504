//! Content rewriter command line.
//!
//! ```text
//! content-rewriter [--config rewriter.toml] <command>
//!
//!   rewrite   run the first matching processor over a file or stdin
//!   dump      print the configuration state
//!   watch     keep the configuration current until Ctrl+C
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use content_rewriter::components::OutputSink;
use content_rewriter::config::{self, RewriterSettings};
use content_rewriter::lifecycle::{shutdown_signal, Shutdown};
use content_rewriter::manager::ChangeWorker;
use content_rewriter::matcher::RequestInfo;
use content_rewriter::observability::logging;
use content_rewriter::store::{FsStore, StoreWatcher};
use content_rewriter::{ComponentRegistry, ConfigManager, ResponseAdapter};

#[derive(Parser)]
#[command(name = "content-rewriter")]
#[command(about = "Streaming markup rewriter driven by layered processor configurations", long_about = None)]
struct Cli {
    /// Service settings file (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a document as if it were the response for the given request
    Rewrite {
        /// Request path used to select the processor
        #[arg(long)]
        path: String,
        #[arg(long)]
        extension: Option<String>,
        #[arg(long, default_value = "text/html")]
        content_type: String,
        /// Dot-separated selector string
        #[arg(long)]
        selectors: Option<String>,
        /// Input file; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print the active and overridden configurations
    Dump,
    /// Apply store changes as they happen until Ctrl+C
    Watch,
}

fn load_settings(path: Option<&PathBuf>) -> Result<RewriterSettings, config::ConfigError> {
    match path {
        Some(path) => config::load_settings(path),
        None => Ok(RewriterSettings::default()),
    }
}

fn build_manager(settings: &RewriterSettings, store: FsStore) -> Arc<ConfigManager> {
    let manager = Arc::new(ConfigManager::new(
        Arc::new(store),
        Arc::new(ComponentRegistry::with_defaults()),
        settings.store.search_paths.clone(),
    ));
    manager.activate();
    manager
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref())?;
    logging::init(&settings.logging);

    tracing::info!(
        base_dir = ?settings.store.base_dir,
        search_paths = ?settings.store.search_paths,
        "settings loaded"
    );

    let store = FsStore::new(&settings.store.base_dir);
    let manager = build_manager(&settings, store.clone());

    match cli.command {
        Commands::Rewrite {
            path,
            extension,
            content_type,
            selectors,
            input,
        } => {
            let mut request = RequestInfo::new(path).with_content_type(content_type);
            if let Some(extension) = extension {
                request = request.with_extension(extension);
            }
            if let Some(selectors) = selectors {
                request = request.with_selectors(selectors);
            }

            let mut reader: Box<dyn Read> = match input {
                Some(file) => Box::new(File::open(file)?),
                None => Box::new(io::stdin()),
            };

            let mut response =
                ResponseAdapter::new(manager, Arc::new(request), OutputSink::new(io::stdout()));
            let copied = io::copy(&mut reader, response.writer()?);
            response.finished(copied.is_err())?;
            copied?;
        }
        Commands::Dump => {
            print!("{}", manager.print_configuration());
        }
        Commands::Watch => {
            if !settings.watcher.enabled {
                tracing::warn!("watcher disabled in settings, nothing to do");
                return Ok(());
            }

            let (watcher, rx) = StoreWatcher::new(
                store,
                &settings.store.search_paths,
                settings.watcher.poll_interval(),
            );
            let _watcher = watcher.run()?;

            let shutdown = Shutdown::new();
            let worker = ChangeWorker::new(Arc::clone(&manager), rx).spawn(shutdown.subscribe());

            shutdown_signal(&shutdown).await;
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "change worker ended abnormally");
            }
            manager.deactivate();
        }
    }

    tracing::info!("done");
    Ok(())
}
