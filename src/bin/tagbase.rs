//! tagbase CLI tool
//!
//! Command-line interface for indexing a folder of tagged markdown documents.
//!
//! ## Commands
//!
//! - `tags <path>`: List every tag in the index with its document count
//! - `query <path> <pattern>`: List documents under a tag or wildcard pattern
//! - `show <path> <pattern>`: Print matching documents with their links expanded
//! - `watch <path>`: Keep the index live and print changes until Ctrl-C
//!
//! The one-shot commands (`tags`, `query`, `show`) index the root once and exit; only `watch`
//! subscribes to file changes.

use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tagbase::{
    config::{TagbaseConfig, CONFIG_FILE_NAME},
    diagnostic::TracingSink,
    event::IndexEvent,
    notifier::DebouncedNotifier,
    queue::SyncQueue,
    resolve::LinkResolver,
    source::{FileSource, FsSource, PathFilter},
    sync::SyncService,
    tags::is_wildcard_pattern,
    watch::TagbaseService,
    TagbaseError,
};
use tokio::sync::mpsc::unbounded_channel;

#[derive(Parser)]
#[command(name = "tagbase")]
#[command(author, version, about = "A hierarchical tag index over a folder of markdown documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RootArgs {
    /// Document root
    path: PathBuf,

    /// Which files are documents, relative to the root
    #[arg(short, long)]
    glob: Option<String>,

    /// Configuration file path (defaults to tagbase.toml in the root)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all tags with the number of documents carrying each
    Tags {
        #[command(flatten)]
        root: RootArgs,
    },

    /// List documents matching a tag or a wildcard pattern
    Query {
        #[command(flatten)]
        root: RootArgs,

        /// Tag (`backend.database`) or pattern (`backend.*`, `**.auth`)
        pattern: String,
    },

    /// Print matching documents with linked content appended
    Show {
        #[command(flatten)]
        root: RootArgs,

        /// Tag or wildcard pattern
        pattern: String,
    },

    /// Watch the root and print index changes until Ctrl-C
    Watch {
        #[command(flatten)]
        root: RootArgs,
    },
}

impl RootArgs {
    fn config(&self) -> Result<TagbaseConfig, TagbaseError> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| self.path.join(CONFIG_FILE_NAME));
        let mut config = TagbaseConfig::load(&config_path)?.with_root(&self.path);
        if let Some(glob) = &self.glob {
            config.glob = glob.clone();
        }
        Ok(config)
    }
}

/// A one-shot index of the root, built without subscribing to file changes.
struct Snapshot {
    root: PathBuf,
    separator: String,
    sync: SyncService,
    resolver: LinkResolver,
}

impl Snapshot {
    async fn build(args: &RootArgs) -> Result<Snapshot, TagbaseError> {
        let config = args.config()?;
        let root = tokio::fs::canonicalize(&config.root).await?;
        let filter = PathFilter::new(&root, &config.glob, config.ignore_hidden)?;
        let source: Arc<dyn FileSource> = Arc::new(FsSource);
        let mut paths = source.list(&root).await?;
        paths.retain(|p| filter.matches(p));

        let sync = SyncService::new(source.clone(), Arc::new(TracingSink));
        let report = sync.synchronize_batch(&paths).await;
        tracing::info!(
            "Indexed {} documents ({} skipped)",
            report.indexed.len(),
            report.failed.len()
        );
        Ok(Snapshot {
            root,
            separator: config.link_separator,
            sync,
            resolver: LinkResolver::new(source, Arc::new(TracingSink)),
        })
    }

    fn query(&self, pattern: &str) -> Vec<PathBuf> {
        if is_wildcard_pattern(pattern) {
            self.sync.query_wildcard(pattern)
        } else {
            self.sync.query_exact(pattern)
        }
    }
}

fn display(root: Option<PathBuf>, path: &Path) -> String {
    root.and_then(|root| path.strip_prefix(root).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tags { root } => {
            let index = Snapshot::build(&root).await?;
            for tag in index.sync.get_all_tags() {
                println!("{:<40} {}", tag, index.sync.query_exact(&tag).len());
            }
        }

        Commands::Query { root, pattern } => {
            let index = Snapshot::build(&root).await?;
            for path in index.query(&pattern) {
                println!("{}", display(Some(index.root.clone()), &path));
            }
        }

        Commands::Show { root, pattern } => {
            let index = Snapshot::build(&root).await?;
            for path in index.query(&pattern) {
                let Some(record) = index.sync.get_document(&path) else {
                    continue;
                };
                let doc = index.resolver.assemble(&record, &index.separator).await;
                let shown = display(Some(index.root.clone()), &doc.path);
                println!("=== {} ({}) ===", doc.title, shown);
                println!("{}", doc.expanded_body);
            }
        }

        Commands::Watch { root } => {
            let config = root.config()?;
            let (root_dir, glob) = (config.root.clone(), config.glob.clone());
            let (tx, mut rx) = unbounded_channel::<IndexEvent>();
            let notifier = DebouncedNotifier::new(Duration::from_millis(config.debounce_ms));
            let service = TagbaseService::with_parts(
                config,
                Arc::new(FsSource),
                Box::new(notifier),
                Arc::new(TracingSink),
                Some(tx),
                SyncQueue::current()?,
            );
            let report = service.start(&root_dir, &glob).await?;

            println!(
                "Indexed {} documents. Watching {} for changes. Press Ctrl-C to stop.",
                report.indexed.len(),
                root_dir.display()
            );

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nShutting down...");
                        break;
                    }
                    Some(event) = rx.recv() => match event {
                        IndexEvent::DocumentIndexed { path, tags } => {
                            println!("[Indexed] {} {:?}", display(service.root(), &path), tags);
                        }
                        IndexEvent::DocumentEvicted { path } => {
                            println!("[Evicted] {}", display(service.root(), &path));
                        }
                        IndexEvent::Diagnostic(_) | IndexEvent::Cleared => {}
                    },
                }
            }

            service.dispose()?;
            println!("Shutdown complete");
        }
    }

    Ok(())
}
