mod data;
mod error;
mod profile;
mod queue;
mod server;
mod storage;
mod store;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, enabled, info, Level};
use tracing_subscriber::EnvFilter;

use data::DataFiles;
use storage::{MemoryStore, NodeStore, RedbStore};
use store::{KdTreeStore, MedianStrategy};

/// Startup profiling run.
const STARTUP_PROFILE_LOOPS: usize = 100;

#[derive(Parser, Debug)]
#[command(author, version, about = "Geo-based people recommender backed by a k-d tree")]
struct Args {
    /// Number of people to index; selects the generated data files
    #[arg(short, long, env = "RECOMMENDER_SIZE")]
    size: usize,

    /// Port to serve on
    #[arg(short, long, env = "PORT", default_value_t = 5001)]
    port: u16,

    /// Keep the index in an on-disk database instead of memory
    #[arg(long)]
    persistent: bool,

    /// Database file used in persistent mode
    #[arg(long, env = "DB_PATH", default_value = "data/index.redb")]
    db_path: PathBuf,

    /// Rebuild the persistent index even if one exists
    #[arg(long)]
    rebuild_index: bool,

    /// Directory holding ages_N.txt, names_N.txt and coords_N.txt
    #[arg(long, env = "DATA_DIR", default_value = "data_generation/generated_data")]
    data_dir: PathBuf,

    /// Read the three data files concurrently
    #[arg(long)]
    parallel_load: bool,
}

async fn open_store(args: &Args) -> Result<KdTreeStore, Box<dyn Error>> {
    let (nodes, needs_build): (Box<dyn NodeStore>, bool) = if args.persistent {
        if let Some(parent) = args.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = RedbStore::open(&args.db_path)?;
        let existing = db.root()?.is_some();
        info!(
            path = %args.db_path.display(),
            bytes = db.size_bytes()?,
            existing,
            "opened persistent index"
        );
        (Box::new(db), args.rebuild_index || !existing)
    } else {
        (Box::new(MemoryStore::default()), true)
    };

    let mut store = KdTreeStore::new(nodes, MedianStrategy::default());
    if needs_build {
        let files = DataFiles::for_size(&args.data_dir, args.size);
        let people = data::load_people(&files, args.parallel_load).await?;
        store.build(people)?;
    } else {
        info!(nodes = store.len()?, "reusing existing index");
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(size = args.size, persistent = args.persistent, "generating index");

    let store = open_store(&args).await?;

    if enabled!(Level::DEBUG) {
        for (depth, person) in store.dump()? {
            debug!(depth, ?person, "index node");
        }
    }

    let store = Arc::new(store);
    {
        let store = store.clone();
        tokio::task::spawn_blocking(move || {
            profile::run_profiling(
                &store,
                STARTUP_PROFILE_LOOPS,
                server::QUERY_NEIGHBORS,
                server::QUERY_AGE_PROXIMITY,
                &mut rand::thread_rng(),
            )
        })
        .await??;
    }

    let app = server::build_app(store);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    info!("Server running at http://localhost:{}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
