use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packman::clock::SystemClock;
use packman::config::Config;
use packman::db::Database;
use packman::engine::{ImportOutcome, MarkOutcome, Packman};
use packman::models::{Status, View};
use packman::{api, tree_render};

#[derive(Parser)]
#[command(name = "packman")]
#[command(about = "A simple trip packing checklist")]
struct Cli {
    /// SQLite database file (overrides config and PACKMAN_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the checklist views
    Show {
        /// Only print one view
        #[arg(short, long, value_enum)]
        view: Option<ViewArg>,
    },
    /// Replace the list with an indented text file
    Import { file: PathBuf },
    /// Replace the list with the bundled default list
    Reset,
    /// Mark an item as packed
    Pack { id: String },
    /// Mark an item as not needed
    NotNeeded { id: String },
    /// Move an item (and its ancestors) back to "to pack"
    Restore { id: String },
    /// Mark a group and everything under it as packed
    PackGroup { id: String },
    /// Mark a group and everything under it as not needed
    NotNeededGroup { id: String },
    /// Move only the group itself back to "to pack"
    RestoreGroup { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    ToPack,
    Packed,
    NotNeeded,
}

impl From<ViewArg> for View {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::ToPack => View::ToPack,
            ViewArg::Packed => View::Packed,
            ViewArg::NotNeeded => View::NotNeeded,
        }
    }
}

/// Initialize tracing with output to stderr (CLI commands) or stdout (server)
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "packman=info,tower_http=info".into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_engine(cli_db: Option<PathBuf>, config: &Config) -> anyhow::Result<Packman<Database>> {
    let path = match cli_db.or_else(|| config.database_path.clone()) {
        Some(path) => path,
        None => Database::default_path()?,
    };
    let db = Database::open(path.clone())
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    db.migrate()?;
    Ok(Packman::with_clock(
        db,
        Arc::new(SystemClock),
        config.mark_delay(),
    ))
}

/// Print an operation outcome; item marks wait out their delay first so the
/// change lands before the process exits.
async fn finish_mark(packman: &mut Packman<Database>, outcome: MarkOutcome) {
    if let MarkOutcome::Scheduled { delay_ms, .. } = &outcome {
        tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
        packman.tick();
    }
    match outcome {
        MarkOutcome::Scheduled { id, mark, .. } => {
            println!("{} -> {}", id, Status::from(mark).as_str())
        }
        MarkOutcome::Applied {
            id,
            status,
            changed,
        } => println!("{} -> {} ({} changed)", id, status.as_str(), changed),
        MarkOutcome::Busy { pending_id } => println!("Busy: {} is still pending", pending_id),
        MarkOutcome::UnknownNode { id } => println!("No node with id {}", id),
    }
}

fn print_views(packman: &Packman<Database>, only: Option<View>) {
    let views: Vec<View> = match only {
        Some(view) => vec![view],
        None => View::ALL.to_vec(),
    };
    let model = packman.view_model();
    for view in views {
        print!("{}", tree_render::render_view(view, model.entries(view)));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let config = Config::load();
    let mut packman = open_engine(cli.db, &config)?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            tracing::info!("Starting Packman server on port {}", port);

            let app = api::create_router(Arc::new(Mutex::new(packman)));

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Packman server listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Some(Commands::Show { view }) => print_views(&packman, view.map(View::from)),
        Some(Commands::Import { file }) => match packman.import_file(&file)? {
            ImportOutcome::Imported { nodes } => println!("Imported {} entries", nodes),
            ImportOutcome::NoItemsFound => {
                println!("No items found. Use 2-space indentation to nest groups/items.")
            }
        },
        Some(Commands::Reset) => {
            let nodes = packman.reset_to_default();
            println!("Reset to default list ({} entries)", nodes);
        }
        Some(Commands::Pack { id }) => {
            let outcome = packman.pack_item(&id);
            finish_mark(&mut packman, outcome).await;
        }
        Some(Commands::NotNeeded { id }) => {
            let outcome = packman.not_needed_item(&id);
            finish_mark(&mut packman, outcome).await;
        }
        Some(Commands::Restore { id }) => {
            let outcome = packman.restore_item(&id);
            finish_mark(&mut packman, outcome).await;
        }
        Some(Commands::PackGroup { id }) => {
            let outcome = packman.pack_group(&id);
            finish_mark(&mut packman, outcome).await;
        }
        Some(Commands::NotNeededGroup { id }) => {
            let outcome = packman.not_needed_group(&id);
            finish_mark(&mut packman, outcome).await;
        }
        Some(Commands::RestoreGroup { id }) => {
            let outcome = packman.restore_group(&id);
            finish_mark(&mut packman, outcome).await;
        }
        None => print_views(&packman, None),
    }

    Ok(())
}
