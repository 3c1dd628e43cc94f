// ABOUTME: Entry point for the sitetree console binary
// ABOUTME: Loads config, initializes logging, and runs one command against page tree snapshots

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use sitetree_core::{
    Collaborators, ConsoleConfig, MemoryLocation, NavigationEntry, ProjectLoad, SiteConsole,
};
use sitetree_events::NullBus;
use sitetree_logging::{LoggingConfig, LoggingGuard, error, info, instrument};

mod cli;
mod snapshot;

use cli::{Args, Command};
use snapshot::{ReadOnlyMutations, SnapshotDirectory, SnapshotFetchService};

/// Upper bound on waiting for a debounced user lookup past its quiet period
const LOOKUP_GRACE: Duration = Duration::from_secs(5);

fn setup_logging(verbosity: u64, config: &LoggingConfig) -> Result<LoggingGuard> {
    let mut config = config.clone();
    config
        .apply_env_overrides()
        .context("Failed to apply logging environment overrides")?;

    let level = match verbosity {
        0 => None,
        1 => Some(sitetree_logging::Level::INFO),
        2 => Some(sitetree_logging::Level::DEBUG),
        _3_or_more => Some(sitetree_logging::Level::TRACE),
    };
    if let Some(level) = level {
        config.raise_level(level);
    }

    let guard = sitetree_logging::init_logging_with_config(config)
        .context("Failed to initialize sitetree logging")?;
    info!("Sitetree logging system initialized");
    Ok(guard)
}

fn load_config(args: &Args) -> Result<ConsoleConfig> {
    match &args.config_file {
        Some(path) => ConsoleConfig::load_from_path(path),
        None => ConsoleConfig::load(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse_args().context("could not parse arguments")?;

    if args.display_help {
        print!("{}", cli::HELP);
        return Ok(());
    }
    if args.display_version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = args.command.clone() else {
        eprint!("{}", cli::HELP);
        bail!("no command given");
    };

    let config = load_config(&args)?;
    let _guard = setup_logging(args.verbosity, &config.logging)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(config, &args, command)).inspect_err(|error| {
        error!(%error, "Command failed");
    })
}

#[instrument(skip(config, args))]
async fn run(config: ConsoleConfig, args: &Args, command: Command) -> Result<()> {
    let start_route = match &command {
        Command::Tree { route: Some(route) } => route.clone(),
        _ => config
            .projects
            .first()
            .map(|project| format!("/webpage/{project}"))
            .unwrap_or_default(),
    };
    let quiet_period = config.lookup.quiet_period();

    let fetcher = Arc::new(SnapshotFetchService::new(&args.snapshot_dir));
    let console = SiteConsole::new(
        config,
        Collaborators {
            fetcher,
            mutations: Arc::new(ReadOnlyMutations),
            directory: Arc::new(SnapshotDirectory::new(&args.snapshot_dir)),
            location: Arc::new(MemoryLocation::new(start_route)),
            bus: Arc::new(NullBus),
        },
    );

    match command {
        Command::Projects => projects(console).await,
        Command::Tree { .. } => tree(console).await,
        Command::Search { query } => search(console, &query).await,
        Command::Find { project, path } => find(console, &project, &path).await,
        Command::Users { query } => users(console, &query, quiet_period).await,
    }
}

async fn projects(mut console: SiteConsole) -> Result<()> {
    console.start().await;
    let session = console.session().clone();

    for project in &console.config().projects {
        let state = match session.project_load(project) {
            Some(ProjectLoad::Ready(tree)) => format!("{} pages", tree.node_count()),
            Some(ProjectLoad::Failed(error)) => format!("failed: {error}"),
            Some(ProjectLoad::Loading) | None => "not loaded".to_string(),
        };
        let marker = if session.selected_project().as_deref() == Some(project) {
            '*'
        } else {
            ' '
        };
        println!("{marker} {project:<24} {state}");
    }
    Ok(())
}

async fn tree(mut console: SiteConsole) -> Result<()> {
    let Some(resolution) = console.start().await else {
        bail!("none of the configured projects could be loaded");
    };

    let crumbs: Vec<String> = console
        .breadcrumbs()
        .into_iter()
        .map(|crumb| crumb.label)
        .collect();
    println!("{} ({})", resolution.project, crumbs.join(" / "));

    for entry in console.visible_entries() {
        println!("{}", render_entry(&entry));
    }
    Ok(())
}

fn render_entry(entry: &NavigationEntry) -> String {
    let toggle = match (entry.has_children, entry.expanded) {
        (false, _) => ' ',
        (true, true) => '-',
        (true, false) => '+',
    };
    let active = if entry.active { " <" } else { "" };
    format!(
        "{}{toggle} {}{active}",
        "  ".repeat(entry.depth),
        entry.display_name
    )
}

async fn search(mut console: SiteConsole, query: &str) -> Result<()> {
    console.start().await;
    let min_len = console.config().search.threshold();
    if query.chars().count() < min_len {
        bail!("search needs at least {min_len} characters");
    }

    let hits = console.search_input(query);
    if hits.is_empty() {
        println!("No pages match '{query}'");
    }
    for hit in hits {
        println!(
            "{:<24} {:<40} {}",
            hit.project_name,
            hit.node_path,
            hit.title.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn find(mut console: SiteConsole, project: &str, path: &str) -> Result<()> {
    console.start().await;
    let tree = console
        .session()
        .tree(project)
        .with_context(|| format!("project '{project}' is not loaded"))?;
    let node = tree.find(path)?;
    println!("{}", serde_json::to_string_pretty(node)?);
    Ok(())
}

async fn users(mut console: SiteConsole, query: &str, quiet_period: Duration) -> Result<()> {
    let mut options = console.lookup_options();
    console.lookup_input(query);

    let wanted = query.trim();
    let delivered = tokio::time::timeout(quiet_period + LOOKUP_GRACE, async {
        loop {
            options.changed().await?;
            let current = options.borrow_and_update().clone();
            if current.query == wanted {
                return anyhow::Ok(current);
            }
        }
    })
    .await
    .context("user lookup timed out")??;

    if delivered.users.is_empty() {
        println!("No users match '{wanted}'");
    }
    for user in delivered.users {
        println!("{:<24} {:<32} {}", user.name, user.email, user.job_title);
    }
    Ok(())
}
