//! wckit command-line management tool.
//!
//! Provides subcommands for initializing a working-copy entry store,
//! managing changelist membership, listing membership, and generating /
//! validating configuration files.

mod style;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use tracing_subscriber::EnvFilter;

use wckit_core::changelist::ChangelistClient;
use wckit_core::config::RuntimeConfig;
use wckit_core::events::{EventAction, EventHandler, WcEvent};
use wckit_core::types::Depth;
use wckit_core::wc::{walk_entries, Entry, EntryHandler as WcEntryHandler, JsonStore, WcAccess, STORE_DIR};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// wckit command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "wckit",
    version,
    about = "Manage changelist membership in a wckit working copy"
)]
struct Cli {
    /// Working-copy root directory. Relative target paths are resolved
    /// against it.
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the entry store for a working copy by scanning its tree.
    Init,

    /// Manage changelist membership.
    Changelist {
        #[command(subcommand)]
        action: ChangelistAction,
    },

    /// Show all versioned entries and their changelist membership.
    Status,

    /// Manage configuration files.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ChangelistAction {
    /// Add files to a changelist.
    Add {
        /// Changelist name.
        name: String,

        /// Target paths.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Walk depth: empty, files, immediates, infinity.
        #[arg(long, default_value = "infinity", value_parser = parse_depth)]
        depth: Depth,

        /// Only touch files currently in one of these changelists.
        #[arg(long = "changelist")]
        filter: Vec<String>,
    },
    /// Remove files from their changelists.
    Remove {
        /// Target paths.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Walk depth: empty, files, immediates, infinity.
        #[arg(long, default_value = "infinity", value_parser = parse_depth)]
        depth: Depth,

        /// Only touch files currently in one of these changelists.
        #[arg(long = "changelist")]
        filter: Vec<String>,
    },
    /// List members of the named changelists.
    List {
        /// Changelist names to report.
        #[arg(long = "changelist", required = true)]
        names: Vec<String>,

        /// Target paths (default: the working-copy root).
        paths: Vec<PathBuf>,

        /// Walk depth: empty, files, immediates, infinity.
        #[arg(long, default_value = "infinity", value_parser = parse_depth)]
        depth: Depth,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./wckit.toml")]
        output: PathBuf,
    },
    /// Validate a configuration file.
    Validate {
        /// Path to the config file.
        path: PathBuf,
    },
}

fn parse_depth(s: &str) -> Result<Depth, String> {
    Depth::from_str_val(s)
        .ok_or_else(|| format!("unknown depth '{s}' (expected empty, files, immediates, infinity)"))
}

// ---------------------------------------------------------------------------
// Event printing
// ---------------------------------------------------------------------------

/// Prints changelist lifecycle events as they happen.
struct PrintHandler;

impl EventHandler for PrintHandler {
    fn handle_event(&self, event: &WcEvent) {
        match event.action {
            EventAction::ChangelistSet => {
                let name = event.changelist.as_deref().unwrap_or("?");
                println!(
                    "{}",
                    style::success(&format!(
                        "{} is now a member of changelist '{}'",
                        event.path.display(),
                        name
                    ))
                );
            }
            EventAction::ChangelistClear => {
                println!(
                    "{}",
                    style::dim(&format!(
                        "{} is no longer a member of a changelist",
                        event.path.display()
                    ))
                );
            }
            EventAction::ChangelistMoved => {
                let msg = event
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("moving {}", event.path.display()));
                println!("{}", style::warn(&msg));
            }
            EventAction::Skip => {
                println!(
                    "{}",
                    style::dim(&format!("skipped directory {}", event.path.display()))
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Minimal logging for CLI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => cmd_init(&cli.root),
        Commands::Changelist { action } => match action {
            ChangelistAction::Add {
                name,
                paths,
                depth,
                filter,
            } => cmd_assign(&cli.root, Some(&name), &paths, depth, &filter),
            ChangelistAction::Remove {
                paths,
                depth,
                filter,
            } => cmd_assign(&cli.root, None, &paths, depth, &filter),
            ChangelistAction::List {
                names,
                paths,
                depth,
            } => cmd_list(&cli.root, &names, &paths, depth),
        },
        Commands::Status => cmd_status(&cli.root),
        Commands::Config { action } => match action {
            ConfigAction::Init { output } => cmd_config_init(&output),
            ConfigAction::Validate { path } => cmd_config_validate(&path),
        },
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(root: &Path) -> Result<()> {
    if JsonStore::exists(root) {
        bail!("'{}' already has an entry store", root.display());
    }
    let store = JsonStore::init(root).context("initializing entry store")?;
    let registered = scan_tree(&store, root)?;
    println!(
        "{}",
        style::success(&format!(
            "initialized working copy at '{}' ({} entries)",
            root.display(),
            registered
        ))
    );
    Ok(())
}

/// Register every directory and file under `dir`, skipping the store's own
/// metadata directory and dotfiles. Returns the number of entries added.
fn scan_tree(store: &JsonStore, dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut children: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("reading '{}'", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let name = child.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name == STORE_DIR {
            continue;
        }
        let path = child.path();
        let file_type = child.file_type()?;
        if file_type.is_dir() {
            store.add_dir(&path)?;
            count += 1 + scan_tree(store, &path)?;
        } else if file_type.is_file() {
            store.add_file(dir, &name)?;
            count += 1;
        }
    }
    Ok(count)
}

fn open_store(root: &Path) -> Result<Arc<JsonStore>> {
    let store = JsonStore::open(root).with_context(|| {
        format!(
            "'{}' is not a wckit working copy (run `wckit init` first)",
            root.display()
        )
    })?;
    Ok(Arc::new(store))
}

fn resolve_targets(root: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    if paths.is_empty() {
        return vec![root.to_path_buf()];
    }
    paths
        .iter()
        .map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        })
        .collect()
}

fn cmd_assign(
    root: &Path,
    name: Option<&str>,
    paths: &[PathBuf],
    depth: Depth,
    filter: &[String],
) -> Result<()> {
    let store = open_store(root)?;
    let client = ChangelistClient::with_event_handler(store, Arc::new(PrintHandler));

    let targets = resolve_targets(root, paths);
    let filter_set: HashSet<String> = filter.iter().cloned().collect();
    let filter = (!filter_set.is_empty()).then_some(&filter_set);

    client
        .assign(&targets, name, filter, depth)
        .context("updating changelist membership")?;
    Ok(())
}

fn cmd_list(root: &Path, names: &[String], paths: &[PathBuf], depth: Depth) -> Result<()> {
    let store = open_store(root)?;
    let client = ChangelistClient::new(store);
    let targets = resolve_targets(root, paths);

    let mut rows: Vec<(PathBuf, String)> = Vec::new();
    client
        .query(Some(names), &targets, depth, &mut |path, changelist| {
            rows.push((path.to_path_buf(), changelist.to_string()));
        })
        .context("querying changelist membership")?;

    if rows.is_empty() {
        println!("{}", style::dim("no matching changelist members"));
        return Ok(());
    }
    for (path, changelist) in rows {
        let shown = path.strip_prefix(root).unwrap_or(&path);
        println!("[{}] {}", changelist, shown.display());
    }
    Ok(())
}

/// Collects every visited entry for the status table.
struct StatusCollector {
    rows: Vec<(PathBuf, Entry)>,
}

impl WcEntryHandler for StatusCollector {
    fn handle_entry(
        &mut self,
        path: &Path,
        entry: &Entry,
    ) -> Result<(), wckit_core::WorkingCopyError> {
        self.rows.push((path.to_path_buf(), entry.clone()));
        Ok(())
    }
}

fn cmd_status(root: &Path) -> Result<()> {
    let store = open_store(root)?;
    let mut access = WcAccess::new(store);
    access
        .probe_open(root, false, Depth::Infinity)
        .context("opening working copy")?;

    let mut collector = StatusCollector { rows: Vec::new() };
    walk_entries(&access, root, &mut collector, false, Depth::Infinity)
        .context("walking working copy")?;
    access.close();

    println!("{}", style::header(&format!("Working copy: {}", root.display())));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Path", "Kind", "Changelist"]);
    for (path, entry) in &collector.rows {
        let shown = path.strip_prefix(root).unwrap_or(path);
        let shown = if shown.as_os_str().is_empty() {
            ".".to_string()
        } else {
            shown.display().to_string()
        };
        table.add_row(vec![
            shown,
            entry.kind.to_string(),
            entry.changelist.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn cmd_config_init(output: &Path) -> Result<()> {
    if output.exists() {
        bail!("'{}' already exists", output.display());
    }
    std::fs::write(output, RuntimeConfig::default_toml())
        .with_context(|| format!("writing '{}'", output.display()))?;
    println!(
        "{}",
        style::success(&format!("wrote default config to '{}'", output.display()))
    );
    Ok(())
}

fn cmd_config_validate(path: &Path) -> Result<()> {
    let config = RuntimeConfig::load(path).context("loading config")?;
    println!("{}", style::success(&format!("'{}' is valid", path.display())));
    match config.effective_config_dir() {
        Some(dir) => println!("{}", style::dim(&format!("config dir: {}", dir.display()))),
        None => println!("{}", style::dim("config dir: host-managed")),
    }
    Ok(())
}
