//! tasktree CLI - manage a tree of tasks and the tagged connections between them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use std::env;
use std::path::{Path, PathBuf};
use tasktree_core::config::CONFIG_DIR;
use tasktree_core::{
    Connection, Error, IdentifierPolicy, NodeIdx, TagPattern, TaskStatus, TaskTree,
    TaskTreeConfig,
};
use tasktree_store::{JsonStore, TreeStore};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tasktree")]
#[command(about = "tasktree - Task trees with tagged connections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new task tree
    Init {
        /// Path to initialize (defaults to current directory)
        path: Option<String>,

        /// Name of the root task
        #[arg(short, long, default_value = "root")]
        name: String,

        /// Id of the root task (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Add a task
    Add {
        /// Task name
        name: String,

        /// Parent task id (defaults to the root)
        #[arg(short, long)]
        parent: Option<String>,

        /// Task id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the task tree
    List,

    /// Show a task and its connections
    Show {
        /// Task ID
        id: String,
    },

    /// Set the status of a task
    Status {
        /// Task ID
        id: String,

        /// New status: pending, solved or failed
        status: String,
    },

    /// Connect a task to another task id, merging tags into any existing connection
    Connect {
        /// Task holding the connection
        from: String,

        /// Target task id
        to: String,

        /// Tags to put on the connection
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// Remove a connection
    Disconnect {
        /// Task holding the connection
        from: String,

        /// Target task id
        to: String,
    },

    /// Remove one tag from a connection
    Untag {
        /// Task holding the connection
        from: String,

        /// Target task id
        to: String,

        /// Tag to remove
        tag: String,
    },

    /// List connections of a task, optionally filtered by tag
    Query {
        /// Task ID
        id: String,

        /// Exact tag to filter on
        #[arg(short, long, conflicts_with = "pattern")]
        tag: Option<String>,

        /// Regex that must fully match at least one tag
        #[arg(short = 'm', long = "match")]
        pattern: Option<String>,
    },
}

/// Find the .tasktree directory by walking up from the current directory.
fn find_tasktree_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let candidate = current.join(CONFIG_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => {
                bail!(
                    "No {} directory found. Run 'tasktree init' to initialize a task tree.",
                    CONFIG_DIR
                );
            }
        }
    }
}

/// Open the store described by the config in `dir`.
async fn open_store(dir: &Path) -> Result<JsonStore> {
    let config = TaskTreeConfig::load_or_default(dir).context("Failed to load configuration")?;
    let policy = config.policy()?;
    let store = JsonStore::open_with_policy(config.snapshot_path(dir), policy).await?;
    Ok(store)
}

/// Succeed only when the store holds no tree yet.
///
/// A snapshot that exists but cannot be loaded is reported, never treated
/// as absent, so `init` does not overwrite it.
async fn ensure_no_tree(store: &JsonStore) -> Result<()> {
    match store.get_tree(None).await {
        Ok(_) => bail!("A task tree already exists at {}", store.path().display()),
        Err(Error::TreeNotFound(_)) => Ok(()),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Existing snapshot at {} could not be loaded",
                store.path().display()
            )
        }),
    }
}

fn require_task(tree: &TaskTree, id: &str) -> Result<NodeIdx> {
    tree.find(id)
        .with_context(|| format!("Task not found: {}", id))
}

fn status_colored(status: TaskStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        TaskStatus::Pending => text.yellow(),
        TaskStatus::Solved => text.green(),
        TaskStatus::Failed => text.red(),
    }
}

/// One line per task, children indented under their parent.
fn render_tree(tree: &TaskTree) -> Vec<String> {
    let mut lines = Vec::with_capacity(tree.len());
    render_node(tree, tree.root(), "", true, true, &mut lines);
    lines
}

fn render_node(
    tree: &TaskTree,
    idx: NodeIdx,
    prefix: &str,
    last: bool,
    is_root: bool,
    lines: &mut Vec<String>,
) {
    let Some(task) = tree.get(idx) else {
        return;
    };

    let branch = if is_root {
        ""
    } else if last {
        "└── "
    } else {
        "├── "
    };
    lines.push(format!(
        "{}{}{} {} [{}]",
        prefix,
        branch,
        task.id().as_str().bright_cyan(),
        task.name,
        status_colored(task.status)
    ));

    let child_prefix = if is_root {
        String::new()
    } else if last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };
    let children = tree.children(idx);
    for (i, &child) in children.iter().enumerate() {
        render_node(tree, child, &child_prefix, i + 1 == children.len(), false, lines);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { path, name, id } => {
            let target = path.unwrap_or_else(|| ".".to_string());
            let dir = Path::new(&target).join(CONFIG_DIR);

            let config = TaskTreeConfig::load_or_default(&dir)?;
            let policy: IdentifierPolicy = config.policy()?;

            let mut store = open_store(&dir).await?;
            ensure_no_tree(&store).await?;

            if !dir.join("config.toml").exists() {
                TaskTreeConfig::write_default(&dir)?;
            }

            let tree = TaskTree::with_policy(policy, name, TaskStatus::Pending, id.as_deref())?;
            store.save_tree(&tree).await?;
            store.close().await?;

            println!("{}", "✓ Initialized task tree".green().bold());
            println!("  Root:     {}", tree.root_task().id().as_str().bright_cyan());
            println!("  Snapshot: {}", store.path().display());

            Ok(())
        }

        Commands::Add { name, parent, id } => {
            let dir = find_tasktree_dir()?;
            let mut store = open_store(&dir).await?;
            let mut tree = store.get_tree(None).await?;

            let parent_idx = match parent {
                Some(parent) => require_task(&tree, &parent)?,
                None => tree.root(),
            };
            let idx = tree.add_child(parent_idx, name.clone(), TaskStatus::Pending, id.as_deref())?;
            store.save_tree(&tree).await?;

            let task_id = tree
                .get(idx)
                .map(|task| task.id().to_string())
                .unwrap_or_default();
            info!("Added task {}", task_id);

            println!("{}", "✓ Added task".green().bold());
            println!("  ID:   {}", task_id.bright_cyan());
            println!("  Name: {}", name);

            Ok(())
        }

        Commands::List => {
            let dir = find_tasktree_dir()?;
            let store = open_store(&dir).await?;
            let tree = store.get_tree(None).await?;

            for line in render_tree(&tree) {
                println!("{}", line);
            }

            Ok(())
        }

        Commands::Show { id } => {
            let dir = find_tasktree_dir()?;
            let store = open_store(&dir).await?;
            let tree = store.get_tree(None).await?;
            let idx = require_task(&tree, &id)?;
            let Some(task) = tree.get(idx) else {
                bail!("Task not found: {}", id);
            };

            println!("{}", "━".repeat(60));
            println!("{} {}", "Task:".bold(), task.id().as_str().bright_cyan());
            println!("{}", "━".repeat(60));
            println!("{:<15} {}", "Name:".bold(), task.name);
            println!("{:<15} {}", "Status:".bold(), status_colored(task.status));
            if let Some(parent) = tree.parent(idx).and_then(|p| tree.get(p)) {
                println!("{:<15} {}", "Parent:".bold(), parent.id());
            }
            println!("{:<15} {}", "Children:".bold(), tree.children(idx).len());
            println!();
            println!("{}", "Connections:".bold());
            println!("{}", serde_json::to_string_pretty(&task.connections)?);

            Ok(())
        }

        Commands::Status { id, status } => {
            let status: TaskStatus = status.parse()?;
            let dir = find_tasktree_dir()?;
            let mut store = open_store(&dir).await?;
            let mut tree = store.get_tree(None).await?;

            let idx = require_task(&tree, &id)?;
            tree.set_status(idx, status)?;
            store.save_tree(&tree).await?;

            println!("✓ {} is now {}", id.bright_cyan(), status_colored(status));
            Ok(())
        }

        Commands::Connect { from, to, tag } => {
            let dir = find_tasktree_dir()?;
            let mut store = open_store(&dir).await?;
            let mut tree = store.get_tree(None).await?;

            let connection = Connection::with_policy(tree.policy(), to.clone(), tag)?;
            if tree.find(&to).is_none() {
                warn!("Connecting to {} which is not part of this tree", to);
            }

            let task = tree
                .find_task_mut(&from)
                .with_context(|| format!("Task not found: {}", from))?;
            task.connections.add(connection)?;
            let merged = task.connections.find(&to).map(ToString::to_string);
            store.save_tree(&tree).await?;

            println!("✓ {} -> {}", from.bright_cyan(), merged.unwrap_or(to));
            Ok(())
        }

        Commands::Disconnect { from, to } => {
            let dir = find_tasktree_dir()?;
            let mut store = open_store(&dir).await?;
            let mut tree = store.get_tree(None).await?;

            let task = tree
                .find_task_mut(&from)
                .with_context(|| format!("Task not found: {}", from))?;
            if task.connections.is_connected_with_tag(&to, Connection::GUARD_TAG) {
                bail!("Connection {} -> {} is guarded and cannot be removed", from, to);
            }
            if task.connections.remove(&to).is_none() {
                println!("{}", "No such connection".yellow());
                return Ok(());
            }
            store.save_tree(&tree).await?;

            println!("✓ Removed connection {} -> {}", from.bright_cyan(), to);
            Ok(())
        }

        Commands::Untag { from, to, tag } => {
            let dir = find_tasktree_dir()?;
            let mut store = open_store(&dir).await?;
            let mut tree = store.get_tree(None).await?;

            let task = tree
                .find_task_mut(&from)
                .with_context(|| format!("Task not found: {}", from))?;
            let connection = task
                .connections
                .find_mut(&to)
                .with_context(|| format!("No connection {} -> {}", from, to))?;
            if tag == Connection::GUARD_TAG {
                bail!("The guard tag cannot be removed");
            }
            if !connection.remove_tag(&tag) {
                println!("{}", format!("Tag {} not present", tag).yellow());
                return Ok(());
            }
            store.save_tree(&tree).await?;

            println!("✓ Removed tag {} from {} -> {}", tag, from.bright_cyan(), to);
            Ok(())
        }

        Commands::Query { id, tag, pattern } => {
            let dir = find_tasktree_dir()?;
            let store = open_store(&dir).await?;
            let tree = store.get_tree(None).await?;

            let task = tree
                .find_task(&id)
                .with_context(|| format!("Task not found: {}", id))?;

            let pattern = pattern.as_deref().map(TagPattern::new).transpose()?;
            let matches: Vec<&Connection> = match (&tag, &pattern) {
                (Some(tag), _) => task.connections.with_tag(tag).collect(),
                (None, Some(pattern)) => task.connections.match_tag(pattern).collect(),
                (None, None) => task.connections.iter().collect(),
            };

            if matches.is_empty() {
                println!("{}", "No connections found".yellow());
            }
            for connection in matches {
                println!("{}", connection);
            }

            Ok(())
        }
    }
}
