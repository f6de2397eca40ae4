//! tasktree-store - snapshot persistence for task trees
//!
//! This crate implements the store boundary for tasktree: a whole tree is
//! saved to and loaded from a single JSON document.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │         Application Layer (CLI)             │
//! └─────────────────┬───────────────────────────┘
//!                   │ TreeStore
//! ┌─────────────────▼───────────────────────────┐
//! │         JsonStore (this crate)              │
//! │  • open / get_tree / save_tree / close      │
//! │  • id validation on load                    │
//! └─────────────────┬───────────────────────────┘
//!                   │ snapshot_io
//! ┌─────────────────▼───────────────────────────┐
//! │         .tasktree/tree.json                 │
//! │  • {version, root: {id, name, status,       │
//! │     connections, children}}                 │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use tasktree_core::{TaskStatus, TaskTree};
//! use tasktree_store::{JsonStore, TreeStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = JsonStore::open(".tasktree/tree.json").await?;
//!
//! let mut tree = TaskTree::new("Release 1.0", TaskStatus::Pending, None)?;
//! tree.add_child(tree.root(), "Write changelog", TaskStatus::Pending, None)?;
//! store.save_tree(&tree).await?;
//!
//! let loaded = store.get_tree(None).await?;
//! assert_eq!(loaded.len(), 2);
//!
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod snapshot_io;
pub mod store;

pub use snapshot_io::{delete_snapshot, read_snapshot, write_snapshot};
pub use store::{JsonStore, TreeStore};
