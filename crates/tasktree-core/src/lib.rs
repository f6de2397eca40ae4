//! # tasktree-core
//!
//! Core types for tasktree: a tree of tasks where each task also keeps a
//! small set of tagged connections to other tasks.
//!
//! ## Building blocks
//!
//! - [`IdentifierPolicy`] validates and generates [`TaskId`]s
//! - [`Connection`] points at one task id and carries a set of tags
//! - [`Connections`] holds at most one connection per id and unions by
//!   merging the tags of colliding ids
//! - [`TaskTree`] owns the tasks and gives each one an id unique within the tree

pub mod config;
pub mod connection;
pub mod connections;
mod error;
pub mod schema;
pub mod status;
pub mod system;
pub mod task;

pub use config::TaskTreeConfig;
pub use connection::{Connection, TagPattern};
pub use connections::{Addition, ConnectionKey, Connections, ConnectionsSnapshot};
pub use error::{Error, Result};
pub use schema::{SnapshotFile, TaskRecord, SNAPSHOT_VERSION};
pub use status::TaskStatus;
pub use system::{IdentifierPolicy, TaskId, DEFAULT_MIN_ID_LEN};
pub use task::{NodeIdx, Task, TaskTree};
