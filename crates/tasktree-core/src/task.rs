//! Task tree with per-tree unique identifiers.
//!
//! Tasks live in an arena owned by [`TaskTree`]; parents and children refer
//! to each other through [`NodeIdx`] handles, the parent handle being the
//! non-owning back link. Every new task gets an identifier that no other
//! task of the same tree uses, chosen by the tree's [`IdentifierPolicy`].

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::connection::Connection;
use crate::connections::Connections;
use crate::schema::TaskRecord;
use crate::status::TaskStatus;
use crate::system::{IdentifierPolicy, TaskId};
use crate::{Error, Result};

/// Handle to a task inside one [`TaskTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

/// A single task node
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    parent: Option<NodeIdx>,
    children: Vec<NodeIdx>,
    /// Relations to other tasks. Starts with a guarded self connection.
    pub connections: Connections,
}

impl Task {
    fn new(
        id: TaskId,
        name: String,
        status: TaskStatus,
        parent: Option<NodeIdx>,
        policy: IdentifierPolicy,
    ) -> Self {
        let connections = Connections::with_owner(&id, policy);
        Self {
            id,
            name,
            status,
            parent,
            children: Vec::new(),
            connections,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn parent(&self) -> Option<NodeIdx> {
        self.parent
    }

    pub fn children(&self) -> &[NodeIdx] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Tree of tasks rooted at [`TaskTree::root`].
#[derive(Debug, Clone)]
pub struct TaskTree {
    policy: IdentifierPolicy,
    nodes: Vec<Task>,
}

impl TaskTree {
    /// Create a tree holding only a root task.
    pub fn new(name: impl Into<String>, status: TaskStatus, candidate: Option<&str>) -> Result<Self> {
        Self::with_policy(IdentifierPolicy::default(), name, status, candidate)
    }

    pub fn with_policy(
        policy: IdentifierPolicy,
        name: impl Into<String>,
        status: TaskStatus,
        candidate: Option<&str>,
    ) -> Result<Self> {
        let id = policy.assign(&HashSet::new(), candidate)?;
        debug!("Created task tree with root {}", id);
        Ok(Self {
            policy,
            nodes: vec![Task::new(id, name.into(), status, None, policy)],
        })
    }

    pub fn policy(&self) -> &IdentifierPolicy {
        &self.policy
    }

    pub fn root(&self) -> NodeIdx {
        NodeIdx(0)
    }

    pub fn root_task(&self) -> &Task {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: every tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: NodeIdx) -> Option<&Task> {
        self.nodes.get(idx.0)
    }

    pub fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut Task> {
        self.nodes.get_mut(idx.0)
    }

    fn task_or_err(&self, idx: NodeIdx) -> Result<&Task> {
        self.get(idx)
            .ok_or_else(|| Error::TaskNotFound(format!("node #{}", idx.0)))
    }

    /// Handle of the task with this id.
    pub fn find(&self, id: &str) -> Option<NodeIdx> {
        self.nodes
            .iter()
            .position(|task| task.id.as_str() == id)
            .map(NodeIdx)
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.find(id).and_then(|idx| self.get(idx))
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        let idx = self.find(id)?;
        self.get_mut(idx)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TaskId> + '_ {
        self.nodes.iter().map(Task::id)
    }

    pub fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.get(idx).and_then(Task::parent)
    }

    pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
        self.get(idx).map(Task::children).unwrap_or_default()
    }

    /// `idx` and everything below it, in pre-order.
    pub fn descendants(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut result = Vec::new();
        if self.get(idx).is_none() {
            return result;
        }
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut result = Vec::new();
        let mut current = self.parent(idx);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    /// Depth of `idx`, the root being at depth 0.
    pub fn depth(&self, idx: NodeIdx) -> usize {
        self.ancestors(idx).len()
    }

    /// Pick an identifier unused by every task reachable from the root.
    pub fn assign_identity(&self, candidate: Option<&str>) -> Result<TaskId> {
        let used: HashSet<&str> = self
            .descendants(self.root())
            .into_iter()
            .map(|idx| self.nodes[idx.0].id.as_str())
            .collect();
        let id = self.policy.assign(&used, candidate)?;
        trace!("Assigned id {} against {} existing tasks", id, used.len());
        Ok(id)
    }

    /// Add a child task under `parent` and link the two.
    ///
    /// The parent gains a `child` connection to the new task and the new
    /// task a `parent` connection back.
    pub fn add_child(
        &mut self,
        parent: NodeIdx,
        name: impl Into<String>,
        status: TaskStatus,
        candidate: Option<&str>,
    ) -> Result<NodeIdx> {
        let parent_id = self.task_or_err(parent)?.id.clone();
        let id = self.assign_identity(candidate)?;
        let idx = NodeIdx(self.nodes.len());

        let mut task = Task::new(id.clone(), name.into(), status, Some(parent), self.policy);
        task.connections
            .add(Connection::from_id(parent_id.clone()).tagged_with(Connection::PARENT_TAG))?;

        let parent_task = &mut self.nodes[parent.0];
        parent_task
            .connections
            .add(Connection::from_id(id.clone()).tagged_with(Connection::CHILD_TAG))?;
        parent_task.children.push(idx);

        self.nodes.push(task);
        debug!("Added task {} under {}", id, parent_id);
        Ok(idx)
    }

    pub fn set_status(&mut self, idx: NodeIdx, status: TaskStatus) -> Result<()> {
        let task = self
            .get_mut(idx)
            .ok_or_else(|| Error::TaskNotFound(format!("node #{}", idx.0)))?;
        task.status = status;
        Ok(())
    }

    /// Copy of the subtree rooted at the task with this id.
    ///
    /// Connections are copied as-is, including the new root's `parent`
    /// connection to a task outside the copy.
    pub fn subtree(&self, id: &str) -> Option<TaskTree> {
        let start = self.find(id)?;
        let order = self.descendants(start);

        let mut nodes: Vec<Task> = Vec::with_capacity(order.len());
        let mut remap = vec![None; self.nodes.len()];
        for (new, old) in order.iter().enumerate() {
            remap[old.0] = Some(NodeIdx(new));
        }
        for old in &order {
            let source = &self.nodes[old.0];
            let mut task = source.clone();
            task.parent = source.parent.and_then(|p| remap[p.0]);
            task.children = source
                .children
                .iter()
                .filter_map(|c| remap[c.0])
                .collect();
            nodes.push(task);
        }

        Some(TaskTree {
            policy: self.policy,
            nodes,
        })
    }

    /// Nested record of the whole tree.
    pub fn to_record(&self) -> TaskRecord {
        self.record_at(self.root())
    }

    fn record_at(&self, idx: NodeIdx) -> TaskRecord {
        let task = &self.nodes[idx.0];
        TaskRecord {
            id: task.id.to_string(),
            name: task.name.clone(),
            status: task.status,
            connections: task.connections.to_snapshot(),
            children: task
                .children
                .iter()
                .map(|&child| self.record_at(child))
                .collect(),
        }
    }

    /// Rebuild a tree from a record, validating every id with `policy`.
    ///
    /// Connections are restored exactly as recorded; no links are added.
    pub fn from_record(record: &TaskRecord, policy: IdentifierPolicy) -> Result<Self> {
        let mut tree = Self {
            policy,
            nodes: Vec::with_capacity(record.count()),
        };
        let mut seen = HashSet::new();
        tree.push_record(record, None, &mut seen)?;
        Ok(tree)
    }

    fn push_record(
        &mut self,
        record: &TaskRecord,
        parent: Option<NodeIdx>,
        seen: &mut HashSet<String>,
    ) -> Result<NodeIdx> {
        let id = self.policy.parse(record.id.as_str())?;
        if !seen.insert(record.id.clone()) {
            return Err(Error::DuplicateIdentifier(record.id.clone()));
        }

        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(Task {
            id,
            name: record.name.clone(),
            status: record.status,
            parent,
            children: Vec::with_capacity(record.children.len()),
            connections: Connections::from_snapshot(&record.connections, &self.policy)?,
        });

        for child in &record.children {
            let child_idx = self.push_record(child, Some(idx), seen)?;
            self.nodes[idx.0].children.push(child_idx);
        }
        Ok(idx)
    }
}
