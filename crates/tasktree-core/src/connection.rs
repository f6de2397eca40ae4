//! Tagged reference from one task to another.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::system::{IdentifierPolicy, TaskId};
use crate::{Error, Result};

/// Connection to a task identified by id, labelled with free-form tags.
///
/// Equality, ordering and hashing look at the target id only: two
/// connections to the same task are the same connection whatever their
/// tags. The id is fixed at construction; tags may change freely.
#[derive(Debug, Clone)]
pub struct Connection {
    id: TaskId,
    tags: BTreeSet<String>,
}

impl Connection {
    pub const SELF_TAG: &'static str = "self";
    pub const PARENT_TAG: &'static str = "parent";
    pub const CHILD_TAG: &'static str = "child";
    /// Marks the connection a task holds to itself from creation.
    pub const GUARD_TAG: &'static str = "guard";

    /// Create a connection, validating `id` with the default policy.
    pub fn new<I, S>(id: impl Into<String>, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_policy(&IdentifierPolicy::default(), id, tags)
    }

    pub fn with_policy<I, S>(policy: &IdentifierPolicy, id: impl Into<String>, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = policy.parse(id)?;
        Ok(Self::from_id(id).tagged(tags))
    }

    /// Untagged connection to an already validated id.
    pub fn from_id(id: TaskId) -> Self {
        Self {
            id,
            tags: BTreeSet::new(),
        }
    }

    fn tagged<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Builder form of [`add_tag`](Self::add_tag).
    pub fn tagged_with(mut self, tag: impl Into<String>) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// New connection carrying a copy of these tags under another id.
    pub fn copy(&self, new_id: impl Into<String>) -> Result<Self> {
        self.copy_with_policy(&IdentifierPolicy::default(), new_id)
    }

    /// [`copy`](Self::copy) validating `new_id` with `policy`.
    pub fn copy_with_policy(&self, policy: &IdentifierPolicy, new_id: impl Into<String>) -> Result<Self> {
        let new_id = new_id.into();
        if new_id == self.id.as_str() {
            return Err(Error::SameIdentifier(new_id));
        }
        let id = policy.parse(new_id)?;
        Ok(Self {
            id,
            tags: self.tags.clone(),
        })
    }

    /// Add a tag. Returns false if it was already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Remove a tag. Returns false if it was not present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_self(&self) -> bool {
        self.has_tag(Self::SELF_TAG)
    }

    pub fn is_parent(&self) -> bool {
        self.has_tag(Self::PARENT_TAG)
    }

    pub fn is_child(&self) -> bool {
        self.has_tag(Self::CHILD_TAG)
    }

    /// True if at least one tag fully matches `pattern`.
    pub fn matches_any_tag(&self, pattern: &TagPattern) -> bool {
        self.tags.iter().any(|tag| pattern.is_match(tag))
    }

    pub(crate) fn merge_tags(&mut self, other: &Connection) {
        self.tags.extend(other.tags.iter().cloned());
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Connection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Connection {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.id)?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        f.write_str("]")
    }
}

/// Regular expression matched against whole tags, never substrings.
#[derive(Debug, Clone)]
pub struct TagPattern {
    source: String,
    regex: Regex,
}

impl TagPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }
}
