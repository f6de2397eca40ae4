//! Task identifiers and the policy that validates and generates them.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::{Error, Result};

/// Minimum identifier length used when no configuration overrides it.
pub const DEFAULT_MIN_ID_LEN: usize = 6;

/// Characters drawn from when generating identifiers.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Identifier of a task.
///
/// Only obtainable through an [`IdentifierPolicy`], so every value in
/// circulation passed the policy's correctness check once.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Validate `id` against the default policy.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        IdentifierPolicy::default().parse(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({:?})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> String {
        id.0
    }
}

/// Decides which identifiers are acceptable and produces fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierPolicy {
    min_len: usize,
}

impl IdentifierPolicy {
    /// Policy requiring at least `min_len` characters. Zero is rejected
    /// since generated ids would then be empty and never distinct.
    pub fn new(min_len: usize) -> Result<Self> {
        if min_len == 0 {
            return Err(Error::Config(
                "minimum id length must be at least 1".to_string(),
            ));
        }
        Ok(Self { min_len })
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Check if a task id is correct.
    pub fn is_correct(&self, id: &str) -> bool {
        id.chars().count() >= self.min_len
    }

    /// Wrap `id` as a [`TaskId`] if it passes [`is_correct`](Self::is_correct).
    pub fn parse(&self, id: impl Into<String>) -> Result<TaskId> {
        let id = id.into();
        if self.is_correct(&id) {
            Ok(TaskId(id))
        } else {
            Err(Error::InvalidIdentifier(id, self.min_len))
        }
    }

    /// Random id of exactly `min_len` characters from `[a-z0-9]`.
    ///
    /// Not unique on its own; see [`assign`](Self::assign).
    pub fn generate(&self) -> TaskId {
        let mut rng = rand::thread_rng();
        let id = (0..self.min_len)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        TaskId(id)
    }

    /// Pick an identifier that does not appear in `used`.
    ///
    /// A caller-supplied `candidate` is validated and must be unused.
    /// Otherwise ids are generated until one misses `used`.
    pub fn assign(&self, used: &HashSet<&str>, candidate: Option<&str>) -> Result<TaskId> {
        if let Some(candidate) = candidate {
            let id = self.parse(candidate)?;
            if used.contains(id.as_str()) {
                return Err(Error::DuplicateIdentifier(id.into_string()));
            }
            return Ok(id);
        }

        loop {
            let id = self.generate();
            if !used.contains(id.as_str()) {
                return Ok(id);
            }
        }
    }
}

impl Default for IdentifierPolicy {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_ID_LEN,
        }
    }
}
