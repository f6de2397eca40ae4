//! Set of connections keyed by target id, with tag-merging union.
//!
//! A [`Connections`] value holds at most one [`Connection`] per task id.
//! Whenever two connections with the same id meet (on construction, on
//! [`Connections::add`] or on union) the result keeps one connection whose
//! tags are the union of both, so merging is commutative and associative.
//!
//! The canonical form ([`Connections::to_snapshot`]) maps each id to its
//! sorted tag list with ids sorted as well. It drives equality and is the
//! serialized representation used by the snapshot store.
//!
//! Each collection carries the [`IdentifierPolicy`] bare ids are checked
//! against. Reading the canonical form back goes through
//! [`Connections::from_snapshot`] so the caller's policy applies.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::{BitOr, BitOrAssign};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::connection::{Connection, TagPattern};
use crate::system::{IdentifierPolicy, TaskId};
use crate::{Error, Result};

/// Canonical form: id -> sorted tags, ids sorted.
pub type ConnectionsSnapshot = BTreeMap<String, Vec<String>>;

/// Anything that names a connection target.
pub trait ConnectionKey {
    fn key(&self) -> &str;
}

impl ConnectionKey for str {
    fn key(&self) -> &str {
        self
    }
}

impl ConnectionKey for String {
    fn key(&self) -> &str {
        self
    }
}

impl ConnectionKey for TaskId {
    fn key(&self) -> &str {
        self.as_str()
    }
}

impl ConnectionKey for Connection {
    fn key(&self) -> &str {
        self.id().as_str()
    }
}

/// Values accepted by [`Connections::add`].
#[derive(Debug, Clone)]
pub enum Addition {
    Connection(Connection),
    /// Bare id: inserted without tags unless already present.
    Id(String),
    Connections(Connections),
    Many(Vec<Connection>),
}

impl From<Connection> for Addition {
    fn from(connection: Connection) -> Self {
        Self::Connection(connection)
    }
}

impl From<&str> for Addition {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Addition {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<TaskId> for Addition {
    fn from(id: TaskId) -> Self {
        Self::Id(id.into_string())
    }
}

impl From<Connections> for Addition {
    fn from(connections: Connections) -> Self {
        Self::Connections(connections)
    }
}

impl From<&Connections> for Addition {
    fn from(connections: &Connections) -> Self {
        Self::Connections(connections.clone())
    }
}

impl From<Vec<Connection>> for Addition {
    fn from(connections: Vec<Connection>) -> Self {
        Self::Many(connections)
    }
}

impl Addition {
    /// Strings are ids, objects are snapshots, arrays hold connection
    /// objects. Ids inside objects and arrays are checked with `policy`.
    pub fn from_value(value: Value, policy: &IdentifierPolicy) -> Result<Self> {
        match value {
            Value::String(id) => Ok(Self::Id(id)),
            value @ Value::Object(_) => {
                Connections::from_value(value, policy).map(Self::Connections)
            }
            Value::Array(items) => items
                .iter()
                .map(|item| connection_from_value(item, policy))
                .collect::<Result<Vec<_>>>()
                .map(Self::Many),
            other => Err(Error::UnsupportedOperand(json_kind(&other).to_string())),
        }
    }
}

impl TryFrom<Value> for Addition {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value, &IdentifierPolicy::default())
    }
}

/// Connections of one task.
#[derive(Debug, Clone, Default)]
pub struct Connections {
    data: BTreeMap<TaskId, Connection>,
    policy: IdentifierPolicy,
}

impl Connections {
    /// Build from `connections`, optionally adding a `self`/`guard`
    /// connection to `owner`.
    ///
    /// Connections sharing an id are merged. Nothing is inserted unless
    /// the whole input, owner included, is valid.
    pub fn new<I>(connections: I, owner: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = Connection>,
    {
        Self::new_with_policy(IdentifierPolicy::default(), connections, owner)
    }

    /// [`new`](Self::new) checking `owner` and later bare ids with `policy`.
    pub fn new_with_policy<I>(policy: IdentifierPolicy, connections: I, owner: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = Connection>,
    {
        let connections: Vec<Connection> = connections.into_iter().collect();
        let owner = owner
            .map(|owner| policy.parse(owner).map(|id| Self::guard_for(&id)))
            .transpose()?;

        let mut result = Self::with_policy(policy);
        for connection in connections.into_iter().chain(owner) {
            result.insert_merged(connection);
        }
        Ok(result)
    }

    /// Empty collection validating bare ids with `policy`.
    pub fn with_policy(policy: IdentifierPolicy) -> Self {
        Self {
            data: BTreeMap::new(),
            policy,
        }
    }

    /// Collection holding only the guarded self connection of `owner`.
    pub fn with_owner(owner: &TaskId, policy: IdentifierPolicy) -> Self {
        let mut result = Self::with_policy(policy);
        result.insert_merged(Self::guard_for(owner));
        result
    }

    fn guard_for(owner: &TaskId) -> Connection {
        Connection::from_id(owner.clone())
            .tagged_with(Connection::SELF_TAG)
            .tagged_with(Connection::GUARD_TAG)
    }

    pub fn policy(&self) -> &IdentifierPolicy {
        &self.policy
    }

    /// Rebuild from the canonical form, validating ids with `policy`.
    pub fn from_snapshot(snapshot: &ConnectionsSnapshot, policy: &IdentifierPolicy) -> Result<Self> {
        let mut result = Self::with_policy(*policy);
        for (id, tags) in snapshot {
            result.insert_merged(Connection::with_policy(policy, id.as_str(), tags.iter().cloned())?);
        }
        Ok(result)
    }

    /// Canonical form with sorted ids and sorted tags.
    pub fn to_snapshot(&self) -> ConnectionsSnapshot {
        self.data
            .iter()
            .map(|(id, connection)| {
                (id.to_string(), connection.tags().iter().cloned().collect())
            })
            .collect()
    }

    fn insert_merged(&mut self, connection: Connection) {
        match self.data.entry(connection.id().clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().merge_tags(&connection),
            Entry::Vacant(entry) => {
                entry.insert(connection);
            }
        }
    }

    pub fn find<K: ConnectionKey + ?Sized>(&self, key: &K) -> Option<&Connection> {
        self.data.get(key.key())
    }

    pub fn find_mut<K: ConnectionKey + ?Sized>(&mut self, key: &K) -> Option<&mut Connection> {
        self.data.get_mut(key.key())
    }

    pub fn ids(&self) -> impl Iterator<Item = &TaskId> + '_ {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.data.values()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Connections carrying exactly `tag`.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.iter().filter(move |c| c.has_tag(tag))
    }

    /// Connections with at least one tag fully matching `pattern`.
    pub fn match_tag<'a>(
        &'a self,
        pattern: &'a TagPattern,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.iter().filter(move |c| c.matches_any_tag(pattern))
    }

    pub fn is_connected_with_tag<K: ConnectionKey + ?Sized>(&self, key: &K, tag: &str) -> bool {
        self.find(key).is_some_and(|c| c.has_tag(tag))
    }

    pub fn is_connected_with_matching_tag<K: ConnectionKey + ?Sized>(
        &self,
        key: &K,
        pattern: &TagPattern,
    ) -> bool {
        self.find(key).is_some_and(|c| c.matches_any_tag(pattern))
    }

    /// Merge `other` into a new collection.
    pub fn union(&self, other: &Connections) -> Connections {
        let mut result = self.clone();
        result.union_in_place(other);
        result
    }

    /// Merge `other` into `self`.
    pub fn union_in_place(&mut self, other: &Connections) {
        for connection in other.iter() {
            self.insert_merged(connection.clone());
        }
    }

    /// Add a connection, a bare id, another collection or a list of
    /// connections. Bare ids are checked with this collection's policy.
    /// On error `self` is left untouched.
    pub fn add(&mut self, value: impl Into<Addition>) -> Result<()> {
        match value.into() {
            Addition::Connection(connection) => self.insert_merged(connection),
            Addition::Id(id) => {
                let id = self.policy.parse(id)?;
                if !self.data.contains_key(&id) {
                    self.data.insert(id.clone(), Connection::from_id(id));
                }
            }
            Addition::Connections(other) => self.union_in_place(&other),
            Addition::Many(connections) => {
                for connection in connections {
                    self.insert_merged(connection);
                }
            }
        }
        Ok(())
    }

    /// Remove the connection with this id. Absent ids are ignored.
    pub fn remove<K: ConnectionKey + ?Sized>(&mut self, key: &K) -> Option<Connection> {
        self.data.remove(key.key())
    }

    pub fn contains<K: ConnectionKey + ?Sized>(&self, key: &K) -> bool {
        self.data.contains_key(key.key())
    }
}

impl PartialEq for Connections {
    /// Same outcome as comparing [`Connections::to_snapshot`] results.
    /// The policy takes no part.
    fn eq(&self, other: &Self) -> bool {
        self.data.len() == other.data.len()
            && self
                .data
                .values()
                .zip(other.data.values())
                .all(|(a, b)| a.id() == b.id() && a.tags() == b.tags())
    }
}

impl Eq for Connections {}

impl BitOr for &Connections {
    type Output = Connections;

    fn bitor(self, other: &Connections) -> Connections {
        self.union(other)
    }
}

impl BitOrAssign<&Connections> for Connections {
    fn bitor_assign(&mut self, other: &Connections) {
        self.union_in_place(other);
    }
}

impl<'a> IntoIterator for &'a Connections {
    type Item = &'a Connection;
    type IntoIter = std::collections::btree_map::Values<'a, TaskId, Connection>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.values()
    }
}

impl FromIterator<Connection> for Connections {
    fn from_iter<I: IntoIterator<Item = Connection>>(iter: I) -> Self {
        let mut result = Self::default();
        for connection in iter {
            result.insert_merged(connection);
        }
        result
    }
}

impl Connections {
    /// Accepts a snapshot object or an array of `{"id", "tags"}` objects,
    /// validating ids with `policy`.
    pub fn from_value(value: Value, policy: &IdentifierPolicy) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let connections = items
                    .iter()
                    .map(|item| connection_from_value(item, policy))
                    .collect::<Result<Vec<_>>>()?;
                Connections::new_with_policy(*policy, connections, None)
            }
            Value::Object(map) => {
                let mut snapshot = ConnectionsSnapshot::new();
                for (id, tags) in map {
                    let tags = string_array(&tags).ok_or_else(|| {
                        Error::NotAConnection(format!("{}: {}", id, tags))
                    })?;
                    snapshot.insert(id, tags);
                }
                Connections::from_snapshot(&snapshot, policy)
            }
            other => Err(Error::NotAConnection(other.to_string())),
        }
    }
}

impl TryFrom<Value> for Connections {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value, &IdentifierPolicy::default())
    }
}

impl Serialize for Connections {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_snapshot().serialize(serializer)
    }
}

fn connection_from_value(value: &Value, policy: &IdentifierPolicy) -> Result<Connection> {
    let not_a_connection = || Error::NotAConnection(value.to_string());

    let object = value.as_object().ok_or_else(not_a_connection)?;
    let id = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(not_a_connection)?;
    let tags = match object.get("tags") {
        None => Vec::new(),
        Some(tags) => string_array(tags).ok_or_else(not_a_connection)?,
    };
    Connection::with_policy(policy, id, tags)
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    const DEFAULT_ID: &str = "123456";
    const OTHER_ID: &str = "654321";
    const NEW_ID: &str = "1010101010";

    fn conn(id: &str, tags: &[&str]) -> Connection {
        Connection::new(id, tags.iter().copied()).unwrap()
    }

    fn ids_of<'a>(it: impl Iterator<Item = &'a Connection>) -> BTreeSet<String> {
        it.map(|c| c.id().to_string()).collect()
    }

    #[test]
    fn test_untyped_input_with_foreign_elements_fails() {
        for value in [
            json!([{"id": DEFAULT_ID}, 2]),
            json!([3, {"id": DEFAULT_ID}]),
            json!([3, 15]),
            json!("123456"),
            json!({DEFAULT_ID: "not-a-list"}),
        ] {
            assert!(
                matches!(Connections::try_from(value.clone()), Err(Error::NotAConnection(_))),
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_untyped_input_parses() {
        let from_array = Connections::try_from(json!([
            {"id": DEFAULT_ID, "tags": ["a"]},
            {"id": OTHER_ID}
        ]))
        .unwrap();
        let from_object = Connections::try_from(json!({DEFAULT_ID: ["a"], OTHER_ID: []})).unwrap();
        assert_eq!(from_array, from_object);
    }

    #[test]
    fn test_duplicate_ids_in_input_collapse() {
        let cncts = Connections::new(
            vec![conn(DEFAULT_ID, &[]), conn(OTHER_ID, &["a"]), conn(OTHER_ID, &["b"])],
            None,
        )
        .unwrap();
        assert_eq!(cncts.len(), 2);
        assert_eq!(cncts.find(OTHER_ID).unwrap().tags().len(), 2);
    }

    #[test]
    fn test_owner_gets_guarded_self_connection() {
        let cncts = Connections::new(vec![conn(DEFAULT_ID, &[])], Some(OTHER_ID)).unwrap();
        assert!(cncts.contains(&conn(DEFAULT_ID, &[])));
        assert!(cncts.contains(OTHER_ID));

        let own = cncts.find(OTHER_ID).unwrap();
        assert!(own.is_self());
        assert!(own.has_tag("guard"));
    }

    #[test]
    fn test_self_bootstrap_scenario() {
        let cncts = Connections::new(Vec::new(), Some("abc123")).unwrap();
        let own = cncts.find("abc123").unwrap();
        assert!(own.is_self());
        assert!(own.has_tag("guard"));
        assert!(cncts.find("missing").is_none());
    }

    #[test]
    fn test_invalid_owner_fails() {
        let result = Connections::new(vec![conn(DEFAULT_ID, &[])], Some("abc"));
        assert!(matches!(result, Err(Error::InvalidIdentifier(_, _))));
    }

    #[test]
    fn test_find_connection() {
        let empty = Connections::default();
        assert!(empty.find(DEFAULT_ID).is_none());

        let cncts: Connections =
            [conn(DEFAULT_ID, &[]), conn(OTHER_ID, &[]), conn(NEW_ID, &[])].into_iter().collect();
        assert!(cncts.find(DEFAULT_ID).is_some());
        assert!(cncts.find(OTHER_ID).is_some());
        assert!(cncts.find(NEW_ID).is_some());
        assert!(cncts.find("").is_none());
    }

    #[test]
    fn test_ids_and_len() {
        let ids: BTreeSet<&str> = [DEFAULT_ID, OTHER_ID, NEW_ID].into_iter().collect();
        let cncts: Connections = ids.iter().map(|id| conn(id, &[])).collect();
        let found: BTreeSet<&str> = cncts.ids().map(TaskId::as_str).collect();
        assert_eq!(found, ids);
        assert_eq!(cncts.len(), 3);

        let empty = Connections::default();
        assert_eq!(empty.ids().count(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_with_tag() {
        let cncts = Connections::new(
            vec![conn(DEFAULT_ID, &["self", "other"]), conn(OTHER_ID, &["yes"])],
            Some(NEW_ID),
        )
        .unwrap();

        let expected_self: BTreeSet<String> =
            [DEFAULT_ID, NEW_ID].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids_of(cncts.with_tag("self")), expected_self);
        assert_eq!(
            ids_of(cncts.with_tag("other")),
            BTreeSet::from([DEFAULT_ID.to_string()])
        );
        assert!(cncts.with_tag("no_such_tag_believe_me").next().is_none());
        assert!(Connections::default().with_tag("self").next().is_none());
    }

    #[test]
    fn test_match_tag() {
        let cncts: Connections = [
            conn(DEFAULT_ID, &["abcd", "abcdd"]),
            conn(OTHER_ID, &["012d"]),
            conn(NEW_ID, &["0123"]),
        ]
        .into_iter()
        .collect();

        let cases: [(&[&str], &str); 3] = [
            (&[DEFAULT_ID, OTHER_ID], ".*d+"),
            (&[OTHER_ID, NEW_ID], "012."),
            (&[NEW_ID], "[0-9]+"),
        ];
        for (expected, pattern) in cases {
            let pattern = TagPattern::new(pattern).unwrap();
            let expected: BTreeSet<String> = expected.iter().map(|s| s.to_string()).collect();
            assert_eq!(ids_of(cncts.match_tag(&pattern)), expected);
        }
        assert_eq!(cncts.find(DEFAULT_ID).unwrap().tags().len(), 2);
    }

    #[test]
    fn test_is_connected_with_tag() {
        let source = [conn(DEFAULT_ID, &["self", "other"]), conn(OTHER_ID, &["yes"])];
        let cncts: Connections = source.iter().cloned().collect();

        assert!(!cncts.is_connected_with_tag(OTHER_ID, "no_such_tag"));
        assert!(!cncts.is_connected_with_tag(NEW_ID, "self"));
        for c in &source {
            for t in c.tags() {
                assert!(cncts.is_connected_with_tag(c, t));
            }
        }
    }

    #[test]
    fn test_is_connected_with_matching_tag() {
        let cncts: Connections =
            [conn(DEFAULT_ID, &["self", "other"]), conn(OTHER_ID, &["yes"])].into_iter().collect();
        let p = |s: &str| TagPattern::new(s).unwrap();

        assert!(!cncts.is_connected_with_matching_tag(OTHER_ID, &p("ye?")));
        assert!(!cncts.is_connected_with_matching_tag(NEW_ID, &p(".*")));
        assert!(cncts.is_connected_with_matching_tag(OTHER_ID, &p(".*")));
        assert!(cncts.is_connected_with_matching_tag(OTHER_ID, &p("yesd?")));
        assert!(cncts.is_connected_with_matching_tag(DEFAULT_ID, &p("[so].*e.*")));
        assert!(cncts.is_connected_with_matching_tag(DEFAULT_ID, &p("self$")));
    }

    #[test]
    fn test_union_merges_colliding_tags() {
        let first: Connections =
            [conn(DEFAULT_ID, &["self", "other"]), conn(OTHER_ID, &["yes"])].into_iter().collect();
        let second: Connections =
            [conn(NEW_ID, &["no", "whatever"]), conn(OTHER_ID, &["yes", "something_new"])]
                .into_iter()
                .collect();
        let expected: Connections = [
            conn(DEFAULT_ID, &["self", "other"]),
            conn(NEW_ID, &["no", "whatever"]),
            conn(OTHER_ID, &["yes", "something_new"]),
        ]
        .into_iter()
        .collect();

        assert_eq!(&first | &second, expected);
    }

    #[test]
    fn test_union_single_collision() {
        let a: Connections = [conn("xxxxxx", &["a"])].into_iter().collect();
        let b: Connections = [conn("xxxxxx", &["b"])].into_iter().collect();
        let merged = a.union(&b);
        assert_eq!(merged.len(), 1);
        let tags: Vec<&str> = merged.find("xxxxxx").unwrap().tags().iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_union_carries_one_sided_connections_unchanged() {
        let a: Connections = [conn(DEFAULT_ID, &["x", "y"]), conn(NEW_ID, &["shared"])]
            .into_iter()
            .collect();
        let b: Connections = [conn(OTHER_ID, &["z"]), conn(NEW_ID, &["other"])].into_iter().collect();

        let merged = a.union(&b);
        assert_eq!(merged.find(DEFAULT_ID).unwrap().tags(), a.find(DEFAULT_ID).unwrap().tags());
        assert_eq!(merged.find(OTHER_ID).unwrap().tags(), b.find(OTHER_ID).unwrap().tags());
        // Inputs are not modified by a non-in-place union.
        assert_eq!(a.find(NEW_ID).unwrap().tags().len(), 1);
    }

    #[test]
    fn test_union_commutative_and_associative() {
        let a: Connections = [conn(DEFAULT_ID, &["a"]), conn(OTHER_ID, &["a1"])].into_iter().collect();
        let b: Connections = [conn(OTHER_ID, &["b"]), conn(NEW_ID, &["b1"])].into_iter().collect();
        let c: Connections = [conn(DEFAULT_ID, &["c"]), conn(NEW_ID, &["c1", "b1"]), conn("zzzzzz", &[])]
            .into_iter()
            .collect();

        for (x, y) in [(&a, &b), (&b, &c), (&a, &c), (&a, &Connections::default())] {
            assert_eq!(x.union(y), y.union(x));
        }
        assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
        assert_eq!(a.union(&a), a);
    }

    #[test]
    fn test_union_in_place_operator() {
        let mut a: Connections = [conn(DEFAULT_ID, &["a"])].into_iter().collect();
        let b: Connections = [conn(DEFAULT_ID, &["b"]), conn(OTHER_ID, &[])].into_iter().collect();
        a |= &b;
        assert_eq!(a.len(), 2);
        assert!(a.is_connected_with_tag(DEFAULT_ID, "a"));
        assert!(a.is_connected_with_tag(DEFAULT_ID, "b"));
    }

    #[test]
    fn test_add_variants() {
        let mut cncts = Connections::default();
        cncts.add(conn(DEFAULT_ID, &["a"])).unwrap();
        cncts.add(conn(DEFAULT_ID, &["b"])).unwrap();
        assert_eq!(cncts.find(DEFAULT_ID).unwrap().tags().len(), 2);

        // Bare id on an existing connection keeps its tags.
        cncts.add(DEFAULT_ID).unwrap();
        assert_eq!(cncts.find(DEFAULT_ID).unwrap().tags().len(), 2);

        cncts.add(OTHER_ID.to_string()).unwrap();
        assert!(cncts.find(OTHER_ID).unwrap().tags().is_empty());

        cncts.add(vec![conn(NEW_ID, &["n"]), conn(OTHER_ID, &["o"])]).unwrap();
        assert!(cncts.is_connected_with_tag(OTHER_ID, "o"));

        let other: Connections = [conn("qqqqqq", &["q"])].into_iter().collect();
        cncts.add(&other).unwrap();
        assert_eq!(cncts.len(), 4);
    }

    #[test]
    fn test_add_failure_leaves_collection_untouched() {
        let mut cncts: Connections = [conn(DEFAULT_ID, &["a"])].into_iter().collect();
        let before = cncts.clone();

        assert!(matches!(cncts.add("abc"), Err(Error::InvalidIdentifier(_, _))));
        assert_eq!(cncts, before);

        for value in [json!(42), json!(null), json!(true)] {
            assert!(matches!(Addition::try_from(value), Err(Error::UnsupportedOperand(_))));
        }
        assert!(matches!(
            Addition::try_from(json!([{"id": OTHER_ID}, 7])),
            Err(Error::NotAConnection(_))
        ));
    }

    #[test]
    fn test_add_from_json() {
        let mut cncts = Connections::default();
        cncts.add(Addition::try_from(json!(DEFAULT_ID)).unwrap()).unwrap();
        cncts.add(Addition::try_from(json!({OTHER_ID: ["x"]})).unwrap()).unwrap();
        cncts.add(Addition::try_from(json!([{"id": NEW_ID, "tags": ["y"]}])).unwrap()).unwrap();
        assert_eq!(cncts.len(), 3);
        assert!(cncts.is_connected_with_tag(NEW_ID, "y"));
    }

    #[test]
    fn test_remove_and_contains() {
        let mut cncts: Connections =
            [conn(DEFAULT_ID, &["a"]), conn(OTHER_ID, &[])].into_iter().collect();

        assert!(cncts.contains(&conn(DEFAULT_ID, &["unrelated"])));
        assert!(cncts.remove(&conn(DEFAULT_ID, &[])).is_some());
        assert!(!cncts.contains(DEFAULT_ID));

        assert!(cncts.remove(OTHER_ID).is_some());
        assert!(cncts.remove(OTHER_ID).is_none());
        assert!(cncts.remove("missing").is_none());
        assert!(cncts.is_empty());
    }

    #[test]
    fn test_canonical_form_independent_of_construction_path() {
        let direct = Connections::new(
            vec![conn(OTHER_ID, &["b", "a"]), conn(DEFAULT_ID, &["z"])],
            None,
        )
        .unwrap();

        let mut incremental = Connections::default();
        incremental.add(conn(DEFAULT_ID, &["z"])).unwrap();
        incremental.add(OTHER_ID).unwrap();
        incremental.find_mut(OTHER_ID).unwrap().add_tag("a");
        incremental.add(conn(OTHER_ID, &["b"])).unwrap();

        assert_eq!(direct.to_snapshot(), incremental.to_snapshot());
        assert_eq!(direct, incremental);
        assert_eq!(
            serde_json::to_string(&direct).unwrap(),
            r#"{"123456":["z"],"654321":["a","b"]}"#
        );
    }

    #[test]
    fn test_equality_is_tag_aware() {
        let a: Connections = [conn(DEFAULT_ID, &["a"])].into_iter().collect();
        let b: Connections = [conn(DEFAULT_ID, &["b"])].into_iter().collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_serialized_form_reads_back_through_snapshot() {
        let cncts: Connections =
            [conn(DEFAULT_ID, &["x", "y"]), conn(OTHER_ID, &[])].into_iter().collect();
        let text = serde_json::to_string(&cncts).unwrap();
        let snapshot: ConnectionsSnapshot = serde_json::from_str(&text).unwrap();
        let back = Connections::from_snapshot(&snapshot, &IdentifierPolicy::default()).unwrap();
        assert_eq!(back, cncts);

        let short: ConnectionsSnapshot = serde_json::from_str(r#"{"abc":[]}"#).unwrap();
        assert!(Connections::from_snapshot(&short, &IdentifierPolicy::default()).is_err());
    }

    #[test]
    fn test_bare_ids_follow_collection_policy() {
        let short = IdentifierPolicy::new(4).unwrap();
        let owner = short.parse("root").unwrap();
        let mut cncts = Connections::with_owner(&owner, short);

        cncts.add("kid1").unwrap();
        assert!(cncts.contains("kid1"));
        assert!(matches!(cncts.add("abc"), Err(Error::InvalidIdentifier(_, 4))));

        let strict = IdentifierPolicy::new(8).unwrap();
        let mut cncts = Connections::with_policy(strict);
        assert!(matches!(cncts.add(DEFAULT_ID), Err(Error::InvalidIdentifier(_, 8))));
        assert!(cncts.is_empty());
    }

    #[test]
    fn test_untyped_input_follows_given_policy() {
        let short = IdentifierPolicy::new(4).unwrap();

        let from_array = Connections::from_value(json!([{"id": "kid1", "tags": ["a"]}]), &short).unwrap();
        assert!(from_array.is_connected_with_tag("kid1", "a"));
        assert_eq!(from_array.policy(), &short);

        let from_object = Connections::from_value(json!({"kid2": ["b"]}), &short).unwrap();
        assert!(from_object.is_connected_with_tag("kid2", "b"));

        let addition = Addition::from_value(json!([{"id": "kid3"}]), &short).unwrap();
        let mut cncts = Connections::with_policy(short);
        cncts.add(addition).unwrap();
        assert!(cncts.contains("kid3"));

        let owned = Connections::new_with_policy(short, Vec::<Connection>::new(), Some("boss")).unwrap();
        assert!(owned.find("boss").unwrap().is_self());

        // The default policy still rejects four character ids.
        assert!(Connections::try_from(json!({"kid2": []})).is_err());
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        fn connections_strategy() -> impl Strategy<Value = Connections> {
            let id = prop_oneof![
                Just(DEFAULT_ID.to_string()),
                Just(OTHER_ID.to_string()),
                Just(NEW_ID.to_string()),
                "[a-z0-9]{6,8}",
            ];
            let tags = proptest::collection::btree_set("[a-c]{1,2}", 0..4);
            proptest::collection::vec((id, tags), 0..6).prop_map(|entries| {
                entries
                    .into_iter()
                    .map(|(id, tags)| Connection::new(id, tags).unwrap())
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn union_satisfies_join_laws(
                a in connections_strategy(),
                b in connections_strategy(),
                c in connections_strategy()
            ) {
                prop_assert_eq!(a.union(&a), a.clone());
                prop_assert_eq!(a.union(&b), b.union(&a));
                prop_assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
            }

            #[test]
            fn union_keeps_every_tag(
                a in connections_strategy(),
                b in connections_strategy()
            ) {
                let merged = a.union(&b);
                prop_assert_eq!(merged.len(), ids_of(a.iter()).union(&ids_of(b.iter())).count());

                for side in [&a, &b] {
                    for connection in side {
                        let kept = merged.find(connection.id()).unwrap();
                        prop_assert!(connection.tags().is_subset(kept.tags()));
                    }
                }
                // Ids found on one side only come through unchanged.
                for connection in a.iter().filter(|c| !b.contains(c.id())) {
                    prop_assert_eq!(merged.find(connection.id()).unwrap().tags(), connection.tags());
                }
            }
        }
    }
}
