//! Closure and path queries over the parent/child graph.
//!
//! Neighbours are always expanded in unit order (id, then version), so path
//! results do not depend on hash iteration order.

use std::collections::{BTreeSet, HashSet, VecDeque};

use petgraph::Direction;

use super::{UnitKey, UsageReport};
use crate::domain::Unit;

impl UsageReport {
    fn neighbours(&self, key: UnitKey, direction: Direction) -> Vec<UnitKey> {
        let mut neighbours: Vec<_> = self.graph.neighbors_directed(key, direction).collect();
        neighbours.sort_by(|a, b| self.unit(*a).cmp(self.unit(*b)));
        neighbours
    }

    fn resolve(&self, keys: &[UnitKey]) -> Vec<&Unit> {
        keys.iter().map(|key| self.unit(*key)).collect()
    }

    /// Direct children of `unit`, in unit order.
    #[must_use]
    pub fn children(&self, unit: &Unit) -> Vec<&Unit> {
        self.key(unit)
            .map(|key| self.resolve(&self.neighbours(key, Direction::Outgoing)))
            .unwrap_or_default()
    }

    /// Direct parents of `unit`, in unit order.
    #[must_use]
    pub fn parents(&self, unit: &Unit) -> Vec<&Unit> {
        self.key(unit)
            .map(|key| self.resolve(&self.neighbours(key, Direction::Incoming)))
            .unwrap_or_default()
    }

    fn descendant_keys(&self, start: UnitKey) -> HashSet<UnitKey> {
        let mut found = HashSet::new();
        let mut stack = vec![start];

        while let Some(key) = stack.pop() {
            for child in self.graph.neighbors_directed(key, Direction::Outgoing) {
                if child != start && found.insert(child) {
                    stack.push(child);
                }
            }
        }

        found
    }

    /// Every unit reachable from `unit` through child edges.
    ///
    /// Never contains `unit` itself, even when it sits on a cycle.
    #[must_use]
    pub fn all_children(&self, unit: &Unit) -> BTreeSet<&Unit> {
        self.key(unit)
            .map(|key| {
                self.descendant_keys(key)
                    .into_iter()
                    .map(|child| self.unit(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Breadth-first search from `from`, carrying full paths. Returns the
    /// first dequeued path whose last node is accepted.
    fn breadth_first(
        &self,
        from: UnitKey,
        direction: Direction,
        accept: impl Fn(UnitKey) -> bool,
    ) -> Option<Vec<UnitKey>> {
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([vec![from]]);

        while let Some(path) = queue.pop_front() {
            let current = *path.last()?;
            if accept(current) {
                return Some(path);
            }

            for next in self.neighbours(current, direction) {
                if visited.insert(next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    queue.push_back(extended);
                }
            }
        }

        None
    }

    /// A shortest child-edge path from `start` to `end`, both included.
    ///
    /// Returns `[start]` when they are equal. When `end` is not reachable the
    /// result is the two-element `[start, end]`, which callers should read as
    /// "no chain" rather than as an edge.
    #[must_use]
    pub fn find_path_between<'a>(&'a self, start: &'a Unit, end: &'a Unit) -> Vec<&'a Unit> {
        if start == end {
            return vec![start];
        }
        let (Some(from), Some(to)) = (self.key(start), self.key(end)) else {
            return vec![start, end];
        };

        self.breadth_first(from, Direction::Outgoing, |key| key == to)
            .map_or_else(|| vec![start, end], |path| self.resolve(&path))
    }

    /// A shortest path from any root unit down to `unit`, reading root first.
    ///
    /// Parents are searched upward from `unit` and the first root dequeued is
    /// accepted. Returns `[unit]` for roots and for units with no root above
    /// them.
    #[must_use]
    pub fn shortest_path_from_root<'a>(&'a self, unit: &'a Unit) -> Vec<&'a Unit> {
        let Some(key) = self.key(unit) else {
            return vec![unit];
        };

        self.breadth_first(key, Direction::Incoming, |candidate| self.is_root_key(candidate))
            .map_or_else(
                || vec![unit],
                |mut path| {
                    path.reverse();
                    self.resolve(&path)
                },
            )
    }
}
