//! `PropertySet` and related types for pass communication.
//!
//! Passes share a [`PropertySet`]: the coupling map chosen by the
//! configuration, the layout computed by the layout pass, and any typed
//! reports a pass wants to leave for the caller.
//!
//! # Examples
//!
//! ```
//! use psi_compile::{CouplingMap, PropertySet};
//!
//! #[derive(Debug, PartialEq)]
//! struct SwapBudget(usize);
//!
//! let mut props = PropertySet::new().with_coupling_map(CouplingMap::linear(4));
//! props.insert(SwapBudget(3));
//!
//! assert!(props.coupling_map.is_some());
//! assert_eq!(props.get::<SwapBudget>(), Some(&SwapBudget(3)));
//! ```

use petgraph::algo::astar;
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::NodeFiltered;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

use psi_ir::WireId;

/// A mapping from logical wires to physical positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    logical_to_physical: FxHashMap<WireId, u32>,
    physical_to_logical: FxHashMap<u32, WireId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (wire i -> position i).
    pub fn trivial(num_wires: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_wires {
            layout.add(WireId(i), i);
        }
        layout
    }

    /// Add a mapping from logical wire to physical position.
    ///
    /// Conflicting mappings on either side are removed first.
    pub fn add(&mut self, logical: WireId, physical: u32) {
        if let Some(&old_logical) = self.physical_to_logical.get(&physical) {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        if let Some(&old_physical) = self.logical_to_physical.get(&logical) {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Get the physical position of a logical wire.
    pub fn get_physical(&self, logical: WireId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Get the logical wire at a physical position.
    pub fn get_logical(&self, physical: u32) -> Option<WireId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Exchange the wires held at two physical positions.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.get(&p1).copied();
        let l2 = self.physical_to_logical.get(&p2).copied();

        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        } else {
            self.physical_to_logical.remove(&p2);
        }

        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        } else {
            self.physical_to_logical.remove(&p1);
        }
    }

    /// Get the number of mapped wires.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (WireId, u32)> + '_ {
        self.logical_to_physical.iter().map(|(&l, &p)| (l, p))
    }
}

/// Target coupling map: which physical positions may share a two-wire gate.
#[derive(Debug, Clone)]
pub struct CouplingMap {
    graph: UnGraphMap<u32, ()>,
    num_wires: u32,
}

impl CouplingMap {
    /// Create a coupling map with `num_wires` isolated positions.
    pub fn new(num_wires: u32) -> Self {
        let mut graph = UnGraphMap::with_capacity(num_wires as usize, 0);
        for i in 0..num_wires {
            graph.add_node(i);
        }
        Self { graph, num_wires }
    }

    /// Build from an edge list.
    pub fn from_edges(num_wires: u32, edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut map = Self::new(num_wires);
        for (a, b) in edges {
            map.add_edge(a, b);
        }
        map
    }

    /// Add an undirected edge. Self-loops and duplicates are ignored.
    pub fn add_edge(&mut self, a: u32, b: u32) {
        if a != b {
            self.graph.add_edge(a, b, ());
            self.num_wires = self.num_wires.max(a.max(b) + 1);
        }
    }

    /// Check if two positions are directly connected.
    #[inline]
    pub fn is_connected(&self, a: u32, b: u32) -> bool {
        self.graph.contains_edge(a, b)
    }

    /// Number of physical positions.
    #[inline]
    pub fn num_wires(&self) -> u32 {
        self.num_wires
    }

    /// All edges, each listed once.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        self.graph.all_edges().map(|(a, b, _)| (a, b)).collect()
    }

    /// Neighbors of a position.
    pub fn neighbors(&self, wire: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph.neighbors(wire)
    }

    /// Create a linear coupling map (0-1-2-3-...).
    pub fn linear(n: u32) -> Self {
        Self::from_edges(n, (1..n).map(|i| (i - 1, i)))
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        Self::from_edges(n, (0..n).flat_map(|i| ((i + 1)..n).map(move |j| (i, j))))
    }

    /// Create a star topology (position 0 connected to all others).
    pub fn star(n: u32) -> Self {
        Self::from_edges(n, (1..n).map(|i| (0, i)))
    }

    /// Hop count of the shortest path, if one exists.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        self.shortest_path(from, to)
            .map(|path| u32::try_from(path.len() - 1).unwrap_or(u32::MAX))
    }

    /// Shortest path from `from` to `to`, both ends included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if !self.graph.contains_node(from) || !self.graph.contains_node(to) {
            return None;
        }
        astar(&self.graph, from, |n| n == to, |_| 1u32, |_| 0).map(|(_, path)| path)
    }

    /// Shortest path from `from` to any position adjacent to `group`,
    /// avoiding the positions of `group` themselves. Both ends included.
    pub fn path_to_group(&self, from: u32, group: &[u32]) -> Option<Vec<u32>> {
        if !self.graph.contains_node(from) || group.contains(&from) {
            return None;
        }
        let outside = NodeFiltered::from_fn(&self.graph, |n| !group.contains(&n));
        let beside_group = |n: u32| group.iter().any(|&g| self.graph.contains_edge(n, g));
        astar(&outside, from, beside_group, |_| 1u32, |_| 0).map(|(_, path)| path)
    }

    /// Whether `positions` induce a connected subgraph.
    pub fn is_connected_set(&self, positions: &[u32]) -> bool {
        let Some(&first) = positions.first() else {
            return true;
        };
        let mut reached = vec![first];
        let mut frontier = vec![first];
        while let Some(p) = frontier.pop() {
            for &q in positions {
                if !reached.contains(&q) && self.is_connected(p, q) {
                    reached.push(q);
                    frontier.push(q);
                }
            }
        }
        positions.iter().all(|p| reached.contains(p))
    }
}

/// Shared state for compilation passes.
#[derive(Default)]
pub struct PropertySet {
    /// Logical to physical wire layout.
    pub layout: Option<Layout>,
    /// Target connectivity.
    pub coupling_map: Option<CouplingMap>,
    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.coupling_map = Some(coupling_map);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Store a custom property, replacing any previous value of that type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a custom property mutably.
    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove and return a custom property.
    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }

    /// Check if a custom property of type `T` is present.
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.custom.contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySet")
            .field("layout", &self.layout)
            .field("coupling_map", &self.coupling_map)
            .field("custom", &self.custom.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap(0, 2);
        assert_eq!(layout.get_physical(WireId(0)), Some(2));
        assert_eq!(layout.get_logical(0), Some(WireId(2)));
        layout.swap(0, 2);
        assert_eq!(layout, Layout::trivial(3));
    }

    #[test]
    fn test_layout_add_replaces_conflicts() {
        let mut layout = Layout::trivial(2);
        layout.add(WireId(0), 1);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get_logical(1), Some(WireId(0)));
        assert_eq!(layout.get_logical(0), None);
    }

    #[test]
    fn test_coupling_map_shapes() {
        let linear = CouplingMap::linear(4);
        assert!(linear.is_connected(1, 2));
        assert!(linear.is_connected(2, 1));
        assert!(!linear.is_connected(0, 2));
        assert_eq!(linear.distance(0, 3), Some(3));
        assert_eq!(linear.shortest_path(0, 3), Some(vec![0, 1, 2, 3]));

        let star = CouplingMap::star(4);
        assert_eq!(star.shortest_path(1, 3), Some(vec![1, 0, 3]));
        assert_eq!(star.neighbors(0).count(), 3);

        let full = CouplingMap::full(4);
        assert_eq!(full.edges().len(), 6);
    }

    #[test]
    fn test_disconnected() {
        let map = CouplingMap::from_edges(4, [(0, 1), (2, 3)]);
        assert_eq!(map.shortest_path(0, 3), None);
        assert_eq!(map.distance(1, 1), Some(0));
        assert_eq!(map.shortest_path(0, 9), None);
    }

    #[test]
    fn test_path_to_group() {
        // 0-1-2-3 plus a detour 0-4-3.
        let map = CouplingMap::from_edges(5, [(0, 1), (1, 2), (2, 3), (0, 4), (4, 3)]);
        assert_eq!(map.path_to_group(0, &[2]), Some(vec![0, 1]));
        assert_eq!(map.path_to_group(4, &[2]), Some(vec![4, 3]));
        // Already beside the group.
        assert_eq!(map.path_to_group(1, &[2, 3]), Some(vec![1]));
        assert_eq!(map.path_to_group(2, &[2]), None);

        let split = CouplingMap::from_edges(4, [(0, 1), (2, 3)]);
        assert_eq!(split.path_to_group(0, &[3]), None);
    }

    #[test]
    fn test_connected_sets() {
        let star = CouplingMap::star(4);
        assert!(star.is_connected_set(&[1, 0, 3]));
        assert!(!star.is_connected_set(&[1, 3]));
        assert!(star.is_connected_set(&[]));

        let linear = CouplingMap::linear(5);
        assert!(linear.is_connected_set(&[3, 1, 2]));
        assert!(!linear.is_connected_set(&[0, 1, 3]));
    }

    #[test]
    fn test_custom_properties() {
        #[derive(Debug, PartialEq)]
        struct Marker(u8);

        let mut props = PropertySet::new();
        assert!(!props.contains::<Marker>());
        props.insert(Marker(1));
        props.get_mut::<Marker>().unwrap().0 = 2;
        assert_eq!(props.remove::<Marker>(), Some(Marker(2)));
        assert!(props.get::<Marker>().is_none());
    }
}
