//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use super::graph::{EdgeStatus, Graph, NodeIndex};
use std::{collections::HashMap, hash::Hash};

/// A graph whose nodes are looked up by a unique key `K`.
pub struct GraphMap<K: Eq + Hash + Clone, V, E> {
    graph: Graph<K, E>,
    map: HashMap<K, Node<V>>,
}

pub struct Node<V>(V, usize);

impl<V> Node<V> {
    pub fn index(&self) -> usize {
        self.1
    }

    pub fn as_ref(&self) -> &V {
        &self.0
    }

    pub fn take(self) -> V {
        self.0
    }
}

impl<K: Eq + Hash + Clone, V, E> GraphMap<K, V, E> {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            map: HashMap::new(),
        }
    }

    /// Inserts a node under `key`.
    ///
    /// Returns the existing index without modification if `key` is already present.
    pub fn add_node(&mut self, key: K, value: V) -> NodeIndex {
        if let Some(n) = self.map.get(&key) {
            return n.index();
        }
        let iden = self.graph.add_node(key.clone());
        self.map.insert(key, Node(value, iden));
        iden
    }

    pub fn add_edge_by_key(&mut self, source: &K, target: &K, cost: E) -> EdgeStatus {
        let source = match self.map.get(source) {
            Some(i) => i.index(),
            None => return EdgeStatus::MissingSource,
        };
        let target = match self.map.get(target) {
            Some(i) => i.index(),
            None => return EdgeStatus::MissingTarget,
        };
        self.graph.add_edge(source, target, cost)
    }

    pub fn add_edge_by_index(&mut self, source: NodeIndex, target: NodeIndex, cost: E) -> EdgeStatus {
        self.graph.add_edge(source, target, cost)
    }

    pub fn has_node_by_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn get_node_by_key(&self, key: &K) -> Option<&Node<V>> {
        self.map.get(key)
    }

    pub fn get_node_by_index(&self, index: NodeIndex) -> Option<&Node<V>> {
        self.map.get(self.graph.get_node(index)?)
    }

    pub fn get_key_by_index(&self, index: NodeIndex) -> Option<&K> {
        self.graph.get_node(index)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn get_graph(&self) -> &Graph<K, E> {
        &self.graph
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keys_map_to_indices() {
        let mut g = GraphMap::<&str, u8, ()>::new();
        let a = g.add_node("a", 1);
        let b = g.add_node("b", 2);
        // re-adding a key keeps the original node
        assert_eq!(g.add_node("a", 9), a);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.get_node_by_key(&"a").unwrap().as_ref(), &1);
        assert_eq!(g.get_node_by_index(b).unwrap().as_ref(), &2);
        assert_eq!(g.get_key_by_index(b), Some(&"b"));

        assert_eq!(g.add_edge_by_key(&"a", &"b", ()), EdgeStatus::Success);
        assert_eq!(g.add_edge_by_key(&"a", &"z", ()), EdgeStatus::MissingTarget);
        assert_eq!(g.add_edge_by_index(a, b, ()), EdgeStatus::AlreadyExists);
        assert_eq!(g.get_graph().has_edge(a, b), true);
        assert_eq!(g.has_node_by_key(&"z"), false);
    }
}
