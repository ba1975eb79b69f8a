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

/// Basic graph data structure
/// - source: http://smallcultfollowing.com/babysteps/blog/2015/04/06/modeling-graphs-in-rust-using-vector-indices/
use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub type NodeIndex = usize;

#[derive(Debug, PartialEq)]
struct NodeData<V> {
    node: V,
    first_outgoing_edge: Option<EdgeIndex>,
    first_incoming_edge: Option<EdgeIndex>,
}

type EdgeIndex = usize;

#[derive(Debug, PartialEq)]
struct EdgeData<E> {
    edge: E,
    source: NodeIndex,
    target: NodeIndex,
    next_outgoing_edge: Option<EdgeIndex>,
    next_incoming_edge: Option<EdgeIndex>,
}

#[derive(Debug, PartialEq)]
pub struct Graph<V, E> {
    vertices: Vec<NodeData<V>>,
    edges: Vec<EdgeData<E>>,
}

impl<V, E> Graph<V, E> {
    /// Creates an empty `Graph` struct.
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            vertices: Vec::new(),
        }
    }

    /// Adds a new node to the graph.
    ///
    /// Returns the `NodeIndex` to remember the node.
    pub fn add_node(&mut self, node: V) -> NodeIndex {
        let index = self.vertices.len();
        self.vertices.push(NodeData {
            node: node,
            first_outgoing_edge: None,
            first_incoming_edge: None,
        });
        index
    }

    /// Checks if a given `source` node is in the graph.
    pub fn has_node(&self, source: NodeIndex) -> bool {
        source < self.node_count()
    }

    /// Checks if a given `source` node is connected to the given `target` node.
    pub fn has_edge(&self, source: NodeIndex, target: NodeIndex) -> bool {
        self.successors(source).any(|f| f == target)
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.vertices.len()
    }

    /// Accesses the node data label behind the `node` index.
    pub fn get_node(&self, node: NodeIndex) -> Option<&V> {
        Some(&self.vertices.get(node)?.node)
    }

    /// Adds a new edge to the graph from `source` to `target`.
    ///
    /// Duplicate edges and self-loops are rejected and reported through the
    /// returned status.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, cost: E) -> EdgeStatus {
        if self.has_node(source) == false {
            return EdgeStatus::MissingSource;
        }
        if self.has_node(target) == false {
            return EdgeStatus::MissingTarget;
        }
        if source == target {
            return EdgeStatus::SelfLoop;
        }
        if self.has_edge(source, target) == true {
            return EdgeStatus::AlreadyExists;
        }
        let edge_index = self.edges.len();
        let next_outgoing_edge = self.vertices[source].first_outgoing_edge;
        let next_incoming_edge = self.vertices[target].first_incoming_edge;
        self.edges.push(EdgeData {
            edge: cost,
            source: source,
            target: target,
            next_outgoing_edge: next_outgoing_edge,
            next_incoming_edge: next_incoming_edge,
        });
        self.vertices[source].first_outgoing_edge = Some(edge_index);
        self.vertices[target].first_incoming_edge = Some(edge_index);
        EdgeStatus::Success
    }

    /// Returns the number of predecessors to the `target` node.
    pub fn in_degree(&self, target: NodeIndex) -> usize {
        self.predecessors(target).count()
    }

    /// Creates an iterator over the incoming nodes to the `target` node.
    pub fn predecessors(&self, target: NodeIndex) -> Predecessors<V, E> {
        let first_incoming_edge = self.vertices.get(target).and_then(|n| n.first_incoming_edge);
        Predecessors {
            graph: self,
            current_edge_index: first_incoming_edge,
        }
    }

    /// Creates an iterator over the outgoing nodes from the `source` node.
    pub fn successors(&self, source: NodeIndex) -> Successors<V, E> {
        let first_outgoing_edge = self.vertices.get(source).and_then(|n| n.first_outgoing_edge);
        Successors {
            graph: self,
            current_edge_index: first_outgoing_edge,
        }
    }

    /// Performs topological sort (Kahn's algorithm) so that every node comes
    /// after all of its predecessors.
    ///
    /// Among the nodes ready to be placed, the one with the smallest `priority`
    /// key is taken first, which makes the order deterministic.
    ///
    /// Errors with the strongly connected components (of size > 1) when the
    /// graph holds a cycle.
    pub fn topological_sort_by_key<K, F>(
        &self,
        priority: F,
    ) -> Result<Vec<NodeIndex>, Vec<Vec<NodeIndex>>>
    where
        K: Ord,
        F: Fn(NodeIndex) -> K,
    {
        let mut remaining: Vec<usize> = (0..self.node_count()).map(|i| self.in_degree(i)).collect();
        let mut ready = BinaryHeap::new();
        for (i, deg) in remaining.iter().enumerate() {
            if *deg == 0 {
                ready.push(Reverse((priority(i), i)));
            }
        }
        let mut order = Vec::with_capacity(self.node_count());
        while let Some(Reverse((_, current))) = ready.pop() {
            order.push(current);
            for next in self.successors(current) {
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    ready.push(Reverse((priority(next), next)));
                }
            }
        }
        match order.len() == self.node_count() {
            true => Ok(order),
            false => Err(self
                .strongly_connected_components()
                .into_iter()
                .filter(|c| c.len() > 1)
                .collect()),
        }
    }

    /// Performs topological sort using the node index as the tie-breaker.
    pub fn topological_sort(&self) -> Result<Vec<NodeIndex>, Vec<Vec<NodeIndex>>> {
        self.topological_sort_by_key(|i| i)
    }

    /// Computes the strongly connected components with Tarjan's algorithm.
    ///
    /// Each component is sorted by node index.
    pub fn strongly_connected_components(&self) -> Vec<Vec<NodeIndex>> {
        let n = self.node_count();
        let mut index: Vec<Option<usize>> = vec![None; n];
        let mut lowlink = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut counter = 0;
        let mut components = Vec::new();

        for root in 0..n {
            if index[root].is_some() {
                continue;
            }
            // iterative dfs: (node, successors yet to visit)
            let mut work: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();
            index[root] = Some(counter);
            lowlink[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;
            work.push((root, self.successors(root).collect()));

            while let Some((node, pending)) = work.last_mut() {
                let node = *node;
                if let Some(next) = pending.pop() {
                    match index[next] {
                        None => {
                            index[next] = Some(counter);
                            lowlink[next] = counter;
                            counter += 1;
                            stack.push(next);
                            on_stack[next] = true;
                            work.push((next, self.successors(next).collect()));
                        }
                        Some(i) => {
                            if on_stack[next] == true {
                                lowlink[node] = lowlink[node].min(i);
                            }
                        }
                    }
                } else {
                    work.pop();
                    if let Some((parent, _)) = work.last() {
                        lowlink[*parent] = lowlink[*parent].min(lowlink[node]);
                    }
                    if Some(lowlink[node]) == index[node] {
                        let mut component = Vec::new();
                        while let Some(member) = stack.pop() {
                            on_stack[member] = false;
                            component.push(member);
                            if member == node {
                                break;
                            }
                        }
                        component.sort();
                        components.push(component);
                    }
                }
            }
        }
        components
    }
}

#[derive(Debug, PartialEq)]
pub enum EdgeStatus {
    MissingSource,
    MissingTarget,
    SelfLoop,
    AlreadyExists,
    Success,
}

impl EdgeStatus {
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Success => true,
            _ => false,
        }
    }
}

pub struct Predecessors<'graph, V, E> {
    graph: &'graph Graph<V, E>,
    current_edge_index: Option<EdgeIndex>,
}

impl<'graph, V, E> Iterator for Predecessors<'graph, V, E> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let edge = &self.graph.edges[self.current_edge_index?];
        self.current_edge_index = edge.next_incoming_edge;
        Some(edge.source)
    }
}

pub struct Successors<'graph, V, E> {
    graph: &'graph Graph<V, E>,
    current_edge_index: Option<EdgeIndex>,
}

impl<'graph, V, E> Iterator for Successors<'graph, V, E> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let edge = &self.graph.edges[self.current_edge_index?];
        self.current_edge_index = edge.next_outgoing_edge;
        Some(edge.target)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Creates basic graph illustrated in this blog post:
    /// - source: http://smallcultfollowing.com/babysteps/blog/2015/04/06/modeling-graphs-in-rust-using-vector-indices/
    fn basic_graph() -> Graph<(), ()> {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        let n2 = g.add_node(());
        let n3 = g.add_node(());
        g.add_edge(n0, n1, ());
        g.add_edge(n1, n2, ());
        g.add_edge(n0, n3, ());
        g.add_edge(n3, n2, ());
        g
    }

    /// Creates an example binary tree with height = 2. Edges are directed up indicating
    /// the child is a dependency to the parent.
    ///
    ///         n0
    ///        /  \
    ///     n1     n4
    ///    /  \   /  \
    /// n2   n3 n5   n6
    fn binary_tree() -> Graph<(), ()> {
        let mut g = Graph::new();
        for _ in 0..7 {
            g.add_node(());
        }
        g.add_edge(1, 0, ());
        g.add_edge(4, 0, ());
        g.add_edge(2, 1, ());
        g.add_edge(3, 1, ());
        g.add_edge(5, 4, ());
        g.add_edge(6, 4, ());
        g
    }

    #[test]
    fn topological_sort() {
        let mut g = basic_graph();
        assert_eq!(g.topological_sort(), Ok(vec![0, 1, 3, 2]));

        let n4 = g.add_node(());
        g.add_edge(n4, 0, ());
        assert_eq!(g.topological_sort(), Ok(vec![4, 0, 1, 3, 2]));

        let g = binary_tree();
        assert_eq!(g.topological_sort(), Ok(vec![2, 3, 1, 5, 6, 4, 0]));
    }

    #[test]
    fn topological_sort_respects_priority() {
        let g = binary_tree();
        // favor higher indices first
        let order = g.topological_sort_by_key(|i| Reverse(i)).unwrap();
        assert_eq!(order, vec![6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn cycle_reports_components() {
        let mut g = basic_graph();
        let n4 = g.add_node(());
        g.add_edge(2, n4, ());
        g.add_edge(n4, 3, ());
        // 3 -> 2 -> 4 -> 3
        assert_eq!(g.topological_sort(), Err(vec![vec![2, 3, 4]]));
    }

    #[test]
    fn scc_singletons_without_cycle() {
        let g = basic_graph();
        let mut sccs = g.strongly_connected_components();
        sccs.sort();
        assert_eq!(sccs, vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn add_edge() {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        assert_eq!(g.add_edge(n0, n1, ()).is_ok(), true);
        assert_eq!(g.add_edge(n1, n0, ()).is_ok(), true);
        assert_eq!(g.has_edge(n1, n0), true);
        // do not allow duplicate edges
        assert_eq!(g.add_edge(n1, n0, ()), EdgeStatus::AlreadyExists);
        // do not allow self-loops
        assert_eq!(g.add_edge(n0, n0, ()), EdgeStatus::SelfLoop);
        assert_eq!(g.add_edge(n0, 9, ()), EdgeStatus::MissingTarget);
        assert_eq!(g.add_edge(9, n0, ()), EdgeStatus::MissingSource);
        assert_eq!(g.has_edge(n1, n0), true);
    }

    #[test]
    fn degrees_and_neighbors() {
        let g = basic_graph();
        assert_eq!(g.in_degree(2), 2);
        assert_eq!(g.successors(0).collect::<Vec<NodeIndex>>(), vec![3, 1]);
        assert_eq!(g.predecessors(2).collect::<Vec<NodeIndex>>(), vec![3, 1]);
        assert_eq!(g.predecessors(0).count(), 0);
    }

    #[test]
    fn get_node() {
        let mut g = Graph::<&str, usize>::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        g.add_edge(a, b, 3);
        assert_eq!(g.get_node(a), Some(&"a"));
        assert_eq!(g.get_node(100), None);
        assert_eq!(g.has_edge(b, a), false);
    }
}
