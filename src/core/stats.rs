// Copyright @yucwang 2026

//! Traversal counters carried by hit packets when the `stats` feature is on.

use std::ops;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: u64,
    pub primitives_tested: u64,
}

impl TraversalStats {
    pub fn visit_node(&mut self) {
        self.nodes_visited += 1;
    }

    pub fn test_primitives(&mut self, count: u64) {
        self.primitives_tested += count;
    }
}

impl ops::AddAssign for TraversalStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_visited += rhs.nodes_visited;
        self.primitives_tested += rhs.primitives_tested;
    }
}
