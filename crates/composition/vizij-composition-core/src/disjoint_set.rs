//! Disjoint-set forest over traversal positions.
//!
//! Union always keeps the smaller position as the root, so `find` returns the
//! canonical representative (minimum traversal position) of a group directly.

#[derive(Debug, Clone)]
pub struct DisjointSet {
    /// Parent pointers (self-loop = root).
    parent: Vec<usize>,
}

impl DisjointSet {
    /// `n` singleton sets `0..n`.
    pub fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
        }
    }

    /// Root of `x`, compressing the path on the way.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns `true` if they were separate.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (keep, absorb) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[absorb] = keep;
        true
    }

    /// Root of every element, fully resolved.
    pub fn flatten(&mut self) -> Vec<usize> {
        (0..self.parent.len()).map(|x| self.find(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_smallest_root() {
        let mut ds = DisjointSet::new(6);
        assert!(ds.union(4, 2));
        assert!(ds.union(5, 4));
        assert!(!ds.union(2, 5));
        assert_eq!(ds.find(5), 2);
        assert!(ds.union(5, 1));
        assert_eq!(ds.flatten(), vec![0, 1, 1, 3, 1, 1]);
        assert_eq!(ds.find(3), 3);
    }
}
