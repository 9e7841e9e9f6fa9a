//! Prefix trie over dot-separated queue path segments.

use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    terminal: bool,
    children: BTreeMap<String, TrieNode>,
}

/// Set of queue paths supporting longest-prefix lookup by segment.
#[derive(Debug, Default, Clone)]
pub struct PathTrie {
    root: TrieNode,
    len: usize,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path; returns false if it was already present.
    pub fn insert(&mut self, path: &str) -> bool {
        let mut node = &mut self.root;
        for segment in path.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if node.terminal {
            return false;
        }
        node.terminal = true;
        self.len += 1;
        true
    }

    /// Remove a path, pruning branches that no longer lead to any path.
    pub fn remove(&mut self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('.').collect();
        let removed = Self::remove_from(&mut self.root, &segments);
        if removed {
            self.len -= 1;
        }
        removed
    }

    fn remove_from(node: &mut TrieNode, segments: &[&str]) -> bool {
        match segments.split_first() {
            None => {
                let was = node.terminal;
                node.terminal = false;
                was
            }
            Some((head, rest)) => {
                let Some(child) = node.children.get_mut(*head) else {
                    return false;
                };
                let removed = Self::remove_from(child, rest);
                if removed && !child.terminal && child.children.is_empty() {
                    node.children.remove(*head);
                }
                removed
            }
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        let mut node = &self.root;
        for segment in path.split('.') {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }

    /// Number of leading segments forming the deepest stored path, if any.
    pub fn longest_match(&self, segments: &[&str]) -> Option<usize> {
        let mut node = &self.root;
        let mut best = None;
        for (idx, segment) in segments.iter().enumerate() {
            match node.children.get(*segment) {
                Some(child) => {
                    node = child;
                    if node.terminal {
                        best = Some(idx + 1);
                    }
                }
                None => break,
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All stored paths in lexicographic segment order.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len);
        let mut prefix = Vec::new();
        Self::collect(&self.root, &mut prefix, &mut out);
        out
    }

    fn collect<'a>(node: &'a TrieNode, prefix: &mut Vec<&'a str>, out: &mut Vec<String>) {
        if node.terminal {
            out.push(prefix.join("."));
        }
        for (segment, child) in &node.children {
            prefix.push(segment.as_str());
            Self::collect(child, prefix, out);
            prefix.pop();
        }
    }
}
