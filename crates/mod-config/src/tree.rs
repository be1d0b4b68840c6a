//! Control and benchmark tree
//!
//! The tree is an arena of nodes keyed by qualified name. Parent and child
//! links are names, so a benchmark included by two parents is simply a node
//! with two parents and two root-to-node paths.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::modfile::Mod;
use crate::name::ResourceKind;
use crate::resource::HclResource;

/// A root-to-node path of node names.
pub type TreePath = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic root of one mod
    Mod,
    Benchmark,
    Control,
}

#[derive(Debug)]
struct TreeNode {
    kind: NodeKind,
    title: Option<String>,
    parents: Vec<String>,
    children: Vec<String>,
    paths: OnceCell<Vec<TreePath>>,
}

/// Parent/child structure of the controls and benchmarks of a set of mods.
#[derive(Debug)]
pub struct ResourceTree {
    nodes: BTreeMap<String, TreeNode>,
    /// Mod root nodes, root mod first
    roots: Vec<String>,
}

/// Node name of a mod's root.
pub fn mod_root_name(mod_name: &str) -> String {
    format!("{}.{mod_name}", ResourceKind::Mod)
}

impl ResourceTree {
    /// Build the tree of `root` with its dependency mods merged in.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownChild`] when a benchmark lists a missing resource and
    /// [`Error::TreeCycle`] when the children form a cycle.
    pub fn build(root: &Mod, dependencies: &[&Mod]) -> Result<Self> {
        let mut tree = Self {
            nodes: BTreeMap::new(),
            roots: Vec::new(),
        };

        let mods: Vec<&Mod> = std::iter::once(root).chain(dependencies.iter().copied()).collect();
        let mut owner: BTreeMap<String, String> = BTreeMap::new();

        for m in &mods {
            let root_name = mod_root_name(&m.name);
            tree.roots.push(root_name.clone());
            tree.nodes.insert(
                root_name.clone(),
                TreeNode {
                    kind: NodeKind::Mod,
                    title: m.title.clone(),
                    parents: Vec::new(),
                    children: Vec::new(),
                    paths: OnceCell::new(),
                },
            );

            for resource in m.resources.iter() {
                let Some(item) = resource.as_tree_item() else {
                    continue;
                };
                let kind = match item.kind() {
                    ResourceKind::Benchmark => NodeKind::Benchmark,
                    _ => NodeKind::Control,
                };
                let name = item.name().to_string();
                owner.insert(name.clone(), root_name.clone());
                tree.nodes.insert(
                    name,
                    TreeNode {
                        kind,
                        title: item.title().map(str::to_string),
                        parents: Vec::new(),
                        children: item.children().iter().map(ToString::to_string).collect(),
                        paths: OnceCell::new(),
                    },
                );
            }
        }

        // Parents are whoever lists the node among its children
        let mut parents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, node) in &tree.nodes {
            for child in &node.children {
                if !tree.nodes.contains_key(child) {
                    return Err(Error::UnknownChild {
                        parent: name.clone(),
                        child: child.clone(),
                    });
                }
                parents.entry(child.clone()).or_default().push(name.clone());
            }
        }

        for (name, mod_root) in &owner {
            let node_parents = parents.remove(name).unwrap_or_default();
            if node_parents.is_empty() {
                if let Some(root_node) = tree.nodes.get_mut(mod_root) {
                    root_node.children.push(name.clone());
                }
                parents.insert(name.clone(), vec![mod_root.clone()]);
            } else {
                parents.insert(name.clone(), node_parents);
            }
        }
        for (name, node_parents) in parents {
            if let Some(node) = tree.nodes.get_mut(&name) {
                node.parents = node_parents;
            }
        }

        tree.check_acyclic()?;

        // Leaves are cheap and always needed, interior nodes on demand
        let leaves: Vec<String> = tree
            .nodes
            .iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        for leaf in &leaves {
            tree.paths(leaf);
        }

        debug!(
            root = %root.name,
            nodes = tree.nodes.len(),
            leaves = leaves.len(),
            "built resource tree"
        );
        Ok(tree)
    }

    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            tree: &'a ResourceTree,
            name: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Result<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|n| n.to_string()).collect();
                    path.push(name.to_string());
                    return Err(Error::TreeCycle { path });
                }
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            stack.push(name);
            if let Some(node) = tree.nodes.get(name) {
                for child in &node.children {
                    visit(tree, child, marks, stack)?;
                }
            }
            stack.pop();
            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        for name in self.nodes.keys() {
            let mut stack = Vec::new();
            visit(self, name, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    /// Every root-to-node path of `name`, each ending in `name`.
    ///
    /// Computed on first request and memoized.
    pub fn paths(&self, name: &str) -> &[TreePath] {
        let Some(node) = self.nodes.get(name) else {
            return &[];
        };
        node.paths.get_or_init(|| {
            if node.parents.is_empty() {
                return vec![vec![name.to_string()]];
            }
            let mut paths = Vec::new();
            for parent in &node.parents {
                for parent_path in self.paths(parent) {
                    let mut path = parent_path.clone();
                    path.push(name.to_string());
                    paths.push(path);
                }
            }
            paths
        })
    }

    /// Whether the paths of `name` have been computed.
    pub fn has_paths(&self, name: &str) -> bool {
        self.nodes
            .get(name)
            .is_some_and(|node| node.paths.get().is_some())
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn children(&self, name: &str) -> &[String] {
        self.nodes.get(name).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parents(&self, name: &str) -> &[String] {
        self.nodes.get(name).map_or(&[], |n| n.parents.as_slice())
    }

    pub fn kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).map(|n| n.kind)
    }

    pub fn title(&self, name: &str) -> Option<&str> {
        self.nodes.get(name).and_then(|n| n.title.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first walk from every root, calling `visit(name, depth)`.
    ///
    /// A node reachable through several parents is visited once per path.
    pub fn walk(&self, mut visit: impl FnMut(&str, usize)) {
        fn step(tree: &ResourceTree, name: &str, depth: usize, visit: &mut dyn FnMut(&str, usize)) {
            visit(name, depth);
            for child in tree.children(name) {
                step(tree, child, depth + 1, visit);
            }
        }
        for root in &self.roots {
            step(self, root, 0, &mut visit);
        }
    }
}
