//! Tree traversal.
//!
//! Every operation is a pre-order walk over the first-child/next-sibling
//! links: a node, then its child chain, then its next sibling. Pending nodes
//! are kept on an explicit stack, so long sibling chains and deep trees never
//! grow the call stack.

use resdir_pe::{NodeId, NodeKind, ResourceNode, ResourceTree};

/// Pre-order iterator over a resource tree.
pub struct PreOrder<'a> {
    tree: &'a ResourceTree,
    stack: Vec<NodeId>,
    /// Subtree root whose siblings must not be visited.
    boundary: Option<NodeId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (NodeId, &'a ResourceNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.get(id)?;

        // Sibling first so the child is popped before it
        if self.boundary != Some(id) {
            self.stack.extend(node.next());
        }
        self.stack.extend(node.child());

        Some((id, node))
    }
}

/// Walk `start`, its descendants, and its following siblings with theirs.
///
/// `None` yields nothing.
pub fn preorder(tree: &ResourceTree, start: Option<NodeId>) -> PreOrder<'_> {
    PreOrder {
        tree,
        stack: start.into_iter().collect(),
        boundary: None,
    }
}

/// Walk `node` and its descendants only.
pub fn subtree(tree: &ResourceTree, node: NodeId) -> PreOrder<'_> {
    PreOrder {
        tree,
        stack: vec![node],
        boundary: Some(node),
    }
}

/// Apply `visit` to every node reachable from `start`, in pre-order.
pub fn walk<F>(tree: &ResourceTree, start: Option<NodeId>, mut visit: F)
where
    F: FnMut(NodeId, &ResourceNode),
{
    for (id, node) in preorder(tree, start) {
        visit(id, node);
    }
}

/// Collect every node reachable from `start` that satisfies `predicate`,
/// in visitation order.
pub fn search<P>(tree: &ResourceTree, start: Option<NodeId>, mut predicate: P) -> Vec<NodeId>
where
    P: FnMut(&ResourceNode) -> bool,
{
    preorder(tree, start)
        .filter(|(_, node)| predicate(node))
        .map(|(id, _)| id)
        .collect()
}

/// Like [`search`], restricted to the subtree rooted at `node`.
pub fn search_subtree<P>(tree: &ResourceTree, node: NodeId, mut predicate: P) -> Vec<NodeId>
where
    P: FnMut(&ResourceNode) -> bool,
{
    subtree(tree, node)
        .filter(|(_, n)| predicate(n))
        .map(|(id, _)| id)
        .collect()
}

/// Iterate the strict ancestors of `node`, nearest first.
pub fn ancestors(tree: &ResourceTree, node: NodeId) -> impl Iterator<Item = (NodeId, &ResourceNode)> {
    std::iter::successors(tree.parent(node), move |&id| tree.parent(id))
        .filter_map(move |id| tree.get(id).map(|n| (id, n)))
}

/// Find the nearest strict ancestor of `node` with the given kind and level.
pub fn find_ancestor(tree: &ResourceTree, node: NodeId, kind: NodeKind, level: u8) -> Option<NodeId> {
    ancestors(tree, node)
        .find(|(_, n)| n.kind() == kind && n.dir_level() == level)
        .map(|(id, _)| id)
}
