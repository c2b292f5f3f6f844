use std::fmt;
use std::str::FromStr;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::ClassRef;

/// Handle of a rendered node.
///
/// Handles are generational: once a node is removed (its ancestor collapsed),
/// the handle no longer resolves, even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "{}.{}", slot, generation)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (slot, generation) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid node id: {s}"))?;
        let slot: usize = slot
            .parse()
            .map_err(|_| format!("invalid node slot: {s}"))?;
        let generation: u64 = generation
            .parse()
            .map_err(|_| format!("invalid node generation: {s}"))?;
        Ok(NodeId(Index::from_raw_parts(slot, generation)))
    }
}

/// What a rendered node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Class(ClassRef),
    /// `index` into the directly-tagged packages of `owner`
    Package { owner: ClassRef, index: usize },
}

/// Which of a parent's child lists a node was rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildGroup {
    /// Bottom classifications
    Classifications,
    /// Mid classifications (tops only)
    Subclassifications,
    Packages,
}

/// Element class of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementClass {
    TopClass,
    MidClass,
    BotClass,
    Package,
}

/// Styling hook handed to the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleHook {
    pub class: ElementClass,
    /// Classification with no packages anywhere beneath it
    pub empty: bool,
    /// Only set for packages
    pub verified: Option<bool>,
}

impl StyleHook {
    pub fn css_class(&self) -> String {
        let base = match self.class {
            ElementClass::TopClass => "topclass",
            ElementClass::MidClass => "midclass",
            ElementClass::BotClass => "botclass",
            ElementClass::Package => {
                return match self.verified {
                    Some(true) => "clickable verified".to_string(),
                    _ => "unverified".to_string(),
                }
            }
        };
        if self.empty {
            format!("{base} emptycategory")
        } else {
            base.to_string()
        }
    }
}

/// Expand/collapse state of a rendered node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisclosureState {
    #[default]
    Collapsed,
    Expanded,
}

/// Payload of a rendered node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub label: String,
    pub style: StyleHook,
    /// `None` for roots
    pub group: Option<ChildGroup>,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Node in the arena of currently rendered elements.
#[derive(Debug)]
pub struct ViewNode {
    pub data: NodeData,
    pub state: DisclosureState,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in render order
    pub children: Vec<Index>,
}

/// Arena holding the rendered forest: one root per top classification.
#[derive(Debug)]
pub struct ViewArena {
    arena: Arena<ViewNode>,
    roots: Vec<Index>,
}

impl Default for ViewArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let node = ViewNode {
            data,
            state: DisclosureState::Collapsed,
            parent: parent.map(|p| p.0),
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_id) = parent {
            if let Some(parent) = self.arena.get_mut(parent_id.0) {
                parent.children.push(node_idx);
            }
        } else {
            self.roots.push(node_idx);
        }

        NodeId(node_idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, id: NodeId) -> Option<&ViewNode> {
        self.arena.get(id.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.arena.get_mut(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.roots.iter().copied().map(NodeId).collect()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get_node(id)
            .map(|n| n.children.iter().copied().map(NodeId).collect())
            .unwrap_or_default()
    }

    /// Number of rendered nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Remove every descendant of `id`, deepest first; `id` itself stays.
    ///
    /// Returns the removed handles in post-order.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_descendants(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = match self.arena.get_mut(id.0) {
            Some(node) => std::mem::take(&mut node.children),
            None => return Vec::new(),
        };

        let mut removed = Vec::new();
        let mut stack: Vec<(Index, bool)> = children.into_iter().rev().map(|c| (c, false)).collect();
        while let Some((current, visited)) = stack.pop() {
            if visited {
                if self.arena.remove(current).is_some() {
                    removed.push(NodeId(current));
                }
                continue;
            }
            if let Some(node) = self.arena.get(current) {
                stack.push((current, true));
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        removed
    }

    /// Pre-order walk over all roots, yielding depth (roots at 0).
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> ViewIterator<'_> {
        ViewIterator::new(self)
    }
}

pub struct ViewIterator<'a> {
    arena: &'a ViewArena,
    stack: Vec<(Index, usize)>,
}

impl<'a> ViewIterator<'a> {
    fn new(arena: &'a ViewArena) -> Self {
        let stack = arena.roots.iter().rev().map(|&r| (r, 0)).collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for ViewIterator<'a> {
    type Item = (NodeId, usize, &'a ViewNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, depth)) = self.stack.pop() {
            if let Some(node) = self.arena.arena.get(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push((child, depth + 1));
                }
                return Some((NodeId(current_idx), depth, node));
            }
        }
        None
    }
}
