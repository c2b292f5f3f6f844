//! Terminal rendering surface
//!
//! Keeps a mirror of the rendered element tree (what a browser would hold in
//! its DOM) and prints it with `termtree`.

use std::collections::HashMap;

use colored::Colorize;
use termtree::Tree;
use tracing::{debug, warn};

use crate::domain::{
    ChildGroup, ElementClass, NodeId, PackageDetails, RenderDelta, RenderedChild, StyleHook,
};
use crate::infrastructure::traits::RenderSurface;

#[derive(Debug, Clone)]
struct Element {
    label: String,
    style: StyleHook,
    lists: Vec<(ChildGroup, Vec<NodeId>)>,
    details: Option<PackageDetails>,
}

impl Element {
    fn new(label: String, style: StyleHook) -> Self {
        Self {
            label,
            style,
            lists: Vec::new(),
            details: None,
        }
    }

    fn is_open(&self) -> bool {
        !self.lists.is_empty() || self.details.is_some()
    }
}

/// Element tree rendered to the terminal.
#[derive(Debug, Default)]
pub struct TreeSurface {
    title: String,
    roots: Vec<NodeId>,
    elements: HashMap<NodeId, Element>,
    duplicate_renders: usize,
    stray_deltas: usize,
    color: bool,
}

impl TreeSurface {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: true,
            ..Default::default()
        }
    }

    /// Disable ANSI colors (tests, piped output).
    pub fn plain(mut self) -> Self {
        self.color = false;
        self
    }

    /// Number of live elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_rendered(&self, id: NodeId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Children rendered beneath `id`, across all its lists.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.elements
            .get(&id)
            .map(|e| e.lists.iter().map(|(_, items)| items.len()).sum())
            .unwrap_or(0)
    }

    /// Number of child lists rendered beneath `id`.
    pub fn list_count(&self, id: NodeId) -> usize {
        self.elements.get(&id).map(|e| e.lists.len()).unwrap_or(0)
    }

    pub fn details(&self, id: NodeId) -> Option<&PackageDetails> {
        self.elements.get(&id).and_then(|e| e.details.as_ref())
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.elements.get(&id).map(|e| e.label.as_str())
    }

    /// Expansions applied to an element that was already open.
    pub fn duplicate_renders(&self) -> usize {
        self.duplicate_renders
    }

    /// Deltas addressed to an element that is not rendered.
    pub fn stray_deltas(&self) -> usize {
        self.stray_deltas
    }

    pub fn to_tree(&self) -> Tree<String> {
        let leaves: Vec<Tree<String>> = self.roots.iter().filter_map(|&r| self.subtree(r)).collect();
        Tree::new(self.title.clone()).with_leaves(leaves)
    }

    pub fn render(&self) -> String {
        self.to_tree().to_string()
    }

    fn subtree(&self, id: NodeId) -> Option<Tree<String>> {
        let element = self.elements.get(&id)?;
        let mut tree = Tree::new(self.decorate(element));
        for (_, items) in &element.lists {
            for &child in items {
                if let Some(child_tree) = self.subtree(child) {
                    tree.push(child_tree);
                }
            }
        }
        if let Some(details) = &element.details {
            tree.push(Tree::new(format!("Homepage: {}", details.homepage)));
            tree.push(Tree::new(format!("Authors: {}", details.authors)));
            if !details.description.is_empty() {
                tree.push(Tree::new(details.description.clone()));
            }
        }
        Some(tree)
    }

    fn decorate(&self, element: &Element) -> String {
        let marker = if element.is_open() { "-" } else { "+" };
        let text = format!("[{}] {}", marker, element.label);
        if !self.color {
            return text;
        }
        match element.style.class {
            ElementClass::Package => match element.style.verified {
                Some(true) => text.green().to_string(),
                _ => text.normal().to_string(),
            },
            ElementClass::TopClass if !element.style.empty => text.bold().to_string(),
            _ if element.style.empty => text.dimmed().to_string(),
            _ => text,
        }
    }

    fn drop_element(&mut self, id: NodeId) {
        if let Some(element) = self.elements.remove(&id) {
            for (_, items) in element.lists {
                for child in items {
                    self.drop_element(child);
                }
            }
        }
    }
}

impl RenderSurface for TreeSurface {
    fn mount(&mut self, roots: &[RenderedChild]) {
        for root in roots {
            self.roots.push(root.id);
            self.elements
                .insert(root.id, Element::new(root.label.clone(), root.style));
        }
        debug!("mounted {} roots", roots.len());
    }

    fn apply(&mut self, delta: &RenderDelta) {
        match delta {
            RenderDelta::Expanded { node, lists } => {
                let Some(element) = self.elements.get_mut(node) else {
                    warn!("expansion for element that is not rendered: {}", node);
                    self.stray_deltas += 1;
                    return;
                };
                if element.is_open() {
                    warn!("element {} rendered twice", node);
                    self.duplicate_renders += 1;
                }
                let mut created = Vec::new();
                for list in lists {
                    element
                        .lists
                        .push((list.group, list.items.iter().map(|c| c.id).collect()));
                    created.extend(list.items.iter());
                }
                for child in created {
                    self.elements
                        .insert(child.id, Element::new(child.label.clone(), child.style));
                }
            }
            RenderDelta::DetailsShown { node, details } => {
                let Some(element) = self.elements.get_mut(node) else {
                    warn!("details for element that is not rendered: {}", node);
                    self.stray_deltas += 1;
                    return;
                };
                if element.is_open() {
                    warn!("element {} rendered twice", node);
                    self.duplicate_renders += 1;
                }
                element.details = Some(details.clone());
            }
            RenderDelta::Collapsed { node, removed, .. } => {
                let Some(element) = self.elements.get_mut(node) else {
                    warn!("collapse for element that is not rendered: {}", node);
                    self.stray_deltas += 1;
                    return;
                };
                element.details = None;
                let lists = std::mem::take(&mut element.lists);
                for (_, items) in lists {
                    for child in items {
                        self.drop_element(child);
                    }
                }
                for id in removed {
                    self.elements.remove(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassRef, NodeData, NodeKind, Propagation, ViewArena};

    fn handles(n: usize) -> Vec<NodeId> {
        let mut arena = ViewArena::new();
        (0..n)
            .map(|i| {
                arena.insert_node(
                    NodeData {
                        kind: NodeKind::Class(ClassRef::Top { top: i }),
                        label: format!("{i:02}"),
                        style: style(),
                        group: None,
                    },
                    None,
                )
            })
            .collect()
    }

    fn style() -> StyleHook {
        StyleHook {
            class: ElementClass::TopClass,
            empty: false,
            verified: None,
        }
    }

    #[test]
    fn given_unrendered_element_when_applying_any_delta_then_each_is_counted_as_stray() {
        let ids = handles(2);
        let mut surface = TreeSurface::new("t").plain();
        surface.mount(&[RenderedChild {
            id: ids[0],
            label: "00".into(),
            style: style(),
        }]);
        let missing = ids[1];

        surface.apply(&RenderDelta::Expanded {
            node: missing,
            lists: Vec::new(),
        });
        surface.apply(&RenderDelta::DetailsShown {
            node: missing,
            details: PackageDetails {
                homepage: String::new(),
                authors: String::new(),
                description: String::new(),
            },
        });
        surface.apply(&RenderDelta::Collapsed {
            node: missing,
            removed: Vec::new(),
            propagation: Propagation::Stop,
        });

        assert_eq!(surface.stray_deltas(), 3);
        assert_eq!(surface.element_count(), 1);
        assert_eq!(surface.duplicate_renders(), 0);
    }
}
