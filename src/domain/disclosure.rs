//! Expand/collapse state machine over the annotated taxonomy.
//!
//! Every rendered node is either `Collapsed` or `Expanded`. The only
//! transition function is [`DisclosureTree::toggle`], which flips the state
//! and returns a [`RenderDelta`] describing what the presentation side must
//! add or remove. Collapsing a node drops its whole rendered subtree, so a
//! later expansion always starts from fresh, collapsed children.

use tracing::{debug, instrument};

use crate::domain::arena::{
    ChildGroup, DisclosureState, ElementClass, NodeData, NodeId, NodeKind, StyleHook,
    ViewArena, ViewNode,
};
use crate::domain::entities::{ClassRef, Classification, Package, Taxonomy};
use crate::domain::error::{DomainError, DomainResult};

/// A child element materialized by an expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChild {
    pub id: NodeId,
    pub label: String,
    pub style: StyleHook,
}

/// One of the (up to three) child lists of an expanded classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildList {
    pub group: ChildGroup,
    pub items: Vec<RenderedChild>,
}

/// Detail fields shown under an expanded package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDetails {
    pub homepage: String,
    pub authors: String,
    pub description: String,
}

impl From<&Package> for PackageDetails {
    fn from(package: &Package) -> Self {
        Self {
            homepage: package.url.clone(),
            authors: package.authors.clone(),
            description: package.description.clone(),
        }
    }
}

/// Whether the activation event may continue to enclosing clickable regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Instruction for the presentation side produced by one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDelta {
    /// Classification expanded: render these lists beneath `node`.
    Expanded { node: NodeId, lists: Vec<ChildList> },
    /// Package expanded: render its details beneath `node`.
    DetailsShown {
        node: NodeId,
        details: PackageDetails,
    },
    /// Node collapsed: drop everything rendered beneath it.
    Collapsed {
        node: NodeId,
        removed: Vec<NodeId>,
        propagation: Propagation,
    },
}

impl RenderDelta {
    pub fn propagation(&self) -> Propagation {
        match self {
            RenderDelta::Collapsed { propagation, .. } => *propagation,
            _ => Propagation::Continue,
        }
    }
}

/// The rendered forest over an annotated taxonomy.
#[derive(Debug)]
pub struct DisclosureTree {
    taxonomy: Taxonomy,
    view: ViewArena,
}

impl DisclosureTree {
    /// Render one collapsed root per top classification.
    pub fn new(taxonomy: Taxonomy) -> Self {
        let mut view = ViewArena::new();
        for (top, t) in taxonomy.iter().enumerate() {
            let data = class_node_data(ClassRef::Top { top }, Classification::Top(t), None);
            view.insert_node(data, None);
        }
        debug!("disclosure tree with {} roots", taxonomy.len());
        Self { taxonomy, view }
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.view.roots()
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&ViewNode> {
        self.view.get_node(id).ok_or(DomainError::UnknownNode(id))
    }

    pub fn state(&self, id: NodeId) -> DomainResult<DisclosureState> {
        self.node(id).map(|n| n.state)
    }

    pub fn label(&self, id: NodeId) -> DomainResult<&str> {
        self.node(id).map(|n| n.data.label.as_str())
    }

    pub fn children(&self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        self.node(id)?;
        Ok(self.view.children(id))
    }

    /// Rendered nodes in display order with their depth.
    pub fn visible(&self) -> impl Iterator<Item = (NodeId, usize, &ViewNode)> {
        self.view.iter()
    }

    /// Number of rendered nodes.
    pub fn rendered_count(&self) -> usize {
        self.view.len()
    }

    /// Flip the state of `id` and describe the resulting view change.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle(&mut self, id: NodeId) -> DomainResult<RenderDelta> {
        let node = self.node(id)?;
        let (state, kind) = (node.state, node.data.kind);

        let delta = match state {
            DisclosureState::Collapsed => self.expand(id, kind)?,
            DisclosureState::Expanded => self.collapse(id),
        };

        if let Some(node) = self.view.get_node_mut(id) {
            node.state = match state {
                DisclosureState::Collapsed => DisclosureState::Expanded,
                DisclosureState::Expanded => DisclosureState::Collapsed,
            };
        }
        Ok(delta)
    }

    fn expand(&mut self, id: NodeId, kind: NodeKind) -> DomainResult<RenderDelta> {
        match kind {
            NodeKind::Package { owner, index } => {
                let package = self
                    .taxonomy
                    .resolve(owner)
                    .and_then(|c| c.packages().get(index))
                    .ok_or(DomainError::DanglingNode(id))?;
                Ok(RenderDelta::DetailsShown {
                    node: id,
                    details: PackageDetails::from(package),
                })
            }
            NodeKind::Class(class) => {
                let planned = self.plan_children(class).ok_or(DomainError::DanglingNode(id))?;
                let mut lists: Vec<ChildList> = Vec::with_capacity(planned.len());
                for (group, children) in planned {
                    let items = children
                        .into_iter()
                        .map(|data| {
                            let label = data.label.clone();
                            let style = data.style;
                            let child = self.view.insert_node(data, Some(id));
                            RenderedChild {
                                id: child,
                                label,
                                style,
                            }
                        })
                        .collect();
                    lists.push(ChildList { group, items });
                }
                Ok(RenderDelta::Expanded { node: id, lists })
            }
        }
    }

    /// Child lists of a classification, by level:
    /// top has bottoms, mids and packages; mid has bottoms and packages;
    /// bottom has packages only.
    fn plan_children(&self, class: ClassRef) -> Option<Vec<(ChildGroup, Vec<NodeData>)>> {
        let resolved = self.taxonomy.resolve(class)?;
        let packages = package_nodes(class, resolved.packages());

        let planned = match (class, resolved) {
            (ClassRef::Top { top }, Classification::Top(t)) => {
                let bottoms = t
                    .classifications
                    .iter()
                    .enumerate()
                    .map(|(bottom, b)| {
                        class_node_data(
                            ClassRef::Bottom {
                                top,
                                mid: None,
                                bottom,
                            },
                            Classification::Bottom(b),
                            Some(ChildGroup::Classifications),
                        )
                    })
                    .collect();
                let mids = t
                    .subclassifications
                    .iter()
                    .enumerate()
                    .map(|(mid, m)| {
                        class_node_data(
                            ClassRef::Mid { top, mid },
                            Classification::Mid(m),
                            Some(ChildGroup::Subclassifications),
                        )
                    })
                    .collect();
                vec![
                    (ChildGroup::Classifications, bottoms),
                    (ChildGroup::Subclassifications, mids),
                    (ChildGroup::Packages, packages),
                ]
            }
            (ClassRef::Mid { top, mid }, Classification::Mid(m)) => {
                let bottoms = m
                    .classifications
                    .iter()
                    .enumerate()
                    .map(|(bottom, b)| {
                        class_node_data(
                            ClassRef::Bottom {
                                top,
                                mid: Some(mid),
                                bottom,
                            },
                            Classification::Bottom(b),
                            Some(ChildGroup::Classifications),
                        )
                    })
                    .collect();
                vec![
                    (ChildGroup::Classifications, bottoms),
                    (ChildGroup::Packages, packages),
                ]
            }
            (ClassRef::Bottom { .. }, Classification::Bottom(_)) => {
                vec![(ChildGroup::Packages, packages)]
            }
            _ => return None,
        };
        Some(planned)
    }

    fn collapse(&mut self, id: NodeId) -> RenderDelta {
        let removed = self.view.remove_descendants(id);
        debug!("collapse {}: removed {} nodes", id, removed.len());
        RenderDelta::Collapsed {
            node: id,
            removed,
            propagation: Propagation::Stop,
        }
    }

    /// Rendered node standing for `class`, if any.
    pub fn find_rendered(&self, class: ClassRef) -> Option<NodeId> {
        self.view
            .iter()
            .find(|(_, _, node)| node.data.kind == NodeKind::Class(class))
            .map(|(id, _, _)| id)
    }

    /// Expand the ancestors of the classification carrying `code` until it is
    /// rendered. Already-expanded ancestors are left alone.
    #[instrument(level = "debug", skip(self))]
    pub fn reveal(&mut self, code: &str) -> DomainResult<(NodeId, Vec<RenderDelta>)> {
        let target = self
            .taxonomy
            .locate(code)
            .ok_or_else(|| DomainError::ClassificationNotFound(code.to_string()))?;

        let mut deltas = Vec::new();
        for class in target.lineage() {
            let id = self
                .find_rendered(class)
                .ok_or_else(|| DomainError::ClassificationNotFound(code.to_string()))?;
            if class == target {
                return Ok((id, deltas));
            }
            if self.state(id)? == DisclosureState::Collapsed {
                deltas.push(self.toggle(id)?);
            }
        }
        Err(DomainError::ClassificationNotFound(code.to_string()))
    }

    /// Expand every collapsed classification, level by level; packages too
    /// when `include_packages` is set.
    #[instrument(level = "debug", skip(self))]
    pub fn expand_all(&mut self, include_packages: bool) -> DomainResult<Vec<RenderDelta>> {
        let mut deltas = Vec::new();
        loop {
            let pending: Vec<NodeId> = self
                .view
                .iter()
                .filter(|(_, _, node)| node.state == DisclosureState::Collapsed)
                .filter(|(_, _, node)| {
                    include_packages || matches!(node.data.kind, NodeKind::Class(_))
                })
                .map(|(id, _, _)| id)
                .collect();
            if pending.is_empty() {
                return Ok(deltas);
            }
            for id in pending {
                deltas.push(self.toggle(id)?);
            }
        }
    }
}

fn class_node_data(class: ClassRef, c: Classification<'_>, group: Option<ChildGroup>) -> NodeData {
    let element = match class {
        ClassRef::Top { .. } => ElementClass::TopClass,
        ClassRef::Mid { .. } => ElementClass::MidClass,
        ClassRef::Bottom { .. } => ElementClass::BotClass,
    };
    NodeData {
        kind: NodeKind::Class(class),
        label: c.label(),
        style: StyleHook {
            class: element,
            empty: c.is_empty(),
            verified: None,
        },
        group,
    }
}

fn package_nodes(owner: ClassRef, packages: &[Package]) -> Vec<NodeData> {
    packages
        .iter()
        .enumerate()
        .map(|(index, p)| NodeData {
            kind: NodeKind::Package { owner, index },
            label: p.name.clone(),
            style: StyleHook {
                class: ElementClass::Package,
                empty: false,
                verified: Some(p.verified),
            },
            group: Some(ChildGroup::Packages),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregate::aggregate;
    use crate::domain::entities::{BottomClassification, MidClassification, TopClassification};

    fn package(name: &str, code: &str) -> Package {
        Package {
            name: name.into(),
            url: format!("https://example.org/{name}"),
            description: format!("about {name}"),
            authors: "A. Author".into(),
            verified: true,
            classification_code: code.into(),
        }
    }

    fn tree() -> DisclosureTree {
        let taxonomy = Taxonomy::new(vec![TopClassification {
            short_name: "Logic".into(),
            code: "03".into(),
            classifications: vec![BottomClassification {
                name: "Philosophy".into(),
                code: "03A05".into(),
                ..Default::default()
            }],
            subclassifications: vec![MidClassification {
                name: "General logic".into(),
                code: "03Bxx".into(),
                classifications: vec![BottomClassification {
                    name: "Mechanization".into(),
                    code: "03B35".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }]);
        let packages = vec![package("Tarski", "03"), package("Prover", "03b35")];
        DisclosureTree::new(aggregate(&packages, &taxonomy))
    }

    #[test]
    fn given_top_when_expanding_then_emits_three_lists() {
        let mut tree = tree();
        let root = tree.roots()[0];

        let delta = tree.toggle(root).unwrap();

        let RenderDelta::Expanded { lists, .. } = delta else {
            panic!("expected expansion");
        };
        let groups: Vec<ChildGroup> = lists.iter().map(|l| l.group).collect();
        assert_eq!(
            groups,
            vec![
                ChildGroup::Classifications,
                ChildGroup::Subclassifications,
                ChildGroup::Packages
            ]
        );
        assert_eq!(lists[0].items[0].label, "03A05: Philosophy (0 packages)");
        assert!(lists[0].items[0].style.empty);
        assert_eq!(lists[1].items[0].label, "03Bxx: General logic (1 packages)");
        assert_eq!(lists[2].items[0].label, "Tarski");
        assert_eq!(tree.state(root).unwrap(), DisclosureState::Expanded);
    }

    #[test]
    fn given_package_when_expanding_then_shows_details_without_children() {
        let mut tree = tree();
        let root = tree.roots()[0];
        let RenderDelta::Expanded { lists, .. } = tree.toggle(root).unwrap() else {
            panic!("expected expansion");
        };
        let package = lists[2].items[0].id;

        let delta = tree.toggle(package).unwrap();

        assert_eq!(
            delta,
            RenderDelta::DetailsShown {
                node: package,
                details: PackageDetails {
                    homepage: "https://example.org/Tarski".into(),
                    authors: "A. Author".into(),
                    description: "about Tarski".into(),
                },
            }
        );
        assert!(tree.children(package).unwrap().is_empty());
    }

    #[test]
    fn given_expanded_top_when_collapsing_then_stops_propagation_and_drops_subtree() {
        let mut tree = tree();
        let root = tree.roots()[0];
        tree.toggle(root).unwrap();
        let rendered_before = tree.rendered_count();

        let delta = tree.toggle(root).unwrap();

        assert_eq!(delta.propagation(), Propagation::Stop);
        let RenderDelta::Collapsed { removed, .. } = delta else {
            panic!("expected collapse");
        };
        assert_eq!(removed.len(), rendered_before - 1);
        assert_eq!(tree.rendered_count(), 1);
    }

    #[test]
    fn given_nested_code_when_revealing_then_expands_ancestors_only() {
        let mut tree = tree();

        let (target, deltas) = tree.reveal("03B35").unwrap();

        assert_eq!(deltas.len(), 2);
        assert_eq!(tree.label(target).unwrap(), "03B35: Mechanization (1 packages)");
        assert_eq!(tree.state(target).unwrap(), DisclosureState::Collapsed);

        // Revealing again changes nothing
        let (again, deltas) = tree.reveal("03b35").unwrap();
        assert_eq!(again, target);
        assert!(deltas.is_empty());
    }

    #[test]
    fn given_unknown_code_when_revealing_then_errors() {
        let mut tree = tree();
        assert_eq!(
            tree.reveal("99Z").unwrap_err(),
            DomainError::ClassificationNotFound("99Z".into())
        );
    }

    #[test]
    fn given_tree_when_expanding_all_then_every_classification_is_expanded() {
        let mut tree = tree();

        tree.expand_all(false).unwrap();

        let states: Vec<(bool, DisclosureState)> = tree
            .visible()
            .map(|(_, _, n)| (matches!(n.data.kind, NodeKind::Class(_)), n.state))
            .collect();
        assert!(states
            .iter()
            .all(|(is_class, state)| !is_class || *state == DisclosureState::Expanded));
        // 1 top + 1 bottom + 1 mid + 1 nested bottom + 2 packages
        assert_eq!(tree.rendered_count(), 6);
    }
}
