//! Catalog widget: wires activation events to the disclosure tree
//!
//! The widget mounts the top-level elements on a [`RenderSurface`], turns
//! every activation into a single `toggle`, and forwards the resulting delta
//! to the surface.

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{
    aggregate, DisclosureState, DisclosureTree, NodeId, Package, Propagation, RenderDelta,
    RenderedChild, Taxonomy, ViewNode,
};
use crate::infrastructure::traits::RenderSurface;

pub struct CatalogWidget<S: RenderSurface> {
    tree: DisclosureTree,
    surface: S,
}

impl<S: RenderSurface> CatalogWidget<S> {
    /// Aggregate `packages` against `taxonomy` and mount the result.
    pub fn build(packages: &[Package], taxonomy: &Taxonomy, surface: S) -> Self {
        Self::mount(aggregate(packages, taxonomy), surface)
    }

    /// Mount an already aggregated taxonomy.
    pub fn mount(annotated: Taxonomy, mut surface: S) -> Self {
        let tree = DisclosureTree::new(annotated);
        let roots: Vec<RenderedChild> = tree
            .roots()
            .into_iter()
            .filter_map(|id| {
                tree.node(id).ok().map(|n| RenderedChild {
                    id,
                    label: n.data.label.clone(),
                    style: n.data.style,
                })
            })
            .collect();
        surface.mount(&roots);
        Self { tree, surface }
    }

    /// Handle one user activation of `id`.
    ///
    /// Returns whether the event may propagate to enclosing elements.
    #[instrument(level = "debug", skip(self))]
    pub fn activate(&mut self, id: NodeId) -> ApplicationResult<Propagation> {
        let delta = self.tree.toggle(id)?;
        self.surface.apply(&delta);
        debug!("activated {}: now {:?}", id, self.tree.state(id)?);
        Ok(delta.propagation())
    }

    /// Make the classification with `code` visible, expanding its ancestors.
    pub fn reveal(&mut self, code: &str) -> ApplicationResult<NodeId> {
        let (target, deltas) = self.tree.reveal(code)?;
        self.apply_all(&deltas);
        Ok(target)
    }

    /// Expand every classification (and packages when requested).
    pub fn expand_all(&mut self, include_packages: bool) -> ApplicationResult<()> {
        let deltas = self.tree.expand_all(include_packages)?;
        self.apply_all(&deltas);
        Ok(())
    }

    /// Rendered nodes in display order with depth, for selection lists.
    pub fn visible(&self) -> Vec<(NodeId, usize, &ViewNode)> {
        self.tree.visible().collect()
    }

    pub fn state(&self, id: NodeId) -> ApplicationResult<DisclosureState> {
        Ok(self.tree.state(id)?)
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.tree.roots()
    }

    pub fn tree(&self) -> &DisclosureTree {
        &self.tree
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn apply_all(&mut self, deltas: &[RenderDelta]) {
        for delta in deltas {
            self.surface.apply(delta);
        }
    }
}
