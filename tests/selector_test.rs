//! Browse-style selection driven by a mock selector

use std::sync::Arc;

use itpcat::application::CatalogWidget;
use itpcat::cli::commands::selection_items;
use itpcat::domain::{DisclosureState, NodeId, Taxonomy};
use itpcat::infrastructure::surface::TreeSurface;
use itpcat::infrastructure::traits::{SelectionItem, Selector};
use itpcat::util::testing::{self, package, SAMPLE_TAXONOMY_JSON};

/// Mock selector that picks the line whose display contains a needle.
struct MockSelector {
    needle: Option<&'static str>,
}

impl MockSelector {
    fn new(needle: Option<&'static str>) -> Self {
        Self { needle }
    }
}

impl Selector for MockSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        _prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        match self.needle {
            Some(needle) => items
                .iter()
                .find(|i| i.display.contains(needle))
                .cloned()
                .map(Some)
                .ok_or_else(|| format!("no item contains {needle}")),
            None => Ok(None), // User cancelled
        }
    }
}

fn widget() -> CatalogWidget<TreeSurface> {
    testing::init_test_setup();
    let taxonomy: Taxonomy = serde_json::from_str(SAMPLE_TAXONOMY_JSON).unwrap();
    CatalogWidget::build(
        &[package("Graph_Theory", "05C", true)],
        &taxonomy,
        TreeSurface::new("Sample").plain(),
    )
}

fn select_and_activate(widget: &mut CatalogWidget<TreeSurface>, selector: &dyn Selector) -> bool {
    let items = selection_items(widget);
    match selector.select_one(&items, "toggle> ").unwrap() {
        Some(item) => {
            let id: NodeId = item.value.parse().unwrap();
            widget.activate(id).unwrap();
            true
        }
        None => false,
    }
}

#[test]
fn given_mounted_widget_when_listing_then_one_item_per_top() {
    let widget = widget();

    let items = selection_items(&widget);

    assert_eq!(items.len(), 2);
    assert!(items[0].display.contains("+ 03: Mathematical logic"));
    assert!(items[1].display.contains("+ 05: Combinatorics (1 packages)"));
}

#[test]
fn given_selected_top_when_activating_then_children_become_selectable() {
    let mut widget = widget();
    let selector: Arc<dyn Selector> = Arc::new(MockSelector::new(Some("05: Combinatorics")));

    assert!(select_and_activate(&mut widget, selector.as_ref()));

    let items = selection_items(&widget);
    assert_eq!(items.len(), 3);
    assert!(items[1].display.contains("- 05: Combinatorics"));
    assert!(items[2].display.contains("  + 05C: Graph theory (1 packages)"));
}

#[test]
fn given_selected_package_when_activating_then_details_are_shown() {
    let mut widget = widget();
    select_and_activate(&mut widget, &MockSelector::new(Some("05: Combinatorics")));
    select_and_activate(&mut widget, &MockSelector::new(Some("05C: Graph theory")));

    select_and_activate(&mut widget, &MockSelector::new(Some("* Graph_Theory")));

    let items = selection_items(&widget);
    let package_item = items
        .iter()
        .find(|i| i.display.contains("Graph_Theory"))
        .unwrap();
    let id: NodeId = package_item.value.parse().unwrap();
    assert_eq!(widget.state(id).unwrap(), DisclosureState::Expanded);
    assert!(widget.surface().details(id).is_some());
}

#[test]
fn given_user_cancels_selection_when_browsing_then_nothing_changes() {
    let mut widget = widget();
    let before = widget.surface().render();

    assert!(!select_and_activate(&mut widget, &MockSelector::new(None)));

    assert_eq!(widget.surface().render(), before);
}

#[test]
fn given_unparseable_value_when_parsing_node_id_then_fails() {
    let result: Result<NodeId, String> = "not-a-handle".parse();
    assert!(result.is_err());
}
