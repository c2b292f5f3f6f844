//! Domain layer: taxonomy entities, aggregation and the disclosure tree
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod arena;
pub mod disclosure;
pub mod entities;
pub mod error;

pub use aggregate::{aggregate, dedupe_packages};
pub use arena::{
    ChildGroup, DisclosureState, ElementClass, NodeData, NodeId, NodeKind, StyleHook, ViewArena,
    ViewNode,
};
pub use disclosure::{
    ChildList, DisclosureTree, PackageDetails, Propagation, RenderDelta, RenderedChild,
};
pub use entities::*;
pub use error::{DomainError, DomainResult};
