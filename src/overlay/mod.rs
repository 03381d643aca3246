pub mod cluster;
pub mod factory;
pub mod primitive;
pub mod registry;

pub use cluster::{Cluster, ClusterIndex};
pub use factory::{IconSet, LinkPalette, NodeKind, PrimitiveFactory};
pub use primitive::{
    Activation, ClusterableLine, Icon, LinkPrimitive, LinkStyle, Locatable, NodePrimitive,
    ObjectKind, ObjectRef,
};
pub use registry::OverlayRegistry;
