use crate::geo::GeoPoint;
use crate::map::basemap::MapSurface;
use crate::overlay::cluster::ClusterIndex;
use crate::overlay::primitive::{
    ClusterableLine, LinkPrimitive, Locatable, NodePrimitive, ObjectKind, ObjectRef,
};

/// Tracks every primitive currently on the map, in insertion order,
/// so a reload can enumerate and tear them all down at once.
#[derive(Default)]
pub struct OverlayRegistry {
    nodes: Vec<NodePrimitive>,
    links: Vec<LinkPrimitive>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node(&mut self, node: NodePrimitive) {
        self.nodes.push(node);
    }

    pub fn register_link(&mut self, link: LinkPrimitive) {
        self.links.push(link);
    }

    pub fn nodes(&self) -> &[NodePrimitive] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkPrimitive] {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut [LinkPrimitive] {
        &mut self.links
    }

    pub fn node(&self, object: ObjectRef) -> Option<&NodePrimitive> {
        self.nodes.iter().find(|n| n.object == object)
    }

    pub fn link(&self, object: ObjectRef) -> Option<&LinkPrimitive> {
        self.links.iter().find(|l| l.object == object)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// Detach every tracked primitive from whichever layer holds it
    /// (direct surface attachment or the cluster index), then drop the
    /// primitives themselves. Safe to call on an empty registry.
    pub fn clear(&mut self, surface: &mut MapSurface, cluster: &mut ClusterIndex) {
        for node in &self.nodes {
            surface.detach(node.object);
            cluster.remove(node.object);
        }
        for link in &self.links {
            surface.detach(link.object);
            cluster.remove(link.object);
        }
        self.nodes.clear();
        self.links.clear();
    }

    /// Route a reposition request through the primitive's `Locatable`
    /// capability: markers move, lines ignore it via their adapter.
    pub fn relocate(&mut self, target: ObjectRef, to: GeoPoint) {
        match target.kind {
            ObjectKind::Device | ObjectKind::Site => {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.object == target) {
                    node.set_location(to);
                }
            }
            ObjectKind::Link => {
                if let Some(link) = self.links.iter_mut().find(|l| l.object == target) {
                    ClusterableLine(link).set_location(to);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::basemap::Basemap;
    use crate::overlay::primitive::{Activation, Icon, LinkStyle};
    use ratatui::style::Color;

    fn node(id: u64, at: GeoPoint) -> NodePrimitive {
        let object = ObjectRef::new(ObjectKind::Device, id);
        NodePrimitive::new(
            object,
            at,
            Icon {
                glyph: '●',
                color: Color::White,
            },
            format!("d{id}"),
            Activation::OpenDetail(object),
        )
    }

    fn link(id: u64) -> LinkPrimitive {
        let object = ObjectRef::new(ObjectKind::Link, id);
        LinkPrimitive::new(
            object,
            (GeoPoint::new(0.0, 0.0), GeoPoint::new(10.0, 10.0)),
            LinkStyle { color: Color::Blue },
            format!("l{id}"),
            Activation::OpenDetail(object),
        )
    }

    #[test]
    fn test_clear_detaches_from_both_layers() {
        let mut registry = OverlayRegistry::new();
        let mut surface = MapSurface::new(Basemap::new());
        let mut cluster = ClusterIndex::new();

        let n = node(1, GeoPoint::new(5.0, 5.0));
        surface.attach_node(n.object);
        registry.register_node(n);

        let mut l = link(2);
        let obj = l.object;
        cluster.add(obj, &ClusterableLine(&mut l));
        registry.register_link(l);

        assert_eq!(registry.len(), 2);
        registry.clear(&mut surface, &mut cluster);

        assert!(registry.is_empty());
        assert_eq!(surface.attached_count(), 0);
        assert!(cluster.is_empty());
    }

    #[test]
    fn test_clear_twice_is_safe() {
        let mut registry = OverlayRegistry::new();
        let mut surface = MapSurface::new(Basemap::new());
        let mut cluster = ClusterIndex::new();

        registry.clear(&mut surface, &mut cluster);
        registry.clear(&mut surface, &mut cluster);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_relocate_moves_nodes_but_not_links() {
        let mut registry = OverlayRegistry::new();
        let n = node(1, GeoPoint::new(0.0, 0.0));
        let n_ref = n.object;
        registry.register_node(n);

        let l = link(2);
        let l_ref = l.object;
        registry.register_link(l);

        registry.relocate(n_ref, GeoPoint::new(7.0, 8.0));
        registry.relocate(l_ref, GeoPoint::new(7.0, 8.0));

        assert_eq!(registry.node(n_ref).unwrap().position(), GeoPoint::new(7.0, 8.0));
        assert_eq!(registry.link(l_ref).unwrap().anchor(), GeoPoint::new(5.0, 5.0));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut registry = OverlayRegistry::new();
        for id in [3, 1, 2] {
            registry.register_node(node(id, GeoPoint::new(0.0, 0.0)));
        }
        let ids: Vec<u64> = registry.nodes().iter().map(|n| n.object.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
