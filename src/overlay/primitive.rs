use crate::geo::GeoPoint;
use ratatui::style::Color;

/// Kind of domain object a primitive stands for
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ObjectKind {
    Device,
    Site,
    Link,
}

impl ObjectKind {
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Device => "device",
            ObjectKind::Site => "site",
            ObjectKind::Link => "link",
        }
    }
}

/// Identity of the domain object behind a primitive. Device and pool
/// ids come from separate namespaces, so the kind is part of the key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: u64,
}

impl ObjectRef {
    pub const fn new(kind: ObjectKind, id: u64) -> Self {
        Self { kind, id }
    }
}

/// Marker glyph and color for a node primitive
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Icon {
    pub glyph: char,
    pub color: Color,
}

/// Line style for a link primitive; width is fixed, hover draws thick
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LinkStyle {
    pub color: Color,
}

/// What a primitive's primary activation does
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Activation {
    /// Open the detail panel for this object
    OpenDetail(ObjectRef),
    /// Drill into a pool's scoped view
    EnterPool(u64),
}

/// Visual representation of a device or pool/site on the map
pub struct NodePrimitive {
    pub object: ObjectRef,
    position: GeoPoint,
    pub icon: Icon,
    /// Tooltip text; empty when the object has no name
    pub label: String,
    pub primary: Activation,
}

impl NodePrimitive {
    pub fn new(
        object: ObjectRef,
        position: GeoPoint,
        icon: Icon,
        label: String,
        primary: Activation,
    ) -> Self {
        Self {
            object,
            position,
            icon,
            label,
            primary,
        }
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }
}

/// Visual representation of a link: a two-point line plus the anchor
/// the cluster index places it by
pub struct LinkPrimitive {
    pub object: ObjectRef,
    pub endpoints: (GeoPoint, GeoPoint),
    pub style: LinkStyle,
    /// Tooltip text; empty when the link has no name
    pub label: String,
    pub primary: Activation,
    /// Bounding-box center of the endpoints, fixed at construction
    anchor: GeoPoint,
}

impl LinkPrimitive {
    pub fn new(
        object: ObjectRef,
        endpoints: (GeoPoint, GeoPoint),
        style: LinkStyle,
        label: String,
        primary: Activation,
    ) -> Self {
        let anchor = GeoPoint::bounds_center(endpoints.0, endpoints.1);
        Self {
            object,
            endpoints,
            style,
            label,
            primary,
            anchor,
        }
    }

    pub fn anchor(&self) -> GeoPoint {
        self.anchor
    }
}

/// The capability the cluster index needs from its members: a single
/// representative point, and a way to move it when a cluster is spread.
pub trait Locatable {
    fn location(&self) -> GeoPoint;
    fn set_location(&mut self, to: GeoPoint);
}

impl Locatable for NodePrimitive {
    fn location(&self) -> GeoPoint {
        self.position
    }

    fn set_location(&mut self, to: GeoPoint) {
        self.position = to;
    }
}

/// Adapter that lets a line participate in the cluster index.
/// The location is the fixed anchor; repositioning is deliberately
/// ignored, since a line's true position derives from its endpoints.
pub struct ClusterableLine<'a>(pub &'a mut LinkPrimitive);

impl Locatable for ClusterableLine<'_> {
    fn location(&self) -> GeoPoint {
        self.0.anchor
    }

    fn set_location(&mut self, _to: GeoPoint) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(a: GeoPoint, b: GeoPoint) -> LinkPrimitive {
        let object = ObjectRef::new(ObjectKind::Link, 1);
        LinkPrimitive::new(
            object,
            (a, b),
            LinkStyle { color: Color::Blue },
            "core".into(),
            Activation::OpenDetail(object),
        )
    }

    #[test]
    fn test_link_anchor_is_bounds_center() {
        let l = link(GeoPoint::new(0.0, 0.0), GeoPoint::new(10.0, 10.0));
        assert_eq!(l.anchor(), GeoPoint::new(5.0, 5.0));
    }

    #[test]
    fn test_line_adapter_ignores_relocation() {
        let mut l = link(GeoPoint::new(0.0, 0.0), GeoPoint::new(10.0, 10.0));
        let mut adapter = ClusterableLine(&mut l);
        assert_eq!(adapter.location(), GeoPoint::new(5.0, 5.0));

        adapter.set_location(GeoPoint::new(-40.0, 170.0));
        adapter.set_location(GeoPoint::new(88.0, -3.0));
        assert_eq!(adapter.location(), GeoPoint::new(5.0, 5.0));
        assert_eq!(l.anchor(), GeoPoint::new(5.0, 5.0));
    }

    #[test]
    fn test_node_relocates() {
        let object = ObjectRef::new(ObjectKind::Device, 7);
        let mut n = NodePrimitive::new(
            object,
            GeoPoint::new(1.0, 2.0),
            Icon {
                glyph: '●',
                color: Color::White,
            },
            "r1".into(),
            Activation::OpenDetail(object),
        );
        n.set_location(GeoPoint::new(3.0, 4.0));
        assert_eq!(n.location(), GeoPoint::new(3.0, 4.0));
    }
}
