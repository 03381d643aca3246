use crate::data::{LinkObject, NodeObject};
use crate::overlay::primitive::{
    Activation, Icon, LinkPrimitive, LinkStyle, NodePrimitive, ObjectKind, ObjectRef,
};
use ratatui::style::Color;
use std::collections::HashMap;

/// Which category of node a domain object is rendered as
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Device,
    Site,
}

impl NodeKind {
    fn object_kind(self) -> ObjectKind {
        match self {
            NodeKind::Device => ObjectKind::Device,
            NodeKind::Site => ObjectKind::Site,
        }
    }
}

/// Immutable subtype → icon mapping, built once at startup.
/// Unknown device subtypes fall back to the router icon; sites always
/// use the fixed site icon.
pub struct IconSet {
    device: HashMap<String, Icon>,
    router: Icon,
    site: Icon,
}

impl IconSet {
    pub fn standard() -> Self {
        let router = Icon {
            glyph: '●',
            color: Color::White,
        };
        let device = [
            ("router", router),
            (
                "switch",
                Icon {
                    glyph: '◆',
                    color: Color::Cyan,
                },
            ),
            (
                "firewall",
                Icon {
                    glyph: '▲',
                    color: Color::Red,
                },
            ),
            (
                "server",
                Icon {
                    glyph: '■',
                    color: Color::Green,
                },
            ),
            (
                "host",
                Icon {
                    glyph: '○',
                    color: Color::Gray,
                },
            ),
            (
                "antenna",
                Icon {
                    glyph: '★',
                    color: Color::Magenta,
                },
            ),
            (
                "regenerator",
                Icon {
                    glyph: '◦',
                    color: Color::DarkGray,
                },
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            device,
            router,
            site: Icon {
                glyph: '⌂',
                color: Color::Yellow,
            },
        }
    }

    pub fn device_icon(&self, subtype: &str) -> Icon {
        self.device.get(subtype).copied().unwrap_or(self.router)
    }

    pub fn site_icon(&self) -> Icon {
        self.site
    }
}

/// Immutable link subtype → color mapping with a default fallback
pub struct LinkPalette {
    colors: HashMap<String, Color>,
    default: Color,
}

impl LinkPalette {
    pub fn standard() -> Self {
        let colors = [
            ("ethernet_link", Color::Blue),
            ("optical_link", Color::Red),
            ("optical_channel", Color::Magenta),
            ("etherchannel", Color::Cyan),
            ("pseudowire", Color::Green),
            ("bgp_peering", Color::Yellow),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            colors,
            default: Color::Gray,
        }
    }

    pub fn color(&self, subtype: &str) -> Color {
        self.colors.get(subtype).copied().unwrap_or(self.default)
    }
}

/// Builds map primitives from domain objects: resolves icons/colors and
/// binds what primary activation does. Secondary activation (context
/// menu + selection) is derived from the primitive's object ref.
pub struct PrimitiveFactory {
    icons: IconSet,
    palette: LinkPalette,
}

impl PrimitiveFactory {
    pub fn new(icons: IconSet, palette: LinkPalette) -> Self {
        Self { icons, palette }
    }

    /// Build a node primitive for a device or pool. Returns None when
    /// the object has no usable coordinate (it has no map position).
    pub fn make_node(&self, obj: &NodeObject, kind: NodeKind) -> Option<NodePrimitive> {
        let position = obj.position()?;
        let object = ObjectRef::new(kind.object_kind(), obj.id);

        let icon = match kind {
            NodeKind::Device => self.icons.device_icon(&obj.subtype),
            NodeKind::Site => self.icons.site_icon(),
        };

        let primary = match kind {
            NodeKind::Site => Activation::EnterPool(obj.id),
            NodeKind::Device => Activation::OpenDetail(object),
        };

        Some(NodePrimitive::new(
            object,
            position,
            icon,
            obj.name.clone(),
            primary,
        ))
    }

    /// Build a link primitive between the source and destination
    /// endpoints, colored by subtype.
    pub fn make_link(&self, obj: &LinkObject) -> LinkPrimitive {
        let object = ObjectRef::new(ObjectKind::Link, obj.id);
        LinkPrimitive::new(
            object,
            (obj.source.position(), obj.destination.position()),
            LinkStyle {
                color: self.palette.color(&obj.subtype),
            },
            obj.name.clone(),
            Activation::OpenDetail(object),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EndPoint;
    use crate::geo::GeoPoint;
    use crate::overlay::primitive::Locatable;

    fn factory() -> PrimitiveFactory {
        PrimitiveFactory::new(IconSet::standard(), LinkPalette::standard())
    }

    fn node_obj(id: u64, subtype: &str, lat: Option<f64>, lon: Option<f64>) -> NodeObject {
        NodeObject {
            id,
            name: format!("n{id}"),
            subtype: subtype.to_string(),
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn test_unknown_subtype_falls_back_to_router() {
        let f = factory();
        let prim = f
            .make_node(&node_obj(1, "quantum_repeater", Some(1.0), Some(2.0)), NodeKind::Device)
            .unwrap();
        assert_eq!(prim.icon, IconSet::standard().device_icon("router"));
    }

    #[test]
    fn test_registered_subtype_uses_its_icon() {
        let f = factory();
        let prim = f
            .make_node(&node_obj(1, "switch", Some(1.0), Some(2.0)), NodeKind::Device)
            .unwrap();
        assert_eq!(prim.icon.glyph, '◆');
    }

    #[test]
    fn test_site_uses_fixed_icon_and_enters_pool() {
        let f = factory();
        let prim = f
            .make_node(&node_obj(9, "", Some(1.0), Some(2.0)), NodeKind::Site)
            .unwrap();
        assert_eq!(prim.icon.glyph, '⌂');
        assert_eq!(prim.primary, Activation::EnterPool(9));
        assert_eq!(prim.object.kind, ObjectKind::Site);
    }

    #[test]
    fn test_node_without_longitude_is_excluded() {
        let f = factory();
        assert!(f
            .make_node(&node_obj(2, "router", Some(10.0), None), NodeKind::Site)
            .is_none());
        assert!(f
            .make_node(&node_obj(3, "router", None, None), NodeKind::Site)
            .is_none());
    }

    #[test]
    fn test_missing_name_gives_empty_tooltip() {
        let f = factory();
        let mut obj = node_obj(4, "router", Some(0.0), Some(0.0));
        obj.name = String::new();
        let prim = f.make_node(&obj, NodeKind::Device).unwrap();
        assert_eq!(prim.label, "");
    }

    #[test]
    fn test_link_color_and_anchor() {
        let f = factory();
        let link = LinkObject {
            id: 5,
            name: "core-1".into(),
            subtype: "optical_link".into(),
            source: EndPoint {
                latitude: 0.0,
                longitude: 0.0,
            },
            destination: EndPoint {
                latitude: 10.0,
                longitude: 10.0,
            },
        };
        let prim = f.make_link(&link);
        assert_eq!(prim.style.color, Color::Red);
        assert_eq!(prim.anchor(), GeoPoint::new(5.0, 5.0));
        assert_eq!(prim.primary, Activation::OpenDetail(prim.object));
    }

    #[test]
    fn test_unmapped_link_subtype_uses_default_color() {
        let palette = LinkPalette::standard();
        assert_eq!(palette.color("carrier_pigeon"), Color::Gray);
    }

    #[test]
    fn test_factory_node_is_locatable() {
        let f = factory();
        let prim = f
            .make_node(&node_obj(1, "router", Some(3.0), Some(4.0)), NodeKind::Device)
            .unwrap();
        assert_eq!(prim.location(), GeoPoint::new(3.0, 4.0));
    }
}
