use crate::braille::BrailleCanvas;
use crate::map::geometry::draw_line;
use crate::map::projection::Viewport;
use crate::overlay::primitive::ObjectRef;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Level of detail for basemap data
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }
}

/// Base linework style. Exactly one style is active at any time;
/// switching is a single assignment, so there is never a frame with
/// two styles drawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BaseStyle {
    /// Coastlines and country borders
    Political,
    /// Coastlines only
    Coastline,
    /// No base linework (overlays on black)
    Blank,
}

impl BaseStyle {
    pub fn next(self) -> Self {
        match self {
            BaseStyle::Political => BaseStyle::Coastline,
            BaseStyle::Coastline => BaseStyle::Blank,
            BaseStyle::Blank => BaseStyle::Political,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BaseStyle::Political => "political",
            BaseStyle::Coastline => "coastline",
            BaseStyle::Blank => "blank",
        }
    }
}

/// Basemap linework at multiple resolutions
#[derive(Default)]
pub struct Basemap {
    pub coastlines_low: Vec<LineString>,
    pub coastlines_medium: Vec<LineString>,
    pub coastlines_high: Vec<LineString>,
    pub borders_medium: Vec<LineString>,
    pub borders_high: Vec<LineString>,
}

impl Basemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coastlines for the given LOD, falling back to coarser data
    fn coastlines(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High => {
                if !self.coastlines_high.is_empty() {
                    &self.coastlines_high
                } else if !self.coastlines_medium.is_empty() {
                    &self.coastlines_medium
                } else {
                    &self.coastlines_low
                }
            }
            Lod::Medium => {
                if !self.coastlines_medium.is_empty() {
                    &self.coastlines_medium
                } else {
                    &self.coastlines_low
                }
            }
            Lod::Low => &self.coastlines_low,
        }
    }

    /// Borders for the given LOD
    fn borders(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High => {
                if !self.borders_high.is_empty() {
                    &self.borders_high
                } else {
                    &self.borders_medium
                }
            }
            _ => &self.borders_medium,
        }
    }

    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Medium | Lod::Low => self.borders_medium.push(line),
            Lod::High => self.borders_high.push(line),
        }
    }

    /// Check if any coastline data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }
}

/// Rendered base linework, one canvas per color group
pub struct BaseLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
}

/// The map rendering surface: base linework plus the primitives that
/// are attached directly (flat and drill-down modes). Clustered
/// primitives live in the cluster index instead.
pub struct MapSurface {
    pub basemap: Basemap,
    style: BaseStyle,
    nodes: Vec<ObjectRef>,
    links: Vec<ObjectRef>,
}

impl MapSurface {
    pub fn new(basemap: Basemap) -> Self {
        Self {
            basemap,
            style: BaseStyle::Political,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn style(&self) -> BaseStyle {
        self.style
    }

    /// Swap the base style. Overlay attachments are untouched.
    pub fn set_style(&mut self, style: BaseStyle) {
        self.style = style;
    }

    /// Attach a node primitive directly to the surface
    pub fn attach_node(&mut self, object: ObjectRef) {
        if !self.nodes.contains(&object) {
            self.nodes.push(object);
        }
    }

    /// Attach a link primitive directly to the surface
    pub fn attach_link(&mut self, object: ObjectRef) {
        if !self.links.contains(&object) {
            self.links.push(object);
        }
    }

    /// Detach a primitive; no-op when it is not attached here
    pub fn detach(&mut self, object: ObjectRef) {
        self.nodes.retain(|o| *o != object);
        self.links.retain(|o| *o != object);
    }

    pub fn detach_all(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }

    pub fn contains(&self, object: ObjectRef) -> bool {
        self.nodes.contains(&object) || self.links.contains(&object)
    }

    pub fn attached_nodes(&self) -> &[ObjectRef] {
        &self.nodes
    }

    pub fn attached_links(&self) -> &[ObjectRef] {
        &self.links
    }

    pub fn attached_count(&self) -> usize {
        self.nodes.len() + self.links.len()
    }

    /// Render the base linework for the current style into per-color canvases
    pub fn render_base(&self, char_width: usize, char_height: usize, viewport: &Viewport) -> BaseLayers {
        let mut layers = BaseLayers {
            coastlines: BrailleCanvas::new(char_width, char_height),
            borders: BrailleCanvas::new(char_width, char_height),
        };

        if self.style == BaseStyle::Blank {
            return layers;
        }

        let lod = Lod::from_zoom(viewport.zoom);

        for line in self.basemap.coastlines(lod) {
            draw_linestring(&mut layers.coastlines, line, viewport);
        }

        if self.style == BaseStyle::Political {
            for line in self.basemap.borders(lod) {
                draw_linestring(&mut layers.borders, line, viewport);
            }
        }

        layers
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(crate::geo::GeoPoint::new(lat, lon));

        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::primitive::{ObjectKind, ObjectRef};

    fn node(id: u64) -> ObjectRef {
        ObjectRef::new(ObjectKind::Device, id)
    }

    #[test]
    fn test_attach_detach() {
        let mut surface = MapSurface::new(Basemap::new());
        surface.attach_node(node(1));
        surface.attach_node(node(1)); // re-attach is a no-op
        surface.attach_link(ObjectRef::new(ObjectKind::Link, 2));
        assert_eq!(surface.attached_count(), 2);

        surface.detach(node(1));
        surface.detach(node(99)); // absent: no-op
        assert_eq!(surface.attached_count(), 1);

        surface.detach_all();
        assert_eq!(surface.attached_count(), 0);
    }

    #[test]
    fn test_style_switch_preserves_attachments() {
        let mut surface = MapSurface::new(Basemap::new());
        surface.attach_node(node(1));
        surface.set_style(BaseStyle::Blank);
        assert_eq!(surface.style(), BaseStyle::Blank);
        assert_eq!(surface.attached_count(), 1);
    }

    #[test]
    fn test_blank_style_renders_nothing() {
        let mut basemap = Basemap::new();
        basemap.add_coastline(vec![(0.0, 0.0), (10.0, 10.0)], Lod::Low);
        let mut surface = MapSurface::new(basemap);
        surface.set_style(BaseStyle::Blank);

        let vp = Viewport::world(100, 40);
        let layers = surface.render_base(50, 10, &vp);
        assert!(layers.coastlines.is_blank());
        assert!(layers.borders.is_blank());
    }

    #[test]
    fn test_lod_selection() {
        assert!(matches!(Lod::from_zoom(1.0), Lod::Low));
        assert!(matches!(Lod::from_zoom(4.0), Lod::Medium));
        assert!(matches!(Lod::from_zoom(20.0), Lod::High));
    }
}
