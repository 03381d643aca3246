use crate::data::{Inventory, Pool, PoolObjects};
use crate::geo::GeoPoint;
use crate::map::basemap::{BaseStyle, MapSurface};
use crate::map::geometry::point_segment_distance;
use crate::map::projection::Viewport;
use crate::overlay::{
    Activation, Cluster, ClusterIndex, ClusterableLine, IconSet, LinkPalette, LinkPrimitive,
    Locatable, NodeKind, NodePrimitive, ObjectKind, ObjectRef, OverlayRegistry, PrimitiveFactory,
};
use std::collections::HashMap;

/// Overview rendering mode: all primitives directly on the surface, or
/// grouped through the cluster index for continent-scale viewing
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Overview {
    Flat,
    Clustered,
}

/// Top-level view state
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViewMode {
    Overview(Overview),
    /// Scoped view of one pool's members; rendered flat on entry
    Drilldown(u64),
}

/// UI chrome the view controller toggles by name: menu groups, the
/// back-to-overview button, and the detail panel
#[derive(Default)]
pub struct Chrome {
    pub geo_menu: bool,
    pub insite_menu: bool,
    pub view_button: bool,
    /// Open context menu: object kind plus the cell it popped up at
    pub context_menu: Option<(ObjectKind, (u16, u16))>,
    pub detail: Option<ObjectRef>,
}

impl Chrome {
    /// Hide every menu group (context menus included)
    pub fn hide_menus(&mut self) {
        self.geo_menu = false;
        self.insite_menu = false;
        self.context_menu = None;
    }

    pub fn open_detail(&mut self, object: ObjectRef) {
        self.detail = Some(object);
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }
}

/// Identifies one load cycle. A token from a superseded cycle no longer
/// applies: a stale fetch result is dropped instead of repopulating a
/// registry that a newer load has already claimed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LoadToken(u64);

/// What the cursor is over
#[derive(Debug, PartialEq)]
pub enum Hit {
    Primitive(ObjectRef),
    Cluster(Cluster),
}

const NODE_HIT_RADIUS: f64 = 6.0;
const LINK_HIT_RADIUS: f64 = 4.0;

/// Application state: the map surface, the overlay engine, and the
/// view-mode state machine driving them
pub struct App {
    pub viewport: Viewport,
    pub surface: MapSurface,
    pub registry: OverlayRegistry,
    pub cluster: ClusterIndex,
    pub factory: PrimitiveFactory,
    pub inventory: Box<dyn Inventory>,
    pub mode: ViewMode,
    pub chrome: Chrome,
    /// Object the open context menu acts on
    pub selected: Option<ObjectRef>,
    /// Last load/fetch problem, shown in the status bar
    pub status: Option<String>,
    /// Pool names remembered from the last sites load, for titles
    pub pool_names: HashMap<u64, String>,
    /// Cluster currently fanned out, if any
    pub expanded: Option<Cluster>,
    pub menu_cursor: usize,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for hover tooltips
    pub mouse_pos: Option<(u16, u16)>,
    overview: Overview,
    /// Whether the current drill-down has been switched to clustering
    drilldown_clustered: bool,
    load_epoch: u64,
}

impl App {
    pub fn new(
        width: usize,
        height: usize,
        surface: MapSurface,
        inventory: Box<dyn Inventory>,
    ) -> Self {
        // Braille gives 2x4 resolution per character; account for the
        // border (2 chars) and the status bar (1 char)
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(3);

        Self {
            viewport: Viewport::world(inner_width * 2, inner_height * 4),
            surface,
            registry: OverlayRegistry::new(),
            cluster: ClusterIndex::new(),
            factory: PrimitiveFactory::new(IconSet::standard(), LinkPalette::standard()),
            inventory,
            mode: ViewMode::Overview(Overview::Clustered),
            chrome: Chrome::default(),
            selected: None,
            status: None,
            pool_names: HashMap::new(),
            expanded: None,
            menu_cursor: 0,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            overview: Overview::Clustered,
            drilldown_clustered: false,
            load_epoch: 0,
        }
    }

    /// Update viewport size when the terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(3);
        self.viewport.width = inner_width * 2;
        self.viewport.height = inner_height * 4;
    }

    /// Whether primitives currently go through the cluster index
    pub fn clustering_active(&self) -> bool {
        match self.mode {
            ViewMode::Overview(overview) => overview == Overview::Clustered,
            ViewMode::Drilldown(_) => self.drilldown_clustered,
        }
    }

    // ------------------------------------------------------------------
    // Load transitions

    fn begin_load(&mut self) -> LoadToken {
        self.load_epoch += 1;
        LoadToken(self.load_epoch)
    }

    fn is_current(&self, token: LoadToken) -> bool {
        token.0 == self.load_epoch
    }

    /// Show all pools with a map position as site markers
    pub fn load_sites_view(&mut self) {
        self.chrome.hide_menus();
        self.collapse_cluster();
        let token = self.begin_load();
        self.registry.clear(&mut self.surface, &mut self.cluster);
        self.chrome.view_button = false;

        match self.inventory.pools() {
            Ok(pools) => self.apply_pools(token, &pools),
            Err(e) => self.status = Some(format!("pool load failed: {e:#}")),
        }

        self.chrome.geo_menu = true;
    }

    fn apply_pools(&mut self, token: LoadToken, pools: &[Pool]) {
        if !self.is_current(token) {
            return;
        }
        self.mode = ViewMode::Overview(self.overview);
        self.pool_names = pools
            .iter()
            .map(|p| (p.node.id, p.node.name.clone()))
            .collect();

        for pool in pools {
            // Pools without a position are not on the map
            if let Some(prim) = self.factory.make_node(&pool.node, NodeKind::Site) {
                self.attach_node(prim);
            }
        }
        self.status = None;
    }

    /// Drill into one pool: a fresh overlay set of its members only
    pub fn enter_pool(&mut self, pool_id: u64) {
        self.chrome.hide_menus();
        self.collapse_cluster();
        self.chrome.view_button = true;
        self.chrome.insite_menu = true;
        let token = self.begin_load();
        self.registry.clear(&mut self.surface, &mut self.cluster);

        match self.inventory.pool_objects(pool_id) {
            Ok(objects) => self.apply_pool_objects(token, pool_id, &objects),
            Err(e) => self.status = Some(format!("pool {pool_id} load failed: {e:#}")),
        }
    }

    fn apply_pool_objects(&mut self, token: LoadToken, pool_id: u64, objects: &PoolObjects) {
        if !self.is_current(token) {
            return;
        }
        // Drill-down is small scale; it opens flat
        self.mode = ViewMode::Drilldown(pool_id);
        self.drilldown_clustered = false;

        let mut points = Vec::new();
        for device in &objects.devices {
            if let Some(prim) = self.factory.make_node(device, NodeKind::Device) {
                points.push(prim.position());
                self.attach_node(prim);
            }
        }
        for link in &objects.links {
            let prim = self.factory.make_link(link);
            points.push(prim.endpoints.0);
            points.push(prim.endpoints.1);
            self.attach_link(prim);
        }

        self.viewport.fit_bounds(&points);
        self.status = None;
    }

    /// Reload the sites view, keeping the remembered overview mode
    pub fn refresh(&mut self) {
        self.load_sites_view();
    }

    fn attach_node(&mut self, prim: NodePrimitive) {
        if self.clustering_active() {
            self.cluster.add(prim.object, &prim);
        } else {
            self.surface.attach_node(prim.object);
        }
        self.registry.register_node(prim);
    }

    fn attach_link(&mut self, mut prim: LinkPrimitive) {
        if self.clustering_active() {
            let object = prim.object;
            self.cluster.add(object, &ClusterableLine(&mut prim));
        } else {
            self.surface.attach_link(prim.object);
        }
        self.registry.register_link(prim);
    }

    // ------------------------------------------------------------------
    // Mode and base style

    /// Switch between flat and clustered overview. Existing primitives
    /// move between the surface and the cluster index; the registry is
    /// untouched, so nothing is duplicated or lost.
    pub fn set_overview(&mut self, overview: Overview) {
        self.overview = overview;
        if matches!(self.mode, ViewMode::Drilldown(_)) {
            return;
        }
        self.mode = ViewMode::Overview(overview);
        self.apply_mode();
    }

    /// Flip flat/clustered. Inside a drill-down this toggles clustering
    /// of the scoped view instead of leaving it.
    pub fn toggle_overview(&mut self) {
        if matches!(self.mode, ViewMode::Drilldown(_)) {
            self.drilldown_clustered = !self.drilldown_clustered;
            self.apply_mode();
            return;
        }
        let next = match self.overview {
            Overview::Flat => Overview::Clustered,
            Overview::Clustered => Overview::Flat,
        };
        self.set_overview(next);
    }

    pub fn overview(&self) -> Overview {
        self.overview
    }

    /// Re-attach every registered primitive to the layer the current
    /// mode calls for
    fn apply_mode(&mut self) {
        self.collapse_cluster();
        self.surface.detach_all();
        self.cluster.clear();

        let clustered = self.clustering_active();
        let Self {
            registry,
            surface,
            cluster,
            ..
        } = self;

        for node in registry.nodes() {
            if clustered {
                cluster.add(node.object, node);
            } else {
                surface.attach_node(node.object);
            }
        }
        for link in registry.links_mut() {
            let object = link.object;
            if clustered {
                cluster.add(object, &ClusterableLine(link));
            } else {
                surface.attach_link(object);
            }
        }
    }

    /// Swap the base linework style; overlays are unaffected
    pub fn switch_base_style(&mut self, style: BaseStyle) {
        self.surface.set_style(style);
    }

    pub fn cycle_base_style(&mut self) {
        self.switch_base_style(self.surface.style().next());
    }

    // ------------------------------------------------------------------
    // Cluster expansion

    /// Fan an expanded cluster's members out around its center. The
    /// positions go through each member's `Locatable`, so markers move
    /// and lines silently stay anchored.
    pub fn expand_cluster(&mut self, cluster: Cluster) {
        self.collapse_cluster();
        for (target, to) in self.cluster.spread(&cluster, self.viewport.zoom) {
            self.registry.relocate(target, to);
        }
        self.expanded = Some(cluster);
    }

    /// Restore fanned members to their indexed anchors
    pub fn collapse_cluster(&mut self) {
        if let Some(expanded) = self.expanded.take() {
            for member in expanded.members {
                if let Some(at) = self.cluster.anchor_of(member) {
                    self.registry.relocate(member, at);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Hit testing and activation

    /// Distance from (px, py) to the primitive, if within its hit radius
    fn primitive_distance(&self, target: ObjectRef, px: i32, py: i32) -> Option<f64> {
        match target.kind {
            ObjectKind::Device | ObjectKind::Site => {
                let node = self.registry.node(target)?;
                let (x, y) = self.viewport.project(node.location());
                let d = ((x - px) as f64).hypot((y - py) as f64);
                (d <= NODE_HIT_RADIUS).then_some(d)
            }
            ObjectKind::Link => {
                let link = self.registry.link(target)?;
                let a = self.viewport.project(link.endpoints.0);
                let b = self.viewport.project(link.endpoints.1);
                let d = point_segment_distance((px, py), a, b);
                (d <= LINK_HIT_RADIUS).then_some(d)
            }
        }
    }

    /// Find what is under the given braille-pixel position
    pub fn hit_test(&self, px: i32, py: i32) -> Option<Hit> {
        let mut best: Option<(f64, Hit)> = None;
        let mut consider = |d: f64, hit: Hit, best: &mut Option<(f64, Hit)>| {
            if best.as_ref().map_or(true, |(bd, _)| d < *bd) {
                *best = Some((d, hit));
            }
        };

        if self.clustering_active() {
            // Fanned members of the expanded cluster are hit at their
            // display positions
            if let Some(expanded) = &self.expanded {
                for &member in &expanded.members {
                    if let Some(d) = self.primitive_distance(member, px, py) {
                        consider(d, Hit::Primitive(member), &mut best);
                    }
                }
            }

            for cluster in self.cluster.clusters(self.viewport.zoom) {
                if cluster.is_singleton() {
                    let target = cluster.members[0];
                    if let Some(d) = self.primitive_distance(target, px, py) {
                        consider(d, Hit::Primitive(target), &mut best);
                    }
                } else {
                    let (x, y) = self.viewport.project(cluster.center);
                    let d = ((x - px) as f64).hypot((y - py) as f64);
                    if d <= NODE_HIT_RADIUS {
                        consider(d, Hit::Cluster(cluster), &mut best);
                    }
                }
            }
        } else {
            for &object in self.surface.attached_nodes() {
                if let Some(d) = self.primitive_distance(object, px, py) {
                    consider(d, Hit::Primitive(object), &mut best);
                }
            }
            for &object in self.surface.attached_links() {
                if let Some(d) = self.primitive_distance(object, px, py) {
                    consider(d, Hit::Primitive(object), &mut best);
                }
            }
        }

        best.map(|(_, hit)| hit)
    }

    /// Primary activation at a position: expand a cluster badge, open a
    /// detail view, or drill into a pool
    pub fn activate_at(&mut self, px: i32, py: i32) {
        match self.hit_test(px, py) {
            Some(Hit::Cluster(cluster)) => self.expand_cluster(cluster),
            Some(Hit::Primitive(target)) => self.activate(target),
            None => {}
        }
    }

    pub fn activate(&mut self, target: ObjectRef) {
        let action = match target.kind {
            ObjectKind::Link => self.registry.link(target).map(|l| l.primary),
            _ => self.registry.node(target).map(|n| n.primary),
        };
        match action {
            Some(Activation::EnterPool(id)) => self.enter_pool(id),
            Some(Activation::OpenDetail(object)) => self.chrome.open_detail(object),
            None => {}
        }
    }

    /// Secondary activation: hide all menus, show the one matching the
    /// object's kind, and record the object as the menu's target
    pub fn context_menu_at(&mut self, px: i32, py: i32, cell: (u16, u16)) {
        if let Some(Hit::Primitive(target)) = self.hit_test(px, py) {
            self.chrome.hide_menus();
            self.chrome.context_menu = Some((target.kind, cell));
            self.menu_cursor = 0;
            self.selected = Some(target);
        }
    }

    // ------------------------------------------------------------------
    // Context menu navigation

    pub fn menu_items(kind: ObjectKind) -> &'static [&'static str] {
        match kind {
            ObjectKind::Site => &["Enter pool", "Properties", "Center view"],
            ObjectKind::Device => &["Properties", "Center view"],
            ObjectKind::Link => &["Properties", "Center view"],
        }
    }

    pub fn menu_up(&mut self) {
        self.menu_cursor = self.menu_cursor.saturating_sub(1);
    }

    pub fn menu_down(&mut self) {
        if let Some((kind, _)) = self.chrome.context_menu {
            let max = Self::menu_items(kind).len() - 1;
            self.menu_cursor = (self.menu_cursor + 1).min(max);
        }
    }

    pub fn menu_choose(&mut self) {
        let Some((kind, _)) = self.chrome.context_menu else {
            return;
        };
        let Some(target) = self.selected else {
            return;
        };
        let items = Self::menu_items(kind);
        let item = items[self.menu_cursor.min(items.len() - 1)];
        self.chrome.context_menu = None;

        match item {
            "Enter pool" => self.enter_pool(target.id),
            "Properties" => self.chrome.open_detail(target),
            "Center view" => {
                if let Some(at) = self.primitive_location(target) {
                    self.viewport.center = at;
                }
            }
            _ => {}
        }
    }

    fn primitive_location(&self, target: ObjectRef) -> Option<GeoPoint> {
        match target.kind {
            ObjectKind::Link => self.registry.link(target).map(|l| l.anchor()),
            _ => self.registry.node(target).map(|n| n.location()),
        }
    }

    // ------------------------------------------------------------------
    // Viewport control (pan, zoom, mouse), as the event loop drives it

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.collapse_cluster();
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.collapse_cluster();
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        self.collapse_cluster();
        let (px, py) = Self::cell_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        self.collapse_cluster();
        let (px, py) = Self::cell_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Terminal cell to braille pixel, accounting for the border cell
    pub fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
        (
            (col.saturating_sub(1)) as i32 * 2,
            (row.saturating_sub(1)) as i32 * 4,
        )
    }

    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // Less sensitive when zoomed out
            let scale = if self.viewport.zoom < 2.0 {
                2
            } else if self.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in braille pixels, for hover hit-testing
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos
            .map(|(col, row)| Self::cell_to_pixel(col, row))
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ------------------------------------------------------------------
    // Status bar helpers

    pub fn zoom_label(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_label(&self) -> String {
        let c = self.viewport.center;
        format!(
            "{:.1}°{}, {:.1}°{}",
            c.lat.abs(),
            if c.lat >= 0.0 { "N" } else { "S" },
            c.lon.abs(),
            if c.lon >= 0.0 { "E" } else { "W" },
        )
    }

    pub fn mode_label(&self) -> String {
        match self.mode {
            ViewMode::Overview(Overview::Flat) => "flat".to_string(),
            ViewMode::Overview(Overview::Clustered) => "clustered".to_string(),
            ViewMode::Drilldown(id) => {
                let name = self
                    .pool_names
                    .get(&id)
                    .filter(|n| !n.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("pool {id}"));
                if self.drilldown_clustered {
                    format!("pool: {name} (clustered)")
                } else {
                    format!("pool: {name}")
                }
            }
        }
    }
}
