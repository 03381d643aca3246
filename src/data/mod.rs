use crate::geo::GeoPoint;
use crate::map::basemap::{Basemap, LineString, Lod};
use anyhow::{bail, Context, Result};
use geojson::{GeoJson, Geometry, Value};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A device or pool as the inventory reports it. Coordinates are
/// optional: objects without them have no map position.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeObject {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl NodeObject {
    /// Map position, if the object has one
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

/// A link endpoint; links always carry concrete coordinates
#[derive(Debug, Clone, Deserialize)]
pub struct EndPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl EndPoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkObject {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subtype: String,
    pub source: EndPoint,
    pub destination: EndPoint,
}

/// A pool: a node-shaped object plus its membership id lists
#[derive(Debug, Clone, Deserialize)]
pub struct Pool {
    #[serde(flatten)]
    pub node: NodeObject,
    #[serde(default)]
    pub devices: Vec<u64>,
    #[serde(default)]
    pub links: Vec<u64>,
}

/// The whole inventory document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryDoc {
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub devices: Vec<NodeObject>,
    #[serde(default)]
    pub links: Vec<LinkObject>,
}

/// The devices and links that belong to one pool
#[derive(Debug, Clone, Default)]
pub struct PoolObjects {
    pub devices: Vec<NodeObject>,
    pub links: Vec<LinkObject>,
}

/// The fetch interface the map core consumes. Errors surface as-is;
/// the core neither retries nor intercepts them.
pub trait Inventory {
    /// All pools
    fn pools(&mut self) -> Result<Vec<Pool>>;
    /// Membership of one pool
    fn pool_objects(&mut self, pool_id: u64) -> Result<PoolObjects>;
}

/// Inventory backed by a single JSON document on disk
pub struct FileInventory {
    doc: InventoryDoc,
}

impl FileInventory {
    pub fn open(path: &Path) -> Result<Self> {
        let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let doc: InventoryDoc = simd_json::from_slice(&mut bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self { doc })
    }

    pub fn from_doc(doc: InventoryDoc) -> Self {
        Self { doc }
    }
}

impl Inventory for FileInventory {
    fn pools(&mut self) -> Result<Vec<Pool>> {
        Ok(self.doc.pools.clone())
    }

    fn pool_objects(&mut self, pool_id: u64) -> Result<PoolObjects> {
        let Some(pool) = self.doc.pools.iter().find(|p| p.node.id == pool_id) else {
            bail!("unknown pool {pool_id}");
        };

        // Member ids that resolve to nothing are silently skipped
        let devices = self
            .doc
            .devices
            .iter()
            .filter(|d| pool.devices.contains(&d.id))
            .cloned()
            .collect();
        let links = self
            .doc
            .links
            .iter()
            .filter(|l| pool.links.contains(&l.id))
            .cloned()
            .collect();

        Ok(PoolObjects { devices, links })
    }
}

/// Built-in inventory used when no data file is present
pub fn sample_inventory() -> FileInventory {
    fn device(id: u64, name: &str, subtype: &str, lat: f64, lon: f64) -> NodeObject {
        NodeObject {
            id,
            name: name.to_string(),
            subtype: subtype.to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    fn link(id: u64, name: &str, subtype: &str, a: (f64, f64), b: (f64, f64)) -> LinkObject {
        LinkObject {
            id,
            name: name.to_string(),
            subtype: subtype.to_string(),
            source: EndPoint {
                latitude: a.0,
                longitude: a.1,
            },
            destination: EndPoint {
                latitude: b.0,
                longitude: b.1,
            },
        }
    }

    fn pool(id: u64, name: &str, coord: Option<(f64, f64)>, devices: Vec<u64>, links: Vec<u64>) -> Pool {
        Pool {
            node: NodeObject {
                id,
                name: name.to_string(),
                subtype: String::new(),
                latitude: coord.map(|c| c.0),
                longitude: coord.map(|c| c.1),
            },
            devices,
            links,
        }
    }

    let devices = vec![
        device(1, "nyc-core-1", "router", 40.7, -74.0),
        device(2, "dc-edge-1", "firewall", 38.9, -77.0),
        device(3, "chi-agg-1", "switch", 41.9, -87.6),
        device(4, "lon-core-1", "router", 51.5, -0.1),
        device(5, "par-core-1", "router", 48.9, 2.3),
        device(6, "fra-srv-1", "server", 50.1, 8.7),
        device(7, "tyo-core-1", "router", 35.7, 139.7),
        device(8, "sin-agg-1", "switch", 1.3, 103.8),
        device(9, "syd-edge-1", "host", -33.9, 151.2),
    ];

    let links = vec![
        link(1, "nyc-dc", "ethernet_link", (40.7, -74.0), (38.9, -77.0)),
        link(2, "nyc-chi", "optical_link", (40.7, -74.0), (41.9, -87.6)),
        link(3, "lon-par", "optical_link", (51.5, -0.1), (48.9, 2.3)),
        link(4, "par-fra", "ethernet_link", (48.9, 2.3), (50.1, 8.7)),
        link(5, "tyo-sin", "optical_channel", (35.7, 139.7), (1.3, 103.8)),
        link(6, "sin-syd", "bgp_peering", (1.3, 103.8), (-33.9, 151.2)),
        link(7, "nyc-lon", "optical_channel", (40.7, -74.0), (51.5, -0.1)),
    ];

    let pools = vec![
        pool(1, "us-east", Some((40.0, -77.5)), vec![1, 2, 3], vec![1, 2]),
        pool(2, "eu-west", Some((49.5, 3.0)), vec![4, 5, 6], vec![3, 4]),
        pool(3, "apac", Some((10.0, 120.0)), vec![7, 8, 9], vec![5, 6]),
        // No coordinates: never shown on the sites view
        pool(4, "staging", None, vec![1, 4], vec![]),
    ];

    FileInventory::from_doc(InventoryDoc {
        pools,
        devices,
        links,
    })
}

/// Natural Earth exports the basemap loader looks for in the data dir
const BASEMAP_FILES: &[(&str, LayerKind, Lod)] = &[
    ("ne_110m_coastline.json", LayerKind::Coast, Lod::Low),
    ("ne_50m_coastline.json", LayerKind::Coast, Lod::Medium),
    ("ne_10m_coastline.json", LayerKind::Coast, Lod::High),
    ("ne_50m_borders.json", LayerKind::Border, Lod::Medium),
    ("ne_10m_borders.json", LayerKind::Border, Lod::High),
];

#[derive(Clone, Copy)]
enum LayerKind {
    Coast,
    Border,
}

/// Load whatever basemap GeoJSON is present in the data dir. Files are
/// parsed in parallel; a file that fails to parse is skipped with a
/// warning on stderr (the TUI has not started yet).
pub fn load_basemap(basemap: &mut Basemap, data_dir: &Path) {
    let loaded: Vec<(LayerKind, Lod, Vec<LineString>)> = BASEMAP_FILES
        .par_iter()
        .filter_map(|&(name, kind, lod)| {
            let path = data_dir.join(name);
            if !path.exists() {
                return None;
            }
            match load_linework(&path) {
                Ok(lines) => Some((kind, lod, lines)),
                Err(e) => {
                    eprintln!("warning: failed to load {name}: {e:#}");
                    None
                }
            }
        })
        .collect();

    for (kind, lod, lines) in loaded {
        for line in lines {
            match kind {
                LayerKind::Coast => basemap.add_coastline(line, lod),
                LayerKind::Border => basemap.add_border(line, lod),
            }
        }
    }
}

/// Extract line features from one GeoJSON file
fn load_linework(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;

    let mut lines = Vec::new();
    match &geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    collect_lines(geometry, &mut lines);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(geometry) = &f.geometry {
                collect_lines(geometry, &mut lines);
            }
        }
        GeoJson::Geometry(geometry) => collect_lines(geometry, &mut lines),
    }
    Ok(lines)
}

fn collect_lines(geometry: &Geometry, lines: &mut Vec<LineString>) {
    let to_line = |coords: &Vec<Vec<f64>>| coords.iter().map(|c| (c[0], c[1])).collect();

    match &geometry.value {
        Value::LineString(coords) => lines.push(to_line(coords)),
        Value::MultiLineString(parts) => lines.extend(parts.iter().map(to_line)),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                lines.push(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    lines.push(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_lines(g, lines);
            }
        }
        _ => {}
    }
}

/// Coarse continent outlines used when no basemap data is available
pub fn generate_simple_world(basemap: &mut Basemap) {
    let outlines: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-130.0, 55.0), (-124.0, 40.0), (-110.0, 25.0),
            (-97.0, 26.0), (-81.0, 25.0), (-75.0, 35.0), (-67.0, 45.0),
            (-55.0, 50.0), (-64.0, 60.0), (-95.0, 62.0), (-130.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-60.0, 5.0), (-35.0, -8.0), (-40.0, -22.0),
            (-58.0, -38.0), (-68.0, -50.0), (-75.0, -45.0), (-70.0, -18.0),
            (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (3.0, 40.0), (15.0, 45.0), (25.0, 37.0),
            (40.0, 45.0), (40.0, 55.0), (25.0, 65.0), (15.0, 70.0),
            (5.0, 60.0), (-8.0, 54.0), (-10.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 15.0), (-15.0, 28.0), (-5.0, 35.0), (20.0, 33.0),
            (35.0, 30.0), (42.0, 12.0), (50.0, 11.0), (35.0, -15.0),
            (28.0, -33.0), (18.0, -35.0), (11.0, -15.0), (8.0, 4.0),
            (-10.0, 5.0), (-17.0, 15.0),
        ],
        // Asia
        &[
            (40.0, 43.0), (55.0, 37.0), (60.0, 25.0), (72.0, 20.0),
            (80.0, 8.0), (90.0, 22.0), (105.0, 10.0), (118.0, 23.0),
            (122.0, 30.0), (135.0, 35.0), (142.0, 45.0), (140.0, 55.0),
            (120.0, 62.0), (90.0, 55.0), (60.0, 55.0), (40.0, 43.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (130.0, -12.0), (142.0, -11.0), (150.0, -25.0),
            (152.0, -33.0), (145.0, -38.0), (130.0, -32.0), (115.0, -34.0),
            (113.0, -25.0), (115.0, -20.0),
        ],
    ];

    for outline in outlines {
        basemap.add_coastline(outline.to_vec(), Lod::Low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> InventoryDoc {
        let mut bytes = doc.as_bytes().to_vec();
        simd_json::from_slice(&mut bytes).expect("valid inventory json")
    }

    #[test]
    fn test_parse_inventory_document() {
        let doc = parse(
            r#"{
              "pools": [
                {"id": 1, "name": "A", "latitude": 10.0, "longitude": 20.0,
                 "devices": [7], "links": []},
                {"id": 2, "name": "B", "latitude": null, "longitude": null}
              ],
              "devices": [
                {"id": 7, "name": "r1", "subtype": "router",
                 "latitude": 10.5, "longitude": 20.5}
              ],
              "links": [
                {"id": 3, "name": "l1", "subtype": "ethernet_link",
                 "source": {"latitude": 0.0, "longitude": 0.0},
                 "destination": {"latitude": 10.0, "longitude": 10.0}}
              ]
            }"#,
        );

        assert_eq!(doc.pools.len(), 2);
        assert_eq!(doc.pools[0].node.position(), Some(GeoPoint::new(10.0, 20.0)));
        assert_eq!(doc.pools[1].node.position(), None);
        assert_eq!(doc.devices[0].subtype, "router");
        assert_eq!(doc.links[0].source.position(), GeoPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_missing_fields_default() {
        let doc = parse(r#"{"pools": [{"id": 5}]}"#);
        let pool = &doc.pools[0];
        assert_eq!(pool.node.name, "");
        assert_eq!(pool.node.position(), None);
        assert!(pool.devices.is_empty());
        assert!(doc.devices.is_empty());
    }

    #[test]
    fn test_pool_objects_resolves_membership() {
        let mut inv = sample_inventory();
        let objects = inv.pool_objects(1).unwrap();
        assert_eq!(objects.devices.len(), 3);
        assert_eq!(objects.links.len(), 2);
        assert!(objects.devices.iter().any(|d| d.name == "nyc-core-1"));
    }

    #[test]
    fn test_pool_objects_skips_unresolvable_member_ids() {
        let mut inv = FileInventory::from_doc(InventoryDoc {
            pools: vec![Pool {
                node: NodeObject {
                    id: 1,
                    name: "p".into(),
                    subtype: String::new(),
                    latitude: None,
                    longitude: None,
                },
                devices: vec![999],
                links: vec![998],
            }],
            devices: vec![],
            links: vec![],
        });
        let objects = inv.pool_objects(1).unwrap();
        assert!(objects.devices.is_empty());
        assert!(objects.links.is_empty());
    }

    #[test]
    fn test_unknown_pool_is_an_error() {
        let mut inv = sample_inventory();
        assert!(inv.pool_objects(999).is_err());
    }

    #[test]
    fn test_sample_inventory_shape() {
        let mut inv = sample_inventory();
        let pools = inv.pools().unwrap();
        assert!(pools.iter().any(|p| p.node.position().is_none()));
        assert!(pools.iter().filter(|p| p.node.position().is_some()).count() >= 3);
    }
}
