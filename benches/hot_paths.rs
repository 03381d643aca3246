use criterion::{black_box, criterion_group, criterion_main, Criterion};
use topomap::geo::GeoPoint;
use topomap::map::projection::Viewport;
use topomap::map::spatial::SpatialGrid;
use topomap::overlay::{ClusterIndex, Locatable, ObjectKind, ObjectRef};

struct At(GeoPoint);

impl Locatable for At {
    fn location(&self) -> GeoPoint {
        self.0
    }
    fn set_location(&mut self, to: GeoPoint) {
        self.0 = to;
    }
}

/// Deterministic world-spread positions (xorshift, no rand dependency)
fn positions(n: usize) -> Vec<GeoPoint> {
    let mut x = 0x9e3779b97f4a7c15u64;
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let lon = (x % 36000) as f64 / 100.0 - 180.0;
            let lat = ((x >> 16) % 17000) as f64 / 100.0 - 85.0;
            GeoPoint::new(lat, lon)
        })
        .collect()
}

fn bench_cluster_build(c: &mut Criterion) {
    let points = positions(5000);
    let mut index = ClusterIndex::new();
    for (i, p) in points.iter().enumerate() {
        index.add(ObjectRef::new(ObjectKind::Device, i as u64), &At(*p));
    }

    c.bench_function("clusters_5k_world", |b| {
        b.iter(|| black_box(index.clusters(black_box(1.0))))
    });
    c.bench_function("clusters_5k_regional", |b| {
        b.iter(|| black_box(index.clusters(black_box(20.0))))
    });
}

fn bench_spatial_query(c: &mut Criterion) {
    let points = positions(5000);
    let mut grid = SpatialGrid::new(4.0);
    for (i, p) in points.iter().enumerate() {
        grid.insert(p.lon, p.lat, i);
    }

    c.bench_function("query_radius_5k", |b| {
        b.iter(|| black_box(grid.query_radius(black_box(10.0), black_box(48.0), 8.0)))
    });
}

fn bench_project(c: &mut Criterion) {
    let points = positions(10_000);
    let viewport = Viewport::world(400, 200);

    c.bench_function("project_10k", |b| {
        b.iter(|| {
            let mut acc = 0i64;
            for p in &points {
                let (x, y) = viewport.project(*p);
                acc += (x + y) as i64;
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_cluster_build, bench_spatial_query, bench_project);
criterion_main!(benches);
