pub mod basemap;
pub mod geometry;
pub mod projection;
pub mod spatial;

pub use basemap::{Basemap, BaseStyle, Lod, MapSurface};
pub use projection::Viewport;
