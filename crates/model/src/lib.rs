mod config;
mod geometry;
mod material;
mod pools;
mod tokens;
mod types;


pub use config::AssetConfig;
pub use geometry::{Geometry, GeometryParser};
pub use material::{MaterialDescription, MaterialParser};
pub use pools::{AttributePools, PoolIndex};
pub use types::{Face, MaterialData, StaticVertex};
