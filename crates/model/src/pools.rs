
use error::EngineError;

/// PoolIndex struct
/// A validated, zero-based index into one of the attribute pools. Built from the one-based
/// indices found in geometry files.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PoolIndex(usize);

impl PoolIndex {

    /// Convert a one-based file index. Zero and negative (relative) indices are not accepted.
    pub fn from_one_based(value: i64) -> Option<PoolIndex> {
        if value < 1 {
            return None;
        }
        usize::try_from(value - 1).ok().map(PoolIndex)
    }

    pub fn zero_based(&self) -> usize {
        self.0
    }
}

/// AttributePools struct
/// The three independently-indexed attribute sequences of a geometry file, in file order.
/// Lookups are bounds-checked and report which pool was overrun.
#[derive(Debug, Default)]
pub struct AttributePools {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>
}

impl AttributePools {

    pub fn push_position(&mut self, position: [f32; 3]) {
        self.positions.push(position);
    }

    pub fn push_tex_coord(&mut self, tex_coord: [f32; 2]) {
        self.tex_coords.push(tex_coord);
    }

    pub fn push_normal(&mut self, normal: [f32; 3]) {
        self.normals.push(normal);
    }

    pub fn position(&self, index: PoolIndex) -> Result<[f32; 3], EngineError> {
        Self::lookup(&self.positions, index, "position")
    }

    pub fn tex_coord(&self, index: PoolIndex) -> Result<[f32; 2], EngineError> {
        Self::lookup(&self.tex_coords, index, "texture coordinate")
    }

    pub fn normal(&self, index: PoolIndex) -> Result<[f32; 3], EngineError> {
        Self::lookup(&self.normals, index, "normal")
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn tex_coord_count(&self) -> usize {
        self.tex_coords.len()
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len()
    }

    fn lookup<T: Copy>(pool: &[T], index: PoolIndex, pool_name: &str) -> Result<T, EngineError> {
        pool.get(index.zero_based())
            .copied()
            .ok_or_else(|| EngineError::Malformed(format!(
                "{} index {} out of range ({} defined)",
                pool_name,
                index.zero_based() + 1,
                pool.len())))
    }
}
