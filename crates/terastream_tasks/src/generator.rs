//! # Chunk Generators
//!
//! The seam where world generation plugs into the worker pool. Noise-based
//! terrain lives outside this workspace; [`FlatGenerator`] is the reference
//! world used by tests and tools.

use terastream_core::{
    BlockId, Chunk, ChunkCoord, CoreResult, LightField, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z,
    MAX_LIGHT,
};

/// Produces the initial contents of a chunk that was never stored.
pub trait ChunkGenerator: Send + Sync {
    /// Builds the chunk at `coord`.
    ///
    /// # Errors
    ///
    /// Any core error raised while filling the chunk.
    fn generate(&self, coord: ChunkCoord) -> CoreResult<Chunk>;
}

/// Flat world: solid below `height`, open sky above.
///
/// Voxels at or above `height` get full sunlight. Nothing below the surface
/// is lit, which is already the converged sunlight field for a flat world.
#[derive(Clone, Copy, Debug)]
pub struct FlatGenerator {
    /// First world Y that is air.
    pub height: i32,
    /// Block used below `height`.
    pub block: BlockId,
}

impl FlatGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new(height: i32, block: BlockId) -> Self {
        Self { height, block }
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate(&self, coord: ChunkCoord) -> CoreResult<Chunk> {
        let mut chunk = Chunk::new(coord);
        let bottom = coord.origin().y;
        let top = bottom + CHUNK_SIZE_Y as i32;

        if top <= self.height {
            chunk.fill_blocks(self.block);
        } else if bottom >= self.height {
            chunk.fill_value(LightField::Sunlight, MAX_LIGHT)?;
        } else {
            let solid_layers = (self.height - bottom) as usize;
            for y in 0..CHUNK_SIZE_Y {
                for z in 0..CHUNK_SIZE_Z {
                    for x in 0..CHUNK_SIZE_X {
                        if y < solid_layers {
                            chunk.set_block(x, y, z, self.block)?;
                        } else {
                            chunk.set_sunlight(x, y, z, MAX_LIGHT)?;
                        }
                    }
                }
            }
        }
        Ok(chunk)
    }
}
