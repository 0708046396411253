//! # Chunk
//!
//! A chunk is a `32 x 64 x 32` block of voxels holding four per-voxel fields:
//!
//! | field    | width        | policy   |
//! |----------|--------------|----------|
//! | blocks   | 8 bits, grows| `Widen`  |
//! | light    | 4 bits       | `Reject` |
//! | sunlight | 4 bits       | `Reject` |
//! | liquid   | 4 bits, lazy | `Reject` |
//!
//! ## Binary Format
//!
//! ```text
//! [ChunkHeader: 24 bytes][blocks][light][sunlight][liquid?]
//! ```
//!
//! The header carries a CRC32 of everything after it. Each field is a
//! serialized [`PackedVoxelArray`].

use bytemuck::{Pod, Zeroable};

use crate::block::BlockId;
use crate::coord::{ChunkCoord, Extent3, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::error::{CoreError, CoreResult};
use crate::packed::{PackedVoxelArray, WidthPolicy};

/// Brightest light level.
pub const MAX_LIGHT: u8 = 15;

/// Width of the light, sunlight and liquid fields.
pub const LIGHT_BITS: u8 = 4;

/// Initial width of the block field.
pub const BLOCK_BITS: u8 = 8;

/// Dimensions of every chunk field.
pub const CHUNK_DIMS: Extent3 = Extent3::new(CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z);

const CHUNK_MAGIC: [u8; 4] = *b"TCHK";
const CHUNK_VERSION: u16 = 1;
const FLAG_LIQUID: u8 = 0b0000_0001;
const HEADER_SIZE: usize = std::mem::size_of::<ChunkHeader>();

/// Lifecycle of a chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkState {
    /// Blocks exist, lighting not yet computed.
    #[default]
    Generated = 0,
    /// Waiting for neighbours before lighting can run.
    LightPending = 1,
    /// Fully lit.
    Complete = 2,
}

impl ChunkState {
    /// Converts from u8.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Generated),
            1 => Some(Self::LightPending),
            2 => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Which light field an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightField {
    /// Block light from emitters.
    Light,
    /// Light from the sky.
    Sunlight,
}

/// Fixed-size header in front of every encoded chunk.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct ChunkHeader {
    magic: [u8; 4],
    version: u16,
    flags: u8,
    state: u8,
    x: i32,
    y: i32,
    z: i32,
    /// CRC32 of the payload following the header.
    checksum: u32,
}

/// A chunk of world data.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    blocks: PackedVoxelArray,
    light: PackedVoxelArray,
    sunlight: PackedVoxelArray,
    /// Created on the first non-zero liquid write.
    liquid: Option<PackedVoxelArray>,
    state: ChunkState,
    /// Set by every mutation, cleared once stored.
    dirty: bool,
    /// Bumped by every mutation. Not persisted.
    revision: u64,
}

fn light_array() -> PackedVoxelArray {
    PackedVoxelArray::new(CHUNK_DIMS, LIGHT_BITS, WidthPolicy::Reject)
}

fn check_bounds(x: usize, y: usize, z: usize) -> CoreResult<()> {
    if CHUNK_DIMS.contains(x, y, z) {
        Ok(())
    } else {
        Err(CoreError::OutOfRange {
            x,
            y,
            z,
            dims: CHUNK_DIMS,
        })
    }
}

impl Chunk {
    /// Creates an all-air, unlit chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: PackedVoxelArray::new(CHUNK_DIMS, BLOCK_BITS, WidthPolicy::Widen),
            light: light_array(),
            sunlight: light_array(),
            liquid: None,
            state: ChunkState::Generated,
            dirty: false,
            revision: 0,
        }
    }

    /// Chunk position.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    /// Moves the chunk to a new lifecycle state.
    pub fn set_state(&mut self, state: ChunkState) {
        if self.state != state {
            self.state = state;
            self.touch();
        }
    }

    /// Returns true if the chunk changed since it was last stored.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a successful store.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Mutation counter, for telling whether a snapshot is still current.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Clears the dirty flag only if nothing changed since `revision` was read.
    ///
    /// Returns true if the flag was cleared.
    pub fn mark_clean_at(&mut self, revision: u64) -> bool {
        if self.revision == revision {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    #[inline]
    fn touch(&mut self) {
        self.dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Block at local coordinates.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk.
    #[inline]
    pub fn block(&self, x: usize, y: usize, z: usize) -> CoreResult<BlockId> {
        self.blocks.get(x, y, z).map(BlockId)
    }

    /// Sets a block and returns the previous one.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) -> CoreResult<BlockId> {
        let previous = self.blocks.set(x, y, z, block.0)?;
        self.touch();
        Ok(BlockId(previous))
    }

    /// Sets every voxel to `block`.
    pub fn fill_blocks(&mut self, block: BlockId) {
        // Widen policy never rejects
        if self.blocks.fill(block.0).is_ok() {
            self.touch();
        }
    }

    /// Block light at local coordinates.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk.
    #[inline]
    pub fn light(&self, x: usize, y: usize, z: usize) -> CoreResult<u8> {
        self.value(LightField::Light, x, y, z)
    }

    /// Sets block light and returns the previous level.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk, `ValueTooWide` above `MAX_LIGHT`.
    #[inline]
    pub fn set_light(&mut self, x: usize, y: usize, z: usize, value: u8) -> CoreResult<u8> {
        self.set_value(LightField::Light, x, y, z, value)
    }

    /// Sunlight at local coordinates.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk.
    #[inline]
    pub fn sunlight(&self, x: usize, y: usize, z: usize) -> CoreResult<u8> {
        self.value(LightField::Sunlight, x, y, z)
    }

    /// Sets sunlight and returns the previous level.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk, `ValueTooWide` above `MAX_LIGHT`.
    #[inline]
    pub fn set_sunlight(&mut self, x: usize, y: usize, z: usize, value: u8) -> CoreResult<u8> {
        self.set_value(LightField::Sunlight, x, y, z, value)
    }

    /// Reads one of the light fields.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk.
    #[inline]
    pub fn value(&self, field: LightField, x: usize, y: usize, z: usize) -> CoreResult<u8> {
        self.field(field).get(x, y, z).map(|v| v as u8)
    }

    /// Writes one of the light fields and returns the previous level.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk, `ValueTooWide` above `MAX_LIGHT`.
    pub fn set_value(
        &mut self,
        field: LightField,
        x: usize,
        y: usize,
        z: usize,
        value: u8,
    ) -> CoreResult<u8> {
        let array = match field {
            LightField::Light => &mut self.light,
            LightField::Sunlight => &mut self.sunlight,
        };
        let previous = array.set(x, y, z, u16::from(value))?;
        self.touch();
        Ok(previous as u8)
    }

    /// Sets an entire light field to one level.
    ///
    /// # Errors
    ///
    /// `ValueTooWide` above `MAX_LIGHT`.
    pub fn fill_value(&mut self, field: LightField, value: u8) -> CoreResult<()> {
        let array = match field {
            LightField::Light => &mut self.light,
            LightField::Sunlight => &mut self.sunlight,
        };
        array.fill(u16::from(value))?;
        self.touch();
        Ok(())
    }

    #[inline]
    fn field(&self, field: LightField) -> &PackedVoxelArray {
        match field {
            LightField::Light => &self.light,
            LightField::Sunlight => &self.sunlight,
        }
    }

    /// Liquid level at local coordinates. Zero when the chunk has no liquid.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk.
    pub fn liquid(&self, x: usize, y: usize, z: usize) -> CoreResult<u8> {
        match &self.liquid {
            Some(array) => array.get(x, y, z).map(|v| v as u8),
            None => check_bounds(x, y, z).map(|()| 0),
        }
    }

    /// Sets a liquid level and returns the previous one.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside the chunk, `ValueTooWide` above `MAX_LIGHT`.
    pub fn set_liquid(&mut self, x: usize, y: usize, z: usize, value: u8) -> CoreResult<u8> {
        if self.liquid.is_none() {
            check_bounds(x, y, z)?;
            if value == 0 {
                return Ok(0);
            }
        }
        let array = self.liquid.get_or_insert_with(light_array);
        let previous = array.set(x, y, z, u16::from(value))?;
        self.touch();
        Ok(previous as u8)
    }

    /// Returns true once a liquid field exists.
    #[must_use]
    pub const fn has_liquid(&self) -> bool {
        self.liquid.is_some()
    }

    /// Compacts every field and drops an all-dry liquid field.
    ///
    /// Values are unchanged, so the dirty flag is left alone.
    pub fn deflate(&mut self) {
        let before = self.footprint();
        self.blocks.compact();
        self.light.compact();
        self.sunlight.compact();
        if let Some(liquid) = &mut self.liquid {
            liquid.compact();
            if liquid.is_uniform() && liquid.values().next() == Some(0) {
                self.liquid = None;
            }
        }
        tracing::debug!(
            coord = %self.coord,
            before,
            after = self.footprint(),
            "deflated chunk"
        );
    }

    /// Approximate in-memory size in bytes.
    #[must_use]
    pub fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.blocks.footprint()
            + self.light.footprint()
            + self.sunlight.footprint()
            + self.liquid.as_ref().map_or(0, PackedVoxelArray::footprint)
    }

    /// Serializes the chunk.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(
            self.blocks.serialized_len()
                + self.light.serialized_len()
                + self.sunlight.serialized_len()
                + self.liquid.as_ref().map_or(0, PackedVoxelArray::serialized_len),
        );
        self.blocks.write_to(&mut payload);
        self.light.write_to(&mut payload);
        self.sunlight.write_to(&mut payload);
        if let Some(liquid) = &self.liquid {
            liquid.write_to(&mut payload);
        }

        let header = ChunkHeader {
            magic: CHUNK_MAGIC,
            version: CHUNK_VERSION.to_le(),
            flags: if self.liquid.is_some() { FLAG_LIQUID } else { 0 },
            state: self.state as u8,
            x: self.coord.x.to_le(),
            y: self.coord.y.to_le(),
            z: self.coord.z.to_le(),
            checksum: crc32fast::hash(&payload).to_le(),
        };

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(&payload);
        out
    }

    /// Deserializes a chunk produced by [`encode`](Self::encode).
    ///
    /// The decoded chunk is clean.
    ///
    /// # Errors
    ///
    /// `CorruptData` on a bad header, checksum mismatch, malformed field or
    /// trailing bytes.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::CorruptData(format!(
                "chunk too short: {} bytes",
                bytes.len()
            )));
        }
        let header: ChunkHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
        if header.magic != CHUNK_MAGIC {
            return Err(CoreError::CorruptData("bad chunk magic".to_string()));
        }
        let version = u16::from_le(header.version);
        if version != CHUNK_VERSION {
            return Err(CoreError::CorruptData(format!(
                "unsupported chunk version {version}"
            )));
        }
        let state = ChunkState::from_u8(header.state)
            .ok_or_else(|| CoreError::CorruptData(format!("unknown chunk state {}", header.state)))?;

        let payload = &bytes[HEADER_SIZE..];
        let expected = u32::from_le(header.checksum);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(CoreError::CorruptData(format!(
                "checksum mismatch: stored {expected:08x}, computed {actual:08x}"
            )));
        }

        let mut reader = payload;
        let blocks = PackedVoxelArray::deserialize(&mut reader, Some(CHUNK_DIMS))?;
        let light = read_light_field(&mut reader)?;
        let sunlight = read_light_field(&mut reader)?;
        let liquid = if header.flags & FLAG_LIQUID != 0 {
            Some(read_light_field(&mut reader)?)
        } else {
            None
        };
        if !reader.is_empty() {
            return Err(CoreError::CorruptData(format!(
                "{} trailing bytes after chunk",
                reader.len()
            )));
        }

        Ok(Self {
            coord: ChunkCoord::new(
                i32::from_le(header.x),
                i32::from_le(header.y),
                i32::from_le(header.z),
            ),
            blocks,
            light,
            sunlight,
            liquid,
            state,
            dirty: false,
            revision: 0,
        })
    }
}

fn read_light_field(reader: &mut &[u8]) -> CoreResult<PackedVoxelArray> {
    let array = PackedVoxelArray::deserialize(reader, Some(CHUNK_DIMS))?;
    if array.bits() != LIGHT_BITS || array.policy() != WidthPolicy::Reject {
        return Err(CoreError::CorruptData(format!(
            "light field stored at {} bits",
            array.bits()
        )));
    }
    Ok(array)
}

/// Content equality. The dirty flag is bookkeeping and is ignored.
impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
            && self.state == other.state
            && self.blocks == other.blocks
            && self.light == other.light
            && self.sunlight == other.sunlight
            && self.liquid == other.liquid
    }
}

impl Eq for Chunk {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        let mut chunk = Chunk::new(ChunkCoord::new(-3, 1, 7));
        chunk.set_block(0, 0, 0, BlockId(1)).unwrap();
        chunk.set_block(31, 63, 31, BlockId(600)).unwrap();
        chunk.set_light(4, 5, 6, 15).unwrap();
        chunk.set_sunlight(10, 63, 10, 12).unwrap();
        chunk.set_state(ChunkState::Complete);
        chunk
    }

    #[test]
    fn test_new_chunk_is_air_and_dark() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        assert_eq!(chunk.block(5, 5, 5).unwrap(), BlockId::AIR);
        assert_eq!(chunk.light(5, 5, 5).unwrap(), 0);
        assert_eq!(chunk.sunlight(5, 5, 5).unwrap(), 0);
        assert_eq!(chunk.liquid(5, 5, 5).unwrap(), 0);
        assert_eq!(chunk.state(), ChunkState::Generated);
        assert!(!chunk.is_dirty());
        assert!(!chunk.has_liquid());
    }

    #[test]
    fn test_mutation_marks_dirty() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        chunk.set_light(1, 1, 1, 3).unwrap();
        assert!(chunk.is_dirty());
        chunk.mark_clean();
        chunk.set_block(1, 1, 1, BlockId(2)).unwrap();
        assert!(chunk.is_dirty());
    }

    #[test]
    fn test_mark_clean_at_stale_revision_keeps_dirty() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        chunk.set_block(0, 0, 0, BlockId(1)).unwrap();
        let snapshot = chunk.revision();

        chunk.set_sunlight(0, 5, 0, 9).unwrap();
        assert!(!chunk.mark_clean_at(snapshot));
        assert!(chunk.is_dirty());

        assert!(chunk.mark_clean_at(chunk.revision()));
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_light_above_max_rejected() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        assert!(matches!(
            chunk.set_light(0, 0, 0, 16),
            Err(CoreError::ValueTooWide { value: 16, bits: 4 })
        ));
        assert_eq!(chunk.light(0, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_on_every_field() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        assert!(chunk.block(32, 0, 0).is_err());
        assert!(chunk.light(0, 64, 0).is_err());
        assert!(chunk.sunlight(0, 0, 32).is_err());
        assert!(chunk.liquid(0, 64, 0).is_err());
        assert!(chunk.set_liquid(0, 0, 32, 0).is_err());
        assert!(chunk.set_block(0, 64, 0, BlockId(1)).is_err());
    }

    #[test]
    fn test_liquid_is_lazy() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        chunk.set_liquid(2, 2, 2, 0).unwrap();
        assert!(!chunk.has_liquid());
        chunk.set_liquid(2, 2, 2, 7).unwrap();
        assert!(chunk.has_liquid());
        assert_eq!(chunk.liquid(2, 2, 2).unwrap(), 7);

        chunk.set_liquid(2, 2, 2, 0).unwrap();
        chunk.deflate();
        assert!(!chunk.has_liquid());
    }

    #[test]
    fn test_deflate_preserves_values() {
        let mut chunk = sample_chunk();
        let before = chunk.clone();
        chunk.set_block(31, 63, 31, BlockId(1)).unwrap();
        chunk.set_block(31, 63, 31, BlockId(600)).unwrap();
        chunk.deflate();
        assert_eq!(chunk, before);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut chunk = sample_chunk();
        chunk.set_liquid(3, 3, 3, 9).unwrap();
        let decoded = Chunk::decode(&chunk.encode()).unwrap();
        assert_eq!(decoded, chunk);
        assert_eq!(decoded.coord(), ChunkCoord::new(-3, 1, 7));
        assert_eq!(decoded.block(31, 63, 31).unwrap(), BlockId(600));
        assert!(!decoded.is_dirty());
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let bytes = sample_chunk().encode();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(Chunk::decode(&bad_magic).is_err());

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0xFF;
        assert!(matches!(Chunk::decode(&flipped), Err(CoreError::CorruptData(_))));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(Chunk::decode(&trailing).is_err());

        assert!(Chunk::decode(&bytes[..10]).is_err());
    }
}
