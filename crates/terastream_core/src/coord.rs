//! # Coordinates and Regions
//!
//! Two coordinate spaces exist:
//! - **Voxel space** (`BlockPos`): one unit per voxel, unbounded.
//! - **Chunk space** (`ChunkCoord`): one unit per chunk of
//!   `CHUNK_SIZE_X x CHUNK_SIZE_Y x CHUNK_SIZE_Z` voxels.
//!
//! `ChunkCoord` orders lexicographically by `(x, y, z)`. That ordering is the
//! canonical lock order used whenever several chunks are locked together.

use std::fmt;

/// Chunk width in voxels.
pub const CHUNK_SIZE_X: usize = 32;

/// Chunk height in voxels.
pub const CHUNK_SIZE_Y: usize = 64;

/// Chunk depth in voxels.
pub const CHUNK_SIZE_Z: usize = 32;

/// Total voxels per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

/// Dimensions of a dense 3-D array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent3 {
    /// Size along X.
    pub x: usize,
    /// Size along Y.
    pub y: usize,
    /// Size along Z.
    pub z: usize,
}

impl Extent3 {
    /// Creates new dimensions.
    #[inline]
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Number of cells.
    #[inline]
    #[must_use]
    pub const fn volume(self) -> usize {
        self.x * self.y * self.z
    }

    /// Returns true if `(x, y, z)` lies inside `[0, x) x [0, y) x [0, z)`.
    #[inline]
    #[must_use]
    pub const fn contains(self, x: usize, y: usize, z: usize) -> bool {
        x < self.x && y < self.y && z < self.z
    }
}

impl fmt::Display for Extent3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned neighbour directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// +Y
    Top,
    /// -Y
    Bottom,
    /// -X
    Left,
    /// +X
    Right,
    /// -Z
    Front,
    /// +Z
    Back,
}

impl Side {
    /// All six sides.
    pub const ALL: [Self; 6] = [
        Self::Top,
        Self::Bottom,
        Self::Left,
        Self::Right,
        Self::Front,
        Self::Back,
    ];

    /// Unit offset of this side.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Top => (0, 1, 0),
            Self::Bottom => (0, -1, 0),
            Self::Left => (-1, 0, 0),
            Self::Right => (1, 0, 0),
            Self::Front => (0, 0, -1),
            Self::Back => (0, 0, 1),
        }
    }

    /// The opposite side.
    #[inline]
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// A voxel position in world (voxel) space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// The world origin.
    pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns this position translated by `(dx, dy, dz)`.
    #[inline]
    #[must_use]
    pub const fn add(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Returns the neighbour on the given side.
    #[inline]
    #[must_use]
    pub const fn adjacent(self, side: Side) -> Self {
        let (dx, dy, dz) = side.offset();
        self.add(dx, dy, dz)
    }

    /// The chunk containing this voxel.
    #[inline]
    #[must_use]
    pub const fn chunk(self) -> ChunkCoord {
        ChunkCoord::from_block_pos(self)
    }

    /// Position of this voxel inside its chunk.
    #[inline]
    #[must_use]
    pub const fn local(self) -> (usize, usize, usize) {
        (
            self.x.rem_euclid(CHUNK_SIZE_X as i32) as usize,
            self.y.rem_euclid(CHUNK_SIZE_Y as i32) as usize,
            self.z.rem_euclid(CHUNK_SIZE_Z as i32) as usize,
        )
    }

    /// 6-connected (Manhattan) distance to another position.
    #[inline]
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not voxels).
    pub x: i32,
    /// Y coordinate (in chunks, not voxels).
    pub y: i32,
    /// Z coordinate (in chunks, not voxels).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts a voxel position to the chunk containing it.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(pos: BlockPos) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE_X as i32),
            y: pos.y.div_euclid(CHUNK_SIZE_Y as i32),
            z: pos.z.div_euclid(CHUNK_SIZE_Z as i32),
        }
    }

    /// Voxel position of the chunk's minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin(self) -> BlockPos {
        BlockPos {
            x: self.x * CHUNK_SIZE_X as i32,
            y: self.y * CHUNK_SIZE_Y as i32,
            z: self.z * CHUNK_SIZE_Z as i32,
        }
    }

    /// Converts a local voxel position inside this chunk to world space.
    #[inline]
    #[must_use]
    pub const fn to_world(self, x: usize, y: usize, z: usize) -> BlockPos {
        self.origin().add(x as i32, y as i32, z as i32)
    }

    /// The voxel region covered by this chunk.
    #[must_use]
    pub const fn region(self) -> Region3 {
        let min = self.origin();
        Region3 {
            min,
            max: min.add(
                CHUNK_SIZE_X as i32 - 1,
                CHUNK_SIZE_Y as i32 - 1,
                CHUNK_SIZE_Z as i32 - 1,
            ),
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Axis-aligned voxel region with inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region3 {
    /// Minimum corner (inclusive).
    pub min: BlockPos,
    /// Maximum corner (inclusive).
    pub max: BlockPos,
}

impl Region3 {
    /// Creates a region from two corners in any order.
    #[must_use]
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// A cube of half-width `extent` centred on `center`.
    #[must_use]
    pub const fn from_center_extents(center: BlockPos, extent: i32) -> Self {
        Self {
            min: center.add(-extent, -extent, -extent),
            max: center.add(extent, extent, extent),
        }
    }

    /// A region holding exactly one voxel.
    #[must_use]
    pub const fn single(pos: BlockPos) -> Self {
        Self { min: pos, max: pos }
    }

    /// Returns true if `pos` lies inside the region.
    #[inline]
    #[must_use]
    pub const fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Grows the region by `amount` voxels in every direction.
    #[must_use]
    pub const fn expand(self, amount: i32) -> Self {
        Self {
            min: self.min.add(-amount, -amount, -amount),
            max: self.max.add(amount, amount, amount),
        }
    }

    /// Smallest region containing both this region and `pos`.
    #[must_use]
    pub fn expand_to_contain(self, pos: BlockPos) -> Self {
        Self {
            min: BlockPos::new(self.min.x.min(pos.x), self.min.y.min(pos.y), self.min.z.min(pos.z)),
            max: BlockPos::new(self.max.x.max(pos.x), self.max.y.max(pos.y), self.max.z.max(pos.z)),
        }
    }

    /// Smallest region containing both regions.
    #[must_use]
    pub fn encompassing(self, other: Self) -> Self {
        self.expand_to_contain(other.min).expand_to_contain(other.max)
    }

    /// Number of voxels in the region.
    #[must_use]
    pub const fn volume(&self) -> u64 {
        let dx = (self.max.x - self.min.x + 1) as u64;
        let dy = (self.max.y - self.min.y + 1) as u64;
        let dz = (self.max.z - self.min.z + 1) as u64;
        dx * dy * dz
    }

    /// Every chunk intersecting the region, in canonical ascending order.
    #[must_use]
    pub fn chunks(&self) -> Vec<ChunkCoord> {
        let lo = self.min.chunk();
        let hi = self.max.chunk();
        let mut coords = Vec::new();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    coords.push(ChunkCoord::new(x, y, z));
                }
            }
        }
        coords
    }

    /// Iterates every voxel position, X fastest, then Z, then Y.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> {
        let Self { min, max } = *self;
        (min.y..=max.y).flat_map(move |y| {
            (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| BlockPos::new(x, y, z)))
        })
    }
}

impl fmt::Display for Region3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}
