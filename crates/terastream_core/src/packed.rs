//! # Packed Voxel Array
//!
//! Dense 3-D array of small unsigned integers, bit-packed at the narrowest
//! width that holds the values in use.
//!
//! ## Layout
//!
//! ```text
//! index      = ((y * Sz) + z) * Sx + x
//! bit offset = index * bits
//! ```
//!
//! Cells are packed LSB-first into a byte buffer. With odd widths (3, 5, 7,
//! 9..) a cell may straddle two or three bytes, so every access works on a
//! 24-bit little-endian window. The buffer carries two padding bytes so the
//! window never runs past the end.
//!
//! ## Width Policy
//!
//! Writing a value wider than the current width is never silent:
//! - [`WidthPolicy::Widen`] re-encodes every cell at the new width first
//! - [`WidthPolicy::Reject`] fails with [`CoreError::ValueTooWide`]
//!
//! ## Homogeneous Arrays
//!
//! A freshly created or `fill`ed array holds a single value and no buffer.
//! The first differing `set` inflates it. Callers never observe the switch.

use std::io::{self, Read, Write};

use crate::coord::Extent3;
use crate::error::{CoreError, CoreResult};

/// Widest supported cell width in bits.
pub const MAX_BITS: u8 = 16;

/// Slack after the payload so a 3-byte window read is always in bounds.
const PADDING: usize = 2;

/// Serialized header: tag, bits, base bits, policy, three u32 dimensions.
const HEADER_LEN: usize = 16;

const TAG_UNIFORM: u8 = 0;
const TAG_PACKED: u8 = 1;

/// What happens when a value does not fit the current width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WidthPolicy {
    /// Transparently re-encode at the minimal width holding the new value.
    Widen = 0,
    /// Refuse the write with `ValueTooWide`.
    Reject = 1,
}

impl WidthPolicy {
    /// Converts from u8.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Widen),
            1 => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Minimal bit width able to hold `value` (at least 1).
#[inline]
#[must_use]
pub const fn bits_for(value: u16) -> u8 {
    if value == 0 {
        1
    } else {
        (u16::BITS - value.leading_zeros()) as u8
    }
}

#[inline]
const fn mask(bits: u8) -> u32 {
    (1u32 << bits) - 1
}

#[inline]
fn payload_len(dims: Extent3, bits: u8) -> usize {
    (dims.volume() * usize::from(bits)).div_ceil(8)
}

fn alloc(dims: Extent3, bits: u8) -> Box<[u8]> {
    vec![0u8; payload_len(dims, bits) + PADDING].into_boxed_slice()
}

#[inline]
fn read_cell(data: &[u8], bits: u8, index: usize) -> u16 {
    let bit = index * usize::from(bits);
    let byte = bit >> 3;
    let shift = bit & 7;
    let window =
        u32::from(data[byte]) | u32::from(data[byte + 1]) << 8 | u32::from(data[byte + 2]) << 16;
    ((window >> shift) & mask(bits)) as u16
}

#[inline]
fn write_cell(data: &mut [u8], bits: u8, index: usize, value: u16) {
    let bit = index * usize::from(bits);
    let byte = bit >> 3;
    let shift = bit & 7;
    let cell_mask = mask(bits) << shift;
    let mut window =
        u32::from(data[byte]) | u32::from(data[byte + 1]) << 8 | u32::from(data[byte + 2]) << 16;
    window = (window & !cell_mask) | ((u32::from(value) << shift) & cell_mask);
    data[byte] = window as u8;
    data[byte + 1] = (window >> 8) as u8;
    data[byte + 2] = (window >> 16) as u8;
}

fn repack(old: &[u8], old_bits: u8, new_bits: u8, volume: usize, dims: Extent3) -> Box<[u8]> {
    let mut data = alloc(dims, new_bits);
    for index in 0..volume {
        write_cell(&mut data, new_bits, index, read_cell(old, old_bits, index));
    }
    data
}

fn inflate(dims: Extent3, bits: u8, value: u16) -> Box<[u8]> {
    let mut data = alloc(dims, bits);
    if value != 0 {
        for index in 0..dims.volume() {
            write_cell(&mut data, bits, index, value);
        }
    }
    data
}

#[derive(Clone, Debug)]
enum Storage {
    /// Every cell holds this value.
    Uniform(u16),
    /// Bit-packed cells plus `PADDING` trailing bytes.
    Packed(Box<[u8]>),
}

/// Bit-packed dense voxel array ("tera array").
///
/// Not internally synchronized. The owning chunk's lock guards it.
#[derive(Clone, Debug)]
pub struct PackedVoxelArray {
    dims: Extent3,
    /// Current cell width.
    bits: u8,
    /// Width the array was created with. `compact` never narrows below it.
    base_bits: u8,
    policy: WidthPolicy,
    storage: Storage,
}

impl PackedVoxelArray {
    /// Creates a zero-filled array.
    ///
    /// `bits` is clamped to `1..=MAX_BITS`.
    ///
    /// # Panics
    ///
    /// If any dimension exceeds `u32::MAX`, the widest the serialized header holds.
    #[must_use]
    pub fn new(dims: Extent3, bits: u8, policy: WidthPolicy) -> Self {
        assert!(
            u32::try_from(dims.x.max(dims.y).max(dims.z)).is_ok(),
            "array dimensions {dims} exceed the u32 header range"
        );
        let bits = bits.clamp(1, MAX_BITS);
        Self {
            dims,
            bits,
            base_bits: bits,
            policy,
            storage: Storage::Uniform(0),
        }
    }

    /// Creates an array with every cell set to `value`.
    ///
    /// # Errors
    ///
    /// `ValueTooWide` if `value` does not fit and the policy is `Reject`.
    pub fn uniform(dims: Extent3, bits: u8, value: u16, policy: WidthPolicy) -> CoreResult<Self> {
        let mut array = Self::new(dims, bits, policy);
        array.fill(value)?;
        Ok(array)
    }

    /// Array dimensions.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> Extent3 {
        self.dims
    }

    /// Current cell width in bits.
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Width policy chosen at construction.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> WidthPolicy {
        self.policy
    }

    /// Returns true while the homogeneous representation is active.
    #[inline]
    #[must_use]
    pub const fn is_uniform(&self) -> bool {
        matches!(self.storage, Storage::Uniform(_))
    }

    /// Largest value storable at the current width.
    #[inline]
    #[must_use]
    pub const fn max_value(&self) -> u16 {
        mask(self.bits) as u16
    }

    /// Approximate heap + inline footprint in bytes.
    #[must_use]
    pub fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + match &self.storage {
                Storage::Uniform(_) => 0,
                Storage::Packed(data) => data.len(),
            }
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> CoreResult<usize> {
        if self.dims.contains(x, y, z) {
            Ok(((y * self.dims.z) + z) * self.dims.x + x)
        } else {
            Err(CoreError::OutOfRange {
                x,
                y,
                z,
                dims: self.dims,
            })
        }
    }

    #[inline]
    fn get_index(&self, index: usize) -> u16 {
        match &self.storage {
            Storage::Uniform(value) => *value,
            Storage::Packed(data) => read_cell(data, self.bits, index),
        }
    }

    /// Reads the cell at `(x, y, z)`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if the coordinate lies outside the array.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> CoreResult<u16> {
        self.index(x, y, z).map(|index| self.get_index(index))
    }

    /// Writes the cell at `(x, y, z)` and returns its previous value.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if the coordinate lies outside the array
    /// - `ValueTooWide` if the value does not fit and the policy is `Reject`
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u16) -> CoreResult<u16> {
        let index = self.index(x, y, z)?;
        let previous = self.get_index(index);
        if previous == value {
            return Ok(previous);
        }
        self.ensure_fits(value)?;

        if let Storage::Uniform(fill) = self.storage {
            self.storage = Storage::Packed(inflate(self.dims, self.bits, fill));
        }
        if let Storage::Packed(data) = &mut self.storage {
            write_cell(data, self.bits, index, value);
        }
        Ok(previous)
    }

    /// Sets every cell to `value`, dropping the packed buffer.
    ///
    /// # Errors
    ///
    /// `ValueTooWide` if the value does not fit and the policy is `Reject`.
    pub fn fill(&mut self, value: u16) -> CoreResult<()> {
        self.ensure_fits(value)?;
        self.storage = Storage::Uniform(value);
        Ok(())
    }

    fn ensure_fits(&mut self, value: u16) -> CoreResult<()> {
        let needed = bits_for(value);
        if needed <= self.bits {
            return Ok(());
        }
        match self.policy {
            WidthPolicy::Reject => Err(CoreError::ValueTooWide {
                value,
                bits: self.bits,
            }),
            WidthPolicy::Widen => {
                tracing::debug!(from = self.bits, to = needed, "widening packed voxel array");
                self.reencode(needed);
                Ok(())
            }
        }
    }

    fn reencode(&mut self, new_bits: u8) {
        let repacked = match &self.storage {
            Storage::Packed(old) => Some(repack(
                old,
                self.bits,
                new_bits,
                self.dims.volume(),
                self.dims,
            )),
            Storage::Uniform(_) => None,
        };
        if let Some(data) = repacked {
            self.storage = Storage::Packed(data);
        }
        self.bits = new_bits;
    }

    /// Runtime deflation.
    ///
    /// Collapses a homogeneous array to the uniform representation, otherwise
    /// narrows to the smallest width (not below the construction width) that
    /// still holds every stored value.
    pub fn compact(&mut self) {
        let Storage::Packed(data) = &self.storage else {
            return;
        };
        let volume = self.dims.volume();
        if volume == 0 {
            return;
        }

        let first = read_cell(data, self.bits, 0);
        let mut homogeneous = true;
        let mut max = first;
        for index in 1..volume {
            let value = read_cell(data, self.bits, index);
            homogeneous &= value == first;
            max = max.max(value);
        }

        if homogeneous {
            self.storage = Storage::Uniform(first);
            self.bits = self.base_bits.max(bits_for(first));
            return;
        }
        let target = self.base_bits.max(bits_for(max));
        if target < self.bits {
            self.reencode(target);
        }
    }

    /// Iterates every cell in addressing order.
    pub fn values(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.dims.volume()).map(move |index| self.get_index(index))
    }

    /// Number of bytes `write_to` produces.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        HEADER_LEN
            + match self.storage {
                Storage::Uniform(_) => 2,
                Storage::Packed(_) => payload_len(self.dims, self.bits),
            }
    }

    /// Appends the serialized form to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let tag = match self.storage {
            Storage::Uniform(_) => TAG_UNIFORM,
            Storage::Packed(_) => TAG_PACKED,
        };
        out.reserve(self.serialized_len());
        out.extend_from_slice(&[tag, self.bits, self.base_bits, self.policy as u8]);
        for dim in [self.dims.x, self.dims.y, self.dims.z] {
            out.extend_from_slice(&(dim as u32).to_le_bytes());
        }
        match &self.storage {
            Storage::Uniform(value) => out.extend_from_slice(&value.to_le_bytes()),
            Storage::Packed(data) => {
                out.extend_from_slice(&data[..payload_len(self.dims, self.bits)]);
            }
        }
    }

    /// Writes the serialized form through any byte sink.
    ///
    /// # Errors
    ///
    /// Propagates the writer's I/O error.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(self.serialized_len());
        self.write_to(&mut buf);
        writer.write_all(&buf)
    }

    /// Reads an array written by [`serialize`](Self::serialize).
    ///
    /// When `expected` is given the stored dimensions must match it.
    ///
    /// # Errors
    ///
    /// `CorruptData` on truncated input or any inconsistent header field.
    pub fn deserialize<R: Read>(reader: &mut R, expected: Option<Extent3>) -> CoreResult<Self> {
        let mut header = [0u8; HEADER_LEN];
        read_exact(reader, &mut header, "array header")?;

        let [tag, bits, base_bits, policy, ..] = header;
        if !(1..=MAX_BITS).contains(&bits) || base_bits == 0 || base_bits > bits {
            return Err(CoreError::CorruptData(format!(
                "invalid bit widths {bits}/{base_bits}"
            )));
        }
        let policy = WidthPolicy::from_u8(policy)
            .ok_or_else(|| CoreError::CorruptData(format!("unknown width policy {policy}")))?;

        let dim = |at: usize| {
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]) as usize
        };
        let dims = Extent3::new(dim(4), dim(8), dim(12));
        let bit_volume = dims
            .x
            .checked_mul(dims.y)
            .and_then(|v| v.checked_mul(dims.z))
            .and_then(|v| v.checked_mul(usize::from(MAX_BITS)));
        if bit_volume.is_none() {
            return Err(CoreError::CorruptData(format!("dimensions {dims} overflow")));
        }
        if dims.volume() == 0 {
            return Err(CoreError::CorruptData(format!("empty dimensions {dims}")));
        }
        if let Some(expected) = expected {
            if expected != dims {
                return Err(CoreError::CorruptData(format!(
                    "dimensions {dims} do not match expected {expected}"
                )));
            }
        }

        let storage = match tag {
            TAG_UNIFORM => {
                let mut raw = [0u8; 2];
                read_exact(reader, &mut raw, "uniform value")?;
                let value = u16::from_le_bytes(raw);
                if bits_for(value) > bits {
                    return Err(CoreError::CorruptData(format!(
                        "uniform value {value} wider than {bits} bits"
                    )));
                }
                Storage::Uniform(value)
            }
            TAG_PACKED => {
                // Grows with the input, so a lying header cannot force a huge allocation
                let len = payload_len(dims, bits);
                let mut data = Vec::new();
                reader
                    .take(len as u64)
                    .read_to_end(&mut data)
                    .map_err(|e| CoreError::CorruptData(format!("unreadable packed payload: {e}")))?;
                if data.len() != len {
                    return Err(CoreError::CorruptData(format!(
                        "truncated packed payload: {} of {len} bytes",
                        data.len()
                    )));
                }
                data.resize(len + PADDING, 0);
                Storage::Packed(data.into_boxed_slice())
            }
            other => {
                return Err(CoreError::CorruptData(format!("unknown array tag {other}")));
            }
        };

        Ok(Self {
            dims,
            bits,
            base_bits,
            policy,
            storage,
        })
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> CoreResult<()> {
    reader
        .read_exact(buf)
        .map_err(|e| CoreError::CorruptData(format!("truncated {what}: {e}")))
}

/// Cell-wise equality: representation and width do not matter.
impl PartialEq for PackedVoxelArray {
    fn eq(&self, other: &Self) -> bool {
        if self.dims != other.dims {
            return false;
        }
        match (&self.storage, &other.storage) {
            (Storage::Uniform(a), Storage::Uniform(b)) => a == b,
            _ => self.values().eq(other.values()),
        }
    }
}

impl Eq for PackedVoxelArray {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    const DIMS: Extent3 = Extent3::new(16, 8, 16);

    fn random_cell(rng: &mut StdRng) -> (usize, usize, usize) {
        (rng.gen_range(0..16), rng.gen_range(0..8), rng.gen_range(0..16))
    }

    #[test]
    fn test_bits_for() {
        assert_eq!(bits_for(0), 1);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(15), 4);
        assert_eq!(bits_for(16), 5);
        assert_eq!(bits_for(255), 8);
        assert_eq!(bits_for(u16::MAX), 16);
    }

    #[test]
    fn test_set_returns_previous() {
        let mut array = PackedVoxelArray::new(DIMS, 4, WidthPolicy::Reject);
        assert_eq!(array.set(1, 2, 3, 9).unwrap(), 0);
        assert_eq!(array.set(1, 2, 3, 4).unwrap(), 9);
        assert_eq!(array.get(1, 2, 3).unwrap(), 4);
        assert_eq!(array.get(0, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_each_axis() {
        let mut array = PackedVoxelArray::new(DIMS, 4, WidthPolicy::Reject);
        for (x, y, z) in [(16, 0, 0), (0, 8, 0), (0, 0, 16)] {
            assert!(matches!(array.get(x, y, z), Err(CoreError::OutOfRange { .. })));
            assert!(matches!(array.set(x, y, z, 1), Err(CoreError::OutOfRange { .. })));
        }
        assert!(array.get(15, 7, 15).is_ok());
    }

    #[test]
    fn test_reject_policy_leaves_array_untouched() {
        let mut array = PackedVoxelArray::new(DIMS, 4, WidthPolicy::Reject);
        array.set(3, 3, 3, 15).unwrap();
        let err = array.set(3, 3, 3, 16).unwrap_err();
        assert_eq!(err, CoreError::ValueTooWide { value: 16, bits: 4 });
        assert_eq!(array.get(3, 3, 3).unwrap(), 15);
        assert_eq!(array.bits(), 4);
        assert!(array.fill(200).is_err());
    }

    #[test]
    fn test_widening_preserves_previous_values() {
        let mut array = PackedVoxelArray::new(DIMS, 4, WidthPolicy::Widen);
        let mut rng = StdRng::seed_from_u64(7);
        let mut model = HashMap::new();
        for _ in 0..500 {
            let (x, y, z) = random_cell(&mut rng);
            let value = rng.gen_range(0..16u16);
            array.set(x, y, z, value).unwrap();
            model.insert((x, y, z), value);
        }

        array.set(0, 0, 0, 300).unwrap();
        model.insert((0, 0, 0), 300);
        assert_eq!(array.bits(), 9);

        array.set(15, 7, 15, 40_000).unwrap();
        model.insert((15, 7, 15), 40_000);
        assert_eq!(array.bits(), 16);

        for ((x, y, z), value) in &model {
            assert_eq!(array.get(*x, *y, *z).unwrap(), *value, "mismatch at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_widening_from_uniform() {
        let mut array = PackedVoxelArray::uniform(DIMS, 2, 3, WidthPolicy::Widen).unwrap();
        array.set(5, 5, 5, 1000).unwrap();
        assert_eq!(array.get(5, 5, 5).unwrap(), 1000);
        assert_eq!(array.get(4, 5, 5).unwrap(), 3);
        assert!(array.values().filter(|v| *v == 3).count() == DIMS.volume() - 1);
    }

    #[test]
    fn test_odd_widths_straddle_bytes() {
        for bits in [3u8, 5, 7, 11, 13] {
            let mut array = PackedVoxelArray::new(DIMS, bits, WidthPolicy::Reject);
            let max = u32::from(array.max_value()) + 1;
            for y in 0..8 {
                for z in 0..16 {
                    for x in 0..16 {
                        let value = ((x * 7 + z * 3 + y * 11) as u32 % max) as u16;
                        array.set(x, y, z, value).unwrap();
                    }
                }
            }
            for y in 0..8 {
                for z in 0..16 {
                    for x in 0..16 {
                        let value = ((x * 7 + z * 3 + y * 11) as u32 % max) as u16;
                        assert_eq!(array.get(x, y, z).unwrap(), value, "bits={bits} at ({x}, {y}, {z})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut array = PackedVoxelArray::new(DIMS, 8, WidthPolicy::Widen);
        let mut model = HashMap::new();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..5_000 {
            let key = random_cell(&mut rng);
            let value = rng.gen_range(0..1024u16);
            let previous = array.set(key.0, key.1, key.2, value).unwrap();
            assert_eq!(previous, model.insert(key, value).unwrap_or(0));
        }
        for ((x, y, z), value) in &model {
            assert_eq!(array.get(*x, *y, *z).unwrap(), *value);
        }
    }

    #[test]
    fn test_uniform_is_transparent() {
        let mut array = PackedVoxelArray::uniform(DIMS, 8, 42, WidthPolicy::Widen).unwrap();
        assert!(array.is_uniform());
        assert_eq!(array.get(9, 1, 2).unwrap(), 42);

        // Writing the same value keeps the uniform form
        array.set(9, 1, 2, 42).unwrap();
        assert!(array.is_uniform());

        array.set(9, 1, 2, 7).unwrap();
        assert!(!array.is_uniform());
        assert_eq!(array.get(9, 1, 2).unwrap(), 7);
        assert_eq!(array.get(9, 1, 3).unwrap(), 42);
    }

    #[test]
    fn test_compact_collapses_and_narrows() {
        let mut array = PackedVoxelArray::new(DIMS, 8, WidthPolicy::Widen);
        array.set(1, 1, 1, 5000).unwrap();
        array.set(2, 2, 2, 17).unwrap();
        assert_eq!(array.bits(), 13);

        array.set(1, 1, 1, 3).unwrap();
        array.compact();
        assert_eq!(array.bits(), 8, "narrowing stops at the construction width");
        assert_eq!(array.get(2, 2, 2).unwrap(), 17);
        assert_eq!(array.get(1, 1, 1).unwrap(), 3);

        array.set(1, 1, 1, 0).unwrap();
        array.set(2, 2, 2, 0).unwrap();
        array.compact();
        assert!(array.is_uniform());
        assert_eq!(array.get(1, 1, 1).unwrap(), 0);
    }

    #[test]
    fn test_serialize_roundtrip_packed_and_uniform() {
        let mut packed = PackedVoxelArray::new(DIMS, 5, WidthPolicy::Widen);
        packed.set(3, 4, 5, 31).unwrap();
        packed.set(15, 7, 15, 12).unwrap();
        let uniform = PackedVoxelArray::uniform(DIMS, 4, 9, WidthPolicy::Reject).unwrap();

        for array in [&packed, &uniform] {
            let mut bytes = Vec::new();
            array.serialize(&mut bytes).unwrap();
            assert_eq!(bytes.len(), array.serialized_len());

            let restored = PackedVoxelArray::deserialize(&mut bytes.as_slice(), Some(DIMS)).unwrap();
            assert_eq!(&restored, array);
            assert_eq!(restored.bits(), array.bits());
            assert_eq!(restored.policy(), array.policy());
            assert_eq!(restored.is_uniform(), array.is_uniform());
        }
    }

    #[test]
    fn test_long_dimension_survives_roundtrip() {
        let dims = Extent3::new(70_000, 1, 2);
        let mut array = PackedVoxelArray::new(dims, 1, WidthPolicy::Widen);
        array.set(69_999, 0, 1, 1).unwrap();
        array.set(65_536, 0, 0, 3).unwrap();

        let mut bytes = Vec::new();
        array.serialize(&mut bytes).unwrap();
        let restored = PackedVoxelArray::deserialize(&mut bytes.as_slice(), None).unwrap();
        assert_eq!(restored.dims(), dims);
        assert_eq!(restored.get(69_999, 0, 1).unwrap(), 1);
        assert_eq!(restored.get(65_536, 0, 0).unwrap(), 3);
        assert_eq!(restored.get(0, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_oversized_header_rejected_without_allocating() {
        let mut bytes = vec![TAG_PACKED, 4, 4, WidthPolicy::Reject as u8];
        for _ in 0..3 {
            bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            PackedVoxelArray::deserialize(&mut bytes.as_slice(), None),
            Err(CoreError::CorruptData(_))
        ));

        // Plausible header, payload far shorter than announced
        let mut short = vec![TAG_PACKED, 4, 4, WidthPolicy::Reject as u8];
        for dim in [4096u32, 4096, 64] {
            short.extend_from_slice(&dim.to_le_bytes());
        }
        short.extend_from_slice(&[0u8; 32]);
        assert!(matches!(
            PackedVoxelArray::deserialize(&mut short.as_slice(), None),
            Err(CoreError::CorruptData(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_corruption() {
        let mut array = PackedVoxelArray::new(DIMS, 4, WidthPolicy::Reject);
        array.set(0, 0, 1, 2).unwrap();
        let mut bytes = Vec::new();
        array.write_to(&mut bytes);

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            PackedVoxelArray::deserialize(&mut &truncated[..], None),
            Err(CoreError::CorruptData(_))
        ));

        let mut bad_tag = bytes.clone();
        bad_tag[0] = 9;
        assert!(PackedVoxelArray::deserialize(&mut bad_tag.as_slice(), None).is_err());

        let mut bad_bits = bytes.clone();
        bad_bits[1] = 17;
        assert!(PackedVoxelArray::deserialize(&mut bad_bits.as_slice(), None).is_err());

        let other_dims = Extent3::new(8, 8, 8);
        assert!(PackedVoxelArray::deserialize(&mut bytes.as_slice(), Some(other_dims)).is_err());
    }
}
