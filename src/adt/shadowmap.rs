//! Shadow maps (MCSH): 64x64 bits, one row per little-endian `u64`.
//! Bit `x` of row `y` is pixel `(x, y)`, so the file bytes are LSB first.

use crate::{
	io::{
		buffer::*,
		chunk::{Chunk, ChunkHeader},
	},
	math::bit::*,
	AdtError,
	AdtResult,
};

use super::tags::MCSH;

pub const SHADOWMAP_DIM: usize = 64;
pub const SHADOWMAP_BYTES: usize = SHADOWMAP_DIM * SHADOWMAP_DIM / 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMap {
	rows: [u64; SHADOWMAP_DIM],
}

impl Default for ShadowMap {
	fn default() -> Self {
		Self { rows: [0; SHADOWMAP_DIM] }
	}
}

impl ShadowMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, x: usize, y: usize) -> bool {
		self.rows[y].get_bit(x)
	}

	pub fn set(&mut self, x: usize, y: usize, shadowed: bool) {
		self.rows[y] = self.rows[y].set_bit(x, shadowed);
	}

	pub fn rows(&self) -> &[u64; SHADOWMAP_DIM] {
		&self.rows
	}

	/// Copies row 62 over row 63, then column 62 over column 63.
	pub fn fix_edges(&mut self) {
		const LAST: usize = SHADOWMAP_DIM - 1;
		self.rows[LAST] = self.rows[LAST - 1];
		for row in self.rows.iter_mut() {
			*row = row.set_bit(LAST, row.get_bit(LAST - 1));
		}
	}

	/// Unpacks 512 bytes. `fix` repairs the last row and column afterwards.
	pub fn decode(view: &mut ByteView<'_>, fix: bool) -> AdtResult<Self> {
		let mut map = Self::new();
		for row in map.rows.iter_mut() {
			let mut bytes = [0u8; 8];
			view.read_into(&mut bytes)?;
			*row = u64::from_le_bytes(bytes);
		}
		if fix {
			map.fix_edges();
		}
		Ok(map)
	}

	/// Packs the map. The edge fix is never applied here.
	pub fn encode(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		for row in self.rows.iter() {
			buffer.write_bytes(&row.to_le_bytes())?;
		}
		Ok(())
	}
}

/// The MCSH field of a texture cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowMapChunk {
	map: Option<ShadowMap>,
}

impl ShadowMapChunk {
	pub fn get(&self) -> Option<&ShadowMap> {
		self.map.as_ref()
	}

	pub fn get_mut(&mut self) -> Option<&mut ShadowMap> {
		self.map.as_mut()
	}

	pub fn set(&mut self, map: ShadowMap) {
		self.map = Some(map);
	}

	pub fn initialize(&mut self) -> &mut ShadowMap {
		self.map.get_or_insert_with(ShadowMap::new)
	}

	pub fn clear(&mut self) {
		self.map = None;
	}

	/// Reads the payload, optionally repairing the last row and column.
	pub fn read_fixed(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader, fix: bool) -> AdtResult<()> {
		if header.size as usize != SHADOWMAP_BYTES {
			return Err(AdtError::RecordSize {
				tag: header.fourcc(),
				size: header.size,
				expected: SHADOWMAP_BYTES,
			});
		}
		self.map = Some(ShadowMap::decode(view, fix)?);
		Ok(())
	}
}

impl Chunk for ShadowMapChunk {
	const TAG: u32 = MCSH;

	fn is_initialized(&self) -> bool {
		self.map.is_some()
	}

	fn read(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader) -> AdtResult<()> {
		self.read_fixed(view, header, false)
	}

	fn write_payload(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		match &self.map {
			Some(map) => map.encode(buffer),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, Rng, SeedableRng};

	#[test]
	fn bit_order() -> AdtResult<()> {
		let mut bytes = [0u8; SHADOWMAP_BYTES];
		bytes[0] = 0b0000_0101;
		bytes[9] = 0x80;
		let map = ShadowMap::decode(&mut ByteView::new(&bytes), false)?;
		assert!(map.get(0, 0));
		assert!(!map.get(1, 0));
		assert!(map.get(2, 0));
		assert!(map.get(15, 1));
		Ok(())
	}

	#[test]
	fn round_trip() -> AdtResult<()> {
		let mut rng = StdRng::seed_from_u64(5);
		let mut bytes = [0u8; SHADOWMAP_BYTES];
		rng.fill(&mut bytes[..]);
		let map = ShadowMap::decode(&mut ByteView::new(&bytes), false)?;
		let mut buffer = ByteBuffer::new();
		map.encode(&mut buffer)?;
		assert_eq!(buffer.as_slice(), &bytes[..]);
		Ok(())
	}

	#[test]
	fn fix_is_not_inverted_on_write() -> AdtResult<()> {
		let mut map = ShadowMap::new();
		map.set(62, 10, true);
		map.set(5, 62, true);
		map.set(62, 62, true);
		let mut buffer = ByteBuffer::new();
		map.encode(&mut buffer)?;
		let fixed = ShadowMap::decode(&mut buffer.view(), true)?;
		assert!(fixed.get(63, 10));
		assert!(fixed.get(5, 63));
		assert!(fixed.get(63, 63));
		assert_ne!(fixed, map);
		let plain = ShadowMap::decode(&mut buffer.view(), false)?;
		assert_eq!(plain, map);
		Ok(())
	}

	#[test]
	fn chunk_size_is_checked() {
		let mut chunk = ShadowMapChunk::default();
		let bytes = [0u8; 100];
		assert!(matches!(
			chunk.read(&mut ByteView::new(&bytes), &ChunkHeader::new(MCSH, 100)),
			Err(AdtError::RecordSize { size: 100, expected: 512, .. })
		));
	}
}
