use std::mem::size_of;

use bytemuck::Zeroable;

use crate::{
	chunk_field,
	io::{
		buffer::*,
		chunk::*,
		schema::*,
		scope::LogScope,
		version::*,
	},
	AdtError,
	AdtResult,
};

use crate::adt::{
	flags::McnkFlags,
	structures::*,
	tags::*,
	CELL_VERTICES,
	CELLS_PER_ROW,
};

/// One of the 256 cells of a root file: a fixed header followed by sub-chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct RootCell {
	/// Sub-chunk offsets in here are rewritten on every write.
	pub header: McnkHeader,
	pub heights: DataArrayChunk<f32, { MCVT }, CELL_VERTICES, CELL_VERTICES>,
	pub normals: DataArrayChunk<Normal, { MCNR }, CELL_VERTICES, CELL_VERTICES>,
	pub vertex_colors: DataArrayChunk<VertexColor, { MCCV }, CELL_VERTICES, CELL_VERTICES>,
	pub vertex_lighting: DataArrayChunk<VertexColor, { MCLV }, CELL_VERTICES, CELL_VERTICES>,
	/// Pre-WotLK liquid. Kept as raw bytes.
	pub legacy_liquid: DataArrayChunk<u8, { MCLQ }>,
	pub sound_emitters: DataArrayChunk<SoundEmitter, { MCSE }>,
	/// One bit per ground effect doodad slot.
	pub ground_effects_disabled: DataChunk<u64, { MCDD }>,
	pub blend_batches: DataArrayChunk<BlendBatch, { MCBB }, 0, 256>,
}

pub(crate) static ROOT_CELL_SCHEMA: Schema<RootCell, (), ()> = Schema {
	name: "root cell",
	entries: &[
		Entry::Field(chunk_field!(MCVT => heights)),
		Entry::Component(Component {
			name: "vertex colors",
			gate: Gate::versions(VersionRange::from(ClientVersion::Wotlk)),
			fields: &[chunk_field!(MCCV => vertex_colors)],
		}),
		Entry::Component(Component {
			name: "vertex lighting",
			gate: Gate::versions(VersionRange::from(ClientVersion::Cata)),
			fields: &[chunk_field!(MCLV => vertex_lighting)],
		}),
		Entry::Field(chunk_field!(MCNR => normals)),
		Entry::Field(chunk_field!(MCLQ => legacy_liquid)),
		Entry::Field(chunk_field!(MCSE => sound_emitters)),
		Entry::Component(Component {
			name: "blend batches",
			gate: Gate::versions(VersionRange::from(ClientVersion::Mop)),
			fields: &[chunk_field!(MCBB => blend_batches)],
		}),
		Entry::Component(Component {
			name: "ground effects",
			gate: Gate::versions(VersionRange::from(ClientVersion::Wod)),
			fields: &[chunk_field!(MCDD => ground_effects_disabled)],
		}),
	],
	extension: None,
};

impl RootCell {
	/// A cell with no sub-chunks. Reading starts from this.
	pub(crate) fn blank() -> Self {
		Self {
			header: McnkHeader::zeroed(),
			heights: DataArrayChunk::new(),
			normals: DataArrayChunk::new(),
			vertex_colors: DataArrayChunk::new(),
			vertex_lighting: DataArrayChunk::new(),
			legacy_liquid: DataArrayChunk::new(),
			sound_emitters: DataArrayChunk::new(),
			ground_effects_disabled: DataChunk::new(),
			blend_batches: DataArrayChunk::new(),
		}
	}

	/// A flat cell at grid position `index` with upward normals.
	pub fn new(index: usize) -> Self {
		let mut cell = Self::blank();
		cell.header.index_x = (index % CELLS_PER_ROW) as u32;
		cell.header.index_y = (index / CELLS_PER_ROW) as u32;
		cell.heights = DataArrayChunk::zeroed();
		cell.normals = DataArrayChunk::from_vec(vec![[0, 0, 127]; CELL_VERTICES]);
		cell
	}

	pub fn flags(&self) -> McnkFlags {
		self.header.flags()
	}

	pub(crate) fn read(
		&mut self,
		view: &mut ByteView<'_>,
		chunk: &ChunkHeader,
		active: Components,
		scope: LogScope,
	) -> AdtResult<()> {
		let header_size = size_of::<McnkHeader>();
		let size = chunk.size as usize;
		if size < header_size {
			return Err(AdtError::RecordSize {
				tag: chunk.fourcc(),
				size: chunk.size,
				expected: header_size,
			});
		}
		self.header = view.read_record()?;
		ROOT_CELL_SCHEMA.read_range(self, active, view, size - header_size, &mut (), scope)
	}

	pub(crate) fn write(
		&self,
		buffer: &mut ByteBuffer,
		active: Components,
		version: ClientVersion,
		scope: LogScope,
	) -> AdtResult<()> {
		let start = buffer.write_chunk(MCNK, |buffer| {
			buffer.write(&self.header)?;
			ROOT_CELL_SCHEMA.write(self, active, buffer, &mut (), scope)
		})?;
		let end = buffer.tell();
		let header = self.layout_header(&buffer.as_slice()[start..end], version)?;
		buffer.write_at(&header, start + ChunkHeader::SIZE)
	}

	/// Fills in the sub-chunk offsets of the header from the written chunk.
	/// Offsets are relative to the start of the MCNK chunk header.
	fn layout_header(&self, chunk: &[u8], version: ClientVersion) -> AdtResult<McnkHeader> {
		let mut header = self.header;
		if version < ClientVersion::Mop {
			header.height_or_holes = [0, 0];
		}
		header.ofs_mccv = 0;
		header.ofs_mclv = 0;
		header.ofs_snd_emitters = 0;
		header.ofs_liquid = 0;
		header.size_liquid = 0;
		header.n_snd_emitters = u32::try_from(self.sound_emitters.len()).map_err(|_| AdtError::Overflow)?;
		header.flags &= !McnkFlags::HAS_MCCV.bits();

		let mut view = ByteView::new(chunk);
		view.seek_to(ChunkHeader::SIZE + size_of::<McnkHeader>())?;
		while !view.is_eof() {
			let offset = u32::try_from(view.tell()).map_err(|_| AdtError::Overflow)?;
			let sub = ChunkHeader::read_header(&mut view)?;
			match sub.tag {
				MCVT if version < ClientVersion::Mop => header.height_or_holes[0] = offset,
				MCNR if version < ClientVersion::Mop => header.height_or_holes[1] = offset,
				MCCV => {
					header.ofs_mccv = offset;
					header.flags |= McnkFlags::HAS_MCCV.bits();
				}
				MCLV => header.ofs_mclv = offset,
				MCSE => header.ofs_snd_emitters = offset,
				MCLQ => {
					header.ofs_liquid = offset;
					header.size_liquid = sub.size + ChunkHeader::SIZE as u32;
				}
				_ => {}
			}
			view.skip(sub.size as usize)?;
		}
		Ok(header)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write(cell: &RootCell, version: ClientVersion) -> AdtResult<ByteBuffer> {
		let mut buffer = ByteBuffer::new();
		let active = ROOT_CELL_SCHEMA.resolve(version, LodLevel::Normal);
		cell.write(&mut buffer, active, version, LogScope::ROOT)?;
		Ok(buffer)
	}

	fn read(bytes: &[u8], version: ClientVersion) -> AdtResult<RootCell> {
		let mut view = ByteView::new(bytes);
		let chunk = ChunkHeader::read_header(&mut view)?;
		let mut cell = RootCell::blank();
		cell.read(&mut view, &chunk, ROOT_CELL_SCHEMA.resolve(version, LodLevel::Normal), LogScope::ROOT)?;
		assert!(view.is_eof());
		Ok(cell)
	}

	#[test]
	fn offsets_are_recomputed() -> AdtResult<()> {
		let mut cell = RootCell::new(17);
		cell.header.ofs_mccv = 1234;
		cell.vertex_colors = DataArrayChunk::from_vec(vec![VertexColor::NEUTRAL; CELL_VERTICES]);
		cell.sound_emitters.push(SoundEmitter::default());
		let buffer = write(&cell, ClientVersion::Cata)?;
		let cell = read(buffer.as_slice(), ClientVersion::Cata)?;
		let header = cell.header;
		assert_eq!((header.index_x, header.index_y), (1, 1));
		// MCVT directly follows the 8 + 128 header bytes.
		assert_eq!(header.height_or_holes[0], 136);
		let mccv = 136 + 8 + CELL_VERTICES as u32 * 4;
		assert_eq!(header.ofs_mccv, mccv);
		assert_eq!(header.height_or_holes[1], mccv + 8 + CELL_VERTICES as u32 * 4);
		assert_eq!(header.n_snd_emitters, 1);
		assert!(cell.flags().contains(McnkFlags::HAS_MCCV));
		assert_eq!(&buffer.as_slice()[mccv as usize..mccv as usize + 4], b"VCCM");
		// A second pass changes nothing.
		assert_eq!(write(&cell, ClientVersion::Cata)?.as_slice(), buffer.as_slice());
		Ok(())
	}

	#[test]
	fn high_res_holes_survive() -> AdtResult<()> {
		let mut cell = RootCell::new(0);
		cell.header.set_holes_high_res(0xF0F0);
		cell.header.set_flags(McnkFlags::HIGH_RES_HOLES);
		cell.blend_batches.push(BlendBatch { mbmh_index: 1, ..Default::default() });
		let mop = read(write(&cell, ClientVersion::Mop)?.as_slice(), ClientVersion::Mop)?;
		assert_eq!(mop.header.holes_high_res(), 0xF0F0);
		assert_eq!(mop.blend_batches.len(), 1);
		// Before MoP the batches are not written and the holes field holds offsets.
		let cata = read(write(&cell, ClientVersion::Cata)?.as_slice(), ClientVersion::Cata)?;
		assert!(!cata.blend_batches.is_initialized());
		assert_eq!(cata.header.height_or_holes[0], 136);
		Ok(())
	}

	#[test]
	fn fixed_counts() {
		let mut cell = RootCell::new(0);
		cell.heights.data_mut().pop();
		assert!(matches!(
			write(&cell, ClientVersion::Cata),
			Err(AdtError::ElementCount { count: 144, min: 145, max: 145, .. })
		));
		let short = [b"KNCM".as_slice(), &4u32.to_le_bytes(), &[0; 4]].concat();
		assert!(matches!(read(&short, ClientVersion::Cata), Err(AdtError::RecordSize { expected: 128, .. })));
	}
}
