use crate::{
	chunk_field,
	io::{
		buffer::*,
		chunk::*,
		schema::*,
		scope::LogScope,
	},
	AdtResult,
};

use crate::adt::tags::*;

/// The object half of a cell: which placements touch it.
/// The values are indices into the tile's placement arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjCell {
	pub model_refs: DataArrayChunk<u32, { MCRD }>,
	pub map_object_refs: DataArrayChunk<u32, { MCRW }>,
}

pub(crate) static OBJ_CELL_SCHEMA: Schema<ObjCell, (), ()> = Schema {
	name: "object cell",
	entries: &[
		Entry::Field(chunk_field!(MCRD => model_refs)),
		Entry::Field(chunk_field!(MCRW => map_object_refs)),
	],
	extension: None,
};

impl ObjCell {
	/// A cell with both reference lists present but empty.
	pub fn new() -> Self {
		let mut cell = Self::default();
		cell.model_refs.initialize();
		cell.map_object_refs.initialize();
		cell
	}

	pub(crate) fn read(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader, active: Components, scope: LogScope) -> AdtResult<()> {
		OBJ_CELL_SCHEMA.read_range(self, active, view, header.size as usize, &mut (), scope)
	}

	pub(crate) fn write(&self, buffer: &mut ByteBuffer, active: Components, scope: LogScope) -> AdtResult<()> {
		buffer.write_chunk(MCNK, |buffer| OBJ_CELL_SCHEMA.write(self, active, buffer, &mut (), scope))?;
		Ok(())
	}

	/// Drops references to placements that no longer exist.
	pub(crate) fn retain_refs(&mut self, model_count: usize, map_object_count: usize) {
		if self.model_refs.is_initialized() {
			self.model_refs.data_mut().retain(|&index| (index as usize) < model_count);
		}
		if self.map_object_refs.is_initialized() {
			self.map_object_refs.data_mut().retain(|&index| (index as usize) < map_object_count);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::AdtError;

	#[test]
	fn refs_round_trip() -> AdtResult<()> {
		let mut cell = ObjCell::new();
		cell.model_refs.set(vec![0, 4, 9]);
		cell.map_object_refs.set(vec![1]);
		let mut buffer = ByteBuffer::new();
		cell.write(&mut buffer, Components::NONE, LogScope::ROOT)?;
		assert_eq!(buffer.size(), 8 + 8 + 12 + 8 + 4);

		let mut view = buffer.view();
		let header = ChunkHeader::read_header(&mut view)?;
		let mut read = ObjCell::default();
		read.read(&mut view, &header, Components::NONE, LogScope::ROOT)?;
		assert_eq!(read, cell);
		Ok(())
	}

	#[test]
	fn refs_must_be_whole_indices() {
		let bytes = [
			b"KNCM".as_slice(), &10u32.to_le_bytes(),
			b"DRCM", &2u32.to_le_bytes(), &[1u8, 0],
		].concat();
		let mut view = ByteView::new(&bytes);
		let header = ChunkHeader::read_header(&mut view).unwrap();
		assert!(matches!(
			ObjCell::default().read(&mut view, &header, Components::NONE, LogScope::ROOT),
			Err(AdtError::ElementSizeMismatch { size: 2, element_size: 4, .. })
		));
	}

	#[test]
	fn retain() {
		let mut cell = ObjCell::new();
		cell.model_refs.set(vec![0, 3, 1]);
		cell.map_object_refs.set(vec![2]);
		cell.retain_refs(2, 5);
		assert_eq!(&*cell.model_refs, &[0, 1]);
		assert_eq!(&*cell.map_object_refs, &[2]);
	}
}
