/*
Terrain tiles.
A tile is a 16x16 grid of cells. Since Cataclysm its data is split over a
root file (heights, normals, liquids), a texture file (layers and alpha maps)
and one or two object placement files. Before that, only the root exists.
Every file kind is a [Schema](crate::io::schema::Schema) over its own fields
plus a fixed array of 256 cells that have schemas of their own.
*/

pub mod alphamap;
pub mod file;
pub mod flags;
pub mod liquid;
pub mod obj;
pub mod root;
pub mod shadowmap;
pub mod structures;
pub mod tags;
pub mod tex;

use crate::{
	io::{
		buffer::*,
		chunk::{ChunkHeader, DataChunk, Chunk},
		scope::LogScope,
	},
	AdtError,
	AdtResult,
};

pub const CELLS_PER_ROW: usize = 16;
pub const CELLS_PER_TILE: usize = CELLS_PER_ROW * CELLS_PER_ROW;
/// Vertices per cell: a 9x9 outer grid interleaved with an 8x8 inner grid.
pub const CELL_VERTICES: usize = 9 * 9 + 8 * 8;
/// The only tile format version there has ever been.
pub const FILE_VERSION: u32 = 18;

/// Index of the cell at grid position `(x, y)`.
pub const fn cell_index(x: usize, y: usize) -> usize {
	y * CELLS_PER_ROW + x
}

/// Builds the fixed cell array of a tile.
pub(crate) fn cell_grid<C, F: FnMut(usize) -> C>(init: F) -> Box<[C; CELLS_PER_TILE]> {
	Box::new(std::array::from_fn(init))
}

pub type VersionChunk = DataChunk<u32, { tags::MVER }>;

/// Reads MVER. The value is decorative, so anything but 18 only warns.
pub(crate) fn read_version(view: &mut ByteView<'_>, header: &ChunkHeader, scope: LogScope) -> AdtResult<()> {
	let mut version = VersionChunk::new();
	version.read(view, header)?;
	if let Some(&value) = version.get() {
		if value != FILE_VERSION {
			log::warn!("{}Unexpected file version {} (expected {}).", scope, value, FILE_VERSION);
		}
	}
	Ok(())
}

pub(crate) fn write_version(buffer: &mut ByteBuffer) -> AdtResult<()> {
	VersionChunk::with(FILE_VERSION).write(buffer)
}

/// Checks that a whole tile was read.
pub(crate) fn check_cell_count(kind: &'static str, count: usize) -> AdtResult<()> {
	if count != CELLS_PER_TILE {
		return Err(AdtError::CellCount { kind, count });
	}
	Ok(())
}
