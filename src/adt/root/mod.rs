//! Root tile files: heights, normals, vertex colors, liquids and blend meshes.

pub mod cell;

use bytemuck::Zeroable;

use crate::{
	chunk_field,
	io::{
		buffer::*,
		chunk::*,
		fourcc::FourCC,
		schema::*,
		scope::LogScope,
		version::*,
	},
	AdtError,
	AdtResult,
	TileConfig,
};

use super::{
	flags::MhdrFlags,
	liquid::{LiquidFormatResolver, Liquids},
	structures::*,
	tags::*,
	cell_grid,
	check_cell_count,
	read_version,
	write_version,
	CELLS_PER_TILE,
};

pub use cell::RootCell;
use cell::ROOT_CELL_SCHEMA;

#[derive(Debug, Clone, PartialEq)]
pub struct RootTile {
	version: ClientVersion,
	components: Components,
	cell_components: Components,
	/// Only the flags and the amplifier value are meaningful; the offsets
	/// are rebuilt on write.
	pub header: DataChunk<Mhdr, { MHDR }>,
	pub liquids: Option<Liquids>,
	pub flight_bounds: DataChunk<Mfbo, { MFBO }>,
	pub blend_mesh_headers: DataArrayChunk<BlendMeshHeader, { MBMH }>,
	pub blend_mesh_bounds: DataArrayChunk<BlendMeshBounds, { MBBB }>,
	pub blend_mesh_vertices: DataArrayChunk<BlendMeshVertex, { MBNV }>,
	pub blend_mesh_indices: DataArrayChunk<u16, { MBMI }>,
	cells: Box<[RootCell; CELLS_PER_TILE]>,
}

pub(crate) struct RootReadCtx {
	cells_read: usize,
	resolver: Option<LiquidFormatResolver>,
}

pub(crate) struct RootWriteCtx {
	/// Offset of the MHDR chunk header.
	header_pos: usize,
	header: Mhdr,
}

impl RootWriteCtx {
	/// Offset of `position` from the start of the MHDR payload.
	fn relative(&self, position: usize) -> AdtResult<u32> {
		position.checked_sub(self.header_pos + ChunkHeader::SIZE)
			.and_then(|offset| u32::try_from(offset).ok())
			.ok_or(AdtError::Overflow)
	}
}

fn read_mver(_: &mut RootTile, view: &mut ByteView<'_>, header: &ChunkHeader, _: &mut RootReadCtx, scope: LogScope) -> AdtResult<()> {
	read_version(view, header, scope)
}

fn write_mver(_: &RootTile, buffer: &mut ByteBuffer, _: &mut RootWriteCtx, _: LogScope) -> AdtResult<()> {
	write_version(buffer)
}

/// Writes the header with every offset cleared. It is patched once the
/// chunks it points at have been written.
fn write_mhdr(tile: &RootTile, buffer: &mut ByteBuffer, ctx: &mut RootWriteCtx, _: LogScope) -> AdtResult<()> {
	let stored = tile.header.get().copied().unwrap_or_else(Mhdr::zeroed);
	let header = Mhdr {
		flags: stored.flags & !MhdrFlags::FLIGHT_BOUNDS.bits(),
		mamp_value: stored.mamp_value,
		padding: stored.padding,
		..Mhdr::zeroed()
	};
	ctx.header_pos = buffer.write_chunk(MHDR, |buffer| buffer.write(&header))?;
	ctx.header = header;
	Ok(())
}

fn read_mh2o(tile: &mut RootTile, view: &mut ByteView<'_>, header: &ChunkHeader, ctx: &mut RootReadCtx, scope: LogScope) -> AdtResult<()> {
	let payload = view.read_slice(header.size as usize)?;
	tile.liquids = Some(Liquids::decode(payload, ctx.resolver)?);
	log::trace!("{}Decoded liquids for {} cells.", scope, tile.liquid_cell_count());
	Ok(())
}

fn write_mh2o(tile: &RootTile, buffer: &mut ByteBuffer, ctx: &mut RootWriteCtx, _: LogScope) -> AdtResult<()> {
	if let Some(liquids) = &tile.liquids {
		ctx.header.mh2o = ctx.relative(buffer.tell())?;
		buffer.write_chunk(MH2O, |buffer| liquids.encode(buffer))?;
	}
	Ok(())
}

fn read_cell(tile: &mut RootTile, view: &mut ByteView<'_>, header: &ChunkHeader, ctx: &mut RootReadCtx, scope: LogScope) -> AdtResult<()> {
	if ctx.cells_read >= CELLS_PER_TILE {
		return Err(AdtError::CellCount { kind: "root", count: ctx.cells_read + 1 });
	}
	log::trace!("{}Reading root cell {} / 255.", scope, ctx.cells_read);
	let active = tile.cell_components;
	tile.cells[ctx.cells_read].read(view, header, active, scope.nested())?;
	ctx.cells_read += 1;
	Ok(())
}

fn write_cells(tile: &RootTile, buffer: &mut ByteBuffer, _: &mut RootWriteCtx, scope: LogScope) -> AdtResult<()> {
	for cell in tile.cells.iter() {
		cell.write(buffer, tile.cell_components, tile.version, scope.nested())?;
	}
	Ok(())
}

fn write_mfbo(tile: &RootTile, buffer: &mut ByteBuffer, ctx: &mut RootWriteCtx, _: LogScope) -> AdtResult<()> {
	if tile.flight_bounds.is_initialized() {
		ctx.header.mfbo = ctx.relative(buffer.tell())?;
		ctx.header.flags |= MhdrFlags::FLIGHT_BOUNDS.bits();
		tile.flight_bounds.write(buffer)?;
	}
	Ok(())
}

static ROOT_SCHEMA: Schema<RootTile, RootReadCtx, RootWriteCtx> = Schema {
	name: "root",
	entries: &[
		Entry::Field(Field { tag: MVER, read: read_mver, write: write_mver }),
		Entry::Field(Field {
			tag: MHDR,
			read: |tile, view, header, _, _| tile.header.read(view, header),
			write: write_mhdr,
		}),
		Entry::Component(Component {
			name: "liquids",
			gate: Gate::versions(VersionRange::from(ClientVersion::Wotlk)),
			fields: &[Field { tag: MH2O, read: read_mh2o, write: write_mh2o }],
		}),
		Entry::Field(Field { tag: MCNK, read: read_cell, write: write_cells }),
		Entry::Field(Field {
			tag: MFBO,
			read: |tile, view, header, _, _| tile.flight_bounds.read(view, header),
			write: write_mfbo,
		}),
		Entry::Component(Component {
			name: "blend meshes",
			gate: Gate::versions(VersionRange::from(ClientVersion::Mop)),
			fields: &[
				chunk_field!(MBMH => blend_mesh_headers),
				chunk_field!(MBBB => blend_mesh_bounds),
				chunk_field!(MBNV => blend_mesh_vertices),
				chunk_field!(MBMI => blend_mesh_indices),
			],
		}),
	],
	extension: None,
};

impl RootTile {
	/// Nothing initialized, not even the cells. Reading starts from this.
	fn blank(version: ClientVersion) -> Self {
		Self {
			version,
			components: ROOT_SCHEMA.resolve(version, LodLevel::Normal),
			cell_components: ROOT_CELL_SCHEMA.resolve(version, LodLevel::Normal),
			header: DataChunk::new(),
			liquids: None,
			flight_bounds: DataChunk::new(),
			blend_mesh_headers: DataArrayChunk::new(),
			blend_mesh_bounds: DataArrayChunk::new(),
			blend_mesh_vertices: DataArrayChunk::new(),
			blend_mesh_indices: DataArrayChunk::new(),
			cells: cell_grid(|_| RootCell::blank()),
		}
	}

	/// A flat tile with a header and 256 cells.
	pub fn new(config: &TileConfig) -> Self {
		let mut tile = Self::blank(config.version);
		tile.header.initialize();
		tile.cells = cell_grid(RootCell::new);
		tile
	}

	pub fn version(&self) -> ClientVersion {
		self.version
	}

	/// Names of the optional chunk groups this tile carries.
	pub fn active_components(&self) -> Vec<&'static str> {
		let mut names = ROOT_SCHEMA.active_names(self.components);
		names.extend(ROOT_CELL_SCHEMA.active_names(self.cell_components));
		names
	}

	pub fn cells(&self) -> &[RootCell; CELLS_PER_TILE] {
		&self.cells
	}

	pub fn cells_mut(&mut self) -> &mut [RootCell; CELLS_PER_TILE] {
		&mut self.cells
	}

	pub fn cell(&self, x: usize, y: usize) -> Option<&RootCell> {
		self.cells.get(super::cell_index(x, y)).filter(|_| x < super::CELLS_PER_ROW)
	}

	pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut RootCell> {
		if x >= super::CELLS_PER_ROW {
			return None;
		}
		self.cells.get_mut(super::cell_index(x, y))
	}

	fn liquid_cell_count(&self) -> usize {
		self.liquids.as_ref()
			.map(|liquids| liquids.cells().iter().filter(|cell| !cell.is_empty()).count())
			.unwrap_or(0)
	}

	/// Reads a whole root file. The view must be at its start and is consumed to the end.
	pub fn read(view: &mut ByteView<'_>, config: &TileConfig) -> AdtResult<Self> {
		log::debug!("Reading root tile ({} bytes, {:?}).", view.size(), config.version);
		let mut tile = Self::blank(config.version);
		let mut ctx = RootReadCtx {
			cells_read: 0,
			resolver: config.liquid_format_resolver,
		};
		let active = tile.components;
		ROOT_SCHEMA.read_all(&mut tile, active, view, &mut ctx, LogScope::ROOT.nested())?;
		if !tile.header.is_initialized() {
			return Err(AdtError::MissingChunk(FourCC(MHDR)));
		}
		check_cell_count("root", ctx.cells_read)?;
		log::debug!("Done reading root tile.");
		Ok(tile)
	}

	pub fn write(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		log::debug!("Writing root tile ({:?}).", self.version);
		let mut ctx = RootWriteCtx {
			header_pos: 0,
			header: Mhdr::zeroed(),
		};
		ROOT_SCHEMA.write(self, self.components, buffer, &mut ctx, LogScope::ROOT.nested())?;
		buffer.write_at(&ctx.header, ctx.header_pos + ChunkHeader::SIZE)?;
		log::debug!("Done writing root tile ({} bytes).", buffer.size());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adt::liquid::{LiquidLayer, LiquidVertexFormat};

	fn round_trip(tile: &RootTile, config: &TileConfig) -> AdtResult<(RootTile, ByteBuffer)> {
		let mut buffer = ByteBuffer::new();
		tile.write(&mut buffer)?;
		let read = RootTile::read(&mut buffer.view(), config)?;
		Ok((read, buffer))
	}

	#[test]
	fn header_offsets() -> AdtResult<()> {
		let config = TileConfig::new(ClientVersion::Mop);
		let mut tile = RootTile::new(&config);
		tile.header.initialize().mamp_value = 3;
		tile.header.initialize().mcin = 999;
		tile.flight_bounds.set(Mfbo { maximum: [100; 9], minimum: [-100; 9] });
		let mut liquids = Liquids::new();
		liquids.cell_mut(3).unwrap().layers.push(LiquidLayer::new(2, LiquidVertexFormat::DepthOnly));
		tile.liquids = Some(liquids);
		tile.blend_mesh_indices.push(7);

		let (read, buffer) = round_trip(&tile, &config)?;
		let bytes = buffer.as_slice();
		let header = *read.header.get().unwrap();
		assert_eq!(header.mcin, 0);
		assert_eq!(header.mamp_value, 3);
		assert!(header.flags().contains(MhdrFlags::FLIGHT_BOUNDS));
		// MVER (12 bytes) and the MHDR chunk header come first.
		let base = 12 + 8;
		assert_eq!(&bytes[base + header.mh2o as usize..][..4], b"O2HM");
		assert_eq!(&bytes[base + header.mfbo as usize..][..4], b"OBFM");
		assert_eq!(read.flight_bounds, tile.flight_bounds);
		assert_eq!(read.liquids, tile.liquids);
		assert_eq!(&*read.blend_mesh_indices, &[7]);

		let mut again = ByteBuffer::new();
		read.write(&mut again)?;
		assert_eq!(again.as_slice(), bytes);
		Ok(())
	}

	#[test]
	fn flight_bounds_flag_follows_the_chunk() -> AdtResult<()> {
		let config = TileConfig::default();
		let mut tile = RootTile::new(&config);
		tile.header.initialize().set_flags(MhdrFlags::FLIGHT_BOUNDS | MhdrFlags::NORTHREND);
		let (read, _) = round_trip(&tile, &config)?;
		let header = read.header.get().unwrap();
		assert_eq!(header.flags(), MhdrFlags::NORTHREND);
		assert_eq!(header.mfbo, 0);
		assert_eq!(header.mh2o, 0);
		Ok(())
	}

	#[test]
	fn header_is_required() -> AdtResult<()> {
		let config = TileConfig::default();
		let mut buffer = ByteBuffer::new();
		RootTile::new(&config).write(&mut buffer)?;
		// Drop MHDR (8 + 64 bytes after MVER).
		let mut bytes = buffer.into_inner();
		bytes.drain(12..12 + 72);
		assert!(matches!(
			RootTile::read(&mut ByteView::new(&bytes), &config),
			Err(AdtError::MissingChunk(FourCC(MHDR)))
		));
		Ok(())
	}

	#[test]
	fn too_many_cells() -> AdtResult<()> {
		let config = TileConfig::default();
		let tile = RootTile::new(&config);
		let mut buffer = ByteBuffer::new();
		tile.write(&mut buffer)?;
		let mut extra = ByteBuffer::new();
		tile.cells()[0].write(&mut extra, tile.cell_components, tile.version(), LogScope::ROOT)?;
		let mut bytes = buffer.into_inner();
		bytes.extend(extra.into_inner());
		assert!(matches!(
			RootTile::read(&mut ByteView::new(&bytes), &config),
			Err(AdtError::CellCount { count: 257, .. })
		));
		Ok(())
	}

	#[test]
	fn cell_lookup() {
		let tile = RootTile::new(&TileConfig::default());
		assert_eq!(tile.cell(15, 15).map(|cell| cell.header.index_x), Some(15));
		assert!(tile.cell(16, 0).is_none());
		assert!(tile.cell(0, 16).is_none());
		assert!(tile.active_components().contains(&"liquids"));
	}
}
