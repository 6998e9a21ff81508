//! Texture tile files (`_tex0`): texture lists and per-cell layers, alpha maps and shadows.

pub mod cell;

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
	alphamap::AlphaFormat,
	structures::*,
	tags::*,
	cell_grid,
	check_cell_count,
	read_version,
	write_version,
	CELLS_PER_TILE,
};

pub use cell::TexCell;
use cell::{TexCellReadCtx, TEX_CELL_SCHEMA};

#[derive(Debug, Clone, PartialEq)]
pub struct TexTile {
	version: ClientVersion,
	alpha_format: AlphaFormat,
	fix_alphamap: bool,
	components: Components,
	cell_components: Components,
	/// Diffuse textures by path, before BfA.
	pub diffuse_filenames: StringBlockChunk<{ MTEX }>,
	/// Diffuse textures by file data id, from BfA.
	pub diffuse_ids: DataArrayChunk<u32, { MDID }>,
	/// Height textures, parallel to `diffuse_ids`.
	pub height_ids: DataArrayChunk<u32, { MHID }>,
	pub texture_flags: DataArrayChunk<u32, { MTXF }>,
	pub texture_params: DataArrayChunk<TextureParams, { MTXP }>,
	pub color_grading: DataArrayChunk<ColorGrading, { MTCG }>,
	pub amplifier: DataChunk<Amplifier, { MAMP }>,
	cells: Box<[TexCell; CELLS_PER_TILE]>,
}

fn read_cell(tile: &mut TexTile, view: &mut ByteView<'_>, header: &ChunkHeader, cells_read: &mut usize, scope: LogScope) -> AdtResult<()> {
	if *cells_read >= CELLS_PER_TILE {
		return Err(AdtError::CellCount { kind: "texture", count: *cells_read + 1 });
	}
	log::trace!("{}Reading texture cell {} / 255.", scope, cells_read);
	let mut ctx = TexCellReadCtx {
		format: tile.alpha_format,
		fix: tile.fix_alphamap,
	};
	let active = tile.cell_components;
	tile.cells[*cells_read].read(view, header, active, &mut ctx, scope.nested())?;
	*cells_read += 1;
	Ok(())
}

fn write_cells(tile: &TexTile, buffer: &mut ByteBuffer, _: &mut (), scope: LogScope) -> AdtResult<()> {
	for cell in tile.cells.iter() {
		cell.write(buffer, tile.cell_components, tile.alpha_format, scope.nested())?;
	}
	Ok(())
}

static TEX_SCHEMA: Schema<TexTile, usize, ()> = Schema {
	name: "texture",
	entries: &[
		Entry::Field(Field {
			tag: MVER,
			read: |_, view, header, _, scope| read_version(view, header, scope),
			write: |_, buffer, _, _| write_version(buffer),
		}),
		Entry::Component(Component {
			name: "texture filenames",
			gate: Gate::versions(VersionRange::until(ClientVersion::Legion)),
			fields: &[chunk_field!(MTEX => diffuse_filenames)],
		}),
		Entry::Component(Component {
			name: "texture file ids",
			gate: Gate::versions(VersionRange::from(ClientVersion::Bfa)),
			fields: &[
				chunk_field!(MDID => diffuse_ids),
				chunk_field!(MHID => height_ids),
			],
		}),
		Entry::Field(Field { tag: MCNK, read: read_cell, write: write_cells }),
		Entry::Field(chunk_field!(MTXF => texture_flags)),
		Entry::Component(Component {
			name: "texture params",
			gate: Gate::versions(VersionRange::from(ClientVersion::Mop)),
			fields: &[chunk_field!(MTXP => texture_params)],
		}),
		Entry::Component(Component {
			name: "color grading",
			gate: Gate::versions(VersionRange::from(ClientVersion::Sl)),
			fields: &[chunk_field!(MTCG => color_grading)],
		}),
		Entry::Field(chunk_field!(MAMP => amplifier)),
	],
	extension: None,
};

impl TexTile {
	fn blank(config: &TileConfig) -> AdtResult<Self> {
		if !config.version.has_split_files() {
			return Err(AdtError::UnsupportedVersion { kind: "Texture", version: config.version });
		}
		Ok(Self {
			version: config.version,
			alpha_format: config.alpha_format,
			fix_alphamap: config.fix_alphamap,
			components: TEX_SCHEMA.resolve(config.version, LodLevel::Normal),
			cell_components: TEX_CELL_SCHEMA.resolve(config.version, LodLevel::Normal),
			diffuse_filenames: StringBlockChunk::new(),
			diffuse_ids: DataArrayChunk::new(),
			height_ids: DataArrayChunk::new(),
			texture_flags: DataArrayChunk::new(),
			texture_params: DataArrayChunk::new(),
			color_grading: DataArrayChunk::new(),
			amplifier: DataChunk::new(),
			cells: cell_grid(|_| TexCell::default()),
		})
	}

	/// An untextured tile: an empty diffuse texture list and 256 cells without layers.
	pub fn new(config: &TileConfig) -> AdtResult<Self> {
		let mut tile = Self::blank(config)?;
		if tile.uses_file_ids() {
			tile.diffuse_ids.initialize();
		} else {
			tile.diffuse_filenames.initialize();
		}
		tile.cells = cell_grid(|_| TexCell::new());
		Ok(tile)
	}

	pub fn version(&self) -> ClientVersion {
		self.version
	}

	pub fn alpha_format(&self) -> AlphaFormat {
		self.alpha_format
	}

	pub fn active_components(&self) -> Vec<&'static str> {
		let mut names = TEX_SCHEMA.active_names(self.components);
		names.extend(TEX_CELL_SCHEMA.active_names(self.cell_components));
		names
	}

	/// Whether diffuse textures are stored as file data ids instead of paths.
	pub fn uses_file_ids(&self) -> bool {
		self.version >= ClientVersion::Bfa
	}

	pub fn diffuse_count(&self) -> usize {
		if self.uses_file_ids() {
			self.diffuse_ids.len()
		} else {
			self.diffuse_filenames.len()
		}
	}

	pub fn cells(&self) -> &[TexCell; CELLS_PER_TILE] {
		&self.cells
	}

	pub fn cells_mut(&mut self) -> &mut [TexCell; CELLS_PER_TILE] {
		&mut self.cells
	}

	pub fn cell(&self, x: usize, y: usize) -> Option<&TexCell> {
		if x >= super::CELLS_PER_ROW {
			return None;
		}
		self.cells.get(super::cell_index(x, y))
	}

	pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut TexCell> {
		if x >= super::CELLS_PER_ROW {
			return None;
		}
		self.cells.get_mut(super::cell_index(x, y))
	}

	/// Per-texture arrays have to line up with the diffuse textures.
	fn check_lengths(&self) -> AdtResult<()> {
		let diffuse_tag = if self.uses_file_ids() { MDID } else { MTEX };
		let diffuse_present = if self.uses_file_ids() {
			self.diffuse_ids.is_initialized()
		} else {
			self.diffuse_filenames.is_initialized()
		};
		if !diffuse_present {
			return Err(AdtError::MissingChunk(FourCC(diffuse_tag)));
		}
		let expected = self.diffuse_count();
		let arrays = [
			(MHID, "height textures", self.height_ids.is_initialized() && self.uses_file_ids(), self.height_ids.len()),
			(MTXF, "texture flags", self.texture_flags.is_initialized(), self.texture_flags.len()),
			(MTXP, "texture params", self.texture_params.is_initialized(), self.texture_params.len()),
			(MTCG, "color grading", self.color_grading.is_initialized(), self.color_grading.len()),
		];
		for (tag, what, present, found) in arrays {
			crate::continue_if!(!present);
			if found != expected {
				return Err(AdtError::LengthMismatch {
					tag: FourCC(tag),
					what,
					expected,
					found,
				});
			}
		}
		Ok(())
	}

	pub fn read(view: &mut ByteView<'_>, config: &TileConfig) -> AdtResult<Self> {
		log::debug!("Reading texture tile ({} bytes, {:?}, {:?}).", view.size(), config.version, config.alpha_format);
		let mut tile = Self::blank(config)?;
		let mut cells_read = 0usize;
		let active = tile.components;
		TEX_SCHEMA.read_all(&mut tile, active, view, &mut cells_read, LogScope::ROOT.nested())?;
		check_cell_count("texture", cells_read)?;
		log::debug!("Done reading texture tile.");
		Ok(tile)
	}

	pub fn write(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		log::debug!("Writing texture tile ({:?}, {:?}).", self.version, self.alpha_format);
		self.check_lengths()?;
		TEX_SCHEMA.write(self, self.components, buffer, &mut (), LogScope::ROOT.nested())?;
		log::debug!("Done writing texture tile ({} bytes).", buffer.size());
		Ok(())
	}
}
