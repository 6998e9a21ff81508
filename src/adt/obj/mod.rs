//! Object placement tile files (`_obj0` and the LOD `_obj1` variant).

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
	flags::{MddfFlags, ModfFlags},
	structures::*,
	tags::*,
	cell_grid,
	check_cell_count,
	read_version,
	write_version,
	CELLS_PER_TILE,
};

pub use cell::ObjCell;
use cell::OBJ_CELL_SCHEMA;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjTile {
	version: ClientVersion,
	lod_level: LodLevel,
	components: Components,
	cell_components: Components,
	/// M2 model paths, before BfA.
	pub model_filenames: StringBlockChunk<{ MMDX }>,
	/// Offsets into `model_filenames`, indexed by `Mddf::name_id`.
	pub model_name_offsets: DataArrayChunk<u32, { MMID }>,
	pub map_object_filenames: StringBlockChunk<{ MWMO }>,
	pub map_object_name_offsets: DataArrayChunk<u32, { MWID }>,
	pub model_placements: DataArrayChunk<Mddf, { MDDF }>,
	pub map_object_placements: DataArrayChunk<Modf, { MODF }>,
	pub lod_map_object_placements: DataArrayChunk<Mlmd, { MLMD }>,
	pub lod_map_object_extents: DataArrayChunk<LodExtent, { MLMX }>,
	pub lod_model_placements: DataArrayChunk<Mddf, { MLDD }>,
	pub lod_model_extents: DataArrayChunk<LodExtent, { MLDX }>,
	pub lod_model_levels: DataArrayChunk<u32, { MLDL }>,
	pub lod_fade: DataChunk<Mlfd, { MLFD }>,
	pub lod_model_batches: DataArrayChunk<u8, { MLDB }>,
	pub map_object_batches: DataArrayChunk<u8, { MLMB }>,
	pub doodad_set_ranges: DataArrayChunk<DoodadSetRange, { MWDR }>,
	pub doodad_sets: DataArrayChunk<i16, { MWDS }>,
	/// LOD files usually carry no cells at all.
	cells: Option<Box<[ObjCell; CELLS_PER_TILE]>>,
}

fn read_cell(tile: &mut ObjTile, view: &mut ByteView<'_>, header: &ChunkHeader, cells_read: &mut usize, scope: LogScope) -> AdtResult<()> {
	if *cells_read >= CELLS_PER_TILE {
		return Err(AdtError::CellCount { kind: "object", count: *cells_read + 1 });
	}
	log::trace!("{}Reading object cell {} / 255.", scope, cells_read);
	let active = tile.cell_components;
	let cells = tile.cells.get_or_insert_with(|| cell_grid(|_| ObjCell::default()));
	cells[*cells_read].read(view, header, active, scope.nested())?;
	*cells_read += 1;
	Ok(())
}

fn write_cells(tile: &ObjTile, buffer: &mut ByteBuffer, _: &mut (), scope: LogScope) -> AdtResult<()> {
	if let Some(cells) = &tile.cells {
		for cell in cells.iter() {
			cell.write(buffer, tile.cell_components, scope.nested())?;
		}
	}
	Ok(())
}

static OBJ_SCHEMA: Schema<ObjTile, usize, ()> = Schema {
	name: "object",
	entries: &[
		Entry::Field(Field {
			tag: MVER,
			read: |_, view, header, _, scope| read_version(view, header, scope),
			write: |_, buffer, _, _| write_version(buffer),
		}),
		Entry::Component(Component {
			name: "filenames",
			gate: Gate::at_level(VersionRange::until(ClientVersion::Legion), LodLevel::Normal),
			fields: &[
				chunk_field!(MMDX => model_filenames),
				chunk_field!(MMID => model_name_offsets),
				chunk_field!(MWMO => map_object_filenames),
				chunk_field!(MWID => map_object_name_offsets),
			],
		}),
		Entry::Field(chunk_field!(MDDF => model_placements)),
		Entry::Field(chunk_field!(MODF => map_object_placements)),
		Entry::Component(Component {
			name: "LOD",
			gate: Gate::at_level(VersionRange::from(ClientVersion::Legion), LodLevel::Lod),
			fields: &[
				chunk_field!(MLMD => lod_map_object_placements),
				chunk_field!(MLMX => lod_map_object_extents),
				chunk_field!(MLDD => lod_model_placements),
				chunk_field!(MLDX => lod_model_extents),
				chunk_field!(MLDL => lod_model_levels),
				chunk_field!(MLFD => lod_fade),
			],
		}),
		Entry::Component(Component {
			name: "LOD model batches",
			gate: Gate::at_level(VersionRange::from(ClientVersion::Sl), LodLevel::Lod),
			fields: &[chunk_field!(MLDB => lod_model_batches)],
		}),
		Entry::Field(Field { tag: MCNK, read: read_cell, write: write_cells }),
		Entry::Component(Component {
			name: "map object batches",
			gate: Gate::versions(VersionRange::from(ClientVersion::Bfa)),
			fields: &[chunk_field!(MLMB => map_object_batches)],
		}),
		Entry::Component(Component {
			name: "doodad set overrides",
			gate: Gate::versions(VersionRange::from(ClientVersion::Sl)),
			fields: &[
				chunk_field!(MWDR => doodad_set_ranges),
				chunk_field!(MWDS => doodad_sets),
			],
		}),
	],
	extension: None,
};

/// Byte offset that the next string pushed onto `block` will start at.
fn next_offset<const TAG: u32>(block: &StringBlockChunk<TAG>) -> AdtResult<u32> {
	let size: usize = block.strings().iter().map(|name| name.len() + 1).sum();
	u32::try_from(size).map_err(|_| AdtError::Overflow)
}

/// Adds `name` to a string block and its offset table, reusing an existing entry.
fn intern<const NAMES: u32, const OFFSETS: u32>(
	names: &mut StringBlockChunk<NAMES>,
	offsets: &mut DataArrayChunk<u32, OFFSETS>,
	name: &str,
) -> AdtResult<u32> {
	if let Some(position) = names.strings().iter().position(|existing| existing == name) {
		let offset = names.offsets()[position];
		if let Some(index) = offsets.iter().position(|&existing| existing == offset) {
			return u32::try_from(index).map_err(|_| AdtError::Overflow);
		}
		offsets.push(offset);
	} else {
		let offset = next_offset(names)?;
		names.push(name);
		offsets.push(offset);
	}
	u32::try_from(offsets.len() - 1).map_err(|_| AdtError::Overflow)
}

fn lookup<'a, const NAMES: u32, const OFFSETS: u32>(
	names: &'a StringBlockChunk<NAMES>,
	offsets: &DataArrayChunk<u32, OFFSETS>,
	name_id: u32,
) -> Option<&'a str> {
	let offset = *offsets.get(name_id as usize)?;
	names.at_offset(offset)
}

impl ObjTile {
	fn blank(config: &TileConfig) -> AdtResult<Self> {
		if !config.version.has_split_files() {
			return Err(AdtError::UnsupportedVersion { kind: "Object", version: config.version });
		}
		if config.lod_level == LodLevel::Lod && config.version < ClientVersion::Legion {
			return Err(AdtError::UnsupportedVersion { kind: "LOD object", version: config.version });
		}
		Ok(Self {
			version: config.version,
			lod_level: config.lod_level,
			components: OBJ_SCHEMA.resolve(config.version, config.lod_level),
			cell_components: OBJ_CELL_SCHEMA.resolve(config.version, config.lod_level),
			model_filenames: StringBlockChunk::new(),
			model_name_offsets: DataArrayChunk::new(),
			map_object_filenames: StringBlockChunk::new(),
			map_object_name_offsets: DataArrayChunk::new(),
			model_placements: DataArrayChunk::new(),
			map_object_placements: DataArrayChunk::new(),
			lod_map_object_placements: DataArrayChunk::new(),
			lod_map_object_extents: DataArrayChunk::new(),
			lod_model_placements: DataArrayChunk::new(),
			lod_model_extents: DataArrayChunk::new(),
			lod_model_levels: DataArrayChunk::new(),
			lod_fade: DataChunk::new(),
			lod_model_batches: DataArrayChunk::new(),
			map_object_batches: DataArrayChunk::new(),
			doodad_set_ranges: DataArrayChunk::new(),
			doodad_sets: DataArrayChunk::new(),
			cells: None,
		})
	}

	/// An empty tile. Normal tiles get 256 cells with empty reference
	/// lists; LOD tiles get their mandatory LOD chunks and no cells.
	pub fn new(config: &TileConfig) -> AdtResult<Self> {
		let mut tile = Self::blank(config)?;
		tile.model_placements.initialize();
		tile.map_object_placements.initialize();
		match tile.lod_level {
			LodLevel::Normal => {
				if tile.uses_filenames() {
					tile.model_filenames.initialize();
					tile.model_name_offsets.initialize();
					tile.map_object_filenames.initialize();
					tile.map_object_name_offsets.initialize();
				}
				tile.cells = Some(cell_grid(|_| ObjCell::new()));
			}
			LodLevel::Lod => {
				tile.lod_map_object_placements.initialize();
				tile.lod_map_object_extents.initialize();
				tile.lod_model_placements.initialize();
				tile.lod_model_extents.initialize();
				tile.lod_fade.initialize();
			}
		}
		Ok(tile)
	}

	pub fn version(&self) -> ClientVersion {
		self.version
	}

	pub fn lod_level(&self) -> LodLevel {
		self.lod_level
	}

	pub fn active_components(&self) -> Vec<&'static str> {
		let mut names = OBJ_SCHEMA.active_names(self.components);
		names.extend(OBJ_CELL_SCHEMA.active_names(self.cell_components));
		names
	}

	/// Whether placements name their models through the filename blocks.
	pub fn uses_filenames(&self) -> bool {
		self.lod_level == LodLevel::Normal && self.version <= ClientVersion::Legion
	}

	pub fn cells(&self) -> Option<&[ObjCell; CELLS_PER_TILE]> {
		self.cells.as_deref()
	}

	/// The cells of the tile, creating empty ones if it had none.
	pub fn cells_mut(&mut self) -> &mut [ObjCell; CELLS_PER_TILE] {
		self.cells.get_or_insert_with(|| cell_grid(|_| ObjCell::new()))
	}

	/// Removes every cell. Only LOD files may be written without cells.
	pub fn clear_cells(&mut self) {
		self.cells = None;
	}

	pub fn cell(&self, x: usize, y: usize) -> Option<&ObjCell> {
		if x >= super::CELLS_PER_ROW {
			return None;
		}
		self.cells.as_ref()?.get(super::cell_index(x, y))
	}

	pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut ObjCell> {
		if x >= super::CELLS_PER_ROW {
			return None;
		}
		self.cells.as_mut()?.get_mut(super::cell_index(x, y))
	}

	/// The path of a model placement, if it is named through MMDX.
	/// Flag bits the tile's client does not know are ignored.
	pub fn model_filename(&self, placement: &Mddf) -> Option<&str> {
		if placement.flags().for_version(self.version).contains(MddfFlags::FILE_DATA_ID) {
			return None;
		}
		lookup(&self.model_filenames, &self.model_name_offsets, placement.name_id)
	}

	pub fn map_object_filename(&self, placement: &Modf) -> Option<&str> {
		if placement.flags().for_version(self.version).contains(ModfFlags::FILE_DATA_ID) {
			return None;
		}
		lookup(&self.map_object_filenames, &self.map_object_name_offsets, placement.name_id)
	}

	/// Registers a model path and returns the `name_id` to place it with.
	pub fn add_model_filename(&mut self, name: &str) -> AdtResult<u32> {
		intern(&mut self.model_filenames, &mut self.model_name_offsets, name)
	}

	pub fn add_map_object_filename(&mut self, name: &str) -> AdtResult<u32> {
		intern(&mut self.map_object_filenames, &mut self.map_object_name_offsets, name)
	}

	/// Keeps the first `model_count` model and `map_object_count` map object
	/// placements, and drops the cell references to the removed ones.
	pub fn truncate_placements(&mut self, model_count: usize, map_object_count: usize) {
		if self.model_placements.len() > model_count {
			self.model_placements.data_mut().truncate(model_count);
		}
		if self.map_object_placements.len() > map_object_count {
			self.map_object_placements.data_mut().truncate(map_object_count);
		}
		let model_count = self.model_placements.len();
		let map_object_count = self.map_object_placements.len();
		if let Some(cells) = self.cells.as_mut() {
			for cell in cells.iter_mut() {
				cell.retain_refs(model_count, map_object_count);
			}
		}
	}

	fn check_required(&self) -> AdtResult<()> {
		match self.lod_level {
			LodLevel::Normal => {
				if self.cells.is_none() {
					return Err(AdtError::CellCount { kind: "object", count: 0 });
				}
			}
			LodLevel::Lod => {
				let required = [
					(MLMD, self.lod_map_object_placements.is_initialized()),
					(MLMX, self.lod_map_object_extents.is_initialized()),
					(MLDD, self.lod_model_placements.is_initialized()),
					(MLDX, self.lod_model_extents.is_initialized()),
					(MLFD, self.lod_fade.is_initialized()),
				];
				if let Some((tag, _)) = required.into_iter().find(|(_, present)| !present) {
					return Err(AdtError::MissingChunk(FourCC(tag)));
				}
			}
		}
		Ok(())
	}

	pub fn read(view: &mut ByteView<'_>, config: &TileConfig) -> AdtResult<Self> {
		log::debug!("Reading object tile ({} bytes, {:?}, {:?}).", view.size(), config.version, config.lod_level);
		let mut tile = Self::blank(config)?;
		let mut cells_read = 0usize;
		let active = tile.components;
		OBJ_SCHEMA.read_all(&mut tile, active, view, &mut cells_read, LogScope::ROOT.nested())?;
		if tile.lod_level == LodLevel::Normal || cells_read != 0 {
			check_cell_count("object", cells_read)?;
		}
		log::debug!("Done reading object tile.");
		Ok(tile)
	}

	pub fn write(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		log::debug!("Writing object tile ({:?}, {:?}).", self.version, self.lod_level);
		self.check_required()?;
		OBJ_SCHEMA.write(self, self.components, buffer, &mut (), LogScope::ROOT.nested())?;
		log::debug!("Done writing object tile ({} bytes).", buffer.size());
		Ok(())
	}
}
