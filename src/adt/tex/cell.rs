use crate::{
	chunk_field,
	io::{
		buffer::*,
		chunk::*,
		fourcc::FourCC,
		schema::*,
		scope::LogScope,
	},
	AdtError,
	AdtResult,
};

use crate::adt::{
	alphamap::*,
	flags::MclyFlags,
	shadowmap::ShadowMapChunk,
	structures::SmLayer,
	tags::*,
};

/// The texture half of a cell: layer definitions and their blend masks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TexCell {
	/// The first layer is the opaque base and has no alpha map.
	pub layers: DataArrayChunk<SmLayer, { MCLY }, 0, 4>,
	/// `None` when the cell has no MCAL chunk.
	pub alpha_maps: Option<AlphaMaps>,
	pub shadow_map: ShadowMapChunk,
	/// Terrain material id per layer.
	pub materials: DataChunk<[u8; 4], { MCMT }>,
}

pub(crate) struct TexCellReadCtx {
	pub format: AlphaFormat,
	pub fix: bool,
}

pub(crate) struct TexCellWriteCtx {
	/// Encoded alpha map of each layer after the first.
	encoded: Vec<Vec<u8>>,
}

fn read_mcal(cell: &mut TexCell, view: &mut ByteView<'_>, header: &ChunkHeader, ctx: &mut TexCellReadCtx, _: LogScope) -> AdtResult<()> {
	if !cell.layers.is_initialized() {
		return Err(AdtError::ReadOrder {
			tag: header.fourcc(),
			offset: view.tell().saturating_sub(ChunkHeader::SIZE),
			requires: FourCC(MCLY),
		});
	}
	let compressions = cell.compressions();
	cell.alpha_maps = Some(AlphaMaps::read(view, ctx.format, &compressions, ctx.fix)?);
	Ok(())
}

/// Writes MCLY with `offset_in_mcal` pointing at the encoded alpha maps.
fn write_mcly(cell: &TexCell, buffer: &mut ByteBuffer, ctx: &mut TexCellWriteCtx, _: LogScope) -> AdtResult<()> {
	if !cell.layers.is_initialized() {
		return Ok(());
	}
	let mut layers = cell.layers.to_vec();
	let mut offset = 0usize;
	for (layer, encoded) in layers.iter_mut().skip(1).zip(&ctx.encoded) {
		layer.offset_in_mcal = u32::try_from(offset).map_err(|_| AdtError::Overflow)?;
		offset += encoded.len();
	}
	if let Some(base) = layers.first_mut() {
		base.offset_in_mcal = 0;
	}
	DataArrayChunk::<SmLayer, { MCLY }, 0, 4>::from_vec(layers).write(buffer)
}

fn write_mcal(cell: &TexCell, buffer: &mut ByteBuffer, ctx: &mut TexCellWriteCtx, _: LogScope) -> AdtResult<()> {
	if cell.alpha_maps.is_some() {
		buffer.write_chunk(MCAL, |buffer| {
			for layer in &ctx.encoded {
				buffer.write_bytes(layer)?;
			}
			Ok(())
		})?;
	}
	Ok(())
}

pub(crate) static TEX_CELL_SCHEMA: Schema<TexCell, TexCellReadCtx, TexCellWriteCtx> = Schema {
	name: "texture cell",
	entries: &[
		Entry::Field(Field {
			tag: MCLY,
			read: |cell, view, header, _, _| cell.layers.read(view, header),
			write: write_mcly,
		}),
		Entry::Field(Field {
			tag: MCSH,
			read: |cell, view, header, ctx, _| cell.shadow_map.read_fixed(view, header, ctx.fix),
			write: |cell, buffer, _, _| cell.shadow_map.write(buffer),
		}),
		Entry::Field(Field { tag: MCAL, read: read_mcal, write: write_mcal }),
		Entry::Field(chunk_field!(MCMT => materials)),
	],
	extension: None,
};

impl TexCell {
	/// A cell with an empty layer list.
	pub fn new() -> Self {
		let mut cell = Self::default();
		cell.layers.initialize();
		cell
	}

	/// Adds a layer. Every layer after the first gets a transparent alpha map.
	pub fn push_layer(&mut self, layer: SmLayer) -> AdtResult<()> {
		if self.layers.len() >= 4 {
			return Err(AdtError::ElementCount {
				tag: FourCC(MCLY),
				count: self.layers.len() + 1,
				min: 0,
				max: 4,
			});
		}
		if !self.layers.is_empty() {
			self.alpha_maps.get_or_insert_with(AlphaMaps::new).add_layer()?;
		}
		self.layers.push(layer);
		Ok(())
	}

	/// How each alpha map is stored, taken from the layer flags.
	pub fn compressions(&self) -> Vec<AlphaCompression> {
		self.layers.iter()
			.skip(1)
			.map(|layer| if layer.flags().contains(MclyFlags::ALPHA_MAP_COMPRESSED) {
				AlphaCompression::Compressed
			} else {
				AlphaCompression::Uncompressed
			})
			.collect()
	}

	pub(crate) fn read(
		&mut self,
		view: &mut ByteView<'_>,
		header: &ChunkHeader,
		active: Components,
		ctx: &mut TexCellReadCtx,
		scope: LogScope,
	) -> AdtResult<()> {
		TEX_CELL_SCHEMA.read_range(self, active, view, header.size as usize, ctx, scope)
	}

	pub(crate) fn write(
		&self,
		buffer: &mut ByteBuffer,
		active: Components,
		format: AlphaFormat,
		scope: LogScope,
	) -> AdtResult<()> {
		let encoded = match &self.alpha_maps {
			Some(maps) => maps.encode_layers(format, &self.compressions())?,
			None => Vec::new(),
		};
		let mut ctx = TexCellWriteCtx { encoded };
		buffer.write_chunk(MCNK, |buffer| TEX_CELL_SCHEMA.write(self, active, buffer, &mut ctx, scope))?;
		Ok(())
	}
}
