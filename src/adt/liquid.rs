//! Liquids (MH2O).
//!
//! The chunk starts with 256 cell headers. Everything else is reached
//! through offsets relative to the start of the payload: per cell an array of
//! layer instances and an optional attribute record, per layer an optional
//! existence bitmap and optional vertex data. A zero offset means absent.
//!
//! The layout of the vertex data depends on a vertex format. Values below 42
//! are the format itself; larger values are liquid object ids whose format
//! lives in client database tables, so those need a [LiquidFormatResolver].

use std::mem::size_of;

use bytemuck::Pod;

use crate::{
	io::buffer::*,
	math::bit::packed_len,
	AdtError,
	AdtResult,
};

use super::{
	structures::*,
	CELLS_PER_TILE,
	cell_grid,
};

/// First `liquid_object_or_lvf` value that names a liquid object.
pub const LIQUID_OBJECT_THRESHOLD: u16 = 42;
const HEADERS_SIZE: usize = CELLS_PER_TILE * size_of::<LiquidChunkHeader>();

/// Maps a liquid object id to its vertex format.
pub type LiquidFormatResolver = fn(u16) -> Option<LiquidVertexFormat>;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiquidVertexFormat {
	HeightDepth = 0,
	HeightUv = 1,
	DepthOnly = 2,
	HeightUvDepth = 3,
}

impl LiquidVertexFormat {
	pub fn from_code(code: u16) -> Option<Self> {
		Some(match code {
			0 => Self::HeightDepth,
			1 => Self::HeightUv,
			2 => Self::DepthOnly,
			3 => Self::HeightUvDepth,
			_ => return None,
		})
	}

	pub fn code(self) -> u16 {
		self as u16
	}

	pub fn has_heights(self) -> bool {
		self != Self::DepthOnly
	}

	pub fn has_uvs(self) -> bool {
		matches!(self, Self::HeightUv | Self::HeightUvDepth)
	}

	pub fn has_depths(self) -> bool {
		self != Self::HeightUv
	}

	/// Bytes per vertex.
	pub fn stride(self) -> usize {
		let mut stride = 0;
		if self.has_heights() {
			stride += size_of::<f32>();
		}
		if self.has_uvs() {
			stride += size_of::<LiquidUv>();
		}
		if self.has_depths() {
			stride += 1;
		}
		stride
	}

	/// Resolves the `liquid_object_or_lvf` field of a layer.
	pub fn resolve(code: u16, resolver: Option<LiquidFormatResolver>) -> AdtResult<Self> {
		if code < LIQUID_OBJECT_THRESHOLD {
			Self::from_code(code).ok_or(AdtError::InvalidLiquidFormat(code))
		} else {
			resolver
				.and_then(|resolve| resolve(code))
				.ok_or(AdtError::UnresolvedLiquidFormat(code))
		}
	}
}

/// Per-vertex data of one layer, stored as separate arrays in file order.
/// Arrays the format does not carry stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidVertices {
	pub format: LiquidVertexFormat,
	pub heights: Vec<f32>,
	pub uvs: Vec<LiquidUv>,
	pub depths: Vec<u8>,
}

impl LiquidVertices {
	pub fn new(format: LiquidVertexFormat) -> Self {
		Self {
			format,
			heights: Vec::new(),
			uvs: Vec::new(),
			depths: Vec::new(),
		}
	}

	/// Vertices for `count` points, zero filled.
	pub fn zeroed(format: LiquidVertexFormat, count: usize) -> Self {
		let sized = |present: bool| if present { count } else { 0 };
		Self {
			format,
			heights: vec![0.0; sized(format.has_heights())],
			uvs: vec![LiquidUv::default(); sized(format.has_uvs())],
			depths: vec![0; sized(format.has_depths())],
		}
	}

	fn decode(payload: &[u8], offset: u32, format: LiquidVertexFormat, count: usize) -> AdtResult<Self> {
		let len = count.checked_mul(format.stride()).ok_or(AdtError::Overflow)?;
		let mut view = ByteView::new(slice_at(payload, offset, len)?);
		let mut vertices = Self::new(format);
		if format.has_heights() {
			vertices.heights = view.read_records(count)?;
		}
		if format.has_uvs() {
			vertices.uvs = view.read_records(count)?;
		}
		if format.has_depths() {
			vertices.depths = view.read_records(count)?;
		}
		Ok(vertices)
	}

	fn check(&self, count: usize) -> AdtResult<()> {
		let expect = |present: bool| if present { count } else { 0 };
		if self.heights.len() != expect(self.format.has_heights()) {
			return Err(AdtError::LiquidGeometry("height count does not match the layer size"));
		}
		if self.uvs.len() != expect(self.format.has_uvs()) {
			return Err(AdtError::LiquidGeometry("uv count does not match the layer size"));
		}
		if self.depths.len() != expect(self.format.has_depths()) {
			return Err(AdtError::LiquidGeometry("depth count does not match the layer size"));
		}
		Ok(())
	}

	fn encode(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		buffer.write_array(&self.heights)?;
		buffer.write_array(&self.uvs)?;
		buffer.write_bytes(&self.depths)
	}
}

/// One liquid layer of a cell, covering a rectangle of its 8x8 tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidLayer {
	pub liquid_type: u16,
	pub liquid_object_or_lvf: u16,
	pub min_height_level: f32,
	pub max_height_level: f32,
	pub x_offset: u8,
	pub y_offset: u8,
	pub width: u8,
	pub height: u8,
	/// One bit per tile of the rectangle. `None` means every tile exists.
	pub exists: Option<Vec<u8>>,
	/// `None` means a flat layer at `min_height_level`.
	pub vertices: Option<LiquidVertices>,
}

impl LiquidLayer {
	/// A flat layer covering the whole cell.
	pub fn new(liquid_type: u16, format: LiquidVertexFormat) -> Self {
		Self {
			liquid_type,
			liquid_object_or_lvf: format.code(),
			min_height_level: 0.0,
			max_height_level: 0.0,
			x_offset: 0,
			y_offset: 0,
			width: 8,
			height: 8,
			exists: None,
			vertices: None,
		}
	}

	/// `(x_offset, y_offset, width, height)`. Layers that name a liquid
	/// object always cover the whole cell.
	pub fn geometry(&self) -> (u8, u8, u8, u8) {
		if self.liquid_object_or_lvf >= LIQUID_OBJECT_THRESHOLD {
			(0, 0, 8, 8)
		} else {
			(self.x_offset, self.y_offset, self.width, self.height)
		}
	}

	pub fn vertex_count(&self) -> usize {
		let (_, _, width, height) = self.geometry();
		(width as usize + 1) * (height as usize + 1)
	}

	pub fn exists_len(&self) -> usize {
		let (_, _, width, height) = self.geometry();
		packed_len(width as usize * height as usize)
	}

	fn decode(payload: &[u8], instance: &LiquidInstance, resolver: Option<LiquidFormatResolver>) -> AdtResult<Self> {
		let mut layer = Self {
			liquid_type: instance.liquid_type,
			liquid_object_or_lvf: instance.liquid_object_or_lvf,
			min_height_level: instance.min_height_level,
			max_height_level: instance.max_height_level,
			x_offset: instance.x_offset,
			y_offset: instance.y_offset,
			width: instance.width,
			height: instance.height,
			exists: None,
			vertices: None,
		};
		if instance.offset_exists_bitmap != 0 {
			layer.exists = Some(slice_at(payload, instance.offset_exists_bitmap, layer.exists_len())?.to_vec());
		}
		if instance.offset_vertex_data != 0 {
			let format = LiquidVertexFormat::resolve(layer.liquid_object_or_lvf, resolver)?;
			layer.vertices = Some(LiquidVertices::decode(payload, instance.offset_vertex_data, format, layer.vertex_count())?);
		}
		Ok(layer)
	}

	fn instance(&self) -> LiquidInstance {
		LiquidInstance {
			liquid_type: self.liquid_type,
			liquid_object_or_lvf: self.liquid_object_or_lvf,
			min_height_level: self.min_height_level,
			max_height_level: self.max_height_level,
			x_offset: self.x_offset,
			y_offset: self.y_offset,
			width: self.width,
			height: self.height,
			offset_exists_bitmap: 0,
			offset_vertex_data: 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiquidCell {
	pub layers: Vec<LiquidLayer>,
	pub attributes: Option<LiquidAttributes>,
}

impl LiquidCell {
	pub fn is_empty(&self) -> bool {
		self.layers.is_empty() && self.attributes.is_none()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Liquids {
	cells: Box<[LiquidCell; CELLS_PER_TILE]>,
}

impl Default for Liquids {
	fn default() -> Self {
		Self { cells: cell_grid(|_| LiquidCell::default()) }
	}
}

impl Liquids {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cells(&self) -> &[LiquidCell; CELLS_PER_TILE] {
		&self.cells
	}

	pub fn cell(&self, index: usize) -> Option<&LiquidCell> {
		self.cells.get(index)
	}

	pub fn cell_mut(&mut self, index: usize) -> Option<&mut LiquidCell> {
		self.cells.get_mut(index)
	}

	/// Decodes a whole MH2O payload.
	pub fn decode(payload: &[u8], resolver: Option<LiquidFormatResolver>) -> AdtResult<Self> {
		let headers: Vec<LiquidChunkHeader> = records_at(payload, 0, CELLS_PER_TILE)?;
		let mut liquids = Self::new();
		for (cell, header) in liquids.cells.iter_mut().zip(&headers) {
			if header.offset_attributes != 0 {
				cell.attributes = records_at::<LiquidAttributes>(payload, header.offset_attributes, 1)?.pop();
			}
			crate::continue_if!(header.layer_count == 0);
			let instances: Vec<LiquidInstance> = records_at(payload, header.offset_instances, header.layer_count as usize)?;
			for instance in &instances {
				cell.layers.push(LiquidLayer::decode(payload, instance, resolver)?);
			}
		}
		Ok(liquids)
	}

	/// Writes the payload in a fixed order: the header table, then per cell
	/// its instances, attributes and per-layer bitmap and vertex data.
	pub fn encode(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		let base = buffer.tell();
		let relative = |position: usize| u32::try_from(position - base).map_err(|_| AdtError::Overflow);
		buffer.write_fill(0, HEADERS_SIZE)?;
		for (index, cell) in self.cells.iter().enumerate() {
			let mut header = LiquidChunkHeader::default();
			let instances_pos = buffer.tell();
			if !cell.layers.is_empty() {
				header.layer_count = u32::try_from(cell.layers.len()).map_err(|_| AdtError::Overflow)?;
				header.offset_instances = relative(instances_pos)?;
				buffer.write_fill(0, cell.layers.len() * size_of::<LiquidInstance>())?;
			}
			if let Some(attributes) = &cell.attributes {
				header.offset_attributes = relative(buffer.tell())?;
				buffer.write(attributes)?;
			}
			for (layer_index, layer) in cell.layers.iter().enumerate() {
				let (x, y, width, height) = layer.geometry();
				AdtError::range_check(x as usize + width as usize, 0..=8)?;
				AdtError::range_check(y as usize + height as usize, 0..=8)?;
				let mut instance = layer.instance();
				if let Some(exists) = &layer.exists {
					if exists.len() != layer.exists_len() {
						return Err(AdtError::LiquidGeometry("exists bitmap length does not match the layer size"));
					}
					instance.offset_exists_bitmap = relative(buffer.tell())?;
					buffer.write_bytes(exists)?;
				}
				if let Some(vertices) = &layer.vertices {
					vertices.check(layer.vertex_count())?;
					instance.offset_vertex_data = relative(buffer.tell())?;
					vertices.encode(buffer)?;
				}
				buffer.write_at(&instance, instances_pos + layer_index * size_of::<LiquidInstance>())?;
			}
			buffer.write_at(&header, base + index * size_of::<LiquidChunkHeader>())?;
		}
		Ok(())
	}
}

fn slice_at(payload: &[u8], offset: u32, len: usize) -> AdtResult<&[u8]> {
	let offset = offset as usize;
	offset.checked_add(len)
		.filter(|&end| end <= payload.len())
		.map(|end| &payload[offset..end])
		.ok_or(AdtError::LiquidOffset {
			offset,
			len,
			size: payload.len(),
		})
}

fn records_at<T: Pod>(payload: &[u8], offset: u32, count: usize) -> AdtResult<Vec<T>> {
	let len = count.checked_mul(size_of::<T>()).ok_or(AdtError::Overflow)?;
	ByteView::new(slice_at(payload, offset, len)?).read_records(count)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Liquids {
		let mut liquids = Liquids::new();
		let cell = liquids.cell_mut(0).unwrap();
		let mut flat = LiquidLayer::new(2, LiquidVertexFormat::DepthOnly);
		flat.min_height_level = 12.5;
		cell.layers.push(flat);
		let mut river = LiquidLayer::new(1, LiquidVertexFormat::HeightDepth);
		river.x_offset = 2;
		river.width = 3;
		river.height = 2;
		river.exists = Some(vec![0b0011_1011]);
		let mut vertices = LiquidVertices::zeroed(LiquidVertexFormat::HeightDepth, river.vertex_count());
		vertices.heights[3] = 4.0;
		vertices.depths[1] = 9;
		river.vertices = Some(vertices);
		cell.layers.push(river);
		cell.attributes = Some(LiquidAttributes { fishable: u64::MAX, deep: 1 });

		let cell = liquids.cell_mut(255).unwrap();
		let mut magma = LiquidLayer::new(19, LiquidVertexFormat::HeightUvDepth);
		magma.vertices = Some(LiquidVertices::zeroed(LiquidVertexFormat::HeightUvDepth, magma.vertex_count()));
		cell.layers.push(magma);
		liquids
	}

	fn encode(liquids: &Liquids) -> AdtResult<Vec<u8>> {
		let mut buffer = ByteBuffer::new();
		liquids.encode(&mut buffer)?;
		Ok(buffer.into_inner())
	}

	#[test]
	fn round_trip() -> AdtResult<()> {
		let liquids = sample();
		let bytes = encode(&liquids)?;
		let decoded = Liquids::decode(&bytes, None)?;
		assert_eq!(decoded, liquids);
		assert_eq!(encode(&decoded)?, bytes);
		assert!(decoded.cell(1).unwrap().is_empty());
		Ok(())
	}

	#[test]
	fn formats() {
		assert_eq!(LiquidVertexFormat::HeightDepth.stride(), 5);
		assert_eq!(LiquidVertexFormat::HeightUv.stride(), 8);
		assert_eq!(LiquidVertexFormat::DepthOnly.stride(), 1);
		assert_eq!(LiquidVertexFormat::HeightUvDepth.stride(), 9);
		assert!(matches!(LiquidVertexFormat::resolve(7, None), Err(AdtError::InvalidLiquidFormat(7))));
	}

	#[test]
	fn liquid_objects_need_a_resolver() -> AdtResult<()> {
		let mut liquids = Liquids::new();
		let mut layer = LiquidLayer::new(100, LiquidVertexFormat::HeightUv);
		layer.liquid_object_or_lvf = 1000;
		// Liquid objects always span the whole cell.
		layer.width = 1;
		layer.vertices = Some(LiquidVertices::zeroed(LiquidVertexFormat::HeightUv, 81));
		liquids.cell_mut(4).unwrap().layers.push(layer);
		let bytes = encode(&liquids)?;
		assert!(matches!(Liquids::decode(&bytes, None), Err(AdtError::UnresolvedLiquidFormat(1000))));
		let resolver: LiquidFormatResolver = |id| (id == 1000).then_some(LiquidVertexFormat::HeightUv);
		assert_eq!(Liquids::decode(&bytes, Some(resolver))?, liquids);
		Ok(())
	}

	#[test]
	fn geometry_is_checked_on_write() {
		let mut liquids = Liquids::new();
		let mut layer = LiquidLayer::new(1, LiquidVertexFormat::HeightDepth);
		layer.vertices = Some(LiquidVertices::zeroed(LiquidVertexFormat::HeightDepth, 80));
		liquids.cell_mut(0).unwrap().layers.push(layer);
		assert!(matches!(encode(&liquids), Err(AdtError::LiquidGeometry(_))));

		let mut outside = LiquidLayer::new(1, LiquidVertexFormat::DepthOnly);
		outside.x_offset = 6;
		outside.width = 4;
		liquids.cell_mut(0).unwrap().layers = vec![outside];
		assert!(matches!(encode(&liquids), Err(AdtError::OutOfRange)));
	}

	#[test]
	fn offsets_are_checked_on_read() -> AdtResult<()> {
		assert!(matches!(Liquids::decode(&[0; 100], None), Err(AdtError::LiquidOffset { offset: 0, .. })));
		let mut bytes = encode(&Liquids::new())?;
		// Cell 0 claims one instance past the end of the payload.
		bytes[0..4].copy_from_slice(&4000u32.to_le_bytes());
		bytes[4..8].copy_from_slice(&1u32.to_le_bytes());
		assert!(matches!(
			Liquids::decode(&bytes, None),
			Err(AdtError::LiquidOffset { offset: 4000, len: 24, .. })
		));
		Ok(())
	}
}
