//! Fixed-layout records stored in tile chunks.
//! Each one is `#[repr(C)]` with no padding so that it is copied to and
//! from the little-endian file bytes as is.

use bytemuck::{Pod, Zeroable};

use super::flags::*;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vec3 {
	pub x: f32,
	pub y: f32,
	pub z: f32,
}

impl Vec3 {
	pub const fn new(x: f32, y: f32, z: f32) -> Self {
		Self { x, y, z }
	}
}

/// Axis aligned bounding box.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct AaBox {
	pub min: Vec3,
	pub max: Vec3,
}

/// Root file header (MHDR).
/// Offsets are relative to the start of this record. Most of them date from
/// before the split files and are zero in files written by this crate; only
/// `mfbo` and `mh2o` are kept up to date.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Mhdr {
	pub flags: u32,
	pub mcin: u32,
	pub mtex: u32,
	pub mmdx: u32,
	pub mmid: u32,
	pub mwmo: u32,
	pub mwid: u32,
	pub mddf: u32,
	pub modf: u32,
	pub mfbo: u32,
	pub mh2o: u32,
	pub mtxf: u32,
	/// Texture amplifier. An MAMP chunk overrides it.
	pub mamp_value: u8,
	pub padding: [u8; 3],
	pub unused: [u32; 3],
}

impl Mhdr {
	pub fn flags(&self) -> MhdrFlags {
		MhdrFlags::from_bits_truncate(self.flags)
	}

	pub fn set_flags(&mut self, flags: MhdrFlags) {
		self.flags = flags.bits();
	}
}

/// Flight bounds (MFBO): two 3x3 height planes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Mfbo {
	pub maximum: [i16; 9],
	pub minimum: [i16; 9],
}

/// The 128 byte record at the start of every root cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct McnkHeader {
	pub flags: u32,
	pub index_x: u32,
	pub index_y: u32,
	pub n_layers: u32,
	pub n_doodad_refs: u32,
	/// Before MoP: offsets of MCVT and MCNR. From MoP: the 64-bit high
	/// resolution hole mask.
	pub height_or_holes: [u32; 2],
	pub ofs_layer: u32,
	pub ofs_refs: u32,
	pub ofs_alpha: u32,
	pub size_alpha: u32,
	pub ofs_shadow: u32,
	pub size_shadow: u32,
	pub area_id: u32,
	pub n_map_obj_refs: u32,
	pub holes_low_res: u16,
	pub unknown_but_used: u16,
	/// 2 bits per entry naming the dominant layer, used for detail doodads.
	pub pred_tex: [u16; 8],
	pub no_effect_doodad: [u8; 8],
	pub ofs_snd_emitters: u32,
	pub n_snd_emitters: u32,
	pub ofs_liquid: u32,
	pub size_liquid: u32,
	pub position: [f32; 3],
	pub ofs_mccv: u32,
	pub ofs_mclv: u32,
	pub unused: u32,
}

impl McnkHeader {
	pub fn flags(&self) -> McnkFlags {
		McnkFlags::from_bits_truncate(self.flags)
	}

	pub fn set_flags(&mut self, flags: McnkFlags) {
		self.flags = flags.bits();
	}

	pub fn holes_high_res(&self) -> u64 {
		self.height_or_holes[0] as u64 | (self.height_or_holes[1] as u64) << 32
	}

	pub fn set_holes_high_res(&mut self, holes: u64) {
		self.height_or_holes = [holes as u32, (holes >> 32) as u32];
	}
}

/// A cell normal, components scaled to -127..=127.
pub type Normal = [i8; 3];

/// Vertex color or lighting (MCCV, MCLV), stored BGRA.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct VertexColor {
	pub b: u8,
	pub g: u8,
	pub r: u8,
	pub a: u8,
}

impl VertexColor {
	/// The value that leaves vertex colors unchanged.
	pub const NEUTRAL: VertexColor = VertexColor { b: 0x7F, g: 0x7F, r: 0x7F, a: 0x7F };
}

/// MCSE entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct SoundEmitter {
	pub entry_id: u32,
	pub position: Vec3,
	pub size: Vec3,
}

/// MCBB entry: the slice of a blend mesh drawn in one cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct BlendBatch {
	pub mbmh_index: u32,
	pub index_count: u32,
	pub index_first: u32,
	pub vertex_count: u32,
	pub vertex_first: u32,
}

/// MBMH entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct BlendMeshHeader {
	pub map_object_id: u32,
	pub texture_id: u32,
	pub unknown: u32,
	pub index_count: u32,
	pub vertex_count: u32,
	pub index_start: u32,
	pub vertex_start: u32,
}

/// MBBB entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct BlendMeshBounds {
	pub map_object_id: u32,
	pub bounding: AaBox,
}

/// MBNV entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct BlendMeshVertex {
	pub position: Vec3,
	pub normal: Vec3,
	pub texture_coordinates: [f32; 2],
	pub color: [[u8; 4]; 3],
}

/// MCLY entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct SmLayer {
	pub texture_id: u32,
	pub flags: u32,
	/// Byte offset of this layer's alpha map within MCAL. Rewritten on write.
	pub offset_in_mcal: u32,
	pub effect_id: u32,
}

impl SmLayer {
	pub fn new(texture_id: u32, flags: MclyFlags) -> Self {
		Self {
			texture_id,
			flags: flags.bits(),
			..Default::default()
		}
	}

	pub fn flags(&self) -> MclyFlags {
		MclyFlags::from_bits_truncate(self.flags)
	}

	pub fn set_flags(&mut self, flags: MclyFlags) {
		self.flags = flags.bits();
	}
}

/// MTXP entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct TextureParams {
	pub flags: u32,
	pub height_scale: f32,
	pub height_offset: f32,
	pub padding: u32,
}

/// MAMP: texture size amplifier, `2^value` scaled.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Amplifier {
	pub value: u8,
	pub padding: [u8; 3],
}

/// MTCG entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ColorGrading {
	pub unknown0: u32,
	pub unknown1: u32,
	pub color_grading_fdid: u32,
	pub color_grading_ramp_fdid: u32,
}

/// Model placement (MDDF, and MLDD in LOD files).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Mddf {
	/// Index into MMID, or a file data id with [MddfFlags::FILE_DATA_ID].
	pub name_id: u32,
	pub unique_id: u32,
	pub position: Vec3,
	/// Degrees.
	pub rotation: Vec3,
	/// 1024 is 1.0.
	pub scale: u16,
	pub flags: u16,
}

impl Mddf {
	pub fn flags(&self) -> MddfFlags {
		MddfFlags::from_bits_truncate(self.flags)
	}
}

/// Map object placement (MODF).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Modf {
	pub name_id: u32,
	pub unique_id: u32,
	pub position: Vec3,
	pub rotation: Vec3,
	pub extents: AaBox,
	pub flags: u16,
	pub doodad_set: u16,
	pub name_set: u16,
	pub scale: u16,
}

impl Modf {
	pub fn flags(&self) -> ModfFlags {
		ModfFlags::from_bits_truncate(self.flags)
	}
}

/// MWDR entry: a range into MWDS.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DoodadSetRange {
	pub begin: u32,
	pub end: u32,
}

/// LOD map object placement (MLMD).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Mlmd {
	pub name_id: u32,
	pub unique_id: u32,
	pub position: Vec3,
	pub rotation: Vec3,
	pub flags: u16,
	pub doodad_set: u16,
	pub name_set: u16,
	pub scale: u16,
}

/// MLMX / MLDX entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LodExtent {
	pub bounding: AaBox,
	pub radius: f32,
}

/// MLFD: which slices of the LOD placement arrays each detail level uses.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Mlfd {
	pub m2_lod_offset: [u32; 3],
	pub m2_lod_length: [u32; 3],
	pub wmo_lod_offset: [u32; 3],
	pub wmo_lod_length: [u32; 3],
}

/// MH2O per-cell header. Offsets are relative to the MH2O payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LiquidChunkHeader {
	pub offset_instances: u32,
	pub layer_count: u32,
	pub offset_attributes: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LiquidAttributes {
	pub fishable: u64,
	pub deep: u64,
}

/// MH2O layer record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LiquidInstance {
	pub liquid_type: u16,
	/// A vertex format below 42, a liquid object id otherwise.
	pub liquid_object_or_lvf: u16,
	pub min_height_level: f32,
	pub max_height_level: f32,
	pub x_offset: u8,
	pub y_offset: u8,
	pub width: u8,
	pub height: u8,
	pub offset_exists_bitmap: u32,
	pub offset_vertex_data: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LiquidUv {
	pub x: u16,
	pub y: u16,
}

#[test]
fn record_sizes() {
	use std::mem::size_of;
	assert_eq!(size_of::<Mhdr>(), 64);
	assert_eq!(size_of::<Mfbo>(), 36);
	assert_eq!(size_of::<McnkHeader>(), 128);
	assert_eq!(size_of::<SoundEmitter>(), 28);
	assert_eq!(size_of::<BlendBatch>(), 20);
	assert_eq!(size_of::<BlendMeshHeader>(), 28);
	assert_eq!(size_of::<BlendMeshBounds>(), 28);
	assert_eq!(size_of::<BlendMeshVertex>(), 44);
	assert_eq!(size_of::<SmLayer>(), 16);
	assert_eq!(size_of::<Amplifier>(), 4);
	assert_eq!(size_of::<Mddf>(), 36);
	assert_eq!(size_of::<Modf>(), 64);
	assert_eq!(size_of::<Mlmd>(), 40);
	assert_eq!(size_of::<LodExtent>(), 28);
	assert_eq!(size_of::<Mlfd>(), 48);
	assert_eq!(size_of::<LiquidChunkHeader>(), 12);
	assert_eq!(size_of::<LiquidInstance>(), 24);
}

#[test]
fn high_res_holes() {
	let mut header: McnkHeader = Zeroable::zeroed();
	header.set_holes_high_res(0x0123_4567_89AB_CDEF);
	assert_eq!(header.height_or_holes, [0x89AB_CDEF, 0x0123_4567]);
	assert_eq!(header.holes_high_res(), 0x0123_4567_89AB_CDEF);
}
