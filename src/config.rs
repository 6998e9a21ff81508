use crate::{
	adt::{
		alphamap::AlphaFormat,
		liquid::LiquidFormatResolver,
	},
	io::{
		buffer::ReservePolicy,
		version::{ClientVersion, LodLevel},
	},
};

/// Settings shared by every tile read and write.
/// None of these are stored in the files themselves; the caller knows them
/// from the client being targeted and from the map's WDT flags.
#[derive(Debug, Clone, Copy)]
pub struct TileConfig {
	/// Selects which optional chunk groups exist.
	pub version: ClientVersion,
	/// Which object placement file is handled.
	pub lod_level: LodLevel,
	/// Bit depth of alpha maps in texture files.
	pub alpha_format: AlphaFormat,
	/// Repairs the last row and column of low resolution alpha maps and of
	/// shadow maps on read. Leave this off when round-tripping files.
	pub fix_alphamap: bool,
	/// Growth policy of the buffers produced by writes.
	pub reserve_policy: ReservePolicy,
	/// Maps liquid object ids to vertex formats.
	pub liquid_format_resolver: Option<LiquidFormatResolver>,
}

impl TileConfig {
	pub fn new(version: ClientVersion) -> Self {
		Self {
			version,
			..Default::default()
		}
	}

	pub fn with_lod_level(mut self, lod_level: LodLevel) -> Self {
		self.lod_level = lod_level;
		self
	}

	pub fn with_alpha_format(mut self, alpha_format: AlphaFormat) -> Self {
		self.alpha_format = alpha_format;
		self
	}

	pub fn with_fix_alphamap(mut self, fix_alphamap: bool) -> Self {
		self.fix_alphamap = fix_alphamap;
		self
	}

	pub fn with_reserve_policy(mut self, reserve_policy: ReservePolicy) -> Self {
		self.reserve_policy = reserve_policy;
		self
	}

	pub fn with_liquid_format_resolver(mut self, resolver: LiquidFormatResolver) -> Self {
		self.liquid_format_resolver = Some(resolver);
		self
	}
}

impl Default for TileConfig {
	fn default() -> Self {
		Self {
			version: ClientVersion::default(),
			lod_level: LodLevel::Normal,
			alpha_format: AlphaFormat::HighRes,
			fix_alphamap: false,
			reserve_policy: ReservePolicy::Double,
			liquid_format_resolver: None,
		}
	}
}

#[test]
fn builder() {
	let config = TileConfig::new(ClientVersion::Legion)
		.with_lod_level(LodLevel::Lod)
		.with_alpha_format(AlphaFormat::LowRes)
		.with_fix_alphamap(true);
	assert_eq!(config.version, ClientVersion::Legion);
	assert_eq!(config.lod_level, LodLevel::Lod);
	assert_eq!(config.alpha_format, AlphaFormat::LowRes);
	assert!(config.fix_alphamap);
	assert_eq!(config.reserve_policy, ReservePolicy::Double);
	assert!(config.liquid_format_resolver.is_none());
}

#[test]
fn defaults_target_split_files() {
	let config = TileConfig::default();
	assert_eq!(config.version, ClientVersion::default());
	assert!(config.version.has_split_files());
	assert_eq!(config.lod_level, LodLevel::Normal);
}
