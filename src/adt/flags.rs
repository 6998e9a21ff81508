//! Flag fields of tile records.
//! Flags are only ever added by later clients, never renumbered, so each set
//! lists the version a bit first appeared in.

use bitflags::bitflags;

use crate::versioned_flags;

bitflags! {
	/// Root header flags.
	pub struct MhdrFlags: u32 {
		/// The tile carries flight bounds (MFBO).
		const FLIGHT_BOUNDS = 0x1;
		const NORTHREND = 0x2;
	}
}

versioned_flags!{ MhdrFlags {
	FLIGHT_BOUNDS => Classic,
	NORTHREND => Wotlk,
}}

bitflags! {
	/// Root cell header flags.
	pub struct McnkFlags: u32 {
		const HAS_MCSH = 0x1;
		const IMPASS = 0x2;
		const LIQUID_RIVER = 0x4;
		const LIQUID_OCEAN = 0x8;
		const LIQUID_MAGMA = 0x10;
		const LIQUID_SLIME = 0x20;
		const HAS_MCCV = 0x40;
		const UNKNOWN_80 = 0x80;
		const DO_NOT_FIX_ALPHA_MAP = 0x8000;
		/// The 64-bit hole mask replaces the low resolution one.
		const HIGH_RES_HOLES = 0x10000;
	}
}

versioned_flags!{ McnkFlags {
	HAS_MCSH => Classic,
	IMPASS => Classic,
	LIQUID_RIVER => Classic,
	LIQUID_OCEAN => Classic,
	LIQUID_MAGMA => Classic,
	LIQUID_SLIME => Classic,
	HAS_MCCV => Wotlk,
	UNKNOWN_80 => Wotlk,
	DO_NOT_FIX_ALPHA_MAP => Wotlk,
	HIGH_RES_HOLES => Mop,
}}

bitflags! {
	/// Texture layer flags.
	pub struct MclyFlags: u32 {
		/// Three bits of rotation in 45 degree steps.
		const ANIMATION_ROTATION = 0x7;
		const ANIMATION_SPEED = 0x38;
		const ANIMATION_ENABLED = 0x40;
		const OVERBRIGHT = 0x80;
		const USE_ALPHA_MAP = 0x100;
		const ALPHA_MAP_COMPRESSED = 0x200;
		const USE_CUBE_MAP_REFLECTION = 0x400;
		const UNKNOWN_800 = 0x800;
		const UNKNOWN_1000 = 0x1000;
	}
}

versioned_flags!{ MclyFlags {
	ANIMATION_ROTATION => Classic,
	ANIMATION_SPEED => Classic,
	ANIMATION_ENABLED => Classic,
	OVERBRIGHT => Classic,
	USE_ALPHA_MAP => Classic,
	ALPHA_MAP_COMPRESSED => Wotlk,
	USE_CUBE_MAP_REFLECTION => Wotlk,
	UNKNOWN_800 => Cata,
	UNKNOWN_1000 => Cata,
}}

bitflags! {
	/// Model placement flags.
	pub struct MddfFlags: u16 {
		const BIODOME = 0x1;
		const SHRUBBERY = 0x2;
		const UNKNOWN_4 = 0x4;
		const UNKNOWN_8 = 0x8;
		const LIQUID_KNOWN = 0x20;
		/// `name_id` is a file data id instead of an MMID index.
		const FILE_DATA_ID = 0x40;
		const UNKNOWN_100 = 0x100;
	}
}

versioned_flags!{ MddfFlags {
	BIODOME => Classic,
	SHRUBBERY => Classic,
	UNKNOWN_4 => Legion,
	UNKNOWN_8 => Legion,
	LIQUID_KNOWN => Legion,
	FILE_DATA_ID => Legion,
	UNKNOWN_100 => Legion,
}}

bitflags! {
	/// Map object placement flags.
	pub struct ModfFlags: u16 {
		const DESTROYABLE = 0x1;
		const USE_LOD = 0x2;
		const HAS_SCALE = 0x4;
		/// `name_id` is a file data id instead of an MWID index.
		const FILE_DATA_ID = 0x8;
		/// Doodad sets come from MWDS instead of the model.
		const USE_SETS_FROM_MWDS = 0x80;
	}
}

versioned_flags!{ ModfFlags {
	DESTROYABLE => Classic,
	USE_LOD => Wod,
	HAS_SCALE => Legion,
	FILE_DATA_ID => Legion,
	USE_SETS_FROM_MWDS => Sl,
}}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ClientVersion;

	#[test]
	fn flags_only_grow() {
		for pair in ClientVersion::ALL.windows(2) {
			let (earlier, later) = (pair[0], pair[1]);
			assert!(McnkFlags::supported(later).contains(McnkFlags::supported(earlier)));
			assert!(ModfFlags::supported(later).contains(ModfFlags::supported(earlier)));
		}
	}

	#[test]
	fn masking() {
		let flags = McnkFlags::HAS_MCCV | McnkFlags::HIGH_RES_HOLES;
		assert_eq!(flags.for_version(ClientVersion::Cata), McnkFlags::HAS_MCCV);
		assert_eq!(flags.for_version(ClientVersion::Mop), flags);
		assert!(!MclyFlags::supported(ClientVersion::Tbc).contains(MclyFlags::ALPHA_MAP_COMPRESSED));
		assert_eq!(MddfFlags::supported(ClientVersion::Wod), MddfFlags::BIODOME | MddfFlags::SHRUBBERY);
	}
}
