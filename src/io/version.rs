/// Client releases in release order. Schema selection compares these,
/// so the discriminants only need to be ordered, not contiguous.
/// The re-released classic clients slot in where they shipped.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ClientVersion {
	Classic = 0,
	Tbc = 10,
	Wotlk = 20,
	/// The first client with split files.
	#[default]
	Cata = 30,
	Mop = 40,
	Wod = 50,
	Legion = 60,
	Bfa = 70,
	ClassicNew = 71,
	Sl = 80,
	TbcNew = 81,
	Df = 90,
	WotlkNew = 91,
}

impl ClientVersion {
	pub const ALL: [ClientVersion; 13] = [
		ClientVersion::Classic,
		ClientVersion::Tbc,
		ClientVersion::Wotlk,
		ClientVersion::Cata,
		ClientVersion::Mop,
		ClientVersion::Wod,
		ClientVersion::Legion,
		ClientVersion::Bfa,
		ClientVersion::ClassicNew,
		ClientVersion::Sl,
		ClientVersion::TbcNew,
		ClientVersion::Df,
		ClientVersion::WotlkNew,
	];

	/// Terrain data was split into root/texture/object files starting with Cataclysm.
	pub fn has_split_files(self) -> bool {
		self >= ClientVersion::Cata
	}
}

/// Which object placement file is being handled.
/// This is a second axis of schema selection, independent of [ClientVersion].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LodLevel {
	#[default]
	Normal,
	Lod,
}

/// Inclusive version bounds. A missing bound is open ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionRange {
	pub min: Option<ClientVersion>,
	pub max: Option<ClientVersion>,
}

impl VersionRange {
	pub const ANY: VersionRange = VersionRange { min: None, max: None };

	pub const fn from(min: ClientVersion) -> Self {
		Self { min: Some(min), max: None }
	}

	pub const fn until(max: ClientVersion) -> Self {
		Self { min: None, max: Some(max) }
	}

	pub const fn between(min: ClientVersion, max: ClientVersion) -> Self {
		Self { min: Some(min), max: Some(max) }
	}

	pub fn contains(&self, version: ClientVersion) -> bool {
		self.min.map_or(true, |min| min <= version)
		&& self.max.map_or(true, |max| version <= max)
	}
}

/// The condition under which an optional group of chunks exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
	pub versions: VersionRange,
	/// `None` means the group exists for every LOD level.
	pub level: Option<LodLevel>,
}

impl Gate {
	pub const fn versions(versions: VersionRange) -> Self {
		Self { versions, level: None }
	}

	pub const fn at_level(versions: VersionRange, level: LodLevel) -> Self {
		Self { versions, level: Some(level) }
	}

	pub fn admits(&self, version: ClientVersion, level: LodLevel) -> bool {
		self.versions.contains(version)
		&& self.level.map_or(true, |required| required == level)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ordering() {
		let mut sorted = ClientVersion::ALL;
		sorted.sort();
		assert_eq!(sorted, ClientVersion::ALL);
		assert!(ClientVersion::ClassicNew > ClientVersion::Bfa);
		assert!(ClientVersion::ClassicNew < ClientVersion::Sl);
		assert!(!ClientVersion::Wotlk.has_split_files());
		assert!(ClientVersion::Cata.has_split_files());
	}

	#[test]
	fn ranges() {
		let mop_up = VersionRange::from(ClientVersion::Mop);
		assert!(!mop_up.contains(ClientVersion::Cata));
		assert!(mop_up.contains(ClientVersion::Mop));
		assert!(mop_up.contains(ClientVersion::WotlkNew));
		let legacy = VersionRange::between(ClientVersion::Cata, ClientVersion::Legion);
		assert!(legacy.contains(ClientVersion::Legion));
		assert!(!legacy.contains(ClientVersion::Bfa));
		assert!(VersionRange::until(ClientVersion::Tbc).contains(ClientVersion::Classic));
		assert!(VersionRange::ANY.contains(ClientVersion::Df));
	}

	#[test]
	fn gates() {
		let lod = Gate::at_level(VersionRange::from(ClientVersion::Legion), LodLevel::Lod);
		assert!(lod.admits(ClientVersion::Legion, LodLevel::Lod));
		assert!(!lod.admits(ClientVersion::Legion, LodLevel::Normal));
		assert!(!lod.admits(ClientVersion::Wod, LodLevel::Lod));
		let any_level = Gate::versions(VersionRange::from(ClientVersion::Sl));
		assert!(any_level.admits(ClientVersion::Df, LodLevel::Normal));
		assert!(any_level.admits(ClientVersion::Df, LodLevel::Lod));
	}
}
