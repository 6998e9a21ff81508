//! File kind dispatch and the storage convenience layer.

use crate::{
	io::{
		buffer::*,
		storage::{FileKey, FileStorage},
		version::LodLevel,
	},
	AdtResult,
	TileConfig,
};

use super::{
	obj::ObjTile,
	root::RootTile,
	tex::TexTile,
};

/// Which of the split files of a tile a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
	Root,
	Tex,
	Obj(LodLevel),
}

impl FileKind {
	/// Guesses the kind from a file name such as `azeroth_32_48_obj1.adt`.
	/// `_tex1` is the distant texture file. It shares the chunk layout of
	/// `_tex0` and is read with the same schema.
	pub fn from_filename(name: &str) -> Self {
		let name = name.to_ascii_lowercase();
		let stem = name.strip_suffix(".adt").unwrap_or(&name);
		if stem.ends_with("_tex0") || stem.ends_with("_tex1") {
			FileKind::Tex
		} else if stem.ends_with("_obj0") {
			FileKind::Obj(LodLevel::Normal)
		} else if stem.ends_with("_obj1") {
			FileKind::Obj(LodLevel::Lod)
		} else {
			FileKind::Root
		}
	}

	/// The configuration to read this kind with. Object files carry their LOD level in the kind.
	pub fn config(self, config: &TileConfig) -> TileConfig {
		match self {
			FileKind::Obj(level) => config.with_lod_level(level),
			FileKind::Root | FileKind::Tex => *config,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileFile {
	Root(RootTile),
	Tex(TexTile),
	Obj(ObjTile),
}

impl TileFile {
	/// An empty file of `kind`.
	pub fn new(kind: FileKind, config: &TileConfig) -> AdtResult<Self> {
		let config = kind.config(config);
		Ok(match kind {
			FileKind::Root => TileFile::Root(RootTile::new(&config)),
			FileKind::Tex => TileFile::Tex(TexTile::new(&config)?),
			FileKind::Obj(_) => TileFile::Obj(ObjTile::new(&config)?),
		})
	}

	pub fn kind(&self) -> FileKind {
		match self {
			TileFile::Root(_) => FileKind::Root,
			TileFile::Tex(_) => FileKind::Tex,
			TileFile::Obj(tile) => FileKind::Obj(tile.lod_level()),
		}
	}

	pub fn read(view: &mut ByteView<'_>, kind: FileKind, config: &TileConfig) -> AdtResult<Self> {
		let config = kind.config(config);
		Ok(match kind {
			FileKind::Root => TileFile::Root(RootTile::read(view, &config)?),
			FileKind::Tex => TileFile::Tex(TexTile::read(view, &config)?),
			FileKind::Obj(_) => TileFile::Obj(ObjTile::read(view, &config)?),
		})
	}

	pub fn write(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		match self {
			TileFile::Root(tile) => tile.write(buffer),
			TileFile::Tex(tile) => tile.write(buffer),
			TileFile::Obj(tile) => tile.write(buffer),
		}
	}

	/// Encodes the file into a fresh buffer grown with `policy`.
	pub fn to_bytes(&self, policy: ReservePolicy) -> AdtResult<Vec<u8>> {
		let mut buffer = ByteBuffer::with_policy(policy);
		self.write(&mut buffer)?;
		Ok(buffer.into_inner())
	}

	/// Reads the file stored under `key`. Storage failures come back as
	/// [AdtError::Storage](crate::AdtError::Storage).
	pub fn load<S: FileStorage + ?Sized>(storage: &S, key: &FileKey, kind: FileKind, config: &TileConfig) -> AdtResult<Self> {
		log::debug!("Loading {:?} tile from {}.", kind, key);
		let bytes = storage.read_file(key)?;
		Self::read(&mut ByteView::new(&bytes), kind, config)
	}

	pub fn save<S: FileStorage + ?Sized>(&self, storage: &mut S, key: &FileKey, config: &TileConfig) -> AdtResult<()> {
		log::debug!("Saving {:?} tile to {}.", self.kind(), key);
		let bytes = self.to_bytes(config.reserve_policy)?;
		storage.write_file(key, &bytes)?;
		Ok(())
	}
}

impl From<RootTile> for TileFile {
	fn from(value: RootTile) -> Self {
		TileFile::Root(value)
	}
}

impl From<TexTile> for TileFile {
	fn from(value: TexTile) -> Self {
		TileFile::Tex(value)
	}
}

impl From<ObjTile> for TileFile {
	fn from(value: ObjTile) -> Self {
		TileFile::Obj(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		io::storage::{MemoryStorage, StorageError},
		AdtError,
		ClientVersion,
	};

	#[test]
	fn kinds_from_names() {
		assert_eq!(FileKind::from_filename("Azeroth_32_48.adt"), FileKind::Root);
		assert_eq!(FileKind::from_filename("azeroth_32_48_tex0.adt"), FileKind::Tex);
		assert_eq!(FileKind::from_filename("AZEROTH_32_48_TEX1.ADT"), FileKind::Tex);
		assert_eq!(FileKind::from_filename("azeroth_32_48_obj0.adt"), FileKind::Obj(LodLevel::Normal));
		assert_eq!(FileKind::from_filename("azeroth_32_48_obj1.adt"), FileKind::Obj(LodLevel::Lod));
		assert_eq!(FileKind::from_filename("azeroth_32_48_lod.adt"), FileKind::Root);
	}

	#[test]
	fn kind_selects_the_lod_level() -> AdtResult<()> {
		let config = TileConfig::new(ClientVersion::Legion);
		let file = TileFile::new(FileKind::Obj(LodLevel::Lod), &config)?;
		assert_eq!(file.kind(), FileKind::Obj(LodLevel::Lod));
		let bytes = file.to_bytes(ReservePolicy::Strict)?;
		let read = TileFile::read(&mut ByteView::new(&bytes), FileKind::Obj(LodLevel::Lod), &config)?;
		assert_eq!(read, file);
		Ok(())
	}

	#[test]
	fn load_and_save() -> AdtResult<()> {
		let config = TileConfig::new(ClientVersion::Mop);
		let mut storage = MemoryStorage::new();
		let key = FileKey::path("World/Maps/Test/Test_1_2_tex0.adt");
		let kind = key.file_name().map(FileKind::from_filename).unwrap_or(FileKind::Root);
		assert_eq!(kind, FileKind::Tex);
		assert!(matches!(
			TileFile::load(&storage, &key, kind, &config),
			Err(AdtError::Storage(StorageError::NotFound))
		));
		let file = TileFile::new(kind, &config)?;
		file.save(&mut storage, &key, &config)?;
		assert!(storage.exists(&key));
		assert_eq!(TileFile::load(&storage, &key, kind, &config)?, file);
		Ok(())
	}
}
