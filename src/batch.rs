//! Bulk conversion across many tiles.
//!
//! Tiles share no state, so every key is decoded, transformed and encoded
//! on its own rayon task against its own buffer. Storage is only read from
//! inside the parallel section; the results are written back afterwards on
//! the calling thread.

use rayon::prelude::*;

use crate::{
	adt::file::{FileKind, TileFile},
	io::storage::{FileKey, FileStorage},
	AdtResult,
	TileConfig,
};

/// The outcome of one key of a batch.
#[derive(Debug)]
pub struct TileOutcome<T> {
	pub key: FileKey,
	pub result: AdtResult<T>,
}

impl<T> TileOutcome<T> {
	pub fn is_ok(&self) -> bool {
		self.result.is_ok()
	}
}

/// Loads every key in parallel. The order of the outcomes follows `keys`.
pub fn load_tiles<S>(storage: &S, keys: &[(FileKey, FileKind)], config: &TileConfig) -> Vec<TileOutcome<TileFile>>
where
S: FileStorage + Sync + ?Sized {
	keys.par_iter()
		.map(|(key, kind)| TileOutcome {
			key: key.clone(),
			result: TileFile::load(storage, key, *kind, config),
		})
		.collect()
}

/// Loads, transforms and re-encodes every key in parallel, then saves the
/// tiles that succeeded. A tile that fails at any step is not written.
pub fn transform_tiles<S, F>(
	storage: &mut S,
	keys: &[(FileKey, FileKind)],
	config: &TileConfig,
	transform: F,
) -> Vec<TileOutcome<()>>
where
S: FileStorage + Sync + ?Sized,
F: Fn(&FileKey, &mut TileFile) -> AdtResult<()> + Sync {
	log::debug!("Transforming {} tiles.", keys.len());
	let encoded: Vec<TileOutcome<Vec<u8>>> = {
		let shared: &S = storage;
		keys.par_iter()
			.map(|(key, kind)| {
				let result = TileFile::load(shared, key, *kind, config).and_then(|mut file| {
					transform(key, &mut file)?;
					file.to_bytes(config.reserve_policy)
				});
				TileOutcome { key: key.clone(), result }
			})
			.collect()
	};
	let outcomes: Vec<TileOutcome<()>> = encoded.into_iter()
		.map(|TileOutcome { key, result }| {
			let result = result.and_then(|bytes| {
				storage.write_file(&key, &bytes)?;
				Ok(())
			});
			if let Err(err) = &result {
				log::warn!("Tile {} failed: {}", key, err);
			}
			TileOutcome { key, result }
		})
		.collect();
	log::debug!(
		"Transformed {} of {} tiles.",
		outcomes.iter().filter(|outcome| outcome.is_ok()).count(),
		outcomes.len(),
	);
	outcomes
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
	fn transform_and_write_back() -> AdtResult<()> {
		let config = TileConfig::new(ClientVersion::Wotlk);
		let mut storage = MemoryStorage::new();
		let keys: Vec<(FileKey, FileKind)> = (0..4)
			.map(|index| (FileKey::path(format!("world\\maps\\test\\test_{index}_0.adt")), FileKind::Root))
			.collect();
		for (key, kind) in &keys {
			TileFile::new(*kind, &config)?.save(&mut storage, key, &config)?;
		}
		let mut all = keys.clone();
		all.push((FileKey::path("world\\maps\\test\\missing.adt"), FileKind::Root));

		let outcomes = transform_tiles(&mut storage, &all, &config, |_, file| {
			if let TileFile::Root(tile) = file {
				for cell in tile.cells_mut().iter_mut() {
					cell.heights.data_mut().iter_mut().for_each(|height| *height = 12.5);
				}
			}
			Ok(())
		});
		assert_eq!(outcomes.len(), 5);
		assert!(outcomes[..4].iter().all(TileOutcome::is_ok));
		assert!(matches!(outcomes[4].result, Err(AdtError::Storage(StorageError::NotFound))));
		assert_eq!(outcomes[4].key, all[4].0);

		for outcome in load_tiles(&storage, &keys, &config) {
			match outcome.result? {
				TileFile::Root(tile) => assert!(tile.cells().iter().all(|cell| cell.heights.iter().all(|&height| height == 12.5))),
				other => panic!("unexpected kind {:?}", other.kind()),
			}
		}
		Ok(())
	}

	#[test]
	fn failed_transforms_are_not_written() -> AdtResult<()> {
		let config = TileConfig::new(ClientVersion::Cata);
		let mut storage = MemoryStorage::new();
		let key = FileKey::path("a_tex0.adt");
		let file = TileFile::new(FileKind::Tex, &config)?;
		file.save(&mut storage, &key, &config)?;
		let before = storage.read_file(&key)?;
		let outcomes = transform_tiles(&mut storage, &[(key.clone(), FileKind::Tex)], &config, |_, _| {
			AdtError::custom("rejected")
		});
		assert!(matches!(&outcomes[0].result, Err(AdtError::Custom(msg)) if msg == "rejected"));
		assert_eq!(storage.read_file(&key)?, before);
		Ok(())
	}
}
