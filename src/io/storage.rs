//! The storage collaborator: whatever hands tile bytes to the codec and
//! takes them back. Archive formats live behind this trait, not in this crate.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Failures of the storage layer. These are expected conditions that the
/// caller checks for, unlike structural decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
	#[error("File not found.")]
	NotFound,
	#[error("The client storage failed to open the file.")]
	OpenFailedClient,
	#[error("The operating system failed to open the file.")]
	OpenFailedOs,
	#[error("Failed to read the file.")]
	ReadFailed,
	#[error("Invalid file key.")]
	InvalidKey,
	#[error("Not enough memory to read the file.")]
	NotEnoughMemory,
	#[error("Failed to write the file.")]
	WriteFailed,
}

/// Addresses a file either by numeric file data id or by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKey {
	FileDataId(u32),
	Path(String),
}

impl FileKey {
	/// A path key in the canonical form used by the client archives:
	/// lowercase with backslash separators.
	pub fn path<S: AsRef<str>>(path: S) -> Self {
		FileKey::Path(path.as_ref().to_lowercase().replace('/', "\\"))
	}

	/// The final component of a path key.
	pub fn file_name(&self) -> Option<&str> {
		match self {
			FileKey::Path(path) => path.rsplit('\\').next(),
			FileKey::FileDataId(_) => None,
		}
	}
}

impl From<u32> for FileKey {
	fn from(value: u32) -> Self {
		FileKey::FileDataId(value)
	}
}

impl From<&str> for FileKey {
	fn from(value: &str) -> Self {
		FileKey::path(value)
	}
}

impl fmt::Display for FileKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FileKey::FileDataId(id) => write!(f, "fdid:{id}"),
			FileKey::Path(path) => f.write_str(path),
		}
	}
}

pub trait FileStorage {
	fn read_file(&self, key: &FileKey) -> Result<Vec<u8>, StorageError>;
	fn write_file(&mut self, key: &FileKey, bytes: &[u8]) -> Result<(), StorageError>;
	fn exists(&self, key: &FileKey) -> bool;
}

/// A storage backed by a map. Useful for tests and in-memory conversion.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
	files: HashMap<FileKey, Vec<u8>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert<K: Into<FileKey>>(&mut self, key: K, bytes: Vec<u8>) {
		self.files.insert(key.into(), bytes);
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}

impl FileStorage for MemoryStorage {
	fn read_file(&self, key: &FileKey) -> Result<Vec<u8>, StorageError> {
		if matches!(key, FileKey::FileDataId(0)) {
			return Err(StorageError::InvalidKey);
		}
		self.files.get(key).cloned().ok_or(StorageError::NotFound)
	}

	fn write_file(&mut self, key: &FileKey, bytes: &[u8]) -> Result<(), StorageError> {
		if matches!(key, FileKey::FileDataId(0)) {
			return Err(StorageError::WriteFailed);
		}
		self.files.insert(key.clone(), bytes.to_vec());
		Ok(())
	}

	fn exists(&self, key: &FileKey) -> bool {
		self.files.contains_key(key)
	}
}
