use thiserror::Error;

use crate::io::{
	fourcc::FourCC,
	storage::StorageError,
	version::ClientVersion,
};

/// The master error type.
/// Structural errors carry the chunk tag and/or byte offset that
/// triggered them so that a failed parse can be diagnosed.
#[derive(Debug, Error)]
pub enum AdtError {
	#[error("{0}")]
	Custom(String),
	#[error("IO Error: {0}")]
	IoError(#[from] std::io::Error),
	#[error("Failed to convert to UTF-8 string.")]
	FromUtf8Error(#[from] std::string::FromUtf8Error),
	#[error("Storage Error: {0}")]
	Storage(#[from] StorageError),
	#[error("Out of range error.")]
	OutOfRange,
	#[error("Attempted to access {len} bytes at offset {offset} in a buffer of {size} bytes.")]
	OutOfBounds {
		offset: usize,
		len: usize,
		size: usize,
	},
	#[error("Seek to {target} is outside of a buffer of {size} bytes.")]
	SeekOutOfBounds {
		target: i128,
		size: usize,
	},
	#[error("Integer overflow in buffer offset arithmetic.")]
	Overflow,
	#[error("Record at offset {offset} is not aligned for a borrowed view.")]
	Misaligned {
		offset: usize,
	},
	#[error("Reading must start at the beginning of the buffer (position {0}).")]
	NonZeroStart(usize),
	#[error("Attempted to read a tile from an empty buffer.")]
	EmptyBuffer,
	#[error("Truncated chunk header at offset {offset}.")]
	TruncatedHeader {
		offset: usize,
	},
	#[error("Chunk {tag} at offset {offset} declares {size} bytes but its container ends at {end}.")]
	ChunkOverrun {
		tag: FourCC,
		offset: usize,
		size: u32,
		end: usize,
	},
	#[error("Chunk {tag} at offset {offset} declares {expected} bytes but {consumed} were consumed.")]
	ChunkSizeMismatch {
		tag: FourCC,
		offset: usize,
		expected: u32,
		consumed: usize,
	},
	#[error("Chunk {tag} has size {size} but its record is {expected} bytes.")]
	RecordSize {
		tag: FourCC,
		size: u32,
		expected: usize,
	},
	#[error("Chunk {tag} has size {size}, which is not a multiple of its element size {element_size}.")]
	ElementSizeMismatch {
		tag: FourCC,
		size: u32,
		element_size: usize,
	},
	#[error("Chunk {tag} holds {count} elements (expected {min}..={max}).")]
	ElementCount {
		tag: FourCC,
		count: usize,
		min: usize,
		max: usize,
	},
	#[error("String block {tag} is not null-terminated.")]
	UnterminatedString {
		tag: FourCC,
	},
	#[error("Required chunk {0} was not found.")]
	MissingChunk(FourCC),
	#[error("Chunk {tag} at offset {offset} was read before {requires}.")]
	ReadOrder {
		tag: FourCC,
		offset: usize,
		requires: FourCC,
	},
	#[error("{kind} file contains {count} cells (expected 256).")]
	CellCount {
		kind: &'static str,
		count: usize,
	},
	#[error("Chunk {tag}: {what} has {found} entries but the diffuse textures have {expected}.")]
	LengthMismatch {
		tag: FourCC,
		what: &'static str,
		expected: usize,
		found: usize,
	},
	#[error("Alpha map layer count {0} is out of range (0..=3).")]
	AlphaLayerCount(usize),
	#[error("Compressed alpha maps require the high resolution format.")]
	CompressedLowRes,
	#[error("The alpha map fix only applies to the low resolution format.")]
	FixHighRes,
	#[error("Alpha map run at offset {offset} overruns layer {layer} (pixel {pixel} + {count}).")]
	AlphaOverrun {
		offset: usize,
		layer: usize,
		pixel: usize,
		count: usize,
	},
	#[error("Alpha map control byte at offset {offset} has a zero run length.")]
	AlphaEmptyRun {
		offset: usize,
	},
	#[error("Alpha map value at pixel {pixel} of layer {layer} exceeds the remaining opacity budget.")]
	AlphaUnderflow {
		layer: usize,
		pixel: usize,
	},
	#[error("Liquid data offset {offset} (+{len}) lies outside of the {size} byte MH2O chunk.")]
	LiquidOffset {
		offset: usize,
		len: usize,
		size: usize,
	},
	#[error("Invalid liquid vertex format: {0}")]
	InvalidLiquidFormat(u16),
	#[error("Liquid vertex format for liquid object {0} is not yet specified without a resolver.")]
	UnresolvedLiquidFormat(u16),
	#[error("Liquid layer data does not match its geometry: {0}")]
	LiquidGeometry(&'static str),
	#[error("{kind} files are not supported for {version:?}.")]
	UnsupportedVersion {
		kind: &'static str,
		version: ClientVersion,
	},
}

impl AdtError {

	pub fn range_check<T, R>(value: T, range: R) -> Result<(),AdtError>
	where
	T: PartialOrd + Sized,
	R: std::ops::RangeBounds<T> {
		if range.contains(&value) {
			Ok(())
		} else {
			Err(AdtError::OutOfRange)
		}
	}

	#[inline(always)]
	pub fn custom<T, S: AsRef<str>>(msg: S) -> Result<T,Self> {
		Err(AdtError::Custom(msg.as_ref().to_owned()))
	}
}

pub type AdtResult<T> = Result<T,AdtError>;
