use std::io::{
	Read, Write,
	Seek,
};
use std::ops::Deref;

use bytemuck::Pod;

use crate::{
	ioext::*,
	AdtError,
	AdtResult,
};

use super::{
	buffer::*,
	fourcc::FourCC,
};

/// The 8 byte framing in front of every chunk.
/// `size` counts the payload only, never the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkHeader {
	pub tag: u32,
	pub size: u32,
}

impl ChunkHeader {
	pub const SIZE: usize = 8;

	pub const fn new(tag: u32, size: u32) -> Self {
		Self { tag, size }
	}

	pub fn fourcc(&self) -> FourCC {
		FourCC(self.tag)
	}

	/// Reads a header at the cursor, reporting the offset if fewer than 8 bytes remain.
	pub fn read_header(view: &mut ByteView<'_>) -> AdtResult<Self> {
		let offset = view.tell();
		if view.remaining() < Self::SIZE {
			return Err(AdtError::TruncatedHeader { offset });
		}
		view.read_value()
	}
}

impl Readable for ChunkHeader {
	fn read_from<R: Read>(reader: &mut R) -> AdtResult<Self> {
		Ok(Self {
			tag: reader.read_value()?,
			size: reader.read_value()?,
		})
	}
}

impl Writable for ChunkHeader {
	fn write_to<W: Write>(&self, writer: &mut W) -> AdtResult<usize> {
		Ok(
			writer.write_value(self.tag)?
			+ writer.write_value(self.size)?
		)
	}
}

impl ByteBuffer {
	/// Writes one chunk: a placeholder header, the payload, then seeks back
	/// and patches the size. Returns the offset of the header.
	pub fn write_chunk<F>(&mut self, tag: u32, payload: F) -> AdtResult<usize>
	where
	F: FnOnce(&mut ByteBuffer) -> AdtResult<()> {
		let header_pos = self.tell();
		self.write_value(ChunkHeader::new(tag, 0))?;
		payload(self)?;
		let size = self.tell()
			.checked_sub(header_pos + ChunkHeader::SIZE)
			.and_then(|size| u32::try_from(size).ok())
			.ok_or(AdtError::Overflow)?;
		let ret = self.seek_return()?;
		self.seek_to(header_pos)?;
		self.write_value(ChunkHeader::new(tag, size))?;
		Seek::seek(self, ret)?;
		Ok(header_pos)
	}
}

/// A field that serializes itself as one tagged chunk.
/// Uninitialized chunks are not written at all.
pub trait Chunk {
	const TAG: u32;

	fn is_initialized(&self) -> bool;

	/// Decodes the payload that follows `header`. The cursor sits at the payload start.
	fn read(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader) -> AdtResult<()>;

	fn write_payload(&self, buffer: &mut ByteBuffer) -> AdtResult<()>;

	fn write(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		if self.is_initialized() {
			buffer.write_chunk(Self::TAG, |buffer| self.write_payload(buffer))?;
		}
		Ok(())
	}
}

/// A chunk holding zero or one fixed-layout record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataChunk<T, const TAG: u32> {
	data: Option<T>,
}

impl<T, const TAG: u32> Default for DataChunk<T, TAG> {
	fn default() -> Self {
		Self { data: None }
	}
}

impl<T: Pod, const TAG: u32> DataChunk<T, TAG> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(value: T) -> Self {
		Self { data: Some(value) }
	}

	pub fn get(&self) -> Option<&T> {
		self.data.as_ref()
	}

	pub fn get_mut(&mut self) -> Option<&mut T> {
		self.data.as_mut()
	}

	pub fn set(&mut self, value: T) {
		self.data = Some(value);
	}

	/// Marks the chunk initialized with a zeroed record if it was not already.
	pub fn initialize(&mut self) -> &mut T {
		self.data.get_or_insert_with(T::zeroed)
	}

	pub fn clear(&mut self) {
		self.data = None;
	}
}

impl<T: Pod, const TAG: u32> Chunk for DataChunk<T, TAG> {
	const TAG: u32 = TAG;

	fn is_initialized(&self) -> bool {
		self.data.is_some()
	}

	fn read(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader) -> AdtResult<()> {
		let expected = std::mem::size_of::<T>();
		if header.size as usize != expected {
			return Err(AdtError::RecordSize {
				tag: header.fourcc(),
				size: header.size,
				expected,
			});
		}
		self.data = Some(view.read_record()?);
		Ok(())
	}

	fn write_payload(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		match &self.data {
			Some(value) => buffer.write(value),
			None => Ok(()),
		}
	}
}

/// A chunk holding a run of fixed-layout records.
/// `MIN` and `MAX` bound the element count on both read and write.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArrayChunk<T, const TAG: u32, const MIN: usize = 0, const MAX: usize = { usize::MAX }> {
	data: Vec<T>,
	initialized: bool,
}

impl<T, const TAG: u32, const MIN: usize, const MAX: usize> Default for DataArrayChunk<T, TAG, MIN, MAX> {
	fn default() -> Self {
		Self {
			data: Vec::new(),
			initialized: false,
		}
	}
}

impl<T: Pod, const TAG: u32, const MIN: usize, const MAX: usize> DataArrayChunk<T, TAG, MIN, MAX> {
	pub fn new() -> Self {
		Self::default()
	}

	/// An initialized chunk holding `data`.
	pub fn from_vec(data: Vec<T>) -> Self {
		Self {
			data,
			initialized: true,
		}
	}

	/// An initialized chunk holding `MIN` zeroed records.
	pub fn zeroed() -> Self {
		Self::from_vec(vec![T::zeroed(); MIN])
	}

	pub fn initialize(&mut self) {
		self.initialized = true;
	}

	pub fn set(&mut self, data: Vec<T>) {
		self.data = data;
		self.initialized = true;
	}

	pub fn push(&mut self, value: T) {
		self.data.push(value);
		self.initialized = true;
	}

	/// Mutable access to the records. Marks the chunk initialized.
	pub fn data_mut(&mut self) -> &mut Vec<T> {
		self.initialized = true;
		&mut self.data
	}

	pub fn clear(&mut self) {
		self.data.clear();
		self.initialized = false;
	}

	fn check_count(&self, count: usize) -> AdtResult<()> {
		if count < MIN || count > MAX {
			return Err(AdtError::ElementCount {
				tag: FourCC(TAG),
				count,
				min: MIN,
				max: MAX,
			});
		}
		Ok(())
	}
}

impl<T, const TAG: u32, const MIN: usize, const MAX: usize> Deref for DataArrayChunk<T, TAG, MIN, MAX> {
	type Target = [T];

	fn deref(&self) -> &[T] {
		&self.data
	}
}

impl<T: Pod, const TAG: u32, const MIN: usize, const MAX: usize> Chunk for DataArrayChunk<T, TAG, MIN, MAX> {
	const TAG: u32 = TAG;

	fn is_initialized(&self) -> bool {
		self.initialized
	}

	fn read(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader) -> AdtResult<()> {
		let element_size = std::mem::size_of::<T>();
		let size = header.size as usize;
		if size % element_size != 0 {
			return Err(AdtError::ElementSizeMismatch {
				tag: header.fourcc(),
				size: header.size,
				element_size,
			});
		}
		let count = size / element_size;
		self.check_count(count)?;
		self.data = view.read_records(count)?;
		self.initialized = true;
		Ok(())
	}

	fn write_payload(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		self.check_count(self.data.len())?;
		buffer.write_array(&self.data)
	}
}

/// A chunk of concatenated null-terminated strings (file names).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringBlockChunk<const TAG: u32> {
	strings: Vec<String>,
	initialized: bool,
}

impl<const TAG: u32> StringBlockChunk<TAG> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_strings<S: Into<String>, I: IntoIterator<Item = S>>(strings: I) -> Self {
		Self {
			strings: strings.into_iter().map(Into::into).collect(),
			initialized: true,
		}
	}

	pub fn initialize(&mut self) {
		self.initialized = true;
	}

	pub fn push<S: Into<String>>(&mut self, value: S) {
		self.strings.push(value.into());
		self.initialized = true;
	}

	pub fn strings(&self) -> &[String] {
		&self.strings
	}

	pub fn len(&self) -> usize {
		self.strings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.strings.is_empty()
	}

	/// Byte offset of each string within the block.
	pub fn offsets(&self) -> Vec<u32> {
		let mut offset = 0u32;
		self.strings.iter().map(|text| {
			let current = offset;
			offset += text.len() as u32 + 1;
			current
		}).collect()
	}

	/// Resolves a byte offset into the block back to its string.
	pub fn at_offset(&self, offset: u32) -> Option<&str> {
		self.offsets().iter()
			.position(|&start| start == offset)
			.map(|index| self.strings[index].as_str())
	}

	pub fn clear(&mut self) {
		self.strings.clear();
		self.initialized = false;
	}
}

impl<const TAG: u32> Chunk for StringBlockChunk<TAG> {
	const TAG: u32 = TAG;

	fn is_initialized(&self) -> bool {
		self.initialized
	}

	fn read(&mut self, view: &mut ByteView<'_>, header: &ChunkHeader) -> AdtResult<()> {
		let payload = view.read_slice(header.size as usize)?;
		self.strings.clear();
		if let Some(last) = payload.last() {
			if *last != 0 {
				return Err(AdtError::UnterminatedString { tag: header.fourcc() });
			}
			for text in payload[..payload.len() - 1].split(|&byte| byte == 0) {
				self.strings.push(String::from_utf8(text.to_vec())?);
			}
		}
		self.initialized = true;
		Ok(())
	}

	fn write_payload(&self, buffer: &mut ByteBuffer) -> AdtResult<()> {
		for text in &self.strings {
			buffer.write_cstring(text)?;
		}
		Ok(())
	}
}
