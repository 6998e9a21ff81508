use std::io::{
	self,
	Read, Write,
	Seek, SeekFrom,
};
use std::ops::Range;

use byteorder::{
	ByteOrder,
	LittleEndian,
};
use bytemuck::{
	AnyBitPattern,
	Pod,
};

use crate::{
	AdtError,
	AdtResult,
};

/// Direction of a [ByteRead::seek_by].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDir {
	Forward,
	Backward,
}

/// How the offset of a [ByteRead::seek_by] is interpreted.
/// `Absolute` + `Backward` measures from the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekType {
	Absolute,
	Relative,
}

/// How an owned buffer grows when a write runs past its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservePolicy {
	/// Grow by exactly what is needed.
	Strict,
	/// Double the capacity until the write fits.
	#[default]
	Double,
}

/// Bounds checked reading shared by [ByteView] and [ByteBuffer].
/// Position is always within `0..=size`.
pub trait ByteRead {
	fn contents(&self) -> &[u8];
	fn tell(&self) -> usize;
	/// Moves the cursor without checking bounds. Callers validate first.
	fn set_position(&mut self, position: usize);

	fn size(&self) -> usize {
		self.contents().len()
	}

	fn is_eof(&self) -> bool {
		self.tell() == self.size()
	}

	fn remaining(&self) -> usize {
		self.size() - self.tell()
	}

	/// Validates that `len` bytes starting at `offset` are inside the buffer.
	fn check_range(&self, offset: usize, len: usize) -> AdtResult<Range<usize>> {
		let end = offset.checked_add(len).ok_or(AdtError::Overflow)?;
		if end > self.size() {
			return Err(AdtError::OutOfBounds {
				offset,
				len,
				size: self.size(),
			});
		}
		Ok(offset..end)
	}

	/// Moves the cursor. Returns the new position.
	fn seek_by(&mut self, offset: usize, dir: SeekDir, kind: SeekType) -> AdtResult<usize> {
		let size = self.size();
		let position = self.tell();
		let target = match (kind, dir) {
			(SeekType::Absolute, SeekDir::Forward) => Some(offset),
			(SeekType::Absolute, SeekDir::Backward) => size.checked_sub(offset),
			(SeekType::Relative, SeekDir::Forward) => position.checked_add(offset),
			(SeekType::Relative, SeekDir::Backward) => position.checked_sub(offset),
		};
		match target {
			Some(target) if target <= size => {
				self.set_position(target);
				Ok(target)
			}
			_ => {
				let signed = offset as i128;
				Err(AdtError::SeekOutOfBounds {
					target: match (kind, dir) {
						(SeekType::Absolute, SeekDir::Forward) => signed,
						(SeekType::Absolute, SeekDir::Backward) => size as i128 - signed,
						(SeekType::Relative, SeekDir::Forward) => position as i128 + signed,
						(SeekType::Relative, SeekDir::Backward) => position as i128 - signed,
					},
					size,
				})
			}
		}
	}

	/// Absolute forward seek.
	fn seek_to(&mut self, position: usize) -> AdtResult<()> {
		self.seek_by(position, SeekDir::Forward, SeekType::Absolute).map(|_| ())
	}

	/// Relative forward seek.
	fn skip(&mut self, count: usize) -> AdtResult<()> {
		self.seek_by(count, SeekDir::Forward, SeekType::Relative).map(|_| ())
	}

	/// Reads a copy of the next `size_of::<T>()` bytes as `T`.
	fn read_record<T: AnyBitPattern>(&mut self) -> AdtResult<T> {
		let value = self.peek_record::<T>()?;
		self.set_position(self.tell() + std::mem::size_of::<T>());
		Ok(value)
	}

	/// Reads `T` at the cursor without advancing.
	fn peek_record<T: AnyBitPattern>(&self) -> AdtResult<T> {
		let range = self.check_range(self.tell(), std::mem::size_of::<T>())?;
		Ok(bytemuck::pod_read_unaligned(&self.contents()[range]))
	}

	/// Reads `count` consecutive records.
	fn read_records<T: AnyBitPattern>(&mut self, count: usize) -> AdtResult<Vec<T>> {
		let element = std::mem::size_of::<T>();
		let len = count.checked_mul(element).ok_or(AdtError::Overflow)?;
		let range = self.check_range(self.tell(), len)?;
		let values = if element == 0 {
			Vec::new()
		} else {
			self.contents()[range]
				.chunks_exact(element)
				.map(bytemuck::pod_read_unaligned)
				.collect()
		};
		self.set_position(self.tell() + len);
		Ok(values)
	}

	/// Copies `dest.len()` bytes from the cursor and advances.
	fn read_into(&mut self, dest: &mut [u8]) -> AdtResult<()> {
		self.read_at(dest, self.tell())?;
		self.set_position(self.tell() + dest.len());
		Ok(())
	}

	/// Copies `dest.len()` bytes from an absolute offset. Does not move the cursor.
	fn read_at(&self, dest: &mut [u8], offset: usize) -> AdtResult<()> {
		let range = self.check_range(offset, dest.len())?;
		dest.copy_from_slice(&self.contents()[range]);
		Ok(())
	}

	fn read_u8(&mut self) -> AdtResult<u8> {
		let range = self.check_range(self.tell(), 1)?;
		let value = self.contents()[range.start];
		self.set_position(range.end);
		Ok(value)
	}

	fn read_u16(&mut self) -> AdtResult<u16> {
		let range = self.check_range(self.tell(), 2)?;
		let value = LittleEndian::read_u16(&self.contents()[range.clone()]);
		self.set_position(range.end);
		Ok(value)
	}

	fn read_u32(&mut self) -> AdtResult<u32> {
		let range = self.check_range(self.tell(), 4)?;
		let value = LittleEndian::read_u32(&self.contents()[range.clone()]);
		self.set_position(range.end);
		Ok(value)
	}

	/// Reads a null-terminated string. The terminator is consumed but not returned.
	fn read_cstring(&mut self) -> AdtResult<String> {
		let start = self.tell();
		let rest = &self.contents()[start..];
		let len = rest.iter().position(|&byte| byte == 0).ok_or(AdtError::OutOfBounds {
			offset: start,
			len: rest.len() + 1,
			size: self.size(),
		})?;
		let text = String::from_utf8(rest[..len].to_vec())?;
		self.set_position(start + len + 1);
		Ok(text)
	}
}

/// A read-only cursor over borrowed bytes.
/// It cannot grow, so there is nothing to guard against at runtime.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
	data: &'a [u8],
	position: usize,
}

impl<'a> ByteView<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self {
			data,
			position: 0,
		}
	}

	/// Borrows the next `len` bytes without copying.
	pub fn read_slice(&mut self, len: usize) -> AdtResult<&'a [u8]> {
		let range = self.check_range(self.position, len)?;
		let data: &'a [u8] = self.data;
		self.position = range.end;
		Ok(&data[range])
	}

	/// Borrows the next record in place. The record must be aligned within
	/// the underlying memory; use [ByteRead::read_record] for an unaligned copy.
	pub fn read_view<T: AnyBitPattern>(&mut self) -> AdtResult<&'a T> {
		let offset = self.position;
		let range = self.check_range(offset, std::mem::size_of::<T>())?;
		let data: &'a [u8] = self.data;
		let view = bytemuck::try_from_bytes::<T>(&data[range.clone()])
			.map_err(|_| AdtError::Misaligned { offset })?;
		self.position = range.end;
		Ok(view)
	}
}

impl ByteRead for ByteView<'_> {
	fn contents(&self) -> &[u8] {
		self.data
	}

	fn tell(&self) -> usize {
		self.position
	}

	fn set_position(&mut self, position: usize) {
		self.position = position;
	}
}

impl Read for ByteView<'_> {
	fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
		let count = out.len().min(self.remaining());
		out[..count].copy_from_slice(&self.data[self.position..self.position + count]);
		self.position += count;
		Ok(count)
	}
}

/// An owned, growable byte buffer with a read/write cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
	data: Vec<u8>,
	position: usize,
	policy: ReservePolicy,
}

impl ByteBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_policy(policy: ReservePolicy) -> Self {
		Self {
			policy,
			..Default::default()
		}
	}

	/// A zero filled buffer of `size` bytes.
	pub fn with_size(size: usize) -> Self {
		Self {
			data: vec![0; size],
			..Default::default()
		}
	}

	/// Copies `bytes` into a new buffer.
	pub fn from_bytes(bytes: &[u8]) -> Self {
		Self::from_vec(bytes.to_vec())
	}

	pub fn from_vec(data: Vec<u8>) -> Self {
		Self {
			data,
			..Default::default()
		}
	}

	/// Reads a whole stream into a new buffer.
	pub fn from_reader<R: Read>(reader: &mut R) -> AdtResult<Self> {
		let mut data = Vec::new();
		reader.read_to_end(&mut data)?;
		Ok(Self::from_vec(data))
	}

	/// Reads exactly `size` bytes from a stream into a new buffer.
	pub fn from_reader_exact<R: Read>(reader: &mut R, size: usize) -> AdtResult<Self> {
		let mut data = vec![0; size];
		reader.read_exact(&mut data)?;
		Ok(Self::from_vec(data))
	}

	pub fn policy(&self) -> ReservePolicy {
		self.policy
	}

	pub fn set_policy(&mut self, policy: ReservePolicy) {
		self.policy = policy;
	}

	pub fn capacity(&self) -> usize {
		self.data.capacity()
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.data
	}

	pub fn into_inner(self) -> Vec<u8> {
		self.data
	}

	/// A read-only cursor over the whole buffer, positioned at the start.
	pub fn view(&self) -> ByteView<'_> {
		ByteView::new(&self.data)
	}

	/// Ensures capacity for at least `capacity` bytes using the buffer's policy.
	pub fn reserve(&mut self, capacity: usize) -> AdtResult<()> {
		let len = self.data.len();
		if capacity <= self.data.capacity() {
			return Ok(());
		}
		let target = match self.policy {
			ReservePolicy::Strict => capacity,
			ReservePolicy::Double => {
				let mut target = self.data.capacity().max(1);
				while target < capacity {
					target = target.checked_mul(2).ok_or(AdtError::Overflow)?;
				}
				target
			}
		};
		self.data.reserve_exact(target - len);
		Ok(())
	}

	/// Grows the logical size to `end`, zero filling the new bytes.
	fn grow_to(&mut self, end: usize) -> AdtResult<()> {
		if end > self.data.len() {
			self.reserve(end)?;
			self.data.resize(end, 0);
		}
		Ok(())
	}

	/// Writes at the cursor, growing the buffer if needed, and advances.
	pub fn write_bytes(&mut self, bytes: &[u8]) -> AdtResult<()> {
		self.write_bytes_at(bytes, self.position)?;
		self.position += bytes.len();
		Ok(())
	}

	/// Writes at an absolute offset without moving the cursor.
	pub fn write_bytes_at(&mut self, bytes: &[u8], offset: usize) -> AdtResult<()> {
		let end = offset.checked_add(bytes.len()).ok_or(AdtError::Overflow)?;
		self.grow_to(end)?;
		self.data[offset..end].copy_from_slice(bytes);
		Ok(())
	}

	pub fn write<T: Pod>(&mut self, value: &T) -> AdtResult<()> {
		self.write_bytes(bytemuck::bytes_of(value))
	}

	pub fn write_at<T: Pod>(&mut self, value: &T, offset: usize) -> AdtResult<()> {
		self.write_bytes_at(bytemuck::bytes_of(value), offset)
	}

	pub fn write_array<T: Pod>(&mut self, values: &[T]) -> AdtResult<()> {
		self.write_bytes(bytemuck::cast_slice(values))
	}

	/// Writes `count` copies of `byte`.
	pub fn write_fill(&mut self, byte: u8, count: usize) -> AdtResult<()> {
		let end = self.position.checked_add(count).ok_or(AdtError::Overflow)?;
		self.grow_to(end)?;
		self.data[self.position..end].fill(byte);
		self.position = end;
		Ok(())
	}

	pub fn write_u8(&mut self, value: u8) -> AdtResult<()> {
		self.write_bytes(&[value])
	}

	pub fn write_u32(&mut self, value: u32) -> AdtResult<()> {
		let mut bytes = [0u8; 4];
		LittleEndian::write_u32(&mut bytes, value);
		self.write_bytes(&bytes)
	}

	pub fn write_u32_at(&mut self, value: u32, offset: usize) -> AdtResult<()> {
		let mut bytes = [0u8; 4];
		LittleEndian::write_u32(&mut bytes, value);
		self.write_bytes_at(&bytes, offset)
	}

	/// Writes `text` followed by a null terminator.
	pub fn write_cstring(&mut self, text: &str) -> AdtResult<()> {
		self.write_bytes(text.as_bytes())?;
		self.write_u8(0)
	}
}

impl ByteRead for ByteBuffer {
	fn contents(&self) -> &[u8] {
		&self.data
	}

	fn tell(&self) -> usize {
		self.position
	}

	fn set_position(&mut self, position: usize) {
		self.position = position;
	}
}

impl Write for ByteBuffer {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.write_bytes(buf)
			.map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl Seek for ByteBuffer {
	fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
		let (offset, dir, kind) = match pos {
			SeekFrom::Start(offset) => (offset as usize, SeekDir::Forward, SeekType::Absolute),
			SeekFrom::End(offset) if offset <= 0 => (offset.unsigned_abs() as usize, SeekDir::Backward, SeekType::Absolute),
			SeekFrom::Current(offset) if offset >= 0 => (offset as usize, SeekDir::Forward, SeekType::Relative),
			SeekFrom::Current(offset) => (offset.unsigned_abs() as usize, SeekDir::Backward, SeekType::Relative),
			SeekFrom::End(_) => return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek past the end of the buffer")),
		};
		self.seek_by(offset, dir, kind)
			.map(|position| position as u64)
			.map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
	}
}
