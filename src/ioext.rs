use std::io::{
	self,
	Read, Write,
	Seek, SeekFrom,
};

use byteorder::{
	LittleEndian,
	ReadBytesExt,
	WriteBytesExt,
};

use crate::AdtResult;

/// A value that can be read from a little-endian byte stream.
pub trait Readable: Sized {
	fn read_from<R: Read>(reader: &mut R) -> AdtResult<Self>;
}

/// A value that can be written to a little-endian byte stream.
/// Returns the number of bytes written.
pub trait Writable {
	fn write_to<W: Write>(&self, writer: &mut W) -> AdtResult<usize>;
}

pub trait ReadExt {
	fn read_value<T: Readable>(&mut self) -> AdtResult<T>;
}

impl<R: Read> ReadExt for R {
	fn read_value<T: Readable>(&mut self) -> AdtResult<T> {
		T::read_from(self)
	}
}

pub trait WriteExt {
	fn write_value<T: Writable>(&mut self, value: T) -> AdtResult<usize>;
}

impl<W: Write> WriteExt for W {
	fn write_value<T: Writable>(&mut self, value: T) -> AdtResult<usize> {
		value.write_to(self)
	}
}

/// Returns a [SeekFrom] that will bring the stream back to where it
/// currently is. Used when a writer has to jump back and patch data.
pub trait SeekReturn {
	fn seek_return(&mut self) -> io::Result<SeekFrom>;
}

impl<T: Seek> SeekReturn for T {
	fn seek_return(&mut self) -> io::Result<SeekFrom> {
		Ok(SeekFrom::Start(self.stream_position()?))
	}
}

macro_rules! __primitive_io {
	($type:ty, $read:ident, $write:ident) => {
		impl Readable for $type {
			fn read_from<R: Read>(reader: &mut R) -> AdtResult<Self> {
				Ok(reader.$read::<LittleEndian>()?)
			}
		}

		impl Writable for $type {
			fn write_to<W: Write>(&self, writer: &mut W) -> AdtResult<usize> {
				writer.$write::<LittleEndian>(*self)?;
				Ok(std::mem::size_of::<$type>())
			}
		}
	};
}

__primitive_io!(u16, read_u16, write_u16);
__primitive_io!(u32, read_u32, write_u32);
__primitive_io!(u64, read_u64, write_u64);
__primitive_io!(i16, read_i16, write_i16);
__primitive_io!(i32, read_i32, write_i32);
__primitive_io!(i64, read_i64, write_i64);
__primitive_io!(f32, read_f32, write_f32);

impl Readable for u8 {
	fn read_from<R: Read>(reader: &mut R) -> AdtResult<Self> {
		Ok(reader.read_u8()?)
	}
}

impl Writable for u8 {
	fn write_to<W: Write>(&self, writer: &mut W) -> AdtResult<usize> {
		writer.write_u8(*self)?;
		Ok(1)
	}
}
