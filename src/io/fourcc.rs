use std::fmt;

/// Builds a tag value from its human readable spelling.
/// The first character lands in the most significant byte, so writing the
/// value little-endian stores the characters reversed (`MVER` is `REVM` on disk).
pub const fn fourcc(code: &[u8; 4]) -> u32 {
	u32::from_be_bytes(*code)
}

/// A chunk tag, used for display and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FourCC(pub u32);

impl FourCC {
	pub const fn new(code: &[u8; 4]) -> Self {
		Self(fourcc(code))
	}

	/// The tag as it reads in logs and documentation.
	pub const fn readable(self) -> [u8; 4] {
		self.0.to_be_bytes()
	}

	/// The tag as it is stored in the file.
	pub const fn on_disk(self) -> [u8; 4] {
		self.0.to_le_bytes()
	}
}

impl From<u32> for FourCC {
	fn from(value: u32) -> Self {
		Self(value)
	}
}

impl fmt::Display for FourCC {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for byte in self.readable() {
			if byte.is_ascii_graphic() || byte == b' ' {
				write!(f, "{}", byte as char)?;
			} else {
				write!(f, "\\x{:02X}", byte)?;
			}
		}
		Ok(())
	}
}
