//! Module for bit level manipulation.

pub trait SetBit {
	fn set_bit(self, index: usize, on: bool) -> Self;
}

pub trait GetBit {
	fn get_bit(self, index: usize) -> bool;
}

macro_rules! __get_set_impl {
	($type:ty) => {

		impl SetBit for $type {
			fn set_bit(self, index: usize, on: bool) -> Self {
				if on {
					self | (1 << index)
				} else {
					self & !(1 << index)
				}
			}
		}

		impl GetBit for $type {
			fn get_bit(self, index: usize) -> bool {
				(self & (1 << index)) != 0
			}
		}

	};
}

crate::for_each_int_type!(__get_set_impl);

/// Number of bytes needed to hold `bits` bits.
pub const fn packed_len(bits: usize) -> usize {
	(bits + 7) / 8
}

#[test]
fn bit_test() {
	let bits = 0b10111010u8;
	assert!(!bits.get_bit(0));
	assert!(bits.get_bit(1));
	assert!(bits.get_bit(7));
	let row = 0u64.set_bit(63, true).set_bit(0, true);
	assert_eq!(row, 0x8000_0000_0000_0001);
	assert_eq!(row.set_bit(63, false), 1);
	assert_eq!(packed_len(0), 0);
	assert_eq!(packed_len(9), 2);
	assert_eq!(packed_len(64), 8);
}
