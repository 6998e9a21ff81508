#![allow(unused)]

/// The purpose of this macro is to be able to generate code for each
/// primitive integer type (this means no f32 or f64).
/// You invoke the macro with the path to another macro that you would
/// like to invoke for each type.
/// Optionally you can restrict generation to either unsigned or signed
/// by typing `;unsigned` or `;signed` after the provided macro argument.
#[macro_export]
macro_rules! for_each_int_type {
	($macro:path) => {
		$crate::for_each_int_type!($macro;unsigned);
		$crate::for_each_int_type!($macro;signed);
	};
	($macro:path;unsigned) => {
		$macro!{u64}
		$macro!{u32}
		$macro!{u16}
		$macro!{u8}
	};
	($macro:path;signed) => {
		$macro!{i64}
		$macro!{i32}
		$macro!{i16}
		$macro!{i8}
	};
}

/// Continue a loop if a condition is met.
/// ```rs
/// for index in 0..16 {
/// 	continue_if!(index & 1 == 1);
/// 	println!("{}", index);
/// }
/// ```
/// Alternatively, you can also use a loop identifier:
/// ```rs
/// 'x: for x in 0..16 {
/// 	for y in 0..16 {
/// 		continue_if!('x: y == 10);
/// 	}
/// }
/// ```
#[macro_export]
macro_rules! continue_if {
	($($label:lifetime : )? $condition:expr) => {
		if $condition { continue $($label)?; }
	};
}

/// Generates a const table of `(flag, introduced)` pairs for a bitflags type
/// along with a `supported(version)` function that masks the flags a client
/// version understands. Flags only ever get added in later versions, so the
/// supported set for a version is the union of every row at or before it.
/// ```rs
/// versioned_flags!{ LayerFlags {
/// 	OVERBRIGHT => Classic,
/// 	ALPHA_MAP_COMPRESSED => Wotlk,
/// }}
/// ```
#[macro_export]
macro_rules! versioned_flags {
	($flags:ident { $($flag:ident => $version:ident),+ $(,)? }) => {
		impl $flags {
			/// Each flag paired with the first client version that knows it.
			pub const INTRODUCED: &'static [($flags, $crate::io::version::ClientVersion)] = &[
				$(
					($flags::$flag, $crate::io::version::ClientVersion::$version),
				)+
			];

			/// Every flag that is valid for `version`.
			pub fn supported(version: $crate::io::version::ClientVersion) -> Self {
				Self::INTRODUCED.iter()
					.filter(|(_, introduced)| *introduced <= version)
					.fold(Self::empty(), |acc, (flag, _)| acc | *flag)
			}

			/// Drops the bits that `version` does not know about.
			pub fn for_version(self, version: $crate::io::version::ClientVersion) -> Self {
				self & Self::supported(version)
			}
		}
	};
}

#[test]
fn int_type_expansion() {
	let mut names = Vec::new();
	macro_rules! push_name {
		($type:ty) => {
			names.push((stringify!($type), std::mem::size_of::<$type>()));
		};
	}
	for_each_int_type!(push_name;unsigned);
	assert_eq!(names, [("u64", 8), ("u32", 4), ("u16", 2), ("u8", 1)]);
	names.clear();
	for_each_int_type!(push_name);
	assert_eq!(names.len(), 8);
	assert_eq!(&names[4..], [("i64", 8), ("i32", 4), ("i16", 2), ("i8", 1)]);
}

#[test]
fn continue_if_skips() {
	let mut kept = Vec::new();
	for index in 0..6 {
		continue_if!(index % 2 == 1);
		kept.push(index);
	}
	assert_eq!(kept, [0, 2, 4]);
}
