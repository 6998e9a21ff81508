use std::fmt;

/// Call depth of a nested read or write, used to indent log output.
/// Passed by value down the dispatch chain instead of living in global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogScope {
	depth: usize,
}

impl LogScope {
	pub const ROOT: LogScope = LogScope { depth: 0 };

	pub fn depth(self) -> usize {
		self.depth
	}

	/// The scope one level deeper.
	pub fn nested(self) -> Self {
		Self {
			depth: self.depth + 1,
		}
	}
}

impl fmt::Display for LogScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for _ in 0..self.depth {
			f.write_str("  ")?;
		}
		Ok(())
	}
}

#[test]
fn indentation() {
	let scope = LogScope::ROOT.nested().nested();
	assert_eq!(scope.depth(), 2);
	assert_eq!(format!("{scope}MCNK"), "    MCNK");
	assert_eq!(LogScope::ROOT.to_string(), "");
}
