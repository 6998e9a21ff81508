//! The versioned dispatch engine shared by every tile file kind.
//!
//! A [Schema] is a static table of [Entry] values in write order. Plain
//! [Field]s always exist; [Component]s are named groups of fields that only
//! exist when their [Gate] admits the configured client version and LOD
//! level. Which components are active is resolved once into a [Components]
//! mask when a tile object is constructed, and that mask is then handed to
//! every read and write.
//!
//! Reading matches each chunk tag against, in order: the direct fields, the
//! active components, then the optional extension hook. Unknown tags are
//! logged and skipped.

use crate::{
	AdtError,
	AdtResult,
};

use super::{
	buffer::*,
	chunk::ChunkHeader,
	scope::LogScope,
	version::{ClientVersion, Gate, LodLevel},
};

pub type ReadFn<S, R> = fn(&mut S, &mut ByteView<'_>, &ChunkHeader, &mut R, LogScope) -> AdtResult<()>;
pub type WriteFn<S, W> = fn(&S, &mut ByteBuffer, &mut W, LogScope) -> AdtResult<()>;
/// Returns `Ok(false)` when the hook does not handle the chunk either.
pub type ExtensionFn<S, R> = fn(&mut S, &mut ByteView<'_>, &ChunkHeader, &mut R, LogScope) -> AdtResult<bool>;

/// One chunk tag and the functions that decode and encode it.
pub struct Field<S, R, W> {
	pub tag: u32,
	pub read: ReadFn<S, R>,
	pub write: WriteFn<S, W>,
}

/// A named group of fields that exists only when `gate` admits the configuration.
/// The group is matched and written as a unit.
pub struct Component<S: 'static, R: 'static, W: 'static> {
	pub name: &'static str,
	pub gate: Gate,
	pub fields: &'static [Field<S, R, W>],
}

pub enum Entry<S: 'static, R: 'static, W: 'static> {
	Field(Field<S, R, W>),
	Component(Component<S, R, W>),
}

/// The set of active components of a schema, by component index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Components(u64);

impl Components {
	pub const NONE: Components = Components(0);

	pub fn contains(self, index: usize) -> bool {
		index < 64 && self.0 & (1 << index) != 0
	}

	pub fn insert(&mut self, index: usize) {
		self.0 |= 1 << index;
	}
}

pub struct Schema<S: 'static, R: 'static, W: 'static> {
	/// Used in log output.
	pub name: &'static str,
	pub entries: &'static [Entry<S, R, W>],
	pub extension: Option<ExtensionFn<S, R>>,
}

impl<S: 'static, R: 'static, W: 'static> Schema<S, R, W> {
	fn components(&self) -> impl Iterator<Item = &'static Component<S, R, W>> {
		let entries: &'static [Entry<S, R, W>] = self.entries;
		entries.iter().filter_map(|entry| match entry {
			Entry::Component(component) => Some(component),
			Entry::Field(_) => None,
		})
	}

	/// Resolves which components exist for a configuration.
	pub fn resolve(&self, version: ClientVersion, level: LodLevel) -> Components {
		let mut active = Components::NONE;
		for (index, component) in self.components().enumerate() {
			if component.gate.admits(version, level) {
				active.insert(index);
			}
		}
		active
	}

	/// Names of the active components, mostly for diagnostics.
	pub fn active_names(&self, active: Components) -> Vec<&'static str> {
		self.components()
			.enumerate()
			.filter(|(index, _)| active.contains(*index))
			.map(|(_, component)| component.name)
			.collect()
	}

	/// Routes one chunk to its field. Returns `false` if nothing claimed the tag.
	fn dispatch(
		&self,
		target: &mut S,
		active: Components,
		view: &mut ByteView<'_>,
		header: &ChunkHeader,
		ctx: &mut R,
		scope: LogScope,
	) -> AdtResult<bool> {
		for entry in self.entries {
			if let Entry::Field(field) = entry {
				if field.tag == header.tag {
					(field.read)(target, view, header, ctx, scope)?;
					return Ok(true);
				}
			}
		}
		for (index, component) in self.components().enumerate() {
			crate::continue_if!(!active.contains(index));
			if let Some(field) = component.fields.iter().find(|field| field.tag == header.tag) {
				log::trace!("{}{} belongs to {}", scope, header.fourcc(), component.name);
				(field.read)(target, view, header, ctx, scope)?;
				return Ok(true);
			}
		}
		match self.extension {
			Some(extension) => extension(target, view, header, ctx, scope),
			None => Ok(false),
		}
	}

	/// Reads a single chunk that must end at or before `end`.
	fn read_one(
		&self,
		target: &mut S,
		active: Components,
		view: &mut ByteView<'_>,
		end: usize,
		ctx: &mut R,
		scope: LogScope,
	) -> AdtResult<()> {
		let offset = view.tell();
		let header = ChunkHeader::read_header(view)?;
		let start = view.tell();
		let payload_end = start.checked_add(header.size as usize).ok_or(AdtError::Overflow)?;
		if payload_end > end {
			return Err(AdtError::ChunkOverrun {
				tag: header.fourcc(),
				offset,
				size: header.size,
				end,
			});
		}
		log::trace!("{}{} ({} bytes) at {}", scope, header.fourcc(), header.size, offset);
		if self.dispatch(target, active, view, &header, ctx, scope.nested())? {
			if view.tell() != payload_end {
				return Err(AdtError::ChunkSizeMismatch {
					tag: header.fourcc(),
					offset,
					expected: header.size,
					consumed: view.tell().wrapping_sub(start),
				});
			}
		} else {
			log::warn!(
				"{}Skipping unknown {} chunk {} at offset {} ({} bytes).",
				scope, self.name, header.fourcc(), offset, header.size,
			);
			view.seek_to(payload_end)?;
		}
		Ok(())
	}

	/// Reads chunks until the end of the buffer. The view must be at its start.
	pub fn read_all(
		&self,
		target: &mut S,
		active: Components,
		view: &mut ByteView<'_>,
		ctx: &mut R,
		scope: LogScope,
	) -> AdtResult<()> {
		if view.tell() != 0 {
			return Err(AdtError::NonZeroStart(view.tell()));
		}
		if view.is_eof() {
			return Err(AdtError::EmptyBuffer);
		}
		let end = view.size();
		while !view.is_eof() {
			self.read_one(target, active, view, end, ctx, scope)?;
		}
		Ok(())
	}

	/// Reads chunks filling exactly `size` bytes from the cursor.
	pub fn read_range(
		&self,
		target: &mut S,
		active: Components,
		view: &mut ByteView<'_>,
		size: usize,
		ctx: &mut R,
		scope: LogScope,
	) -> AdtResult<()> {
		let end = view.check_range(view.tell(), size)?.end;
		while view.tell() < end {
			self.read_one(target, active, view, end, ctx, scope)?;
		}
		Ok(())
	}

	/// Writes every field of every active entry in declaration order.
	pub fn write(
		&self,
		target: &S,
		active: Components,
		buffer: &mut ByteBuffer,
		ctx: &mut W,
		scope: LogScope,
	) -> AdtResult<()> {
		let mut component_index = 0;
		for entry in self.entries {
			match entry {
				Entry::Field(field) => (field.write)(target, buffer, ctx, scope)?,
				Entry::Component(component) => {
					let index = component_index;
					component_index += 1;
					crate::continue_if!(!active.contains(index));
					for field in component.fields {
						(field.write)(target, buffer, ctx, scope)?;
					}
				}
			}
		}
		Ok(())
	}
}

/// Builds a [Field] for a struct member that implements
/// [Chunk](crate::io::chunk::Chunk), ignoring the read and write contexts.
/// ```rs
/// chunk_field!(MFBO => flight_bounds)
/// ```
#[macro_export]
macro_rules! chunk_field {
	($tag:expr => $($member:ident).+) => {
		$crate::io::schema::Field {
			tag: $tag,
			read: |target, view, header, _, _| {
				$crate::io::chunk::Chunk::read(&mut target.$($member).+, view, header)
			},
			write: |target, buffer, _, _| {
				$crate::io::chunk::Chunk::write(&target.$($member).+, buffer)
			},
		}
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::{
		chunk::*,
		fourcc::fourcc,
		version::VersionRange,
	};

	const AAAA: u32 = fourcc(b"AAAA");
	const BBBB: u32 = fourcc(b"BBBB");
	const CCCC: u32 = fourcc(b"CCCC");
	const XTRA: u32 = fourcc(b"XTRA");

	#[derive(Default)]
	struct Sample {
		first: DataChunk<u32, AAAA>,
		values: DataArrayChunk<u16, BBBB>,
		late: DataChunk<u32, CCCC>,
		extra: Vec<u32>,
	}

	#[derive(Default)]
	struct Counter {
		reads: usize,
	}

	fn count_first(target: &mut Sample, view: &mut ByteView<'_>, header: &ChunkHeader, ctx: &mut Counter, _: LogScope) -> AdtResult<()> {
		ctx.reads += 1;
		target.first.read(view, header)
	}

	fn write_first(target: &Sample, buffer: &mut ByteBuffer, _: &mut (), _: LogScope) -> AdtResult<()> {
		target.first.write(buffer)
	}

	fn read_extra(target: &mut Sample, view: &mut ByteView<'_>, header: &ChunkHeader, _: &mut Counter, _: LogScope) -> AdtResult<bool> {
		if header.tag != XTRA {
			return Ok(false);
		}
		target.extra.push(view.read_u32()?);
		Ok(true)
	}

	static SAMPLE: Schema<Sample, Counter, ()> = Schema {
		name: "sample",
		entries: &[
			Entry::Field(Field { tag: AAAA, read: count_first, write: write_first }),
			Entry::Component(Component {
				name: "late",
				gate: Gate::versions(VersionRange::from(ClientVersion::Mop)),
				fields: &[chunk_field!(CCCC => late)],
			}),
			Entry::Field(chunk_field!(BBBB => values)),
		],
		extension: Some(read_extra),
	};

	fn chunk(tag: u32, payload: &[u8]) -> Vec<u8> {
		let mut bytes = tag.to_le_bytes().to_vec();
		bytes.extend((payload.len() as u32).to_le_bytes());
		bytes.extend(payload);
		bytes
	}

	fn read(bytes: &[u8], version: ClientVersion) -> AdtResult<(Sample, Counter)> {
		let mut sample = Sample::default();
		let mut counter = Counter::default();
		let active = SAMPLE.resolve(version, LodLevel::Normal);
		SAMPLE.read_all(&mut sample, active, &mut ByteView::new(bytes), &mut counter, LogScope::ROOT)?;
		Ok((sample, counter))
	}

	#[test]
	fn unknown_chunks_are_skipped() -> AdtResult<()> {
		let bytes = [
			chunk(AAAA, &7u32.to_le_bytes()),
			chunk(fourcc(b"ZZZZ"), &[0xFF; 13]),
			chunk(BBBB, &[1, 0, 2, 0]),
		].concat();
		let (sample, counter) = read(&bytes, ClientVersion::Cata)?;
		assert_eq!(sample.first.get(), Some(&7));
		assert_eq!(&*sample.values, &[1, 2]);
		assert_eq!(counter.reads, 1);
		Ok(())
	}

	#[test]
	fn components_follow_the_version() -> AdtResult<()> {
		let bytes = chunk(CCCC, &9u32.to_le_bytes());
		let (cata, _) = read(&bytes, ClientVersion::Cata)?;
		assert!(!cata.late.is_initialized());
		let (mop, _) = read(&bytes, ClientVersion::Mop)?;
		assert_eq!(mop.late.get(), Some(&9));
		assert_eq!(SAMPLE.active_names(SAMPLE.resolve(ClientVersion::Legion, LodLevel::Lod)), vec!["late"]);
		Ok(())
	}

	#[test]
	fn duplicates_and_extension() -> AdtResult<()> {
		let bytes = [
			chunk(AAAA, &1u32.to_le_bytes()),
			chunk(XTRA, &5u32.to_le_bytes()),
			chunk(AAAA, &2u32.to_le_bytes()),
			chunk(BBBB, &[]),
		].concat();
		let (sample, counter) = read(&bytes, ClientVersion::Cata)?;
		assert_eq!(sample.first.get(), Some(&2));
		assert_eq!(counter.reads, 2);
		assert_eq!(sample.extra, vec![5]);
		assert!(sample.values.is_initialized());
		assert!(sample.values.is_empty());
		Ok(())
	}

	#[test]
	fn framing_errors() {
		// A handler that stops short of the declared size.
		let short = chunk(XTRA, &[0; 8]);
		assert!(matches!(
			read(&short, ClientVersion::Cata),
			Err(AdtError::ChunkSizeMismatch { expected: 8, consumed: 4, offset: 0, .. })
		));
		let mut overrun = chunk(AAAA, &1u32.to_le_bytes());
		overrun[4] = 40;
		assert!(matches!(read(&overrun, ClientVersion::Cata), Err(AdtError::ChunkOverrun { .. })));
		let mut truncated = chunk(AAAA, &1u32.to_le_bytes());
		truncated.extend([0, 1, 2]);
		assert!(matches!(read(&truncated, ClientVersion::Cata), Err(AdtError::TruncatedHeader { offset: 12 })));
		assert!(matches!(read(&[], ClientVersion::Cata), Err(AdtError::EmptyBuffer)));
	}

	#[test]
	fn sub_range_must_end_on_the_boundary() -> AdtResult<()> {
		let bytes = [chunk(BBBB, &[3, 0]), chunk(AAAA, &4u32.to_le_bytes())].concat();
		let mut sample = Sample::default();
		let mut view = ByteView::new(&bytes);
		let active = SAMPLE.resolve(ClientVersion::Cata, LodLevel::Normal);
		SAMPLE.read_range(&mut sample, active, &mut view, 10, &mut Counter::default(), LogScope::ROOT)?;
		assert_eq!(view.tell(), 10);
		assert_eq!(&*sample.values, &[3]);
		let mut view = ByteView::new(&bytes);
		assert!(matches!(
			SAMPLE.read_range(&mut sample, active, &mut view, 14, &mut Counter::default(), LogScope::ROOT),
			Err(AdtError::ChunkOverrun { offset: 10, end: 14, .. })
		));
		Ok(())
	}

	#[test]
	fn write_order_and_gating() -> AdtResult<()> {
		let mut sample = Sample::default();
		sample.first.set(1);
		sample.late.set(2);
		sample.values.push(3);
		let mut cata = ByteBuffer::new();
		SAMPLE.write(&sample, SAMPLE.resolve(ClientVersion::Cata, LodLevel::Normal), &mut cata, &mut (), LogScope::ROOT)?;
		assert_eq!(cata.as_slice(), [chunk(AAAA, &1u32.to_le_bytes()), chunk(BBBB, &[3, 0])].concat().as_slice());
		let mut mop = ByteBuffer::new();
		SAMPLE.write(&sample, SAMPLE.resolve(ClientVersion::Mop, LodLevel::Normal), &mut mop, &mut (), LogScope::ROOT)?;
		assert_eq!(mop.as_slice(), [
			chunk(AAAA, &1u32.to_le_bytes()),
			chunk(CCCC, &2u32.to_le_bytes()),
			chunk(BBBB, &[3, 0]),
		].concat().as_slice());
		Ok(())
	}
}
