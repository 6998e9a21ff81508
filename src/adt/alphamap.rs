//! Alpha maps (MCAL): per texture layer opacity masks of 64x64 pixels.
//!
//! In memory every layer is always the expanded 8-bit form. On disk a layer is one of:
//! * 4096 raw bytes (high resolution),
//! * 4096 pixels run-length compressed (high resolution only),
//! * 2048 bytes of packed nibbles (low resolution).
//!
//! Low resolution layers are stored independently of each other and turned
//! into cumulative opacities on read, so writing them has to undo that first.
//! The base layer is implicit and never stored.

use crate::{
	io::buffer::*,
	AdtError,
	AdtResult,
};

pub const ALPHAMAP_DIM: usize = 64;
pub const ALPHAMAP_PIXELS: usize = ALPHAMAP_DIM * ALPHAMAP_DIM;
pub const HIGHRES_LAYER_BYTES: usize = ALPHAMAP_PIXELS;
pub const LOWRES_LAYER_BYTES: usize = ALPHAMAP_PIXELS / 2;
/// A cell holds at most 4 texture layers, and the first has no alpha map.
pub const MAX_ALPHA_LAYERS: usize = 3;

/// Bit in a compressed control byte that selects a fill run. Clear means copy.
const FILL_FLAG: u8 = 0x80;
const COUNT_MASK: u8 = 0x7F;

/// Bit depth of the stored alpha maps. Comes from the map's WDT flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaFormat {
	/// 4 bits per pixel.
	LowRes,
	/// 8 bits per pixel.
	#[default]
	HighRes,
}

/// Whether a layer is run-length compressed. Chosen per layer by its layer flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaCompression {
	#[default]
	Uncompressed,
	Compressed,
}

pub type AlphaLayer = Box<[u8; ALPHAMAP_PIXELS]>;

fn empty_layer() -> AlphaLayer {
	Box::new([0u8; ALPHAMAP_PIXELS])
}

/// The alpha maps of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlphaMaps {
	layers: Vec<AlphaLayer>,
}

impl AlphaMaps {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	pub fn layers(&self) -> &[AlphaLayer] {
		&self.layers
	}

	pub fn layer(&self, index: usize) -> Option<&[u8; ALPHAMAP_PIXELS]> {
		self.layers.get(index).map(|layer| &**layer)
	}

	pub fn layer_mut(&mut self, index: usize) -> Option<&mut [u8; ALPHAMAP_PIXELS]> {
		self.layers.get_mut(index).map(|layer| &mut **layer)
	}

	/// Appends a transparent layer and returns it.
	pub fn add_layer(&mut self) -> AdtResult<&mut [u8; ALPHAMAP_PIXELS]> {
		self.push_layer(empty_layer())?;
		let index = self.layers.len() - 1;
		Ok(&mut *self.layers[index])
	}

	pub fn push_layer(&mut self, layer: AlphaLayer) -> AdtResult<()> {
		if self.layers.len() >= MAX_ALPHA_LAYERS {
			return Err(AdtError::AlphaLayerCount(self.layers.len() + 1));
		}
		self.layers.push(layer);
		Ok(())
	}

	pub fn remove_layer(&mut self, index: usize) -> Option<AlphaLayer> {
		(index < self.layers.len()).then(|| self.layers.remove(index))
	}

	pub fn pixel(&self, layer: usize, x: usize, y: usize) -> Option<u8> {
		self.layer(layer).and_then(|layer| layer.get(y * ALPHAMAP_DIM + x).copied())
	}

	/// Opacity left over for the implicit base layer at `pixel`.
	pub fn base_opacity(&self, pixel: usize) -> u8 {
		let used: u32 = self.layers.iter().map(|layer| layer[pixel] as u32).sum();
		255u32.saturating_sub(used) as u8
	}

	/// Decodes one alpha map per entry of `compressions`.
	/// `fix` repairs the last row and column and is only valid for [AlphaFormat::LowRes].
	pub fn read(
		view: &mut ByteView<'_>,
		format: AlphaFormat,
		compressions: &[AlphaCompression],
		fix: bool,
	) -> AdtResult<Self> {
		check_layout(format, compressions)?;
		let mut layers = Vec::with_capacity(compressions.len());
		match format {
			AlphaFormat::HighRes => {
				if fix {
					return Err(AdtError::FixHighRes);
				}
				for (index, compression) in compressions.iter().enumerate() {
					layers.push(match compression {
						AlphaCompression::Uncompressed => decode_highres(view)?,
						AlphaCompression::Compressed => decode_compressed(view, index)?,
					});
				}
			}
			AlphaFormat::LowRes => {
				for _ in compressions {
					let mut layer = decode_lowres(view)?;
					if fix {
						fix_edges(&mut layer);
					}
					layers.push(layer);
				}
				normalize_lowres(&mut layers)?;
			}
		}
		Ok(Self { layers })
	}

	/// Encodes every layer separately, in order. Compressed sizes vary, so
	/// callers that need per-layer offsets use this instead of [AlphaMaps::write].
	pub fn encode_layers(&self, format: AlphaFormat, compressions: &[AlphaCompression]) -> AdtResult<Vec<Vec<u8>>> {
		check_layout(format, compressions)?;
		if compressions.len() != self.layers.len() {
			return Err(AdtError::AlphaLayerCount(compressions.len()));
		}
		match format {
			AlphaFormat::HighRes => {
				self.layers.iter()
					.zip(compressions)
					.map(|(layer, compression)| match compression {
						AlphaCompression::Uncompressed => Ok(layer.to_vec()),
						AlphaCompression::Compressed => encode_compressed(layer),
					})
					.collect()
			}
			AlphaFormat::LowRes => {
				Ok(denormalize_lowres(&self.layers).iter()
					.map(|layer| pack_lowres(layer))
					.collect())
			}
		}
	}

	pub fn write(&self, buffer: &mut ByteBuffer, format: AlphaFormat, compressions: &[AlphaCompression]) -> AdtResult<()> {
		for layer in self.encode_layers(format, compressions)? {
			buffer.write_bytes(&layer)?;
		}
		Ok(())
	}
}

fn check_layout(format: AlphaFormat, compressions: &[AlphaCompression]) -> AdtResult<()> {
	if compressions.len() > MAX_ALPHA_LAYERS {
		return Err(AdtError::AlphaLayerCount(compressions.len()));
	}
	if format == AlphaFormat::LowRes && compressions.contains(&AlphaCompression::Compressed) {
		return Err(AdtError::CompressedLowRes);
	}
	Ok(())
}

pub fn decode_highres(view: &mut ByteView<'_>) -> AdtResult<AlphaLayer> {
	let mut layer = empty_layer();
	view.read_into(&mut layer[..])?;
	Ok(layer)
}

/// Decodes `(control, payload)` runs until the layer has exactly 4096 pixels.
pub fn decode_compressed(view: &mut ByteView<'_>, layer_index: usize) -> AdtResult<AlphaLayer> {
	let mut layer = empty_layer();
	let mut pixel = 0;
	while pixel < ALPHAMAP_PIXELS {
		let offset = view.tell();
		let control = view.read_u8()?;
		let count = (control & COUNT_MASK) as usize;
		if count == 0 {
			return Err(AdtError::AlphaEmptyRun { offset });
		}
		if pixel + count > ALPHAMAP_PIXELS {
			return Err(AdtError::AlphaOverrun {
				offset,
				layer: layer_index,
				pixel,
				count,
			});
		}
		let run = &mut layer[pixel..pixel + count];
		if control & FILL_FLAG != 0 {
			run.fill(view.read_u8()?);
		} else {
			view.read_into(run)?;
		}
		pixel += count;
	}
	Ok(layer)
}

/// Expands 2048 packed bytes. The low nibble is the left pixel of the pair.
pub fn decode_lowres(view: &mut ByteView<'_>) -> AdtResult<AlphaLayer> {
	let packed = view.read_slice(LOWRES_LAYER_BYTES)?;
	let mut layer = empty_layer();
	for (pair, &byte) in layer.chunks_exact_mut(2).zip(packed) {
		let low = byte & 0x0F;
		let high = byte & 0xF0;
		pair[0] = (low << 4) | low;
		pair[1] = high | (high >> 4);
	}
	Ok(layer)
}

/// Copies the second to last column and row over the last ones.
/// Some tools only filled 63x63 pixels of low resolution maps.
pub fn fix_edges(layer: &mut [u8; ALPHAMAP_PIXELS]) {
	const LAST: usize = ALPHAMAP_DIM - 1;
	for row in 0..ALPHAMAP_DIM {
		layer[row * ALPHAMAP_DIM + LAST] = layer[row * ALPHAMAP_DIM + LAST - 1];
	}
	for column in 0..ALPHAMAP_DIM {
		layer[LAST * ALPHAMAP_DIM + column] = layer[(LAST - 1) * ALPHAMAP_DIM + column];
	}
	layer[LAST * ALPHAMAP_DIM + LAST] = layer[(LAST - 1) * ALPHAMAP_DIM + LAST - 1];
}

/// Turns independent per-layer values into cumulative contributions.
/// Walking from the first layer, each value is scaled by the opacity still
/// left (`round(raw * budget / 255)`) and then taken out of that budget.
pub fn normalize_lowres(layers: &mut [AlphaLayer]) -> AdtResult<()> {
	for pixel in 0..ALPHAMAP_PIXELS {
		let mut budget = 255u32;
		for (index, layer) in layers.iter_mut().enumerate() {
			let scaled = layer[pixel] as u32 * budget;
			let value = scaled / 255 + if scaled % 255 > 127 { 1 } else { 0 };
			if value > budget {
				return Err(AdtError::AlphaUnderflow { layer: index, pixel });
			}
			budget -= value;
			layer[pixel] = value as u8;
		}
	}
	Ok(())
}

/// Inverse of [normalize_lowres]: rescales cumulative contributions back to
/// independent 0..=255 values (`round(raw * 255 / budget)`), zero once the
/// budget is gone.
/// Lossy past the first layer: a later layer with a small budget rescales to
/// values under 16, which [pack_lowres] truncates to zero.
pub fn denormalize_lowres(layers: &[AlphaLayer]) -> Vec<AlphaLayer> {
	let mut result: Vec<AlphaLayer> = layers.iter().map(|_| empty_layer()).collect();
	for pixel in 0..ALPHAMAP_PIXELS {
		let mut budget = 255i32;
		for (layer, out) in layers.iter().zip(result.iter_mut()) {
			if budget <= 0 {
				out[pixel] = 0;
				continue;
			}
			let raw = layer[pixel] as u32;
			let scaled = raw * 255;
			let div = budget as u32;
			let value = scaled / div + if scaled % div <= div >> 1 { 0 } else { 1 };
			out[pixel] = value.min(255) as u8;
			budget -= raw as i32;
		}
	}
	result
}

/// Keeps the high nibble of each pixel, two pixels per byte.
pub fn pack_lowres(layer: &[u8; ALPHAMAP_PIXELS]) -> Vec<u8> {
	layer.chunks_exact(2)
		.map(|pair| (pair[0] >> 4) | (pair[1] & 0xF0))
		.collect()
}

/// Greedy run-length encoding, one 64 pixel row at a time.
/// Runs of two or more become fill blocks. Single pixels are gathered into a
/// copy block whose control byte is written first and patched when it closes.
pub fn encode_compressed(layer: &[u8; ALPHAMAP_PIXELS]) -> AdtResult<Vec<u8>> {
	let mut out = ByteBuffer::new();
	for row in layer.chunks_exact(ALPHAMAP_DIM) {
		// (position of the control byte, pixels so far)
		let mut copy: Option<(usize, u8)> = None;
		let mut start = 0;
		while start < row.len() {
			let value = row[start];
			let run = row[start..].iter().take_while(|&&pixel| pixel == value).count();
			if run > 1 {
				if let Some((position, count)) = copy.take() {
					out.write_bytes_at(&[count], position)?;
				}
				out.write_u8(FILL_FLAG | run as u8)?;
				out.write_u8(value)?;
			} else {
				let (_, count) = match copy.as_mut() {
					Some(block) => block,
					None => {
						let position = out.tell();
						out.write_u8(0)?;
						copy.insert((position, 0))
					}
				};
				*count += 1;
				out.write_u8(value)?;
			}
			start += run;
		}
		if let Some((position, count)) = copy {
			out.write_bytes_at(&[count], position)?;
		}
	}
	Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, Rng, SeedableRng};

	fn random_layer(rng: &mut StdRng) -> AlphaLayer {
		let mut layer = empty_layer();
		rng.fill(&mut layer[..]);
		layer
	}

	/// Layers with long runs so that compression produces fill blocks too.
	fn banded_layer(rng: &mut StdRng) -> AlphaLayer {
		let mut layer = empty_layer();
		for pixel in layer.iter_mut() {
			if rng.gen_ratio(1, 6) {
				*pixel = rng.gen();
			} else {
				*pixel = 0x40;
			}
		}
		layer
	}

	fn decode(bytes: &[u8], format: AlphaFormat, compressions: &[AlphaCompression], fix: bool) -> AdtResult<AlphaMaps> {
		let mut view = ByteView::new(bytes);
		let maps = AlphaMaps::read(&mut view, format, compressions, fix)?;
		assert!(view.is_eof());
		Ok(maps)
	}

	fn encode(maps: &AlphaMaps, format: AlphaFormat, compressions: &[AlphaCompression]) -> AdtResult<Vec<u8>> {
		let mut buffer = ByteBuffer::new();
		maps.write(&mut buffer, format, compressions)?;
		Ok(buffer.into_inner())
	}

	#[test]
	fn highres_round_trip() -> AdtResult<()> {
		use AlphaCompression::*;
		let mut rng = StdRng::seed_from_u64(1);
		let mut maps = AlphaMaps::new();
		maps.push_layer(random_layer(&mut rng))?;
		maps.push_layer(banded_layer(&mut rng))?;
		maps.push_layer(banded_layer(&mut rng))?;
		for compressions in [[Uncompressed; 3], [Compressed; 3], [Compressed, Uncompressed, Compressed]] {
			let bytes = encode(&maps, AlphaFormat::HighRes, &compressions)?;
			assert_eq!(decode(&bytes, AlphaFormat::HighRes, &compressions, false)?, maps);
		}
		let raw = encode(&maps, AlphaFormat::HighRes, &[Uncompressed; 3])?;
		assert_eq!(raw.len(), 3 * HIGHRES_LAYER_BYTES);
		Ok(())
	}

	#[test]
	fn greedy_fill_runs() -> AdtResult<()> {
		let mut layer = empty_layer();
		layer[..8].copy_from_slice(&[5, 5, 5, 9, 9, 1, 1, 1]);
		let encoded = encode_compressed(&layer)?;
		assert_eq!(&encoded[..8], &[0x83, 5, 0x82, 9, 0x83, 1, 0x80 | 56, 0]);
		// Every remaining row is a single fill of zeroes.
		assert_eq!(encoded.len(), 8 + 63 * 2);
		assert!(encoded[8..].chunks(2).all(|block| block == [0x80 | 64, 0]));
		Ok(())
	}

	#[test]
	fn copy_blocks_are_patched() -> AdtResult<()> {
		let mut layer = empty_layer();
		layer[..4].copy_from_slice(&[1, 2, 3, 3]);
		// The row ends on single pixels, closing the copy block at the row end.
		layer[62] = 7;
		layer[63] = 8;
		let encoded = encode_compressed(&layer)?;
		assert_eq!(&encoded[..10], &[0x02, 1, 2, 0x82, 3, 0x80 | 58, 0, 0x02, 7, 8]);
		let maps = decode(&encoded, AlphaFormat::HighRes, &[AlphaCompression::Compressed], false)?;
		assert_eq!(maps.layer(0), Some(&*layer));
		Ok(())
	}

	#[test]
	fn compressed_errors() {
		let compressed = [AlphaCompression::Compressed];
		assert!(matches!(
			decode(&[0x00], AlphaFormat::HighRes, &compressed, false),
			Err(AdtError::AlphaEmptyRun { offset: 0 })
		));
		// 64 fills of 64 pixels, then one more pixel.
		let mut overrun: Vec<u8> = (0..63).flat_map(|_| [0x80 | 64, 0]).collect();
		overrun.extend([0x80 | 63, 0, 0x82, 0]);
		assert!(matches!(
			decode(&overrun, AlphaFormat::HighRes, &compressed, false),
			Err(AdtError::AlphaOverrun { pixel: 4095, count: 2, .. })
		));
		assert!(matches!(
			decode(&[0; 2048], AlphaFormat::LowRes, &compressed, false),
			Err(AdtError::CompressedLowRes)
		));
		assert!(matches!(
			decode(&[0; 4096], AlphaFormat::HighRes, &[AlphaCompression::Uncompressed], true),
			Err(AdtError::FixHighRes)
		));
		assert!(matches!(
			decode(&[], AlphaFormat::HighRes, &[AlphaCompression::Uncompressed; 4], false),
			Err(AdtError::AlphaLayerCount(4))
		));
	}

	#[test]
	fn lowres_saturation() -> AdtResult<()> {
		let bytes = [vec![0xFF; LOWRES_LAYER_BYTES], vec![0x88; LOWRES_LAYER_BYTES]].concat();
		let maps = decode(&bytes, AlphaFormat::LowRes, &[AlphaCompression::Uncompressed; 2], false)?;
		assert!(maps.layer(0).unwrap().iter().all(|&pixel| pixel == 255));
		assert!(maps.layer(1).unwrap().iter().all(|&pixel| pixel == 0));
		assert_eq!(maps.base_opacity(100), 0);
		Ok(())
	}

	#[test]
	fn lowres_nibble_expansion() -> AdtResult<()> {
		let mut bytes = vec![0u8; LOWRES_LAYER_BYTES];
		bytes[0] = 0xA3;
		let maps = decode(&bytes, AlphaFormat::LowRes, &[AlphaCompression::Uncompressed], false)?;
		assert_eq!(maps.pixel(0, 0, 0), Some(0x33));
		assert_eq!(maps.pixel(0, 1, 0), Some(0xAA));
		assert_eq!(maps.pixel(0, 2, 0), Some(0));
		Ok(())
	}

	#[test]
	fn lowres_conservation() -> AdtResult<()> {
		let mut rng = StdRng::seed_from_u64(2);
		let mut bytes = vec![0u8; 3 * LOWRES_LAYER_BYTES];
		rng.fill(&mut bytes[..]);
		let maps = decode(&bytes, AlphaFormat::LowRes, &[AlphaCompression::Uncompressed; 3], false)?;
		for pixel in 0..ALPHAMAP_PIXELS {
			let used: u32 = maps.layers().iter().map(|layer| layer[pixel] as u32).sum();
			assert!(used <= 255);
			assert_eq!(used + maps.base_opacity(pixel) as u32, 255);
		}
		Ok(())
	}

	#[test]
	fn lowres_round_trip() -> AdtResult<()> {
		let mut rng = StdRng::seed_from_u64(3);
		let mut bytes = vec![0u8; LOWRES_LAYER_BYTES];
		rng.fill(&mut bytes[..]);
		let single = [AlphaCompression::Uncompressed];
		let maps = decode(&bytes, AlphaFormat::LowRes, &single, false)?;
		let encoded = encode(&maps, AlphaFormat::LowRes, &single)?;
		assert_eq!(encoded, bytes);
		assert_eq!(decode(&encoded, AlphaFormat::LowRes, &single, false)?, maps);

		// Two layers that leave most of the budget to the second one.
		let two = [AlphaCompression::Uncompressed; 2];
		let bytes = [vec![0x11; LOWRES_LAYER_BYTES], vec![0xFF; LOWRES_LAYER_BYTES]].concat();
		let maps = decode(&bytes, AlphaFormat::LowRes, &two, false)?;
		assert_eq!(maps.pixel(1, 5, 5), Some(238));
		assert_eq!(decode(&encode(&maps, AlphaFormat::LowRes, &two)?, AlphaFormat::LowRes, &two, false)?, maps);
		Ok(())
	}

	#[test]
	fn lowres_later_layers_lose_faint_alpha() -> AdtResult<()> {
		// 0xCC leaves a budget of 51 for the second layer, so 0x11 scales down to 3.
		let two = [AlphaCompression::Uncompressed; 2];
		let bytes = [vec![0xCC; LOWRES_LAYER_BYTES], vec![0x11; LOWRES_LAYER_BYTES]].concat();
		let maps = decode(&bytes, AlphaFormat::LowRes, &two, false)?;
		assert_eq!(maps.pixel(0, 43, 0), Some(204));
		assert_eq!(maps.pixel(1, 43, 0), Some(3));

		// 3 rescales to 15, which has no high nibble left to store.
		assert_eq!(denormalize_lowres(maps.layers())[1][43], 15);
		let encoded = encode(&maps, AlphaFormat::LowRes, &two)?;
		assert_eq!(&encoded[..LOWRES_LAYER_BYTES], &bytes[..LOWRES_LAYER_BYTES]);
		assert!(encoded[LOWRES_LAYER_BYTES..].iter().all(|&byte| byte == 0));

		let again = decode(&encoded, AlphaFormat::LowRes, &two, false)?;
		assert_eq!(again.pixel(0, 43, 0), Some(204));
		assert_eq!(again.pixel(1, 43, 0), Some(0));
		assert_ne!(again, maps);
		Ok(())
	}

	#[test]
	fn lowres_fix_is_read_only() -> AdtResult<()> {
		let mut bytes = vec![0u8; LOWRES_LAYER_BYTES];
		for row in 0..ALPHAMAP_DIM {
			// Pixel 62 gets 0x5, pixel 63 gets 0xF.
			bytes[row * 32 + 31] = 0xF5;
		}
		bytes[63 * 32..].fill(0xFF);
		let single = [AlphaCompression::Uncompressed];
		let fixed = decode(&bytes, AlphaFormat::LowRes, &single, true)?;
		assert_eq!(fixed.pixel(0, 63, 0), Some(0x55));
		assert_eq!(fixed.pixel(0, 10, 63), Some(0));
		assert_eq!(fixed.pixel(0, 63, 63), Some(0x55));
		// The repair is not undone on write, so the original bytes do not come back.
		let encoded = encode(&fixed, AlphaFormat::LowRes, &single)?;
		assert_ne!(encoded, bytes);
		assert_eq!(decode(&encoded, AlphaFormat::LowRes, &single, false)?, fixed);
		Ok(())
	}

	#[test]
	fn layer_limit() -> AdtResult<()> {
		let mut maps = AlphaMaps::new();
		maps.add_layer()?[0] = 3;
		maps.add_layer()?;
		maps.add_layer()?;
		assert!(matches!(maps.add_layer(), Err(AdtError::AlphaLayerCount(4))));
		assert_eq!(maps.remove_layer(0).map(|layer| layer[0]), Some(3));
		assert_eq!(maps.len(), 2);
		assert!(maps.remove_layer(5).is_none());
		Ok(())
	}
}
