//! Tile pixel codec
//!
//! A tile's raw form is a premultiplied-alpha RGBA8 buffer. Compression
//! splits it into two planes: the color channels go through a lossy JPEG
//! encode (JPEG has no alpha), the alpha plane through lossless zlib. Alpha
//! must round-trip exactly; color only needs to be visually lossless.
//!
//! Inflation recombines the planes and clamps each color channel to its
//! alpha, so a lossy color decode can never yield a buffer that violates
//! premultiplication. A failed decode yields an error, never a partial image.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;

use crate::geometry::Size;

const CHANNELS: usize = 4;

/// Premultiplied RGBA8 pixel buffer for one tile.
#[derive(Clone, Debug)]
pub struct RawBitmap {
    pixels: Vec<u8>,
    size: Size,
}

impl RawBitmap {
    /// Wrap a pixel buffer, validating its length against the dimensions.
    pub fn new(pixels: Vec<u8>, size: Size) -> Result<Self, CodecFault> {
        let expected = size.width as usize * size.height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(CodecFault::mismatch(format!(
                "buffer is {} bytes, {}x{} RGBA needs {expected}",
                pixels.len(),
                size.width,
                size.height,
            )));
        }
        Ok(Self { pixels, size })
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True when every color channel is at most its pixel's alpha.
    #[must_use]
    pub fn is_premultiplied(&self) -> bool {
        self.pixels
            .chunks_exact(CHANNELS)
            .all(|px| px[0] <= px[3] && px[1] <= px[3] && px[2] <= px[3])
    }
}

/// Errors from compressing or inflating a tile.
#[derive(Debug, thiserror::Error)]
pub enum CodecFault {
    #[error("color codec: {0}")]
    Color(#[from] image::ImageError),

    #[error("alpha stream: {0}")]
    Alpha(#[from] std::io::Error),

    #[error("{detail}")]
    Mismatch { detail: String },
}

impl CodecFault {
    pub fn mismatch(detail: impl Into<String>) -> Self {
        Self::Mismatch {
            detail: detail.into(),
        }
    }
}

/// JPEG-encode the color plane.
pub fn compress_color(bitmap: &RawBitmap, quality: u8) -> Result<Vec<u8>, CodecFault> {
    let size = bitmap.size();
    let mut rgb = Vec::with_capacity(size.width as usize * size.height as usize * 3);
    for px in bitmap.pixels().chunks_exact(CHANNELS) {
        rgb.extend_from_slice(&px[..3]);
    }

    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
    encoder.encode(
        &rgb,
        size.width,
        size.height,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(encoded)
}

/// Zlib-encode the alpha plane. Lossless by construction.
pub fn compress_alpha(bitmap: &RawBitmap) -> Result<Vec<u8>, CodecFault> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    for px in bitmap.pixels().chunks_exact(CHANNELS) {
        encoder.write_all(&px[3..4])?;
    }
    Ok(encoder.finish()?)
}

/// Recombine an encoded color plane and alpha plane into a premultiplied
/// RGBA buffer of the expected dimensions.
pub fn inflate(color: &[u8], alpha: &[u8], size: Size) -> Result<RawBitmap, CodecFault> {
    let decoded = image::load_from_memory_with_format(color, ImageFormat::Jpeg)?.into_rgb8();
    if decoded.width() != size.width || decoded.height() != size.height {
        return Err(CodecFault::mismatch(format!(
            "color plane decoded to {}x{}, expected {}x{}",
            decoded.width(),
            decoded.height(),
            size.width,
            size.height,
        )));
    }

    let pixel_count = size.width as usize * size.height as usize;
    let mut alpha_plane = Vec::with_capacity(pixel_count);
    ZlibDecoder::new(alpha).read_to_end(&mut alpha_plane)?;
    if alpha_plane.len() != pixel_count {
        return Err(CodecFault::mismatch(format!(
            "alpha plane is {} bytes, expected {pixel_count}",
            alpha_plane.len(),
        )));
    }

    let rgb = decoded.into_raw();
    let mut pixels = Vec::with_capacity(pixel_count * CHANNELS);
    for (px, &a) in rgb.chunks_exact(3).zip(&alpha_plane) {
        // JPEG is lossy; clamp so the result stays premultiplied.
        pixels.push(px[0].min(a));
        pixels.push(px[1].min(a));
        pixels.push(px[2].min(a));
        pixels.push(a);
    }

    RawBitmap::new(pixels, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Opaque tile with smooth color gradients; kind to a lossy codec.
    fn gradient(size: Size) -> RawBitmap {
        let mut pixels = Vec::new();
        for y in 0..size.height {
            for x in 0..size.width {
                pixels.extend_from_slice(&[(x * 12) as u8, (y * 12) as u8, 128, 255]);
            }
        }
        RawBitmap::new(pixels, size).unwrap()
    }

    /// Fully transparent/opaque alpha checker over black; alpha is the only
    /// channel with structure, and it never goes through the lossy path.
    fn alpha_checker(size: Size) -> RawBitmap {
        let mut pixels = Vec::new();
        for y in 0..size.height {
            for x in 0..size.width {
                let a = if (x + y) % 2 == 0 { 255 } else { 0 };
                pixels.extend_from_slice(&[0, 0, 0, a]);
            }
        }
        RawBitmap::new(pixels, size).unwrap()
    }

    #[test]
    fn alpha_round_trips_exactly() {
        let size = Size::new(16, 16);
        let original = alpha_checker(size);
        let color = compress_color(&original, 90).unwrap();
        let alpha = compress_alpha(&original).unwrap();

        let inflated = inflate(&color, &alpha, size).unwrap();
        let original_alpha: Vec<u8> =
            original.pixels().chunks_exact(4).map(|px| px[3]).collect();
        let inflated_alpha: Vec<u8> =
            inflated.pixels().chunks_exact(4).map(|px| px[3]).collect();
        assert_eq!(original_alpha, inflated_alpha);
    }

    #[test]
    fn color_round_trips_within_threshold() {
        let size = Size::new(16, 16);
        let original = gradient(size);
        let color = compress_color(&original, 90).unwrap();
        let alpha = compress_alpha(&original).unwrap();

        let inflated = inflate(&color, &alpha, size).unwrap();
        let worst = original
            .pixels()
            .iter()
            .zip(inflated.pixels())
            .map(|(&a, &b)| a.abs_diff(b))
            .max()
            .unwrap();
        // Visually lossless, not bit-exact.
        assert!(worst <= 48, "worst channel delta {worst}");
    }

    #[test]
    fn inflated_buffer_stays_premultiplied() {
        let size = Size::new(16, 16);
        let original = alpha_checker(size);
        let color = compress_color(&original, 60).unwrap();
        let alpha = compress_alpha(&original).unwrap();

        // Lossy decode may bleed color into transparent pixels; the clamp
        // must pull those back under their alpha.
        let inflated = inflate(&color, &alpha, size).unwrap();
        assert!(inflated.is_premultiplied());
    }

    #[test]
    fn corrupt_color_plane_fails_cleanly() {
        let size = Size::new(8, 8);
        let original = gradient(size);
        let alpha = compress_alpha(&original).unwrap();

        assert!(inflate(&[0xde, 0xad, 0xbe, 0xef], &alpha, size).is_err());
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let size = Size::new(8, 8);
        let original = gradient(size);
        let color = compress_color(&original, 90).unwrap();
        let alpha = compress_alpha(&original).unwrap();

        assert!(inflate(&color, &alpha, Size::new(4, 4)).is_err());
    }

    #[test]
    fn wrong_length_buffer_is_rejected() {
        assert!(RawBitmap::new(vec![0; 10], Size::new(2, 2)).is_err());
    }
}
