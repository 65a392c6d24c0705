// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster transcoding — downscale, optional luma conversion, and re-encode.
// Operates on one decoded image at a time using the `image` crate.

use std::io::{Cursor, Read};

use flate2::read::ZlibDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, ImageFormat, LumaA};
use kompakt_core::error::AssetError;
use kompakt_core::{ColorMode, CompressionProfile};
use tracing::{debug, instrument};

use super::{SkipReason, TranscodeOutcome};
use crate::asset::{AssetMeta, ImageEncoding, ImageMeta};

/// Image transcoding pipeline over a single decoded raster.
///
/// Each step consumes `self` and returns the transformed raster, so at most one
/// decoded buffer is alive per asset.
pub struct RasterTranscoder {
    image: DynamicImage,
}

impl RasterTranscoder {
    // -- Construction ---------------------------------------------------------

    /// Decode an image payload according to its recorded encoding.
    #[instrument(skip(data, meta), fields(data_len = data.len(), encoding = ?meta.encoding))]
    pub fn decode(data: &[u8], meta: &ImageMeta) -> Result<Self, AssetError> {
        let image = match &meta.encoding {
            ImageEncoding::Jpeg => decode_with(data, ImageFormat::Jpeg)?,
            ImageEncoding::Png => decode_with(data, ImageFormat::Png)?,
            ImageEncoding::RawSamples {
                components,
                deflated,
            } => decode_samples(data, meta.width, meta.height, *components, *deflated)?,
            ImageEncoding::Gif => {
                return Err(AssetError::Unsupported("GIF may be animated".into()));
            }
            ImageEncoding::WebP => {
                return Err(AssetError::Unsupported("WebP has no lossy encoder".into()));
            }
            ImageEncoding::Bmp => {
                return Err(AssetError::Unsupported("BMP is left as-is".into()));
            }
            ImageEncoding::Unsupported(reason) => {
                return Err(AssetError::Unsupported(reason.clone()));
            }
        };
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded"
        );
        Ok(Self { image })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Shrink so the longest edge is at most `max_dimension`. Never enlarges.
    pub fn fit_within(self, max_dimension: u32) -> Self {
        let (width, height) = (self.image.width(), self.image.height());
        let (new_width, new_height) = scaled_dimensions(width, height, max_dimension);
        if (new_width, new_height) == (width, height) {
            return self;
        }
        debug!(width, height, new_width, new_height, "Downscaling image");
        Self {
            image: self
                .image
                .resize_exact(new_width, new_height, FilterType::Lanczos3),
        }
    }

    /// Replace colour with BT.601 luma (0.299 R + 0.587 G + 0.114 B), keeping
    /// any alpha channel.
    pub fn luma(self) -> Self {
        let rgba = self.image.to_rgba8();
        let luma_of = |r: u8, g: u8, b: u8| -> u8 {
            let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
            y.round().clamp(0.0, 255.0) as u8
        };

        let image = if self.image.color().has_alpha() {
            let gray: GrayAlphaImage = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
                LumaA([luma_of(r, g, b), a])
            });
            DynamicImage::ImageLumaA8(gray)
        } else {
            let gray: GrayImage = ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                let image::Rgba([r, g, b, _]) = *rgba.get_pixel(x, y);
                image::Luma([luma_of(r, g, b)])
            });
            DynamicImage::ImageLuma8(gray)
        };
        Self { image }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as baseline JPEG at `quality` (1-100). Alpha is dropped.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, AssetError> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        let result = if self.is_gray() {
            self.image.to_luma8().write_with_encoder(encoder)
        } else {
            self.image.to_rgb8().write_with_encoder(encoder)
        };
        result.map_err(|err| AssetError::Transcode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode as PNG with the strongest compression and adaptive filtering.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, AssetError> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive);
        let has_alpha = self.image.color().has_alpha();
        let result = match (self.is_gray(), has_alpha) {
            (true, false) => self.image.to_luma8().write_with_encoder(encoder),
            (true, true) => self.image.to_luma_alpha8().write_with_encoder(encoder),
            (false, false) => self.image.to_rgb8().write_with_encoder(encoder),
            (false, true) => self.image.to_rgba8().write_with_encoder(encoder),
        };
        result.map_err(|err| AssetError::Transcode(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    fn is_gray(&self) -> bool {
        matches!(
            self.image,
            DynamicImage::ImageLuma8(_)
                | DynamicImage::ImageLumaA8(_)
                | DynamicImage::ImageLuma16(_)
                | DynamicImage::ImageLumaA16(_)
        )
    }
}

/// `floor(side * r)` with `r = min(1, max_dimension / max(width, height))`.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 || longest <= max_dimension {
        return (width, height);
    }
    let ratio = f64::from(max_dimension) / f64::from(longest);
    let scale = |side: u32| ((f64::from(side) * ratio).floor() as u32).clamp(1, max_dimension);
    (scale(width), scale(height))
}

/// Transcode one image asset under `profile`.
///
/// The output keeps the payload's family: PNG stays PNG, everything else
/// becomes JPEG. A result that is not strictly smaller than the original is
/// discarded.
pub fn transcode_image(data: &[u8], meta: &ImageMeta, profile: &CompressionProfile) -> TranscodeOutcome {
    let mut raster = match RasterTranscoder::decode(data, meta) {
        Ok(raster) => raster,
        Err(err) => return TranscodeOutcome::from_error(err),
    };

    raster = raster.fit_within(profile.max_dimension);
    if profile.color_mode == ColorMode::Grayscale {
        raster = raster.luma();
    }

    let (encoding, encoded) = match meta.encoding {
        ImageEncoding::Png => (ImageEncoding::Png, raster.to_png_bytes()),
        _ => (ImageEncoding::Jpeg, raster.to_jpeg_bytes(profile.jpeg_quality())),
    };
    let encoded = match encoded {
        Ok(encoded) => encoded,
        Err(err) => return TranscodeOutcome::from_error(err),
    };

    if encoded.len() >= meta.original_len {
        debug!(
            original = meta.original_len,
            encoded = encoded.len(),
            "Re-encode not smaller, keeping original"
        );
        return TranscodeOutcome::Skipped(SkipReason::SizeRegression {
            original: meta.original_len,
            encoded: encoded.len(),
        });
    }

    let color = if raster.is_gray() {
        ColorMode::Grayscale
    } else {
        ColorMode::Color
    };
    let replacement = ImageMeta {
        width: raster.width(),
        height: raster.height(),
        original_len: meta.original_len,
        encoding,
        color,
    };
    TranscodeOutcome::Replaced {
        bytes: encoded,
        meta: AssetMeta::Image(replacement),
    }
}

fn decode_with(data: &[u8], format: ImageFormat) -> Result<DynamicImage, AssetError> {
    image::load_from_memory_with_format(data, format)
        .map_err(|err| AssetError::Transcode(format!("failed to decode image: {}", err)))
}

/// Largest raw raster rebuilt from samples.
const MAX_SAMPLE_BYTES: u64 = 256 * 1024 * 1024;

/// Rebuild a raster from raw 8-bit samples.
fn decode_samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: u8,
    deflated: bool,
) -> Result<DynamicImage, AssetError> {
    let expected = u64::from(width) * u64::from(height) * u64::from(components);
    if expected == 0 {
        return Err(AssetError::Transcode(format!("no samples for {}x{}", width, height)));
    }
    if expected > MAX_SAMPLE_BYTES {
        return Err(AssetError::Unsupported(format!(
            "{}x{} raster needs {} sample bytes",
            width, height, expected
        )));
    }

    // Samples past the expected count are ignored, so inflation stops there.
    let mut samples = Vec::new();
    if deflated {
        ZlibDecoder::new(data)
            .take(expected)
            .read_to_end(&mut samples)
            .map_err(|err| AssetError::Transcode(format!("failed to inflate samples: {}", err)))?;
    } else {
        samples.extend_from_slice(&data[..data.len().min(expected as usize)]);
    }
    if (samples.len() as u64) < expected {
        return Err(AssetError::Transcode(format!(
            "expected {} sample bytes for {}x{}, found {}",
            expected,
            width,
            height,
            samples.len()
        )));
    }

    let image = match components {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        other => {
            return Err(AssetError::Unsupported(format!("{} colour components", other)));
        }
    };
    image.ok_or_else(|| AssetError::Transcode("sample buffer does not match dimensions".into()))
}

/// Encode a decoded image in `format`, for fixtures and round-trips.
pub fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, AssetError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|err| AssetError::Transcode(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
